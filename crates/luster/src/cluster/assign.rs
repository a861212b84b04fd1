//! Light-to-cluster assignment.
//!
//! Every cluster scans every light: an all-pairs test whose work is split
//! across rayon workers in batches of clusters. A worker only writes the
//! clusters of its own batch and returns its counters by value; the sums are
//! reduced after the parallel pass, so the hot loop takes no locks and
//! touches no atomics.
//!
//! Per cluster, lights are tested in collection order and appended in that
//! order, which makes the lists deterministic regardless of scheduling.

use std::ops::{Add, AddAssign};

use rayon::prelude::*;
use serde::Serialize;

use crate::config::LightingParams;
use crate::light::AreaLightBounds;
use crate::math::{Aabb, Mat4, Sphere, Vec3};
use crate::scene::LightScene;

use super::Cluster;
use super::normals::{NormalBin, NormalBins};

/// A point light moved into view space with its culling range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLightView {
    pub position: Vec3,
    pub range: f32,
}

impl PointLightView {
    pub fn sphere(&self) -> Sphere {
        Sphere::new(self.position, self.range)
    }
}

/// The frame's lights in view space, in collection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewLights {
    pub point_lights: Vec<PointLightView>,
    pub area_lights: Vec<AreaLightBounds>,
}

impl ViewLights {
    /// Transform every light by `view` and derive its culling volumes.
    pub fn prepare(scene: &LightScene, view: &Mat4, params: &LightingParams) -> Self {
        let mut lights = Self::default();
        lights.prepare_into(scene, view, params);
        lights
    }

    /// Same as [`prepare`](Self::prepare), reusing the existing allocations.
    pub fn prepare_into(&mut self, scene: &LightScene, view: &Mat4, params: &LightingParams) {
        let min = params.min_perceivable_intensity;
        scene
            .point_lights()
            .par_iter()
            .map(|light| PointLightView {
                position: light.view_position(view),
                range: light.range(min, &params.attenuation),
            })
            .collect_into_vec(&mut self.point_lights);
        scene
            .area_lights()
            .par_iter()
            .map(|light| light.view_bounds(view, min))
            .collect_into_vec(&mut self.area_lights);
    }
}

/// Counters summed over one assignment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssignCounters {
    /// (cluster, light) pairs tested.
    pub intersection_tests: u64,
    /// (cluster, light) pairs that overlapped but found the list full.
    pub overflow: u64,
    pub point_assignments: u64,
    pub area_assignments: u64,
    /// Area assignments flagged as needing an exact per-pixel test.
    pub partial_area_assignments: u64,
    /// Pairs that overlapped spatially but faced away from the normal bin.
    pub normal_rejections: u64,
}

impl Add for AssignCounters {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            intersection_tests: self.intersection_tests + rhs.intersection_tests,
            overflow: self.overflow + rhs.overflow,
            point_assignments: self.point_assignments + rhs.point_assignments,
            area_assignments: self.area_assignments + rhs.area_assignments,
            partial_area_assignments: self.partial_area_assignments
                + rhs.partial_area_assignments,
            normal_rejections: self.normal_rejections + rhs.normal_rejections,
        }
    }
}

impl AddAssign for AssignCounters {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Reset and fill every cluster's lists. `clusters.len()` must be a multiple
/// of `batch_size` (guaranteed by config validation).
pub(crate) fn assign_lights(
    clusters: &mut [Cluster],
    bins: &NormalBins,
    lights: &ViewLights,
    batch_size: usize,
) -> AssignCounters {
    clusters
        .par_chunks_mut(batch_size.max(1))
        .map(|batch| {
            let mut counters = AssignCounters::default();
            for cluster in batch {
                counters += assign_cluster(cluster, bins.get(cluster.bin()), lights);
            }
            counters
        })
        .reduce(AssignCounters::default, Add::add)
}

fn assign_cluster(cluster: &mut Cluster, bin: Option<&NormalBin>, lights: &ViewLights) -> AssignCounters {
    cluster.reset();
    let aabb = cluster.aabb;
    let mut counters = AssignCounters::default();

    for (index, light) in lights.point_lights.iter().enumerate() {
        counters.intersection_tests += 1;
        if !light.sphere().intersects_aabb(&aabb) {
            continue;
        }
        let emitter = Aabb::new(light.position, light.position);
        if bin.is_some_and(|b| !b.may_receive(&emitter, &aabb)) {
            counters.normal_rejections += 1;
            continue;
        }
        if cluster.point_lights.push(index as u32) {
            counters.point_assignments += 1;
        } else {
            counters.overflow += 1;
        }
    }

    for (index, light) in lights.area_lights.iter().enumerate() {
        counters.intersection_tests += 1;
        // Cheap box test first, then the tighter sphere.
        if !light.aabb.intersects(&aabb) || !light.sphere.intersects_aabb(&aabb) {
            continue;
        }
        if bin.is_some_and(|b| !b.may_receive(&light.emitter_aabb, &aabb)) {
            counters.normal_rejections += 1;
            continue;
        }
        let partial = !light.sphere.contains_aabb(&aabb);
        if cluster.push_area_light(index as u32, partial) {
            counters.area_assignments += 1;
            counters.partial_area_assignments += u64::from(partial);
        } else {
            counters.overflow += 1;
        }
    }

    counters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::{AreaLightDesc, AreaShape, Emission, PointLight};
    use crate::math::Vec2;
    use crate::rng::Rng;

    fn unit_cluster(capacity: u32) -> Cluster {
        let mut c = Cluster::new(0, capacity);
        c.aabb = Aabb::new(Vec3::new(2.0, 2.0, -8.0), Vec3::new(4.0, 4.0, -6.0));
        c
    }

    fn point(position: Vec3, range: f32) -> PointLightView {
        PointLightView { position, range }
    }

    #[test]
    fn point_light_within_range_is_assigned() {
        let lights = ViewLights {
            point_lights: vec![point(Vec3::ZERO, 10.0)],
            area_lights: Vec::new(),
        };
        let mut clusters = vec![unit_cluster(8)];
        let counters = assign_lights(&mut clusters, &NormalBins::single(), &lights, 1);
        assert_eq!(clusters[0].point_light_indices(), &[0]);
        assert_eq!(counters.intersection_tests, 1);
        assert_eq!(counters.overflow, 0);
    }

    #[test]
    fn tangent_sphere_is_assigned() {
        // The box's near face is exactly 6 units in front of (3, 3, 0).
        let center = Vec3::new(3.0, 3.0, 0.0);
        let lights = ViewLights {
            point_lights: vec![point(center, 6.0), point(center, 5.99)],
            area_lights: Vec::new(),
        };
        let mut clusters = vec![unit_cluster(8)];
        assign_lights(&mut clusters, &NormalBins::single(), &lights, 1);
        assert_eq!(clusters[0].point_light_indices(), &[0]);
    }

    #[test]
    fn overflow_truncates_and_counts() {
        let lights = ViewLights {
            point_lights: (0..10).map(|_| point(Vec3::new(3.0, 3.0, -7.0), 1.0)).collect(),
            area_lights: Vec::new(),
        };
        let mut clusters = vec![unit_cluster(4)];
        let counters = assign_lights(&mut clusters, &NormalBins::single(), &lights, 1);
        assert_eq!(clusters[0].point_light_indices(), &[0, 1, 2, 3]);
        assert_eq!(counters.overflow, 6);
        assert_eq!(counters.point_assignments, 4);
    }

    #[test]
    fn area_light_flags() {
        let mut rng = Rng::from_seed(0);
        let mut scene = LightScene::new();
        let bright = AreaLightDesc::new(AreaShape::Quad, Vec3::new(3.0, 3.0, -7.0), Vec3::Z)
            .with_emission(Emission::Rgb {
                color: Vec3::ONE,
                intensity: 20.0,
            });
        scene.spawn_area_light(&bright, &mut rng);
        // Dim and tiny, just past the far face: its bounds only graze the cluster.
        let dim = AreaLightDesc::new(AreaShape::Triangle, Vec3::new(3.0, 3.0, -8.03), Vec3::Z)
            .with_emission(Emission::Rgb {
                color: Vec3::ONE,
                intensity: 0.01,
            })
            .with_extent(crate::light::Extent::Fixed(Vec2::splat(0.1)));
        scene.spawn_area_light(&dim, &mut rng);

        let lights = ViewLights::prepare(&scene, &Mat4::IDENTITY, &LightingParams::default());
        let mut clusters = vec![unit_cluster(8)];
        let counters = assign_lights(&mut clusters, &NormalBins::single(), &lights, 1);

        let assigned: Vec<(u32, bool)> = clusters[0].area_lights().collect();
        assert_eq!(assigned, vec![(0, false), (1, true)]);
        assert_eq!(counters.partial_area_assignments, 1);
    }

    #[test]
    fn prepare_keeps_collection_order() {
        let mut scene = LightScene::new();
        for i in 0..5 {
            scene.push_point_light(PointLight::new(Vec3::new(i as f32, 0.0, 0.0), Vec3::ONE, 5.0));
        }
        let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0));
        let lights = ViewLights::prepare(&scene, &view, &LightingParams::default());
        for (i, l) in lights.point_lights.iter().enumerate() {
            assert_eq!(l.position, Vec3::new(i as f32, 0.0, -3.0));
            assert!(l.range > 0.0);
        }
    }

    fn block_clusters(capacity: u32) -> Vec<Cluster> {
        (0..64)
            .map(|i| {
                let mut c = Cluster::new(0, capacity);
                let o = Vec3::new((i % 4) as f32, ((i / 4) % 4) as f32, (i / 16) as f32) * 5.0
                    - Vec3::splat(10.0);
                c.aabb = Aabb::new(o, o + Vec3::splat(5.0));
                c
            })
            .collect()
    }

    #[test]
    fn every_overlapping_area_light_is_listed() {
        let scene = LightScene::scattered(
            21,
            0,
            60,
            Aabb::new(Vec3::splat(-12.0), Vec3::splat(12.0)),
        );
        let lights = ViewLights::prepare(&scene, &Mat4::IDENTITY, &LightingParams::default());
        let mut clusters = block_clusters(64);
        let counters = assign_lights(&mut clusters, &NormalBins::single(), &lights, 8);
        assert_eq!(counters.overflow, 0);

        for cluster in &clusters {
            let assigned: Vec<(u32, bool)> = cluster.area_lights().collect();
            let expected: Vec<(u32, bool)> = lights
                .area_lights
                .iter()
                .enumerate()
                .filter(|(_, l)| l.aabb.intersects(&cluster.aabb) && l.sphere.intersects_aabb(&cluster.aabb))
                .map(|(i, l)| (i as u32, !l.sphere.contains_aabb(&cluster.aabb)))
                .collect();
            assert_eq!(assigned, expected);
        }
    }

    #[test]
    fn batches_give_same_result_as_serial() {
        let mut rng = Rng::from_seed(8);
        let lights = ViewLights {
            point_lights: (0..40)
                .map(|_| point(rng.range_vec3(Vec3::splat(-10.0), Vec3::splat(10.0)), rng.range_f32(0.5, 4.0)))
                .collect(),
            area_lights: Vec::new(),
        };
        let (mut a, mut b) = (block_clusters(16), block_clusters(16));
        let ca = assign_lights(&mut a, &NormalBins::single(), &lights, 1);
        let cb = assign_lights(&mut b, &NormalBins::single(), &lights, 16);
        assert_eq!(ca, cb);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.point_light_indices(), y.point_light_indices());
        }
    }
}
