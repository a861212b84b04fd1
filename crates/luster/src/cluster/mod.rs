//! # Clusters — Light Lists for Cells of the View Frustum
//!
//! The view frustum is cut into `Gx × Gy` screen tiles and `Gz` depth slices,
//! optionally times `N` normal bins. Each cell (a *cluster*) stores which
//! lights can reach it, so shading a pixel only walks the lights of that
//! pixel's cluster instead of every light in the scene.
//!
//! ## Two Stages
//!
//! A frame runs two bulk-parallel passes over the clusters:
//!
//! 1. **Build** ([`ClusterGrid::build`]): compute each cluster's view-space
//!    AABB from the camera ([`grid`]).
//! 2. **Assign** ([`ClusterGrid::assign`]): reset every list and test every
//!    light against every cluster ([`assign`]).
//!
//! Each pass is one rayon call. The call returning is the barrier: stage 2
//! never sees a half-built grid, and readers never see half-filled lists.
//!
//! ## Fixed Capacity
//!
//! Each cluster has a point list and an area list, each holding at most
//! `max_lights_per_cluster` indices. The storage is allocated once, when the
//! grid is created, and only ever cleared afterwards. A light that finds a
//! list full is dropped for that cluster and counted as overflow. Area slots
//! carry one extra bit each ("partial": the cluster is not entirely inside
//! the light's sphere of influence), packed 32 to a word.
//!
//! ## Comparison
//!
//! - **Bevy**: clusters on the CPU too, with a variable-length index list per
//!   cluster packed into one buffer afterwards.
//! - **Doom (2016)**: clusters on the CPU with logarithmic depth slices, the
//!   same 16×8×24-ish scale as the default grid here.

pub mod assign;
pub mod grid;
pub mod normals;

use rayon::prelude::*;

use crate::camera::CameraParams;
use crate::config::ClusterConfig;
use crate::error::ConfigError;
use crate::light::GpuClusterHeader;
use crate::math::{Aabb, UVec3, Vec2, Vec3};

pub use assign::{AssignCounters, PointLightView, ViewLights};
pub use grid::{ClusterCoord, cluster_aabb, slice_depth, slice_for_depth, tile_for_pixel};
pub use normals::{NormalBin, NormalBins};

/// Fixed-capacity, insertion-ordered list of light indices.
#[derive(Debug, Clone, PartialEq)]
pub struct LightSlots {
    indices: Vec<u32>,
    capacity: usize,
}

impl LightSlots {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            indices: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append unless full. Never reallocates.
    pub fn push(&mut self, index: u32) -> bool {
        if self.indices.len() >= self.capacity {
            return false;
        }
        self.indices.push(index);
        true
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.indices.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }
}

/// One cell of the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// View-space bounds, shared by every normal bin of the same cell.
    pub aabb: Aabb,
    bin: u32,
    pub(crate) point_lights: LightSlots,
    area_lights: LightSlots,
    partial: Vec<u32>,
}

impl Cluster {
    pub fn new(bin: u32, capacity: u32) -> Self {
        let capacity = capacity as usize;
        Self {
            aabb: Aabb::EMPTY,
            bin,
            point_lights: LightSlots::with_capacity(capacity),
            area_lights: LightSlots::with_capacity(capacity),
            partial: vec![0; capacity.div_ceil(32)],
        }
    }

    pub fn bin(&self) -> u32 {
        self.bin
    }

    pub fn point_light_indices(&self) -> &[u32] {
        self.point_lights.as_slice()
    }

    pub fn area_light_indices(&self) -> &[u32] {
        self.area_lights.as_slice()
    }

    /// Whether area slot `slot` needs an exact per-pixel test.
    pub fn is_partial(&self, slot: usize) -> bool {
        slot < self.area_lights.len() && self.partial[slot / 32] & (1 << (slot % 32)) != 0
    }

    /// `(light index, partial)` for every assigned area light.
    pub fn area_lights(&self) -> impl Iterator<Item = (u32, bool)> + '_ {
        self.area_light_indices()
            .iter()
            .enumerate()
            .map(|(slot, &index)| (index, self.is_partial(slot)))
    }

    pub fn light_count(&self) -> usize {
        self.point_lights.len() + self.area_lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.light_count() == 0
    }

    pub(crate) fn push_area_light(&mut self, index: u32, partial: bool) -> bool {
        let slot = self.area_lights.len();
        if !self.area_lights.push(index) {
            return false;
        }
        if partial {
            self.partial[slot / 32] |= 1 << (slot % 32);
        }
        true
    }

    pub(crate) fn reset(&mut self) {
        self.point_lights.clear();
        self.area_lights.clear();
        self.partial.fill(0);
    }
}

/// The cluster buffer plus the camera it was last built for.
#[derive(Debug, Clone)]
pub struct ClusterGrid {
    config: ClusterConfig,
    bins: NormalBins,
    clusters: Vec<Cluster>,
    camera: Option<CameraParams>,
}

impl ClusterGrid {
    /// Validate `config` and allocate every cluster's storage.
    pub fn new(config: ClusterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let bins = match config.normal_subdivisions() {
            Some(n) => NormalBins::cube(n),
            None => NormalBins::single(),
        };
        let spatial = (config.grid.x * config.grid.y * config.grid.z) as usize;
        let clusters = (0..config.cluster_count() as usize)
            .map(|i| Cluster::new((i / spatial) as u32, config.max_lights_per_cluster))
            .collect();
        log::info!(
            "Allocated cluster grid {}x{}x{} x {} bins, {} lights per list",
            config.grid.x,
            config.grid.y,
            config.grid.z,
            bins.len(),
            config.max_lights_per_cluster
        );
        Ok(Self {
            config,
            bins,
            clusters,
            camera: None,
        })
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn dims(&self) -> UVec3 {
        self.config.grid
    }

    pub fn normal_bins(&self) -> &NormalBins {
        &self.bins
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn cluster(&self, index: usize) -> Option<&Cluster> {
        self.clusters.get(index)
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Camera of the last [`build`](Self::build), if any.
    pub fn camera(&self) -> Option<&CameraParams> {
        self.camera.as_ref()
    }

    /// Stage 1: recompute every cluster's view-space AABB for `camera`.
    pub fn build(&mut self, camera: &CameraParams) {
        let dims = self.config.grid;
        let slicing = self.config.depth_slicing;
        self.clusters
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, cluster)| {
                let c = ClusterCoord::from_linear_index(i, dims);
                cluster.aabb = cluster_aabb(c.x, c.y, c.z, dims, camera, slicing);
            });
        self.camera = Some(*camera);
    }

    /// Stage 2: clear and refill every cluster's light lists.
    pub fn assign(&mut self, lights: &ViewLights) -> AssignCounters {
        assign::assign_lights(
            &mut self.clusters,
            &self.bins,
            lights,
            self.config.batch_size as usize,
        )
    }

    /// Cluster containing a shaded point: `pixel` with a bottom-left origin,
    /// `depth` the positive view-space distance, `normal` the view-space
    /// surface normal (ignored without normal bins). Out-of-range inputs clamp
    /// to the nearest cluster. `None` until the grid has been built.
    pub fn cluster_index(&self, pixel: Vec2, depth: f32, normal: Vec3) -> Option<usize> {
        let camera = self.camera.as_ref()?;
        let dims = self.config.grid;
        let (x, y) = tile_for_pixel(pixel, camera.width, camera.height, dims.x, dims.y);
        let z = slice_for_depth(
            depth,
            dims.z,
            camera.near,
            camera.far,
            self.config.depth_slicing,
        );
        let bin = self.bins.bin_for(normal);
        Some(ClusterCoord::new(x, y, z, bin).linear_index(dims))
    }

    pub fn lookup(&self, pixel: Vec2, depth: f32, normal: Vec3) -> Option<&Cluster> {
        self.cluster_index(pixel, depth, normal)
            .and_then(|i| self.clusters.get(i))
    }

    /// Histogram of per-cluster list fill. Bucket `i` of `buckets` counts
    /// clusters whose fuller list holds `[i, i+1) / buckets` of capacity; the
    /// last bucket also takes completely full lists.
    pub fn occupancy_histogram(&self, buckets: usize) -> Vec<u32> {
        let buckets = buckets.max(1);
        let cap = self.config.max_lights_per_cluster as usize;
        let mut hist = vec![0u32; buckets];
        for cluster in &self.clusters {
            let fill = cluster.point_lights.len().max(cluster.area_lights.len());
            hist[(fill * buckets / cap).min(buckets - 1)] += 1;
        }
        hist
    }

    /// Mean lights per cluster for each depth slice, near to far.
    pub fn depth_profile(&self) -> Vec<f32> {
        let dims = self.config.grid;
        let mut sums = vec![0usize; dims.z as usize];
        for (i, cluster) in self.clusters.iter().enumerate() {
            sums[ClusterCoord::from_linear_index(i, dims).z as usize] += cluster.light_count();
        }
        let per_slice = (self.clusters.len() / dims.z as usize).max(1) as f32;
        sums.into_iter().map(|s| s as f32 / per_slice).collect()
    }

    /// Bytes of one cluster record in [`to_gpu_bytes`](Self::to_gpu_bytes).
    pub fn gpu_stride(&self) -> usize {
        let cap = self.config.max_lights_per_cluster as usize;
        std::mem::size_of::<GpuClusterHeader>() + 4 * (2 * cap + cap.div_ceil(32))
    }

    /// The whole grid as a flat std430 buffer. Each cluster record is
    ///
    /// ```text
    /// GpuClusterHeader | u32 point[cap] | u32 area[cap] | u32 partial[ceil(cap/32)]
    /// ```
    ///
    /// with unused slots zeroed, in linear cluster order.
    pub fn to_gpu_bytes(&self) -> Vec<u8> {
        let cap = self.config.max_lights_per_cluster as usize;
        let mut out = Vec::with_capacity(self.gpu_stride() * self.clusters.len());
        let write_list = |out: &mut Vec<u8>, list: &[u32], len: usize| {
            out.extend_from_slice(bytemuck::cast_slice(list));
            out.resize(out.len() + 4 * (len - list.len()), 0);
        };
        for cluster in &self.clusters {
            let header = GpuClusterHeader::new(
                &cluster.aabb,
                cluster.point_lights.len() as u32,
                cluster.area_lights.len() as u32,
            );
            out.extend_from_slice(bytemuck::bytes_of(&header));
            write_list(&mut out, cluster.point_light_indices(), cap);
            write_list(&mut out, cluster.area_light_indices(), cap);
            out.extend_from_slice(bytemuck::cast_slice(&cluster.partial));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DepthSlicing, LightingParams};
    use crate::light::PointLight;
    use crate::math::{Mat4, Vec4};
    use crate::rng::Rng;
    use crate::scene::LightScene;

    fn camera() -> CameraParams {
        CameraParams::perspective(Mat4::IDENTITY, 60f32.to_radians(), 1280, 720, 0.1, 100.0)
            .unwrap()
    }

    fn small_config() -> ClusterConfig {
        ClusterConfig::discrete()
            .with_grid(8, 4, 8)
            .with_batch_size(32)
            .with_max_lights_per_cluster(16)
    }

    fn project(p: Vec3, cam: &CameraParams) -> (Vec2, f32) {
        let clip = cam.projection * Vec4::new(p.x, p.y, p.z, 1.0);
        let ndc = clip.truncate() / clip.w;
        let pixel = Vec2::new(
            (ndc.x * 0.5 + 0.5) * cam.width as f32,
            (ndc.y * 0.5 + 0.5) * cam.height as f32,
        );
        (pixel, -p.z)
    }

    #[test]
    fn slots_refuse_when_full() {
        let mut slots = LightSlots::with_capacity(2);
        assert!(slots.push(4));
        assert!(slots.push(9));
        assert!(!slots.push(1));
        assert!(slots.is_full());
        assert_eq!(slots.as_slice(), &[4, 9]);
    }

    #[test]
    fn partial_bits_past_word_boundary() {
        let mut c = Cluster::new(0, 40);
        for i in 0..40 {
            assert!(c.push_area_light(i, i % 3 == 0));
        }
        assert!(c.is_partial(33));
        assert!(!c.is_partial(34));
        assert!(!c.push_area_light(99, true));
        c.reset();
        assert!(c.is_empty());
        assert!(!c.is_partial(33));
    }

    #[test]
    fn invalid_config_is_not_allocated() {
        let cfg = small_config().with_batch_size(100);
        assert!(matches!(ClusterGrid::new(cfg), Err(ConfigError::BatchSize { .. })));
    }

    #[test]
    fn lookup_finds_cluster_containing_point() {
        let cam = camera();
        let mut rng = Rng::from_seed(77);
        for slicing in [DepthSlicing::Logarithmic, DepthSlicing::Linear] {
            let mut grid = ClusterGrid::new(small_config().with_depth_slicing(slicing)).unwrap();
            grid.build(&cam);
            for _ in 0..200 {
                // Random point inside the frustum.
                let ndc = Vec2::new(rng.range_f32(-0.99, 0.99), rng.range_f32(-0.99, 0.99));
                let depth = rng.range_f32(0.2, 99.0);
                let on_near = cam.inverse_projection * Vec4::new(ndc.x, ndc.y, -1.0, 1.0);
                let p = on_near.truncate() / on_near.w * (depth / cam.near);

                let (pixel, d) = project(p, &cam);
                let cluster = grid.lookup(pixel, d, Vec3::Z).unwrap();
                assert!(cluster.aabb.expanded(1e-3 * depth).contains_point(p), "{p:?}");
            }
        }
    }

    #[test]
    fn lookup_before_build_is_none() {
        let grid = ClusterGrid::new(small_config()).unwrap();
        assert!(grid.cluster_index(Vec2::ZERO, 1.0, Vec3::Z).is_none());
    }

    #[test]
    fn capacity_holds_for_every_cluster() {
        let cam = camera();
        let mut grid = ClusterGrid::new(small_config().with_max_lights_per_cluster(3)).unwrap();
        grid.build(&cam);
        let scene = LightScene::scattered(
            3,
            300,
            30,
            Aabb::new(Vec3::new(-20.0, -20.0, -60.0), Vec3::new(20.0, 20.0, -1.0)),
        );
        let lights = ViewLights::prepare(&scene, &cam.view, &LightingParams::default());
        let counters = grid.assign(&lights);
        assert!(counters.overflow > 0);
        for c in grid.clusters() {
            assert!(c.point_light_indices().len() <= 3);
            assert!(c.area_light_indices().len() <= 3);
        }
    }

    #[test]
    fn reassign_is_bit_identical() {
        let cam = camera();
        let mut grid = ClusterGrid::new(small_config().with_normal_bins(6).with_batch_size(64)).unwrap();
        let scene = LightScene::scattered(
            12345,
            200,
            20,
            Aabb::new(Vec3::new(-20.0, -20.0, -60.0), Vec3::new(20.0, 20.0, -1.0)),
        );
        let lights = ViewLights::prepare(&scene, &cam.view, &LightingParams::default());
        grid.build(&cam);
        let first_counters = grid.assign(&lights);
        let first = grid.to_gpu_bytes();
        grid.build(&cam);
        let second_counters = grid.assign(&lights);
        assert_eq!(first_counters, second_counters);
        assert_eq!(first, grid.to_gpu_bytes());
    }

    #[test]
    fn gpu_bytes_layout() {
        let cam = camera();
        let mut grid = ClusterGrid::new(small_config()).unwrap();
        grid.build(&cam);
        let mut scene = LightScene::new();
        scene.push_point_light(PointLight::new(Vec3::new(0.0, 0.0, -5.0), Vec3::ONE, 8.0));
        let lights = ViewLights::prepare(&scene, &cam.view, &LightingParams::default());
        grid.assign(&lights);

        let bytes = grid.to_gpu_bytes();
        assert_eq!(bytes.len(), grid.gpu_stride() * grid.len());
        assert_eq!(grid.gpu_stride(), 48 + 4 * (16 + 16 + 1));

        let index = grid
            .cluster_index(Vec2::new(640.0, 360.0), 5.0, Vec3::Z)
            .unwrap();
        let record = &bytes[index * grid.gpu_stride()..(index + 1) * grid.gpu_stride()];
        let header: GpuClusterHeader = bytemuck::pod_read_unaligned(&record[..48]);
        assert_eq!(header.point_count, 1);
        let first_point: u32 = bytemuck::pod_read_unaligned(&record[48..52]);
        assert_eq!(first_point, 0);
    }

    #[test]
    fn histogram_counts_every_cluster() {
        let grid = ClusterGrid::new(small_config()).unwrap();
        let hist = grid.occupancy_histogram(8);
        assert_eq!(hist.iter().sum::<u32>() as usize, grid.len());
        assert_eq!(hist[0] as usize, grid.len());
        assert_eq!(grid.depth_profile().len(), 8);
    }
}
