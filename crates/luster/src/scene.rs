//! The authoritative light collections.
//!
//! A [`LightScene`] holds two ordered, growable lists, one per light kind.
//! Lights are referred to by their position in these lists; removal keeps the
//! remaining lights in order, so indices shift but never reorder. The
//! clustering pipeline borrows the scene immutably for a frame, so mutations
//! (spawning, removing, moving lights) happen strictly between frames.

use crate::camera::FreeCamera;
use crate::error::ConfigError;
use crate::light::{AreaLight, AreaLightDesc, AreaShape, Extent, PointLight};
use crate::math::{Aabb, Vec3};
use crate::rng::Rng;

/// Intensity range of point lights in generated scenes.
pub const SCATTER_POINT_INTENSITY: (f32, f32) = (3.0, 8.0);

#[derive(Debug, Clone, Default)]
pub struct LightScene {
    point_lights: Vec<PointLight>,
    area_lights: Vec<AreaLight>,
}

impl LightScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reproducible scene of `point_count` point lights and `area_count` area
    /// lights spread uniformly through `bounds`.
    ///
    /// Point lights get a random color and an intensity in
    /// [`SCATTER_POINT_INTENSITY`]. Area lights get a random shape, facing,
    /// color and size.
    pub fn scattered(seed: u64, point_count: usize, area_count: usize, bounds: Aabb) -> Self {
        let mut rng = Rng::from_seed(seed);
        let mut scene = Self::new();

        for _ in 0..point_count {
            let position = rng.range_vec3(bounds.min, bounds.max);
            let color = Vec3::new(rng.next_f32(), rng.next_f32(), rng.next_f32());
            let intensity = rng.range_f32(SCATTER_POINT_INTENSITY.0, SCATTER_POINT_INTENSITY.1);
            scene.push_point_light(PointLight::new(position, color, intensity));
        }

        for _ in 0..area_count {
            let shape = AreaShape::ALL[(rng.next_u32() % AreaShape::ALL.len() as u32) as usize];
            let position = rng.range_vec3(bounds.min, bounds.max);
            let normal = rng.unit_vector();
            let desc = AreaLightDesc::new(shape, position, normal)
                .with_extent(Extent::Random);
            scene.push_area_light(desc.build(&mut rng));
        }

        log::debug!(
            "Scattered {point_count} point lights and {area_count} area lights (seed {seed})"
        );
        scene
    }

    pub fn point_lights(&self) -> &[PointLight] {
        &self.point_lights
    }

    pub fn area_lights(&self) -> &[AreaLight] {
        &self.area_lights
    }

    pub fn point_lights_mut(&mut self) -> &mut [PointLight] {
        &mut self.point_lights
    }

    /// Area lights may be recolored or moved rigidly; their shape is fixed.
    pub fn area_lights_mut(&mut self) -> &mut [AreaLight] {
        &mut self.area_lights
    }

    pub fn light_count(&self) -> usize {
        self.point_lights.len() + self.area_lights.len()
    }

    /// Append and return the new light's index.
    pub fn push_point_light(&mut self, light: PointLight) -> usize {
        self.point_lights.push(light);
        self.point_lights.len() - 1
    }

    /// Append and return the new light's index.
    pub fn push_area_light(&mut self, light: AreaLight) -> usize {
        self.area_lights.push(light);
        self.area_lights.len() - 1
    }

    /// Point light with a random color at `position`.
    pub fn spawn_point_light(&mut self, position: Vec3, rng: &mut Rng) -> usize {
        self.push_point_light(PointLight::random_color(position, rng))
    }

    pub fn spawn_area_light(&mut self, desc: &AreaLightDesc, rng: &mut Rng) -> usize {
        self.push_area_light(desc.build(rng))
    }

    /// Area light at the camera, facing the camera's backward axis, with a
    /// random color and size. `vertex_key` picks the shape by vertex count
    /// (3, 4, 5, 10); 6 picks the star with uniform scaling.
    pub fn spawn_area_light_at_camera(
        &mut self,
        camera: &FreeCamera,
        vertex_key: u32,
        rng: &mut Rng,
    ) -> Result<usize, ConfigError> {
        let desc = AreaLightDesc::from_raw(
            camera.position,
            camera.backward(),
            false,
            vertex_key,
            -1.0,
            -1.0,
            -1.0,
            -1.0,
        )?;
        let index = self.spawn_area_light(&desc, rng);
        log::info!(
            "Spawned {:?} area light #{index} at {:?}",
            desc.shape,
            camera.position
        );
        Ok(index)
    }

    /// Remove keeping the order of the rest. Later lights shift down by one.
    pub fn remove_point_light(&mut self, index: usize) -> Option<PointLight> {
        (index < self.point_lights.len()).then(|| self.point_lights.remove(index))
    }

    /// Remove keeping the order of the rest. Later lights shift down by one.
    pub fn remove_area_light(&mut self, index: usize) -> Option<AreaLight> {
        (index < self.area_lights.len()).then(|| self.area_lights.remove(index))
    }

    pub fn clear(&mut self) {
        self.point_lights.clear();
        self.area_lights.clear();
    }
}
