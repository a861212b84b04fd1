//! # Area Lights — Polygonal Emitters
//!
//! An area light is a flat polygon that emits from one face (or both). It is
//! built from a [`AreaShape`] template and placed with one transform:
//!
//! ```text
//! T = Translate(position) · RotateAlign(TEMPLATE_NORMAL → normal) · Scale(width, height, 1)
//! ```
//!
//! Afterwards the vertices are stored in world space, normalized so that
//! `w == 1` exactly (shaders read x, y, z and ignore w).
//!
//! ## Influence Radius
//!
//! Culling needs a distance past which the light no longer matters. The light
//! is treated as a hemispherical emitter of flux
//!
//! ```text
//! flux = luminance(color) · intensity · area      (× 2 if double-sided)
//! E(r) = flux / (2π r²)
//! ```
//!
//! Solving `E(r) = min_perceivable` gives `r = sqrt(flux / (2π · min))`. The
//! radius used for culling is twice that: a generous upper bound, since
//! underestimating it clips the light visibly at cluster edges while
//! overestimating it only costs a few extra list entries.
//!
//! ## Per-Frame Bounds
//!
//! Each frame the vertices are moved into view space and wrapped in two
//! volumes, both inflated by the influence radius: an AABB (cheap rejection)
//! and a sphere around the centroid (tighter for tilted polygons). See
//! [`AreaLightBounds`].

use crate::color::{hsv_to_rgb, luminance};
use crate::error::ConfigError;
use crate::math::{
    Aabb, Mat4, Sphere, Transform, Vec2, Vec3, Vec4, polygon_area, polygon_area_aabb_upper_bound,
    rotation_between, to_cartesian,
};
use crate::rng::Rng;

use super::shapes::{AreaShape, MAX_VERTICES, TEMPLATE_NORMAL};

/// Intensity range for lights with a random hue.
pub const RANDOM_INTENSITY: (f32, f32) = (3.0, 25.0);
/// Scale range for lights with a random size.
pub const RANDOM_EXTENT: (f32, f32) = (0.3, 3.0);

/// Intensities are kept strictly positive.
const MIN_INTENSITY: f32 = 1e-6;

/// How an area light gets its color and intensity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Emission {
    /// Random hue at full saturation/value, random intensity in
    /// [`RANDOM_INTENSITY`].
    Random,
    /// Given hue (S = V = 1) and intensity.
    Hue { hue: f32, intensity: f32 },
    /// Given linear RGB and intensity.
    Rgb { color: Vec3, intensity: f32 },
}

/// How an area light gets its width and height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Extent {
    /// Independent random width and height in [`RANDOM_EXTENT`].
    Random,
    /// One random factor in [`RANDOM_EXTENT`] for both axes.
    RandomUniform,
    Fixed(Vec2),
}

/// Everything needed to construct an [`AreaLight`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaLightDesc {
    pub position: Vec3,
    pub normal: Vec3,
    pub double_sided: bool,
    pub shape: AreaShape,
    pub emission: Emission,
    pub extent: Extent,
}

impl AreaLightDesc {
    /// One-sided, unit-size light with a random color.
    pub fn new(shape: AreaShape, position: Vec3, normal: Vec3) -> Self {
        Self {
            position,
            normal,
            double_sided: false,
            shape,
            emission: Emission::Random,
            extent: Extent::Fixed(Vec2::ONE),
        }
    }

    /// Build from the flat parameter list used by scene scripts, where
    /// negative values request randomization:
    ///
    /// - `hue < 0`: random hue and random intensity
    /// - `width < 0`: random size; for `n == 6` (a star with uniform scale)
    ///   both axes share one factor
    ///
    /// `n` must be 3, 4, 5, 10, or 6 meaning the star.
    #[allow(clippy::too_many_arguments)]
    pub fn from_raw(
        position: Vec3,
        normal: Vec3,
        double_sided: bool,
        n: u32,
        hue: f32,
        intensity: f32,
        width: f32,
        height: f32,
    ) -> Result<Self, ConfigError> {
        let uniform = n == 6;
        let shape = AreaShape::from_vertex_count(if uniform { 10 } else { n })?;
        let emission = if hue < 0.0 {
            Emission::Random
        } else {
            Emission::Hue { hue, intensity }
        };
        let extent = match (width < 0.0, uniform) {
            (true, true) => Extent::RandomUniform,
            (true, false) => Extent::Random,
            (false, _) => Extent::Fixed(Vec2::new(width, height)),
        };
        Ok(Self {
            position,
            normal,
            double_sided,
            shape,
            emission,
            extent,
        })
    }

    pub fn double_sided(mut self, double_sided: bool) -> Self {
        self.double_sided = double_sided;
        self
    }

    pub fn with_emission(mut self, emission: Emission) -> Self {
        self.emission = emission;
        self
    }

    pub fn with_extent(mut self, extent: Extent) -> Self {
        self.extent = extent;
        self
    }

    /// Resolve random choices with `rng` and place the template in the world.
    pub fn build(&self, rng: &mut Rng) -> AreaLight {
        let (color, intensity) = match self.emission {
            Emission::Random => (
                hsv_to_rgb(rng.next_f32(), 1.0, 1.0),
                rng.range_f32(RANDOM_INTENSITY.0, RANDOM_INTENSITY.1),
            ),
            Emission::Hue { hue, intensity } => (hsv_to_rgb(hue, 1.0, 1.0), intensity),
            Emission::Rgb { color, intensity } => (color, intensity),
        };

        let size = match self.extent {
            Extent::Random => Vec2::new(
                rng.range_f32(RANDOM_EXTENT.0, RANDOM_EXTENT.1),
                rng.range_f32(RANDOM_EXTENT.0, RANDOM_EXTENT.1),
            ),
            Extent::RandomUniform => Vec2::splat(rng.range_f32(RANDOM_EXTENT.0, RANDOM_EXTENT.1)),
            Extent::Fixed(size) => size,
        };

        let transform = Transform::from_translation(self.position)
            .with_rotation(rotation_between(TEMPLATE_NORMAL, self.normal))
            .with_scale(size.extend(1.0));

        let mut light = AreaLight::from_template(self.shape, color, intensity, self.double_sided);
        light.transform(&transform.matrix());
        light
    }
}

/// A planar polygonal emitter in world space.
///
/// The shape (and so the vertex count) is fixed at construction. Vertices
/// stay coplanar because they only ever move under a single affine transform.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaLight {
    color: Vec3,
    intensity: f32,
    shape: AreaShape,
    double_sided: bool,
    /// World-space, `w == 1`. Slots past `shape.vertex_count()` are zero.
    vertices: [Vec4; MAX_VERTICES],
}

impl AreaLight {
    /// The untransformed template: unit size, at the origin, facing
    /// [`TEMPLATE_NORMAL`].
    pub fn from_template(shape: AreaShape, color: Vec3, intensity: f32, double_sided: bool) -> Self {
        let mut vertices = [Vec4::ZERO; MAX_VERTICES];
        for (slot, p) in vertices.iter_mut().zip(shape.template_points()) {
            *slot = p.extend(1.0);
        }
        Self {
            color,
            intensity: intensity.max(MIN_INTENSITY),
            shape,
            double_sided,
            vertices,
        }
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn shape(&self) -> AreaShape {
        self.shape
    }

    pub fn vertex_count(&self) -> usize {
        self.shape.vertex_count()
    }

    pub fn is_double_sided(&self) -> bool {
        self.double_sided
    }

    /// World-space vertices, counter-clockwise, each with `w == 1`.
    pub fn vertices(&self) -> &[Vec4] {
        &self.vertices[..self.vertex_count()]
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.vertices().iter().map(|v| v.truncate())
    }

    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
    }

    /// Intensity is clamped to stay positive.
    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity.max(MIN_INTENSITY);
    }

    pub fn set_double_sided(&mut self, double_sided: bool) {
        self.double_sided = double_sided;
    }

    /// Apply an affine transform to every vertex and renormalize w.
    pub fn transform(&mut self, matrix: &Mat4) {
        let n = self.vertex_count();
        for v in &mut self.vertices[..n] {
            *v = to_cartesian(*matrix * *v);
        }
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.transform(&Mat4::from_translation(offset));
    }

    /// Mean of the vertices.
    pub fn centroid(&self) -> Vec3 {
        self.positions().sum::<Vec3>() / self.vertex_count() as f32
    }

    /// Emitting direction, opposite to the counter-clockwise winding normal.
    /// Zero if the first three vertices are collinear.
    pub fn facing(&self) -> Vec3 {
        let v = self.vertices();
        let (a, b, c) = (v[0].truncate(), v[1].truncate(), v[2].truncate());
        -(b - a).cross(c - a).normalize_or_zero()
    }

    /// Exact polygon area.
    pub fn area(&self) -> f32 {
        self.with_world_points(polygon_area)
    }

    /// Bounding-box surface area; a loose upper bound on [`area`](Self::area).
    pub fn area_upper_bound(&self) -> f32 {
        self.with_world_points(polygon_area_aabb_upper_bound)
    }

    /// `luminance · intensity · area`, doubled when double-sided.
    pub fn flux(&self, area: f32) -> f32 {
        let flux = luminance(self.color) * self.intensity * area;
        if self.double_sided { flux * 2.0 } else { flux }
    }

    /// Distance beyond which this light is below `min_perceivable`, given its
    /// `area`. Deliberately twice the inverse-square solution.
    pub fn influence_radius_for_area(&self, area: f32, min_perceivable: f32) -> f32 {
        let flux = self.flux(area);
        2.0 * (flux / (std::f32::consts::TAU * min_perceivable)).max(0.0).sqrt()
    }

    /// [`influence_radius_for_area`](Self::influence_radius_for_area) with the exact area.
    pub fn influence_radius(&self, min_perceivable: f32) -> f32 {
        self.influence_radius_for_area(self.area(), min_perceivable)
    }

    /// Triangle list for drawing the emitter. Depends only on the shape.
    pub fn triangle_indices(&self) -> Vec<u32> {
        self.shape.triangle_indices()
    }

    /// View-space vertices and culling volumes for this frame.
    pub fn view_bounds(&self, view: &Mat4, min_perceivable: f32) -> AreaLightBounds {
        let n = self.vertex_count();
        let mut vertices_view = [Vec4::ZERO; MAX_VERTICES];
        for (dst, src) in vertices_view.iter_mut().zip(self.vertices()) {
            *dst = to_cartesian(*view * *src);
        }
        let points = || vertices_view[..n].iter().map(|v| v.truncate());

        let influence = self.influence_radius(min_perceivable);
        let centroid = points().sum::<Vec3>() / n as f32;
        let geometric = points()
            .map(|p| p.distance(centroid))
            .fold(0.0f32, f32::max);

        let emitter_aabb = Aabb::from_points(points());
        AreaLightBounds {
            vertices_view,
            vertex_count: n as u32,
            influence_radius: influence,
            emitter_aabb,
            aabb: emitter_aabb.expanded(influence),
            sphere: Sphere::new(centroid, geometric + influence),
        }
    }

    /// Runs `f` over the vertex positions, staged on the stack.
    fn with_world_points<R>(&self, f: impl FnOnce(&[Vec3]) -> R) -> R {
        let mut points = [Vec3::ZERO; MAX_VERTICES];
        for (dst, src) in points.iter_mut().zip(self.vertices()) {
            *dst = src.truncate();
        }
        f(&points[..self.vertex_count()])
    }
}

/// Per-frame, view-space culling data of one area light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaLightBounds {
    pub vertices_view: [Vec4; MAX_VERTICES],
    pub vertex_count: u32,
    pub influence_radius: f32,
    /// Tight AABB of the polygon itself.
    pub emitter_aabb: Aabb,
    /// Vertex AABB grown by the influence radius.
    pub aabb: Aabb,
    /// Centroid, radius = farthest vertex + influence radius.
    pub sphere: Sphere,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::shapes::STAR_INDICES;
    use crate::math::Quat;

    fn white_quad(size: Vec2) -> AreaLightDesc {
        AreaLightDesc::new(AreaShape::Quad, Vec3::ZERO, Vec3::NEG_Z)
            .with_emission(Emission::Rgb {
                color: Vec3::ONE,
                intensity: 1.0,
            })
            .with_extent(Extent::Fixed(size))
    }

    #[test]
    fn unit_quad_area_then_scaled() {
        let mut rng = Rng::from_seed(0);
        let unit = white_quad(Vec2::ONE).build(&mut rng);
        assert!((unit.area() - 1.0).abs() < 1e-5);
        let scaled = white_quad(Vec2::new(2.0, 3.0)).build(&mut rng);
        assert!((scaled.area() - 6.0).abs() < 1e-4);
    }

    #[test]
    fn area_uses_only_live_vertices() {
        let mut rng = Rng::from_seed(5);
        for shape in AreaShape::ALL {
            let light = AreaLightDesc::new(shape, Vec3::new(0.5, 1.0, -4.0), Vec3::X)
                .with_extent(Extent::Fixed(Vec2::new(1.2, 0.8)))
                .build(&mut rng);
            let positions: Vec<Vec3> = light.positions().collect();
            assert_eq!(positions.len(), shape.vertex_count());
            assert!((light.area() - polygon_area(&positions)).abs() < 1e-6);
            assert!(light.area_upper_bound() >= light.area() - 1e-5);
        }
    }

    #[test]
    fn area_invariant_under_rigid_motion() {
        let mut rng = Rng::from_seed(3);
        for shape in AreaShape::ALL {
            let base = AreaLightDesc::new(shape, Vec3::ZERO, Vec3::NEG_Z)
                .with_extent(Extent::Fixed(Vec2::new(1.5, 0.7)))
                .build(&mut rng);
            let mut moved = base.clone();
            let rigid = Mat4::from_rotation_translation(
                Quat::from_euler(glam::EulerRot::YXZ, 0.9, -0.4, 2.1),
                Vec3::new(10.0, -3.0, 7.5),
            );
            moved.transform(&rigid);
            assert!((moved.area() - base.area()).abs() < 1e-4, "{shape:?}");
        }
    }

    #[test]
    fn vertices_have_unit_w() {
        let mut rng = Rng::from_seed(11);
        for shape in AreaShape::ALL {
            let light = AreaLightDesc::new(shape, Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.3, 1.0, -0.2))
                .with_extent(Extent::Random)
                .build(&mut rng);
            assert_eq!(light.vertices().len(), shape.vertex_count());
            for v in light.vertices() {
                assert_eq!(v.w, 1.0);
            }
        }
    }

    #[test]
    fn light_faces_requested_normal() {
        let mut rng = Rng::from_seed(5);
        let normals = [Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Z, Vec3::NEG_Z, Vec3::Y];
        for normal in normals {
            let light = AreaLightDesc::new(AreaShape::Pentagon, Vec3::ZERO, normal).build(&mut rng);
            assert!((light.facing() - normal.normalize()).length() < 1e-4, "{normal:?}");
        }
    }

    #[test]
    fn antiparallel_and_zero_normals_stay_finite() {
        let mut rng = Rng::from_seed(5);
        for normal in [Vec3::Z, Vec3::ZERO] {
            let light = AreaLightDesc::new(AreaShape::Quad, Vec3::ONE, normal).build(&mut rng);
            assert!(light.vertices().iter().all(|v| v.is_finite()));
            assert!((light.area() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn star_topology_survives_transforms() {
        let mut rng = Rng::from_seed(9);
        let mut star = AreaLightDesc::new(AreaShape::Star, Vec3::new(4.0, 0.0, 1.0), Vec3::Y)
            .with_extent(Extent::Random)
            .build(&mut rng);
        assert_eq!(star.triangle_indices(), STAR_INDICES.to_vec());
        star.transform(&Mat4::from_scale_rotation_translation(
            Vec3::new(2.0, 0.5, 1.0),
            Quat::from_rotation_x(1.0),
            Vec3::splat(-3.0),
        ));
        assert_eq!(star.vertex_count(), 10);
        assert_eq!(star.triangle_indices(), STAR_INDICES.to_vec());
    }

    #[test]
    fn influence_radius_formula() {
        let mut rng = Rng::from_seed(0);
        let quad = white_quad(Vec2::ONE).build(&mut rng);
        let min = 0.015;
        let expected = 2.0 * (1.0 / (std::f32::consts::TAU * min)).sqrt();
        assert!((quad.influence_radius(min) - expected).abs() < 1e-3);

        let mut double = quad.clone();
        double.set_double_sided(true);
        let ratio = double.influence_radius(min) / quad.influence_radius(min);
        assert!((ratio - std::f32::consts::SQRT_2).abs() < 1e-4);
    }

    #[test]
    fn raw_sentinels_randomize() {
        let desc = AreaLightDesc::from_raw(Vec3::ZERO, Vec3::Y, true, 6, -1.0, 0.0, -1.0, -1.0).unwrap();
        assert_eq!(desc.shape, AreaShape::Star);
        assert_eq!(desc.emission, Emission::Random);
        assert_eq!(desc.extent, Extent::RandomUniform);

        let mut rng = Rng::from_seed(42);
        let light = desc.build(&mut rng);
        assert!((RANDOM_INTENSITY.0..RANDOM_INTENSITY.1).contains(&light.intensity()));

        assert_eq!(
            AreaLightDesc::from_raw(Vec3::ZERO, Vec3::Y, false, 7, 0.5, 1.0, 1.0, 1.0),
            Err(ConfigError::InvalidShape(7))
        );
    }

    #[test]
    fn view_bounds_enclose_vertices() {
        let mut rng = Rng::from_seed(2);
        let light = AreaLightDesc::new(AreaShape::Pentagon, Vec3::new(0.0, 1.0, -5.0), Vec3::Z)
            .build(&mut rng);
        let view = Mat4::look_at_rh(Vec3::new(2.0, 2.0, 2.0), Vec3::ZERO, Vec3::Y);
        let b = light.view_bounds(&view, 0.015);
        assert!(b.influence_radius > 0.0);
        for v in &b.vertices_view[..b.vertex_count as usize] {
            let p = v.truncate();
            assert!(b.aabb.contains_point(p));
            assert!(p.distance(b.sphere.center) <= b.sphere.radius);
        }
    }
}
