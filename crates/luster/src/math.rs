//! Math types and glam re-exports.
//!
//! We re-export [glam](https://docs.rs/glam) types so users don't need to
//! depend on it directly. On top of glam this module provides the handful of
//! geometric primitives the culling pipeline is built from: [`Transform`] for
//! placing emitters, [`Aabb`] and [`Sphere`] bounding volumes with inclusive
//! overlap tests, and planar polygon area.
//!
//! ## Inclusive Tests
//!
//! Every overlap test here treats touching as overlapping (`<=`). A light whose
//! bound is exactly tangent to a cluster boundary is assigned to both clusters
//! on either side of it. The cost is one extra light in a list; the alternative
//! is a visible seam where a light pops out between two neighbouring cells.

pub use glam::{Mat4, Quat, UVec3, Vec2, Vec3, Vec4};

/// Below this, a direction is treated as zero-length.
const DEGENERATE_EPSILON: f32 = 1e-6;

/// A 3D transform: position, rotation, and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Identity transform (origin, no rotation, uniform scale of 1).
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Create a transform at the given position.
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Create a transform at the given position.
    pub fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self::from_translation(Vec3::new(x, y, z))
    }

    /// Return a copy with the given rotation.
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Return a copy with a (possibly non-uniform) scale.
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Compute the 4x4 model matrix: `Translate · Rotate · Scale`.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Rotation taking direction `from` onto direction `to`.
///
/// Both inputs are normalized first. The degenerate cases resolve to:
///
/// - either input zero-length: identity
/// - parallel: identity
/// - antiparallel: 180° about an axis perpendicular to `from`
pub fn rotation_between(from: Vec3, to: Vec3) -> Quat {
    let (Some(from), Some(to)) = (from.try_normalize(), to.try_normalize()) else {
        log::trace!("rotation_between: zero-length direction, using identity");
        return Quat::IDENTITY;
    };

    let axis = from.cross(to);
    let cos = from.dot(to).clamp(-1.0, 1.0);
    if axis.length_squared() > DEGENERATE_EPSILON * DEGENERATE_EPSILON {
        return Quat::from_axis_angle(axis.normalize(), cos.acos());
    }

    if cos > 0.0 {
        Quat::IDENTITY
    } else {
        Quat::from_axis_angle(from.any_orthonormal_vector(), std::f32::consts::PI)
    }
}

/// Homogeneous to Cartesian: divides x, y, z by w and sets w to exactly 1.
///
/// A point at infinity (w = 0) keeps its x, y, z.
pub fn to_cartesian(p: Vec4) -> Vec4 {
    if p.w == 0.0 {
        return p.truncate().extend(1.0);
    }
    (p.truncate() / p.w).extend(1.0)
}

// ── Bounding volumes ────────────────────────────────────────────────────

/// Axis-aligned bounding box. `min <= max` componentwise for any box built
/// through the constructors here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// An inverted box that any point will grow.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Tightest box around the given points. Empty input gives [`Aabb::EMPTY`].
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |acc, p| Self {
            min: acc.min.min(p),
            max: acc.max.max(p),
        })
    }

    /// Grow by `r` in every direction.
    pub fn expanded(&self, r: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(r),
            max: self.max + Vec3::splat(r),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Inclusive box-box overlap.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        self.min.cmple(p).all() && p.cmple(self.max).all()
    }

    /// Point of the box nearest to `p`.
    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        p.clamp(self.min, self.max)
    }

    /// Corner of the box farthest from `p`.
    pub fn farthest_point(&self, p: Vec3) -> Vec3 {
        let center = self.center();
        Vec3::select(p.cmplt(center), self.max, self.min)
    }
}

/// A bounding sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Inclusive sphere-box overlap via the closest point on the box.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        let closest = aabb.closest_point(self.center);
        closest.distance_squared(self.center) <= self.radius * self.radius
    }

    /// Whether the whole box lies inside the sphere.
    pub fn contains_aabb(&self, aabb: &Aabb) -> bool {
        let far = aabb.farthest_point(self.center);
        far.distance_squared(self.center) <= self.radius * self.radius
    }
}

// ── Polygon area ────────────────────────────────────────────────────────

/// Exact area of a planar simple polygon (convex or not).
///
/// The plane normal comes from the first three vertices. Vertices are
/// projected into a tangent basis of that plane and summed with the shoelace
/// formula. The absolute value makes the result independent of winding.
/// Fewer than three vertices, or collinear leading vertices, give 0.
pub fn polygon_area(points: &[Vec3]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }

    let normal = (points[1] - points[0]).cross(points[2] - points[0]);
    let Some(normal) = normal.try_normalize() else {
        return 0.0;
    };

    // Helper axis that is least parallel to the normal.
    let helper = if normal.dot(Vec3::Y).abs() < normal.dot(Vec3::X).abs() {
        Vec3::Y
    } else {
        Vec3::X
    };
    let tangent = helper.cross(normal).normalize();
    let bitangent = normal.cross(tangent);

    let project = |p: Vec3| Vec2::new(p.dot(tangent), p.dot(bitangent));
    let mut twice_area = 0.0;
    for (i, &p) in points.iter().enumerate() {
        let a = project(p);
        let b = project(points[(i + 1) % points.len()]);
        twice_area += a.x * b.y - b.x * a.y;
    }
    twice_area.abs() * 0.5
}

/// Surface area of the polygon's 3D bounding box: `2(xy + yz + zx)`.
///
/// Always at least twice the true area of a planar polygon and much looser for
/// tilted ones. Cheaper than [`polygon_area`], but over-assigns lights.
pub fn polygon_area_aabb_upper_bound(points: &[Vec3]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let size = Aabb::from_points(points.iter().copied()).size();
    2.0 * (size.x * size.y + size.y * size.z + size.z * size.x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Vec<Vec3> {
        vec![
            Vec3::new(-0.5, -0.5, 0.0),
            Vec3::new(0.5, -0.5, 0.0),
            Vec3::new(0.5, 0.5, 0.0),
            Vec3::new(-0.5, 0.5, 0.0),
        ]
    }

    #[test]
    fn square_area_is_one() {
        assert!((polygon_area(&unit_square()) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn triangle_base_one_height_one() {
        let tri = [
            Vec3::new(-0.5, -0.5, 0.0),
            Vec3::new(0.5, -0.5, 0.0),
            Vec3::new(0.0, 0.5, 0.0),
        ];
        assert!((polygon_area(&tri) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn area_ignores_winding() {
        let mut square = unit_square();
        square.reverse();
        assert!((polygon_area(&square) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn area_of_polygon_in_yz_plane() {
        // Normal along X forces the Y helper axis.
        let square: Vec<Vec3> = unit_square().iter().map(|p| Vec3::new(3.0, p.x, p.y)).collect();
        assert!((polygon_area(&square) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn area_degenerate_inputs() {
        assert_eq!(polygon_area(&[Vec3::ZERO, Vec3::X]), 0.0);
        assert_eq!(polygon_area(&[Vec3::ZERO, Vec3::X, Vec3::X * 2.0]), 0.0);
    }

    #[test]
    fn aabb_upper_bound_dominates_exact_area() {
        let rot = Quat::from_euler(glam::EulerRot::XYZ, 0.4, 1.1, -0.3);
        let square: Vec<Vec3> = unit_square().iter().map(|&p| rot * p).collect();
        assert!(polygon_area_aabb_upper_bound(&square) >= polygon_area(&square));
    }

    #[test]
    fn rotation_between_generic() {
        let q = rotation_between(Vec3::NEG_Z, Vec3::X);
        assert!((q * Vec3::NEG_Z - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn rotation_between_parallel_is_identity() {
        let q = rotation_between(Vec3::NEG_Z, Vec3::new(0.0, 0.0, -4.0));
        assert!(q.abs_diff_eq(Quat::IDENTITY, 1e-6));
    }

    #[test]
    fn rotation_between_antiparallel_flips() {
        let q = rotation_between(Vec3::NEG_Z, Vec3::Z);
        assert!(q.is_finite());
        assert!((q * Vec3::NEG_Z - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn rotation_between_zero_is_identity() {
        assert_eq!(rotation_between(Vec3::NEG_Z, Vec3::ZERO), Quat::IDENTITY);
    }

    #[test]
    fn cartesian_sets_w_to_one() {
        let p = to_cartesian(Vec4::new(2.0, 4.0, 6.0, 2.0));
        assert_eq!(p, Vec4::new(1.0, 2.0, 3.0, 1.0));
    }

    #[test]
    fn aabb_touching_faces_overlap() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        assert!(a.intersects(&b));
        let c = Aabb::new(Vec3::new(1.001, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn sphere_tangent_to_box_overlaps() {
        let b = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert!(Sphere::new(Vec3::new(3.0, 0.5, 0.5), 2.0).intersects_aabb(&b));
        assert!(!Sphere::new(Vec3::new(3.0, 0.5, 0.5), 1.99).intersects_aabb(&b));
    }

    #[test]
    fn sphere_contains_box() {
        let b = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert!(Sphere::new(Vec3::splat(0.5), 0.9).contains_aabb(&b));
        assert!(!Sphere::new(Vec3::splat(0.5), 0.8).contains_aabb(&b));
    }

    #[test]
    fn transform_matrix_scales_before_translating() {
        let t = Transform::from_xyz(1.0, 0.0, 0.0).with_scale(Vec3::new(2.0, 3.0, 1.0));
        let p = t.matrix() * Vec4::new(1.0, 1.0, 0.0, 1.0);
        assert!((p - Vec4::new(3.0, 3.0, 0.0, 1.0)).length() < 1e-6);
    }
}
