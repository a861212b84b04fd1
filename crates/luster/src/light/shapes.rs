//! # Shapes — Area Light Vertex Templates
//!
//! Every area light starts life as one of four fixed outlines in local space:
//! centered on the origin, lying in the z = 0 plane, facing along
//! [`TEMPLATE_NORMAL`]. Construction scales, rotates and translates the
//! template into the world; nothing ever changes the vertex count or order
//! afterwards.
//!
//! ```text
//!   Triangle        Quad          Pentagon         Star
//!
//!      2          3 ─── 2           3             6
//!     / \         │     │         /   \        8  7 5  4
//!    /   \        │     │        4     2        9  ·  3
//!   0 ─── 1       0 ─── 1         \   /        0  1  2
//!                                  0─1
//! ```
//!
//! ## Why the Star Is Pre-Triangulated
//!
//! The triangle, quad and pentagon are convex: a triangle fan from vertex 0
//! covers them exactly. The star is concave, so a fan would spill outside its
//! outline. Rather than ear-clip at runtime, its triangulation is a fixed
//! index table ([`STAR_INDICES`]): five tip triangles plus three covering the
//! inner pentagon. Since transforms only move vertices, the table stays valid
//! for every star ever built.
//!
//! ## Comparison
//!
//! - **Unreal / Unity**: area lights are limited to rectangles and discs, whose
//!   shading integrals have closed forms. Arbitrary polygons need the polygon
//!   form of LTC shading, which takes vertex lists like these directly.
//! - **Blender (Cycles)**: supports square, rectangle, disk and ellipse shapes.

use crate::error::ConfigError;
use crate::math::Vec3;

/// Most vertices any shape has.
pub const MAX_VERTICES: usize = 10;

/// Facing direction of every template before construction rotates it.
pub const TEMPLATE_NORMAL: Vec3 = Vec3::NEG_Z;

const TRIANGLE: [[f32; 2]; 3] = [[-0.5, -0.5], [0.5, -0.5], [0.0, 0.5]];

const QUAD: [[f32; 2]; 4] = [[-0.5, -0.5], [0.5, -0.5], [0.5, 0.5], [-0.5, 0.5]];

const PENTAGON: [[f32; 2]; 5] = [[-0.3, -0.5], [0.3, -0.5], [0.5, 0.3], [0.0, 0.8], [-0.5, 0.3]];

const STAR: [[f32; 2]; 10] = [
    [-0.3536, -0.3536],
    [-0.0313, -0.1975],
    [0.2270, -0.4455],
    [0.1782, -0.0908],
    [0.4939, 0.0782],
    [0.1414, 0.1414],
    [0.0782, 0.4939],
    [-0.0908, 0.1782],
    [-0.4455, 0.2270],
    [-0.1975, -0.0313],
];

/// Fixed triangulation of the star outline: 8 triangles.
pub const STAR_INDICES: [u32; 24] = [
    // tips
    9, 0, 1, 1, 2, 3, 3, 4, 5, 5, 6, 7, 7, 8, 9, //
    // inner pentagon
    7, 9, 1, 7, 1, 3, 7, 3, 5,
];

/// Outline of an area light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AreaShape {
    Triangle,
    Quad,
    Pentagon,
    Star,
}

impl AreaShape {
    pub const ALL: [AreaShape; 4] = [
        AreaShape::Triangle,
        AreaShape::Quad,
        AreaShape::Pentagon,
        AreaShape::Star,
    ];

    /// Shape with `n` vertices; only 3, 4, 5 and 10 exist.
    pub fn from_vertex_count(n: u32) -> Result<Self, ConfigError> {
        match n {
            3 => Ok(AreaShape::Triangle),
            4 => Ok(AreaShape::Quad),
            5 => Ok(AreaShape::Pentagon),
            10 => Ok(AreaShape::Star),
            other => Err(ConfigError::InvalidShape(other)),
        }
    }

    pub fn vertex_count(self) -> usize {
        self.template().len()
    }

    /// Only the star is concave.
    pub fn is_convex(self) -> bool {
        self != AreaShape::Star
    }

    /// Local-space outline, counter-clockwise in the xy plane.
    pub fn template(self) -> &'static [[f32; 2]] {
        match self {
            AreaShape::Triangle => &TRIANGLE,
            AreaShape::Quad => &QUAD,
            AreaShape::Pentagon => &PENTAGON,
            AreaShape::Star => &STAR,
        }
    }

    /// Template vertices as 3D points in the z = 0 plane.
    pub fn template_points(self) -> impl Iterator<Item = Vec3> {
        self.template().iter().map(|&[x, y]| Vec3::new(x, y, 0.0))
    }

    /// Triangle list covering the outline: a fan from vertex 0 for convex
    /// shapes, [`STAR_INDICES`] for the star.
    pub fn triangle_indices(self) -> Vec<u32> {
        if self == AreaShape::Star {
            return STAR_INDICES.to_vec();
        }
        let n = self.vertex_count() as u32;
        (1..n - 1).flat_map(|i| [0, i, i + 1]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::polygon_area;

    fn triangle_area(a: Vec3, b: Vec3, c: Vec3) -> f32 {
        (b - a).cross(c - a).length() * 0.5
    }

    #[test]
    fn vertex_counts() {
        for shape in AreaShape::ALL {
            let n = shape.vertex_count();
            assert!(n <= MAX_VERTICES);
            assert_eq!(AreaShape::from_vertex_count(n as u32), Ok(shape));
        }
        assert_eq!(
            AreaShape::from_vertex_count(6),
            Err(ConfigError::InvalidShape(6))
        );
    }

    #[test]
    fn star_has_eight_triangles() {
        let idx = AreaShape::Star.triangle_indices();
        assert_eq!(idx.len(), 24);
        assert!(idx.iter().all(|&i| (i as usize) < 10));
    }

    #[test]
    fn fan_counts() {
        assert_eq!(AreaShape::Triangle.triangle_indices(), vec![0, 1, 2]);
        assert_eq!(AreaShape::Quad.triangle_indices(), vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(AreaShape::Pentagon.triangle_indices().len(), 9);
    }

    #[test]
    fn triangulation_covers_outline() {
        // Sum of triangle areas equals the shoelace area for every shape.
        for shape in AreaShape::ALL {
            let pts: Vec<Vec3> = shape.template_points().collect();
            let tri_sum: f32 = shape
                .triangle_indices()
                .chunks(3)
                .map(|t| triangle_area(pts[t[0] as usize], pts[t[1] as usize], pts[t[2] as usize]))
                .sum();
            assert!((tri_sum - polygon_area(&pts)).abs() < 1e-3, "{shape:?}");
        }
    }

    #[test]
    fn templates_wind_counter_clockwise() {
        for shape in AreaShape::ALL {
            let t = shape.template();
            let signed: f32 = (0..t.len())
                .map(|i| {
                    let [ax, ay] = t[i];
                    let [bx, by] = t[(i + 1) % t.len()];
                    ax * by - bx * ay
                })
                .sum();
            assert!(signed > 0.0, "{shape:?}");
        }
    }
}
