//! Grid geometry: depth slicing, index linearization and cluster AABBs.
//!
//! The same functions serve the grid build (cluster → volume) and the
//! shading lookup (pixel + depth → cluster), so both always agree on where a
//! cluster is.
//!
//! Cluster `(x, y, z)` covers screen tile `(x, y)` (tiles counted from the
//! bottom-left corner) between depth slices `z` and `z + 1`. The tile's four
//! corners are unprojected onto the near plane through the inverse projection,
//! giving four view rays from the eye; sliding them out to the slice's near
//! and far depths gives the eight corners of the frustum-shaped cell:
//!
//! ```text
//!        eye ·─────────────── near plane
//!              ╲   ╲
//!               ╲   ╲  slice z
//!                ╲___╲________ depth z_k
//!                 ╲   ╲
//!                  ╲___╲______ depth z_(k+1)
//! ```

use crate::camera::CameraParams;
use crate::config::DepthSlicing;
use crate::math::{Aabb, UVec3, Vec2, Vec3, Vec4};

/// Position of a cluster in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClusterCoord {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub bin: u32,
}

impl ClusterCoord {
    pub fn new(x: u32, y: u32, z: u32, bin: u32) -> Self {
        Self { x, y, z, bin }
    }

    /// `((bin·Gz + z)·Gy + y)·Gx + x`
    pub fn linear_index(&self, dims: UVec3) -> usize {
        (((self.bin * dims.z + self.z) * dims.y + self.y) * dims.x + self.x) as usize
    }

    /// Inverse of [`linear_index`](Self::linear_index). Zero dimensions are
    /// treated as 1.
    pub fn from_linear_index(index: usize, dims: UVec3) -> Self {
        let dims = dims.max(UVec3::ONE);
        let i = index as u32;
        let x = i % dims.x;
        let y = (i / dims.x) % dims.y;
        let z = (i / (dims.x * dims.y)) % dims.z;
        let bin = i / (dims.x * dims.y * dims.z);
        Self { x, y, z, bin }
    }
}

/// View-space distance (positive) where slice `k` of `slices` begins.
/// `k == slices` gives `far`. Zero slices is treated as one.
pub fn slice_depth(k: u32, slices: u32, near: f32, far: f32, slicing: DepthSlicing) -> f32 {
    let t = k as f32 / slices.max(1) as f32;
    match slicing {
        DepthSlicing::Logarithmic => near * (far / near).powf(t),
        DepthSlicing::Linear => near + (far - near) * t,
    }
}

/// Slice containing view-space distance `depth`, clamped to the grid. Zero
/// slices always gives slice 0.
pub fn slice_for_depth(depth: f32, slices: u32, near: f32, far: f32, slicing: DepthSlicing) -> u32 {
    let t = match slicing {
        DepthSlicing::Logarithmic => (depth / near).ln() / (far / near).ln(),
        DepthSlicing::Linear => (depth - near) / (far - near),
    };
    // NaN (depth <= 0 on the log path) lands in slice 0.
    let k = (t * slices as f32).floor();
    if k.is_nan() || k < 0.0 {
        0
    } else {
        (k as u32).min(slices.saturating_sub(1))
    }
}

/// Screen tile containing a pixel, origin bottom-left, clamped to the grid.
/// Zero tiles or a zero-sized screen give tile 0 on that axis.
pub fn tile_for_pixel(pixel: Vec2, width: u32, height: u32, tiles_x: u32, tiles_y: u32) -> (u32, u32) {
    let tile = |p: f32, extent: u32, tiles: u32| {
        let t = (p / extent as f32 * tiles as f32).floor();
        if t.is_nan() || t < 0.0 {
            0
        } else {
            (t as u32).min(tiles.saturating_sub(1))
        }
    };
    (tile(pixel.x, width, tiles_x), tile(pixel.y, height, tiles_y))
}

/// Point on the near plane under normalized device coordinates `ndc`.
fn unproject_to_near(ndc: Vec2, camera: &CameraParams) -> Vec3 {
    let p = camera.inverse_projection * Vec4::new(ndc.x, ndc.y, -1.0, 1.0);
    p.truncate() / p.w
}

/// View-space AABB of the cell at tile `(x, y)`, slice `z`.
pub fn cluster_aabb(
    x: u32,
    y: u32,
    z: u32,
    dims: UVec3,
    camera: &CameraParams,
    slicing: DepthSlicing,
) -> Aabb {
    let ndc = |tx: u32, ty: u32| {
        Vec2::new(
            -1.0 + 2.0 * tx as f32 / dims.x as f32,
            -1.0 + 2.0 * ty as f32 / dims.y as f32,
        )
    };
    let rays = [
        unproject_to_near(ndc(x, y), camera),
        unproject_to_near(ndc(x + 1, y), camera),
        unproject_to_near(ndc(x, y + 1), camera),
        unproject_to_near(ndc(x + 1, y + 1), camera),
    ];

    let near_depth = slice_depth(z, dims.z, camera.near, camera.far, slicing);
    let far_depth = slice_depth(z + 1, dims.z, camera.near, camera.far, slicing);

    // Points on the near plane sit at distance `near`; scale along the ray.
    let scales = [near_depth / camera.near, far_depth / camera.near];
    Aabb::from_points(
        rays.iter()
            .flat_map(|&ray| scales.iter().map(move |&s| ray * s)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Mat4;

    fn camera() -> CameraParams {
        CameraParams::perspective(Mat4::IDENTITY, 60f32.to_radians(), 1280, 720, 0.1, 1000.0)
            .unwrap()
    }

    #[test]
    fn linear_index_round_trips() {
        let dims = UVec3::new(16, 9, 12);
        let coord = ClusterCoord::new(5, 8, 11, 3);
        let i = coord.linear_index(dims);
        assert_eq!(i, ((3 * 12 + 11) * 9 + 8) * 16 + 5);
        assert_eq!(ClusterCoord::from_linear_index(i, dims), coord);
    }

    #[test]
    fn slices_span_near_to_far() {
        for slicing in [DepthSlicing::Logarithmic, DepthSlicing::Linear] {
            assert!((slice_depth(0, 12, 0.1, 1000.0, slicing) - 0.1).abs() < 1e-6);
            assert!((slice_depth(12, 12, 0.1, 1000.0, slicing) - 1000.0).abs() < 1e-2);
        }
    }

    #[test]
    fn lookup_matches_build() {
        for slicing in [DepthSlicing::Logarithmic, DepthSlicing::Linear] {
            for k in 0..12 {
                let lo = slice_depth(k, 12, 0.1, 1000.0, slicing);
                let hi = slice_depth(k + 1, 12, 0.1, 1000.0, slicing);
                let mid = match slicing {
                    DepthSlicing::Logarithmic => (lo * hi).sqrt(),
                    DepthSlicing::Linear => 0.5 * (lo + hi),
                };
                assert_eq!(slice_for_depth(mid, 12, 0.1, 1000.0, slicing), k);
            }
        }
    }

    #[test]
    fn out_of_range_depth_clamps() {
        let log = DepthSlicing::Logarithmic;
        assert_eq!(slice_for_depth(0.0, 12, 0.1, 1000.0, log), 0);
        assert_eq!(slice_for_depth(-5.0, 12, 0.1, 1000.0, log), 0);
        assert_eq!(slice_for_depth(5000.0, 12, 0.1, 1000.0, log), 11);
    }

    #[test]
    fn pixel_tiles_clamp() {
        assert_eq!(tile_for_pixel(Vec2::new(0.0, 0.0), 1280, 720, 16, 9), (0, 0));
        assert_eq!(tile_for_pixel(Vec2::new(1279.5, 719.5), 1280, 720, 16, 9), (15, 8));
        assert_eq!(tile_for_pixel(Vec2::new(1280.0, 720.0), 1280, 720, 16, 9), (15, 8));
        assert_eq!(tile_for_pixel(Vec2::new(79.0, 81.0), 1280, 720, 16, 9), (0, 1));
    }

    #[test]
    fn zero_sized_inputs_clamp_to_origin() {
        let log = DepthSlicing::Logarithmic;
        assert_eq!(slice_for_depth(5.0, 0, 0.1, 1000.0, log), 0);
        assert!(slice_depth(1, 0, 0.1, 1000.0, log).is_finite());
        assert_eq!(tile_for_pixel(Vec2::new(10.0, 10.0), 1280, 720, 0, 0), (0, 0));
        assert_eq!(tile_for_pixel(Vec2::new(10.0, 10.0), 0, 0, 16, 9), (15, 8));
        assert_eq!(
            ClusterCoord::from_linear_index(7, UVec3::new(4, 0, 0)),
            ClusterCoord::new(3, 0, 0, 1)
        );
    }

    #[test]
    fn near_plane_unprojects_to_near_depth() {
        let cam = camera();
        let p = unproject_to_near(Vec2::new(0.3, -0.7), &cam);
        assert!((p.z + cam.near).abs() < 1e-5);
    }

    #[test]
    fn cluster_aabb_depth_extent() {
        let cam = camera();
        let dims = UVec3::new(16, 9, 12);
        let slicing = DepthSlicing::Logarithmic;
        let aabb = cluster_aabb(7, 4, 3, dims, &cam, slicing);
        let lo = slice_depth(3, 12, cam.near, cam.far, slicing);
        let hi = slice_depth(4, 12, cam.near, cam.far, slicing);
        assert!((aabb.max.z + lo).abs() < 1e-3 * lo);
        assert!((aabb.min.z + hi).abs() < 1e-3 * hi);
        assert!(aabb.min.cmple(aabb.max).all());
    }
}
