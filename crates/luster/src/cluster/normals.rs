//! # Normal Bins — Splitting Clusters by Surface Orientation
//!
//! Two surfaces can share a spatial cluster while facing opposite ways: a
//! wall and the back of the wall, or the floor and a ceiling light fixture.
//! A light behind a surface can never illuminate it, so giving each
//! orientation its own light list shortens the lists further.
//!
//! Directions are quantized the way a cube map is addressed: the dominant
//! axis picks one of six faces (+X, −X, +Y, −Y, +Z, −Z), then the remaining
//! two components pick one of `n × n` cells on that face. That gives `6·n²`
//! bins:
//!
//! ```text
//! bin = face · n² + v · n + u
//! ```
//!
//! Each bin remembers a representative normal (the cell centre pushed onto
//! the unit sphere) and the half-angle of the cone around it that contains
//! every direction in the cell (reached at the cell corners).
//!
//! ## Back-Facing Rejection
//!
//! A receiver at `p` with normal `m` can be lit from `q` only if
//! `(q − p) · m > 0`. With `p` anywhere in the cluster box, `q` anywhere in
//! the light's emitter box and `m` anywhere in the bin's cone, the light can
//! be rejected when every difference `d = q − p` satisfies
//! `d · normal < −sin(θ) · |d|`. Both sides are bounded over the box of
//! possible differences, which keeps the test conservative: it may keep a
//! useless light but never drops a useful one.
//!
//! With a single bin the test is skipped entirely.

use crate::math::{Aabb, Vec3};

/// One orientation cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalBin {
    /// Unit representative normal (cell centre).
    pub normal: Vec3,
    /// Sine of the cone half-angle around `normal` covering the whole cell.
    pub sin_half_angle: f32,
}

impl NormalBin {
    /// Conservative check whether anything in `emitter` can light a surface
    /// inside `cluster` whose normal falls in this bin.
    pub fn may_receive(&self, emitter: &Aabb, cluster: &Aabb) -> bool {
        let d_min = emitter.min - cluster.max;
        let d_max = emitter.max - cluster.min;

        // Support of the difference box along the normal.
        let n = self.normal;
        let support = (n * d_min).max(n * d_max).element_sum();
        let longest = d_min.abs().max(d_max.abs()).length();

        support >= -self.sin_half_angle * longest
    }
}

/// Quantization of view-space normals into `6·n²` bins, or a single bin.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalBins {
    subdivisions: u32,
    bins: Vec<NormalBin>,
}

impl NormalBins {
    /// No normal clustering: everything maps to bin 0.
    pub fn single() -> Self {
        Self {
            subdivisions: 0,
            bins: Vec::new(),
        }
    }

    /// `6·n²` cube-face cells.
    pub fn cube(n: u32) -> Self {
        if n == 0 {
            return Self::single();
        }
        let mut bins = Vec::with_capacity((6 * n * n) as usize);
        for face in 0..6 {
            for v in 0..n {
                for u in 0..n {
                    bins.push(Self::make_bin(face, u, v, n));
                }
            }
        }
        Self {
            subdivisions: n,
            bins,
        }
    }

    pub fn len(&self) -> u32 {
        self.bins.len().max(1) as u32
    }

    pub fn is_single(&self) -> bool {
        self.subdivisions == 0
    }

    /// Bin data, or `None` when normal clustering is off.
    pub fn get(&self, bin: u32) -> Option<&NormalBin> {
        self.bins.get(bin as usize)
    }

    /// Bin index of a direction. Zero-length directions (and everything when
    /// clustering is off) map to bin 0.
    pub fn bin_for(&self, normal: Vec3) -> u32 {
        if self.is_single() {
            return 0;
        }
        let abs = normal.abs();
        let axis = if abs.x >= abs.y && abs.x >= abs.z {
            0
        } else if abs.y >= abs.z {
            1
        } else {
            2
        };
        let major = normal[axis];
        if major == 0.0 || !major.is_finite() {
            return 0;
        }
        let face = axis as u32 * 2 + u32::from(major < 0.0);
        let (tangent, bitangent) = face_basis(axis);
        let on_face = normal / major.abs();

        let n = self.subdivisions;
        let cell = |c: f32| (((c + 1.0) * 0.5 * n as f32) as u32).min(n - 1);
        let u = cell(on_face.dot(tangent));
        let v = cell(on_face.dot(bitangent));
        face * n * n + v * n + u
    }

    fn make_bin(face: u32, u: u32, v: u32, n: u32) -> NormalBin {
        let axis = (face / 2) as usize;
        let sign = if face % 2 == 0 { 1.0 } else { -1.0 };
        let (tangent, bitangent) = face_basis(axis);
        let mut major = Vec3::ZERO;
        major[axis] = sign;

        let at = |cu: f32, cv: f32| {
            let s = cu / n as f32 * 2.0 - 1.0;
            let t = cv / n as f32 * 2.0 - 1.0;
            (major + tangent * s + bitangent * t).normalize()
        };

        let normal = at(u as f32 + 0.5, v as f32 + 0.5);
        let min_cos = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]
            .iter()
            .map(|&(du, dv)| normal.dot(at(u as f32 + du, v as f32 + dv)))
            .fold(1.0f32, f32::min);

        NormalBin {
            normal,
            sin_half_angle: (1.0 - min_cos * min_cos).max(0.0).sqrt(),
        }
    }
}

/// In-face axes for the face perpendicular to `axis`.
fn face_basis(axis: usize) -> (Vec3, Vec3) {
    match axis {
        0 => (Vec3::Y, Vec3::Z),
        1 => (Vec3::Z, Vec3::X),
        _ => (Vec3::X, Vec3::Y),
    }
}
