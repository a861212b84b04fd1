//! Color helpers for light generation and flux estimation.

use crate::math::Vec3;

/// Rec. 709 luma weights.
pub const LUMA_WEIGHTS: Vec3 = Vec3::new(0.2126, 0.7152, 0.0722);

/// Convert HSV (each in [0, 1]) to linear RGB.
///
/// Hue wraps: 1.0 is red again, as is any value past a whole turn.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Vec3 {
    let h6 = h.rem_euclid(1.0) * 6.0;
    let sector = h6.floor();
    let f = h6 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    match sector as u32 % 6 {
        0 => Vec3::new(v, t, p),
        1 => Vec3::new(q, v, p),
        2 => Vec3::new(p, v, t),
        3 => Vec3::new(p, q, v),
        4 => Vec3::new(t, p, v),
        _ => Vec3::new(v, p, q),
    }
}

/// Perceptual luminance of a linear RGB color.
pub fn luminance(rgb: Vec3) -> f32 {
    rgb.dot(LUMA_WEIGHTS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_hues() {
        assert!((hsv_to_rgb(0.0, 1.0, 1.0) - Vec3::X).length() < 1e-6);
        assert!((hsv_to_rgb(1.0 / 3.0, 1.0, 1.0) - Vec3::Y).length() < 1e-5);
        assert!((hsv_to_rgb(2.0 / 3.0, 1.0, 1.0) - Vec3::Z).length() < 1e-5);
        assert!((hsv_to_rgb(1.0, 1.0, 1.0) - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn zero_saturation_is_grey() {
        let c = hsv_to_rgb(0.37, 0.0, 0.5);
        assert!((c - Vec3::splat(0.5)).length() < 1e-6);
    }

    #[test]
    fn white_luminance_is_one() {
        assert!((luminance(Vec3::ONE) - 1.0).abs() < 1e-6);
    }
}
