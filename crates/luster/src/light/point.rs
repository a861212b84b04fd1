//! Point lights and their attenuation range.

use crate::config::Attenuation;
use crate::math::{Mat4, Vec3};
use crate::rng::Rng;

/// Per-channel color range of randomly spawned point lights.
pub const RANDOM_COLOR: (f32, f32) = (0.1, 1.0);

/// An omnidirectional emitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl PointLight {
    pub fn new(position: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            position,
            color,
            intensity,
        }
    }

    /// Random color with each channel in [`RANDOM_COLOR`]; intensity
    /// `10 / |color|` so dim colors are not also dim lights.
    pub fn random_color(position: Vec3, rng: &mut Rng) -> Self {
        let color = rng.range_vec3(Vec3::splat(RANDOM_COLOR.0), Vec3::splat(RANDOM_COLOR.1));
        Self::new(position, color, 10.0 / color.length())
    }

    /// Range at which this light fades below `min_perceivable`.
    pub fn range(&self, min_perceivable: f32, attenuation: &Attenuation) -> f32 {
        point_light_range(self.intensity, min_perceivable, attenuation)
    }

    pub fn view_position(&self, view: &Mat4) -> Vec3 {
        view.transform_point3(self.position)
    }
}

/// Distance `r` where `intensity / (c + l·r + q·r²)` drops to
/// `min_perceivable`: the positive root of
///
/// ```text
/// q·r² + l·r + (c − intensity / min_perceivable) = 0
/// ```
///
/// A negative discriminant has no real crossing and gives 0. The result is
/// never negative. The quadratic term of any [`Attenuation`] is positive, so
/// the division is always defined.
pub fn point_light_range(intensity: f32, min_perceivable: f32, attenuation: &Attenuation) -> f32 {
    let (c, l, q) = (
        attenuation.constant(),
        attenuation.linear(),
        attenuation.quadratic(),
    );
    let discriminant = l * l - 4.0 * q * (c - intensity / min_perceivable);
    if discriminant < 0.0 {
        log::trace!("point light range: negative discriminant {discriminant}, using 0");
        return 0.0;
    }
    ((-l + discriminant.sqrt()) / (2.0 * q)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn range_positive_and_reaches_threshold() {
        let att = Attenuation::new(1.0, 2.5, 5.0).unwrap();
        let min = 0.015;
        let r = point_light_range(8.0, min, &att);
        assert!(r.is_finite() && r > 0.0);
        // At the range the attenuated intensity is back down to the threshold.
        let at_range = 8.0 * att.at(r);
        assert!(at_range <= min * 1.001, "{at_range}");
        assert!(8.0 * att.at(r * 0.9) > min);
    }

    #[test]
    fn negative_discriminant_gives_zero() {
        // c large relative to intensity/min with l = 0.
        let att = Attenuation::new(1000.0, 0.0, 1.0).unwrap();
        assert_eq!(point_light_range(1.0, 0.015, &att), 0.0);
    }

    #[test]
    fn zero_quadratic_never_reaches_range() {
        // The degenerate inputs that would divide by zero cannot be built.
        for (c, l) in [(1.0, 2.5), (1.0, 0.0), (1.0, -1.0)] {
            assert_eq!(
                Attenuation::new(c, l, 0.0),
                Err(ConfigError::QuadraticAttenuation(0.0))
            );
        }
        let loaded = serde_json::from_str::<Attenuation>(
            r#"{ "constant": 1.0, "linear": -1.0, "quadratic": 0.0 }"#,
        );
        assert!(loaded.is_err());
        let tiny = Attenuation::new(1.0, -1.0, 1e-3).unwrap();
        assert!(point_light_range(8.0, 0.015, &tiny).is_finite());
    }

    #[test]
    fn range_never_negative() {
        let att = Attenuation::default();
        for intensity in [0.0, 0.001, 0.01, 1.0, 100.0] {
            assert!(point_light_range(intensity, 0.015, &att) >= 0.0);
        }
    }

    #[test]
    fn random_color_intensity() {
        let mut rng = Rng::from_seed(12345);
        let light = PointLight::random_color(Vec3::ZERO, &mut rng);
        assert!((light.intensity * light.color.length() - 10.0).abs() < 1e-4);
        assert!(light.color.min_element() >= RANDOM_COLOR.0);
    }
}
