//! Camera: the fly-through [`FreeCamera`] and the per-frame [`CameraParams`]
//! the clustering pipeline consumes.
//!
//! Conventions are OpenGL's: right-handed view space looking down −Z, clip
//! space depth in [−1, 1].

use crate::error::ConfigError;
use crate::math::{Mat4, Vec3};

/// Everything the grid builder and lookup need to know about the camera for
/// one frame. Built through [`CameraParams::perspective`], which validates the
/// planes and resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraParams {
    pub view: Mat4,
    pub projection: Mat4,
    pub inverse_projection: Mat4,
    pub near: f32,
    pub far: f32,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub aspect: f32,
    pub width: u32,
    pub height: u32,
}

impl CameraParams {
    pub fn perspective(
        view: Mat4,
        fov_y: f32,
        width: u32,
        height: u32,
        near: f32,
        far: f32,
    ) -> Result<Self, ConfigError> {
        if !(near > 0.0) {
            return Err(ConfigError::Camera(format!("near plane must be > 0, got {near}")));
        }
        if !(far > near) {
            return Err(ConfigError::Camera(format!(
                "far plane {far} must be beyond near plane {near}"
            )));
        }
        if !(fov_y > 0.0 && fov_y < std::f32::consts::PI) {
            return Err(ConfigError::Camera(format!("field of view {fov_y} out of (0, pi)")));
        }
        if width == 0 || height == 0 {
            return Err(ConfigError::Camera(format!("empty resolution {width}x{height}")));
        }

        let aspect = width as f32 / height as f32;
        let projection = Mat4::perspective_rh_gl(fov_y, aspect, near, far);
        Ok(Self {
            view,
            projection,
            inverse_projection: projection.inverse(),
            near,
            far,
            fov_y,
            aspect,
            width,
            height,
        })
    }

    /// Projection and resolution equal; only the view may differ.
    ///
    /// Cluster AABBs live in view space, so they only depend on this part.
    pub fn same_projection(&self, other: &CameraParams) -> bool {
        self.projection == other.projection
            && self.width == other.width
            && self.height == other.height
    }
}

/// A mouse-look camera: position plus pitch and yaw, no roll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeCamera {
    pub position: Vec3,
    pitch: f32,
    yaw: f32,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub width: u32,
    pub height: u32,
}

impl FreeCamera {
    /// At `position` looking down −Z, 60° fov, 1280×720, planes 0.1 and 1000.
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            pitch: 0.0,
            yaw: 0.0,
            fov_y: 60f32.to_radians(),
            near: 0.1,
            far: 1000.0,
            width: 1280,
            height: 720,
        }
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_planes(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    pub fn with_fov_y(mut self, fov_y: f32) -> Self {
        self.fov_y = fov_y;
        self
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Turn by the given angles. Pitch is clamped to ±π/2, yaw wraps into
    /// [0, 2π).
    pub fn rotate(&mut self, d_yaw: f32, d_pitch: f32) {
        use std::f32::consts::{FRAC_PI_2, TAU};
        self.pitch = (self.pitch + d_pitch).clamp(-FRAC_PI_2, FRAC_PI_2);
        self.yaw = (self.yaw + d_yaw).rem_euclid(TAU);
    }

    /// Move relative to the current yaw; `up` is always world +Y.
    pub fn translate_local(&mut self, forward: f32, right: f32, up: f32) {
        let (sin, cos) = self.yaw.sin_cos();
        self.position.x += sin * forward + cos * right;
        self.position.z += sin * right - cos * forward;
        self.position.y += up;
    }

    /// `Rx(pitch) · Ry(yaw) · T(−position)`.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_x(self.pitch)
            * Mat4::from_rotation_y(self.yaw)
            * Mat4::from_translation(-self.position)
    }

    /// World-space direction of view-space +Z, i.e. pointing back out of the
    /// screen. Spawned area lights use it as their normal.
    pub fn backward(&self) -> Vec3 {
        self.view_matrix().row(2).truncate()
    }

    /// World-space viewing direction.
    pub fn forward(&self) -> Vec3 {
        -self.backward()
    }

    pub fn params(&self) -> Result<CameraParams, ConfigError> {
        CameraParams::perspective(
            self.view_matrix(),
            self.fov_y,
            self.width,
            self.height,
            self.near,
            self.far,
        )
    }
}

impl Default for FreeCamera {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_planes_rejected() {
        let cam = FreeCamera::new(Vec3::ZERO);
        assert!(cam.with_planes(0.0, 10.0).params().is_err());
        assert!(cam.with_planes(5.0, 1.0).params().is_err());
        assert!(cam.with_resolution(0, 720).params().is_err());
        assert!(cam.params().is_ok());
    }

    #[test]
    fn default_looks_down_negative_z() {
        let cam = FreeCamera::new(Vec3::ZERO);
        assert!((cam.forward() - Vec3::NEG_Z).length() < 1e-6);
        assert!((cam.backward() - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn pitch_clamps_and_yaw_wraps() {
        let mut cam = FreeCamera::new(Vec3::ZERO);
        cam.rotate(-0.5, 10.0);
        assert!((cam.pitch() - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert!((0.0..std::f32::consts::TAU).contains(&cam.yaw()));
        assert!((cam.yaw() - (std::f32::consts::TAU - 0.5)).abs() < 1e-5);
    }

    #[test]
    fn forward_motion_follows_view() {
        let mut cam = FreeCamera::new(Vec3::ZERO);
        cam.rotate(0.7, 0.0);
        let forward = cam.forward();
        cam.translate_local(2.0, 0.0, 0.0);
        assert!((cam.position - forward * 2.0).length() < 1e-5);
    }

    #[test]
    fn view_moves_camera_to_origin() {
        let mut cam = FreeCamera::new(Vec3::new(3.0, 1.0, -2.0));
        cam.rotate(1.2, 0.3);
        let p = cam.view_matrix().transform_point3(cam.position);
        assert!(p.length() < 1e-5);
    }
}
