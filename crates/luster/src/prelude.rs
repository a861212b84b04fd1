//! Convenience re-exports — `use luster::prelude::*` for the common items.

pub use crate::camera::{CameraParams, FreeCamera};
pub use crate::cluster::{AssignCounters, Cluster, ClusterGrid, ViewLights};
pub use crate::config::{Attenuation, ClusterConfig, Config, DepthSlicing, LightingParams};
pub use crate::error::ConfigError;
pub use crate::light::{
    AreaLight, AreaLightDesc, AreaShape, Emission, Extent, GpuAreaLight, GpuPointLight,
    PointLight,
};
pub use crate::math::{Aabb, Mat4, Quat, Sphere, Transform, Vec2, Vec3, Vec4};
pub use crate::pipeline::{ClusteredLighting, FrameStats, LightSelection, PipelineState};
pub use crate::rng::Rng;
pub use crate::scene::LightScene;
#[cfg(feature = "diagnostics")]
pub use crate::diag::{DiagSender, init_logger};
