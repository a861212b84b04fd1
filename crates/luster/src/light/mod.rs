//! Light models: polygonal area lights and point lights.
//!
//! - [`shapes`]: the four area light outlines and their triangulations.
//! - [`area`]: construction, area, flux and influence radius of area lights.
//! - [`point`]: point lights and their attenuation range.
//! - [`gpu`]: shader-visible layouts of both, plus the cluster header.

pub mod area;
pub mod gpu;
pub mod point;
pub mod shapes;

pub use area::{AreaLight, AreaLightBounds, AreaLightDesc, Emission, Extent};
pub use gpu::{GpuAreaLight, GpuClusterHeader, GpuPointLight};
pub use point::{PointLight, point_light_range};
pub use shapes::{AreaShape, MAX_VERTICES, STAR_INDICES};
