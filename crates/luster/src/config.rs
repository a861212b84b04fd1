//! Tunable parameters for the clustering pipeline.
//!
//! Two groups: [`ClusterConfig`] shapes the grid and its per-cluster storage,
//! [`LightingParams`] controls how far each light reaches. Both are plain
//! structs with defaults and `with_*` builders, and both deserialize from JSON
//! (missing fields fall back to defaults):
//!
//! ```json
//! {
//!   "cluster": { "grid": [16, 9, 12], "max_lights_per_cluster": 128 },
//!   "lighting": { "min_perceivable_intensity": 0.02 }
//! }
//! ```
//!
//! Apart from [`Attenuation`], which is checked when built or deserialized,
//! nothing is checked on construction. [`Config::validate`] (called by the
//! loaders and by the pipeline whenever a config is applied) rejects bad
//! values with a [`ConfigError`] instead of substituting defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::math::UVec3;

/// Default per-cluster capacity of each light list.
pub const DEFAULT_MAX_LIGHTS_PER_CLUSTER: u32 = 200;

/// How view-space depth is split into slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DepthSlicing {
    /// Slice `k` starts at `near·(far/near)^(k/Gz)`. Slices grow with distance,
    /// roughly matching the size of screen tiles at that depth.
    #[default]
    Logarithmic,
    /// Equal-thickness slices between near and far.
    Linear,
}

/// Grid shape and storage of the cluster buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Tiles across, tiles up, depth slices.
    pub grid: UVec3,
    /// 1 disables normal clustering; otherwise `6·n²` cube-face cells.
    pub normal_bins: u32,
    /// Capacity of each cluster's point list and of its area list.
    pub max_lights_per_cluster: u32,
    /// Clusters per parallel work item in the assignment stage.
    pub batch_size: u32,
    pub depth_slicing: DepthSlicing,
}

impl ClusterConfig {
    /// Coarse grid for discrete GPUs: 16×9×12, batches of 64.
    pub fn discrete() -> Self {
        Self {
            grid: UVec3::new(16, 9, 12),
            normal_bins: 1,
            max_lights_per_cluster: DEFAULT_MAX_LIGHTS_PER_CLUSTER,
            batch_size: 64,
            depth_slicing: DepthSlicing::Logarithmic,
        }
    }

    /// Fine grid for integrated GPUs: 32×32×16, batches of 512.
    pub fn integrated() -> Self {
        Self {
            grid: UVec3::new(32, 32, 16),
            batch_size: 512,
            ..Self::discrete()
        }
    }

    pub fn with_grid(mut self, x: u32, y: u32, z: u32) -> Self {
        self.grid = UVec3::new(x, y, z);
        self
    }

    pub fn with_normal_bins(mut self, bins: u32) -> Self {
        self.normal_bins = bins;
        self
    }

    pub fn with_max_lights_per_cluster(mut self, max: u32) -> Self {
        self.max_lights_per_cluster = max;
        self
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_depth_slicing(mut self, slicing: DepthSlicing) -> Self {
        self.depth_slicing = slicing;
        self
    }

    /// Spatial clusters times normal bins.
    pub fn cluster_count(&self) -> u32 {
        self.grid.x * self.grid.y * self.grid.z * self.normal_bins
    }

    /// `n` such that `normal_bins == 6·n²`, or `None` when normal clustering
    /// is off or the count is not of that form.
    pub fn normal_subdivisions(&self) -> Option<u32> {
        if self.normal_bins <= 1 || self.normal_bins % 6 != 0 {
            return None;
        }
        let squared = self.normal_bins / 6;
        let n = (squared as f64).sqrt().round() as u32;
        (n * n == squared).then_some(n)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let UVec3 { x, y, z } = self.grid;
        if x == 0 || y == 0 || z == 0 {
            return Err(ConfigError::EmptyGrid { x, y, z });
        }
        if self.normal_bins == 0
            || (self.normal_bins > 1 && self.normal_subdivisions().is_none())
        {
            return Err(ConfigError::NormalBins(self.normal_bins));
        }
        if self.max_lights_per_cluster == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        let clusters = self.cluster_count();
        if self.batch_size == 0 || clusters % self.batch_size != 0 {
            return Err(ConfigError::BatchSize {
                clusters,
                batch_size: self.batch_size,
            });
        }
        Ok(())
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self::discrete()
    }
}

/// Point light attenuation `1 / (c + l·r + q·r²)`.
///
/// Fields are private so every value has passed [`Attenuation::new`]: the
/// quadratic term is always positive, including values loaded from JSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAttenuation")]
pub struct Attenuation {
    constant: f32,
    linear: f32,
    quadratic: f32,
}

/// Unchecked wire form of [`Attenuation`].
#[derive(Deserialize)]
struct RawAttenuation {
    constant: f32,
    linear: f32,
    quadratic: f32,
}

impl TryFrom<RawAttenuation> for Attenuation {
    type Error = ConfigError;

    fn try_from(raw: RawAttenuation) -> Result<Self, ConfigError> {
        Self::new(raw.constant, raw.linear, raw.quadratic)
    }
}

impl Attenuation {
    /// Checked constructor; `quadratic` must be > 0.
    pub fn new(constant: f32, linear: f32, quadratic: f32) -> Result<Self, ConfigError> {
        // Also rejects NaN.
        if !(quadratic > 0.0) {
            return Err(ConfigError::QuadraticAttenuation(quadratic));
        }
        Ok(Self {
            constant,
            linear,
            quadratic,
        })
    }

    pub fn constant(&self) -> f32 {
        self.constant
    }

    pub fn linear(&self) -> f32 {
        self.linear
    }

    pub fn quadratic(&self) -> f32 {
        self.quadratic
    }

    /// Attenuation factor at distance `r`.
    pub fn at(&self, r: f32) -> f32 {
        1.0 / (self.constant + self.linear * r + self.quadratic * r * r)
    }
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 2.5,
            quadratic: 5.0,
        }
    }
}

/// Parameters that decide how far lights reach.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingParams {
    /// Intensity below which a light's contribution is considered invisible.
    pub min_perceivable_intensity: f32,
    pub attenuation: Attenuation,
}

impl LightingParams {
    pub fn with_min_perceivable_intensity(mut self, threshold: f32) -> Self {
        self.min_perceivable_intensity = threshold;
        self
    }

    pub fn with_attenuation(mut self, attenuation: Attenuation) -> Self {
        self.attenuation = attenuation;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_perceivable_intensity > 0.0) {
            return Err(ConfigError::PerceivableThreshold(
                self.min_perceivable_intensity,
            ));
        }
        Ok(())
    }
}

impl Default for LightingParams {
    fn default() -> Self {
        Self {
            min_perceivable_intensity: 0.015,
            attenuation: Attenuation::default(),
        }
    }
}

/// Both parameter groups, as loaded from a file.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cluster: ClusterConfig,
    pub lighting: LightingParams,
}

impl Config {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Config =
            serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
        let config = Self::from_json_str(&text)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cluster.validate()?;
        self.lighting.validate()
    }
}
