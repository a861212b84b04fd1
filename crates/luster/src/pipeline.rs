//! # Pipeline — Per-Frame Clustered Lighting
//!
//! [`ClusteredLighting`] owns the cluster buffer and runs the frame:
//!
//! ```text
//! prepare lights ─▶ build grid ─▶ assign ─▶ (shading reads lists)
//!   view space      stage 1       stage 2
//! ```
//!
//! It has two states. **Disabled** holds no buffer; shading iterates every
//! light ([`LightSelection::All`]). **Enabled** holds a [`ClusterGrid`] sized
//! for the current config. The buffer is allocated on Disabled → Enabled,
//! dropped on Enabled → Disabled, and reallocated from scratch whenever the
//! cluster config changes while enabled. State only changes between frames:
//! every method that changes it takes `&mut self`, as does
//! [`run_frame`](ClusteredLighting::run_frame).
//!
//! Cluster AABBs live in view space, so moving the camera does not require a
//! grid rebuild; only a new projection or resolution does.

use std::time::Instant;

use serde::Serialize;

use crate::camera::CameraParams;
use crate::cluster::{AssignCounters, Cluster, ClusterGrid, ViewLights};
use crate::config::{ClusterConfig, Config, LightingParams};
use crate::error::ConfigError;
use crate::light::{GpuAreaLight, GpuPointLight};
use crate::math::{Vec2, Vec3};
use crate::scene::LightScene;

/// Coarse state of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// No clustering; shading walks every light.
    Disabled,
    /// Grid build and assignment run every frame.
    Enabled,
}

/// Everything measured during one [`ClusteredLighting::run_frame`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FrameStats {
    pub frame: u64,
    /// Whether clustering ran this frame.
    pub clustered: bool,
    pub point_lights: usize,
    pub area_lights: usize,
    /// Clusters in the grid (0 when disabled).
    pub clusters: usize,
    pub counters: AssignCounters,
    /// Longest point or area list of any cluster.
    pub max_occupancy: usize,
    /// Mean lights (point + area) per cluster.
    pub mean_occupancy: f32,
    pub empty_clusters: usize,
    /// Whether stage 1 ran this frame.
    pub grid_rebuilt: bool,
    pub prepare_us: f64,
    pub build_us: f64,
    pub assign_us: f64,
}

impl FrameStats {
    pub fn total_us(&self) -> f64 {
        self.prepare_us + self.build_us + self.assign_us
    }
}

/// The lights a shaded point has to evaluate.
#[derive(Debug, Clone, Copy)]
pub enum LightSelection<'a> {
    /// Brute force: every light of the frame.
    All {
        point_count: usize,
        area_count: usize,
    },
    /// The lists of one cluster.
    Cluster(&'a Cluster),
}

impl<'a> LightSelection<'a> {
    /// Point light indices to evaluate.
    pub fn point_lights(&self) -> Box<dyn Iterator<Item = u32> + 'a> {
        match *self {
            LightSelection::All { point_count, .. } => Box::new(0..point_count as u32),
            LightSelection::Cluster(cluster) => {
                Box::new(cluster.point_light_indices().iter().copied())
            }
        }
    }

    /// `(area light index, partial)`. Without clustering nothing is known
    /// about coverage, so every light is partial.
    pub fn area_lights(&self) -> Box<dyn Iterator<Item = (u32, bool)> + 'a> {
        match *self {
            LightSelection::All { area_count, .. } => {
                Box::new((0..area_count as u32).map(|i| (i, true)))
            }
            LightSelection::Cluster(cluster) => Box::new(cluster.area_lights()),
        }
    }

    pub fn is_clustered(&self) -> bool {
        matches!(self, LightSelection::Cluster(_))
    }
}

/// The clustered light culling pipeline.
pub struct ClusteredLighting {
    config: Config,
    grid: Option<ClusterGrid>,
    view_lights: ViewLights,
    stats: FrameStats,
    frame: u64,
    overflowing: bool,
}

impl ClusteredLighting {
    /// Validate `config`. The pipeline starts Disabled.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            grid: None,
            view_lights: ViewLights::default(),
            stats: FrameStats::default(),
            frame: 0,
            overflowing: false,
        })
    }

    /// Validate `config` and start Enabled.
    pub fn enabled(config: Config) -> Result<Self, ConfigError> {
        let mut pipeline = Self::new(config)?;
        pipeline.enable()?;
        Ok(pipeline)
    }

    pub fn state(&self) -> PipelineState {
        if self.grid.is_some() {
            PipelineState::Enabled
        } else {
            PipelineState::Disabled
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.grid.is_some()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Allocate the cluster buffer. No-op when already enabled.
    pub fn enable(&mut self) -> Result<(), ConfigError> {
        if self.grid.is_none() {
            self.grid = Some(ClusterGrid::new(self.config.cluster)?);
            log::info!("Clustered lighting enabled");
        }
        Ok(())
    }

    /// Drop the cluster buffer; shading falls back to all lights.
    pub fn disable(&mut self) {
        if self.grid.take().is_some() {
            self.overflowing = false;
            log::info!("Clustered lighting disabled");
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), ConfigError> {
        if enabled {
            self.enable()
        } else {
            self.disable();
            Ok(())
        }
    }

    /// Replace the cluster config. While enabled the buffer is reallocated
    /// before the next frame. An invalid config leaves everything unchanged.
    pub fn set_cluster_config(&mut self, cluster: ClusterConfig) -> Result<(), ConfigError> {
        cluster.validate()?;
        if self.grid.is_some() {
            self.grid = Some(ClusterGrid::new(cluster)?);
        }
        self.config.cluster = cluster;
        Ok(())
    }

    pub fn set_max_lights_per_cluster(&mut self, max: u32) -> Result<(), ConfigError> {
        self.set_cluster_config(self.config.cluster.with_max_lights_per_cluster(max))
    }

    /// Replace the light reach parameters; takes effect next frame.
    pub fn set_lighting(&mut self, lighting: LightingParams) -> Result<(), ConfigError> {
        lighting.validate()?;
        self.config.lighting = lighting;
        Ok(())
    }

    /// Run one frame: prepare the lights and, when enabled, rebuild the grid
    /// if the projection changed, then reassign every cluster.
    pub fn run_frame(&mut self, camera: &CameraParams, scene: &LightScene) -> &FrameStats {
        self.frame += 1;
        let mut stats = FrameStats {
            frame: self.frame,
            point_lights: scene.point_lights().len(),
            area_lights: scene.area_lights().len(),
            ..FrameStats::default()
        };

        let start = Instant::now();
        self.view_lights
            .prepare_into(scene, &camera.view, &self.config.lighting);
        stats.prepare_us = start.elapsed().as_secs_f64() * 1e6;

        if let Some(grid) = self.grid.as_mut() {
            let stale = grid.camera().is_none_or(|built| !built.same_projection(camera));
            if stale {
                let start = Instant::now();
                grid.build(camera);
                stats.build_us = start.elapsed().as_secs_f64() * 1e6;
                stats.grid_rebuilt = true;
            }

            let start = Instant::now();
            stats.counters = grid.assign(&self.view_lights);
            stats.assign_us = start.elapsed().as_secs_f64() * 1e6;

            stats.clustered = true;
            stats.clusters = grid.len();
            let mut total = 0;
            for cluster in grid.clusters() {
                let n = cluster.light_count();
                total += n;
                stats.empty_clusters += usize::from(n == 0);
                stats.max_occupancy = stats
                    .max_occupancy
                    .max(cluster.point_light_indices().len())
                    .max(cluster.area_light_indices().len());
            }
            stats.mean_occupancy = total as f32 / grid.len().max(1) as f32;

            self.report_overflow(stats.counters.overflow);
        }

        log::debug!(
            "Frame {}: {} point + {} area lights, {} tests, {} overflow, {:.0}us",
            stats.frame,
            stats.point_lights,
            stats.area_lights,
            stats.counters.intersection_tests,
            stats.counters.overflow,
            stats.total_us()
        );

        self.stats = stats;
        &self.stats
    }

    fn report_overflow(&mut self, overflow: u64) {
        if overflow > 0 && !self.overflowing {
            log::warn!(
                "Cluster capacity exceeded: {} lights dropped (max {} per cluster)",
                overflow,
                self.config.cluster.max_lights_per_cluster
            );
        } else if overflow == 0 && self.overflowing {
            log::info!("Cluster capacity no longer exceeded");
        }
        self.overflowing = overflow > 0;
    }

    /// Stats of the last frame.
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// The cluster buffer, when enabled.
    pub fn grid(&self) -> Option<&ClusterGrid> {
        self.grid.as_ref()
    }

    /// View-space lights of the last frame.
    pub fn view_lights(&self) -> &ViewLights {
        &self.view_lights
    }

    /// Lights to shade a point with: the cluster's lists when enabled and
    /// built, every light otherwise. Arguments as for
    /// [`ClusterGrid::cluster_index`].
    pub fn lights_for(&self, pixel: Vec2, depth: f32, normal: Vec3) -> LightSelection<'_> {
        match self
            .grid
            .as_ref()
            .and_then(|grid| grid.lookup(pixel, depth, normal))
        {
            Some(cluster) => LightSelection::Cluster(cluster),
            None => LightSelection::All {
                point_count: self.view_lights.point_lights.len(),
                area_count: self.view_lights.area_lights.len(),
            },
        }
    }

    /// Upload records for the point lights of the last frame. `scene` must be
    /// the scene that frame ran with.
    pub fn gpu_point_lights(&self, scene: &LightScene) -> Vec<GpuPointLight> {
        scene
            .point_lights()
            .iter()
            .zip(&self.view_lights.point_lights)
            .map(|(light, view)| {
                GpuPointLight::new(view.position, view.range, light.color, light.intensity)
            })
            .collect()
    }

    /// Upload records for the area lights of the last frame. `scene` must be
    /// the scene that frame ran with.
    pub fn gpu_area_lights(&self, scene: &LightScene) -> Vec<GpuAreaLight> {
        scene
            .area_lights()
            .iter()
            .zip(&self.view_lights.area_lights)
            .map(|(light, bounds)| GpuAreaLight::new(light, bounds))
            .collect()
    }
}
