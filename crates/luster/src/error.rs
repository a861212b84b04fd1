//! Setup-time errors.
//!
//! Everything here indicates a caller or build bug and stops initialization.
//! Numerical edge cases met while running a frame (parallel normals, negative
//! discriminants, full cluster lists) are recovered where they happen and never
//! show up as errors.

use std::fmt;

/// Errors raised while validating configuration or constructing lights.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Area light vertex count outside {3, 4, 5, 10}.
    InvalidShape(u32),
    /// Total cluster count not divisible by the assignment batch size.
    BatchSize { clusters: u32, batch_size: u32 },
    /// Quadratic attenuation term must be strictly positive.
    QuadraticAttenuation(f32),
    /// A grid dimension is zero.
    EmptyGrid { x: u32, y: u32, z: u32 },
    /// `max_lights_per_cluster` is zero.
    ZeroCapacity,
    /// Normal bin count must be 1 or `6·n²`.
    NormalBins(u32),
    /// Minimum perceivable intensity must be strictly positive.
    PerceivableThreshold(f32),
    /// Near/far planes, field of view or resolution out of range.
    Camera(String),
    /// Failed to read or parse a JSON config.
    Load(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidShape(n) => {
                write!(f, "invalid area light vertex count {n} (expected 3, 4, 5 or 10)")
            }
            ConfigError::BatchSize {
                clusters,
                batch_size,
            } => write!(
                f,
                "cluster count {clusters} is not divisible by batch size {batch_size}"
            ),
            ConfigError::QuadraticAttenuation(q) => {
                write!(f, "quadratic attenuation must be > 0, got {q}")
            }
            ConfigError::EmptyGrid { x, y, z } => {
                write!(f, "cluster grid {x}x{y}x{z} has a zero dimension")
            }
            ConfigError::ZeroCapacity => write!(f, "max lights per cluster must be > 0"),
            ConfigError::NormalBins(n) => {
                write!(f, "normal bin count {n} is neither 1 nor 6*n^2")
            }
            ConfigError::PerceivableThreshold(t) => {
                write!(f, "min perceivable intensity must be > 0, got {t}")
            }
            ConfigError::Camera(e) => write!(f, "invalid camera: {e}"),
            ConfigError::Load(e) => write!(f, "config load failed: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
