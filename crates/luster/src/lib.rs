//! # Luster — Clustered Light Culling
//!
//! Shades scenes with thousands of point lights and polygonal area lights by
//! cutting the view frustum into a 3D grid of clusters and listing, per
//! cluster, the lights that can reach it. A shaded pixel then walks only its
//! cluster's lists instead of every light in the scene.
//!
//! Start with `use luster::prelude::*`, fill a [`LightScene`](scene::LightScene)
//! and drive a [`ClusteredLighting`](pipeline::ClusteredLighting) pipeline once
//! per frame.

pub mod camera;
pub mod cluster;
pub mod color;
pub mod config;
pub mod error;
pub mod light;
pub mod math;
pub mod pipeline;
pub mod prelude;
pub mod rng;
pub mod scene;

#[cfg(feature = "diagnostics")]
pub mod diag;
