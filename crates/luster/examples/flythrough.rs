//! Flythrough — a scripted camera orbiting a light field, spawning lights as
//! it goes. Run `luster-telemetry` alongside to watch the pipeline live.
//!
//! Usage: `cargo run --example flythrough [config.json] [frames]`

use std::time::Duration;

use luster::prelude::*;

const FRAME_TIME: Duration = Duration::from_millis(16);

fn main() {
    luster::diag::init_logger();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) if path.ends_with(".json") => match Config::from_json_file(&path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("{e}");
                std::process::exit(1);
            }
        },
        _ => Config::default(),
    };
    let frames: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(1200);

    let mut pipeline = match ClusteredLighting::enabled(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            log::error!("Invalid config: {e}");
            std::process::exit(1);
        }
    };
    let mut sender = DiagSender::new();
    if sender.is_none() {
        log::warn!("Telemetry socket unavailable, running without diagnostics");
    }

    let field = Aabb::new(Vec3::new(-40.0, -5.0, -40.0), Vec3::new(40.0, 15.0, 40.0));
    let mut scene = LightScene::scattered(2024, 1500, 60, field);
    let mut rng = Rng::from_seed(7);
    let mut camera = FreeCamera::new(Vec3::new(0.0, 4.0, 30.0)).with_planes(0.1, 200.0);

    for frame in 0..frames {
        // Orbit slowly while drifting up and down.
        camera.rotate(0.004, 0.0);
        camera.translate_local(0.05, 0.12, (frame as f32 * 0.01).sin() * 0.02);

        // Every few seconds press one of the shape keys 3..6, and toggle
        // clustering once to exercise the brute-force fallback.
        if frame % 240 == 120 {
            let key = 3 + (frame / 240 % 4) as u32;
            if let Err(e) = scene.spawn_area_light_at_camera(&camera, key, &mut rng) {
                log::warn!("Spawn failed: {e}");
            }
        }
        if frame % 60 == 0 {
            let ahead = camera.position + camera.forward() * 5.0;
            scene.spawn_point_light(ahead, &mut rng);
        }
        if frame == frames / 2 {
            pipeline.disable();
        } else if frame == frames / 2 + 60 {
            if let Err(e) = pipeline.enable() {
                log::error!("{e}");
                return;
            }
        }

        let params = match camera.params() {
            Ok(params) => params,
            Err(e) => {
                log::error!("{e}");
                return;
            }
        };
        let stats = *pipeline.run_frame(&params, &scene);
        if frame % 120 == 0 {
            log::info!(
                "Frame {}: {} lights, {} overflow, mean {:.1} per cluster, {:.0}us",
                stats.frame,
                scene.light_count(),
                stats.counters.overflow,
                stats.mean_occupancy,
                stats.total_us()
            );
        }

        if let Some(sender) = sender.as_mut() {
            sender.send(&pipeline);
        }
        std::thread::sleep(FRAME_TIME);
    }
}
