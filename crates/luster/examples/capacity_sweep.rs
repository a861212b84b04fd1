//! Capacity sweep — runs one dense frame for a range of per-cluster
//! capacities and grid presets and prints how many lights each one drops.

use luster::prelude::*;

fn main() {
    env_logger::init();

    let field = Aabb::new(Vec3::new(-30.0, -10.0, -80.0), Vec3::new(30.0, 10.0, -1.0));
    let scene = LightScene::scattered(42, 4000, 200, field);
    let camera = match FreeCamera::new(Vec3::ZERO).with_planes(0.1, 100.0).params() {
        Ok(camera) => camera,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };

    println!(
        "{:<11} {:>8} {:>10} {:>12} {:>10} {:>9} {:>10}",
        "grid", "capacity", "overflow", "tests", "max fill", "partial", "assign us"
    );
    for (name, preset) in [
        ("discrete", ClusterConfig::discrete()),
        ("integrated", ClusterConfig::integrated()),
    ] {
        for capacity in [16, 32, 64, 128, 200, 400] {
            let config = Config {
                cluster: preset.with_max_lights_per_cluster(capacity),
                ..Config::default()
            };
            let mut pipeline = match ClusteredLighting::enabled(config) {
                Ok(pipeline) => pipeline,
                Err(e) => {
                    log::error!("{name}/{capacity}: {e}");
                    continue;
                }
            };
            let stats = pipeline.run_frame(&camera, &scene);
            println!(
                "{:<11} {:>8} {:>10} {:>12} {:>10} {:>9} {:>10.0}",
                name,
                capacity,
                stats.counters.overflow,
                stats.counters.intersection_tests,
                stats.max_occupancy,
                stats.counters.partial_area_assignments,
                stats.assign_us
            );
        }
    }
}
