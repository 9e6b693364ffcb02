//! Test helpers for common test setup and utilities.
//!
//! Seeds and epochs are fixed so every helper produces reproducible state.

use bevy_ecs::prelude::World;

use crate::clock::SimulationClock;
use crate::config::{CongestionGridConfig, EngineConfig, VehicleFlowConfig};
use crate::grid::CongestionGridEngine;
use crate::vehicles::VehicleFlow;

pub const TEST_SEED: u64 = 42;

/// 2024-03-12 12:00:00 UTC, a Tuesday noon.
pub const TEST_EPOCH_MS: i64 = 1_710_244_800_000;

/// Default engine config with a fixed seed and epoch.
pub fn test_config() -> EngineConfig {
    EngineConfig::default()
        .with_seed(TEST_SEED)
        .with_epoch_ms(TEST_EPOCH_MS)
}

/// Flow config with an overridden spawn probability.
pub fn flow_config(spawn_probability: f64) -> VehicleFlowConfig {
    VehicleFlowConfig {
        spawn_probability,
        ..Default::default()
    }
}

pub fn seeded_flow(spawn_probability: f64) -> VehicleFlow {
    VehicleFlow::new(flow_config(spawn_probability), Some(TEST_SEED))
}

pub fn seeded_grid(config: CongestionGridConfig) -> CongestionGridEngine {
    CongestionGridEngine::new(config, Some(TEST_SEED))
}

/// World holding a clock plus both timed generators, ready for the runner.
pub fn timed_world(flow: VehicleFlow, grid: CongestionGridEngine) -> World {
    let mut world = World::new();
    world.insert_resource(SimulationClock::with_epoch(TEST_EPOCH_MS));
    world.insert_resource(flow);
    world.insert_resource(grid);
    world
}
