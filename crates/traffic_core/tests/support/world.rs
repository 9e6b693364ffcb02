#![allow(dead_code)]

use bevy_ecs::prelude::{Mut, World};
use traffic_core::clock::SimulationClock;
use traffic_core::config::{CongestionGridConfig, VehicleFlowConfig};
use traffic_core::grid::CongestionGridEngine;
use traffic_core::test_helpers::{timed_world, TEST_SEED};
use traffic_core::vehicles::VehicleFlow;

/// Builder for worlds holding the timed generators with reproducible seeds.
#[derive(Clone, Debug, Default)]
pub struct TestWorldBuilder {
    seed: Option<u64>,
    flow: VehicleFlowConfig,
    grid: CongestionGridConfig,
}

impl TestWorldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_spawn_probability(mut self, probability: f64) -> Self {
        self.flow.spawn_probability = probability;
        self
    }

    pub fn with_flow(mut self, flow: VehicleFlowConfig) -> Self {
        self.flow = flow;
        self
    }

    pub fn with_grid(mut self, grid: CongestionGridConfig) -> Self {
        self.grid = grid;
        self
    }

    pub fn build(self) -> World {
        let seed = self.seed.unwrap_or(TEST_SEED);
        timed_world(
            VehicleFlow::new(self.flow, Some(seed)),
            CongestionGridEngine::new(self.grid, Some(seed)),
        )
    }
}

/// Start both timers as the engine would on `start()`.
pub fn start_timers(world: &mut World) {
    world.resource_scope(|world, mut flow: Mut<VehicleFlow>| {
        let mut clock = world.resource_mut::<SimulationClock>();
        flow.timer_mut().start(&mut clock);
    });
    world.resource_scope(|world, mut grid: Mut<CongestionGridEngine>| {
        let mut clock = world.resource_mut::<SimulationClock>();
        grid.timer_mut().start(&mut clock);
    });
}

pub fn pause_vehicles(world: &mut World) {
    world.resource_scope(|world, mut flow: Mut<VehicleFlow>| {
        let mut clock = world.resource_mut::<SimulationClock>();
        flow.timer_mut().pause(&mut clock);
    });
}
