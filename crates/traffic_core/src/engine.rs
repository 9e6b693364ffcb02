//! Control and read surface for the dashboard.
//!
//! [TrafficEngine] owns the ECS world and schedule. Control commands are applied
//! between events, so a reader never sees a half-applied command, and every
//! read returns an already-published immutable frame.

use std::sync::Arc;

use bevy_ecs::prelude::{Mut, Schedule, World};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::clock::{Event, SimulationClock};
use crate::config::EngineConfig;
use crate::error::{ConfigError, InvalidWindowError};
use crate::forecast::{ForecastGenerator, ForecastSeries, ForecastWindow};
use crate::grid::{CongestionGridEngine, GridFrame};
use crate::runner::{run_next_event, run_until, run_until_with_hook, simulation_schedule};
use crate::timer::TimerState;
use crate::vehicles::{FlowCounters, VehicleFlow, VehicleFrame};

/// Generators driven by a periodic timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generator {
    Vehicles,
    Grid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Start(Generator),
    Pause(Generator),
    Reset(Generator),
    Regenerate(ForecastWindow),
}

/// Everything the dashboard renders, captured at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub now_ms: u64,
    pub vehicles: Arc<VehicleFrame>,
    pub vehicle_timer: TimerState,
    pub flow: FlowCounters,
    pub grid: Arc<GridFrame>,
    pub grid_timer: TimerState,
    pub forecast: Option<Arc<ForecastSeries>>,
}

pub struct TrafficEngine {
    world: World,
    schedule: Schedule,
}

impl TrafficEngine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let epoch_ms = config
            .epoch_ms
            .unwrap_or_else(|| Utc::now().timestamp_millis());

        let mut world = World::new();
        world.insert_resource(SimulationClock::with_epoch(epoch_ms));
        world.insert_resource(VehicleFlow::new(
            config.vehicles.clone(),
            config.vehicle_seed(),
        ));
        world.insert_resource(CongestionGridEngine::new(
            config.grid.clone(),
            config.grid_seed(),
        ));
        world.insert_resource(ForecastGenerator::new(
            config.forecast.clone(),
            config.forecast_seed(),
        ));
        info!(
            seed = ?config.seed,
            lanes = config.vehicles.lane_count,
            grid_size = config.grid.size,
            "traffic engine ready"
        );
        world.insert_resource(config);

        Ok(Self {
            world,
            schedule: simulation_schedule(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        self.world.resource::<EngineConfig>()
    }

    /// Starts both timers and fills the forecast with the default window if empty.
    pub fn start(&mut self) {
        self.apply(ControlCommand::Start(Generator::Vehicles));
        self.apply(ControlCommand::Start(Generator::Grid));
        if self.forecast().is_none() {
            let window = self.config().forecast.default_window;
            self.regenerate_forecast(window);
        }
    }

    pub fn apply(&mut self, command: ControlCommand) {
        info!(?command, at = self.now_ms(), "control command");
        match command {
            ControlCommand::Start(Generator::Vehicles) => {
                self.with_vehicles(|flow, clock| flow.timer_mut().start(clock));
            }
            ControlCommand::Pause(Generator::Vehicles) => {
                self.with_vehicles(|flow, clock| flow.timer_mut().pause(clock));
            }
            ControlCommand::Reset(Generator::Vehicles) => {
                self.with_vehicles(|flow, clock| {
                    flow.timer_mut().begin_reset(clock);
                    flow.reset_state();
                });
            }
            ControlCommand::Start(Generator::Grid) => {
                self.with_grid(|grid, clock| grid.timer_mut().start(clock));
            }
            ControlCommand::Pause(Generator::Grid) => {
                self.with_grid(|grid, clock| grid.timer_mut().pause(clock));
            }
            ControlCommand::Reset(Generator::Grid) => {
                self.with_grid(|grid, clock| {
                    grid.timer_mut().begin_reset(clock);
                    grid.initialize();
                });
            }
            ControlCommand::Regenerate(window) => {
                self.regenerate_forecast(window);
            }
        }
    }

    fn with_vehicles<F>(&mut self, f: F)
    where
        F: FnOnce(&mut VehicleFlow, &mut SimulationClock),
    {
        self.world
            .resource_scope(|world, mut flow: Mut<VehicleFlow>| {
                let mut clock = world.resource_mut::<SimulationClock>();
                f(&mut *flow, &mut *clock);
            });
    }

    fn with_grid<F>(&mut self, f: F)
    where
        F: FnOnce(&mut CongestionGridEngine, &mut SimulationClock),
    {
        self.world
            .resource_scope(|world, mut grid: Mut<CongestionGridEngine>| {
                let mut clock = world.resource_mut::<SimulationClock>();
                f(&mut *grid, &mut *clock);
            });
    }

    /// Rebuilds the forecast for `window`, anchored at the current simulated time.
    pub fn regenerate_forecast(&mut self, window: ForecastWindow) -> Arc<ForecastSeries> {
        let now = self.world.resource::<SimulationClock>().now_real();
        self.world
            .resource_mut::<ForecastGenerator>()
            .regenerate(window, now)
    }

    /// Like [Self::regenerate_forecast] but parses the window name first;
    /// on error the current series is left as it was.
    pub fn regenerate_forecast_named(
        &mut self,
        name: &str,
    ) -> Result<Arc<ForecastSeries>, InvalidWindowError> {
        let now = self.world.resource::<SimulationClock>().now_real();
        self.world
            .resource_mut::<ForecastGenerator>()
            .regenerate_named(name, now)
    }

    /// Processes a single pending event.
    pub fn step(&mut self) -> bool {
        run_next_event(&mut self.world, &mut self.schedule)
    }

    /// Runs every event due within the next `duration_ms` and moves time forward.
    pub fn advance_by(&mut self, duration_ms: u64) -> usize {
        let end = self.now_ms().saturating_add(duration_ms);
        run_until(&mut self.world, &mut self.schedule, end)
    }

    /// Same as [Self::advance_by], calling `hook` after every processed event.
    pub fn advance_by_with_hook<F>(&mut self, duration_ms: u64, hook: F) -> usize
    where
        F: FnMut(&World, &Event),
    {
        let end = self.now_ms().saturating_add(duration_ms);
        run_until_with_hook(&mut self.world, &mut self.schedule, end, hook)
    }

    pub fn now_ms(&self) -> u64 {
        self.world.resource::<SimulationClock>().now()
    }

    pub fn vehicles(&self) -> Arc<VehicleFrame> {
        self.world.resource::<VehicleFlow>().snapshot()
    }

    pub fn grid(&self) -> Arc<GridFrame> {
        self.world.resource::<CongestionGridEngine>().current_grid()
    }

    pub fn forecast(&self) -> Option<Arc<ForecastSeries>> {
        self.world.resource::<ForecastGenerator>().series()
    }

    pub fn timer_state(&self, generator: Generator) -> TimerState {
        match generator {
            Generator::Vehicles => self.world.resource::<VehicleFlow>().timer().state(),
            Generator::Grid => self.world.resource::<CongestionGridEngine>().timer().state(),
        }
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let flow = self.world.resource::<VehicleFlow>();
        let grid = self.world.resource::<CongestionGridEngine>();
        EngineSnapshot {
            now_ms: self.now_ms(),
            vehicles: flow.snapshot(),
            vehicle_timer: flow.timer().state(),
            flow: flow.counters(),
            grid: grid.current_grid(),
            grid_timer: grid.timer().state(),
            forecast: self.forecast(),
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }
}
