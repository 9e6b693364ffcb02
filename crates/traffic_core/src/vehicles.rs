//! Lane-based vehicle flow.
//!
//! Every tick runs Advance → Retire → Spawn → Publish in that order. Retirement
//! happens on the same tick a vehicle crosses the lane end, and the spawn
//! check sees the set after retirement.

use std::sync::Arc;

use bevy_ecs::prelude::Resource;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::clock::EventKind;
use crate::config::{usable_probability, VehicleFlowConfig};
use crate::timer::TickTimer;

/// Position at which a vehicle leaves its lane.
pub const LANE_END: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VehicleId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleClass {
    Car,
    Bus,
    Truck,
    Motorcycle,
}

impl VehicleClass {
    /// Render colour for the lane animation.
    pub fn color(self) -> &'static str {
        match self {
            VehicleClass::Car => "#3b82f6",
            VehicleClass::Bus => "#f59e0b",
            VehicleClass::Truck => "#ef4444",
            VehicleClass::Motorcycle => "#10b981",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub lane: usize,
    pub speed: f64,
    pub width: f64,
    pub class: VehicleClass,
    /// Progress along the lane: 0 = start, 100 = end. Starts slightly negative.
    pub position: f64,
}

impl Vehicle {
    /// Inside the rendered part of the lane.
    pub fn is_visible(&self) -> bool {
        self.position >= 0.0 && self.position < LANE_END
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOutcome {
    /// The probability roll failed or nothing could be drawn.
    Skipped,
    /// A vehicle near the lane entrance blocked the spawn.
    Rejected { lane: usize },
    Spawned(VehicleId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub retired: usize,
    pub spawn: SpawnOutcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlowCounters {
    pub ticks: u64,
    pub spawned: u64,
    pub retired: u64,
    pub rejected_spawns: u64,
}

/// Immutable view of the vehicle set after a tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VehicleFrame {
    pub tick: u64,
    pub vehicles: Vec<Vehicle>,
}

impl VehicleFrame {
    pub fn visible(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.iter().filter(|v| v.is_visible())
    }

    pub fn in_lane(&self, lane: usize) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.iter().filter(move |v| v.lane == lane)
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }
}

#[derive(Resource)]
pub struct VehicleFlow {
    config: VehicleFlowConfig,
    rng: StdRng,
    vehicles: Vec<Vehicle>,
    next_id: u64,
    counters: FlowCounters,
    timer: TickTimer,
    published: Arc<VehicleFrame>,
}

impl VehicleFlow {
    pub fn new(config: VehicleFlowConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let timer = TickTimer::new(
            EventKind::VehicleTick,
            EventKind::VehicleResume,
            config.tick_period_ms,
            config.reset_grace_ms,
        );
        Self {
            config,
            rng,
            vehicles: Vec::new(),
            next_id: 0,
            counters: FlowCounters::default(),
            timer,
            published: Arc::new(VehicleFrame::default()),
        }
    }

    pub fn config(&self) -> &VehicleFlowConfig {
        &self.config
    }

    pub fn timer(&self) -> &TickTimer {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut TickTimer {
        &mut self.timer
    }

    pub fn counters(&self) -> FlowCounters {
        self.counters
    }

    /// Last published frame. Cheap to clone and never observes a tick midway.
    pub fn snapshot(&self) -> Arc<VehicleFrame> {
        Arc::clone(&self.published)
    }

    pub fn tick(&mut self) -> TickReport {
        self.advance();
        let retired = self.retire();
        let spawn = self.try_spawn();
        self.counters.ticks += 1;
        self.publish();
        trace!(
            tick = self.counters.ticks,
            active = self.vehicles.len(),
            retired,
            ?spawn,
            "vehicle tick"
        );
        TickReport { retired, spawn }
    }

    fn advance(&mut self) {
        let step = self.config.step_factor;
        for vehicle in &mut self.vehicles {
            vehicle.position += vehicle.speed * step;
        }
    }

    fn retire(&mut self) -> usize {
        let before = self.vehicles.len();
        self.vehicles.retain(|v| v.position < LANE_END);
        let retired = before - self.vehicles.len();
        self.counters.retired += retired as u64;
        retired
    }

    fn try_spawn(&mut self) -> SpawnOutcome {
        let probability = usable_probability(self.config.spawn_probability);
        if !self.rng.gen_bool(probability) || self.config.lane_count == 0 {
            return SpawnOutcome::Skipped;
        }
        let lane = self.rng.gen_range(0..self.config.lane_count);
        let class = self.config.classes.choose(&mut self.rng).copied();
        let speed = self.config.speeds.choose(&mut self.rng).copied();
        let width = self.config.widths.choose(&mut self.rng).copied();
        let (Some(class), Some(speed), Some(width)) = (class, speed, width) else {
            return SpawnOutcome::Skipped;
        };
        self.spawn_at(lane, class, speed, width)
    }

    /// Places a vehicle at the lane entrance, subject to the entry-gap rule.
    pub fn spawn_at(
        &mut self,
        lane: usize,
        class: VehicleClass,
        speed: f64,
        width: f64,
    ) -> SpawnOutcome {
        if lane >= self.config.lane_count {
            return SpawnOutcome::Skipped;
        }
        if self.entrance_blocked(lane) {
            self.counters.rejected_spawns += 1;
            debug!(lane, "spawn rejected, lane entrance occupied");
            return SpawnOutcome::Rejected { lane };
        }
        let id = VehicleId(self.next_id);
        self.next_id += 1;
        self.vehicles.push(Vehicle {
            id,
            lane,
            speed,
            width,
            class,
            position: self.config.entry_position,
        });
        self.counters.spawned += 1;
        SpawnOutcome::Spawned(id)
    }

    /// Only the entrance is inspected; vehicles further down the lane never block.
    pub fn entrance_blocked(&self, lane: usize) -> bool {
        self.vehicles
            .iter()
            .any(|v| v.lane == lane && v.position < self.config.entry_gap)
    }

    /// Clears the set and publishes the empty frame immediately.
    pub fn reset_state(&mut self) {
        self.vehicles.clear();
        self.publish();
    }

    /// Vehicles in spawn order.
    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn publish(&mut self) {
        self.published = Arc::new(VehicleFrame {
            tick: self.counters.ticks,
            vehicles: self.vehicles.clone(),
        });
    }
}
