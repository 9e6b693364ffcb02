//! Simulation runner: advances the clock and routes events into the ECS.
//!
//! Each step pops the next event from [SimulationClock], inserts it as
//! [CurrentEvent], then runs the schedule. Only the system matching the event
//! kind runs, so generators never observe each other's ticks.

use bevy_ecs::prelude::{Res, Schedule, World};
use bevy_ecs::schedule::IntoSystemConfigs;

use crate::clock::{CurrentEvent, Event, EventKind, SimulationClock};
use crate::systems::{
    grid_perturb::{grid_perturb_system, grid_resume_system},
    vehicle_tick::{vehicle_resume_system, vehicle_tick_system},
};

fn is_vehicle_tick(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::VehicleTick)
        .unwrap_or(false)
}

fn is_vehicle_resume(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::VehicleResume)
        .unwrap_or(false)
}

fn is_grid_perturb(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::GridPerturb)
        .unwrap_or(false)
}

fn is_grid_resume(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::GridResume)
        .unwrap_or(false)
}

/// Builds the schedule with one event-gated system per timer concern.
pub fn simulation_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems((
        vehicle_tick_system.run_if(is_vehicle_tick),
        vehicle_resume_system.run_if(is_vehicle_resume),
        grid_perturb_system.run_if(is_grid_perturb),
        grid_resume_system.run_if(is_grid_resume),
    ));
    schedule
}

/// Runs one simulation step: pops the next event, inserts it as [CurrentEvent], then runs the schedule.
/// Returns `false` if the clock was empty.
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> bool {
    run_next_event_with_hook(world, schedule, |_, _| {})
}

/// Runs one simulation step and invokes `hook` after the schedule completes.
pub fn run_next_event_with_hook<F>(world: &mut World, schedule: &mut Schedule, mut hook: F) -> bool
where
    F: FnMut(&World, &Event),
{
    let event = match world.resource_mut::<SimulationClock>().pop_next() {
        Some(e) => e,
        None => return false,
    };
    world.insert_resource(CurrentEvent(event));
    schedule.run(world);
    hook(world, &event);
    true
}

/// Processes every event due at or before `end_ms`, then moves the clock to `end_ms`.
/// Returns the number of events processed.
pub fn run_until(world: &mut World, schedule: &mut Schedule, end_ms: u64) -> usize {
    run_until_with_hook(world, schedule, end_ms, |_, _| {})
}

pub fn run_until_with_hook<F>(
    world: &mut World,
    schedule: &mut Schedule,
    end_ms: u64,
    mut hook: F,
) -> usize
where
    F: FnMut(&World, &Event),
{
    let mut steps = 0;
    loop {
        let next = world.resource::<SimulationClock>().next_event_time();
        match next {
            Some(ts) if ts <= end_ms => {
                run_next_event_with_hook(world, schedule, &mut hook);
                steps += 1;
            }
            _ => break,
        }
    }
    world.resource_mut::<SimulationClock>().advance_to(end_ms);
    steps
}
