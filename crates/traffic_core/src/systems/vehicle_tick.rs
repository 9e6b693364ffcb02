//! Vehicle flow systems: periodic tick and post-reset resume.

use bevy_ecs::prelude::{Res, ResMut};
use tracing::debug;

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::vehicles::VehicleFlow;

/// Runs one flow tick and re-arms the timer. Ticks that arrive while the
/// timer is not running leave the vehicle set untouched.
pub fn vehicle_tick_system(
    mut clock: ResMut<SimulationClock>,
    mut flow: ResMut<VehicleFlow>,
    event: Res<CurrentEvent>,
) {
    if event.0.kind != EventKind::VehicleTick {
        return;
    }
    if !flow.timer_mut().on_tick(&mut clock) {
        debug!(at = clock.now(), "dropping vehicle tick for stopped timer");
        return;
    }
    flow.tick();
}

/// Ends the reset grace period and starts a fresh tick cycle.
pub fn vehicle_resume_system(
    mut clock: ResMut<SimulationClock>,
    mut flow: ResMut<VehicleFlow>,
    event: Res<CurrentEvent>,
) {
    if event.0.kind != EventKind::VehicleResume {
        return;
    }
    if flow.timer_mut().on_resume(&mut clock) {
        debug!(at = clock.now(), "vehicle flow resumed");
    }
}
