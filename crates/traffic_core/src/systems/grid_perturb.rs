//! Congestion grid systems: periodic drift and post-reset resume.

use bevy_ecs::prelude::{Res, ResMut};
use tracing::debug;

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::grid::CongestionGridEngine;

pub fn grid_perturb_system(
    mut clock: ResMut<SimulationClock>,
    mut engine: ResMut<CongestionGridEngine>,
    event: Res<CurrentEvent>,
) {
    if event.0.kind != EventKind::GridPerturb {
        return;
    }
    if !engine.timer_mut().on_tick(&mut clock) {
        debug!(at = clock.now(), "dropping grid perturbation for stopped timer");
        return;
    }
    engine.perturb();
}

pub fn grid_resume_system(
    mut clock: ResMut<SimulationClock>,
    mut engine: ResMut<CongestionGridEngine>,
    event: Res<CurrentEvent>,
) {
    if event.0.kind != EventKind::GridResume {
        return;
    }
    if engine.timer_mut().on_resume(&mut clock) {
        debug!(at = clock.now(), "congestion grid resumed");
    }
}
