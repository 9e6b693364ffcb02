//! Periodic tick timer owned by a single generator concern.
//!
//! At most one tick or resume event per concern is ever pending: every
//! transition cancels what the concern had queued before arming anything new.

use serde::Serialize;
use tracing::debug;

use crate::clock::{EventKind, SimulationClock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimerState {
    /// No events pending; state is frozen.
    Stopped,
    /// One tick pending at `now + period`.
    Running,
    /// State was just cleared; a resume is pending after the grace delay.
    Resuming,
}

#[derive(Debug, Clone)]
pub struct TickTimer {
    tick_kind: EventKind,
    resume_kind: EventKind,
    period_ms: u64,
    grace_ms: u64,
    state: TimerState,
}

impl TickTimer {
    pub fn new(tick_kind: EventKind, resume_kind: EventKind, period_ms: u64, grace_ms: u64) -> Self {
        Self {
            tick_kind,
            resume_kind,
            period_ms: period_ms.max(1),
            grace_ms,
            state: TimerState::Stopped,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    pub fn grace_ms(&self) -> u64 {
        self.grace_ms
    }

    pub fn tick_kind(&self) -> EventKind {
        self.tick_kind
    }

    pub fn resume_kind(&self) -> EventKind {
        self.resume_kind
    }

    fn cancel_pending(&self, clock: &mut SimulationClock) {
        clock.cancel(self.tick_kind);
        clock.cancel(self.resume_kind);
    }

    /// Begin ticking. Restarting a running timer replaces its pending tick.
    pub fn start(&mut self, clock: &mut SimulationClock) {
        self.cancel_pending(clock);
        clock.schedule_in(self.period_ms, self.tick_kind);
        self.state = TimerState::Running;
        debug!(kind = ?self.tick_kind, at = clock.now(), "timer started");
    }

    pub fn pause(&mut self, clock: &mut SimulationClock) {
        self.cancel_pending(clock);
        self.state = TimerState::Stopped;
        debug!(kind = ?self.tick_kind, at = clock.now(), "timer paused");
    }

    /// Stop ticking and queue a resume after the grace delay.
    pub fn begin_reset(&mut self, clock: &mut SimulationClock) {
        self.cancel_pending(clock);
        clock.schedule_in(self.grace_ms, self.resume_kind);
        self.state = TimerState::Resuming;
        debug!(
            kind = ?self.tick_kind,
            at = clock.now(),
            grace_ms = self.grace_ms,
            "timer reset, resume pending"
        );
    }

    /// Called after a tick fired. Returns `false` when the tick must be ignored.
    pub fn on_tick(&mut self, clock: &mut SimulationClock) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        clock.schedule_in(self.period_ms, self.tick_kind);
        true
    }

    /// Called when the resume event fires. Returns `false` if it was stale.
    pub fn on_resume(&mut self, clock: &mut SimulationClock) -> bool {
        if self.state != TimerState::Resuming {
            return false;
        }
        self.start(clock);
        true
    }
}
