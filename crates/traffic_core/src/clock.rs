//! Event loop shared by every generator timer.
//!
//! Simulated time only moves when an event is popped or when the runner
//! explicitly advances it. Each generator arms its own events through a
//! [crate::timer::TickTimer]; this module only orders and delivers them.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::Resource;
use chrono::{DateTime, TimeZone, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    VehicleTick,
    VehicleResume,
    GridPerturb,
    GridResume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub timestamp: u64,
    pub kind: EventKind,
    seq: u64,
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap a min-heap by timestamp.
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| other.kind.cmp(&self.kind))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The event being routed through the schedule right now.
#[derive(Debug, Clone, Copy, Resource)]
pub struct CurrentEvent(pub Event);

#[derive(Debug, Default, Resource)]
pub struct SimulationClock {
    now: u64,
    epoch_ms: i64,
    next_seq: u64,
    events: BinaryHeap<Event>,
}

impl SimulationClock {
    /// Clock whose simulated time 0 corresponds to `epoch_ms` (Unix ms).
    pub fn with_epoch(epoch_ms: i64) -> Self {
        Self {
            epoch_ms,
            ..Default::default()
        }
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn epoch_ms(&self) -> i64 {
        self.epoch_ms
    }

    pub fn schedule_at(&mut self, timestamp: u64, kind: EventKind) {
        debug_assert!(
            timestamp >= self.now,
            "event timestamp must be >= current time"
        );
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Event {
            timestamp: timestamp.max(self.now),
            kind,
            seq,
        });
    }

    pub fn schedule_in(&mut self, delay_ms: u64, kind: EventKind) {
        self.schedule_at(self.now.saturating_add(delay_ms), kind);
    }

    pub fn pop_next(&mut self) -> Option<Event> {
        let event = self.events.pop()?;
        self.now = event.timestamp;
        Some(event)
    }

    pub fn next_event_time(&self) -> Option<u64> {
        self.events.peek().map(|e| e.timestamp)
    }

    /// Drops every pending event of `kind`. Returns how many were removed.
    pub fn cancel(&mut self, kind: EventKind) -> usize {
        let before = self.events.len();
        self.events.retain(|e| e.kind != kind);
        before - self.events.len()
    }

    /// Number of pending events of `kind`.
    pub fn pending(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    /// Moves simulated time forward without delivering anything.
    /// Never moves past a pending event and never moves backwards.
    pub fn advance_to(&mut self, timestamp: u64) {
        let limit = self.next_event_time().unwrap_or(u64::MAX);
        self.now = self.now.max(timestamp.min(limit));
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn sim_to_real_ms(&self, sim_ms: u64) -> i64 {
        self.epoch_ms.saturating_add(sim_ms as i64)
    }

    /// Wall-clock instant matching the current simulated time.
    pub fn now_real(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.sim_to_real_ms(self.now))
            .single()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_pops_events_in_time_order() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(10, EventKind::VehicleTick);
        clock.schedule_at(5, EventKind::GridPerturb);
        clock.schedule_at(20, EventKind::VehicleTick);

        let first = clock.pop_next().expect("first event");
        assert_eq!(first.timestamp, 5);
        assert_eq!(clock.now(), 5);

        let second = clock.pop_next().expect("second event");
        assert_eq!(second.timestamp, 10);
        assert_eq!(clock.now(), 10);

        let third = clock.pop_next().expect("third event");
        assert_eq!(third.timestamp, 20);
        assert_eq!(clock.now(), 20);

        assert!(clock.pop_next().is_none());
        assert!(clock.is_empty());
    }

    #[test]
    fn equal_timestamps_pop_in_insertion_order_per_kind() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(100, EventKind::GridPerturb);
        clock.schedule_at(100, EventKind::VehicleTick);
        clock.schedule_at(100, EventKind::VehicleTick);

        let kinds: Vec<_> = std::iter::from_fn(|| clock.pop_next())
            .map(|e| (e.kind, e.seq))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (EventKind::VehicleTick, 1),
                (EventKind::VehicleTick, 2),
                (EventKind::GridPerturb, 0),
            ]
        );
    }

    #[test]
    fn cancel_removes_only_matching_kind() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(100, EventKind::VehicleTick);
        clock.schedule_at(200, EventKind::VehicleTick);
        clock.schedule_at(2000, EventKind::GridPerturb);

        assert_eq!(clock.cancel(EventKind::VehicleTick), 2);
        assert_eq!(clock.pending(EventKind::VehicleTick), 0);
        assert_eq!(clock.pending(EventKind::GridPerturb), 1);
        assert_eq!(clock.cancel(EventKind::VehicleTick), 0);
    }

    #[test]
    fn advance_to_stops_at_next_pending_event() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(300, EventKind::VehicleTick);
        clock.advance_to(1000);
        assert_eq!(clock.now(), 300);

        clock.pop_next();
        clock.advance_to(1000);
        assert_eq!(clock.now(), 1000);

        clock.advance_to(10);
        assert_eq!(clock.now(), 1000);
    }

    #[test]
    fn real_time_follows_epoch() {
        let mut clock = SimulationClock::with_epoch(1_700_000_000_000);
        clock.schedule_in(2_000, EventKind::GridPerturb);
        clock.pop_next();
        assert_eq!(clock.sim_to_real_ms(clock.now()), 1_700_000_002_000);
        assert_eq!(clock.now_real().timestamp_millis(), 1_700_000_002_000);
    }
}
