//! Typed simulation events recorded into a bounded ring buffer.
//!
//! Events are written by unit handlers during a micro-step and by the step
//! controller. The log keeps the most recent `capacity` events; older ones
//! are dropped and counted. Individual kinds can be suppressed, in which
//! case they are never recorded.

use std::collections::VecDeque;

use crate::id::{ProductId, UnitId};
use crate::time::Ticks;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A simulation event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SimEvent {
    ProductCreated {
        unit: UnitId,
        product: ProductId,
        time: Ticks,
    },
    ProductTransferred {
        product: ProductId,
        from: UnitId,
        to: UnitId,
        time: Ticks,
    },
    ProductDischarged {
        unit: UnitId,
        product: ProductId,
        time: Ticks,
    },
    SignalChanged {
        unit: UnitId,
        signal: String,
        value: bool,
        time: Ticks,
    },
    DelayStarted {
        unit: UnitId,
        until: Ticks,
        time: Ticks,
    },
    DelayCompleted {
        unit: UnitId,
        time: Ticks,
    },
    /// A step ran the full micro-step bound without a qualifying event.
    StepBoundHit {
        micro_steps: u32,
        time: Ticks,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ProductCreated,
    ProductTransferred,
    ProductDischarged,
    SignalChanged,
    DelayStarted,
    DelayCompleted,
    StepBoundHit,
}

const EVENT_KIND_COUNT: usize = 7;

impl SimEvent {
    /// The discriminant used for suppression.
    pub fn kind(&self) -> EventKind {
        match self {
            SimEvent::ProductCreated { .. } => EventKind::ProductCreated,
            SimEvent::ProductTransferred { .. } => EventKind::ProductTransferred,
            SimEvent::ProductDischarged { .. } => EventKind::ProductDischarged,
            SimEvent::SignalChanged { .. } => EventKind::SignalChanged,
            SimEvent::DelayStarted { .. } => EventKind::DelayStarted,
            SimEvent::DelayCompleted { .. } => EventKind::DelayCompleted,
            SimEvent::StepBoundHit { .. } => EventKind::StepBoundHit,
        }
    }

    /// Tick at which the event occurred.
    pub fn time(&self) -> Ticks {
        match self {
            SimEvent::ProductCreated { time, .. }
            | SimEvent::ProductTransferred { time, .. }
            | SimEvent::ProductDischarged { time, .. }
            | SimEvent::SignalChanged { time, .. }
            | SimEvent::DelayStarted { time, .. }
            | SimEvent::DelayCompleted { time, .. }
            | SimEvent::StepBoundHit { time, .. } => *time,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventLog
// ---------------------------------------------------------------------------

/// Default number of retained events.
pub const DEFAULT_EVENT_CAPACITY: usize = 4096;

/// Bounded event log. When full, the oldest event is dropped.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<SimEvent>,
    capacity: usize,
    total_written: u64,
    /// Events evicted because the log was full. Drained events are not
    /// counted.
    dropped: u64,
    suppressed: [bool; EVENT_KIND_COUNT],
}

impl EventLog {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity.min(DEFAULT_EVENT_CAPACITY)),
            capacity,
            total_written: 0,
            dropped: 0,
            suppressed: [false; EVENT_KIND_COUNT],
        }
    }

    /// Record `event` unless its kind is suppressed, evicting the oldest
    /// event when full.
    pub fn push(&mut self, event: SimEvent) {
        if self.suppressed[event.kind().index()] {
            return;
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event);
        self.total_written += 1;
    }

    /// Stop recording events of `kind`.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Maximum number of retained events.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Total events recorded since creation or the last [`clear`](Self::clear),
    /// including dropped ones.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Events evicted to make room for newer ones.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &SimEvent> {
        self.events.iter()
    }

    /// Remove and return every retained event, oldest first.
    pub fn drain(&mut self) -> Vec<SimEvent> {
        self.events.drain(..).collect()
    }

    /// Discard retained events and zero the counters. Suppressed kinds stay
    /// suppressed.
    pub fn clear(&mut self) {
        self.events.clear();
        self.total_written = 0;
        self.dropped = 0;
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discharged(n: u64) -> SimEvent {
        SimEvent::ProductDischarged {
            unit: UnitId(9),
            product: ProductId(n),
            time: n,
        }
    }

    #[test]
    fn push_and_iterate_in_order() {
        let mut log = EventLog::new(8);
        log.push(discharged(1));
        log.push(discharged(2));
        let times: Vec<Ticks> = log.iter().map(SimEvent::time).collect();
        assert_eq!(times, vec![1, 2]);
    }

    #[test]
    fn full_log_drops_oldest() {
        let mut log = EventLog::new(3);
        for n in 1..=5 {
            log.push(discharged(n));
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.total_written(), 5);
        assert_eq!(log.dropped_count(), 2);
        assert_eq!(log.iter().next(), Some(&discharged(3)));
    }

    #[test]
    fn zero_capacity_clamped() {
        let mut log = EventLog::new(0);
        log.push(discharged(1));
        log.push(discharged(2));
        assert_eq!(log.capacity(), 1);
        assert_eq!(log.drain(), vec![discharged(2)]);
    }

    #[test]
    fn suppressed_kind_not_recorded() {
        let mut log = EventLog::default();
        log.suppress(EventKind::ProductDischarged);
        log.push(discharged(1));
        log.push(SimEvent::DelayCompleted { unit: UnitId(1), time: 4 });
        assert!(log.is_suppressed(EventKind::ProductDischarged));
        assert_eq!(log.len(), 1);
        assert_eq!(log.total_written(), 1);
    }

    #[test]
    fn drain_empties_log() {
        let mut log = EventLog::default();
        log.push(discharged(1));
        assert_eq!(log.drain().len(), 1);
        assert!(log.is_empty());
    }

    #[test]
    fn drained_events_are_not_dropped() {
        let mut log = EventLog::new(8);
        for n in 1..=3 {
            log.push(discharged(n));
        }
        assert_eq!(log.drain().len(), 3);
        assert_eq!(log.total_written(), 3);
        assert_eq!(log.dropped_count(), 0);

        log.push(discharged(4));
        assert_eq!(log.dropped_count(), 0);
    }

    #[test]
    fn dropped_count_only_counts_evictions() {
        let mut log = EventLog::new(2);
        for n in 1..=5 {
            log.push(discharged(n));
        }
        assert_eq!(log.dropped_count(), 3);
        log.drain();
        log.push(discharged(6));
        assert_eq!(log.dropped_count(), 3);
        assert_eq!(log.total_written(), 6);
    }

    #[test]
    fn clear_zeroes_counters_and_keeps_suppression() {
        let mut log = EventLog::new(2);
        log.suppress(EventKind::DelayCompleted);
        for n in 1..=4 {
            log.push(discharged(n));
        }
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.total_written(), 0);
        assert_eq!(log.dropped_count(), 0);
        assert!(log.is_suppressed(EventKind::DelayCompleted));
    }
}
