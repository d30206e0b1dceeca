//! Simulated time.
//!
//! The clock is an integer tick counter advanced by exactly one per
//! micro-step. Durations in configuration (input time, delays, discharge
//! intervals) are expressed in the same unit and called seconds in the
//! user-facing vocabulary.
//!
//! "Never happened" timestamps (last input, last discharge) are `None`
//! rather than a negative-infinity sentinel.

/// Simulation time and durations, in ticks.
pub type Ticks = u64;

/// Whether at least `interval` ticks have passed since `last`.
///
/// An event that never happened imposes no wait.
pub fn interval_elapsed(last: Option<Ticks>, interval: Ticks, now: Ticks) -> bool {
    match last {
        None => true,
        Some(at) => now >= at.saturating_add(interval),
    }
}

/// Absolute tick at which a delay of `duration` started at `now` completes.
pub fn delay_end(now: Ticks, duration: Ticks) -> Ticks {
    now.saturating_add(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_happened_is_always_elapsed() {
        assert!(interval_elapsed(None, 0, 0));
        assert!(interval_elapsed(None, 1_000, 1));
    }

    #[test]
    fn interval_boundary_is_inclusive() {
        assert!(!interval_elapsed(Some(10), 5, 14));
        assert!(interval_elapsed(Some(10), 5, 15));
        assert!(interval_elapsed(Some(10), 0, 10));
    }

    #[test]
    fn delay_end_saturates() {
        assert_eq!(delay_end(3, 4), 7);
        assert_eq!(delay_end(Ticks::MAX - 1, 10), Ticks::MAX);
    }
}
