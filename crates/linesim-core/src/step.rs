//! The step controller.
//!
//! A step is the externally visible unit of progress: micro-steps run until
//! something interesting happens. A manual step waits for a product to
//! move; an auto step stops at any product movement or signal change. Both
//! give up after [`MAX_MICRO_STEPS`], which bounds every call.

use serde::Serialize;
use tracing::{debug, warn};

use crate::engine::Simulation;
use crate::event::SimEvent;
use crate::signal::SignalStore;

/// Upper bound on micro-steps per step.
pub const MAX_MICRO_STEPS: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StepMode {
    /// Stop at the first product movement.
    Manual,
    /// Stop at the first product movement or signal change.
    Auto,
}

/// What happened during one step. Flags accumulate over every micro-step of
/// the call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// A queue length or a signal changed.
    pub significant_event: bool,
    /// A queue length changed.
    pub product_moved: bool,
    pub micro_steps: u32,
    /// The step ended at [`MAX_MICRO_STEPS`] without meeting its stop
    /// condition. The line may not be quiescent; stepping again is safe.
    pub hit_bound: bool,
}

/// Per-unit state compared against the live units after each micro-step.
struct Observation {
    queue_len: usize,
    signals: SignalStore,
}

impl Simulation {
    /// Run micro-steps until `mode`'s stop condition holds or the bound is
    /// reached. A manual step also advances the manual step counter.
    pub fn step(&mut self, mode: StepMode) -> StepReport {
        if mode == StepMode::Manual {
            self.manual_steps += 1;
        }

        let mut report = StepReport::default();
        let mut baseline = self.observe();
        loop {
            self.micro_step();
            report.micro_steps += 1;

            let mut moved = false;
            let mut signals_changed = false;
            for (seen, unit) in baseline.iter().zip(&self.units) {
                moved |= seen.queue_len != unit.products().len();
                signals_changed |= &seen.signals != unit.signals();
            }
            if moved && !report.product_moved {
                debug!(micro_step = report.micro_steps, time = self.time, "product movement");
            }
            report.product_moved |= moved;
            report.significant_event |= moved || signals_changed;

            let done = match mode {
                StepMode::Manual => report.product_moved,
                StepMode::Auto => report.significant_event,
            };
            if done {
                break;
            }
            if report.micro_steps >= MAX_MICRO_STEPS {
                report.hit_bound = true;
                warn!(micro_steps = report.micro_steps, time = self.time, ?mode, "step hit micro-step bound");
                self.events.push(SimEvent::StepBoundHit {
                    micro_steps: report.micro_steps,
                    time: self.time,
                });
                break;
            }
            // An unchanged line still matches the baseline.
            if moved || signals_changed {
                baseline = self.observe();
            }
        }

        debug!(
            ?mode,
            micro_steps = report.micro_steps,
            moved = report.product_moved,
            significant = report.significant_event,
            time = self.time,
            "step finished"
        );
        report
    }

    fn observe(&self) -> Vec<Observation> {
        self.units
            .iter()
            .map(|u| Observation {
                queue_len: u.products().len(),
                signals: u.signals().clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LineConfig;
    use crate::id::UnitId;
    use crate::program::{ActionProgram, Command};
    use crate::test_utils::*;

    #[test]
    fn manual_step_stops_at_first_movement() {
        let mut sim = simulation(pass_through_line(Some(1)));
        // Tick 1 creates P1 inside the Input: its queue grows.
        let report = sim.step(StepMode::Manual);
        assert!(report.product_moved);
        assert!(report.significant_event);
        assert_eq!(report.micro_steps, 1);
        assert_eq!(sim.manual_step_count(), 1);
    }

    #[test]
    fn auto_step_does_not_count_as_manual() {
        let mut sim = simulation(pass_through_line(Some(1)));
        sim.step(StepMode::Auto);
        assert_eq!(sim.manual_step_count(), 0);
    }

    #[test]
    fn auto_step_stops_at_signal_change() {
        let program = ActionProgram::builder()
            .group(
                "warm up",
                vec![Command::delay(3), Command::set_signal("N2_load_enable", true)],
            )
            .build();
        let line = LineConfig::chain(vec![
            input(1, 1).with_quota(0),
            normal(2, 1, program),
            output(3, 0),
        ])
        .with_priming(false);
        let mut sim = simulation(line);

        let report = sim.step(StepMode::Auto);
        assert!(report.significant_event);
        assert!(!report.product_moved);
        // Delay starts at tick 1 and ends at tick 4, where readiness is set.
        assert_eq!(report.micro_steps, 4);
        assert!(sim.unit(UnitId(2)).unwrap().is_ready_to_receive());
    }

    #[test]
    fn manual_step_runs_past_signal_changes() {
        let program = ActionProgram::builder()
            .group("flag", vec![Command::set_signal("lamp", true)])
            .build();
        let line = LineConfig::chain(vec![
            input(1, 1).with_quota(0),
            normal(2, 1, program),
            output(3, 0),
        ])
        .with_priming(false);
        let mut sim = simulation(line);

        // The lamp turns on at tick 1, then the unit waits for a product that
        // never comes. No queue changes, so the step runs to the bound.
        let report = sim.step(StepMode::Manual);
        assert!(report.significant_event);
        assert!(!report.product_moved);
        assert!(report.hit_bound);
        assert_eq!(report.micro_steps, MAX_MICRO_STEPS);
    }

    #[test]
    fn manual_step_sees_movement_after_signal_change() {
        let program = ActionProgram::builder()
            .group(
                "warm up",
                vec![Command::delay(3), Command::set_signal("N2_load_enable", true)],
            )
            .build();
        let line = LineConfig::chain(vec![
            input(1, 1).with_quota(1),
            normal(2, 1, program),
            output(3, 0),
        ])
        .with_priming(false);
        let mut sim = simulation(line);

        // Readiness flips at tick 4; the Input creates P1 at tick 5.
        let report = sim.step(StepMode::Manual);
        assert!(report.product_moved);
        assert!(report.significant_event);
        assert!(!report.hit_bound);
        assert_eq!(report.micro_steps, 5);
        assert_eq!(sim.unit(UnitId(1)).unwrap().products().len(), 1);
    }

    #[test]
    fn idle_line_hits_bound_with_no_flags() {
        let mut sim = simulation(pass_through_line(Some(0)));
        let report = sim.step(StepMode::Auto);
        assert_eq!(report.micro_steps, MAX_MICRO_STEPS);
        assert!(report.hit_bound);
        assert!(!report.significant_event);
        assert!(!report.product_moved);
        assert_eq!(sim.time(), MAX_MICRO_STEPS as u64);
        assert!(
            sim.events()
                .iter()
                .any(|e| matches!(e, SimEvent::StepBoundHit { micro_steps: 200, .. }))
        );
    }
}
