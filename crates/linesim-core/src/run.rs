//! The auto-run loop and caller-driven session control.
//!
//! [`Simulation::run`] repeats auto steps until production is finished, the
//! line looks quiescent, a step limit is reached, or a [`CancelToken`] is
//! triggered. The quiescence test is a heuristic: ten consecutive steps
//! without a significant event, followed by a scan for idle or empty units.
//! A line can livelock in ways the scan does not recognise; `max_steps`
//! bounds those runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::engine::Simulation;
use crate::error::SimError;
use crate::step::{StepMode, StepReport};
use crate::time::Ticks;
use crate::unit::{UnitKind, UnitStatus};

/// Consecutive event-free steps after which the run checks for quiescence.
pub const QUIESCENCE_STEP_LIMIT: u32 = 10;

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Shared stop request, checked between steps. Cloning yields a handle to
/// the same flag, so another thread can stop a run in progress.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Options and outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Sleep between steps. Zero runs flat out.
    pub pause: Duration,
    /// Stop after this many steps regardless of progress.
    pub max_steps: Option<u64>,
}

impl RunOptions {
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = Some(max_steps);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StopReason {
    /// The Input quota is used up and every product has left the line.
    ProductionFinished,
    /// No significant event for [`QUIESCENCE_STEP_LIMIT`] steps and nothing
    /// left to do.
    Quiescent,
    Cancelled,
    StepLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub reason: StopReason,
    pub steps: u64,
    pub micro_steps: u64,
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

impl Simulation {
    /// Auto-run until a stop condition holds.
    pub fn run(&mut self, options: &RunOptions, cancel: &CancelToken) -> RunOutcome {
        self.run_with(options, cancel, |_, _| {})
    }

    /// Like [`run`](Self::run), calling `observer` after every step.
    pub fn run_with<F>(&mut self, options: &RunOptions, cancel: &CancelToken, mut observer: F) -> RunOutcome
    where
        F: FnMut(&Simulation, &StepReport),
    {
        self.running = true;
        info!(time = self.time, "run started");

        let mut steps = 0u64;
        let mut micro_steps = 0u64;
        let mut quiet_steps = 0u32;

        let reason = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            if self.production_finished() {
                break StopReason::ProductionFinished;
            }
            if options.max_steps.is_some_and(|max| steps >= max) {
                break StopReason::StepLimit;
            }

            let report = self.step(StepMode::Auto);
            steps += 1;
            micro_steps += u64::from(report.micro_steps);
            if report.significant_event {
                quiet_steps = 0;
            } else {
                quiet_steps += 1;
                debug!(quiet_steps, time = self.time, "step without events");
            }
            observer(self, &report);

            if quiet_steps >= QUIESCENCE_STEP_LIMIT
                && (self.all_idle_or_exhausted() || self.all_discharged())
            {
                break StopReason::Quiescent;
            }

            if !options.pause.is_zero() {
                thread::sleep(options.pause);
            }
        };

        self.running = false;
        cancel.reset();
        info!(?reason, steps, micro_steps, time = self.time, discharged = self.discharged, "run stopped");

        RunOutcome {
            reason,
            steps,
            micro_steps,
        }
    }

    /// Manual-step until the manual step counter reaches `target`. Returns
    /// the number of steps taken.
    pub fn run_to_step(&mut self, target: u64) -> Result<u64, SimError> {
        let current = self.manual_steps;
        if target <= current {
            return Err(SimError::TargetNotAhead { target, current });
        }
        while self.manual_steps < target {
            self.step(StepMode::Manual);
        }
        Ok(target - current)
    }

    /// Auto-step until the clock reaches `target`. The last step may carry
    /// the clock past it. Returns the number of steps taken.
    pub fn run_until_time(&mut self, target: Ticks) -> Result<u64, SimError> {
        let current = self.time;
        if target <= current {
            return Err(SimError::TimeNotAhead { target, current });
        }
        let mut steps = 0;
        while self.time < target {
            self.step(StepMode::Auto);
            steps += 1;
        }
        Ok(steps)
    }

    // -----------------------------------------------------------------------
    // Stop heuristics
    // -----------------------------------------------------------------------

    /// The first Input unit has a quota it has used up, it holds nothing,
    /// and no Normal or Output unit holds a product.
    pub fn production_finished(&self) -> bool {
        let Some(input) = self.input_unit() else {
            return false;
        };
        if input.total_quantity().is_none() || !input.quota_exhausted(self.next_product_id) || !input.is_empty() {
            return false;
        }
        self.units
            .iter()
            .filter(|u| u.kind() != UnitKind::Input)
            .all(|u| u.is_empty())
    }

    /// Every unit is idle, or is an exhausted empty Input, or is an empty
    /// Normal or Output unit.
    pub fn all_idle_or_exhausted(&self) -> bool {
        self.units.iter().all(|u| {
            u.status() == UnitStatus::Idle
                || match u.kind() {
                    UnitKind::Input => u.quota_exhausted(self.next_product_id) && u.is_empty(),
                    UnitKind::Normal | UnitKind::Output => u.is_empty(),
                }
        })
    }

    /// The discharged count has reached the first Input unit's quota.
    pub fn all_discharged(&self) -> bool {
        self.input_unit()
            .and_then(|u| u.total_quantity())
            .is_some_and(|quota| self.discharged >= quota)
    }
}
