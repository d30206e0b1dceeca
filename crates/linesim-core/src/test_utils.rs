//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::config::{LineConfig, UnitConfig};
use crate::engine::Simulation;
use crate::program::{ActionProgram, Command};
use crate::run::{CancelToken, RunOptions, RunOutcome};
use crate::signal::READY_SUFFIX;
use crate::time::Ticks;

// ===========================================================================
// Unit constructors
// ===========================================================================

/// Input unit named `In<id>`.
pub fn input(id: u32, input_time: Ticks) -> UnitConfig {
    UnitConfig::input(id, format!("In{id}"), input_time)
}

/// Normal unit named `N<id>`.
pub fn normal(id: u32, max_capacity: usize, program: ActionProgram) -> UnitConfig {
    UnitConfig::normal(id, format!("N{id}"), max_capacity, program)
}

/// Output unit named `Out<id>`.
pub fn output(id: u32, discharge_interval: Ticks) -> UnitConfig {
    UnitConfig::output(id, format!("Out{id}"), discharge_interval)
}

// ===========================================================================
// Programs
// ===========================================================================

pub fn ready_signal(unit_name: &str) -> String {
    format!("{unit_name}{READY_SUFFIX}")
}

/// A single group asserting the unit's readiness: accept, then forward.
pub fn ready_program(unit_name: &str) -> ActionProgram {
    ActionProgram::builder()
        .group("ready", vec![Command::set_signal(ready_signal(unit_name), true)])
        .build()
}

/// Assert readiness, then work on the product for `work` ticks.
pub fn station_program(unit_name: &str, work: Ticks) -> ActionProgram {
    ActionProgram::builder()
        .group("ready", vec![Command::set_signal(ready_signal(unit_name), true)])
        .group("work", vec![Command::described_delay(work, "processing")])
        .build()
}

// ===========================================================================
// Lines
// ===========================================================================

/// `In1 -> N2..N(k+1) -> Out(k+2)`, one station per entry of `work`.
pub fn linear_line(input_time: Ticks, quota: Option<u64>, work: &[Ticks]) -> LineConfig {
    let mut first = input(1, input_time);
    if let Some(q) = quota {
        first = first.with_quota(q);
    }
    let mut units = vec![first];
    for (i, &ticks) in work.iter().enumerate() {
        let id = i as u32 + 2;
        units.push(normal(id, 1, station_program(&format!("N{id}"), ticks)));
    }
    units.push(output(work.len() as u32 + 2, 0));
    LineConfig::chain(units)
}

/// `In1 (input time 1) -> N2 (capacity 1, no program) -> Out3 (interval 0)`.
pub fn pass_through_line(quota: Option<u64>) -> LineConfig {
    let mut first = input(1, 1);
    if let Some(q) = quota {
        first = first.with_quota(q);
    }
    LineConfig::chain(vec![first, normal(2, 1, ActionProgram::empty()), output(3, 0)])
}

/// Two stations working 5 and 10 ticks per product.
pub fn two_station_line(quota: Option<u64>) -> LineConfig {
    linear_line(1, quota, &[5, 10])
}

// ===========================================================================
// Simulation helpers
// ===========================================================================

pub fn simulation(config: LineConfig) -> Simulation {
    Simulation::new(config).expect("test line config is valid")
}

/// Auto-run with a generous step cap.
pub fn run_to_quiescence(sim: &mut Simulation) -> RunOutcome {
    sim.run(&RunOptions::default().with_max_steps(10_000), &CancelToken::new())
}
