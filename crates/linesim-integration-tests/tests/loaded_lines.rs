//! Runs of the line files shipped with `linesim-data`.

use std::path::{Path, PathBuf};

use linesim_core::engine::Simulation;
use linesim_core::event::{EventKind, SimEvent};
use linesim_core::id::ProductId;
use linesim_core::run::{CancelToken, RunOptions, StopReason};
use linesim_core::step::StepMode;
use linesim_data::{default_line, load_simulation};

fn lines_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../linesim-data/lines")
}

fn discharged_ids(sim: &Simulation) -> Vec<ProductId> {
    sim.events()
        .iter()
        .filter_map(|e| match e {
            SimEvent::ProductDischarged { product, .. } => Some(*product),
            _ => None,
        })
        .collect()
}

#[test]
fn json_pass_through_line_runs_to_completion() {
    let mut sim = load_simulation(&lines_dir().join("pass_through.json")).unwrap();
    let outcome = sim.run(&RunOptions::default(), &CancelToken::new());
    assert_eq!(outcome.reason, StopReason::ProductionFinished);
    assert_eq!(discharged_ids(&sim), vec![ProductId(1), ProductId(2), ProductId(3)]);
}

#[test]
fn ron_and_json_lines_behave_the_same() {
    let mut json = load_simulation(&lines_dir().join("pass_through.json")).unwrap();
    let mut ron = load_simulation(&lines_dir().join("pass_through.ron")).unwrap();
    for _ in 0..10 {
        json.step(StepMode::Auto);
        ron.step(StepMode::Auto);
        assert_eq!(json.state_hash(), ron.state_hash());
    }
}

#[test]
fn default_line_produces_its_quota() {
    let mut sim = Simulation::new(default_line().unwrap()).unwrap();
    // Keep the log to product movements so all 100 discharges fit.
    for kind in [EventKind::SignalChanged, EventKind::DelayStarted, EventKind::DelayCompleted] {
        sim.suppress_event(kind);
    }
    let outcome = sim.run(&RunOptions::default(), &CancelToken::new());

    assert_eq!(outcome.reason, StopReason::ProductionFinished);
    assert_eq!(sim.discharged(), 100);
    assert_eq!(discharged_ids(&sim), (1..=100).map(ProductId).collect::<Vec<_>>());
}

#[test]
fn default_line_primes_first_group_signals() {
    let sim = Simulation::new(default_line().unwrap()).unwrap();
    let unit1 = sim.unit_by_name("Unit1").unwrap();
    assert_eq!(unit1.signals().get("Unit1_load_enable"), Some(true));
    assert_eq!(unit1.signals().get("Unit1_discharge_ready"), None);
}

#[test]
fn default_line_manual_steps_advance_counter() {
    let mut sim = Simulation::new(default_line().unwrap()).unwrap();
    let taken = sim.run_to_step(10).unwrap();
    assert_eq!(taken, 10);
    assert_eq!(sim.manual_step_count(), 10);
    assert!(sim.time() >= 10);
}
