//! Plain-text rendering of snapshots, step reports and events.

use std::fmt::Write;

use linesim_core::event::SimEvent;
use linesim_core::query::{SimSnapshot, UnitSnapshot};
use linesim_core::run::RunOutcome;
use linesim_core::step::StepReport;

/// Header line plus one row per unit.
pub fn render_snapshot(snapshot: &SimSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "time {}  manual steps {}  discharged {}",
        snapshot.time, snapshot.manual_steps, snapshot.discharged
    );
    let _ = writeln!(
        out,
        "{:<5} {:<12} {:<7} {:<24} {:<14} signals",
        "id", "name", "kind", "status", "products"
    );
    for unit in &snapshot.units {
        let _ = writeln!(out, "{}", unit_row(unit));
    }
    out
}

fn unit_row(unit: &UnitSnapshot) -> String {
    let products = if unit.products.is_empty() {
        "-".to_owned()
    } else {
        unit.products
            .iter()
            .map(|p| p.id.to_string())
            .collect::<Vec<_>>()
            .join(",")
    };
    let signals = unit
        .signals
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "{:<5} {:<12} {:<7} {:<24} {:<14} {}",
        unit.id.to_string(),
        unit.name,
        unit.kind.to_string(),
        format!("{:?}", unit.status),
        products,
        signals
    )
    .trim_end()
    .to_owned()
}

pub fn render_step(index: u64, report: &StepReport, time: u64) -> String {
    let what = if report.product_moved {
        "product moved"
    } else if report.significant_event {
        "signals changed"
    } else {
        "no event"
    };
    let bound = if report.hit_bound { " (micro-step bound)" } else { "" };
    format!(
        "step {index}: {what} after {} micro-steps, time {time}{bound}",
        report.micro_steps
    )
}

pub fn render_outcome(outcome: &RunOutcome) -> String {
    format!(
        "stopped: {:?} after {} steps ({} micro-steps)",
        outcome.reason, outcome.steps, outcome.micro_steps
    )
}

pub fn render_event(event: &SimEvent) -> String {
    match event {
        SimEvent::ProductCreated { unit, product, time } => format!("{time:>6}  {product} created at {unit}"),
        SimEvent::ProductTransferred {
            product,
            from,
            to,
            time,
        } => format!("{time:>6}  {product} {from} -> {to}"),
        SimEvent::ProductDischarged { unit, product, time } => format!("{time:>6}  {product} discharged at {unit}"),
        SimEvent::SignalChanged {
            unit,
            signal,
            value,
            time,
        } => format!("{time:>6}  {unit} {signal}={value}"),
        SimEvent::DelayStarted { unit, until, time } => format!("{time:>6}  {unit} delay until {until}"),
        SimEvent::DelayCompleted { unit, time } => format!("{time:>6}  {unit} delay done"),
        SimEvent::StepBoundHit { micro_steps, time } => {
            format!("{time:>6}  step gave up after {micro_steps} micro-steps")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linesim_core::id::{ProductId, UnitId};
    use linesim_core::run::StopReason;
    use linesim_core::test_utils::*;

    #[test]
    fn snapshot_lists_every_unit() {
        let mut sim = simulation(pass_through_line(Some(2)));
        sim.micro_step();
        let text = render_snapshot(&sim.snapshot());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("time 1"));
        assert!(lines[2].contains("In1"));
        assert!(lines[2].contains("P1"));
        assert!(lines[3].contains("N2_load_enable=true"));
    }

    #[test]
    fn step_line_describes_event() {
        let report = StepReport {
            significant_event: true,
            product_moved: false,
            micro_steps: 4,
            hit_bound: false,
        };
        assert_eq!(render_step(2, &report, 9), "step 2: signals changed after 4 micro-steps, time 9");
    }

    #[test]
    fn outcome_line_names_reason() {
        let outcome = RunOutcome {
            reason: StopReason::ProductionFinished,
            steps: 12,
            micro_steps: 30,
        };
        assert_eq!(render_outcome(&outcome), "stopped: ProductionFinished after 12 steps (30 micro-steps)");
    }

    #[test]
    fn transfer_event_shows_both_ends() {
        let event = SimEvent::ProductTransferred {
            product: ProductId(3),
            from: UnitId(1),
            to: UnitId(2),
            time: 7,
        };
        assert_eq!(render_event(&event), "     7  P3 #1 -> #2");
    }
}
