//! Criterion benchmarks for the line engine.
//!
//! - `micro_step`: raw executor throughput on a long chain.
//! - `auto_step`: step controller overhead (snapshot and compare per tick).
//! - `full_run`: a complete run of a two-station line to production finish.

use criterion::{Criterion, criterion_group, criterion_main};
use linesim_core::engine::Simulation;
use linesim_core::run::{CancelToken, RunOptions};
use linesim_core::step::StepMode;
use linesim_core::test_utils::*;

/// 50 stations with staggered work times and an unlimited Input.
fn long_chain() -> Simulation {
    let work: Vec<u64> = (0..50).map(|i| 1 + i % 7).collect();
    simulation(linear_line(1, None, &work))
}

fn bench_micro_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("micro_step");
    let mut sim = long_chain();
    // Warm the line so every station holds work.
    for _ in 0..1_000 {
        sim.micro_step();
    }
    group.bench_function("chain_50", |b| {
        b.iter(|| sim.micro_step());
    });
    group.finish();
}

fn bench_auto_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("auto_step");
    let mut sim = long_chain();
    group.bench_function("chain_50", |b| {
        b.iter(|| sim.step(StepMode::Auto));
    });
    group.finish();
}

fn bench_full_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_run");
    group.bench_function("two_station_100", |b| {
        b.iter(|| {
            let mut sim = simulation(two_station_line(Some(100)));
            sim.run(&RunOptions::default(), &CancelToken::new())
        });
    });
    group.finish();
}

criterion_group!(benches, bench_micro_step, bench_auto_step, bench_full_run);
criterion_main!(benches);
