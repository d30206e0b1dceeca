mod logging;
mod report;

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use linesim_core::engine::Simulation;
use linesim_core::run::{CancelToken, RunOptions};
use linesim_core::step::StepMode;

#[derive(Parser)]
#[command(name = "linesim", version, about = "Step through production-line simulations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Auto-run a line until production finishes or the line stalls.
    Run {
        file: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Take individual steps, printing the line after each.
    Step {
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        count: u64,
        /// Stop at signal changes too, not only at product movement.
        #[arg(long)]
        auto: bool,
    },
    /// Auto-step until the clock reaches `time`.
    Until { file: PathBuf, time: u64 },
    /// Auto-run the built-in two-station line.
    Demo {
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args)]
struct RunArgs {
    #[arg(long)]
    max_steps: Option<u64>,
    /// Pause between steps, in milliseconds.
    #[arg(long, default_value_t = 0)]
    pause_ms: u64,
    /// Cancel the run after this many milliseconds of wall time.
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Print a line per step.
    #[arg(long)]
    trace_steps: bool,
    /// Print the buffered event log when the run stops.
    #[arg(long)]
    events: bool,
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Run { file, run } => {
            let mut sim = load(&file)?;
            run_line(&mut sim, &run)
        }
        Command::Step { file, count, auto } => {
            let mut sim = load(&file)?;
            step_line(&mut sim, count, auto)
        }
        Command::Until { file, time } => {
            let mut sim = load(&file)?;
            let steps = sim.run_until_time(time)?;
            println!("{steps} auto steps");
            print!("{}", report::render_snapshot(&sim.snapshot()));
            Ok(())
        }
        Command::Demo { run } => {
            let config = linesim_data::default_line().context("loading built-in line")?;
            let mut sim = Simulation::new(config).context("building built-in line")?;
            run_line(&mut sim, &run)
        }
    }
}

fn load(path: &Path) -> Result<Simulation> {
    linesim_data::load_simulation(path).with_context(|| format!("loading line {}", path.display()))
}

fn run_line(sim: &mut Simulation, args: &RunArgs) -> Result<()> {
    let mut options = RunOptions::default().with_pause(Duration::from_millis(args.pause_ms));
    if let Some(max) = args.max_steps {
        options = options.with_max_steps(max);
    }

    let cancel = CancelToken::new();
    if let Some(ms) = args.timeout_ms {
        let timer = cancel.clone();
        thread::Builder::new()
            .name("linesim-timeout".into())
            .spawn(move || {
                thread::sleep(Duration::from_millis(ms));
                tracing::info!(timeout_ms = ms, "timeout reached, cancelling run");
                timer.cancel();
            })
            .context("starting timeout thread")?;
    }

    let trace = args.trace_steps;
    let mut index = 0;
    let outcome = sim.run_with(&options, &cancel, |sim, step| {
        index += 1;
        if trace {
            println!("{}", report::render_step(index, step, sim.time()));
        }
    });
    tracing::debug!(
        reason = ?outcome.reason,
        steps = outcome.steps,
        micro_steps = outcome.micro_steps,
        "run stopped"
    );

    if args.events {
        for event in sim.drain_events() {
            println!("{}", report::render_event(&event));
        }
    }
    print!("{}", report::render_snapshot(&sim.snapshot()));
    println!("{}", report::render_outcome(&outcome));
    Ok(())
}

fn step_line(sim: &mut Simulation, count: u64, auto: bool) -> Result<()> {
    let mode = if auto { StepMode::Auto } else { StepMode::Manual };
    for index in 1..=count {
        let step = sim.step(mode);
        println!("{}", report::render_step(index, &step, sim.time()));
        print!("{}", report::render_snapshot(&sim.snapshot()));
    }
    Ok(())
}
