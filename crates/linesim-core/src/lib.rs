//! Linesim Core -- a discrete-event stepping engine for production lines.
//!
//! A line is a chain of units. Input units create products, Normal units
//! run looping action programs of signal writes and delays, and Output
//! units discharge finished products. Products move downstream through a
//! single-shot `<unit>_load_enable` handshake.
//!
//! # Stepping
//!
//! - [`engine::Simulation::micro_step`] advances the clock by one tick and
//!   visits every unit once, in registration order.
//! - [`engine::Simulation::step`] runs micro-steps until a product moves
//!   (manual) or anything changes (auto), bounded by
//!   [`step::MAX_MICRO_STEPS`].
//! - [`engine::Simulation::run`] repeats auto steps until production is
//!   finished, the line is quiescent, or a [`run::CancelToken`] fires.
//!
//! ```rust,ignore
//! let mut sim = Simulation::new(LineConfig::chain(units))?;
//! let report = sim.step(StepMode::Manual);
//! let outcome = sim.run(&RunOptions::default(), &CancelToken::new());
//! ```
//!
//! # Key Types
//!
//! - [`config::LineConfig`] -- Units, successors and programs, validated on
//!   construction.
//! - [`unit::Unit`] -- A station and its per-variant state machine.
//! - [`program::ActionProgram`] -- Groups of `SetSignal` and `Delay` commands.
//! - [`event::EventLog`] -- Bounded log of typed simulation events.
//! - [`query::SimSnapshot`] -- Owned snapshot for rendering layers.

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod hash;
pub mod id;
pub mod product;
pub mod program;
pub mod query;
pub mod run;
pub mod signal;
pub mod step;
pub mod time;
pub mod transfer;
pub mod unit;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{ConfigError, LineConfig, UnitConfig, UnitKindConfig};
pub use engine::Simulation;
pub use error::SimError;
pub use run::{CancelToken, RunOptions, RunOutcome, StopReason};
pub use step::{StepMode, StepReport};
