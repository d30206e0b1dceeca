//! The simulation state and the micro-step executor.
//!
//! A [`Simulation`] owns every unit plus the global clock and counters. One
//! micro-step advances the clock by exactly one tick and visits every unit
//! once in registration order. Products transferred during the micro-step
//! are merged into their receivers after the pass, so a receiver acts on a
//! product only from the next tick on.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::config::{ConfigError, LineConfig};
use crate::error::SimError;
use crate::event::{EventKind, EventLog, SimEvent};
use crate::hash::StateHash;
use crate::id::UnitId;
use crate::query::{SimSnapshot, UnitSnapshot};
use crate::time::Ticks;
use crate::unit::{TickContext, Unit, UnitKind, UnitStatus};

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// An independent simulation session.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: LineConfig,
    pub(crate) units: Vec<Unit>,
    index: HashMap<UnitId, usize>,
    pub(crate) time: Ticks,
    /// Id of the next product to create. Ids start at 1.
    pub(crate) next_product_id: u64,
    pub(crate) discharged: u64,
    pub(crate) manual_steps: u64,
    pub(crate) running: bool,
    pub(crate) events: EventLog,
}

impl Simulation {
    /// Validate `config` and build a fresh session from it.
    pub fn new(config: LineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let units = build_units(&config);
        let index = units.iter().enumerate().map(|(i, u)| (u.id(), i)).collect();
        let events = EventLog::new(config.event_capacity);
        info!(units = units.len(), primed = config.prime_initial_signals, "simulation created");

        Ok(Self {
            config,
            units,
            index,
            time: 0,
            next_product_id: 1,
            discharged: 0,
            manual_steps: 0,
            running: false,
            events,
        })
    }

    /// Return every unit, counter, the clock and the event log to the state
    /// right after construction. Display names set through
    /// [`rename_unit`](Self::rename_unit) are kept.
    pub fn reset(&mut self) {
        let names: Vec<String> = self.units.iter().map(|u| u.name().to_owned()).collect();
        self.units = build_units(&self.config);
        for (unit, name) in self.units.iter_mut().zip(names) {
            unit.rename(name);
        }
        self.time = 0;
        self.next_product_id = 1;
        self.discharged = 0;
        self.manual_steps = 0;
        self.running = false;
        self.events.clear();
        info!("simulation reset");
    }

    // -----------------------------------------------------------------------
    // Micro-step
    // -----------------------------------------------------------------------

    /// Advance the clock by one tick and run every unit's handler once.
    pub fn micro_step(&mut self) {
        self.time += 1;
        let mut ctx = TickContext {
            now: self.time,
            next_product_id: &mut self.next_product_id,
            discharged: &mut self.discharged,
            events: &mut self.events,
        };

        for i in 0..self.units.len() {
            let next = self.units[i]
                .next_unit()
                .and_then(|id| self.index.get(&id).copied());
            let (unit, successor) = pair_mut(&mut self.units, i, next);
            unit.tick(successor, &mut ctx);
        }

        for unit in &mut self.units {
            unit.settle_inbound();
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The configuration this session was built from.
    pub fn config(&self) -> &LineConfig {
        &self.config
    }

    /// Current simulated time in ticks.
    pub fn time(&self) -> Ticks {
        self.time
    }

    /// Products discharged by Output units so far.
    pub fn discharged(&self) -> u64 {
        self.discharged
    }

    /// Id the next created product will receive.
    pub fn next_product_id(&self) -> u64 {
        self.next_product_id
    }

    /// Number of manual steps taken since construction or reset.
    pub fn manual_step_count(&self) -> u64 {
        self.manual_steps
    }

    /// Whether an auto-run loop is currently driving this session.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Units in registration order.
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Look up a unit by id.
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.index.get(&id).map(|&i| &self.units[i])
    }

    /// First unit whose current display name is `name`.
    pub fn unit_by_name(&self, name: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.name() == name)
    }

    /// The first registered Input unit, whose quota governs when production
    /// is finished.
    pub fn input_unit(&self) -> Option<&Unit> {
        self.units.iter().find(|u| u.kind() == UnitKind::Input)
    }

    /// Change a unit's display name. Its readiness signal keeps the name it
    /// was registered with, so handshakes and programs are unaffected.
    pub fn rename_unit(&mut self, id: UnitId, name: impl Into<String>) -> Result<(), SimError> {
        let &i = self.index.get(&id).ok_or(SimError::UnknownUnit(id))?;
        let name = name.into();
        debug!(unit = %id, from = %self.units[i].name(), to = %name, "unit renamed");
        self.units[i].rename(name);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// The bounded log of recorded events.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Take every buffered event, oldest first.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.events.drain()
    }

    /// Stop recording events of `kind`.
    pub fn suppress_event(&mut self, kind: EventKind) {
        self.events.suppress(kind);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Owned snapshot of the clock, counters and every unit.
    pub fn snapshot(&self) -> SimSnapshot {
        SimSnapshot {
            time: self.time,
            manual_steps: self.manual_steps,
            discharged: self.discharged,
            next_product_id: self.next_product_id,
            units: self.units.iter().map(UnitSnapshot::of).collect(),
        }
    }

    /// Snapshot of a single unit, or `None` for an unknown id.
    pub fn snapshot_unit(&self, id: UnitId) -> Option<UnitSnapshot> {
        self.unit(id).map(UnitSnapshot::of)
    }

    /// Hash of the clock, counters, queues, statuses, cursors and signals.
    /// Two sessions built from the same configuration and driven the same
    /// way hash equal.
    pub fn state_hash(&self) -> u64 {
        let mut h = StateHash::new();
        h.write_u64(self.time);
        h.write_u64(self.next_product_id);
        h.write_u64(self.discharged);
        for unit in &self.units {
            h.write_u32(unit.id().0);
            h.write(&[status_tag(unit.status())]);
            h.write_u64(unit.delay_end_time());
            h.write_u64(unit.cursor().action as u64);
            h.write_u64(unit.cursor().command as u64);
            h.write_u64(unit.products().len() as u64);
            for product in unit.products() {
                h.write_u64(product.id.0);
                h.write_u64(product.creation_time);
            }
            for (name, value) in unit.signals().iter() {
                h.write_str(name);
                h.write_bool(value);
            }
        }
        h.finish()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_units(config: &LineConfig) -> Vec<Unit> {
    config
        .units
        .iter()
        .map(|cfg| {
            let mut unit = Unit::from_config(cfg);
            if config.prime_initial_signals {
                unit.prime_signals();
            }
            unit
        })
        .collect()
}

/// Borrow unit `i` mutably together with its successor `j`.
fn pair_mut(units: &mut [Unit], i: usize, j: Option<usize>) -> (&mut Unit, Option<&mut Unit>) {
    match j {
        Some(j) if j > i => {
            let (head, tail) = units.split_at_mut(j);
            (&mut head[i], Some(&mut tail[0]))
        }
        Some(j) if j < i => {
            let (head, tail) = units.split_at_mut(i);
            (&mut tail[0], Some(&mut head[j]))
        }
        _ => (&mut units[i], None),
    }
}

fn status_tag(status: UnitStatus) -> u8 {
    match status {
        UnitStatus::Idle => 0,
        UnitStatus::ProcessingDelay => 1,
        UnitStatus::ProcessingDelayCommand => 2,
    }
}
