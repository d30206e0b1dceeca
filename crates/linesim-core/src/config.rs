//! In-memory line configuration and its validation.
//!
//! A [`LineConfig`] lists units in registration order, which is also the
//! order in which the executor visits them every micro-step. Each unit
//! names at most one successor. Validation happens once, when a
//! [`Simulation`](crate::engine::Simulation) is built from the config.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::event::DEFAULT_EVENT_CAPACITY;
use crate::id::UnitId;
use crate::program::{ActionProgram, Command};
use crate::time::Ticks;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Rejected configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("line has no units")]
    EmptyLine,

    #[error("unit id {0} is used more than once")]
    DuplicateUnitId(UnitId),

    #[error("unit {unit} feeds unknown unit {next}")]
    UnknownNextUnit { unit: UnitId, next: UnitId },

    #[error("unit {0} feeds itself")]
    SelfLoop(UnitId),

    #[error("unit {0} has a capacity of zero")]
    ZeroCapacity(UnitId),

    #[error("unit {unit}: action group '{group}' sets a signal with an empty name")]
    EmptySignalName { unit: UnitId, group: String },
}

// ---------------------------------------------------------------------------
// Unit configuration
// ---------------------------------------------------------------------------

/// Variant-specific configuration of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitKindConfig {
    Input {
        /// Ticks a freshly created product waits before it may move on.
        input_time: Ticks,
        /// Production cap. `None` produces forever.
        total_quantity: Option<u64>,
        max_capacity: Option<usize>,
        next_unit: Option<UnitId>,
    },
    Normal {
        max_capacity: usize,
        next_unit: Option<UnitId>,
        program: ActionProgram,
    },
    Output {
        /// Minimum ticks between two discharges.
        discharge_interval: Ticks,
        max_capacity: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitConfig {
    pub id: UnitId,
    pub name: String,
    pub kind: UnitKindConfig,
}

impl UnitConfig {
    pub fn input(id: u32, name: impl Into<String>, input_time: Ticks) -> Self {
        Self {
            id: UnitId(id),
            name: name.into(),
            kind: UnitKindConfig::Input {
                input_time,
                total_quantity: None,
                max_capacity: None,
                next_unit: None,
            },
        }
    }

    pub fn normal(id: u32, name: impl Into<String>, max_capacity: usize, program: ActionProgram) -> Self {
        Self {
            id: UnitId(id),
            name: name.into(),
            kind: UnitKindConfig::Normal {
                max_capacity,
                next_unit: None,
                program,
            },
        }
    }

    pub fn output(id: u32, name: impl Into<String>, discharge_interval: Ticks) -> Self {
        Self {
            id: UnitId(id),
            name: name.into(),
            kind: UnitKindConfig::Output {
                discharge_interval,
                max_capacity: None,
            },
        }
    }

    /// Set the production cap of an Input unit. Ignored for other kinds.
    pub fn with_quota(mut self, quota: u64) -> Self {
        if let UnitKindConfig::Input { total_quantity, .. } = &mut self.kind {
            *total_quantity = Some(quota);
        }
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        match &mut self.kind {
            UnitKindConfig::Input { max_capacity, .. } | UnitKindConfig::Output { max_capacity, .. } => {
                *max_capacity = Some(capacity);
            }
            UnitKindConfig::Normal { max_capacity, .. } => *max_capacity = capacity,
        }
        self
    }

    /// Point this unit at its successor. Output units have none; the call
    /// is ignored for them.
    pub fn feeding(mut self, next: u32) -> Self {
        self.set_next_unit(Some(UnitId(next)));
        self
    }

    pub fn next_unit(&self) -> Option<UnitId> {
        match &self.kind {
            UnitKindConfig::Input { next_unit, .. } | UnitKindConfig::Normal { next_unit, .. } => *next_unit,
            UnitKindConfig::Output { .. } => None,
        }
    }

    pub fn set_next_unit(&mut self, next: Option<UnitId>) {
        match &mut self.kind {
            UnitKindConfig::Input { next_unit, .. } | UnitKindConfig::Normal { next_unit, .. } => *next_unit = next,
            UnitKindConfig::Output { .. } => {}
        }
    }

    fn capacity(&self) -> Option<usize> {
        match &self.kind {
            UnitKindConfig::Input { max_capacity, .. } | UnitKindConfig::Output { max_capacity, .. } => *max_capacity,
            UnitKindConfig::Normal { max_capacity, .. } => Some(*max_capacity),
        }
    }
}

// ---------------------------------------------------------------------------
// Line configuration
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

/// A complete production line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineConfig {
    /// Units in registration (processing) order.
    pub units: Vec<UnitConfig>,
    /// Apply each Normal unit's first-group signal writes before the first
    /// micro-step.
    #[serde(default = "default_true")]
    pub prime_initial_signals: bool,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl LineConfig {
    pub fn new(units: Vec<UnitConfig>) -> Self {
        Self {
            units,
            prime_initial_signals: true,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Build a line where every unit without an explicit successor feeds the
    /// unit registered after it.
    pub fn chain(mut units: Vec<UnitConfig>) -> Self {
        let ids: Vec<UnitId> = units.iter().map(|u| u.id).collect();
        for (unit, next) in units.iter_mut().zip(ids.iter().skip(1)) {
            if unit.next_unit().is_none() {
                unit.set_next_unit(Some(*next));
            }
        }
        Self::new(units)
    }

    pub fn with_priming(mut self, prime: bool) -> Self {
        self.prime_initial_signals = prime;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Check structural soundness: unique ids, resolvable successors, non-zero
    /// capacities and non-empty signal names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.units.is_empty() {
            return Err(ConfigError::EmptyLine);
        }

        let mut seen = HashSet::with_capacity(self.units.len());
        for unit in &self.units {
            if !seen.insert(unit.id) {
                return Err(ConfigError::DuplicateUnitId(unit.id));
            }
        }

        for unit in &self.units {
            if let Some(next) = unit.next_unit() {
                if next == unit.id {
                    return Err(ConfigError::SelfLoop(unit.id));
                }
                if !seen.contains(&next) {
                    return Err(ConfigError::UnknownNextUnit { unit: unit.id, next });
                }
            }
            if unit.capacity() == Some(0) {
                return Err(ConfigError::ZeroCapacity(unit.id));
            }
            if let UnitKindConfig::Normal { program, .. } = &unit.kind {
                for (group, command) in program.commands() {
                    if matches!(command, Command::SetSignal { signal, .. } if signal.is_empty()) {
                        return Err(ConfigError::EmptySignalName {
                            unit: unit.id,
                            group: group.name.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_units() -> Vec<UnitConfig> {
        vec![
            UnitConfig::input(0, "In", 1).with_quota(3),
            UnitConfig::normal(1, "Press", 1, ActionProgram::empty()),
            UnitConfig::output(2, "Out", 0),
        ]
    }

    #[test]
    fn chain_links_in_registration_order() {
        let line = LineConfig::chain(three_units());
        assert_eq!(line.units[0].next_unit(), Some(UnitId(1)));
        assert_eq!(line.units[1].next_unit(), Some(UnitId(2)));
        assert_eq!(line.units[2].next_unit(), None);
        assert!(line.validate().is_ok());
    }

    #[test]
    fn chain_keeps_explicit_successors() {
        let units = vec![
            UnitConfig::input(0, "In", 1).feeding(2),
            UnitConfig::normal(1, "Idle", 1, ActionProgram::empty()),
            UnitConfig::output(2, "Out", 0),
        ];
        let line = LineConfig::chain(units);
        assert_eq!(line.units[0].next_unit(), Some(UnitId(2)));
    }

    #[test]
    fn empty_line_rejected() {
        assert_eq!(LineConfig::new(vec![]).validate(), Err(ConfigError::EmptyLine));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let units = vec![UnitConfig::input(4, "a", 1), UnitConfig::output(4, "b", 0)];
        assert_eq!(
            LineConfig::new(units).validate(),
            Err(ConfigError::DuplicateUnitId(UnitId(4)))
        );
    }

    #[test]
    fn unknown_successor_rejected() {
        let units = vec![UnitConfig::input(0, "In", 1).feeding(7), UnitConfig::output(1, "Out", 0)];
        assert_eq!(
            LineConfig::new(units).validate(),
            Err(ConfigError::UnknownNextUnit {
                unit: UnitId(0),
                next: UnitId(7)
            })
        );
    }

    #[test]
    fn self_loop_rejected() {
        let units = vec![UnitConfig::normal(3, "Loop", 1, ActionProgram::empty()).feeding(3)];
        assert_eq!(LineConfig::new(units).validate(), Err(ConfigError::SelfLoop(UnitId(3))));
    }

    #[test]
    fn zero_capacity_rejected() {
        let units = vec![UnitConfig::normal(1, "Press", 0, ActionProgram::empty())];
        assert_eq!(LineConfig::new(units).validate(), Err(ConfigError::ZeroCapacity(UnitId(1))));
    }

    #[test]
    fn empty_signal_name_rejected() {
        let program = ActionProgram::builder()
            .group("broken", vec![Command::set_signal("", true)])
            .build();
        let units = vec![UnitConfig::normal(1, "Press", 1, program)];
        let err = LineConfig::new(units).validate().unwrap_err();
        assert!(matches!(err, ConfigError::EmptySignalName { group, .. } if group == "broken"));
    }

    #[test]
    fn feeding_ignored_on_output() {
        let out = UnitConfig::output(2, "Out", 0).feeding(0);
        assert_eq!(out.next_unit(), None);
    }

    #[test]
    fn quota_only_applies_to_input() {
        let normal = UnitConfig::normal(1, "Press", 2, ActionProgram::empty()).with_quota(9);
        assert!(matches!(normal.kind, UnitKindConfig::Normal { max_capacity: 2, .. }));
    }
}
