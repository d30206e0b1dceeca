//! Per-unit boolean signal stores and the readiness handshake name.
//!
//! Signals live in the namespace of the unit that owns them but are read by
//! other units: an upstream unit checks the target's readiness signal before
//! moving a product into it. Unset signals read as "not true".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::UnitId;

/// Suffix shared by every readiness signal.
pub const READY_SUFFIX: &str = "_load_enable";

// ---------------------------------------------------------------------------
// Signal store
// ---------------------------------------------------------------------------

/// Mapping signal name -> boolean. Ordered so that snapshots and equality
/// comparisons are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalStore {
    values: BTreeMap<String, bool>,
}

impl SignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored value, or `None` if the signal was never set.
    pub fn get(&self, name: &str) -> Option<bool> {
        self.values.get(name).copied()
    }

    /// True only if the signal has been explicitly set to `true`.
    pub fn is_true(&self, name: &str) -> bool {
        self.get(name) == Some(true)
    }

    /// Set a signal. Returns whether the store changed, where writing a
    /// previously unset signal counts as a change even when `value` is false.
    pub fn set(&mut self, name: &str, value: bool) -> bool {
        match self.values.get_mut(name) {
            Some(current) if *current == value => false,
            Some(current) => {
                *current = value;
                true
            }
            None => {
                self.values.insert(name.to_owned(), value);
                true
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Copy of the underlying map, for snapshots.
    pub fn to_map(&self) -> BTreeMap<String, bool> {
        self.values.clone()
    }
}

// ---------------------------------------------------------------------------
// Readiness signal
// ---------------------------------------------------------------------------

/// The readiness signal of a receiving unit, resolved once when the unit is
/// registered. Renaming the unit afterwards does not change it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReadinessSignal {
    unit: UnitId,
    name: String,
}

impl ReadinessSignal {
    /// Derive the readiness signal from a unit's display name.
    pub fn for_unit(unit: UnitId, display_name: &str) -> Self {
        Self {
            unit,
            name: format!("{}{READY_SUFFIX}", clean_unit_name(display_name)),
        }
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Strip control characters and whitespace from a display name.
pub fn clean_unit_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control() && !c.is_whitespace())
        .collect()
}

/// Whether `name` follows the readiness naming convention.
pub fn is_readiness_signal(name: &str) -> bool {
    name.ends_with(READY_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_signal_is_not_true() {
        let store = SignalStore::new();
        assert_eq!(store.get("a"), None);
        assert!(!store.is_true("a"));
    }

    #[test]
    fn set_reports_changes() {
        let mut store = SignalStore::new();
        assert!(store.set("a", false), "first write of false still changes the map");
        assert!(!store.set("a", false));
        assert!(store.set("a", true));
        assert!(store.is_true("a"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn equality_is_order_independent() {
        let mut a = SignalStore::new();
        a.set("x", true);
        a.set("y", false);
        let mut b = SignalStore::new();
        b.set("y", false);
        b.set("x", true);
        assert_eq!(a, b);
    }

    #[test]
    fn readiness_name_strips_whitespace_and_controls() {
        let sig = ReadinessSignal::for_unit(UnitId(2), " Press\tLine 2\n");
        assert_eq!(sig.name(), "PressLine2_load_enable");
        assert_eq!(sig.unit(), UnitId(2));
    }

    #[test]
    fn readiness_convention() {
        assert!(is_readiness_signal("Unit1_load_enable"));
        assert!(!is_readiness_signal("Unit1_load_enable_backup"));
        assert!(!is_readiness_signal("Unit1_ready"));
    }
}
