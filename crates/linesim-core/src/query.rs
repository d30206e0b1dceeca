//! Read-only snapshots of simulation state.
//!
//! Snapshots are owned copies; nothing borrows from the engine, so a
//! rendering layer can keep them across steps.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::id::UnitId;
use crate::product::Product;
use crate::program::ProgramCursor;
use crate::time::Ticks;
use crate::unit::{Unit, UnitKind, UnitStatus};

// ---------------------------------------------------------------------------
// Unit snapshot
// ---------------------------------------------------------------------------

/// A view of one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitSnapshot {
    pub id: UnitId,
    pub name: String,
    pub kind: UnitKind,
    pub status: UnitStatus,
    /// Held products, head first.
    pub products: Vec<Product>,
    pub signals: BTreeMap<String, bool>,
    /// Position in the action program. Always the start for non-Normal units.
    pub cursor: ProgramCursor,
    pub max_capacity: Option<usize>,
}

impl UnitSnapshot {
    pub fn of(unit: &Unit) -> Self {
        Self {
            id: unit.id(),
            name: unit.name().to_owned(),
            kind: unit.kind(),
            status: unit.status(),
            products: unit.products().iter().copied().collect(),
            signals: unit.signals().to_map(),
            cursor: unit.cursor(),
            max_capacity: unit.max_capacity(),
        }
    }
}

// ---------------------------------------------------------------------------
// Simulation snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimSnapshot {
    pub time: Ticks,
    pub manual_steps: u64,
    pub discharged: u64,
    pub next_product_id: u64,
    /// Units in registration order.
    pub units: Vec<UnitSnapshot>,
}

impl SimSnapshot {
    pub fn unit(&self, id: UnitId) -> Option<&UnitSnapshot> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Products currently held anywhere on the line.
    pub fn products_in_line(&self) -> usize {
        self.units.iter().map(|u| u.products.len()).sum()
    }
}
