//! Serde data file structs for line definitions.
//!
//! These mirror the flat records a line editor produces: every unit carries
//! every optional field, and commands are distinguished by a `type` string.
//! They are deserialized from RON, JSON, or TOML and then resolved into core
//! configuration by the loader.

use serde::Deserialize;

fn default_true() -> bool {
    true
}

// ===========================================================================
// Line
// ===========================================================================

/// A complete line file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineData {
    #[serde(default = "default_true")]
    pub prime_initial_signals: bool,
    #[serde(default)]
    pub event_capacity: Option<usize>,
    pub units: Vec<UnitData>,
}

// ===========================================================================
// Units
// ===========================================================================

/// A unit record. Which fields apply depends on `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitData {
    pub id: u32,
    pub name: String,
    #[serde(rename = "type", alias = "kind")]
    pub unit_type: UnitType,
    #[serde(default)]
    pub max_capacity: Option<usize>,
    #[serde(default)]
    pub input_time: Option<u64>,
    #[serde(default)]
    pub total_quantity: Option<u64>,
    #[serde(default)]
    pub discharge_interval: Option<u64>,
    #[serde(default)]
    pub next_unit_id: Option<u32>,
    #[serde(default)]
    pub actions: Vec<ActionGroupData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    Input,
    Normal,
    Output,
}

// ===========================================================================
// Action programs
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ActionGroupData {
    /// Defaults to `ag_<index>`.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub commands: Vec<CommandData>,
}

/// A command record. `SET_SIGNAL` needs `signal` and `value`; `DELAY` needs
/// `duration`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandData {
    #[serde(rename = "type", alias = "kind")]
    pub command_type: CommandType,
    #[serde(default)]
    pub signal: Option<String>,
    #[serde(default)]
    pub value: Option<bool>,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default, alias = "affects_previous")]
    pub affects_previous: bool,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    SetSignal,
    Delay,
}
