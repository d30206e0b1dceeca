//! Resolution pipeline: reads a line file, resolves its records into core
//! configuration, and validates the result.
//!
//! Provides format detection (RON/JSON/TOML) and deserialization helpers.

use std::path::{Path, PathBuf};

use linesim_core::config::{ConfigError, LineConfig, UnitConfig, UnitKindConfig};
use linesim_core::engine::Simulation;
use linesim_core::event::DEFAULT_EVENT_CAPACITY;
use linesim_core::id::UnitId;
use linesim_core::program::{ActionGroup, ActionProgram, Command};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::schema::{ActionGroupData, CommandData, CommandType, LineData, UnitData, UnitType};

/// Default line shipped with the crate.
const DEFAULT_LINE: &str = include_str!("../lines/default_line.toml");

/// Normal units without `maxCapacity` hold one product.
const DEFAULT_NORMAL_CAPACITY: usize = 1;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while loading a line.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A command record lacks a field its type requires.
    #[error("invalid command in {file}, unit {unit}, group '{group}': {detail}")]
    InvalidCommand {
        file: PathBuf,
        unit: u32,
        group: String,
        detail: String,
    },

    /// Output units end the line and cannot have a successor.
    #[error("output unit {unit} in {file} has a next unit")]
    OutputWithSuccessor { file: PathBuf, unit: u32 },

    /// The resolved line failed validation.
    #[error("invalid line in {file}: {source}")]
    Config {
        file: PathBuf,
        #[source]
        source: ConfigError,
    },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Deserialize `content` in the given format. `file` is only used in errors.
pub fn deserialize_str<T: DeserializeOwned>(content: &str, format: Format, file: &Path) -> Result<T, DataLoadError> {
    let parse_error = |detail: String| DataLoadError::Parse {
        file: file.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format, path)
}

// ===========================================================================
// Loading
// ===========================================================================

/// Parse and resolve a line from a string.
pub fn parse_line(content: &str, format: Format, file: &Path) -> Result<LineConfig, DataLoadError> {
    let data: LineData = deserialize_str(content, format, file)?;
    resolve_line(data, file)
}

/// Load, resolve and validate a line file.
pub fn load_line(path: &Path) -> Result<LineConfig, DataLoadError> {
    let data: LineData = deserialize_file(path)?;
    resolve_line(data, path)
}

/// Load a line file and build a simulation from it.
pub fn load_simulation(path: &Path) -> Result<Simulation, DataLoadError> {
    let config = load_line(path)?;
    Simulation::new(config).map_err(|source| DataLoadError::Config {
        file: path.to_path_buf(),
        source,
    })
}

/// The built-in two-station line.
pub fn default_line() -> Result<LineConfig, DataLoadError> {
    parse_line(DEFAULT_LINE, Format::Toml, Path::new("default_line.toml"))
}

// ===========================================================================
// Resolution
// ===========================================================================

/// Turn flat file records into core configuration and validate it.
pub fn resolve_line(data: LineData, file: &Path) -> Result<LineConfig, DataLoadError> {
    let units = data
        .units
        .iter()
        .map(|unit| resolve_unit(unit, file))
        .collect::<Result<Vec<_>, _>>()?;

    let config = LineConfig::new(units)
        .with_priming(data.prime_initial_signals)
        .with_event_capacity(data.event_capacity.unwrap_or(DEFAULT_EVENT_CAPACITY));
    config.validate().map_err(|source| DataLoadError::Config {
        file: file.to_path_buf(),
        source,
    })?;
    debug!(file = %file.display(), units = config.units.len(), "line resolved");
    Ok(config)
}

fn resolve_unit(unit: &UnitData, file: &Path) -> Result<UnitConfig, DataLoadError> {
    let next_unit = unit.next_unit_id.map(UnitId);
    if unit.unit_type != UnitType::Normal && !unit.actions.is_empty() {
        warn!(unit = unit.id, file = %file.display(), "actions on a non-normal unit are ignored");
    }

    let kind = match unit.unit_type {
        UnitType::Input => UnitKindConfig::Input {
            input_time: unit.input_time.unwrap_or(0),
            total_quantity: unit.total_quantity,
            max_capacity: unit.max_capacity,
            next_unit,
        },
        UnitType::Normal => UnitKindConfig::Normal {
            max_capacity: unit.max_capacity.unwrap_or(DEFAULT_NORMAL_CAPACITY),
            next_unit,
            program: resolve_program(unit, file)?,
        },
        UnitType::Output => {
            if next_unit.is_some() {
                return Err(DataLoadError::OutputWithSuccessor {
                    file: file.to_path_buf(),
                    unit: unit.id,
                });
            }
            UnitKindConfig::Output {
                discharge_interval: unit.discharge_interval.unwrap_or(0),
                max_capacity: unit.max_capacity,
            }
        }
    };

    Ok(UnitConfig {
        id: UnitId(unit.id),
        name: unit.name.clone(),
        kind,
    })
}

fn resolve_program(unit: &UnitData, file: &Path) -> Result<ActionProgram, DataLoadError> {
    let groups = unit
        .actions
        .iter()
        .enumerate()
        .map(|(index, group)| resolve_group(unit.id, index, group, file))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ActionProgram::new(groups))
}

fn resolve_group(unit: u32, index: usize, group: &ActionGroupData, file: &Path) -> Result<ActionGroup, DataLoadError> {
    let commands = group
        .commands
        .iter()
        .map(|command| {
            resolve_command(command).map_err(|detail| DataLoadError::InvalidCommand {
                file: file.to_path_buf(),
                unit,
                group: group.name.clone(),
                detail: detail.to_owned(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let id = group.id.clone().unwrap_or_else(|| format!("ag_{index}"));
    Ok(ActionGroup::new(id, group.name.clone(), commands))
}

fn resolve_command(command: &CommandData) -> Result<Command, &'static str> {
    match command.command_type {
        CommandType::SetSignal => {
            let signal = command.signal.as_ref().ok_or("SET_SIGNAL without `signal`")?;
            let value = command.value.ok_or("SET_SIGNAL without `value`")?;
            Ok(Command::set_signal(signal.clone(), value))
        }
        CommandType::Delay => {
            let duration = command.duration.ok_or("DELAY without `duration`")?;
            Ok(Command::Delay {
                duration,
                affects_previous: command.affects_previous,
                description: command.description.clone().unwrap_or_default(),
            })
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
