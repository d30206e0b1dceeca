//! Line file loading for the linesim engine.
//!
//! Line definitions live in RON, TOML, or JSON files (detected by
//! extension). [`schema`] holds the on-disk records; [`loader`] resolves
//! them into [`linesim_core::config::LineConfig`].

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, Format, default_line, load_line, load_simulation, parse_line};
