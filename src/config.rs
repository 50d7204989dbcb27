//! Engine configuration defaults and CLI override parsing.
//!
//! Two sources feed the engine configuration before a stage runs:
//!
//! 1. A JSON config file (`--config`) holding the general calculation
//!    parameters (method, basis set, and any other route keywords) as a
//!    flat string map. It is merged into the engine configuration once, when
//!    the orchestrator is constructed.
//! 2. An extras string (`--extras`) of comma-separated `KEY=VALUE` pairs.
//!    These become substitution values for the stage keyword templates and
//!    may shadow the built-in `root`/`nstates` values.
//!
//! The extras parser is deliberately fail-soft: a string that does not parse
//! degrades to an empty override map instead of raising an error. This
//! mirrors the behavior the batch scripts depend on.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Unit conversion constant: Hartree to electronvolt
pub const HARTREE_TO_EV: f64 = 27.211386245988;

/// Errors raised while loading the JSON config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error when reading the config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Config file is not a JSON object of strings
    #[error("invalid config file {path}: {source}")]
    Json {
        /// Path of the offending file
        path: String,
        /// Underlying JSON error
        source: serde_json::Error,
    },
}

/// Loads the default engine parameters from a JSON config file.
///
/// The file must contain a single JSON object whose values are strings,
/// e.g. `{"method": "B3LYP", "basis": "6-31G*"}`. Keys are returned in
/// sorted order so the generated input files are reproducible.
pub fn load_config(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// Parses an extras string of the form `KEY1=VAL1,KEY2=VAL2`.
///
/// Malformed input degrades to an empty map; no error is raised. A pair
/// without `=`, an empty key, or an empty string all count as malformed.
///
/// # Examples
///
/// ```
/// use g09run::config::parse_extras;
///
/// let extras = parse_extras("a=1,b=2");
/// assert_eq!(extras.get("a").map(String::as_str), Some("1"));
///
/// assert!(parse_extras("garbage").is_empty());
/// ```
pub fn parse_extras(raw: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for pair in raw.trim().split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                map.insert(key.trim().to_string(), value.trim().to_string());
            }
            _ => return BTreeMap::new(),
        }
    }
    map
}
