//! Search parameters and their JSON record.
//!
//! The record is `{"mode": "depth"|"movetime", "depth": 20, "movetime": 3000}`.
//! Older files that use `goParam`/`current` for the mode, keep the numbers
//! under `value`, or store them as strings are still understood and are
//! rewritten in the current layout after loading.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::protocol::uci::GoParams;

pub const DEFAULT_DEPTH: u32 = 20;
pub const DEFAULT_MOVETIME_MS: u64 = 3000;

/// Errors from reading, writing or editing search parameters.
#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("params file i/o: {0}")]
    Io(#[from] io::Error),

    #[error("params file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown search parameter '{0}'")]
    UnknownParameter(String),

    #[error("invalid value '{value}' for search parameter '{name}'")]
    InvalidValue { name: String, value: String },
}

/// How the engine's search is limited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Depth,
    Movetime,
}

impl FromStr for SearchMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "depth" => Ok(SearchMode::Depth),
            "movetime" => Ok(SearchMode::Movetime),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Depth => f.write_str("depth"),
            SearchMode::Movetime => f.write_str("movetime"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub mode: SearchMode,
    pub depth: u32,
    pub movetime: u64,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            mode: SearchMode::Depth,
            depth: DEFAULT_DEPTH,
            movetime: DEFAULT_MOVETIME_MS,
        }
    }
}

/// Reads a number stored either as a JSON number or a numeric string.
fn as_number(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl SearchParams {
    /// Builds parameters from a JSON record in any supported layout. Missing
    /// or malformed fields fall back to their defaults individually.
    pub fn from_value(value: &Value) -> SearchParams {
        let defaults = SearchParams::default();
        let nested = value.get("value");
        let field = |name: &str| {
            as_number(value.get(name)).or_else(|| as_number(nested.and_then(|v| v.get(name))))
        };

        let mode = ["mode", "goParam", "current"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str))
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.mode);
        let depth = field("depth")
            .and_then(|d| u32::try_from(d).ok())
            .filter(|&d| d > 0)
            .unwrap_or(defaults.depth);
        let movetime = field("movetime")
            .filter(|&t| t > 0)
            .unwrap_or(defaults.movetime);

        SearchParams {
            mode,
            depth,
            movetime,
        }
    }

    /// Loads parameters from `path`, falling back to defaults when the file
    /// is missing or unreadable, then writes the normalized record back.
    pub fn load(path: &Path) -> SearchParams {
        let params = match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Ok(value) => SearchParams::from_value(&value),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "malformed params file, using defaults");
                    SearchParams::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no params file, using defaults");
                SearchParams::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read params file, using defaults");
                SearchParams::default()
            }
        };
        if let Err(e) = params.save(path) {
            warn!(path = %path.display(), error = %e, "cannot save params file");
        }
        params
    }

    pub fn save(&self, path: &Path) -> Result<(), ParamsError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Updates one parameter by name: `mode` (alias `goParam`), `depth` or
    /// `movetime`.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), ParamsError> {
        let invalid = || ParamsError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        };
        match name {
            "mode" | "goParam" => self.mode = value.parse().map_err(|_| invalid())?,
            "depth" => {
                self.depth = value
                    .trim()
                    .parse()
                    .ok()
                    .filter(|&d: &u32| d > 0)
                    .ok_or_else(invalid)?
            }
            "movetime" => {
                self.movetime = value
                    .trim()
                    .parse()
                    .ok()
                    .filter(|&t: &u64| t > 0)
                    .ok_or_else(invalid)?
            }
            other => return Err(ParamsError::UnknownParameter(other.to_string())),
        }
        Ok(())
    }

    pub fn go_params(&self) -> GoParams {
        match self.mode {
            SearchMode::Depth => GoParams {
                depth: Some(self.depth),
                ..GoParams::default()
            },
            SearchMode::Movetime => GoParams {
                movetime: Some(self.movetime),
                ..GoParams::default()
            },
        }
    }
}

impl fmt::Display for SearchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mode={} depth={} movetime={}",
            self.mode, self.depth, self.movetime
        )
    }
}
