//! Conversion options and the optional JSON config file.
use std::path::Path;

use serde::Deserialize;

use crate::path_de::{self, PathError};

/// Nesting ceiling applied when no configuration overrides it.
pub const DEFAULT_MAX_DEPTH: usize = 128;

const NANOS_PER_MILLI: i64 = 1_000_000;

// ------------------------------- Time unit -------------------------------- //

/// Unit of the integers produced for timestamps, dates and day-time intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
pub enum TimeUnit {
    #[serde(rename = "ns", alias = "nanoseconds")]
    #[value(name = "ns")]
    Nanoseconds,
    #[default]
    #[serde(rename = "us", alias = "microseconds")]
    #[value(name = "us")]
    Microseconds,
    #[serde(rename = "ms", alias = "milliseconds")]
    #[value(name = "ms")]
    Milliseconds,
}

impl TimeUnit {
    /// Nanoseconds in one output unit.
    pub const fn ns_per_unit(self) -> i64 {
        match self {
            TimeUnit::Nanoseconds => 1,
            TimeUnit::Microseconds => 1_000,
            TimeUnit::Milliseconds => NANOS_PER_MILLI,
        }
    }

    /// Output units in one millisecond.
    pub const fn units_per_ms(self) -> i64 {
        NANOS_PER_MILLI / self.ns_per_unit()
    }
}

// ------------------------------- Options ---------------------------------- //

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    pub time_unit: TimeUnit,
    pub max_depth: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self { time_unit: TimeUnit::default(), max_depth: DEFAULT_MAX_DEPTH }
    }
}

impl ConvertOptions {
    pub fn with_time_unit(mut self, time_unit: TimeUnit) -> Self {
        self.time_unit = time_unit;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

// ------------------------------- Config file ------------------------------ //

/// On-disk configuration: `{"type_spec": "...", "time_unit": "us", "max_depth": 64}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub type_spec: Option<String>,
    pub time_unit: Option<TimeUnit>,
    pub max_depth: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: PathError,
    },
    #[error("max_depth must be at least 1")]
    ZeroDepth,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let source = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: display.clone(), source })?;
        Self::from_json(&source).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse { path: display, source },
            other => other,
        })
    }

    pub fn from_json(src: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = path_de::from_str_with_path(src)
            .map_err(|source| ConfigError::Parse { path: "<inline>".into(), source })?;
        if file.max_depth == Some(0) {
            return Err(ConfigError::ZeroDepth);
        }
        Ok(file)
    }

    /// File values layered over the defaults.
    pub fn options(&self) -> ConvertOptions {
        let mut options = ConvertOptions::default();
        if let Some(unit) = self.time_unit {
            options.time_unit = unit;
        }
        if let Some(depth) = self.max_depth {
            options.max_depth = depth;
        }
        options
    }
}
