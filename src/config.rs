//! # Lookup Configuration
//!
//! Runtime settings for the lookup driver, layered from lowest to highest
//! priority:
//!
//! 1. built-in defaults (15 km acceptance radius, grid indexing)
//! 2. a JSON or YAML file, picked by extension
//! 3. `H5LOOKUP_*` environment variables
//! 4. command line flags
//!
//! ## Example
//!
//! ```rust
//! use h5lookup::config::{IndexingMode, LookupConfig};
//!
//! let config = LookupConfig::from_yaml("max_distance_km: 5.0\ninteger_indexing: legacy_row\n")?;
//! assert_eq!(config.max_distance_km, 5.0);
//! assert_eq!(config.integer_indexing, IndexingMode::LegacyRow);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Default acceptance radius around the target, in kilometers.
pub const DEFAULT_MAX_DISTANCE_KM: f64 = 15.0;

pub const ENV_MAX_DISTANCE_KM: &str = "H5LOOKUP_MAX_DISTANCE_KM";
pub const ENV_INTEGER_INDEXING: &str = "H5LOOKUP_INTEGER_INDEXING";
pub const ENV_LOG_LEVEL: &str = "H5LOOKUP_LOG_LEVEL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unsupported config file extension '{0}', expected .json, .yaml or .yml")]
    UnsupportedFormat(String),

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// How integer variables are indexed once the nearest cell is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum IndexingMode {
    /// Rescaled `(row, col)` into the variable grid, same as floats.
    #[default]
    Grid,
    /// Rescaled row used as a flat element offset.
    #[value(name = "legacy_row", alias = "legacy-row")]
    LegacyRow,
}

impl FromStr for IndexingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <IndexingMode as ValueEnum>::from_str(s.trim(), true)
    }
}

impl fmt::Display for IndexingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexingMode::Grid => f.write_str("grid"),
            IndexingMode::LegacyRow => f.write_str("legacy_row"),
        }
    }
}

/// Settings shared by every lookup in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LookupConfig {
    /// A match must lie strictly closer than this.
    pub max_distance_km: f64,
    pub integer_indexing: IndexingMode,
    /// `env_logger` filter, e.g. `debug` or `h5lookup=trace`.
    pub log_level: Option<String>,
}

impl Default for LookupConfig {
    fn default() -> Self {
        LookupConfig {
            max_distance_km: DEFAULT_MAX_DISTANCE_KM,
            integer_indexing: IndexingMode::Grid,
            log_level: None,
        }
    }
}

impl LookupConfig {
    /// Loads a config file, JSON for `.json` and YAML for `.yaml` / `.yml`.
    ///
    /// ```rust,no_run
    /// use h5lookup::config::LookupConfig;
    ///
    /// let config = LookupConfig::from_file("lookup.yaml")?;
    /// println!("Accepting matches within {} km", config.max_distance_km);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();
        debug!("Loading {} config from {}", extension, path.display());

        match extension.as_str() {
            "json" => Self::from_json(&content),
            "yaml" | "yml" => Self::from_yaml(&content),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        let config: LookupConfig = serde_json::from_str(json_str)?;
        Ok(config)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Self, ConfigError> {
        let config: LookupConfig = serde_yaml::from_str(yaml_str)?;
        Ok(config)
    }

    /// Defaults, overlaid with `path` when given, then with the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_env()
    }

    /// Applies the `H5LOOKUP_*` environment variables that are set and non-empty.
    pub fn with_env(mut self) -> Result<Self, ConfigError> {
        if let Some(value) = env_value(ENV_MAX_DISTANCE_KM) {
            self.max_distance_km = parse_distance(ENV_MAX_DISTANCE_KM, &value)?;
        }
        if let Some(value) = env_value(ENV_INTEGER_INDEXING) {
            self.integer_indexing = value.parse().map_err(|reason| ConfigError::InvalidValue {
                key: ENV_INTEGER_INDEXING.to_string(),
                value: value.clone(),
                reason,
            })?;
        }
        if let Some(value) = env_value(ENV_LOG_LEVEL) {
            self.log_level = Some(value);
        }
        Ok(self)
    }

    /// Applies command line overrides, which win over every other source.
    pub fn with_overrides(
        mut self,
        max_distance_km: Option<f64>,
        integer_indexing: Option<IndexingMode>,
    ) -> Self {
        if let Some(distance) = max_distance_km {
            self.max_distance_km = distance;
        }
        if let Some(mode) = integer_indexing {
            self.integer_indexing = mode;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.max_distance_km.is_finite() || self.max_distance_km <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "max_distance_km".to_string(),
                value: self.max_distance_km.to_string(),
                reason: "must be a positive, finite number of kilometers".to_string(),
            });
        }
        Ok(())
    }
}

fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_distance(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}
