//! Runtime configuration.
//!
//! A [`RuntimeConfig`] is a plain serde struct. Every field has a default, so
//! a config file only needs to mention what it changes:
//!
//! ```json
//! { "tick_order": "local_first", "log_filter": "troupe=debug" }
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Relative order in which [`Stage::tick`](crate::stage::Stage::tick) drains
/// the global deferred bus and the actor-local ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOrder {
    /// Global bus first, then local buses in registration order.
    #[default]
    GlobalFirst,
    /// Local buses in registration order, then the global bus.
    LocalFirst,
}

/// Configuration consumed by [`Stage::new`](crate::stage::Stage::new) and
/// [`init_logger`](crate::logging::init_logger).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Initial capacity of subscription and queue maps.
    pub bus_capacity: usize,
    pub tick_order: TickOrder,
    /// env_logger filter directives. Falls back to `RUST_LOG` when unset.
    pub log_filter: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bus_capacity: 16,
            tick_order: TickOrder::GlobalFirst,
            log_filter: None,
        }
    }
}

impl RuntimeConfig {
    /// Parse a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(ConfigError::Parse)
    }

    /// Read and parse a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json(&json)
    }
}

// ── Errors ──────────────────────────────────────────────────────────────

/// Errors that can occur while loading a [`RuntimeConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read.
    Io(std::io::Error),
    /// The contents were not valid config JSON.
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config read failed: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse failed: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let config = RuntimeConfig::from_json("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.bus_capacity, 16);
    }

    #[test]
    fn partial_override() {
        let config =
            RuntimeConfig::from_json(r#"{ "tick_order": "local_first", "log_filter": "debug" }"#)
                .unwrap();
        assert_eq!(config.tick_order, TickOrder::LocalFirst);
        assert_eq!(config.log_filter.as_deref(), Some("debug"));
        assert_eq!(config.bus_capacity, 16);
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = RuntimeConfig::from_json("{ tick_order: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = RuntimeConfig::load("/definitely/not/here/troupe.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
