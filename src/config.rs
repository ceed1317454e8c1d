//! Engine settings shared by filters, selectors, patchers and pools.

use std::{fmt, fs, io, path::Path};

use serde::{Deserialize, Serialize};

use crate::{json::DEFAULT_MAX_DEPTH, pool::DEFAULT_POOL_CAPACITY};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Argument name bound to the document root when an expression has no
    /// explicit lambda prefix.
    ///
    /// Default: `"o"`.
    pub root_arg: String,

    /// Deepest JSON nesting the reader accepts.
    ///
    /// Default: 512.
    pub max_depth: usize,

    /// Idle instances kept per pool.
    ///
    /// Default: 16.
    pub pool_capacity: usize,

    /// `tracing` filter directive used by the binary when `RUST_LOG` is unset.
    ///
    /// Default: `"warn"`.
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            root_arg: "o".to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            log_level: "warn".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "cannot read config: {}", e),
            ConfigError::Parse(e) => write!(f, "invalid config: {}", e),
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

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_take_defaults() {
        let config = EngineConfig::from_json(r#"{"root_arg":"doc"}"#).unwrap();
        assert_eq!(config.root_arg, "doc");
        assert_eq!(config.max_depth, 512);
        assert_eq!(config.pool_capacity, 16);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            EngineConfig::from_json("{"),
            Err(ConfigError::Parse(_))
        ));
    }
}
