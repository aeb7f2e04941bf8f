//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::storage::log::LogSyncMode;
use crate::storage::types::LookupPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Defaults applied when opening an index
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub default_policy: LookupPolicy,

    #[serde(default)]
    pub sync_mode: LogSyncMode,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        for path in Self::default_paths() {
            if path.exists() {
                match Self::load_with_env(&path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        // Fall back to environment-only config
        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Config file locations, in search order
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("timeindex").join("config.toml"));
        }
        paths.push(PathBuf::from("./timeindex.toml"));
        paths
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        // Index overrides
        if let Ok(policy) = std::env::var("TIMEINDEX_DEFAULT_POLICY") {
            match policy.parse::<LookupPolicy>() {
                Ok(p) => self.index.default_policy = p,
                Err(e) => tracing::warn!("Ignoring TIMEINDEX_DEFAULT_POLICY: {}", e),
            }
        }
        if let Ok(mode) = std::env::var("TIMEINDEX_SYNC_MODE") {
            match mode.parse::<LogSyncMode>() {
                Ok(m) => self.index.sync_mode = m,
                Err(e) => tracing::warn!("Ignoring TIMEINDEX_SYNC_MODE: {}", e),
            }
        }

        // Logging overrides
        if let Ok(level) = std::env::var("TIMEINDEX_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("TIMEINDEX_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# timeindex configuration
#
# Environment variables override these settings:
# - TIMEINDEX_DEFAULT_POLICY
# - TIMEINDEX_SYNC_MODE
# - TIMEINDEX_LOG_LEVEL
# - TIMEINDEX_LOG_FORMAT

[index]
# Lookup policy when a query does not name one:
# nearest, nearest_prev or nearest_next
default_policy = "nearest_prev"

# How appends reach the disk:
# flush (survives process restart) or every_write (fsync, survives power loss)
sync_mode = "flush"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
