//! Configuration module for Device Parts.
//!
//! # Module Structure
//!
//! - `store`: Namespaced flat boolean store backing persisted toggle overrides
//!
//! # Settings Management
//!
//! `ConfigManager` loads `PartsConfig` from JSON (`config/parts.json` unless a
//! path is given). A missing file yields defaults; a malformed file logs a
//! warning and yields defaults instead of aborting startup.

pub mod store;

pub use store::PrefStore;

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Default location of the configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/parts.json";

/// Runtime configuration
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PartsConfig {
    /// Prefix applied to every kernel attribute path
    pub sysfs_root: PathBuf,
    /// Directory holding one JSON file per store namespace
    pub store_dir: PathBuf,
    /// Directory for full/ and parsed/ log files
    pub log_dir: PathBuf,
    /// Binary used to obtain root
    pub elevation_binary: String,
    /// One of error, warn, info, debug, trace
    pub log_level: String,
}

impl Default for PartsConfig {
    fn default() -> Self {
        let base = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("device_parts");
        PartsConfig {
            sysfs_root: PathBuf::from("/"),
            store_dir: base.join("prefs"),
            log_dir: base.join("logs"),
            elevation_binary: "su".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl PartsConfig {
    /// Reject values that would make every later operation fail
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.elevation_binary.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "elevation_binary cannot be empty".to_string(),
            ));
        }
        if !self.sysfs_root.is_absolute() {
            return Err(ConfigError::ValidationFailed(format!(
                "sysfs_root must be absolute: {}",
                self.sysfs_root.display()
            )));
        }
        self.log_filter()?;
        Ok(())
    }

    pub fn log_filter(&self) -> Result<log::LevelFilter, ConfigError> {
        self.log_level
            .parse::<log::LevelFilter>()
            .map_err(|_| ConfigError::ValidationFailed(format!("unknown log level '{}'", self.log_level)))
    }
}

/// Loads and saves `PartsConfig`
pub struct ConfigManager;

impl ConfigManager {
    /// Load from `path`, or from `DEFAULT_CONFIG_PATH` when `None`
    ///
    /// An explicitly given path must exist; the default path may be absent.
    pub fn load(path: Option<&Path>) -> Result<PartsConfig, ConfigError> {
        let (config_path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        let config = match std::fs::read_to_string(&config_path) {
            Ok(content) => match serde_json::from_str::<PartsConfig>(&content) {
                Ok(config) => config,
                Err(e) => {
                    // Graceful fallback: warn and return defaults instead of panicking.
                    // Also on stderr, since the logger is configured from this file.
                    eprintln!(
                        "[Config] WARNING: Failed to parse {}, falling back to defaults: {}",
                        config_path.display(),
                        e
                    );
                    log::warn!(
                        "[Config] Failed to parse {}, falling back to defaults: {}",
                        config_path.display(),
                        e
                    );
                    PartsConfig::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if explicit {
                    return Err(ConfigError::FileNotFound(config_path.display().to_string()));
                }
                PartsConfig::default()
            }
            Err(e) => return Err(ConfigError::IoError(e)),
        };

        config.validate()?;
        Ok(config)
    }

    /// Save to `path`, creating parent directories
    pub fn save(config: &PartsConfig, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(ConfigError::IoError)?;
            }
        }
        let content = serde_json::to_string_pretty(config).map_err(ConfigError::InvalidJson)?;
        std::fs::write(path, content).map_err(ConfigError::IoError)?;
        Ok(())
    }
}
