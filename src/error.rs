//! Unified error type hierarchy for Device Parts
//!
//! Provides structured error handling with AttributeError, ElevationError,
//! ServiceError, StoreError, ConfigError, and AppError.
//!
//! None of these are allowed to escape to the hosting process as a crash: every
//! layer absorbs its own failures and turns them into a log line or a UI correction.

use std::io;
use thiserror::Error;

/// Kernel attribute validation and write errors.
#[derive(Error, Debug)]
pub enum AttributeError {
    #[error("Value {value} outside domain {min}..={max} for {key}")]
    OutOfRange {
        key: String,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Value '{value}' does not match the pattern for {key}")]
    PatternMismatch { key: String, value: String },

    #[error("{key} expects {expected} values")]
    WrongKind { key: String, expected: &'static str },

    #[error("Attribute path not present: {0}")]
    PathMissing(String),

    #[error("Attribute {0} is read-only")]
    ReadOnly(String),

    #[error("IO error on attribute {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Elevated command execution errors.
///
/// Callers only ever ask "did it take effect"; the variants exist for diagnostics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ElevationError {
    /// Root was refused by the user or by policy
    #[error("Elevation denied for '{cmd}'")]
    Denied { cmd: String },

    /// The command ran with privilege but exited non-zero
    #[error("Command '{cmd}' exited with {code:?}: {stderr}")]
    Failed {
        cmd: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The elevation binary itself could not be started
    #[error("Failed to spawn '{binary}': {reason}")]
    Spawn { binary: String, reason: String },

    /// Command line rejected before execution
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// The executor panicked before reporting a result
    #[error("Execution of '{cmd}' aborted: {reason}")]
    Aborted { cmd: String, reason: String },
}

impl ElevationError {
    /// True when root was refused rather than the command failing
    pub fn is_denied(&self) -> bool {
        matches!(self, ElevationError::Denied { .. })
    }
}

/// Background service access errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Service '{0}' unavailable after start request")]
    Unavailable(String),

    #[error("Service rejected value: {0}")]
    Rejected(String),
}

/// Key-value store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid JSON in store {namespace}: {source}")]
    InvalidJson {
        namespace: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error during store operations: {0}")]
    IoError(#[from] io::Error),
}

/// Configuration file parsing and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid JSON in config: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Global error type surfaced by the command line front end
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// Unknown preference key
    #[error("Unknown control: {0}")]
    UnknownControl(String),

    /// Invalid input on the command line
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Control exists but the hardware variant lacks it
    #[error("Control not supported on this device: {0}")]
    Unsupported(String),

    /// Settings persist or deserialize error
    #[error("Settings error: {0}")]
    Settings(String),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(String),
}

impl AppError {
    /// Get a user-facing error message suitable for terminal output
    pub fn user_message(&self) -> String {
        match self {
            AppError::UnknownControl(key) => format!("There is no control named '{}'", key),
            AppError::InvalidInput(msg) => format!("Invalid input: {}", msg),
            AppError::Unsupported(key) => {
                format!("'{}' is not available on this hardware variant", key)
            }
            AppError::Settings(msg) => format!("Settings error: {}", msg),
            AppError::Io(msg) => format!("File operation failed: {}", msg),
        }
    }
}

impl From<io::Error> for AppError {
    fn from(e: io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Settings(e.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Settings(e.to_string())
    }
}
