//! Device Parts Rust Backend
//!
//! Privileged attribute control for device tunables: vibration strength,
//! analog gain levels, the Dirac audio enhancer and SELinux enforcement mode.
//! A front end renders the controls; this crate turns their change events
//! into kernel attribute writes, lazily started service calls, and elevated
//! commands whose failures roll the UI back.
//!
//! The system is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **models**: Core data structures and the built-in attribute table
//! - **system**: Attribute channel, elevated executor, live enforcement probe
//! - **service**: Background service host and lazy binding
//! - **orchestrator**: Async privileged task lifecycle
//! - **config**: Runtime configuration and the key-value store
//! - **ui**: UI-owning controller, toggle reconciliation, event queue
//! - **log_collector**: Decoupled logging to disk

// Core foundational modules
pub mod error;
pub mod models;

// Kernel attributes, privileged execution
pub mod system;

// Lazily started background services
pub mod service;

// Async privileged tasks
pub mod orchestrator;

// Configuration and persisted overrides
pub mod config;

// UI-owning context
pub mod ui;

// Robust, decoupled logging system
pub mod log_collector;

// Re-export the log crate for macro usage
pub use log;

// ============================================================================
// PUBLIC RE-EXPORTS FOR CONVENIENCE
// ============================================================================

pub use error::{
    AppError, AttributeError, ConfigError, ElevationError, ServiceError, StoreError,
};

pub use models::{
    Attribute, AttributeValue, ControlState, Domain, Encoding, PreferenceValue, PrivilegedCommand,
    TaskOutcome,
};

pub use system::{AttributeChannel, ElevatedExecutor, EnforcementProbe, SuShell};

pub use service::{AudioEnhancer, DiracControl, LazyBinding, ServiceHandle, ServiceHost};

pub use orchestrator::{PrivilegedTask, TaskCompletion, TaskKind, TaskPhase};

pub use config::{ConfigManager, PartsConfig, PrefStore};

pub use ui::{DeviceSettings, SettingsDeps, ToggleReconciler, ToggleState, UiBridge, UiEvent};

pub use log_collector::{LogCollector, LogLine};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert_eq!(VERSION, "0.1.0");
    }
}
