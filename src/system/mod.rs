//! System module: kernel attribute access, privileged command execution, live state probes

pub mod attribute;
pub mod elevated;
pub mod selinux;

pub use attribute::AttributeChannel;
pub use elevated::{ElevatedExecutor, SuShell};
pub use selinux::{EnforcementProbe, SysfsEnforcementProbe};

/// Logging macros for convenient access
/// Use the log crate directly for target-aware routing
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        let msg = format!($($arg)*);
        log::info!("{}", msg);
    }}
}

#[macro_export]
macro_rules! log_parsed {
    ($($arg:tt)*) => {{
        let msg = format!($($arg)*);
        // Use target="parsed" for high-level events
        log::info!(target: "parsed", "{}", msg);
    }}
}
