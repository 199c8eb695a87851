//! Core data types for Device Parts.

use regex::Regex;
use std::fmt;

use crate::error::{AttributeError, ElevationError};

// Preference keys, shared by the controller and the command line front end
pub const KEY_VIBSTRENGTH: &str = "vib_strength";
pub const PREF_ENABLE_DIRAC: &str = "dirac_enabled";
pub const PREF_HEADSET: &str = "dirac_headset_pref";
pub const PREF_PRESET: &str = "dirac_preset_pref";
pub const PREF_HEADPHONE_GAIN: &str = "headphone_gain";
pub const PREF_MICROPHONE_GAIN: &str = "microphone_gain";
pub const PREF_EARPIECE_GAIN: &str = "earpiece_gain";
pub const PREF_SELINUX_MODE: &str = "selinux_mode";
pub const PREF_SELINUX_PERSISTENCE: &str = "selinux_persistence";

/// Store namespace holding the enforcement override
pub const SELINUX_PREF_NAMESPACE: &str = "selinux_pref";

/// Accepted values for an attribute
#[derive(Debug, Clone)]
pub enum Domain {
    /// Inclusive integer range
    Range { min: i64, max: i64 },
    /// Pre-encoded string that must fully match the pattern
    Pattern(Regex),
}

/// Wire format written to the attribute path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// `"60"`
    Plain,
    /// `"60 60"`, left and right channel
    Symmetric,
}

/// A value handed to the attribute channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Int(i64),
    Text(String),
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Text(v.to_string())
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Int(v) => write!(f, "{}", v),
            AttributeValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A kernel-exposed control file. Immutable once defined.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub key: &'static str,
    pub path: String,
    pub domain: Domain,
    pub encoding: Encoding,
    pub writable: bool,
}

impl Attribute {
    pub fn range(key: &'static str, path: &str, min: i64, max: i64, encoding: Encoding) -> Self {
        Attribute {
            key,
            path: path.to_string(),
            domain: Domain::Range { min, max },
            encoding,
            writable: true,
        }
    }

    pub fn pattern(key: &'static str, path: &str, pattern: Regex) -> Self {
        Attribute {
            key,
            path: path.to_string(),
            domain: Domain::Pattern(pattern),
            encoding: Encoding::Plain,
            writable: true,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Check `value` against the domain
    pub fn validate(&self, value: &AttributeValue) -> Result<(), AttributeError> {
        match (&self.domain, value) {
            (Domain::Range { min, max }, AttributeValue::Int(v)) => {
                if v < min || v > max {
                    return Err(AttributeError::OutOfRange {
                        key: self.key.to_string(),
                        value: *v,
                        min: *min,
                        max: *max,
                    });
                }
                Ok(())
            }
            (Domain::Pattern(re), AttributeValue::Text(s)) => {
                // Anchor by comparing the match span, patterns are written unanchored
                match re.find(s) {
                    Some(m) if m.start() == 0 && m.end() == s.len() => Ok(()),
                    _ => Err(AttributeError::PatternMismatch {
                        key: self.key.to_string(),
                        value: s.clone(),
                    }),
                }
            }
            (Domain::Range { .. }, AttributeValue::Text(_)) => Err(AttributeError::WrongKind {
                key: self.key.to_string(),
                expected: "integer",
            }),
            (Domain::Pattern(_), AttributeValue::Int(_)) => Err(AttributeError::WrongKind {
                key: self.key.to_string(),
                expected: "string",
            }),
        }
    }

    /// Render `value` in this attribute's wire format
    pub fn encode(&self, value: &AttributeValue) -> String {
        match self.encoding {
            Encoding::Plain => value.to_string(),
            Encoding::Symmetric => format!("{} {}", value, value),
        }
    }
}

/// Built-in attribute table
pub fn vibrator_strength() -> Attribute {
    Attribute::range(
        KEY_VIBSTRENGTH,
        "/sys/class/leds/vibrator/vmax_mv_user",
        116,
        3596,
        Encoding::Plain,
    )
}

pub fn headphone_gain() -> Attribute {
    Attribute::range(
        PREF_HEADPHONE_GAIN,
        "/sys/kernel/sound_control/headphone_gain",
        -10,
        20,
        Encoding::Symmetric,
    )
}

pub fn microphone_gain() -> Attribute {
    Attribute::range(
        PREF_MICROPHONE_GAIN,
        "/sys/kernel/sound_control/mic_gain",
        0,
        100,
        Encoding::Plain,
    )
}

pub fn earpiece_gain() -> Attribute {
    Attribute::range(
        PREF_EARPIECE_GAIN,
        "/sys/kernel/sound_control/earpiece_gain",
        -10,
        20,
        Encoding::Plain,
    )
}

pub fn selinux_enforce() -> Attribute {
    Attribute::range("selinux_enforce", "/sys/fs/selinux/enforce", 0, 1, Encoding::Plain).read_only()
}

/// A single shell-level command run with privilege.
///
/// Constructed per invocation and owned by the task that executes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegedCommand {
    command_line: String,
}

impl PrivilegedCommand {
    pub fn new(command_line: &str) -> Result<Self, ElevationError> {
        let trimmed = command_line.trim();
        if trimmed.is_empty() {
            return Err(ElevationError::InvalidCommand("empty command line".to_string()));
        }
        if trimmed.contains('\n') || trimmed.contains('\0') {
            return Err(ElevationError::InvalidCommand(format!(
                "command line contains control characters: {:?}",
                trimmed
            )));
        }
        Ok(PrivilegedCommand {
            command_line: trimmed.to_string(),
        })
    }

    /// `setenforce 1` or `setenforce 0`
    pub fn setenforce(enforcing: bool) -> Self {
        PrivilegedCommand {
            command_line: format!("setenforce {}", if enforcing { 1 } else { 0 }),
        }
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }
}

impl fmt::Display for PrivilegedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line)
    }
}

/// Result of one privileged task execution, consumed once by its completion handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub succeeded: bool,
    /// Why it did not take effect, kept for diagnostics only
    pub failure: Option<ElevationError>,
}

impl TaskOutcome {
    pub fn success() -> Self {
        TaskOutcome {
            succeeded: true,
            failure: None,
        }
    }

    pub fn failed(err: ElevationError) -> Self {
        TaskOutcome {
            succeeded: false,
            failure: Some(err),
        }
    }
}

/// Payload of a UI change event
#[derive(Debug, Clone, PartialEq)]
pub enum PreferenceValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl PreferenceValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PreferenceValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PreferenceValue::Int(v) => Some(*v),
            PreferenceValue::Text(s) => s.trim().parse().ok(),
            PreferenceValue::Bool(_) => None,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            PreferenceValue::Bool(b) => b.to_string(),
            PreferenceValue::Int(v) => v.to_string(),
            PreferenceValue::Text(s) => s.clone(),
        }
    }

    /// Parse command line input: `true`/`false`, integers, anything else as text
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match trimmed {
            "true" | "on" => PreferenceValue::Bool(true),
            "false" | "off" => PreferenceValue::Bool(false),
            _ => match trimmed.parse::<i64>() {
                Ok(v) => PreferenceValue::Int(v),
                Err(_) => PreferenceValue::Text(trimmed.to_string()),
            },
        }
    }
}

impl fmt::Display for PreferenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// Rendering state for a single control
#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    pub enabled: bool,
    pub value: Option<PreferenceValue>,
}

impl ControlState {
    pub fn new(enabled: bool) -> Self {
        ControlState {
            enabled,
            value: None,
        }
    }
}
