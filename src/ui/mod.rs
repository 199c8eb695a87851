//! UI Module - the UI-owning context
//!
//! Rendering is left to the embedding front end. This module holds the state a
//! front end renders: the device settings controller, the enforcement toggle
//! reconciler, and the event queue workers post completions into.

pub mod settings;
pub mod threading;
pub mod toggle;

pub use settings::{DeviceSettings, SettingsDeps, ALL_KEYS};
pub use threading::{UiBridge, UiEvent};
pub use toggle::{ToggleReconciler, ToggleState};
