//! Audio enhancer control object.
//!
//! The DSP engine itself is an external collaborator. `DiracControl` is the
//! in-process control surface the settings screen talks to: it validates
//! headset types and preset level strings and keeps the last accepted values.

use std::sync::Mutex;

use crate::error::ServiceError;

/// Number of equalizer bands in a preset level string
pub const BAND_COUNT: usize = 7;
/// Highest accepted headset type index
pub const MAX_HEADSET_TYPE: i32 = 6;
/// Per-band gain bound, in dB
pub const BAND_LIMIT: f32 = 12.0;

/// Trait for the background audio enhancement service
pub trait AudioEnhancer: Send + Sync {
    fn is_enabled(&self) -> bool;
    fn set_enabled(&self, enabled: bool);
    fn set_headset_type(&self, headset_type: i32) -> Result<(), ServiceError>;
    fn set_level(&self, level: &str) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnhancerState {
    pub enabled: bool,
    pub headset_type: i32,
    pub bands: [f32; BAND_COUNT],
}

impl Default for EnhancerState {
    fn default() -> Self {
        EnhancerState {
            enabled: false,
            headset_type: 0,
            bands: [0.0; BAND_COUNT],
        }
    }
}

/// Parse `"4,0,0,0,0,0,0"` style presets
pub fn parse_level(level: &str) -> Result<[f32; BAND_COUNT], ServiceError> {
    let parts: Vec<&str> = level.split(',').map(str::trim).collect();
    if parts.len() != BAND_COUNT {
        return Err(ServiceError::Rejected(format!(
            "preset '{}' has {} bands, expected {}",
            level,
            parts.len(),
            BAND_COUNT
        )));
    }

    let mut bands = [0.0f32; BAND_COUNT];
    for (slot, raw) in bands.iter_mut().zip(parts) {
        let value: f32 = raw
            .parse()
            .map_err(|_| ServiceError::Rejected(format!("band value '{}' is not numeric", raw)))?;
        if !value.is_finite() || value.abs() > BAND_LIMIT {
            return Err(ServiceError::Rejected(format!(
                "band value {} outside ±{}",
                value, BAND_LIMIT
            )));
        }
        *slot = value;
    }
    Ok(bands)
}

#[derive(Debug, Default)]
pub struct DiracControl {
    state: Mutex<EnhancerState>,
}

impl DiracControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> EnhancerState {
        match self.state.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn update(&self, f: impl FnOnce(&mut EnhancerState)) {
        match self.state.lock() {
            Ok(mut guard) => f(&mut *guard),
            Err(poisoned) => f(&mut *poisoned.into_inner()),
        }
    }
}

impl AudioEnhancer for DiracControl {
    fn is_enabled(&self) -> bool {
        self.snapshot().enabled
    }

    fn set_enabled(&self, enabled: bool) {
        log::info!("[Dirac] enabled={}", enabled);
        self.update(|s| s.enabled = enabled);
    }

    fn set_headset_type(&self, headset_type: i32) -> Result<(), ServiceError> {
        if !(0..=MAX_HEADSET_TYPE).contains(&headset_type) {
            return Err(ServiceError::Rejected(format!(
                "headset type {} outside 0..={}",
                headset_type, MAX_HEADSET_TYPE
            )));
        }
        log::info!("[Dirac] headset_type={}", headset_type);
        self.update(|s| s.headset_type = headset_type);
        Ok(())
    }

    fn set_level(&self, level: &str) -> Result<(), ServiceError> {
        let bands = parse_level(level)?;
        log::info!("[Dirac] level={}", level);
        self.update(|s| s.bands = bands);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level_accepts_seven_bands() {
        let bands = parse_level("4, 0, 0, 0, 0, 0, -2.5").unwrap();
        assert_eq!(bands[0], 4.0);
        assert_eq!(bands[6], -2.5);
    }

    #[test]
    fn test_parse_level_rejects_bad_input() {
        assert!(parse_level("1,2,3").is_err());
        assert!(parse_level("a,0,0,0,0,0,0").is_err());
        assert!(parse_level("13,0,0,0,0,0,0").is_err());
    }

    #[test]
    fn test_rejected_values_leave_state() {
        let control = DiracControl::new();
        control.set_headset_type(2).unwrap();
        assert!(control.set_headset_type(9).is_err());
        assert_eq!(control.snapshot().headset_type, 2);
    }
}
