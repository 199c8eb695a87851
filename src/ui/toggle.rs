//! Toggle Persistence & Reconciliation
//!
//! Keeps one boolean control in step with live system state and an optional
//! persisted override. The displayed value changes optimistically on every
//! user action; a failed privileged operation later corrects only the
//! displayed value and leaves the persisted override alone.

use crate::config::PrefStore;

/// Inputs that decide what a toggle shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleState {
    pub live_value: bool,
    pub persisted_override: Option<bool>,
    pub persistence_enabled: bool,
}

impl ToggleState {
    /// Persisted override if present, else live value
    pub fn effective(&self) -> bool {
        self.persisted_override.unwrap_or(self.live_value)
    }
}

pub struct ToggleReconciler {
    key: String,
    store: PrefStore,
    displayed: bool,
    persistence_enabled: bool,
}

impl ToggleReconciler {
    /// Compute the initial displayed value once from live state and the store
    pub fn load(key: &str, live_value: bool, store: PrefStore) -> Self {
        let persisted_override = store.get(key);
        let state = ToggleState {
            live_value,
            persisted_override,
            persistence_enabled: persisted_override.is_some(),
        };
        log::debug!(
            "[Toggle] {} loaded: live={} override={:?}",
            key,
            live_value,
            persisted_override
        );
        ToggleReconciler {
            key: key.to_string(),
            store,
            displayed: state.effective(),
            persistence_enabled: state.persistence_enabled,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn displayed(&self) -> bool {
        self.displayed
    }

    pub fn persistence_enabled(&self) -> bool {
        self.persistence_enabled
    }

    pub fn persisted_override(&self) -> Option<bool> {
        self.store.get(&self.key)
    }

    pub fn state(&self, live_value: bool) -> ToggleState {
        ToggleState {
            live_value,
            persisted_override: self.persisted_override(),
            persistence_enabled: self.persistence_enabled,
        }
    }

    /// Record `value` as the displayed state, persisting it iff `persistent`
    ///
    /// A store failure is logged and the persistence switch keeps matching
    /// what is on disk; the displayed value still changes.
    ///
    /// # Returns
    /// `true` if the store now reflects the requested persistence
    pub fn set_effective(&mut self, value: bool, persistent: bool) -> bool {
        let result = if persistent {
            self.store.put(&self.key, value)
        } else {
            self.store.remove(&self.key)
        };
        self.displayed = value;
        match result {
            Ok(()) => {
                self.persistence_enabled = persistent;
                true
            }
            Err(e) => {
                log::warn!("[Toggle] Failed to persist {}: {}", self.key, e);
                false
            }
        }
    }

    /// Flip only the persistence switch, keeping the displayed value
    pub fn set_persistence(&mut self, persistent: bool) -> bool {
        let value = self.displayed;
        self.set_effective(value, persistent)
    }

    /// Replace the displayed value with live truth after a failed operation
    pub fn correct_displayed(&mut self, live_value: bool) {
        if self.displayed != live_value {
            log::info!(
                "[Toggle] {} reverted to live value {}",
                self.key,
                live_value
            );
        }
        self.displayed = live_value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> PrefStore {
        PrefStore::open(dir.path(), "selinux_pref").unwrap()
    }

    #[test]
    fn test_effective_prefers_override() {
        let state = ToggleState {
            live_value: true,
            persisted_override: Some(false),
            persistence_enabled: true,
        };
        assert!(!state.effective());
        let state = ToggleState {
            persisted_override: None,
            ..state
        };
        assert!(state.effective());
    }

    #[test]
    fn test_persistent_value_survives_restart() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut toggle = ToggleReconciler::load("selinux_mode", false, store(&dir));
        toggle.set_effective(true, true);

        let reloaded = ToggleReconciler::load("selinux_mode", false, store(&dir));
        assert!(reloaded.displayed());
        assert!(reloaded.persistence_enabled());
    }

    #[test]
    fn test_non_persistent_value_falls_back_to_live() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut toggle = ToggleReconciler::load("selinux_mode", false, store(&dir));
        toggle.set_effective(true, true);
        toggle.set_effective(true, false);
        assert!(toggle.displayed());

        let reloaded = ToggleReconciler::load("selinux_mode", false, store(&dir));
        assert!(!reloaded.displayed());
        assert!(!reloaded.persistence_enabled());
    }

    #[test]
    fn test_correction_leaves_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut toggle = ToggleReconciler::load("selinux_mode", true, store(&dir));
        toggle.set_effective(false, true);
        toggle.correct_displayed(true);

        assert!(toggle.displayed());
        assert_eq!(toggle.persisted_override(), Some(false));
    }

    #[test]
    fn test_set_persistence_keeps_displayed() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut toggle = ToggleReconciler::load("selinux_mode", true, store(&dir));
        toggle.set_persistence(true);
        assert_eq!(toggle.persisted_override(), Some(true));
        toggle.set_persistence(false);
        assert_eq!(toggle.persisted_override(), None);
        assert!(toggle.displayed());
    }

    #[test]
    fn test_failed_persist_keeps_switch_off() {
        let root = tempfile::TempDir::new().unwrap();
        let dir = root.path().join("prefs");
        std::fs::create_dir_all(&dir).unwrap();
        let mut toggle =
            ToggleReconciler::load("selinux_mode", true, PrefStore::open(&dir, "selinux_pref").unwrap());

        std::fs::remove_dir_all(&dir).unwrap();
        std::fs::write(&dir, "not a directory").unwrap();

        assert!(!toggle.set_effective(false, true));
        assert!(!toggle.displayed());
        assert!(!toggle.persistence_enabled());
        assert_eq!(toggle.persisted_override(), None);
        assert!(toggle.state(true).effective());
    }
}
