//! Device settings controller.
//!
//! `DeviceSettings` is the UI-owning context. It owns every control, routes
//! change events to the attribute channel, the lazy enhancer binding, or the
//! enforcement toggle, and is the single consumer of task completions.
//!
//! Change handlers always accept the user's change. Corrections (a failed
//! enforcement switch) arrive later through `pump_events`/`settle`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::config::{PartsConfig, PrefStore};
use crate::error::StoreError;
use crate::log_parsed;
use crate::models::{
    self, Attribute, ControlState, PreferenceValue, PrivilegedCommand, KEY_VIBSTRENGTH,
    PREF_EARPIECE_GAIN, PREF_ENABLE_DIRAC, PREF_HEADPHONE_GAIN, PREF_HEADSET,
    PREF_MICROPHONE_GAIN, PREF_PRESET, PREF_SELINUX_MODE, PREF_SELINUX_PERSISTENCE,
    SELINUX_PREF_NAMESPACE,
};
use crate::orchestrator::{PrivilegedTask, TaskCompletion, TaskKind};
use crate::service::{LazyBinding, ServiceHost};
use crate::system::{
    AttributeChannel, ElevatedExecutor, EnforcementProbe, SuShell, SysfsEnforcementProbe,
};
use crate::ui::threading::{UiBridge, UiEvent};
use crate::ui::toggle::ToggleReconciler;

/// Every control key, in display order
pub const ALL_KEYS: [&str; 9] = [
    KEY_VIBSTRENGTH,
    PREF_ENABLE_DIRAC,
    PREF_HEADSET,
    PREF_PRESET,
    PREF_HEADPHONE_GAIN,
    PREF_MICROPHONE_GAIN,
    PREF_EARPIECE_GAIN,
    PREF_SELINUX_MODE,
    PREF_SELINUX_PERSISTENCE,
];

fn setenforce_command(enforcing: &bool) -> PrivilegedCommand {
    PrivilegedCommand::setenforce(*enforcing)
}

/// External collaborators of the controller
pub struct SettingsDeps {
    pub channel: AttributeChannel,
    pub executor: Arc<dyn ElevatedExecutor>,
    pub probe: Arc<dyn EnforcementProbe>,
    pub enhancer_host: Arc<ServiceHost>,
    pub store_dir: PathBuf,
    pub runtime: Handle,
}

impl SettingsDeps {
    /// Production collaborators for `config`
    pub fn from_config(config: &PartsConfig, runtime: Handle) -> Self {
        let channel = AttributeChannel::new(config.sysfs_root.clone());
        SettingsDeps {
            probe: Arc::new(SysfsEnforcementProbe::new(channel.clone())),
            channel,
            executor: Arc::new(SuShell::new(&config.elevation_binary)),
            enhancer_host: ServiceHost::global(),
            store_dir: config.store_dir.clone(),
            runtime,
        }
    }
}

pub struct DeviceSettings {
    channel: AttributeChannel,
    executor: Arc<dyn ElevatedExecutor>,
    probe: Arc<dyn EnforcementProbe>,
    enhancer: LazyBinding,
    runtime: Handle,
    bridge: UiBridge,
    attributes: BTreeMap<&'static str, Attribute>,
    controls: BTreeMap<&'static str, ControlState>,
    selinux: ToggleReconciler,
    pending_tasks: usize,
}

impl DeviceSettings {
    /// Build every control from current system state
    pub fn load(deps: SettingsDeps) -> Result<Self, StoreError> {
        let SettingsDeps {
            channel,
            executor,
            probe,
            enhancer_host,
            store_dir,
            runtime,
        } = deps;

        let mut attributes = BTreeMap::new();
        let mut controls = BTreeMap::new();
        for attribute in [
            models::vibrator_strength(),
            models::headphone_gain(),
            models::microphone_gain(),
            models::earpiece_gain(),
        ] {
            let supported = channel.is_supported(&attribute);
            let mut control = ControlState::new(supported);
            if supported {
                control.value = channel.read_int(&attribute).map(PreferenceValue::Int);
            } else {
                log::info!("[DeviceSettings] {} not supported on this device", attribute.key);
            }
            controls.insert(attribute.key, control);
            attributes.insert(attribute.key, attribute);
        }

        let enhancer = LazyBinding::new(enhancer_host);
        let enhancer_enabled = enhancer
            .with(|control| Ok(control.is_enabled()))
            .unwrap_or_else(|e| {
                log::warn!("[DeviceSettings] Enhancer state unavailable: {}", e);
                false
            });
        controls.insert(
            PREF_ENABLE_DIRAC,
            ControlState {
                enabled: true,
                value: Some(PreferenceValue::Bool(enhancer_enabled)),
            },
        );
        controls.insert(PREF_HEADSET, ControlState::new(true));
        controls.insert(PREF_PRESET, ControlState::new(true));

        let store = PrefStore::open(&store_dir, SELINUX_PREF_NAMESPACE)?;
        let selinux = ToggleReconciler::load(PREF_SELINUX_MODE, probe.is_enforced(), store);

        let mut settings = DeviceSettings {
            channel,
            executor,
            probe,
            enhancer,
            runtime,
            bridge: UiBridge::new(),
            attributes,
            controls,
            selinux,
            pending_tasks: 0,
        };
        settings.sync_selinux_controls();
        log_parsed!("Device settings loaded");
        Ok(settings)
    }

    /// Current state of a control
    pub fn control(&self, key: &str) -> Option<&ControlState> {
        self.controls.get(key)
    }

    /// Privileged tasks started but whose completion has not been handled
    pub fn pending_tasks(&self) -> usize {
        self.pending_tasks
    }

    pub fn channel(&self) -> &AttributeChannel {
        &self.channel
    }

    /// Whether `value` has the type the control for `key` expects
    pub fn accepts(key: &str, value: &PreferenceValue) -> bool {
        match key {
            KEY_VIBSTRENGTH | PREF_HEADPHONE_GAIN | PREF_MICROPHONE_GAIN | PREF_EARPIECE_GAIN
            | PREF_HEADSET => value.as_int().is_some(),
            PREF_ENABLE_DIRAC | PREF_SELINUX_MODE | PREF_SELINUX_PERSISTENCE => {
                value.as_bool().is_some()
            }
            PREF_PRESET => true,
            _ => false,
        }
    }

    /// Route a UI change event
    ///
    /// # Returns
    /// Always `true`: the control keeps the user's change.
    pub fn on_preference_change(&mut self, key: &str, value: PreferenceValue) -> bool {
        match key {
            KEY_VIBSTRENGTH | PREF_HEADPHONE_GAIN | PREF_MICROPHONE_GAIN | PREF_EARPIECE_GAIN => {
                self.write_attribute(key, &value);
            }

            PREF_ENABLE_DIRAC => match value.as_bool() {
                Some(enabled) => {
                    let result = self.enhancer.with(|control| {
                        control.set_enabled(enabled);
                        Ok(())
                    });
                    self.record_enhancer(PREF_ENABLE_DIRAC, result, PreferenceValue::Bool(enabled));
                }
                None => log::warn!("[DeviceSettings] {} expects a boolean, got {}", key, value),
            },

            PREF_HEADSET => match value.as_int().and_then(|v| i32::try_from(v).ok()) {
                Some(headset) => {
                    let result = self.enhancer.with(|control| control.set_headset_type(headset));
                    self.record_enhancer(PREF_HEADSET, result, PreferenceValue::Int(headset as i64));
                }
                None => log::warn!("[DeviceSettings] {} expects an integer, got {}", key, value),
            },

            PREF_PRESET => {
                let level = value.as_text();
                let result = self.enhancer.with(|control| control.set_level(&level));
                self.record_enhancer(PREF_PRESET, result, PreferenceValue::Text(level));
            }

            PREF_SELINUX_MODE => match value.as_bool() {
                Some(enforcing) => self.switch_selinux(enforcing),
                None => log::warn!("[DeviceSettings] {} expects a boolean, got {}", key, value),
            },

            PREF_SELINUX_PERSISTENCE => match value.as_bool() {
                Some(persistent) => {
                    self.selinux.set_persistence(persistent);
                    self.sync_selinux_controls();
                }
                None => log::warn!("[DeviceSettings] {} expects a boolean, got {}", key, value),
            },

            _ => log::warn!("[DeviceSettings] Ignoring change for unknown key '{}'", key),
        }
        true
    }

    fn write_attribute(&mut self, key: &str, value: &PreferenceValue) {
        let (Some(attribute), Some(control)) = (self.attributes.get(key), self.controls.get_mut(key))
        else {
            return;
        };
        if !control.enabled {
            log::debug!("[DeviceSettings] {} disabled, ignoring change", key);
            return;
        }
        let Some(v) = value.as_int() else {
            log::warn!("[DeviceSettings] {} expects an integer, got {}", key, value);
            return;
        };
        if self.channel.write(attribute, v) {
            control.value = Some(PreferenceValue::Int(v));
        }
    }

    fn record_enhancer(
        &mut self,
        key: &'static str,
        result: Result<(), crate::error::ServiceError>,
        value: PreferenceValue,
    ) {
        match result {
            Ok(()) => {
                if let Some(control) = self.controls.get_mut(key) {
                    control.value = Some(value);
                }
            }
            Err(e) => log::warn!("[DeviceSettings] {} change dropped: {}", key, e),
        }
    }

    fn switch_selinux(&mut self, enforcing: bool) {
        // Optimistic update first; a failure is corrected when the completion is handled
        let persistent = self.selinux.persistence_enabled();
        self.selinux.set_effective(enforcing, persistent);
        self.sync_selinux_controls();
        self.spawn_setenforce(TaskKind::SelinuxMode, enforcing);
    }

    fn spawn_setenforce(&mut self, kind: TaskKind, enforcing: bool) {
        let task = PrivilegedTask::<bool>::new(
            kind,
            Arc::clone(&self.executor),
            self.bridge.sender(),
            self.runtime.clone(),
            setenforce_command,
        );
        if task.execute(&[enforcing]).is_some() {
            self.pending_tasks += 1;
        }
    }

    /// Re-apply a persisted enforcement override
    ///
    /// # Returns
    /// `true` if a privileged task was started
    pub fn restore_on_boot(&mut self) -> bool {
        match self.selinux.persisted_override() {
            Some(enforcing) => {
                log_parsed!("Restoring persisted SELinux mode: enforcing={}", enforcing);
                self.spawn_setenforce(TaskKind::BootRestore, enforcing);
                true
            }
            None => {
                log::debug!("[DeviceSettings] No persisted SELinux mode to restore");
                false
            }
        }
    }

    /// Handle every queued event without blocking
    pub fn pump_events(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.bridge.try_next() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Wait until every started task's completion has been handled
    pub async fn settle(&mut self) {
        while self.pending_tasks > 0 {
            match self.bridge.next().await {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }
    }

    fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::TaskCompleted(completion) => self.on_task_completed(completion),
        }
    }

    fn on_task_completed(&mut self, completion: TaskCompletion) {
        self.pending_tasks = self.pending_tasks.saturating_sub(1);
        let TaskCompletion { id, kind, outcome } = completion;

        if outcome.succeeded {
            log_parsed!("{:?}#{} took effect", kind, id);
            return;
        }

        match &outcome.failure {
            Some(e) if e.is_denied() => log::warn!("[DeviceSettings] {:?}#{} denied", kind, id),
            Some(e) => log::warn!("[DeviceSettings] {:?}#{} failed: {}", kind, id, e),
            None => log::warn!("[DeviceSettings] {:?}#{} failed", kind, id),
        }

        match kind {
            TaskKind::SelinuxMode => {
                // Did not work, so show the actual value
                let live = self.probe.is_enforced();
                self.selinux.correct_displayed(live);
                self.sync_selinux_controls();
            }
            TaskKind::BootRestore => {}
        }
    }

    fn sync_selinux_controls(&mut self) {
        self.controls.insert(
            PREF_SELINUX_MODE,
            ControlState {
                enabled: true,
                value: Some(PreferenceValue::Bool(self.selinux.displayed())),
            },
        );
        self.controls.insert(
            PREF_SELINUX_PERSISTENCE,
            ControlState {
                enabled: true,
                value: Some(PreferenceValue::Bool(self.selinux.persistence_enabled())),
            },
        );
    }
}
