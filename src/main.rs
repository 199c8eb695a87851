use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use device_parts::config::ConfigManager;
use device_parts::log_collector::{ensure_logs_dir_exists, LogCollector};
use device_parts::ui::{DeviceSettings, SettingsDeps, ALL_KEYS};
use device_parts::{AppError, PreferenceValue};

#[derive(Parser, Debug)]
#[command(name = "device_parts", version, about = "Device-specific tunables")]
struct Cli {
    /// Configuration file (defaults to config/parts.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show every control and its current value
    Status,
    /// Change one control, e.g. `set microphone_gain 60` or `set selinux_mode false`
    ///
    /// Enhancer controls (dirac_enabled, dirac_headset_pref, dirac_preset_pref) drive the
    /// bundled in-process enhancer and do not outlive this invocation.
    Set {
        key: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Re-apply persisted overrides after boot
    Boot,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ConfigManager::load(cli.config.as_deref()).context("loading configuration")?;

    // =========================================================================
    // LOGGING INITIALIZATION - MUST BE FIRST
    // =========================================================================
    if let Err(e) = ensure_logs_dir_exists(&config.log_dir) {
        eprintln!("[Main] WARNING: {}", e);
    }
    let level = config.log_filter()?;
    let collector = match LogCollector::new(config.log_dir.clone(), level) {
        Ok(collector) => Some(collector),
        Err(e) => {
            eprintln!("[Main] WARNING: LogCollector initialization failed: {}", e);
            None
        }
    };
    if let Some(collector) = collector.clone() {
        if let Err(e) = collector.install() {
            eprintln!("[Main] WARNING: Failed to set LogCollector as global logger: {}", e);
        }
    }
    log::info!("Device Parts {} starting", device_parts::VERSION);

    let deps = SettingsDeps::from_config(&config, tokio::runtime::Handle::current());
    let mut settings = DeviceSettings::load(deps).map_err(AppError::from)?;

    let result = run(&mut settings, cli.command).await;

    // Every started privileged task reports back before exit
    settings.settle().await;
    if matches!(result, Ok(true)) {
        print_status(&settings);
    }

    if let Some(collector) = collector {
        if let Err(e) = collector.wait_for_empty() {
            eprintln!("[Main] WARNING: Failed to flush logs: {}", e);
        }
    }

    match result {
        Ok(_) => Ok(()),
        Err(e) => {
            eprintln!("{}", e.user_message());
            Err(e.into())
        }
    }
}

/// Returns whether the final status should be printed
async fn run(settings: &mut DeviceSettings, command: Command) -> Result<bool, AppError> {
    match command {
        Command::Status => Ok(true),
        Command::Set { key, value } => {
            let control = settings
                .control(&key)
                .ok_or_else(|| AppError::UnknownControl(key.clone()))?;
            if !control.enabled {
                return Err(AppError::Unsupported(key));
            }
            let value = PreferenceValue::parse(&value);
            if !DeviceSettings::accepts(&key, &value) {
                return Err(AppError::InvalidInput(format!("{} does not accept '{}'", key, value)));
            }
            settings.on_preference_change(&key, value);
            Ok(true)
        }
        Command::Boot => {
            settings.restore_on_boot();
            Ok(false)
        }
    }
}

fn print_status(settings: &DeviceSettings) {
    for key in ALL_KEYS {
        match settings.control(key) {
            Some(control) if !control.enabled => println!("{:<22} unsupported", key),
            Some(control) => match &control.value {
                Some(value) => println!("{:<22} {}", key, value),
                None => println!("{:<22} -", key),
            },
            None => {}
        }
    }
}
