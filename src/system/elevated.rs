//! Elevated Executor: runs one shell command with root privilege
//!
//! The call is synchronous and may block for a long time (process spawn, an
//! interactive grant prompt from the root manager), so it must only be invoked
//! from a worker context, never from the UI-owning context.

use std::process::Command;

use crate::error::ElevationError;
use crate::log_info;
use crate::models::PrivilegedCommand;

/// Trait for privileged command execution
pub trait ElevatedExecutor: Send + Sync {
    fn run_elevated(&self, command: &PrivilegedCommand) -> Result<(), ElevationError>;
}

/// Production executor wrapping the device's `su` binary
///
/// Every command is prefixed with `id` so the first line of stdout proves
/// whether root was actually granted. A missing `uid=0` marker is a denial,
/// distinct from the command itself exiting non-zero.
#[derive(Clone, Debug)]
pub struct SuShell {
    binary: String,
    /// Run `sh` directly when the process already is root
    direct_when_root: bool,
}

impl Default for SuShell {
    fn default() -> Self {
        Self::new("su")
    }
}

impl SuShell {
    pub fn new(binary: &str) -> Self {
        SuShell {
            binary: binary.to_string(),
            direct_when_root: true,
        }
    }

    /// Route every command through the binary, even when already root
    pub fn always_use_binary(mut self) -> Self {
        self.direct_when_root = false;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn already_root() -> bool {
        // SAFETY: geteuid has no preconditions and cannot fail
        unsafe { libc::geteuid() == 0 }
    }

    fn build_command(&self, command: &PrivilegedCommand) -> Command {
        let script = format!("id && {}", command.command_line());
        if self.direct_when_root && Self::already_root() {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(script);
            cmd
        } else {
            let mut cmd = Command::new(&self.binary);
            cmd.arg("-c").arg(script);
            cmd
        }
    }
}

/// Decide the outcome from the captured output of `id && <command>`
pub(crate) fn classify_output(
    command: &PrivilegedCommand,
    success: bool,
    code: Option<i32>,
    stdout: &str,
    stderr: &str,
) -> Result<(), ElevationError> {
    let granted = stdout
        .lines()
        .next()
        .map(|line| line.contains("uid=0"))
        .unwrap_or(false);

    if !granted {
        return Err(ElevationError::Denied {
            cmd: command.command_line().to_string(),
        });
    }
    if !success {
        return Err(ElevationError::Failed {
            cmd: command.command_line().to_string(),
            code,
            stderr: stderr.trim().to_string(),
        });
    }
    Ok(())
}

impl ElevatedExecutor for SuShell {
    fn run_elevated(&self, command: &PrivilegedCommand) -> Result<(), ElevationError> {
        log_info!("[SuShell] Running elevated: {}", command);

        let output = self
            .build_command(command)
            .output()
            .map_err(|e| ElevationError::Spawn {
                binary: self.binary.clone(),
                reason: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            log::debug!("[SuShell] stderr: {}", stderr.trim());
        }

        let result = classify_output(
            command,
            output.status.success(),
            output.status.code(),
            &stdout,
            &stderr,
        );
        match &result {
            Ok(()) => log_info!("[SuShell] ✓ {}", command),
            Err(e) => log::warn!("[SuShell] {}", e),
        }
        result
    }
}
