//! Live enforcement state probe
//!
//! The rollback path always re-reads live truth through this trait rather than
//! trusting the value the user toggled away from.

use std::process::Command;

use crate::models::{selinux_enforce, Attribute};
use crate::system::AttributeChannel;

/// Trait for reading the live enforcement mode
pub trait EnforcementProbe: Send + Sync {
    fn is_enforced(&self) -> bool;
}

/// Reads `/sys/fs/selinux/enforce`, falling back to `getenforce`
pub struct SysfsEnforcementProbe {
    channel: AttributeChannel,
    attribute: Attribute,
}

impl SysfsEnforcementProbe {
    pub fn new(channel: AttributeChannel) -> Self {
        SysfsEnforcementProbe {
            channel,
            attribute: selinux_enforce(),
        }
    }

    fn from_getenforce() -> Option<bool> {
        let output = Command::new("getenforce").output().ok()?;
        if !output.status.success() {
            return None;
        }
        parse_getenforce(&String::from_utf8_lossy(&output.stdout))
    }
}

fn parse_getenforce(stdout: &str) -> Option<bool> {
    match stdout.trim() {
        "Enforcing" => Some(true),
        "Permissive" | "Disabled" => Some(false),
        _ => None,
    }
}

impl EnforcementProbe for SysfsEnforcementProbe {
    fn is_enforced(&self) -> bool {
        if let Some(v) = self.channel.read_int(&self.attribute) {
            return v == 1;
        }
        match Self::from_getenforce() {
            Some(v) => v,
            None => {
                // No SELinux at all reads as not enforcing
                log::debug!("[Selinux] Enforcement state unavailable, assuming permissive");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_sysfs_node() {
        let dir = tempfile::TempDir::new().unwrap();
        let channel = AttributeChannel::new(dir.path().to_path_buf());
        let path = channel.resolve(&selinux_enforce());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();

        std::fs::write(&path, "1\n").unwrap();
        let probe = SysfsEnforcementProbe::new(channel.clone());
        assert!(probe.is_enforced());

        std::fs::write(&path, "0").unwrap();
        assert!(!probe.is_enforced());
    }

    #[test]
    fn test_parse_getenforce() {
        assert_eq!(parse_getenforce("Enforcing\n"), Some(true));
        assert_eq!(parse_getenforce("Permissive\n"), Some(false));
        assert_eq!(parse_getenforce("garbage"), None);
    }
}
