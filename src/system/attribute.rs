//! Attribute Channel: validated writes to kernel-exposed control files
//!
//! Writes are best-effort and fire-and-forget. A value outside the attribute's
//! domain, a missing path (common when the hardware variant lacks the feature)
//! or a permission error is logged and reported as `false`; nothing here panics.
//! The channel keeps no in-process state besides the system root it resolves
//! attribute paths against.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::AttributeError;
use crate::models::{Attribute, AttributeValue};

#[derive(Clone, Debug)]
pub struct AttributeChannel {
    /// Prefix for absolute attribute paths, `/` in production
    root: PathBuf,
}

impl Default for AttributeChannel {
    fn default() -> Self {
        Self::new(PathBuf::from("/"))
    }
}

impl AttributeChannel {
    pub fn new(root: PathBuf) -> Self {
        AttributeChannel { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an attribute path onto the configured root
    pub fn resolve(&self, attribute: &Attribute) -> PathBuf {
        let relative = attribute.path.trim_start_matches('/');
        self.root.join(relative)
    }

    /// Whether the backing path exists on this device
    pub fn is_supported(&self, attribute: &Attribute) -> bool {
        self.resolve(attribute).exists()
    }

    /// Validate and write, logging any failure
    ///
    /// # Returns
    /// `true` if the encoded value reached the attribute, `false` otherwise
    pub fn write(&self, attribute: &Attribute, value: impl Into<AttributeValue>) -> bool {
        let value = value.into();
        match self.try_write(attribute, &value) {
            Ok(()) => {
                log::debug!("[AttributeChannel] {} <- {}", attribute.key, attribute.encode(&value));
                true
            }
            Err(e) => {
                log::warn!("[AttributeChannel] Dropped write to {}: {}", attribute.key, e);
                false
            }
        }
    }

    /// Validate and write, returning the precise failure
    pub fn try_write(&self, attribute: &Attribute, value: &AttributeValue) -> Result<(), AttributeError> {
        if !attribute.writable {
            return Err(AttributeError::ReadOnly(attribute.key.to_string()));
        }
        attribute.validate(value)?;

        let path = self.resolve(attribute);
        if !path.exists() {
            return Err(AttributeError::PathMissing(path.display().to_string()));
        }

        // Never create: sysfs nodes either exist or the feature is absent
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|source| AttributeError::Io {
                path: path.display().to_string(),
                source,
            })?;

        file.write_all(attribute.encode(value).as_bytes())
            .map_err(|source| AttributeError::Io {
                path: path.display().to_string(),
                source,
            })
    }

    /// Read the current contents of the attribute, trimmed
    pub fn read(&self, attribute: &Attribute) -> Result<String, AttributeError> {
        let path = self.resolve(attribute);
        std::fs::read_to_string(&path)
            .map(|s| s.trim().to_string())
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    AttributeError::PathMissing(path.display().to_string())
                } else {
                    AttributeError::Io {
                        path: path.display().to_string(),
                        source,
                    }
                }
            })
    }

    /// Read the attribute and parse its first integer field
    pub fn read_int(&self, attribute: &Attribute) -> Option<i64> {
        self.read(attribute)
            .ok()
            .and_then(|s| s.split_whitespace().next().and_then(|v| v.parse().ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{headphone_gain, microphone_gain, selinux_enforce};

    fn sandbox_with(attribute: &Attribute, initial: &str) -> (tempfile::TempDir, AttributeChannel) {
        let dir = tempfile::TempDir::new().unwrap();
        let channel = AttributeChannel::new(dir.path().to_path_buf());
        let path = channel.resolve(attribute);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, initial).unwrap();
        (dir, channel)
    }

    #[test]
    fn test_mic_gain_scenario() {
        let attr = microphone_gain();
        let (_dir, channel) = sandbox_with(&attr, "0");

        assert!(!channel.write(&attr, 150i64));
        assert_eq!(channel.read(&attr).unwrap(), "0");

        assert!(channel.write(&attr, 60i64));
        assert_eq!(channel.read(&attr).unwrap(), "60");
    }

    #[test]
    fn test_symmetric_write() {
        let attr = headphone_gain();
        let (_dir, channel) = sandbox_with(&attr, "0 0");
        assert!(channel.write(&attr, 7i64));
        assert_eq!(channel.read(&attr).unwrap(), "7 7");
        assert_eq!(channel.read_int(&attr), Some(7));
    }

    #[test]
    fn test_missing_path_is_not_created() {
        let dir = tempfile::TempDir::new().unwrap();
        let channel = AttributeChannel::new(dir.path().to_path_buf());
        let attr = microphone_gain();

        assert!(!channel.is_supported(&attr));
        assert!(matches!(
            channel.try_write(&attr, &AttributeValue::Int(10)),
            Err(AttributeError::PathMissing(_))
        ));
        assert!(!channel.resolve(&attr).exists());
    }

    #[test]
    fn test_read_only_attribute_rejected() {
        let attr = selinux_enforce();
        let (_dir, channel) = sandbox_with(&attr, "1");
        assert!(!channel.write(&attr, 0i64));
        assert_eq!(channel.read(&attr).unwrap(), "1");
    }
}
