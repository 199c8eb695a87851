//! Namespaced flat boolean key-value store.
//!
//! Each namespace is one JSON object (`<store_dir>/<namespace>.json`) mapping
//! keys to booleans. Every mutation is written through immediately, so a
//! store re-opened after a restart sees exactly what the last write left.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct PrefStore {
    namespace: String,
    path: PathBuf,
    entries: BTreeMap<String, bool>,
}

impl PrefStore {
    /// Open (or lazily create) the namespace under `dir`
    ///
    /// ERROR HANDLING: A corrupt file logs a warning and opens empty instead of
    /// failing; only real IO errors are returned.
    pub fn open(dir: &Path, namespace: &str) -> Result<Self, StoreError> {
        let path = dir.join(format!("{}.json", namespace));
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<BTreeMap<String, bool>>(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!(
                        "[PrefStore] Failed to parse {}, starting empty: {}",
                        path.display(),
                        e
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StoreError::IoError(e)),
        };

        Ok(PrefStore {
            namespace: namespace.to_string(),
            path,
            entries,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<bool> {
        self.entries.get(key).copied()
    }

    /// Entries only change in memory once the new contents reached disk
    pub fn put(&mut self, key: &str, value: bool) -> Result<(), StoreError> {
        let mut candidate = self.entries.clone();
        candidate.insert(key.to_string(), value);
        self.apply(&candidate)?;
        self.entries = candidate;
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if !self.entries.contains_key(key) {
            return Ok(());
        }
        let mut candidate = self.entries.clone();
        candidate.remove(key);
        self.apply(&candidate)?;
        self.entries = candidate;
        Ok(())
    }

    fn apply(&self, entries: &BTreeMap<String, bool>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(entries).map_err(|source| {
            StoreError::InvalidJson {
                namespace: self.namespace.clone(),
                source,
            }
        })?;

        // Write to a sibling then rename so a crash never leaves half a file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
