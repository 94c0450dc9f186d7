//! File-backed key/value store for per-user overrides.
//!
//! Holds the `apimBaseUrl` the way the browser client keeps it in
//! `localStorage`. The file is reread on every lookup.

use std::collections::BTreeMap;
use std::path::PathBuf;

use azdash_client::OverrideStore;

use crate::error::{Error, Result};

/// Key under which the APIM base URL is stored.
pub const APIM_BASE_URL_KEY: &str = "apimBaseUrl";

#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Value for `key`. Unreadable storage is logged and treated as empty.
    pub fn get(&self, key: &str) -> Option<String> {
        match self.read_all() {
            Ok(mut entries) => entries.remove(key),
            Err(e) => {
                log::warn!("Ignoring unreadable storage: {e}");
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    /// Remove `key`; returns whether it was present.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let mut entries = self.read_all()?;
        let existed = entries.remove(key).is_some();
        if existed {
            self.write_all(&entries)?;
        }
        Ok(existed)
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(Error::io_with_path(e, &self.path)),
        };
        serde_json::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse {}: {e}", self.path.display())))
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io_with_path(e, parent))?;
        }
        let json = serde_json::to_string_pretty(entries).map_err(|e| Error::config(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| Error::io_with_path(e, &self.path))
    }
}

impl OverrideStore for LocalStorage {
    fn apim_base_url(&self) -> Option<String> {
        self.get(APIM_BASE_URL_KEY).filter(|v| !v.trim().is_empty())
    }
}
