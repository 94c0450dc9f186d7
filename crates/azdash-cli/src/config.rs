//! The azdash config file.
//!
//! Resolved from `--config`, then `AZDASH_CONFIG`, then
//! `<config dir>/azdash/config.toml`. A missing file means defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use azdash_client::Settings;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "AZDASH_CONFIG";

const PROJECT: &str = "azdash";

/// Settings read from `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    /// Base URL of the API.
    pub api_root: String,
    /// Upper bound on the startup auth-config fetch, in seconds.
    pub config_timeout_secs: u64,
    /// Token cache file. Defaults to `<cache dir>/azdash/tokens.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_cache: Option<PathBuf>,
    /// Local override storage file. Defaults to `<data dir>/azdash/storage.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            api_root: "http://localhost:8080/api".to_string(),
            config_timeout_secs: 10,
            token_cache: None,
            storage_path: None,
        }
    }
}

impl DashConfig {
    /// `<config dir>/azdash/config.toml`, if the platform has a config dir.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(PROJECT).join("config.toml"))
    }

    /// The config file to use: explicit path, then `AZDASH_CONFIG`, then the default.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var(CONFIG_ENV)
            && !path.trim().is_empty()
        {
            return Some(PathBuf::from(path));
        }
        Self::default_config_path()
    }

    /// Load the resolved config file, or defaults if there is none.
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        match Self::resolve_config_path(explicit) {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config file at {}; using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(Error::io_with_path(e, path)),
        };
        toml::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Token cache location, explicit or platform default.
    pub fn token_cache_path(&self) -> Option<PathBuf> {
        self.token_cache
            .clone()
            .or_else(|| dirs::cache_dir().map(|d| d.join(PROJECT).join("tokens.json")))
    }

    /// Override storage location, explicit or platform default.
    pub fn storage_file(&self) -> Option<PathBuf> {
        self.storage_path
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join(PROJECT).join("storage.json")))
    }

    /// Startup settings, with `api_root` overridden when given.
    pub fn settings(&self, api_root: Option<&str>) -> Settings {
        Settings::new(api_root.unwrap_or(&self.api_root))
            .with_config_timeout(Duration::from_secs(self.config_timeout_secs))
    }
}
