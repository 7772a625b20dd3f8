//! Application configuration management.
//!
//! Configuration is stored at `~/.config/famelist/config.json`. A missing
//! `base_url` puts the sync engine in restricted mode (cache and demo only).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::sync::SyncOptions;

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "famelist";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `base_url`
pub const BASE_URL_ENV: &str = "FAMELIST_BASE_URL";

fn default_sync_interval() -> u64 {
    300
}

fn default_request_timeout() -> u64 {
    30
}

fn default_watch_interval() -> u64 {
    2
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Site root serving `data/personalities.json`
    #[serde(default)]
    pub base_url: Option<String>,
    /// Never touch the network, even with a base URL
    #[serde(default)]
    pub offline_mode: bool,
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_watch_interval")]
    pub watch_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            offline_mode: false,
            sync_interval_secs: default_sync_interval(),
            request_timeout_secs: default_request_timeout(),
            watch_interval_secs: default_watch_interval(),
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            config.set_base_url(&url);
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Blank values clear the base URL.
    pub fn set_base_url(&mut self, url: &str) {
        let url = url.trim();
        self.base_url = if url.is_empty() {
            None
        } else {
            Some(url.to_string())
        };
    }

    /// Base URL to fetch from, or `None` when the network must not be used.
    pub fn remote_url(&self) -> Option<&str> {
        if self.offline_mode {
            None
        } else {
            self.base_url.as_deref()
        }
    }

    /// Zero falls back to the default; a request always gets a bounded,
    /// non-zero timeout.
    pub fn request_timeout(&self) -> Duration {
        match self.request_timeout_secs {
            0 => Duration::from_secs(default_request_timeout()),
            secs => Duration::from_secs(secs),
        }
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            sync_interval: Duration::from_secs(self.sync_interval_secs),
            watch_interval: Duration::from_secs(self.watch_interval_secs),
        }
    }
}
