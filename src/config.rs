//! Configuration Management
//!
//! Handles persistent configuration storage for assetsync.

use crate::resource::waiter::WaitPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable overriding the configured host
pub const HOST_ENV: &str = "ASSETSYNC_HOST";

/// Environment variable enabling request logging (`true`/`1`)
pub const DEBUG_ENV: &str = "ASSETSYNC_DEBUG";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Control-plane API host
    #[serde(default)]
    pub host: Option<String>,
    /// Log outgoing request parameters
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub wait: WaitPolicy,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("assetsync").join("config.json"))
    }

    /// Load configuration from disk, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring unreadable config: {:#}", e);
                Self::default()
            },
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective host (environment > config)
    pub fn effective_host(&self) -> Option<String> {
        std::env::var(HOST_ENV)
            .ok()
            .filter(|h| !h.trim().is_empty())
            .or_else(|| self.host.clone().filter(|h| !h.trim().is_empty()))
    }

    /// Get effective debug flag (environment > config)
    pub fn effective_debug(&self) -> bool {
        match std::env::var(DEBUG_ENV) {
            Ok(value) => matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1"),
            Err(_) => self.debug,
        }
    }

    /// Parsed base URL of the control-plane API
    pub fn base_url(&self) -> Result<Url> {
        let host = self.effective_host().with_context(|| {
            format!("No control-plane host configured; set {} or `host`", HOST_ENV)
        })?;
        Url::parse(&host).with_context(|| format!("Invalid control-plane host {:?}", host))
    }
}
