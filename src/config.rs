//! Application configuration
//!
//! Layered as: built-in defaults, then `~/.salesdash/config.toml`, then
//! environment variables (a `.env` file in the working directory is loaded
//! into the environment first).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::export::MAX_BATCH_SIZE;
use crate::types::{DashError, Result};

pub const ENV_URL: &str = "SALESDASH_URL";
pub const ENV_ANON_KEY: &str = "SALESDASH_ANON_KEY";
pub const ENV_LOG: &str = "SALESDASH_LOG";

/// Default tracing filter when neither the file nor the environment sets one
pub const DEFAULT_LOG_FILTER: &str = "salesdash=info";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the hosted database service
    pub gateway_url: Option<String>,
    /// Public (anon) API key
    pub anon_key: Option<String>,
    /// Days of history requested for the acquisition charts
    pub daily_lookback_days: u32,
    pub page_size: usize,
    /// Rows per request while exporting, at most `MAX_BATCH_SIZE`
    pub export_batch_size: usize,
    pub request_timeout_secs: u64,
    /// Export directory, current directory when unset
    pub export_dir: Option<PathBuf>,
    pub log_filter: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway_url: None,
            anon_key: None,
            daily_lookback_days: 120,
            page_size: 10,
            export_batch_size: 1000,
            request_timeout_secs: 10,
            export_dir: None,
            log_filter: None,
        }
    }
}

impl AppConfig {
    /// `~/.salesdash`, holding config, session and logs
    pub fn home_dir() -> Result<PathBuf> {
        let base_dirs = BaseDirs::new()
            .ok_or_else(|| DashError::Config("Cannot determine home directory".into()))?;
        Ok(base_dirs.home_dir().join(".salesdash"))
    }

    /// Load from the default locations and the process environment
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let path = Self::home_dir()?.join("config.toml");
        let config = Self::from_file(&path)?.apply_env(|key| std::env::var(key).ok());
        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Parse a TOML file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| DashError::Config(format!("Invalid {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(1..=MAX_BATCH_SIZE).contains(&self.export_batch_size) {
            return Err(DashError::Config(format!(
                "export_batch_size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, self.export_batch_size
            )));
        }
        if self.page_size == 0 {
            return Err(DashError::Config("page_size must be at least 1".into()));
        }
        Ok(())
    }

    /// Override fields from environment-style lookups. Blank values are ignored.
    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = get(ENV_URL) {
            self.gateway_url = Some(url);
        }
        if let Some(key) = get(ENV_ANON_KEY) {
            self.anon_key = Some(key);
        }
        if let Some(filter) = get(ENV_LOG) {
            self.log_filter = Some(filter);
        }
        self
    }

    /// Gateway URL and anon key, both required for live mode
    pub fn gateway_credentials(&self) -> Result<(&str, &str)> {
        let url = self
            .gateway_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                DashError::Config(format!("Gateway URL not set (config.toml or {})", ENV_URL))
            })?;
        let key = self
            .anon_key
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                DashError::Config(format!("Anon key not set (config.toml or {})", ENV_ANON_KEY))
            })?;
        Ok((url, key))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}
