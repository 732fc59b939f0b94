use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::queries::DEFAULT_PAGE_SIZE;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub db_path: PathBuf,
    /// Upper bound on waiting for a user's lock before failing with a
    /// retryable error.
    pub lock_timeout_ms: u64,
    pub inventory_page_size: usize,
    pub log: LogConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("trade-inventory.db"),
            lock_timeout_ms: 2_000,
            inventory_page_size: DEFAULT_PAGE_SIZE,
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ServiceConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        let config: ServiceConfig = serde_yaml::from_str(raw)?;
        if config.lock_timeout_ms == 0 {
            anyhow::bail!("lock_timeout_ms must be greater than zero");
        }
        Ok(config)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}
