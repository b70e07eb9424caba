//! Connector configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConnectorError;
use crate::logging::LogConfig;

/// Environment variable overriding [`ConnectorConfig::database_url`].
pub const ENV_DATABASE_URL: &str = "CHAINSQL_DATABASE_URL";
/// Environment variable overriding [`ConnectorConfig::queue_size`].
pub const ENV_QUEUE_SIZE: &str = "CHAINSQL_QUEUE_SIZE";

/// Top-level connector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Queue length above which producers are slowed down. Advisory: no
    /// event is ever rejected for exceeding it.
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
    /// First backpressure delay, in milliseconds.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Amount the delay grows or shrinks per overloaded push, in milliseconds.
    #[serde(default = "default_backoff_step_ms")]
    pub backoff_step_ms: u64,
    /// Database URL, e.g. `"sqlite:./chain.db?mode=rwc"`.
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Drop and recreate all tables before ingesting.
    #[serde(default)]
    pub wipe_on_startup: bool,
    /// Logging setup.
    #[serde(default)]
    pub log: LogConfig,
}

fn default_queue_size() -> usize { 1_000 }
fn default_backoff_base_ms() -> u64 { 100 }
fn default_backoff_step_ms() -> u64 { 100 }
fn default_database_url() -> String { "sqlite:./chainsql.db?mode=rwc".into() }

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            queue_size: default_queue_size(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_step_ms: default_backoff_step_ms(),
            database_url: default_database_url(),
            wipe_on_startup: false,
            log: LogConfig::default(),
        }
    }
}

impl ConnectorConfig {
    /// Load a JSON config file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConnectorError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConnectorError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConnectorError> {
        serde_json::from_str(text).map_err(|e| ConnectorError::Config(e.to_string()))
    }

    /// Apply `CHAINSQL_*` environment overrides.
    pub fn with_env_overrides(self) -> Result<Self, ConnectorError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConnectorError> {
        if let Some(url) = lookup(ENV_DATABASE_URL) {
            self.database_url = url;
        }
        if let Some(size) = lookup(ENV_QUEUE_SIZE) {
            self.queue_size = size
                .parse()
                .map_err(|_| ConnectorError::Config(format!("{ENV_QUEUE_SIZE}={size} is not a number")))?;
        }
        Ok(self)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConnectorError> {
        if self.queue_size == 0 {
            return Err(ConnectorError::Config("queue_size must be at least 1".into()));
        }
        if self.backoff_base_ms == 0 {
            return Err(ConnectorError::Config("backoff_base_ms must be at least 1".into()));
        }
        if self.database_url.is_empty() {
            return Err(ConnectorError::Config("database_url is empty".into()));
        }
        Ok(())
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_step(&self) -> Duration {
        Duration::from_millis(self.backoff_step_ms)
    }
}
