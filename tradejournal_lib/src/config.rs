//! Runtime configuration: optional YAML file, then environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::source::RetryPolicy;

pub const ENV_API_URL: &str = "TRADEJOURNAL_API_URL";
pub const ENV_API_KEY: &str = "TRADEJOURNAL_API_KEY";
pub const ENV_USER_ID: &str = "TRADEJOURNAL_USER_ID";
pub const ENV_TIMEOUT_SECS: &str = "TRADEJOURNAL_TIMEOUT_SECS";
pub const ENV_MAX_RETRIES: &str = "TRADEJOURNAL_MAX_RETRIES";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config YAML: {0}")]
    YamlParse(#[from] serde_yml::Error),
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct JournalConfig {
    /// Base URL of the hosted record store.
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub user_id: Option<String>,
    /// Local journal database, used when no API URL is configured.
    pub db_path: Option<PathBuf>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
}

impl Default for JournalConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            api_url: None,
            api_key: None,
            user_id: None,
            db_path: None,
            timeout_secs: policy.timeout.as_secs(),
            max_retries: policy.max_retries,
            base_backoff_ms: policy.base_backoff.as_millis() as u64,
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl JournalConfig {
    pub fn from_yaml_str(yaml_content: &str) -> Result<Self, ConfigError> {
        if yaml_content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml_content)?)
    }

    /// Reads `path` if given, otherwise starts from defaults. Environment
    /// variables are applied on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_yaml_str(&content)?
            }
            None => Self::default(),
        };
        config.apply_env_with(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies overrides from `lookup`. Unparseable numbers are ignored with
    /// a warning.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).and_then(non_empty) {
            self.api_url = Some(url);
        }
        if let Some(key) = lookup(ENV_API_KEY).and_then(non_empty) {
            self.api_key = Some(key);
        }
        if let Some(user) = lookup(ENV_USER_ID).and_then(non_empty) {
            self.user_id = Some(user);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.timeout_secs = secs,
                _ => tracing::warn!("Ignoring invalid {}={:?}", ENV_TIMEOUT_SECS, raw),
            }
        }
        if let Some(raw) = lookup(ENV_MAX_RETRIES) {
            match raw.trim().parse::<u32>() {
                Ok(retries) => self.max_retries = retries,
                Err(_) => tracing::warn!("Ignoring invalid {}={:?}", ENV_MAX_RETRIES, raw),
            }
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
            max_retries: self.max_retries,
            base_backoff: Duration::from_millis(self.base_backoff_ms),
        }
    }
}
