use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::api::ApiRoutes;
use crate::capabilities::kv::{StorageKey, StorageKeyError};
use crate::{
    DEFAULT_ANOMALY_PAGE_SIZE, DEFAULT_API_BASE_URL, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_SESSION_KEY, MAX_ANOMALY_PAGE_SIZE, MAX_POLL_INTERVAL_MS, MIN_POLL_INTERVAL_MS,
};

/// Shell-supplied console settings. Every field falls back to its default
/// when missing from the serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub api_base_url: String,
    pub poll_interval_ms: u64,
    pub anomaly_page_size: u32,
    pub session_key: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            anomaly_page_size: DEFAULT_ANOMALY_PAGE_SIZE,
            session_key: DEFAULT_SESSION_KEY.into(),
        }
    }
}

impl ConsoleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.routes()?;
        self.session_key()?;

        if !(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&self.poll_interval_ms) {
            return Err(ConfigError::PollIntervalOutOfRange(self.poll_interval_ms));
        }
        if self.anomaly_page_size == 0 || self.anomaly_page_size > MAX_ANOMALY_PAGE_SIZE {
            return Err(ConfigError::PageSizeOutOfRange(self.anomaly_page_size));
        }
        Ok(())
    }

    pub fn routes(&self) -> Result<ApiRoutes, ConfigError> {
        ApiRoutes::new(&self.api_base_url)
    }

    pub fn session_key(&self) -> Result<StorageKey, ConfigError> {
        StorageKey::new(&self.session_key).map_err(ConfigError::InvalidSessionKey)
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("poll interval {0}ms is out of range")]
    PollIntervalOutOfRange(u64),

    #[error("anomaly page size {0} is out of range")]
    PageSizeOutOfRange(u32),

    #[error("invalid session key: {0}")]
    InvalidSessionKey(StorageKeyError),
}
