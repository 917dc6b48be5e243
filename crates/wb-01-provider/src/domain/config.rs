//! Provider configuration.

use serde::{Deserialize, Serialize};
use shared_types::PROVIDER_SOURCE_TAG;
use std::time::Duration;
use thiserror::Error;

/// Fixed window a request waits for its response.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How often abandoned pending entries are swept.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("Source tag cannot be empty")]
    EmptySourceTag,
}

/// Page-side provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Response window per request, in milliseconds.
    pub request_timeout_ms: u64,
    /// Interval of the abandoned-entry sweep, in milliseconds.
    pub sweep_interval_ms: u64,
    /// Tag stamped into `source` of every request.
    pub source_tag: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL.as_millis() as u64,
            source_tag: PROVIDER_SOURCE_TAG.to_string(),
        }
    }
}

impl ProviderConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "request_timeout_ms cannot be 0".into(),
            ));
        }
        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "sweep_interval_ms cannot be 0".into(),
            ));
        }
        if self.source_tag.trim().is_empty() {
            return Err(ConfigError::EmptySourceTag);
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}
