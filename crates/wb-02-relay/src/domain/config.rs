//! Relay configuration.

use serde::{Deserialize, Serialize};
use shared_types::PROVIDER_SOURCE_TAG;
use std::time::Duration;
use thiserror::Error;

/// Budget for all wallet calls made on behalf of one page request, consent
/// prompts included. Kept under the page's 30 s window so the relay's
/// timeout reply still finds the caller waiting.
pub const DEFAULT_BACKGROUND_TIMEOUT: Duration = Duration::from_secs(25);

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("Source tag cannot be empty")]
    EmptySourceTag,
}

/// Content relay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Budget for the background calls of one page request, in milliseconds.
    pub background_timeout_ms: u64,
    /// Only requests carrying this tag in `source` are accepted.
    pub source_tag: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            background_timeout_ms: DEFAULT_BACKGROUND_TIMEOUT.as_millis() as u64,
            source_tag: PROVIDER_SOURCE_TAG.to_string(),
        }
    }
}

impl RelayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.background_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "background_timeout_ms cannot be 0".into(),
            ));
        }
        if self.source_tag.trim().is_empty() {
            return Err(ConfigError::EmptySourceTag);
        }
        Ok(())
    }

    pub fn background_timeout(&self) -> Duration {
        Duration::from_millis(self.background_timeout_ms)
    }
}
