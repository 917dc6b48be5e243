//! # Bridge Configuration
//!
//! Loaded from the TOML file named by `WB_CONFIG` (every section optional),
//! then overridden from the environment:
//!
//! | variable | field |
//! |---|---|
//! | `WB_REQUEST_TIMEOUT_MS` | `provider.request_timeout_ms` |
//! | `WB_BACKGROUND_TIMEOUT_MS` | `relay.background_timeout_ms` |
//! | `WB_PAGE_ORIGIN` | `page.origin` |

use serde::{Deserialize, Serialize};
use shared_types::{Origin, OriginError, SiteAllowlist};
use std::path::{Path, PathBuf};
use thiserror::Error;
use wb_01_provider::ProviderConfig;
use wb_02_relay::RelayConfig;

/// Environment variable naming the config file.
pub const CONFIG_PATH_VAR: &str = "WB_CONFIG";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("Provider: {0}")]
    Provider(#[from] wb_01_provider::ConfigError),

    #[error("Relay: {0}")]
    Relay(#[from] wb_02_relay::ConfigError),

    #[error("Page origin: {0}")]
    Origin(#[from] OriginError),

    #[error("Provider tags requests {provider:?} but the relay expects {relay:?}")]
    SourceTagMismatch { provider: String, relay: String },

    #[error("Relay budget {relay_ms} ms must be shorter than the provider window {provider_ms} ms")]
    RelayOutlivesPage { relay_ms: u64, provider_ms: u64 },
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub provider: ProviderConfig,
    pub relay: RelayConfig,
    pub page: PageConfig,
    pub wallet: WalletConfig,
}

/// The simulated page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Origin the page window runs under.
    pub origin: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            origin: "https://dapp.example".to_string(),
        }
    }
}

/// Initial state of the development wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Active account address.
    pub address: String,
    /// Start with an unlocked session.
    pub authenticated: bool,
    /// Sites trusted without a prompt.
    pub allowed_sites: Vec<String>,
    /// Answer every consent prompt with approval.
    pub auto_approve: bool,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            address: "DevWa11et1111111111111111111111111111111111".to_string(),
            authenticated: false,
            allowed_sites: Vec::new(),
            auto_approve: true,
        }
    }
}

impl WalletConfig {
    /// Parse the allowlist.
    pub fn allowlist(&self) -> Result<SiteAllowlist, OriginError> {
        self.allowed_sites.iter().map(|s| Origin::parse(s)).collect()
    }
}

impl BridgeConfig {
    /// Load from `WB_CONFIG` (if set) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("WB_REQUEST_TIMEOUT_MS") {
            self.provider.request_timeout_ms = parse_millis("WB_REQUEST_TIMEOUT_MS", value)?;
        }
        if let Some(value) = lookup("WB_BACKGROUND_TIMEOUT_MS") {
            self.relay.background_timeout_ms = parse_millis("WB_BACKGROUND_TIMEOUT_MS", value)?;
        }
        if let Some(value) = lookup("WB_PAGE_ORIGIN") {
            self.page.origin = value;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.provider.validate()?;
        self.relay.validate()?;
        if self.provider.source_tag != self.relay.source_tag {
            return Err(ConfigError::SourceTagMismatch {
                provider: self.provider.source_tag.clone(),
                relay: self.relay.source_tag.clone(),
            });
        }
        // A relay timeout reply must arrive while the page entry is still live
        if self.relay.background_timeout_ms >= self.provider.request_timeout_ms {
            return Err(ConfigError::RelayOutlivesPage {
                relay_ms: self.relay.background_timeout_ms,
                provider_ms: self.provider.request_timeout_ms,
            });
        }
        self.page_origin()?;
        self.wallet.allowlist()?;
        Ok(())
    }

    pub fn page_origin(&self) -> Result<Origin, OriginError> {
        Origin::parse(&self.page.origin)
    }
}

fn parse_millis(var: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_valid() {
        let config = BridgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.provider.request_timeout_ms, 30_000);
        assert_eq!(config.relay.background_timeout_ms, 25_000);
    }

    #[test]
    fn test_partial_toml() {
        let config = BridgeConfig::from_toml_str(
            r#"
            [page]
            origin = "https://swap.example"

            [wallet]
            authenticated = true
            allowed_sites = ["https://swap.example"]
            "#,
        )
        .unwrap();

        assert_eq!(config.page.origin, "https://swap.example");
        assert!(config.wallet.authenticated);
        assert!(config.wallet.auto_approve);
        assert_eq!(config.provider, ProviderConfig::default());
        assert!(config
            .wallet
            .allowlist()
            .unwrap()
            .contains(&config.page_origin().unwrap()));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("WB_REQUEST_TIMEOUT_MS", "1500"),
            ("WB_BACKGROUND_TIMEOUT_MS", "900"),
            ("WB_PAGE_ORIGIN", "http://localhost:3000"),
        ]
        .into_iter()
        .collect();

        let mut config = BridgeConfig::default();
        config
            .apply_env(|var| env.get(var).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.provider.request_timeout_ms, 1500);
        assert_eq!(config.relay.background_timeout_ms, 900);
        assert_eq!(config.page_origin().unwrap().as_str(), "http://localhost:3000");
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = BridgeConfig::default();
        let err = config
            .apply_env(|var| (var == "WB_REQUEST_TIMEOUT_MS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = BridgeConfig::default();
        config.page.origin = "not a url".into();
        assert!(matches!(config.validate(), Err(ConfigError::Origin(_))));

        let mut config = BridgeConfig::default();
        config.relay.background_timeout_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Relay(_))));

        let mut config = BridgeConfig::default();
        config.provider.source_tag = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::Provider(_))));

        let mut config = BridgeConfig::default();
        config.relay.source_tag = "someone-else".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SourceTagMismatch { .. })
        ));
    }

    #[test]
    fn test_relay_budget_must_fit_page_window() {
        let mut config = BridgeConfig::default();
        config.relay.background_timeout_ms = config.provider.request_timeout_ms;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RelayOutlivesPage {
                relay_ms: 30_000,
                provider_ms: 30_000
            })
        ));

        config.provider.request_timeout_ms = 5_000;
        config.relay.background_timeout_ms = 4_000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            BridgeConfig::from_toml_str("[provider\nrequest_timeout_ms = 1"),
            Err(ConfigError::Parse(_))
        ));
    }
}
