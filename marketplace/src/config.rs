//! Configuration for the marketplace engine

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Marketplace configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Data directory for the store
    pub data_dir: PathBuf,

    /// Writer mailbox configuration
    pub mailbox: MailboxConfig,

    /// Marketplace policy
    pub policy: PolicyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "marketplace".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::from("./data/market"),
            mailbox: MailboxConfig::default(),
            policy: PolicyConfig::default(),
        }
    }
}

/// Writer mailbox configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxConfig {
    /// Mailbox capacity (messages); senders beyond this see backpressure
    pub capacity: usize,

    /// Operation timeout (milliseconds); expiry surfaces as a Conflict error
    pub op_timeout_ms: u64,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            op_timeout_ms: 5_000,
        }
    }
}

/// Marketplace policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Smallest bounty a request may carry
    pub minimum_bounty: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self { minimum_bounty: 100 }
    }
}

impl Config {
    /// Storage configuration derived from this one
    pub fn core_config(&self) -> market_core::Config {
        market_core::Config {
            data_dir: self.data_dir.clone(),
            ..Default::default()
        }
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(market_core::Error::Io)?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            market_core::Error::Config(format!("Failed to parse config: {}", e))
        })?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("MARKET_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(minimum) = std::env::var("MARKET_MINIMUM_BOUNTY") {
            config.policy.minimum_bounty = minimum.parse().map_err(|_| {
                market_core::Error::Config(format!(
                    "MARKET_MINIMUM_BOUNTY is not an integer: {}",
                    minimum
                ))
            })?;
        }

        Ok(config)
    }
}
