use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use orgvote_core::Address;

/// Errors that can occur in configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidEnvVar(String, String),

    #[error("Failed to read file: {0}")]
    FileReadError(String),

    #[error("Failed to parse YAML: {0}")]
    YamlParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Bonding curve constants of the deployment, in smallest currency units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleSection {
    #[serde(default = "default_base_price")]
    pub base_price: u64,
    #[serde(default = "default_price_delta")]
    pub price_delta: u64,
}

impl Default for SaleSection {
    fn default() -> Self {
        Self {
            base_price: default_base_price(),
            price_delta: default_price_delta(),
        }
    }
}

fn default_base_price() -> u64 {
    10_000_000_000_000_000
}

fn default_price_delta() -> u64 {
    1_000_000_000_000_000
}

/// Votation rules. Option-count bounds are fixed and not configurable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GovernanceSection {
    #[serde(default = "default_voting_period")]
    pub voting_period_secs: u64,
}

impl Default for GovernanceSection {
    fn default() -> Self {
        Self {
            voting_period_secs: default_voting_period(),
        }
    }
}

fn default_voting_period() -> u64 {
    7 * 24 * 60 * 60
}

/// Main platform configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default)]
    pub sale: SaleSection,
    #[serde(default)]
    pub governance: GovernanceSection,
    /// Custody account holding unsold tokens, hex encoded
    #[serde(default = "default_treasury")]
    pub treasury: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_treasury() -> String {
    Address::TREASURY.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            sale: SaleSection::default(),
            governance: GovernanceSection::default(),
            treasury: default_treasury(),
            log_level: default_log_level(),
        }
    }
}

impl PlatformConfig {
    /// Load configuration from the environment.
    ///
    /// `ORGVOTE_CONFIG_FILE` names a YAML file used as the base when it
    /// exists; individual `ORGVOTE_*` variables override it.
    pub fn from_env() -> Result<Self> {
        let mut config = match env::var("ORGVOTE_CONFIG_FILE") {
            Ok(path) if Path::new(&path).exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };

        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileReadError(format!("Failed to read {}: {}", path.display(), e)))?;

        let config: PlatformConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `ORGVOTE_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, value: String) -> Result<T>
        where
            T::Err: std::fmt::Display,
        {
            value
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        }

        if let Some(value) = lookup("ORGVOTE_BASE_PRICE") {
            self.sale.base_price = parse("ORGVOTE_BASE_PRICE", value)?;
        }
        if let Some(value) = lookup("ORGVOTE_PRICE_DELTA") {
            self.sale.price_delta = parse("ORGVOTE_PRICE_DELTA", value)?;
        }
        if let Some(value) = lookup("ORGVOTE_VOTING_PERIOD") {
            self.governance.voting_period_secs = parse("ORGVOTE_VOTING_PERIOD", value)?;
        }
        if let Some(value) = lookup("ORGVOTE_TREASURY") {
            self.treasury = value;
        }
        if let Some(value) = lookup("ORGVOTE_LOG_LEVEL") {
            self.log_level = value;
        }

        Ok(())
    }

    /// Check the configuration for values the registry cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.governance.voting_period_secs == 0 {
            return Err(ConfigError::Invalid("voting_period_secs must be positive".to_string()));
        }
        self.treasury_address()?;
        Ok(())
    }

    /// The treasury as an address
    pub fn treasury_address(&self) -> Result<Address> {
        self.treasury
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("treasury: {}", e)))
    }
}

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Calling this more than once is
/// harmless; later calls leave the first subscriber in place.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
