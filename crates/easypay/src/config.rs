//! # Configuration
//!
//! Turns the process environment and an optional TOML file into explicit
//! [`Provider`] values. The core never reads configuration itself.
//!
//! ```toml
//! # config/providers.toml
//! [[providers]]
//! name = "cryptobot"
//! api_key = "..."
//! network = "test"
//!
//! [[providers]]
//! name = "crystalpay"
//! login = "..."
//! secret = "..."
//! ```
//!
//! Environment variables are named `<PROVIDER>_<FIELD>`, e.g.
//! `CRYPTOBOT_API_KEY` or `CRYSTALPAY_LOGIN`. A field set in the
//! environment wins over the same field in the file.

use easypay_core::{Credentials, PaymentError, Provider};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Where [`load_providers`] looks for the provider file, first hit wins
pub const PROVIDER_FILE_PATHS: [&str; 3] = [
    "config/providers.toml",
    "../config/providers.toml",
    "../../config/providers.toml",
];

/// Overrides [`PROVIDER_FILE_PATHS`] when set
pub const PROVIDER_FILE_VAR: &str = "EASYPAY_PROVIDERS_FILE";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

const DEFAULT_AMOUNT: &str = "15";
const DEFAULT_INVOICE_CURRENCY: &str = "RUB";

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid {var}: {message}")]
    InvalidVar { var: String, message: String },

    #[error(transparent)]
    Payment(#[from] PaymentError),
}

/// `[[providers]]` tables of the provider file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub providers: Vec<Provider>,
}

impl ProvidersConfig {
    /// Parse TOML text. Blank values count as unset.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(content)?;
        for provider in &mut config.providers {
            provider.credentials.clear_blank();
        }
        Ok(config)
    }

    /// Read and parse a provider file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Providers from `<NAME>_<FIELD>` variables for each of `names`.
    ///
    /// A name with no variable set yields no provider. Empty values count
    /// as unset.
    pub fn from_lookup<F>(names: &[&str], lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut providers = Vec::new();

        for name in names {
            let mut credentials = Credentials::new();
            for field in Credentials::FIELDS {
                let var = env_var_name(name, field);
                let Some(value) = lookup(&var).filter(|v| !v.trim().is_empty()) else {
                    continue;
                };
                credentials
                    .set(field, value.trim())
                    .map_err(|e| ConfigError::InvalidVar {
                        var,
                        message: e.to_string(),
                    })?;
            }

            if !credentials.is_empty() {
                debug!("Provider {} configured from environment", name);
                providers.push(Provider::with_credentials(*name, credentials));
            }
        }

        Ok(Self { providers })
    }

    /// [`from_lookup`](Self::from_lookup) over the process environment
    pub fn from_env(names: &[&str]) -> Result<Self, ConfigError> {
        Self::from_lookup(names, |var| std::env::var(var).ok())
    }

    /// Overlay `other` on `self`: fields `other` sets replace ours,
    /// providers only `other` knows are appended.
    pub fn merge(mut self, other: ProvidersConfig) -> Result<Self, ConfigError> {
        for incoming in other.providers {
            match self.providers.iter_mut().find(|p| p.name == incoming.name) {
                Some(existing) => {
                    for field in Credentials::FIELDS {
                        if let Some(value) = incoming.credentials.get(field) {
                            existing.credentials.set(field, value)?;
                        }
                    }
                }
                None => self.providers.push(incoming),
            }
        }
        Ok(self)
    }

    /// Provider names, in file order
    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn into_providers(self) -> Vec<Provider> {
        self.providers
    }
}

/// `CRYPTOBOT_API_KEY` for (`cryptobot`, `api_key`)
pub fn env_var_name(provider: &str, field: &str) -> String {
    format!("{}_{}", provider, field).to_ascii_uppercase()
}

/// Load `.env`, the provider file (if any) and the environment.
///
/// `names` are the providers to look up in the environment, usually the
/// resolver's supported providers. Providers named only in the file are
/// kept as well.
pub fn load_providers(names: &[&str]) -> Result<Vec<Provider>, ConfigError> {
    dotenvy::dotenv().ok();

    let file = match std::env::var(PROVIDER_FILE_VAR) {
        Ok(path) => {
            let config = ProvidersConfig::load(&path)?;
            info!("Loaded {} providers from {}", config.providers.len(), path);
            config
        }
        Err(_) => load_provider_file()?,
    };

    let env = ProvidersConfig::from_env(names)?;
    let merged = file.merge(env)?;

    if merged.providers.is_empty() {
        warn!("No providers configured in file or environment");
    }
    Ok(merged.into_providers())
}

fn load_provider_file() -> Result<ProvidersConfig, ConfigError> {
    for path in PROVIDER_FILE_PATHS {
        if Path::new(path).is_file() {
            let config = ProvidersConfig::load(path)?;
            info!("Loaded {} providers from {}", config.providers.len(), path);
            return Ok(config);
        }
    }

    debug!("No provider file found");
    Ok(ProvidersConfig::default())
}

/// Settings of the `easypay` polling binary
#[derive(Debug, Clone, PartialEq)]
pub struct WatchConfig {
    /// `INVOICE_AMOUNT` (default 15)
    pub amount: Decimal,
    /// `INVOICE_CURRENCY` (default RUB)
    pub currency: String,
    /// `INVOICE_PROVIDER`; unset means the default provider
    pub provider: Option<String>,
    /// `POLL_INTERVAL_SECS` (default 5)
    pub poll_interval: Duration,
}

impl WatchConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let amount_raw = get("INVOICE_AMOUNT").unwrap_or_else(|| DEFAULT_AMOUNT.to_string());
        let amount: Decimal = amount_raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidVar {
                var: "INVOICE_AMOUNT".to_string(),
                message: format!("{amount_raw:?} is not a decimal: {e}"),
            })?;
        if amount <= Decimal::ZERO {
            return Err(ConfigError::InvalidVar {
                var: "INVOICE_AMOUNT".to_string(),
                message: "must be positive".to_string(),
            });
        }

        let poll_interval = match get("POLL_INTERVAL_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidVar {
                    var: "POLL_INTERVAL_SECS".to_string(),
                    message: format!("{raw:?} is not a whole number of seconds"),
                })?;
                Duration::from_secs(secs.max(1))
            }
            None => DEFAULT_POLL_INTERVAL,
        };

        Ok(Self {
            amount,
            currency: get("INVOICE_CURRENCY")
                .map(|c| c.trim().to_string())
                .unwrap_or_else(|| DEFAULT_INVOICE_CURRENCY.to_string()),
            provider: get("INVOICE_PROVIDER").map(|p| p.trim().to_string()),
            poll_interval,
        })
    }
}
