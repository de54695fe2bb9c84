//! # Provider Configuration
//!
//! Credential bundles for configured gateway instances and the registry that
//! resolves a provider name to its bundle.

use crate::error::{PaymentError, PaymentResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Gateway network selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    #[serde(alias = "mainnet")]
    Main,
    #[serde(alias = "testnet")]
    Test,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Main => "main",
            Network::Test => "test",
        }
    }
}

impl FromStr for Network {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "main" | "mainnet" => Ok(Network::Main),
            "test" | "testnet" => Ok(Network::Test),
            other => Err(PaymentError::Configuration(format!(
                "unknown network {other:?}, expected main or test"
            ))),
        }
    }
}

/// Credential fields a gateway adapter may require.
///
/// Every field is optional here; each adapter checks its own required subset
/// when it is built.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    /// API key or token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Secret key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// Account login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,

    /// Account password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Merchant / shop identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_id: Option<String>,

    /// Main or test network
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<Network>,

    /// Where the payer lands after paying
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,

    /// Where the gateway sends payment notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,

    /// Pay-page language
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Credentials {
    /// Names of the recognized fields, in declaration order
    pub const FIELDS: [&'static str; 9] = [
        "api_key",
        "secret",
        "login",
        "password",
        "merchant_id",
        "network",
        "redirect_url",
        "callback_url",
        "language",
    ];

    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field by its name. Unknown names are rejected.
    pub fn set(&mut self, field: &str, value: impl Into<String>) -> PaymentResult<()> {
        let value = value.into();
        match field {
            "api_key" => self.api_key = Some(value),
            "secret" => self.secret = Some(value),
            "login" => self.login = Some(value),
            "password" => self.password = Some(value),
            "merchant_id" => self.merchant_id = Some(value),
            "network" => self.network = Some(value.parse()?),
            "redirect_url" => self.redirect_url = Some(value),
            "callback_url" => self.callback_url = Some(value),
            "language" => self.language = Some(value),
            other => {
                return Err(PaymentError::Configuration(format!(
                    "unknown credential field {other:?}"
                )))
            }
        }
        Ok(())
    }

    /// Builder: set API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Builder: set secret
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Builder: set login
    pub fn with_login(mut self, login: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self
    }

    /// Builder: set merchant id
    pub fn with_merchant_id(mut self, merchant_id: impl Into<String>) -> Self {
        self.merchant_id = Some(merchant_id.into());
        self
    }

    /// Builder: set network
    pub fn with_network(mut self, network: Network) -> Self {
        self.network = Some(network);
        self
    }

    /// Builder: set redirect URL
    pub fn with_redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = Some(url.into());
        self
    }

    /// Builder: set callback URL
    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }

    /// Builder: set language
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Read a field by its name
    pub fn get(&self, field: &str) -> Option<&str> {
        match field {
            "api_key" => self.api_key.as_deref(),
            "secret" => self.secret.as_deref(),
            "login" => self.login.as_deref(),
            "password" => self.password.as_deref(),
            "merchant_id" => self.merchant_id.as_deref(),
            "network" => self.network.map(|n| n.as_str()),
            "redirect_url" => self.redirect_url.as_deref(),
            "callback_url" => self.callback_url.as_deref(),
            "language" => self.language.as_deref(),
            _ => None,
        }
    }

    /// True when no field holds a non-blank value
    pub fn is_empty(&self) -> bool {
        Self::FIELDS
            .iter()
            .all(|field| self.get(field).map_or(true, |v| v.trim().is_empty()))
    }

    /// Unset every field that holds only whitespace
    pub fn clear_blank(&mut self) {
        for value in [
            &mut self.api_key,
            &mut self.secret,
            &mut self.login,
            &mut self.password,
            &mut self.merchant_id,
            &mut self.redirect_url,
            &mut self.callback_url,
            &mut self.language,
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *value = None;
            }
        }
    }
}

// Secrets never reach logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(v: &Option<String>) -> Option<&'static str> {
            v.as_ref().map(|_| "***")
        }
        f.debug_struct("Credentials")
            .field("api_key", &redact(&self.api_key))
            .field("secret", &redact(&self.secret))
            .field("login", &self.login)
            .field("password", &redact(&self.password))
            .field("merchant_id", &self.merchant_id)
            .field("network", &self.network)
            .field("redirect_url", &self.redirect_url)
            .field("callback_url", &self.callback_url)
            .field("language", &self.language)
            .finish()
    }
}

/// A named credential bundle for one configured gateway.
///
/// Serializes flat: `name` alongside the credential fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ProviderEntry", into = "ProviderEntry")]
pub struct Provider {
    /// Provider name, must match a registered adapter (e.g. "cryptobot")
    pub name: String,

    pub credentials: Credentials,
}

impl Provider {
    /// Create a provider with no credentials
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            credentials: Credentials::default(),
        }
    }

    /// Create a provider with the given credentials
    pub fn with_credentials(name: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            name: name.into(),
            credentials,
        }
    }

    /// True when the provider carries more than a bare name
    pub fn has_credentials(&self) -> bool {
        !self.credentials.is_empty()
    }

    /// Fetch a field the adapter cannot work without, or fail with
    /// `MissingCredential`. Empty strings count as absent.
    pub fn require(&self, field: &'static str) -> PaymentResult<&str> {
        self.credentials
            .get(field)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| PaymentError::MissingCredential {
                provider: self.name.clone(),
                field,
            })
    }
}

impl From<ProviderEntry> for Provider {
    fn from(entry: ProviderEntry) -> Self {
        Self {
            name: entry.name,
            credentials: Credentials {
                api_key: entry.api_key,
                secret: entry.secret,
                login: entry.login,
                password: entry.password,
                merchant_id: entry.merchant_id,
                network: entry.network,
                redirect_url: entry.redirect_url,
                callback_url: entry.callback_url,
                language: entry.language,
            },
        }
    }
}

impl From<Provider> for ProviderEntry {
    fn from(provider: Provider) -> Self {
        let c = provider.credentials;
        Self {
            name: provider.name,
            api_key: c.api_key,
            secret: c.secret,
            login: c.login,
            password: c.password,
            merchant_id: c.merchant_id,
            network: c.network,
            redirect_url: c.redirect_url,
            callback_url: c.callback_url,
            language: c.language,
        }
    }
}

/// Flat serialized form of a provider: `name` next to the credential fields.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProviderEntry {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    login: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    merchant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    network: Option<Network>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    redirect_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    callback_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language: Option<String>,
}

/// Registry of configured providers
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Provider>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a provider under its own name, replacing any earlier entry
    pub fn configure(&mut self, provider: Provider) {
        self.providers.insert(provider.name.clone(), provider);
    }

    /// Store a new provider built from a name and credentials
    pub fn configure_with(&mut self, name: impl Into<String>, credentials: Credentials) {
        self.configure(Provider::with_credentials(name, credentials));
    }

    /// Add a provider with builder pattern
    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.configure(provider);
        self
    }

    /// Get a provider by name
    pub fn get(&self, name: &str) -> Option<&Provider> {
        self.providers.get(name)
    }

    /// Get a provider by name or fail with `NotConfigured`
    pub fn resolve(&self, name: &str) -> PaymentResult<&Provider> {
        self.get(name).ok_or_else(|| PaymentError::NotConfigured {
            provider: name.to_string(),
        })
    }

    /// The provider used when a caller names none: the first (by name)
    /// carrying credentials
    pub fn default_provider(&self) -> Option<&Provider> {
        self.providers.values().find(|p| p.has_credentials())
    }

    /// Snapshot of all configured providers
    pub fn list(&self) -> Vec<&Provider> {
        self.providers.values().collect()
    }

    /// Get all provider names
    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }

    /// Check if a provider is configured
    pub fn has_provider(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Get number of providers
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl FromIterator<Provider> for ProviderRegistry {
    fn from_iter<I: IntoIterator<Item = Provider>>(iter: I) -> Self {
        let mut registry = Self::new();
        for provider in iter {
            registry.configure(provider);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = Provider::with_credentials(
            "cryptobot",
            Credentials::new()
                .with_api_key("token")
                .with_network(Network::Test),
        );

        assert_eq!(provider.name, "cryptobot");
        assert!(provider.has_credentials());
        assert_eq!(provider.credentials.network, Some(Network::Test));
        assert!(!Provider::new("aaio").has_credentials());
    }

    #[test]
    fn test_require_missing_field() {
        let provider = Provider::with_credentials("aaio", Credentials::new().with_api_key(""));

        let err = provider.require("api_key").unwrap_err();
        assert!(matches!(
            err,
            PaymentError::MissingCredential { field: "api_key", .. }
        ));
        assert!(provider.require("secret").is_err());
    }

    #[test]
    fn test_set_by_name() {
        let mut credentials = Credentials::new();
        credentials.set("login", "shop").unwrap();
        credentials.set("network", "testnet").unwrap();

        assert_eq!(credentials.login.as_deref(), Some("shop"));
        assert_eq!(credentials.network, Some(Network::Test));
        assert!(credentials.set("token", "x").is_err());
        assert!(credentials.set("network", "moon").is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let credentials = Credentials::new()
            .with_api_key("super-secret-key")
            .with_login("shop");
        let rendered = format!("{credentials:?}");

        assert!(!rendered.contains("super-secret-key"));
        assert!(rendered.contains("shop"));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let json = r#"{"name": "aaio", "api_key": "k", "colour": "blue"}"#;
        assert!(serde_json::from_str::<Provider>(json).is_err());

        let json = r#"{"name": "aaio", "api_key": "k", "network": "test"}"#;
        let provider: Provider = serde_json::from_str(json).unwrap();
        assert_eq!(provider.credentials.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_provider_registry() {
        let mut registry = ProviderRegistry::new();
        registry.configure(Provider::new("aaio"));
        registry.configure_with("cryptobot", Credentials::new().with_api_key("first"));
        registry.configure_with("cryptobot", Credentials::new().with_api_key("second"));

        assert_eq!(registry.len(), 2);
        assert!(registry.has_provider("aaio"));
        assert_eq!(
            registry.resolve("cryptobot").unwrap().credentials.api_key.as_deref(),
            Some("second")
        );
        assert!(matches!(
            registry.resolve("crystalpay"),
            Err(PaymentError::NotConfigured { .. })
        ));
        assert_eq!(registry.names(), vec!["aaio", "cryptobot"]);
    }

    #[test]
    fn test_default_provider_skips_bare_names() {
        let registry: ProviderRegistry = [
            Provider::new("aaio"),
            Provider::with_credentials("crystalpay", Credentials::new().with_login("l")),
            Provider::with_credentials("cryptobot", Credentials::new().with_api_key("k")),
        ]
        .into_iter()
        .collect();

        assert_eq!(registry.default_provider().unwrap().name, "crystalpay");

        let bare: ProviderRegistry = [Provider::new("aaio")].into_iter().collect();
        assert!(bare.default_provider().is_none());
    }

    #[test]
    fn test_default_provider_skips_blank_credentials() {
        let registry: ProviderRegistry = [
            Provider::with_credentials("aaa", Credentials::new().with_api_key("")),
            Provider::with_credentials("scripted", Credentials::new().with_api_key("k")),
        ]
        .into_iter()
        .collect();

        assert!(!registry.get("aaa").unwrap().has_credentials());
        assert_eq!(registry.default_provider().unwrap().name, "scripted");
    }
}
