//! # Gateway Adapters
//!
//! The polymorphism point between the invoice lifecycle and vendor APIs.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       AdapterResolver                        │
//! │   "cryptobot" ─┐   "crystalpay" ─┐   "aaio" ─┐               │
//! └────────────────┼─────────────────┼───────────┼───────────────┘
//!                  ▼                 ▼           ▼
//!          AdapterFactory::build(&Provider) → GatewayAdapter
//!                                               ├── create()
//!                                               └── check()
//! ```
//!
//! A new vendor is plugged in by implementing [`AdapterFactory`] and
//! [`GatewayAdapter`] and registering the factory once; `Invoice` and
//! `EasyPay` never branch on vendor names.

use crate::error::{PaymentError, PaymentResult};
use crate::provider::Provider;
use crate::status::InvoiceStatus;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

/// What a gateway hands back for a freshly created invoice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedInvoice {
    /// Vendor-assigned (or locally generated) invoice reference
    pub identifier: String,
    /// Payment target shown to the payer (usually a URL)
    pub pay_info: String,
    /// Vendor's "just created" status, normalized
    pub status: InvoiceStatus,
}

impl CreatedInvoice {
    pub fn new(identifier: impl Into<String>, pay_info: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            pay_info: pay_info.into(),
            status: InvoiceStatus::Pending,
        }
    }

    pub fn with_status(mut self, status: InvoiceStatus) -> Self {
        self.status = status;
        self
    }
}

/// Vendor-specific invoice operations.
///
/// Implementations own their HTTP client for the duration of a call and are
/// the only code that knows endpoint URLs, auth headers and field names.
#[async_trait]
pub trait GatewayAdapter: Send + Sync {
    /// Create a remote invoice.
    ///
    /// Must fail with `UnsupportedCurrency` before any network call when the
    /// vendor cannot service `currency`.
    async fn create(&self, amount: Decimal, currency: &str) -> PaymentResult<CreatedInvoice>;

    /// Poll the remote status of `identifier`.
    ///
    /// Idempotent. Fails with `GatewayTimeout` when the vendor is unreachable
    /// or slower than the bounded wait, `GatewayError` when it answers with a
    /// failure.
    async fn check(&self, identifier: &str) -> PaymentResult<InvoiceStatus>;

    /// Get the provider name (for logging).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a boxed gateway adapter (dynamic dispatch)
pub type BoxedGatewayAdapter = Arc<dyn GatewayAdapter>;

/// Builds a [`GatewayAdapter`] from a credential bundle.
pub trait AdapterFactory: Send + Sync {
    /// Name this factory is registered under
    fn provider_name(&self) -> &'static str;

    /// Validate the bundle and build an adapter.
    ///
    /// Fails with `MissingCredential` when a required field is absent.
    /// Performs no I/O.
    fn build(&self, provider: &Provider) -> PaymentResult<BoxedGatewayAdapter>;
}

/// Type alias for a shared adapter factory
pub type BoxedAdapterFactory = Arc<dyn AdapterFactory>;

/// Registration table from provider name to adapter factory
#[derive(Clone, Default)]
pub struct AdapterResolver {
    factories: HashMap<String, BoxedAdapterFactory>,
}

impl AdapterResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter factory, replacing any factory with the same name
    pub fn register(&mut self, factory: BoxedAdapterFactory) {
        let name = factory.provider_name().to_string();
        self.factories.insert(name, factory);
    }

    /// Register with builder pattern
    pub fn with_factory(mut self, factory: BoxedAdapterFactory) -> Self {
        self.register(factory);
        self
    }

    /// Get the factory for a provider or fail with `UnsupportedProvider`
    pub fn resolve(&self, provider: &str) -> PaymentResult<&BoxedAdapterFactory> {
        self.factories
            .get(provider)
            .ok_or_else(|| PaymentError::UnsupportedProvider {
                provider: provider.to_string(),
            })
    }

    /// Check if a provider is supported
    pub fn supports(&self, provider: &str) -> bool {
        self.factories.contains_key(provider)
    }

    /// List all supported providers, sorted
    pub fn providers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for AdapterResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterResolver")
            .field("providers", &self.providers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoAdapter;

    #[async_trait]
    impl GatewayAdapter for EchoAdapter {
        async fn create(&self, amount: Decimal, currency: &str) -> PaymentResult<CreatedInvoice> {
            Ok(CreatedInvoice::new(format!("{amount}-{currency}"), "https://pay.example"))
        }

        async fn check(&self, _identifier: &str) -> PaymentResult<InvoiceStatus> {
            Ok(InvoiceStatus::Pending)
        }

        fn provider_name(&self) -> &'static str {
            "echo"
        }
    }

    struct EchoFactory;

    impl AdapterFactory for EchoFactory {
        fn provider_name(&self) -> &'static str {
            "echo"
        }

        fn build(&self, provider: &Provider) -> PaymentResult<BoxedGatewayAdapter> {
            provider.require("api_key")?;
            Ok(Arc::new(EchoAdapter))
        }
    }

    #[test]
    fn test_empty_resolver() {
        let resolver = AdapterResolver::new();

        assert!(resolver.providers().is_empty());
        assert!(matches!(
            resolver.resolve("echo"),
            Err(PaymentError::UnsupportedProvider { .. })
        ));
    }

    #[tokio::test]
    async fn test_resolve_and_build() {
        let resolver = AdapterResolver::new().with_factory(Arc::new(EchoFactory));
        assert!(resolver.supports("echo"));
        assert_eq!(resolver.providers(), vec!["echo"]);

        let factory = resolver.resolve("echo").unwrap();
        let provider = Provider::with_credentials(
            "echo",
            crate::provider::Credentials::new().with_api_key("k"),
        );
        let adapter = factory.build(&provider).unwrap();
        let created = adapter.create(Decimal::new(25, 2), "TON").await.unwrap();

        assert_eq!(created.identifier, "0.25-TON");
        assert_eq!(created.status, InvoiceStatus::Pending);
    }

    #[test]
    fn test_build_checks_credentials() {
        let resolver = AdapterResolver::new().with_factory(Arc::new(EchoFactory));
        let err = resolver
            .resolve("echo")
            .unwrap()
            .build(&Provider::new("echo"))
            .err()
            .unwrap();

        assert!(matches!(err, PaymentError::MissingCredential { field: "api_key", .. }));
    }
}
