//! # EasyPay
//!
//! Top-level entry object: owns the provider registry and hands out invoices.

use crate::adapter::AdapterResolver;
use crate::error::{PaymentError, PaymentResult};
use crate::invoice::{Invoice, InvoiceRecord};
use crate::provider::{Credentials, Provider, ProviderRegistry};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};

/// Provider-agnostic invoice facade
#[derive(Debug, Clone)]
pub struct EasyPay {
    providers: Arc<ProviderRegistry>,
    resolver: Arc<AdapterResolver>,
}

impl EasyPay {
    /// Create a facade over the given providers.
    ///
    /// Fails with `ProviderRequired` when `providers` is empty.
    pub fn new(
        providers: impl IntoIterator<Item = Provider>,
        resolver: AdapterResolver,
    ) -> PaymentResult<Self> {
        let registry: ProviderRegistry = providers.into_iter().collect();
        if registry.is_empty() {
            return Err(PaymentError::ProviderRequired);
        }

        for provider in registry.list() {
            if !resolver.supports(&provider.name) {
                warn!(
                    "Provider {} is configured but no adapter supports it",
                    provider.name
                );
            }
        }
        debug!("EasyPay providers: {:?}", registry.names());

        Ok(Self {
            providers: Arc::new(registry),
            resolver: Arc::new(resolver),
        })
    }

    /// Store a provider under its own name, replacing any earlier entry.
    ///
    /// Invoices handed out before this call keep the registry they were
    /// created with.
    pub fn configure_provider(&mut self, provider: Provider) {
        Arc::make_mut(&mut self.providers).configure(provider);
    }

    /// Store a provider built from a name and credentials
    pub fn configure(&mut self, name: impl Into<String>, credentials: Credentials) {
        Arc::make_mut(&mut self.providers).configure_with(name, credentials);
    }

    /// Configured providers
    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Provider names an adapter is registered for
    pub fn supported_providers(&self) -> Vec<&str> {
        self.resolver.providers()
    }

    /// Build an invoice and create it at the gateway in one call
    pub async fn create_invoice(
        &self,
        amount: Decimal,
        currency: &str,
        provider: Option<&str>,
    ) -> PaymentResult<Invoice> {
        let mut invoice = Invoice::new(
            amount,
            currency,
            Arc::clone(&self.providers),
            Arc::clone(&self.resolver),
        );
        invoice.create(provider).await?;
        Ok(invoice)
    }

    /// Restore the record when it carries an identifier, create it otherwise
    pub async fn open_invoice(&self, record: InvoiceRecord) -> PaymentResult<Invoice> {
        if record.identifier.is_some() {
            return Ok(self.invoice(record));
        }

        let amount = record.amount.ok_or_else(|| {
            PaymentError::InvalidRequest(
                "amount is required when no identifier is given".to_string(),
            )
        })?;
        let currency = record.currency.unwrap_or_default();
        self.create_invoice(amount, &currency, record.provider.as_deref())
            .await
    }

    /// Rebuild an invoice from saved fields. No network call.
    pub fn invoice(&self, record: InvoiceRecord) -> Invoice {
        Invoice::restore(
            record,
            Arc::clone(&self.providers),
            Arc::clone(&self.resolver),
        )
    }
}
