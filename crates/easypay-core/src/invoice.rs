//! # Invoice
//!
//! The provider-agnostic invoice and its lifecycle.
//!
//! ```text
//! creating ──create()──▶ pending ──check()──▶ paid | expired
//!                          ▲  │
//!                          └──┘ check(), no change
//! ```
//!
//! An invoice can also be restored from an [`InvoiceRecord`] the caller
//! saved earlier; `check()` works on it straight away.

use crate::adapter::{AdapterResolver, BoxedGatewayAdapter};
use crate::error::{PaymentError, PaymentResult};
use crate::provider::ProviderRegistry;
use crate::status::InvoiceStatus;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Currency used when an invoice is created without one
pub const DEFAULT_CURRENCY: &str = "USD";

/// Everything needed to track an invoice across restarts.
///
/// easypay persists nothing; store this and hand it back to
/// `EasyPay::invoice` later.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay_info: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<InvoiceStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl InvoiceRecord {
    /// Record for an invoice already created at `provider`
    pub fn new(provider: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            provider: Some(provider.into()),
            identifier: Some(identifier.into()),
            ..Self::default()
        }
    }

    /// Record for an invoice still to be created
    pub fn draft(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount: Some(amount),
            currency: Some(currency.into()),
            ..Self::default()
        }
    }

    /// Builder: set provider
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Builder: set pay info
    pub fn with_pay_info(mut self, pay_info: impl Into<String>) -> Self {
        self.pay_info = Some(pay_info.into());
        self
    }

    /// Builder: set amount and currency
    pub fn with_amount(mut self, amount: Decimal, currency: impl Into<String>) -> Self {
        self.amount = Some(amount);
        self.currency = Some(currency.into());
        self
    }

    /// Builder: set last known status
    pub fn with_status(mut self, status: InvoiceStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// A payment invoice backed by one configured provider.
///
/// `create` and `check` take `&mut self`; calls on one invoice are
/// serialized by the borrow checker. Different invoices share nothing
/// mutable and can be polled concurrently.
pub struct Invoice {
    amount: Option<Decimal>,
    currency: String,
    provider: Option<String>,
    identifier: Option<String>,
    pay_info: Option<String>,
    status: InvoiceStatus,
    created_at: Option<DateTime<Utc>>,
    providers: Arc<ProviderRegistry>,
    resolver: Arc<AdapterResolver>,
    adapter: Option<BoxedGatewayAdapter>,
}

impl Invoice {
    /// A fresh invoice in `creating` state
    pub fn new(
        amount: Decimal,
        currency: impl Into<String>,
        providers: Arc<ProviderRegistry>,
        resolver: Arc<AdapterResolver>,
    ) -> Self {
        Self {
            amount: Some(amount),
            currency: currency.into(),
            provider: None,
            identifier: None,
            pay_info: None,
            status: InvoiceStatus::Creating,
            created_at: None,
            providers,
            resolver,
            adapter: None,
        }
    }

    /// Rebuild an invoice from a saved record without touching the gateway
    pub fn restore(
        record: InvoiceRecord,
        providers: Arc<ProviderRegistry>,
        resolver: Arc<AdapterResolver>,
    ) -> Self {
        let status = record.status.unwrap_or(if record.identifier.is_some() {
            InvoiceStatus::Pending
        } else {
            InvoiceStatus::Creating
        });

        Self {
            amount: record.amount,
            currency: record.currency.unwrap_or_default(),
            provider: record.provider.filter(|p| !p.is_empty()),
            identifier: record.identifier,
            pay_info: record.pay_info,
            status,
            created_at: record.created_at,
            providers,
            resolver,
            adapter: None,
        }
    }

    /// Create the invoice at a gateway.
    ///
    /// Only a `creating` invoice can be created. With no provider name,
    /// falls back to the first configured provider that carries credentials.
    /// All validation (provider lookup, credentials, currency) happens
    /// before the gateway is contacted.
    #[instrument(skip(self), fields(amount = ?self.amount, currency = %self.currency))]
    pub async fn create(&mut self, provider: Option<&str>) -> PaymentResult<&mut Self> {
        if self.identifier.is_some() || self.status != InvoiceStatus::Creating {
            return Err(PaymentError::InvalidRequest(format!(
                "invoice already created (status {})",
                self.status
            )));
        }

        let amount = self.amount.ok_or_else(|| {
            PaymentError::InvalidRequest("invoice amount is required to create it".to_string())
        })?;

        if self.currency.trim().is_empty() {
            warn!(
                "Currency was not provided for create, defaulting to {}",
                DEFAULT_CURRENCY
            );
            self.currency = DEFAULT_CURRENCY.to_string();
        }

        let name = self.select_provider(provider)?;
        let adapter = self.build_adapter(&name)?;

        let created = adapter.create(amount, &self.currency).await?;

        info!(
            "Created invoice: provider={}, identifier={}, status={}",
            name, created.identifier, created.status
        );

        self.identifier = Some(created.identifier);
        self.pay_info = Some(created.pay_info);
        self.status = created.status;
        self.created_at = Some(Utc::now());
        self.provider = Some(name);
        self.adapter = Some(adapter);

        Ok(self)
    }

    /// Poll the gateway and update `status`.
    ///
    /// Restored invoices build their adapter from the stored provider name
    /// on first use. Never modifies `identifier` or `pay_info`.
    #[instrument(skip(self), fields(provider = ?self.provider, identifier = ?self.identifier))]
    pub async fn check(&mut self) -> PaymentResult<InvoiceStatus> {
        let identifier = self.identifier.clone().ok_or(PaymentError::NotCreated)?;

        let adapter = match &self.adapter {
            Some(adapter) => Arc::clone(adapter),
            None => {
                let name = self.provider.clone().ok_or(PaymentError::ProviderRequired)?;
                let adapter = self.build_adapter(&name)?;
                self.adapter = Some(Arc::clone(&adapter));
                adapter
            }
        };

        let observed = adapter.check(&identifier).await?;

        if self.status.is_terminal() && observed != self.status {
            // Vendor is trusted: it may have corrected a payment by hand.
            warn!(
                "Gateway {} moved terminal invoice {} from {} to {}",
                adapter.provider_name(),
                identifier,
                self.status,
                observed
            );
        } else if observed != self.status {
            debug!("Invoice {} status {} -> {}", identifier, self.status, observed);
        }

        self.status = observed;
        Ok(observed)
    }

    /// Snapshot for persistence by the caller
    pub fn record(&self) -> InvoiceRecord {
        InvoiceRecord {
            provider: self.provider.clone(),
            identifier: self.identifier.clone(),
            pay_info: self.pay_info.clone(),
            amount: self.amount,
            currency: Some(self.currency.clone()).filter(|c| !c.is_empty()),
            status: Some(self.status),
            created_at: self.created_at,
        }
    }

    pub fn amount(&self) -> Option<Decimal> {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn pay_info(&self) -> Option<&str> {
        self.pay_info.as_deref()
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Check if the invoice reached `paid` or `expired`
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Pick the provider for `create`: the named one, or a default
    fn select_provider(&self, requested: Option<&str>) -> PaymentResult<String> {
        if let Some(name) = requested.map(str::trim).filter(|n| !n.is_empty()) {
            return Ok(name.to_string());
        }

        let fallback = self
            .providers
            .default_provider()
            .ok_or(PaymentError::ProviderRequired)?;

        warn!(
            "Provider was not provided for create, defaulting to {} since it was configured",
            fallback.name
        );
        Ok(fallback.name.clone())
    }

    fn build_adapter(&self, name: &str) -> PaymentResult<BoxedGatewayAdapter> {
        let factory = self.resolver.resolve(name)?;
        let provider = self.providers.resolve(name)?;
        factory.build(provider)
    }
}

impl fmt::Display for Invoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_none(v: &Option<String>) -> &str {
            v.as_deref().unwrap_or("none")
        }
        write!(
            f,
            "Invoice(provider={}, identifier={}, status={}, amount=",
            or_none(&self.provider),
            or_none(&self.identifier),
            self.status
        )?;
        match self.amount {
            Some(amount) => write!(f, "{} {}", amount, self.currency)?,
            None => f.write_str("none")?,
        }
        write!(f, ", pay_info={})", or_none(&self.pay_info))
    }
}

impl fmt::Debug for Invoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoice")
            .field("amount", &self.amount)
            .field("currency", &self.currency)
            .field("provider", &self.provider)
            .field("identifier", &self.identifier)
            .field("pay_info", &self.pay_info)
            .field("status", &self.status)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{AdapterFactory, CreatedInvoice, GatewayAdapter};
    use crate::provider::{Credentials, Provider};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted gateway: hands out queued statuses, repeats the last one.
    #[derive(Default)]
    struct Script {
        creates: AtomicUsize,
        checks: AtomicUsize,
        builds: AtomicUsize,
        statuses: Mutex<VecDeque<InvoiceStatus>>,
    }

    struct ScriptedAdapter(Arc<Script>);

    #[async_trait]
    impl GatewayAdapter for ScriptedAdapter {
        async fn create(&self, _amount: Decimal, currency: &str) -> PaymentResult<CreatedInvoice> {
            if currency == "XXX" {
                return Err(PaymentError::UnsupportedCurrency {
                    provider: "scripted".into(),
                    currency: currency.into(),
                });
            }
            self.0.creates.fetch_add(1, Ordering::SeqCst);
            Ok(CreatedInvoice::new("inv-1", "https://pay.example/inv-1"))
        }

        async fn check(&self, _identifier: &str) -> PaymentResult<InvoiceStatus> {
            self.0.checks.fetch_add(1, Ordering::SeqCst);
            let mut queue = self.0.statuses.lock().unwrap();
            let status = if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue.front().copied().unwrap_or(InvoiceStatus::Pending)
            };
            Ok(status)
        }

        fn provider_name(&self) -> &'static str {
            "scripted"
        }
    }

    struct ScriptedFactory(Arc<Script>);

    impl AdapterFactory for ScriptedFactory {
        fn provider_name(&self) -> &'static str {
            "scripted"
        }

        fn build(&self, provider: &Provider) -> PaymentResult<BoxedGatewayAdapter> {
            provider.require("api_key")?;
            self.0.builds.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(ScriptedAdapter(Arc::clone(&self.0))))
        }
    }

    fn setup(
        providers: Vec<Provider>,
        statuses: &[InvoiceStatus],
    ) -> (Arc<Script>, Arc<ProviderRegistry>, Arc<AdapterResolver>) {
        let script = Arc::new(Script::default());
        script.statuses.lock().unwrap().extend(statuses.iter().copied());
        let resolver =
            AdapterResolver::new().with_factory(Arc::new(ScriptedFactory(Arc::clone(&script))));
        (
            script,
            Arc::new(providers.into_iter().collect()),
            Arc::new(resolver),
        )
    }

    fn scripted_provider() -> Provider {
        Provider::with_credentials("scripted", Credentials::new().with_api_key("k"))
    }

    #[tokio::test]
    async fn test_check_before_create_fails() {
        let (script, providers, resolver) = setup(vec![scripted_provider()], &[]);
        let mut invoice = Invoice::new(Decimal::from(15), "RUB", providers, resolver);

        assert!(matches!(invoice.check().await, Err(PaymentError::NotCreated)));
        assert_eq!(script.checks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_create_then_poll_to_paid() {
        let (script, providers, resolver) = setup(
            vec![scripted_provider()],
            &[InvoiceStatus::Pending, InvoiceStatus::Paid],
        );
        let mut invoice = Invoice::new(Decimal::from(15), "RUB", providers, resolver);

        invoice.create(Some("scripted")).await.unwrap();
        assert_eq!(invoice.status(), InvoiceStatus::Pending);
        assert_eq!(invoice.identifier(), Some("inv-1"));
        assert_eq!(invoice.provider(), Some("scripted"));
        assert!(invoice.created_at().is_some());

        assert_eq!(invoice.check().await.unwrap(), InvoiceStatus::Pending);
        assert_eq!(invoice.check().await.unwrap(), InvoiceStatus::Paid);
        assert!(invoice.is_terminal());

        // adapter built once on create and reused by check
        assert_eq!(script.builds.load(Ordering::SeqCst), 1);
        assert_eq!(script.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_repeated_check_is_idempotent() {
        let (_script, providers, resolver) =
            setup(vec![scripted_provider()], &[InvoiceStatus::Pending]);
        let mut invoice = Invoice::new(Decimal::from(15), "RUB", providers, resolver);
        invoice.create(Some("scripted")).await.unwrap();

        for _ in 0..3 {
            assert_eq!(invoice.check().await.unwrap(), InvoiceStatus::Pending);
            assert_eq!(invoice.identifier(), Some("inv-1"));
            assert_eq!(invoice.pay_info(), Some("https://pay.example/inv-1"));
        }
    }

    #[tokio::test]
    async fn test_restored_invoice_checks_without_create() {
        let (script, providers, resolver) =
            setup(vec![scripted_provider()], &[InvoiceStatus::Paid]);
        let record = InvoiceRecord::new("scripted", "abc")
            .with_pay_info("url")
            .with_amount(Decimal::new(25, 2), "TON");
        let mut invoice = Invoice::restore(record, providers, resolver);

        assert_eq!(invoice.status(), InvoiceStatus::Pending);
        assert_eq!(invoice.check().await.unwrap(), InvoiceStatus::Paid);
        assert_eq!(invoice.identifier(), Some("abc"));
        assert_eq!(script.creates.load(Ordering::SeqCst), 0);
        assert_eq!(script.builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_restored_invoice_without_provider() {
        let (_script, providers, resolver) = setup(vec![scripted_provider()], &[]);
        let record = InvoiceRecord {
            identifier: Some("abc".into()),
            ..InvoiceRecord::default()
        };
        let mut invoice = Invoice::restore(record, providers, resolver);

        assert!(matches!(
            invoice.check().await,
            Err(PaymentError::ProviderRequired)
        ));
    }

    #[tokio::test]
    async fn test_create_defaults_to_configured_provider() {
        let (_script, providers, resolver) =
            setup(vec![Provider::new("aaio"), scripted_provider()], &[]);
        let mut invoice = Invoice::new(Decimal::from(15), "", providers, resolver);

        invoice.create(None).await.unwrap();
        assert_eq!(invoice.provider(), Some("scripted"));
        assert_eq!(invoice.currency(), DEFAULT_CURRENCY);
    }

    #[tokio::test]
    async fn test_blank_provider_is_not_a_default() {
        let blank = Provider::with_credentials("aaa", Credentials::new().with_api_key(""));
        let (_script, providers, resolver) = setup(vec![blank, scripted_provider()], &[]);
        let mut invoice = Invoice::new(Decimal::from(15), "RUB", providers, resolver);

        invoice.create(None).await.unwrap();
        assert_eq!(invoice.provider(), Some("scripted"));
    }

    #[tokio::test]
    async fn test_create_twice_is_rejected() {
        let (script, providers, resolver) = setup(vec![scripted_provider()], &[]);
        let mut invoice = Invoice::new(Decimal::from(15), "RUB", providers, resolver);
        invoice.create(Some("scripted")).await.unwrap();

        assert!(matches!(
            invoice.create(Some("scripted")).await,
            Err(PaymentError::InvalidRequest(_))
        ));
        assert_eq!(invoice.identifier(), Some("inv-1"));
        assert_eq!(script.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_restored_paid_invoice_cannot_be_recreated() {
        let (script, providers, resolver) = setup(vec![scripted_provider()], &[]);
        let record = InvoiceRecord::new("scripted", "abc").with_status(InvoiceStatus::Paid);
        let mut invoice = Invoice::restore(record, providers, resolver);

        assert!(matches!(
            invoice.create(Some("scripted")).await,
            Err(PaymentError::InvalidRequest(_))
        ));
        assert_eq!(invoice.identifier(), Some("abc"));
        assert_eq!(invoice.status(), InvoiceStatus::Paid);
        assert_eq!(script.creates.load(Ordering::SeqCst), 0);
        assert_eq!(script.builds.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_create_without_any_default() {
        let (script, providers, resolver) = setup(vec![Provider::new("scripted")], &[]);
        let mut invoice = Invoice::new(Decimal::from(15), "RUB", providers, resolver);

        assert!(matches!(
            invoice.create(Some("")).await,
            Err(PaymentError::ProviderRequired)
        ));
        assert_eq!(invoice.status(), InvoiceStatus::Creating);
        assert_eq!(script.builds.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_create_error_order() {
        let (script, providers, resolver) = setup(vec![Provider::new("scripted")], &[]);
        let mut invoice = Invoice::new(Decimal::from(15), "RUB", providers, resolver);

        assert!(matches!(
            invoice.create(Some("stripe")).await,
            Err(PaymentError::UnsupportedProvider { .. })
        ));
        assert!(matches!(
            invoice.create(Some("scripted")).await,
            Err(PaymentError::MissingCredential { field: "api_key", .. })
        ));
        assert_eq!(script.creates.load(Ordering::SeqCst), 0);

        let (_script, providers, resolver) = setup(vec![], &[]);
        let mut invoice = Invoice::new(Decimal::from(15), "RUB", providers, resolver);
        assert!(matches!(
            invoice.create(Some("scripted")).await,
            Err(PaymentError::NotConfigured { .. })
        ));
    }

    #[tokio::test]
    async fn test_unsupported_currency_leaves_invoice_untouched() {
        let (_script, providers, resolver) = setup(vec![scripted_provider()], &[]);
        let mut invoice = Invoice::new(Decimal::from(15), "XXX", providers, resolver);

        assert!(matches!(
            invoice.create(Some("scripted")).await,
            Err(PaymentError::UnsupportedCurrency { .. })
        ));
        assert!(invoice.identifier().is_none());
        assert!(invoice.provider().is_none());
    }

    #[tokio::test]
    async fn test_terminal_regression_is_applied() {
        let (_script, providers, resolver) =
            setup(vec![scripted_provider()], &[InvoiceStatus::Pending]);
        let record = InvoiceRecord::new("scripted", "abc").with_status(InvoiceStatus::Expired);
        let mut invoice = Invoice::restore(record, providers, resolver);

        assert_eq!(invoice.check().await.unwrap(), InvoiceStatus::Pending);
        assert_eq!(invoice.status(), InvoiceStatus::Pending);
    }

    #[tokio::test]
    async fn test_record_and_display() {
        let (_script, providers, resolver) = setup(vec![scripted_provider()], &[]);
        let mut invoice = Invoice::new(Decimal::new(25, 2), "TON", providers, resolver);
        invoice.create(Some("scripted")).await.unwrap();

        let record = invoice.record();
        assert_eq!(record.identifier.as_deref(), Some("inv-1"));
        assert_eq!(record.status, Some(InvoiceStatus::Pending));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["amount"], "0.25");
        assert_eq!(json["status"], "pending");

        assert_eq!(
            invoice.to_string(),
            concat!(
                "Invoice(provider=scripted, identifier=inv-1, status=pending, ",
                "amount=0.25 TON, pay_info=https://pay.example/inv-1)"
            )
        );
    }
}
