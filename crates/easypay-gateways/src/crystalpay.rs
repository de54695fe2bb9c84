//! # CrystalPay
//!
//! CrystalPay v2 invoices (`/invoice/create/`, `/invoice/info/`).
//! Authenticated with the cash register login and secret in every body.

use crate::http::{GatewayClient, HttpSettings};
use async_trait::async_trait;
use easypay_core::{
    AdapterFactory, BoxedGatewayAdapter, CreatedInvoice, GatewayAdapter, InvoiceStatus,
    PaymentError, PaymentResult, Provider,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

pub const PROVIDER: &str = "crystalpay";

pub const API_URL: &str = "https://api.crystalpay.io/v2";

/// Invoice lifetime in minutes
pub const INVOICE_LIFETIME_MINUTES: u32 = 60;

/// Currencies an invoice amount may be denominated in
pub const SUPPORTED_CURRENCIES: &[&str] = &[
    "RUB", "USD", "EUR", "UAH", "KZT", "BYN", "USDT", "BTC", "ETH", "LTC", "TON", "TRX",
];

/// Map a CrystalPay invoice state onto the normalized vocabulary
pub fn normalize_status(state: &str) -> InvoiceStatus {
    match state {
        "payed" => InvoiceStatus::Paid,
        "expired" => InvoiceStatus::Expired,
        "notpayed" | "processing" | "wrongamount" => InvoiceStatus::Pending,
        other => InvoiceStatus::fold(other),
    }
}

/// Builds [`CrystalPayAdapter`]s. Requires `login` and `secret`.
#[derive(Debug, Clone, Default)]
pub struct CrystalPayFactory {
    settings: HttpSettings,
}

impl CrystalPayFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: HttpSettings) -> Self {
        Self { settings }
    }

    /// Builder: set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.settings = self.settings.with_timeout(timeout);
        self
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.settings = self.settings.with_api_base_url(url);
        self
    }
}

impl AdapterFactory for CrystalPayFactory {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn build(&self, provider: &Provider) -> PaymentResult<BoxedGatewayAdapter> {
        let login = provider.require("login")?.to_string();
        let secret = provider.require("secret")?.to_string();
        let http = self.settings.client(PROVIDER, self.settings.base_url(API_URL))?;

        Ok(Arc::new(CrystalPayAdapter {
            login,
            secret,
            redirect_url: provider.credentials.redirect_url.clone(),
            callback_url: provider.credentials.callback_url.clone(),
            http,
        }))
    }
}

/// CrystalPay v2 adapter
pub struct CrystalPayAdapter {
    login: String,
    secret: String,
    redirect_url: Option<String>,
    callback_url: Option<String>,
    http: GatewayClient,
}

impl CrystalPayAdapter {
    fn ensure_ok(error: bool, errors: &[String]) -> PaymentResult<()> {
        if error {
            let message = if errors.is_empty() {
                "request rejected".to_string()
            } else {
                errors.join("; ")
            };
            return Err(PaymentError::gateway(PROVIDER, message));
        }
        Ok(())
    }
}

#[async_trait]
impl GatewayAdapter for CrystalPayAdapter {
    #[instrument(skip(self))]
    async fn create(&self, amount: Decimal, currency: &str) -> PaymentResult<CreatedInvoice> {
        let currency = currency.to_ascii_uppercase();
        if !SUPPORTED_CURRENCIES.contains(&currency.as_str()) {
            return Err(PaymentError::UnsupportedCurrency {
                provider: PROVIDER.to_string(),
                currency,
            });
        }

        let request = self.http.post("/invoice/create/").json(&CreateInvoiceRequest {
            auth_login: &self.login,
            auth_secret: &self.secret,
            amount: amount.to_string(),
            invoice_type: "purchase",
            lifetime: INVOICE_LIFETIME_MINUTES,
            amount_currency: &currency,
            redirect_url: self.redirect_url.as_deref(),
            callback_url: self.callback_url.as_deref(),
        });

        let response = self.http.execute(request).await?;
        let created: CreateInvoiceResponse = response.json()?;
        Self::ensure_ok(created.error, &created.errors)?;

        let (id, url) = created
            .id
            .zip(created.url)
            .ok_or_else(|| PaymentError::gateway(PROVIDER, "response has no id or url"))?;

        info!("Created CrystalPay invoice: id={}", id);

        Ok(CreatedInvoice::new(id, url))
    }

    #[instrument(skip(self))]
    async fn check(&self, identifier: &str) -> PaymentResult<InvoiceStatus> {
        let request = self.http.post("/invoice/info/").json(&InvoiceInfoRequest {
            auth_login: &self.login,
            auth_secret: &self.secret,
            id: identifier,
        });

        let response = self.http.execute(request).await?;
        let info: InvoiceInfoResponse = response.json()?;
        Self::ensure_ok(info.error, &info.errors)?;

        let state = info
            .state
            .ok_or_else(|| PaymentError::gateway(PROVIDER, "response has no state"))?;
        Ok(normalize_status(&state))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// CrystalPay API Types
// =============================================================================

#[derive(Debug, Serialize)]
struct CreateInvoiceRequest<'a> {
    auth_login: &'a str,
    auth_secret: &'a str,
    amount: String,
    #[serde(rename = "type")]
    invoice_type: &'static str,
    lifetime: u32,
    amount_currency: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_url: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct InvoiceInfoRequest<'a> {
    auth_login: &'a str,
    auth_secret: &'a str,
    id: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateInvoiceResponse {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    errors: Vec<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InvoiceInfoResponse {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    errors: Vec<String>,
    #[serde(default)]
    state: Option<String>,
}
