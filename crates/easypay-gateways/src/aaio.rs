//! # Aaio
//!
//! Aaio merchant payments. Aaio has no "create invoice" call: the order id
//! is generated locally and the pay page URL is signed with the merchant
//! secret. Status comes from `/api/info-pay`.

use crate::http::{GatewayClient, HttpSettings};
use async_trait::async_trait;
use easypay_core::{
    AdapterFactory, BoxedGatewayAdapter, CreatedInvoice, GatewayAdapter, InvoiceStatus,
    PaymentError, PaymentResult, Provider,
};
use reqwest::Url;
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

pub const PROVIDER: &str = "aaio";

pub const API_URL: &str = "https://aaio.so";

pub const SUPPORTED_CURRENCIES: &[&str] = &["RUB", "UAH", "EUR", "USD"];

const DEFAULT_LANGUAGE: &str = "en";
const PAYMENT_DESCRIPTION: &str = "AAIO Payment";

/// Map an Aaio payment status onto the normalized vocabulary.
///
/// `hold` means the money arrived and is being held by Aaio; for the
/// payer the invoice is settled.
pub fn normalize_status(status: &str) -> InvoiceStatus {
    match status {
        "success" | "hold" => InvoiceStatus::Paid,
        "expired" => InvoiceStatus::Expired,
        "in_process" => InvoiceStatus::Pending,
        other => InvoiceStatus::fold(other),
    }
}

/// Pay-page signature: sha256 of `merchant_id:amount:currency:secret:order_id`
pub fn sign(
    merchant_id: &str,
    amount: &str,
    currency: &str,
    secret: &str,
    order_id: &str,
) -> String {
    let payload = format!("{merchant_id}:{amount}:{currency}:{secret}:{order_id}");
    hex::encode(Sha256::digest(payload.as_bytes()))
}

/// Builds [`AaioAdapter`]s. Requires `api_key` and `secret`; `merchant_id`
/// falls back to `api_key`.
#[derive(Debug, Clone, Default)]
pub struct AaioFactory {
    settings: HttpSettings,
}

impl AaioFactory {
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

impl AdapterFactory for AaioFactory {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn build(&self, provider: &Provider) -> PaymentResult<BoxedGatewayAdapter> {
        let api_key = provider.require("api_key")?.to_string();
        let secret = provider.require("secret")?.to_string();
        let merchant_id = provider
            .credentials
            .merchant_id
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| api_key.clone());
        let language = provider
            .credentials
            .language
            .clone()
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        let http = self.settings.client(PROVIDER, self.settings.base_url(API_URL))?;

        Ok(Arc::new(AaioAdapter {
            api_key,
            secret,
            merchant_id,
            language,
            http,
        }))
    }
}

/// Aaio merchant adapter
pub struct AaioAdapter {
    api_key: String,
    secret: String,
    merchant_id: String,
    language: String,
    http: GatewayClient,
}

impl AaioAdapter {
    fn pay_url(&self, amount: &str, currency: &str, order_id: &str) -> PaymentResult<String> {
        let signature = sign(&self.merchant_id, amount, currency, &self.secret, order_id);
        let url = Url::parse_with_params(
            &format!("{}/merchant/pay", self.http.base_url()),
            &[
                ("merchant_id", self.merchant_id.as_str()),
                ("amount", amount),
                ("currency", currency),
                ("order_id", order_id),
                ("sign", signature.as_str()),
                ("desc", PAYMENT_DESCRIPTION),
                ("lang", self.language.as_str()),
            ],
        )
        .map_err(|e| PaymentError::Configuration(format!("invalid aaio base URL: {e}")))?;
        Ok(url.into())
    }
}

#[async_trait]
impl GatewayAdapter for AaioAdapter {
    #[instrument(skip(self))]
    async fn create(&self, amount: Decimal, currency: &str) -> PaymentResult<CreatedInvoice> {
        let currency = currency.to_ascii_uppercase();
        if !SUPPORTED_CURRENCIES.contains(&currency.as_str()) {
            return Err(PaymentError::UnsupportedCurrency {
                provider: PROVIDER.to_string(),
                currency,
            });
        }

        let order_id = Uuid::new_v4().to_string();
        let pay_url = self.pay_url(&amount.to_string(), &currency, &order_id)?;

        info!("Created Aaio payment: order_id={}", order_id);

        Ok(CreatedInvoice::new(order_id, pay_url))
    }

    #[instrument(skip(self))]
    async fn check(&self, identifier: &str) -> PaymentResult<InvoiceStatus> {
        let request = self
            .http
            .post("/api/info-pay")
            .header("Accept", "application/json")
            .header("X-Api-Key", &self.api_key)
            .form(&[
                ("merchant_id", self.merchant_id.as_str()),
                ("order_id", identifier),
            ]);

        let response = self.http.execute(request).await?;
        let info: PaymentInfo = response.json()?;

        if info.kind != "success" {
            return Err(PaymentError::GatewayError {
                provider: PROVIDER.to_string(),
                code: info.code.map(|c| match c {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                }),
                message: info.message.unwrap_or_else(|| format!("type {}", info.kind)),
            });
        }

        let status = info
            .status
            .ok_or_else(|| PaymentError::gateway(PROVIDER, "response has no status"))?;
        debug!("Aaio order {} status {}", identifier, status);
        Ok(normalize_status(&status))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// Aaio API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct PaymentInfo {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}
