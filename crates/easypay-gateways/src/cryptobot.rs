//! # CryptoBot
//!
//! Crypto Pay API (`@CryptoBot` on Telegram). Invoices are paid in crypto
//! assets through a bot link.

use crate::http::{GatewayClient, HttpSettings};
use async_trait::async_trait;
use easypay_core::{
    AdapterFactory, BoxedGatewayAdapter, CreatedInvoice, GatewayAdapter, InvoiceStatus, Network,
    PaymentError, PaymentResult, Provider,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

pub const PROVIDER: &str = "cryptobot";

pub const MAINNET_API_URL: &str = "https://pay.crypt.bot/api";
pub const TESTNET_API_URL: &str = "https://testnet-pay.crypt.bot/api";

/// Assets Crypto Pay accepts for invoices
pub const SUPPORTED_ASSETS: &[&str] = &["USDT", "TON", "BTC", "ETH", "LTC", "BNB", "TRX", "USDC"];

const TOKEN_HEADER: &str = "Crypto-Pay-API-Token";

/// Map a Crypto Pay invoice status onto the normalized vocabulary
pub fn normalize_status(status: &str) -> InvoiceStatus {
    match status {
        "paid" => InvoiceStatus::Paid,
        "expired" => InvoiceStatus::Expired,
        "active" => InvoiceStatus::Pending,
        other => InvoiceStatus::fold(other),
    }
}

/// Builds [`CryptoBotAdapter`]s. Requires `api_key`; `network` picks main
/// or test API.
#[derive(Debug, Clone, Default)]
pub struct CryptoBotFactory {
    settings: HttpSettings,
}

impl CryptoBotFactory {
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

impl AdapterFactory for CryptoBotFactory {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn build(&self, provider: &Provider) -> PaymentResult<BoxedGatewayAdapter> {
        let token = provider.require("api_key")?.to_string();
        let network = provider.credentials.network.unwrap_or_default();
        let default_url = match network {
            Network::Main => MAINNET_API_URL,
            Network::Test => TESTNET_API_URL,
        };
        let http = self.settings.client(PROVIDER, self.settings.base_url(default_url))?;

        debug!("Built CryptoBot adapter: network={}", network.as_str());
        Ok(Arc::new(CryptoBotAdapter { token, http }))
    }
}

/// Crypto Pay API adapter
pub struct CryptoBotAdapter {
    token: String,
    http: GatewayClient,
}

impl CryptoBotAdapter {
    fn into_result<T>(envelope: ApiResponse<T>) -> PaymentResult<T> {
        match envelope {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse {
                error: Some(err), ..
            } => Err(PaymentError::GatewayError {
                provider: PROVIDER.to_string(),
                code: Some(err.code.to_string()),
                message: err.name,
            }),
            _ => Err(PaymentError::gateway(PROVIDER, "response has no result")),
        }
    }
}

#[async_trait]
impl GatewayAdapter for CryptoBotAdapter {
    #[instrument(skip(self))]
    async fn create(&self, amount: Decimal, currency: &str) -> PaymentResult<CreatedInvoice> {
        let asset = currency.to_ascii_uppercase();
        if !SUPPORTED_ASSETS.contains(&asset.as_str()) {
            return Err(PaymentError::UnsupportedCurrency {
                provider: PROVIDER.to_string(),
                currency: currency.to_string(),
            });
        }

        let request = self
            .http
            .post("/createInvoice")
            .header(TOKEN_HEADER, &self.token)
            .json(&CreateInvoiceRequest {
                asset: &asset,
                amount: amount.to_string(),
            });

        let response = self.http.execute(request).await?;
        let invoice = Self::into_result(response.json::<ApiResponse<CryptoBotInvoice>>()?)?;

        let pay_info = invoice
            .bot_invoice_url
            .or(invoice.pay_url)
            .ok_or_else(|| PaymentError::gateway(PROVIDER, "invoice has no payment URL"))?;

        info!(
            "Created CryptoBot invoice: id={}, status={}",
            invoice.invoice_id, invoice.status
        );

        Ok(CreatedInvoice::new(invoice.invoice_id.to_string(), pay_info)
            .with_status(normalize_status(&invoice.status)))
    }

    #[instrument(skip(self))]
    async fn check(&self, identifier: &str) -> PaymentResult<InvoiceStatus> {
        let request = self
            .http
            .get("/getInvoices")
            .header(TOKEN_HEADER, &self.token)
            .query(&[("invoice_ids", identifier)]);

        let response = self.http.execute(request).await?;
        let page = Self::into_result(response.json::<ApiResponse<InvoicePage>>()?)?;

        let invoice = page
            .items
            .into_iter()
            .next()
            .ok_or_else(|| {
                PaymentError::gateway(PROVIDER, format!("invoice {identifier} not found"))
            })?;

        let status = normalize_status(&invoice.status);
        if status == InvoiceStatus::Paid {
            debug!("Invoice {} paid, releasing CryptoBot session", identifier);
        }
        Ok(status)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// Crypto Pay API Types
// =============================================================================

#[derive(Debug, Serialize)]
struct CreateInvoiceRequest<'a> {
    asset: &'a str,
    amount: String,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct InvoicePage {
    #[serde(default)]
    items: Vec<CryptoBotInvoice>,
}

#[derive(Debug, Deserialize)]
struct CryptoBotInvoice {
    invoice_id: i64,
    status: String,
    #[serde(default)]
    bot_invoice_url: Option<String>,
    #[serde(default)]
    pay_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use easypay_core::Credentials;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider() -> Provider {
        Provider::with_credentials(
            PROVIDER,
            Credentials::new()
                .with_api_key("test-token")
                .with_network(Network::Test),
        )
    }

    fn invoice_json(status: &str) -> serde_json::Value {
        json!({
            "invoice_id": 528890,
            "hash": "IVeqYHqdUf1l",
            "asset": "TON",
            "amount": "0.25",
            "bot_invoice_url": "https://t.me/CryptoTestnetBot?start=IVeqYHqdUf1l",
            "status": status
        })
    }

    #[test]
    fn test_normalize_status() {
        assert_eq!(normalize_status("active"), InvoiceStatus::Pending);
        assert_eq!(normalize_status("paid"), InvoiceStatus::Paid);
        assert_eq!(normalize_status("expired"), InvoiceStatus::Expired);
        assert_eq!(normalize_status("something_new"), InvoiceStatus::Pending);
    }

    #[test]
    fn test_build_requires_api_key() {
        let err = CryptoBotFactory::new()
            .build(&Provider::new(PROVIDER))
            .err()
            .unwrap();
        assert!(matches!(err, PaymentError::MissingCredential { field: "api_key", .. }));
    }

    #[tokio::test]
    async fn test_create_invoice() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/createInvoice"))
            .and(header(TOKEN_HEADER, "test-token"))
            .and(body_json(json!({"asset": "TON", "amount": "0.25"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": true, "result": invoice_json("active")})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let adapter = CryptoBotFactory::new()
            .with_api_base_url(mock_server.uri())
            .build(&provider())
            .unwrap();
        let created = adapter.create(Decimal::new(25, 2), "ton").await.unwrap();

        assert_eq!(created.identifier, "528890");
        assert_eq!(
            created.pay_info,
            "https://t.me/CryptoTestnetBot?start=IVeqYHqdUf1l"
        );
        assert_eq!(created.status, InvoiceStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_rejects_fiat_before_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let adapter = CryptoBotFactory::new()
            .with_api_base_url(mock_server.uri())
            .build(&provider())
            .unwrap();
        let err = adapter.create(Decimal::from(15), "RUB").await.unwrap_err();

        assert!(matches!(err, PaymentError::UnsupportedCurrency { .. }));
    }

    #[tokio::test]
    async fn test_check_invoice() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getInvoices"))
            .and(query_param("invoice_ids", "528890"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"ok": true, "result": {"items": [invoice_json("paid")]}}),
            ))
            .expect(2)
            .mount(&mock_server)
            .await;

        let adapter = CryptoBotFactory::new()
            .with_api_base_url(mock_server.uri())
            .build(&provider())
            .unwrap();

        assert_eq!(adapter.check("528890").await.unwrap(), InvoiceStatus::Paid);
        assert_eq!(adapter.check("528890").await.unwrap(), InvoiceStatus::Paid);
    }

    #[tokio::test]
    async fn test_vendor_error_is_preserved() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getInvoices"))
            .respond_with(ResponseTemplate::new(401).set_body_json(
                json!({"ok": false, "error": {"code": 401, "name": "UNAUTHORIZED"}}),
            ))
            .mount(&mock_server)
            .await;

        let adapter = CryptoBotFactory::new()
            .with_api_base_url(mock_server.uri())
            .build(&provider())
            .unwrap();

        match adapter.check("1").await.unwrap_err() {
            PaymentError::GatewayError { code, message, .. } => {
                assert_eq!(code.as_deref(), Some("401"));
                assert_eq!(message, "UNAUTHORIZED");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_invoice() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getInvoices"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": true, "result": {"items": []}})),
            )
            .mount(&mock_server)
            .await;

        let adapter = CryptoBotFactory::new()
            .with_api_base_url(mock_server.uri())
            .build(&provider())
            .unwrap();

        assert!(matches!(
            adapter.check("404").await,
            Err(PaymentError::GatewayError { .. })
        ));
    }
}
