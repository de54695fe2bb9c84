//! # Gateway HTTP Plumbing
//!
//! Shared HTTP client setup for every adapter: one bounded timeout per
//! outbound call, and the split between "gateway unreachable or slow"
//! (`GatewayTimeout`) and "gateway answered with a failure" (`GatewayError`).

use easypay_core::{PaymentError, PaymentResult};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error};

/// Bounded wait for a single outbound gateway call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-factory HTTP settings
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Timeout applied to every request (connect + response body)
    pub timeout: Duration,

    /// API base URL override (for testing/mocking)
    pub api_base_url: Option<String>,
}

impl HttpSettings {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            api_base_url: None,
        }
    }

    /// Builder: set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// The override if set, `default` otherwise; no trailing slash
    pub fn base_url(&self, default: &str) -> String {
        self.api_base_url
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }

    /// Build a client for `provider` rooted at `base_url`
    pub(crate) fn client(
        &self,
        provider: &'static str,
        base_url: String,
    ) -> PaymentResult<GatewayClient> {
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| {
                PaymentError::Configuration(format!("failed to create HTTP client: {e}"))
            })?;

        Ok(GatewayClient {
            provider,
            client,
            timeout: self.timeout,
            base_url,
        })
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP client bound to one gateway
#[derive(Debug, Clone)]
pub(crate) struct GatewayClient {
    provider: &'static str,
    client: Client,
    timeout: Duration,
    base_url: String,
}

impl GatewayClient {
    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(format!("{}{}", self.base_url, path))
    }

    pub(crate) fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(format!("{}{}", self.base_url, path))
    }

    /// Send a request and read the whole body
    pub(crate) async fn execute(&self, request: RequestBuilder) -> PaymentResult<VendorResponse> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        debug!(
            "{} responded: status={}, {} bytes",
            self.provider,
            status,
            body.len()
        );

        Ok(VendorResponse {
            provider: self.provider,
            status,
            body,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> PaymentError {
        if err.is_timeout() || err.is_connect() {
            error!("{} unreachable: {}", self.provider, err);
            PaymentError::GatewayTimeout {
                provider: self.provider.to_string(),
                timeout: self.timeout,
                message: err.to_string(),
            }
        } else {
            error!("{} request failed: {}", self.provider, err);
            PaymentError::gateway(self.provider, err.to_string())
        }
    }
}

/// Raw gateway answer
#[derive(Debug)]
pub(crate) struct VendorResponse {
    provider: &'static str,
    pub status: StatusCode,
    pub body: String,
}

impl VendorResponse {
    /// Parse the body regardless of HTTP status; vendors put error
    /// envelopes in 4xx bodies.
    pub(crate) fn json<T: DeserializeOwned>(&self) -> PaymentResult<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            error!(
                "{} API error: status={}, body={}",
                self.provider, self.status, self.body
            );
            PaymentError::GatewayError {
                provider: self.provider.to_string(),
                code: Some(self.status.as_u16().to_string()),
                message: format!("malformed response: {e}"),
            }
        })
    }
}
