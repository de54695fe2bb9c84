//! # Payment Error Types
//!
//! Typed error handling for the easypay invoice layer.
//! All provider, adapter and invoice operations return `Result<T, PaymentError>`.

use std::time::Duration;
use thiserror::Error;

/// Core error type for all invoice operations
#[derive(Debug, Error)]
pub enum PaymentError {
    /// No provider was named and none could be defaulted
    #[error("Provider required: configure at least one provider or name one explicitly")]
    ProviderRequired,

    /// Provider name is supported but was never configured
    #[error("Provider {provider} was not configured, add it first")]
    NotConfigured { provider: String },

    /// No adapter is registered under this provider name
    #[error("Provider {provider} is not supported")]
    UnsupportedProvider { provider: String },

    /// A credential field the adapter needs is absent from the bundle
    #[error("{field} is required for {provider} provider")]
    MissingCredential {
        provider: String,
        field: &'static str,
    },

    /// Currency not serviceable by this gateway
    #[error("Unsupported currency for {provider}: {currency}")]
    UnsupportedCurrency { provider: String, currency: String },

    /// Gateway unreachable or slower than the bounded wait
    #[error("Gateway {provider} did not respond within {}s: {message}", .timeout.as_secs_f64())]
    GatewayTimeout {
        provider: String,
        timeout: Duration,
        message: String,
    },

    /// Gateway responded with a failure or a malformed body
    #[error("Gateway error [{provider}]{}: {message}", code_suffix(.code))]
    GatewayError {
        provider: String,
        code: Option<String>,
        message: String,
    },

    /// `check` called before `create` or rehydration
    #[error("Invoice has no identifier, create it first or restore it from a record")]
    NotCreated,

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration errors (unreadable files, malformed values)
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl PaymentError {
    /// Returns true if this error is retryable.
    ///
    /// Only transport-level failures qualify; a gateway that answered with a
    /// failure will answer the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentError::GatewayTimeout { .. })
    }

    /// Returns true for errors raised before any network I/O is attempted
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PaymentError::ProviderRequired
                | PaymentError::NotConfigured { .. }
                | PaymentError::UnsupportedProvider { .. }
                | PaymentError::MissingCredential { .. }
                | PaymentError::Configuration(_)
        )
    }

    /// Shorthand for a gateway failure without a vendor error code
    pub fn gateway(provider: impl Into<String>, message: impl Into<String>) -> Self {
        PaymentError::GatewayError {
            provider: provider.into(),
            code: None,
            message: message.into(),
        }
    }
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_ref().map(|c| format!(" ({c})")).unwrap_or_default()
}

/// Result type alias for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;
