//! # easypay-core
//!
//! Provider dispatch and invoice lifecycle for easypay.
//!
//! This crate provides:
//! - `Provider` and `ProviderRegistry` for named credential bundles
//! - `GatewayAdapter` / `AdapterFactory` traits for implementing gateways
//! - `AdapterResolver`, the name → factory registration table
//! - `Invoice` and `InvoiceRecord` for the invoice lifecycle and rehydration
//! - `EasyPay`, the top-level facade
//! - `PaymentError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use easypay_core::{Credentials, EasyPay, Provider};
//! use rust_decimal::Decimal;
//!
//! let cryptobot = Provider::with_credentials("cryptobot", Credentials::new().with_api_key(token));
//! let pay = EasyPay::new([cryptobot], resolver)?;
//!
//! let mut invoice = pay.create_invoice(Decimal::new(25, 2), "TON", Some("cryptobot")).await?;
//! // Send invoice.pay_info() to the payer, then poll
//! while !invoice.is_terminal() {
//!     tokio::time::sleep(Duration::from_secs(5)).await;
//!     invoice.check().await?;
//! }
//! ```

pub mod adapter;
pub mod error;
pub mod facade;
pub mod invoice;
pub mod provider;
pub mod status;

// Re-exports for convenience
pub use adapter::{
    AdapterFactory, AdapterResolver, BoxedAdapterFactory, BoxedGatewayAdapter, CreatedInvoice,
    GatewayAdapter,
};
pub use error::{PaymentError, PaymentResult};
pub use facade::EasyPay;
pub use invoice::{Invoice, InvoiceRecord, DEFAULT_CURRENCY};
pub use provider::{Credentials, Network, Provider, ProviderRegistry};
pub use status::InvoiceStatus;

pub use rust_decimal::Decimal;
