//! # easypay
//!
//! One invoice API over several payment gateways.
//!
//! This crate provides:
//! - Everything from `easypay-core` (facade, invoices, providers, errors)
//! - The built-in gateway adapters from `easypay-gateways`
//! - [`builtin`], a facade wired to every built-in gateway
//! - [`config`], provider loading from the environment and `config/providers.toml`
//!
//! ## Gateways
//!
//! | Provider | Credentials | Env example |
//! |----------|-------------|-------------|
//! | `cryptobot` | `api_key`, `network` | `CRYPTOBOT_API_KEY` |
//! | `crystalpay` | `login`, `secret` | `CRYSTALPAY_LOGIN` |
//! | `aaio` | `api_key`, `secret` | `AAIO_SECRET` |
//!
//! ## Example
//!
//! ```rust,ignore
//! let providers = easypay::config::load_providers(&easypay::BUILTIN_PROVIDERS)?;
//! let pay = easypay::builtin(providers)?;
//!
//! let mut invoice = pay.create_invoice(Decimal::from(15), "RUB", Some("crystalpay")).await?;
//! println!("{}", invoice.pay_info().unwrap_or_default());
//! invoice.check().await?;
//! ```

pub mod config;

pub use easypay_core::*;
pub use easypay_gateways as gateways;
pub use easypay_gateways::{builtin_resolver, resolver_with, HttpSettings, BUILTIN_PROVIDERS};

/// Facade over `providers` with every built-in gateway registered
pub fn builtin(providers: impl IntoIterator<Item = Provider>) -> PaymentResult<EasyPay> {
    EasyPay::new(providers, builtin_resolver())
}
