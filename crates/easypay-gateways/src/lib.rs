//! # easypay-gateways
//!
//! Gateway adapters for easypay.
//!
//! | Provider | Required credentials | Currencies |
//! |----------|----------------------|------------|
//! | `cryptobot` | `api_key` (+ optional `network`) | crypto assets |
//! | `crystalpay` | `login`, `secret` | fiat + crypto |
//! | `aaio` | `api_key`, `secret` (+ optional `merchant_id`, `language`) | RUB, UAH, EUR, USD |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use easypay_core::{Credentials, EasyPay, Provider};
//! use easypay_gateways::builtin_resolver;
//!
//! let pay = EasyPay::new(
//!     [Provider::with_credentials(
//!         "crystalpay",
//!         Credentials::new().with_login(login).with_secret(secret),
//!     )],
//!     builtin_resolver(),
//! )?;
//! let invoice = pay.create_invoice(15.into(), "RUB", Some("crystalpay")).await?;
//! ```
//!
//! ## Adding a gateway
//!
//! Implement `AdapterFactory` + `GatewayAdapter` in a new module and
//! register the factory in [`builtin_resolver`].

pub mod aaio;
pub mod cryptobot;
pub mod crystalpay;
pub mod http;

use easypay_core::AdapterResolver;
use std::sync::Arc;

// Re-exports
pub use aaio::{AaioAdapter, AaioFactory};
pub use cryptobot::{CryptoBotAdapter, CryptoBotFactory};
pub use crystalpay::{CrystalPayAdapter, CrystalPayFactory};
pub use http::{HttpSettings, DEFAULT_TIMEOUT};

/// Names every built-in gateway registers under
pub const BUILTIN_PROVIDERS: [&str; 3] =
    [aaio::PROVIDER, cryptobot::PROVIDER, crystalpay::PROVIDER];

/// Resolver with every built-in gateway registered under its default settings
pub fn builtin_resolver() -> AdapterResolver {
    resolver_with(HttpSettings::default())
}

/// Resolver with every built-in gateway sharing `settings`
pub fn resolver_with(settings: HttpSettings) -> AdapterResolver {
    AdapterResolver::new()
        .with_factory(Arc::new(CryptoBotFactory::with_settings(settings.clone())))
        .with_factory(Arc::new(CrystalPayFactory::with_settings(settings.clone())))
        .with_factory(Arc::new(AaioFactory::with_settings(settings)))
}
