//! # easypay
//!
//! Create one invoice and poll it until it is paid or expired.
//!
//! ## Usage
//!
//! ```bash
//! # Credentials
//! export CRYSTALPAY_LOGIN=...
//! export CRYSTALPAY_SECRET=...
//!
//! # Invoice to create
//! export INVOICE_AMOUNT=15
//! export INVOICE_CURRENCY=RUB
//! export INVOICE_PROVIDER=crystalpay
//!
//! easypay
//! ```

use easypay::config::{load_providers, WatchConfig};
use easypay::{InvoiceStatus, BUILTIN_PROVIDERS};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    // load_providers reads .env before WatchConfig looks at the environment
    let providers = load_providers(&BUILTIN_PROVIDERS)?;
    let watch = WatchConfig::from_env()?;
    let pay = easypay::builtin(providers)?;

    info!("Payment providers: {:?}", pay.providers().names());
    info!("Supported gateways: {:?}", pay.supported_providers());

    let mut invoice = pay
        .create_invoice(watch.amount, &watch.currency, watch.provider.as_deref())
        .await?;

    info!("💳 Pay here: {}", invoice.pay_info().unwrap_or_default());
    println!("{invoice}");

    while !invoice.is_terminal() {
        tokio::time::sleep(watch.poll_interval).await;

        match invoice.check().await {
            Ok(_) => println!("{invoice}"),
            Err(e) if e.is_retryable() => {
                warn!("Check failed, will retry: {}", e);
            }
            Err(e) => {
                error!("Check failed: {}", e);
                return Err(e.into());
            }
        }
    }

    match invoice.status() {
        InvoiceStatus::Paid => info!("✅ Invoice paid"),
        status => info!("Invoice finished as {}", status),
    }

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  easypay
  ━━━━━━━━━━━━━━━━━━━━━━━
  One invoice API, many gateways
  Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
