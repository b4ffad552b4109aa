//! fingergate
//!
//! Transparent TCP relay gated by JA4 TLS client fingerprints.
//!
//! This service:
//! - Accepts TCP connections on the configured listen address
//! - Dials the upstream target for each connection
//! - Peeks at the first TLS record without consuming it
//! - Computes the JA4 fingerprint of the ClientHello
//! - Relays admitted connections bidirectionally; drops the rest
//!
//! Non-TLS traffic is relayed without fingerprinting.

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fingergate_relay::config::Config;
use fingergate_relay::proxy::Relay;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    // Initialize tracing (prefer RUST_LOG, fallback to FINGERGATE_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting fingergate");
    info!(
        listen = %config.listen_addr,
        target = %config.target_addr,
        dial_timeout = ?config.dial_timeout,
        allowed_fingerprints = config.allow_ja4.len(),
        "Configuration loaded"
    );

    let relay = match Relay::bind(Arc::new(config)).await {
        Ok(relay) => relay,
        Err(e) => {
            error!(error = %e, "Failed to bind listener");
            return Err(e.into());
        }
    };

    Arc::new(relay).run().await?;
    Ok(())
}
