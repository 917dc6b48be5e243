//! # Wallet Bridge Runtime
//!
//! Starts a page, its relay and the development wallet background, injects
//! the page's provider and runs a short session against it.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging (`RUST_LOG`, default `info`)
//! 2. Load configuration (`WB_CONFIG` file, then environment)
//! 3. Start the background host and the relay
//! 4. Inject the provider
//! 5. Connect, sign a message, disconnect
//! 6. Wait for Ctrl+C

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use wallet_runtime::{BridgeConfig, WalletBridge};
use wb_01_provider::{ConnectOptions, EventKind, Provider, GLOBAL_PROVIDER};

async fn demo_session(provider: &Provider) -> Result<()> {
    provider.on(EventKind::AccountChanged, |event| {
        info!(event = %event.kind(), "Page saw account change");
    });

    let connected = provider
        .connect(ConnectOptions::default())
        .await
        .context("connect")?;
    info!(address = %connected.address, "Page connected");

    let signed = provider
        .sign_message(b"Sign in to dapp.example")
        .await
        .context("sign message")?;
    info!(
        address = %signed.address,
        signature = %hex::encode(&signed.signature),
        "Message signed"
    );

    provider.disconnect().await;
    info!("Page disconnected");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration
    let config = BridgeConfig::load().context("loading configuration")?;

    let bridge = WalletBridge::start(&config).context("starting bridge")?;
    let provider = GLOBAL_PROVIDER
        .install(bridge.attach_provider()?)
        .context("injecting provider")?;

    if let Err(e) = demo_session(provider).await {
        warn!(error = %e, "Demo session failed");
    }

    info!("Bridge is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    bridge.shutdown();
    Ok(())
}
