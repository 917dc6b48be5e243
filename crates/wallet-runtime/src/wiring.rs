//! Bridge assembly.
//!
//! ```text
//!   PageWindow ──post──→ PageBus ──→ Relay ──privileged channel──→ BackgroundHost
//!       ↑                   │          │                               │
//!    Provider ←─────────────┘          └──←── StorageChange ←──── WalletCore
//! ```

use crate::adapters::{privileged_channel, ChannelBackground};
use crate::background::{BackgroundHost, DevWalletCore, WalletCore};
use crate::config::{BridgeConfig, ConfigError};
use shared_bus::{PageBus, PageWindow};
use shared_types::{Origin, OriginError, StorageChange};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;
use wb_01_provider::{Provider, ProviderConfig};
use wb_02_relay::Relay;

/// Queue depth of the privileged channel.
const PRIVILEGED_BUFFER: usize = 64;

/// Assembly errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Relay: {0}")]
    Relay(#[from] wb_02_relay::ConfigError),

    #[error("Provider: {0}")]
    Provider(#[from] wb_01_provider::ConfigError),

    #[error("Origin: {0}")]
    Origin(#[from] OriginError),
}

/// One page, its relay and a wallet background, running.
pub struct WalletBridge<C: WalletCore + 'static = DevWalletCore> {
    config: BridgeConfig,
    window: PageWindow,
    wallet: Arc<C>,
    relay: Relay,
    relay_task: JoinHandle<()>,
    host_task: JoinHandle<()>,
}

impl WalletBridge<DevWalletCore> {
    /// Start a bridge backed by the development wallet.
    pub fn start(config: &BridgeConfig) -> Result<Self, RuntimeError> {
        let wallet = Arc::new(DevWalletCore::new(&config.wallet)?);
        let changes = wallet.changes();
        Self::with_core(config, wallet, changes)
    }
}

impl<C: WalletCore + 'static> WalletBridge<C> {
    /// Start a bridge over any wallet core.
    ///
    /// `changes` is where the core publishes its storage changes. Must be
    /// called inside a Tokio runtime.
    pub fn with_core(
        config: &BridgeConfig,
        wallet: Arc<C>,
        changes: broadcast::Sender<StorageChange>,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;
        let origin = config.page_origin()?;

        let bus = Arc::new(PageBus::new());
        let window = bus.open_window(origin);

        // Background context
        let (requests, inbox) = privileged_channel(PRIVILEGED_BUFFER);
        let core: Arc<dyn WalletCore> = wallet.clone();
        let host_task = tokio::spawn(BackgroundHost::new(core).run(inbox));

        // Relay context
        let background = Arc::new(ChannelBackground::new(requests, changes));
        let relay = Relay::new(window.clone(), background, config.relay.clone())?;
        let relay_task = relay.start();

        info!(
            window = %window.id(),
            origin = %window.origin(),
            bus_capacity = bus.capacity(),
            "Wallet bridge started"
        );

        Ok(Self {
            config: config.clone(),
            window,
            wallet,
            relay,
            relay_task,
            host_task,
        })
    }

    /// Attach a provider to the page using the configured settings.
    pub fn attach_provider(&self) -> Result<Provider, RuntimeError> {
        self.attach_provider_with(self.config.provider.clone())
    }

    pub fn attach_provider_with(&self, config: ProviderConfig) -> Result<Provider, RuntimeError> {
        Ok(Provider::attach(self.window.clone(), config)?)
    }

    /// The page window.
    pub fn window(&self) -> &PageWindow {
        &self.window
    }

    /// Open another window on the same bus, e.g. an embedded frame.
    pub fn open_window(&self, origin: Origin) -> PageWindow {
        self.window.bus().open_window(origin)
    }

    pub fn wallet(&self) -> &Arc<C> {
        &self.wallet
    }

    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    /// Stop the relay and the background host.
    pub fn shutdown(self) {
        let bus = self.window.bus();
        info!(
            messages = bus.messages_posted(),
            listeners = bus.listener_count(),
            "Wallet bridge shutting down"
        );
        // Drop aborts both tasks
    }
}

impl<C: WalletCore + 'static> Drop for WalletBridge<C> {
    fn drop(&mut self) {
        self.relay_task.abort();
        self.host_task.abort();
    }
}
