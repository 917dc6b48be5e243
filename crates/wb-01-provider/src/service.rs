//! Provider service - the wallet API exposed to page code.
//!
//! Every operation becomes a correlated request on the page bus. The
//! provider keeps the connection state and cached address; it is the only
//! writer of either.

use crate::domain::config::{ConfigError, ProviderConfig};
use crate::domain::events::{EventChannel, EventKind, ListenerId, ProviderEvent};
use crate::domain::pending::{cleanup_task, CorrelationTable, PendingStats};
use crate::domain::state::{
    ConnectStart, ConnectingGuard, ConnectionState, StateSlot, Transition,
};
use crate::domain::transaction::{self, WireTransaction};
use crate::ipc::listener::PageListener;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_bus::PageWindow;
use shared_types::{
    AccountChangedData, BridgeError, ConnectParams, ConnectResult, DisconnectParams,
    MessageSignature, PushMessage, RequestKind, SendOptions, SendResult,
    SignAllTransactionsParams, SignAndSendParams, SignMessageParams, SignTransactionParams,
    SignedTransaction, SignedTransactions,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Options for [`Provider::connect`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Only connect if the site is already trusted; never prompt.
    pub only_if_trusted: bool,
}

/// A signed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedMessage {
    pub signature: Vec<u8>,
    pub address: String,
}

/// State shared by the provider API and its page listener.
pub(crate) struct ProviderInner {
    pub(crate) table: Arc<CorrelationTable>,
    pub(crate) state: StateSlot,
    pub(crate) events: EventChannel,
}

impl ProviderInner {
    /// Send a typed request and decode the typed reply.
    async fn request<P, R>(&self, kind: RequestKind, params: &P) -> Result<R, BridgeError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let data = serde_json::to_value(params)
            .map_err(|e| BridgeError::Malformed(format!("{kind} request data: {e}")))?;
        let payload = self.table.send(kind, data).await?;
        serde_json::from_value(payload).map_err(|e| {
            warn!(kind = %kind, error = %e, "Response payload does not match schema");
            BridgeError::Malformed(format!("{kind} response payload: {e}"))
        })
    }

    /// Apply a push from the relay.
    pub(crate) fn apply_push(&self, push: PushMessage) {
        match push {
            PushMessage::Disconnected => {
                if self.state.disconnect() == Transition::Changed {
                    info!("Wallet ended the connection");
                    self.events.emit(&ProviderEvent::Disconnect);
                }
            }
            PushMessage::AccountChanged(AccountChangedData { address }) => {
                if self.state.change_account(&address) == Transition::Changed {
                    info!(address = %address, "Wallet account changed");
                    self.events.emit(&ProviderEvent::AccountChanged { address });
                } else {
                    debug!(address = %address, "Account push ignored");
                }
            }
        }
    }
}

/// The injected wallet provider of one page.
pub struct Provider {
    inner: Arc<ProviderInner>,
    listener_task: JoinHandle<()>,
    sweep_task: JoinHandle<()>,
}

impl Provider {
    /// Attach a provider to a page window.
    ///
    /// Spawns the page listener and the pending-entry sweep, so this must be
    /// called inside a Tokio runtime.
    pub fn attach(window: PageWindow, config: ProviderConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        // Subscribe before anything is posted so no response can be missed
        let subscription = window.subscribe();
        let window_id = window.id();

        let table = Arc::new(CorrelationTable::new(Arc::new(window), &config));
        let inner = Arc::new(ProviderInner {
            table: Arc::clone(&table),
            state: StateSlot::new(),
            events: EventChannel::new(),
        });

        let listener = PageListener::new(Arc::clone(&inner), subscription, window_id);
        let listener_task = tokio::spawn(listener.run());
        let sweep_task = tokio::spawn(cleanup_task(table, config.sweep_interval()));

        info!(
            window = %window_id,
            timeout_ms = config.request_timeout_ms,
            "Provider attached"
        );

        Ok(Self {
            inner,
            listener_task,
            sweep_task,
        })
    }

    /// Ask the wallet to connect this page.
    ///
    /// Resolves at once with the cached address if already connected, and
    /// fails at once with `AlreadyPending` if a connect is in flight.
    pub async fn connect(&self, options: ConnectOptions) -> Result<ConnectResult, BridgeError> {
        let attempt = match self.inner.state.begin_connect() {
            ConnectStart::AlreadyPending => return Err(BridgeError::AlreadyPending),
            ConnectStart::Connected(address) => return Ok(ConnectResult { address }),
            ConnectStart::Started(attempt) => attempt,
        };
        let mut guard = ConnectingGuard::new(&self.inner.state, attempt);

        let params = ConnectParams {
            only_if_trusted: options.only_if_trusted,
        };
        let result: ConnectResult = self.inner.request(RequestKind::Connect, &params).await?;

        if result.address.is_empty() {
            return Err(BridgeError::Malformed(
                "CONNECT response carried an empty address".into(),
            ));
        }
        if !self.inner.state.complete_connect(attempt, &result.address) {
            return Err(BridgeError::Rejected(
                "connection torn down while pending".into(),
            ));
        }
        guard.disarm();

        info!(address = %result.address, "Wallet connected");
        self.inner.events.emit(&ProviderEvent::Connect {
            address: result.address.clone(),
        });
        Ok(result)
    }

    /// Disconnect from the wallet.
    ///
    /// The provider ends `Disconnected` whatever happens to the request.
    pub async fn disconnect(&self) {
        if self.inner.state.disconnect() == Transition::Unchanged {
            return;
        }
        info!("Wallet disconnected");
        self.inner.events.emit(&ProviderEvent::Disconnect);

        if let Err(e) = self
            .inner
            .request::<_, serde_json::Value>(RequestKind::Disconnect, &DisconnectParams {})
            .await
        {
            warn!(error = %e, "Disconnect request failed");
        }
    }

    /// Sign one transaction.
    pub async fn sign_transaction<T: WireTransaction>(&self, tx: &T) -> Result<T, BridgeError> {
        self.require_connected()?;
        let params = SignTransactionParams {
            transaction: transaction::encode(tx),
        };
        let signed: SignedTransaction = self
            .inner
            .request(RequestKind::SignTransaction, &params)
            .await?;
        Ok(transaction::decode(&signed.transaction)?)
    }

    /// Sign several transactions in one approval.
    pub async fn sign_all_transactions<T: WireTransaction>(
        &self,
        txs: &[T],
    ) -> Result<Vec<T>, BridgeError> {
        self.require_connected()?;
        let params = SignAllTransactionsParams {
            transactions: txs.iter().map(transaction::encode).collect(),
        };
        let signed: SignedTransactions = self
            .inner
            .request(RequestKind::SignAllTransactions, &params)
            .await?;

        if signed.transactions.len() != txs.len() {
            return Err(BridgeError::Malformed(format!(
                "expected {} signed transactions, got {}",
                txs.len(),
                signed.transactions.len()
            )));
        }
        signed
            .transactions
            .iter()
            .map(|encoded| transaction::decode(encoded).map_err(BridgeError::from))
            .collect()
    }

    /// Sign an arbitrary message.
    pub async fn sign_message(&self, message: &[u8]) -> Result<SignedMessage, BridgeError> {
        self.require_connected()?;
        let params = SignMessageParams {
            message: hex::encode(message),
        };
        let reply: MessageSignature = self.inner.request(RequestKind::SignMessage, &params).await?;
        let signature = hex::decode(&reply.signature)
            .map_err(|e| BridgeError::Malformed(format!("signature is not hex: {e}")))?;

        Ok(SignedMessage {
            signature,
            address: reply.address,
        })
    }

    /// Sign a transaction and have the wallet submit it.
    pub async fn sign_and_send_transaction<T: WireTransaction>(
        &self,
        tx: &T,
        options: Option<SendOptions>,
    ) -> Result<SendResult, BridgeError> {
        self.require_connected()?;
        let params = SignAndSendParams {
            transaction: transaction::encode(tx),
            options: options.unwrap_or_default(),
        };
        self.inner
            .request(RequestKind::SignAndSendTransaction, &params)
            .await
    }

    /// Register an event handler.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> ListenerId
    where
        F: Fn(&ProviderEvent) + Send + Sync + 'static,
    {
        self.inner.events.on(kind, handler)
    }

    /// Remove an event handler.
    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        self.inner.events.off(kind, id)
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.get().is_connected()
    }

    /// Cached wallet address while connected
    pub fn public_key(&self) -> Option<String> {
        self.inner.state.get().address().map(str::to_owned)
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state.get()
    }

    /// Number of requests awaiting a response
    pub fn pending_requests(&self) -> usize {
        self.inner.table.pending_count()
    }

    pub fn pending_stats(&self) -> &PendingStats {
        self.inner.table.stats()
    }

    fn require_connected(&self) -> Result<(), BridgeError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(BridgeError::NotConnected)
        }
    }
}

impl Drop for Provider {
    fn drop(&mut self) {
        self.listener_task.abort();
        self.sweep_task.abort();
    }
}
