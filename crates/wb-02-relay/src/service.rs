//! Relay service - the only bridge between the page and the background.
//!
//! Every accepted page request runs on its own task, so a consent prompt
//! left open never holds up signing calls. Each task ends by posting exactly
//! one response carrying the request's correlation id, within one
//! `background_timeout` budget for all of its wallet calls.

use crate::domain::config::{ConfigError, RelayConfig};
use crate::domain::policy::{self, ConnectDecision};
use crate::domain::push;
use crate::domain::validation::{validate, PageRequest, ValidatedRequest};
use crate::ports::background::BackgroundPort;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_bus::{MessagePoster, PageWindow, WindowMessage, WindowSubscription};
use shared_types::{
    BackgroundRequest, BridgeError, ConnectParams, ConnectResult, CorrelationId, MessageClass,
    MessageSignature, Origin, PushMessage, SendResult, SessionFlags, SignedTransaction,
    SignedTransactions, StorageChange, WireResponse,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Our page's connection as the relay sees it.
#[derive(Debug, Default)]
struct PageLink {
    connected: bool,
    /// Bumped on every teardown; a connect only lands in the generation it began in
    generation: u64,
}

impl PageLink {
    /// End the connection. Returns whether one was live.
    fn tear_down(&mut self) -> bool {
        self.generation += 1;
        std::mem::replace(&mut self.connected, false)
    }
}

/// Shared relay state.
struct RelayContext {
    window: PageWindow,
    background: Arc<dyn BackgroundPort>,
    config: RelayConfig,
    link: Mutex<PageLink>,
}

/// Content relay for one page window.
pub struct Relay {
    ctx: Arc<RelayContext>,
}

impl Relay {
    /// Create a relay for `window`.
    pub fn new(
        window: PageWindow,
        background: Arc<dyn BackgroundPort>,
        config: RelayConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            ctx: Arc::new(RelayContext {
                window,
                background,
                config,
                link: Mutex::new(PageLink::default()),
            }),
        })
    }

    /// Start relaying.
    ///
    /// Both subscriptions are taken before this returns, so nothing posted
    /// afterwards is missed.
    pub fn start(&self) -> JoinHandle<()> {
        let page = self.ctx.window.subscribe();
        let changes = self.ctx.background.subscribe_changes();
        info!(
            window = %self.ctx.window.id(),
            origin = %self.ctx.window.origin(),
            "Relay started"
        );
        tokio::spawn(Arc::clone(&self.ctx).run(page, changes))
    }

    /// Whether the page currently holds a connection.
    pub fn is_page_connected(&self) -> bool {
        self.ctx.link.lock().connected
    }

    /// The origin requests are attributed to.
    pub fn origin(&self) -> &Origin {
        self.ctx.window.origin()
    }
}

impl RelayContext {
    async fn run(
        self: Arc<Self>,
        mut page: WindowSubscription,
        mut changes: broadcast::Receiver<StorageChange>,
    ) {
        let mut changes_open = true;
        loop {
            tokio::select! {
                message = page.recv() => match message {
                    Some(message) => self.on_page_message(message),
                    None => {
                        debug!("Page bus closed, stopping relay");
                        break;
                    }
                },
                change = changes.recv(), if changes_open => match change {
                    Ok(change) => self.on_storage_change(&change),
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        warn!(lagged = count, "Storage change stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Storage change stream closed");
                        changes_open = false;
                    }
                },
            }
        }
    }

    fn on_page_message(self: &Arc<Self>, message: WindowMessage) {
        // Responses, pushes and foreign traffic share the bus
        if MessageClass::of(&message.data) != MessageClass::Request {
            return;
        }

        match validate(&message, self.window.id(), &self.config.source_tag) {
            Ok(request) => {
                let ctx = Arc::clone(self);
                tokio::spawn(async move { ctx.handle(request).await });
            }
            Err(e) => match e.reply_target() {
                Some((response_type, correlation_id)) => {
                    warn!(correlation_id = %correlation_id, error = %e, "Rejecting malformed request");
                    self.post(&WireResponse::failure(
                        response_type,
                        correlation_id,
                        &BridgeError::Malformed(e.to_string()),
                    ));
                }
                None => debug!(error = %e, "Ignoring page message"),
            },
        }
    }

    async fn handle(&self, validated: ValidatedRequest) {
        let ValidatedRequest {
            correlation_id,
            request,
        } = validated;
        let kind = request.kind();
        let deadline = Instant::now() + self.config.background_timeout();
        debug!(correlation_id = %correlation_id, kind = %kind, "Forwarding request");

        let response = match self.dispatch(request, deadline).await {
            Ok(payload) => WireResponse::success(kind, correlation_id, payload),
            Err(e) => {
                if e.is_transport() {
                    warn!(correlation_id = %correlation_id, kind = %kind, error = %e, "Request failed in transit");
                } else {
                    debug!(correlation_id = %correlation_id, kind = %kind, error = %e, "Request failed");
                }
                WireResponse::failure(kind.response_type(), correlation_id, &e)
            }
        };
        self.post(&response);
    }

    async fn dispatch(
        &self,
        request: PageRequest,
        deadline: Instant,
    ) -> Result<serde_json::Value, BridgeError> {
        let origin = self.window.origin().clone();
        match request {
            PageRequest::Connect(params) => self.connect(params, deadline).await,
            PageRequest::Disconnect(_) => self.disconnect(deadline).await,
            PageRequest::SignTransaction(params) => {
                let request = BackgroundRequest::SignTransaction {
                    origin,
                    transaction: params.transaction,
                };
                self.forward::<SignedTransaction>(request, deadline).await
            }
            PageRequest::SignAllTransactions(params) => {
                let request = BackgroundRequest::SignAllTransactions {
                    origin,
                    transactions: params.transactions,
                };
                self.forward::<SignedTransactions>(request, deadline).await
            }
            PageRequest::SignMessage(params) => {
                let request = BackgroundRequest::SignMessage {
                    origin,
                    message: params.message,
                };
                self.forward::<MessageSignature>(request, deadline).await
            }
            PageRequest::SignAndSendTransaction(params) => {
                let request = BackgroundRequest::SignAndSendTransaction {
                    origin,
                    transaction: params.transaction,
                    options: params.options,
                };
                self.forward::<SendResult>(request, deadline).await
            }
        }
    }

    async fn connect(
        &self,
        params: ConnectParams,
        deadline: Instant,
    ) -> Result<serde_json::Value, BridgeError> {
        let origin = self.window.origin().clone();
        let generation = self.link.lock().generation;
        let flags: SessionFlags =
            decode(self.call(BackgroundRequest::GetSessionFlags, deadline).await?)?;

        let address = match policy::decide(&flags, &origin) {
            ConnectDecision::Trusted { address } => {
                info!(origin = %origin, "Trusted site, connecting without prompt");
                address
            }
            ConnectDecision::NeedsApproval if params.only_if_trusted => {
                return Err(BridgeError::Rejected("site is not trusted".into()));
            }
            ConnectDecision::NeedsApproval => {
                info!(origin = %origin, "Requesting connection approval");
                let request = BackgroundRequest::RequestConnectionApproval {
                    origin: origin.clone(),
                };
                let approved: ConnectResult = decode(self.call(request, deadline).await?)?;
                approved.address
            }
        };

        if address.is_empty() {
            return Err(BridgeError::Malformed(
                "wallet approved without an address".into(),
            ));
        }

        {
            let mut link = self.link.lock();
            if link.generation == generation {
                link.connected = true;
                return encode(&ConnectResult { address });
            }
        }

        // Torn down while the wallet was deciding; take the grant back
        warn!(origin = %origin, "Page disconnected while its connection was pending");
        let revoke = BackgroundRequest::Disconnect { origin };
        let revoke_deadline = Instant::now() + self.config.background_timeout();
        if let Err(e) = self.call(revoke, revoke_deadline).await {
            debug!(error = %e, "Could not revoke stale approval");
        }
        Err(BridgeError::Rejected(
            "page disconnected while the connection was pending".into(),
        ))
    }

    async fn disconnect(&self, deadline: Instant) -> Result<serde_json::Value, BridgeError> {
        self.link.lock().tear_down();
        let origin = self.window.origin().clone();
        self.call(BackgroundRequest::Disconnect { origin }, deadline)
            .await?;
        Ok(serde_json::json!({}))
    }

    /// Forward a request and check the reply against the response schema.
    async fn forward<R>(
        &self,
        request: BackgroundRequest,
        deadline: Instant,
    ) -> Result<serde_json::Value, BridgeError>
    where
        R: DeserializeOwned + Serialize,
    {
        let reply: R = decode(self.call(request, deadline).await?)?;
        encode(&reply)
    }

    /// One call on the privileged channel, bounded by the page request's deadline.
    async fn call(
        &self,
        request: BackgroundRequest,
        deadline: Instant,
    ) -> Result<serde_json::Value, BridgeError> {
        let name = request.name();

        match tokio::time::timeout_at(deadline, self.background.request(request)).await {
            Ok(Ok(reply)) => reply.into_result().map_err(BridgeError::Rejected),
            Ok(Err(e)) => {
                warn!(request = name, error = %e, "Privileged channel failure");
                Err(BridgeError::ChannelFailure(e.to_string()))
            }
            Err(_) => {
                let budget = self.config.background_timeout().as_millis();
                warn!(
                    request = name,
                    timeout_ms = budget as u64,
                    "Background did not reply in time"
                );
                Err(BridgeError::Timeout(format!(
                    "{name} got no reply from the wallet within the relay's {budget} ms budget"
                )))
            }
        }
    }

    fn on_storage_change(&self, change: &StorageChange) {
        let Some(push) = push::translate(change) else {
            return;
        };

        let forward = match push {
            PushMessage::Disconnected => self.link.lock().tear_down(),
            PushMessage::AccountChanged(_) => self.link.lock().connected,
        };
        if !forward {
            debug!("No connected page, push not forwarded");
            return;
        }

        match serde_json::to_value(&push) {
            Ok(value) => {
                if let Err(e) = self.window.post_message(value) {
                    warn!(error = %e, "Failed to post push");
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode push"),
        }
    }

    fn post(&self, response: &WireResponse) {
        let correlation_id: CorrelationId = response.correlation_id;
        match serde_json::to_value(response) {
            Ok(value) => {
                if let Err(e) = self.window.post_message(value) {
                    warn!(correlation_id = %correlation_id, error = %e, "Failed to post response");
                }
            }
            Err(e) => warn!(correlation_id = %correlation_id, error = %e, "Failed to encode response"),
        }
    }
}

fn decode<T: DeserializeOwned>(data: serde_json::Value) -> Result<T, BridgeError> {
    serde_json::from_value(data)
        .map_err(|e| BridgeError::Malformed(format!("unexpected wallet reply: {e}")))
}

fn encode<T: Serialize>(value: &T) -> Result<serde_json::Value, BridgeError> {
    serde_json::to_value(value).map_err(|e| BridgeError::Malformed(e.to_string()))
}
