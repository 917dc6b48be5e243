//! Page listener - routes responses and pushes arriving on the page bus.

use crate::service::ProviderInner;
use shared_bus::{WindowId, WindowMessage, WindowSubscription};
use shared_types::{MessageClass, PushMessage, WireResponse};
use std::sync::Arc;
use tracing::debug;

/// Listener loop feeding the provider from the page bus.
pub struct PageListener {
    inner: Arc<ProviderInner>,
    subscription: WindowSubscription,
    window: WindowId,
}

impl PageListener {
    pub(crate) fn new(
        inner: Arc<ProviderInner>,
        subscription: WindowSubscription,
        window: WindowId,
    ) -> Self {
        Self {
            inner,
            subscription,
            window,
        }
    }

    /// Run the listener loop until the bus closes.
    pub async fn run(mut self) {
        while let Some(message) = self.subscription.recv().await {
            self.handle_message(message);
        }
        debug!(window = %self.window, "Page bus closed, stopping listener");
    }

    fn handle_message(&self, message: WindowMessage) {
        if message.source != self.window {
            return;
        }

        match MessageClass::of(&message.data) {
            MessageClass::Response(kind) => {
                match serde_json::from_value::<WireResponse>(message.data) {
                    Ok(response) => {
                        self.inner.table.complete(response);
                    }
                    Err(e) => {
                        debug!(kind = %kind, error = %e, "Dropping malformed response");
                    }
                }
            }
            MessageClass::Push => match serde_json::from_value::<PushMessage>(message.data) {
                Ok(push) => self.inner.apply_push(push),
                Err(e) => debug!(error = %e, "Dropping malformed push"),
            },
            // Our own requests and foreign traffic
            MessageClass::Request | MessageClass::Foreign => {}
        }
    }
}
