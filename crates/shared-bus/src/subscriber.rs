//! # Page Bus Subscriber
//!
//! The listening side of the bus (`window.addEventListener("message")`).

use crate::message::WindowMessage;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The bus was closed.
    #[error("Page bus closed")]
    Closed,
}

/// A listener on the page bus.
pub struct WindowSubscription {
    receiver: broadcast::Receiver<WindowMessage>,
}

impl WindowSubscription {
    pub(crate) fn new(receiver: broadcast::Receiver<WindowMessage>) -> Self {
        Self { receiver }
    }

    /// Receive the next message.
    ///
    /// # Returns
    ///
    /// - `Some(message)` - The next message on the bus
    /// - `None` - The bus was dropped
    pub async fn recv(&mut self) -> Option<WindowMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Listener lagged, some messages dropped");
                }
            }
        }
    }

    /// Try to receive the next message without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(message))` - A message was available
    /// - `Ok(None)` - No message available
    /// - `Err(SubscriptionError::Closed)` - The bus was dropped
    pub fn try_recv(&mut self) -> Result<Option<WindowMessage>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(message) => return Ok(Some(message)),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            }
        }
    }

    /// Drain every message currently buffered.
    pub fn drain(&mut self) -> Vec<WindowMessage> {
        let mut messages = Vec::new();
        while let Ok(Some(message)) = self.try_recv() {
            messages.push(message);
        }
        messages
    }
}
