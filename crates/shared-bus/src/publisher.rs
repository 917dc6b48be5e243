//! # Page Bus Publisher
//!
//! The posting side of the bus, and the window handle scripts use to reach it.

use crate::message::{WindowId, WindowMessage};
use crate::subscriber::WindowSubscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use shared_types::Origin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Errors from posting to the bus.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Nobody is listening on the bus; the message went nowhere.
    #[error("No listener on the page bus")]
    NoListeners,
}

/// Anything a script can post page messages through.
pub trait MessagePoster: Send + Sync {
    /// Post a message from this window.
    ///
    /// Returns the number of listeners that received it.
    fn post_message(&self, data: serde_json::Value) -> Result<usize, BusError>;
}

/// The shared message bus of one browser tab.
///
/// Uses `tokio::sync::broadcast`, so every listener sees every message.
pub struct PageBus {
    /// Broadcast sender for messages.
    sender: broadcast::Sender<WindowMessage>,

    /// Total messages posted.
    messages_posted: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl PageBus {
    /// Create a new bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            messages_posted: AtomicU64::new(0),
            capacity,
        }
    }

    /// Open a new window with the given origin on this bus.
    #[must_use]
    pub fn open_window(self: &Arc<Self>, origin: Origin) -> PageWindow {
        let window = PageWindow {
            id: WindowId::new(),
            origin,
            bus: Arc::clone(self),
        };
        debug!(window = %window.id, origin = %window.origin, "Window opened");
        window
    }

    /// Listen to every message on the bus.
    #[must_use]
    pub fn subscribe(&self) -> WindowSubscription {
        WindowSubscription::new(self.sender.subscribe())
    }

    /// Get the number of active listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the total number of messages posted.
    #[must_use]
    pub fn messages_posted(&self) -> u64 {
        self.messages_posted.load(Ordering::Relaxed)
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn post(&self, message: WindowMessage) -> Result<usize, BusError> {
        self.messages_posted.fetch_add(1, Ordering::Relaxed);
        let message_type = message.message_type().map(str::to_owned);

        match self.sender.send(message) {
            Ok(receivers) => {
                debug!(
                    message_type = ?message_type,
                    receivers = receivers,
                    "Message posted"
                );
                Ok(receivers)
            }
            Err(_) => {
                warn!(message_type = ?message_type, "Message dropped (no listeners)");
                Err(BusError::NoListeners)
            }
        }
    }
}

impl Default for PageBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one window on a bus.
///
/// Cloning yields another handle to the same window (e.g. the page script
/// and the content relay of one tab share their window).
#[derive(Clone)]
pub struct PageWindow {
    id: WindowId,
    origin: Origin,
    bus: Arc<PageBus>,
}

impl PageWindow {
    /// This window's identity.
    #[must_use]
    pub fn id(&self) -> WindowId {
        self.id
    }

    /// This window's origin (`window.location.origin`).
    #[must_use]
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Listen to every message on the bus.
    #[must_use]
    pub fn subscribe(&self) -> WindowSubscription {
        self.bus.subscribe()
    }

    /// The bus this window is attached to.
    #[must_use]
    pub fn bus(&self) -> &Arc<PageBus> {
        &self.bus
    }
}

impl MessagePoster for PageWindow {
    fn post_message(&self, data: serde_json::Value) -> Result<usize, BusError> {
        self.bus.post(WindowMessage {
            source: self.id,
            origin: self.origin.clone(),
            data,
        })
    }
}

impl std::fmt::Debug for PageWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageWindow")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .finish()
    }
}
