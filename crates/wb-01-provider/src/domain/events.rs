//! Event Channel - `connect`, `disconnect` and `accountChanged` listeners.

use parking_lot::Mutex;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::error;

/// Events a provider emits to page code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    Connect { address: String },
    Disconnect,
    AccountChanged { address: String },
}

impl ProviderEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ProviderEvent::Connect { .. } => EventKind::Connect,
            ProviderEvent::Disconnect => EventKind::Disconnect,
            ProviderEvent::AccountChanged { .. } => EventKind::AccountChanged,
        }
    }
}

/// Event names listeners subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connect,
    Disconnect,
    AccountChanged,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Connect => "connect",
            EventKind::Disconnect => "disconnect",
            EventKind::AccountChanged => "accountChanged",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle returned by [`EventChannel::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Handler = Arc<dyn Fn(&ProviderEvent) + Send + Sync>;

/// Listener registry for one provider.
#[derive(Default)]
pub struct EventChannel {
    listeners: Mutex<Vec<(EventKind, ListenerId, Handler)>>,
    next_id: AtomicU64,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> ListenerId
    where
        F: Fn(&ProviderEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((kind, id, Arc::new(handler)));
        id
    }

    /// Remove a handler. Returns false if it was not registered for `kind`.
    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(k, listener, _)| !(*k == kind && *listener == id));
        listeners.len() != before
    }

    /// Call every handler registered for the event's kind.
    ///
    /// Handlers run on a snapshot, outside the lock, so they may register
    /// or remove listeners. A panicking handler is logged and skipped.
    pub fn emit(&self, event: &ProviderEvent) {
        let kind = event.kind();
        let handlers: Vec<Handler> = self
            .listeners
            .lock()
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, _, handler)| Arc::clone(handler))
            .collect();

        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                error!(event = %kind, "Event handler panicked");
            }
        }
    }

    /// Number of handlers registered for a kind.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .lock()
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .count()
    }
}
