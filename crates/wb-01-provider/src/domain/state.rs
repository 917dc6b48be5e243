//! Connection state machine.
//!
//! ```text
//! Disconnected --connect--> Connecting --success--> Connected
//!      ^                        |                       |
//!      +--------failure---------+                       |
//!      +------------------disconnect / revoke-----------+
//! ```
//!
//! Each connect attempt is numbered. A [`ConnectingGuard`] returns the slot
//! to `Disconnected` when dropped unless the attempt completed, so the
//! `Connecting` flag is cleared on every exit path, cancellation included.

use parking_lot::Mutex;

/// Observable connection state of a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected { address: String },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected { .. })
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self, ConnectionState::Connecting)
    }

    /// Cached address while connected
    pub fn address(&self) -> Option<&str> {
        match self {
            ConnectionState::Connected { address } => Some(address),
            _ => None,
        }
    }
}

/// Result of asking to begin a connect.
#[derive(Debug, PartialEq, Eq)]
pub enum ConnectStart {
    /// A connect is already in flight.
    AlreadyPending,
    /// Already connected with this address.
    Connected(String),
    /// A new attempt started with this number.
    Started(u64),
}

/// Outcome of a state transition driven by a push or disconnect.
#[derive(Debug, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed.
    Unchanged,
    /// State moved; the caller should emit the matching event.
    Changed,
}

#[derive(Debug, Default)]
struct Slot {
    state: ConnectionState,
    attempt: u64,
}

/// Connection state shared between the provider API and its listener.
///
/// The lock is never held across an await.
#[derive(Debug, Default)]
pub struct StateSlot {
    inner: Mutex<Slot>,
}

impl StateSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current state.
    pub fn get(&self) -> ConnectionState {
        self.inner.lock().state.clone()
    }

    /// Begin a connect attempt.
    pub fn begin_connect(&self) -> ConnectStart {
        let mut slot = self.inner.lock();
        match &slot.state {
            ConnectionState::Connecting => ConnectStart::AlreadyPending,
            ConnectionState::Connected { address } => ConnectStart::Connected(address.clone()),
            ConnectionState::Disconnected => {
                slot.attempt += 1;
                slot.state = ConnectionState::Connecting;
                ConnectStart::Started(slot.attempt)
            }
        }
    }

    /// Complete a connect attempt with the approved address.
    ///
    /// Returns false if the attempt was torn down while in flight.
    pub fn complete_connect(&self, attempt: u64, address: &str) -> bool {
        let mut slot = self.inner.lock();
        if slot.attempt != attempt || !slot.state.is_connecting() {
            return false;
        }
        slot.state = ConnectionState::Connected {
            address: address.to_string(),
        };
        true
    }

    /// Abandon a connect attempt, if it is still the current one.
    pub fn abort_connect(&self, attempt: u64) {
        let mut slot = self.inner.lock();
        if slot.attempt == attempt && slot.state.is_connecting() {
            slot.state = ConnectionState::Disconnected;
        }
    }

    /// Force `Disconnected`.
    pub fn disconnect(&self) -> Transition {
        let mut slot = self.inner.lock();
        if slot.state == ConnectionState::Disconnected {
            return Transition::Unchanged;
        }
        slot.state = ConnectionState::Disconnected;
        Transition::Changed
    }

    /// Replace the cached address while connected.
    ///
    /// Ignored unless connected and the address differs.
    pub fn change_account(&self, address: &str) -> Transition {
        let mut slot = self.inner.lock();
        match &mut slot.state {
            ConnectionState::Connected { address: current } if current != address => {
                *current = address.to_string();
                Transition::Changed
            }
            _ => Transition::Unchanged,
        }
    }
}

/// Clears `Connecting` for an attempt when dropped, unless disarmed.
pub struct ConnectingGuard<'a> {
    slot: &'a StateSlot,
    attempt: u64,
    armed: bool,
}

impl<'a> ConnectingGuard<'a> {
    pub fn new(slot: &'a StateSlot, attempt: u64) -> Self {
        Self {
            slot,
            attempt,
            armed: true,
        }
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Keep the state as it is on drop.
    pub fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.slot.abort_connect(self.attempt);
        }
    }
}
