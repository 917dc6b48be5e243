//! # Window Messages
//!
//! What a `message` event listener sees: the data plus the identity of the
//! window that posted it.

use serde::{Deserialize, Serialize};
use shared_types::Origin;
use std::fmt;
use uuid::Uuid;

/// Identity of one window (top-level page or frame) on a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(Uuid);

impl WindowId {
    /// A fresh window identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WindowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message as delivered to listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowMessage {
    /// Window that posted the message (set by the bus, not the poster).
    pub source: WindowId,
    /// Origin of the posting window.
    pub origin: Origin,
    /// Arbitrary JSON data.
    pub data: serde_json::Value,
}

impl WindowMessage {
    /// The `type` field of the data, if any.
    #[must_use]
    pub fn message_type(&self) -> Option<&str> {
        self.data.get("type").and_then(serde_json::Value::as_str)
    }
}
