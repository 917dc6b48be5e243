//! # Error Types
//!
//! The bridge error taxonomy. Each variant has a stable [`ErrorCode`] so a
//! failure synthesized in one context (for example a channel break seen by
//! the relay) arrives in another context as the same variant.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by every provider operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// `connect()` was called while another connect is still in flight.
    #[error("A connection request is already pending")]
    AlreadyPending,

    /// The operation requires a connected wallet.
    #[error("Wallet is not connected")]
    NotConnected,

    /// No response arrived within the request window.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The transport between contexts broke (not a business decision).
    #[error("Channel failure: {0}")]
    ChannelFailure(String),

    /// The background explicitly denied the request (e.g. user declined).
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// A message did not match the schema declared for its kind.
    #[error("Malformed message: {0}")]
    Malformed(String),
}

/// Machine-readable error code carried next to the human message in
/// failure responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AlreadyPending,
    NotConnected,
    Timeout,
    ChannelFailure,
    Rejected,
    Malformed,
}

impl BridgeError {
    /// The wire code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            BridgeError::AlreadyPending => ErrorCode::AlreadyPending,
            BridgeError::NotConnected => ErrorCode::NotConnected,
            BridgeError::Timeout(_) => ErrorCode::Timeout,
            BridgeError::ChannelFailure(_) => ErrorCode::ChannelFailure,
            BridgeError::Rejected(_) => ErrorCode::Rejected,
            BridgeError::Malformed(_) => ErrorCode::Malformed,
        }
    }

    /// The detail text placed in the wire `error` field.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            BridgeError::AlreadyPending | BridgeError::NotConnected => self.to_string(),
            BridgeError::Timeout(msg)
            | BridgeError::ChannelFailure(msg)
            | BridgeError::Rejected(msg)
            | BridgeError::Malformed(msg) => msg.clone(),
        }
    }

    /// Rebuild an error from a failure response.
    ///
    /// A failure without a code is an explicit denial from the background.
    #[must_use]
    pub fn from_wire(code: Option<ErrorCode>, detail: Option<String>) -> Self {
        let detail = detail.unwrap_or_else(|| "no reason given".to_string());
        match code {
            Some(ErrorCode::AlreadyPending) => BridgeError::AlreadyPending,
            Some(ErrorCode::NotConnected) => BridgeError::NotConnected,
            Some(ErrorCode::Timeout) => BridgeError::Timeout(detail),
            Some(ErrorCode::ChannelFailure) => BridgeError::ChannelFailure(detail),
            Some(ErrorCode::Malformed) => BridgeError::Malformed(detail),
            Some(ErrorCode::Rejected) | None => BridgeError::Rejected(detail),
        }
    }

    /// Returns true for transport-level failures.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            BridgeError::Timeout(_) | BridgeError::ChannelFailure(_)
        )
    }
}
