//! # Page Bus Wire Format
//!
//! Three message shapes travel over the page bus:
//!
//! ```text
//! request   { type, data, correlationId, source }
//! response  { type: <type>_RESPONSE, correlationId, success, payload?, error?, code? }
//! push      { type: ACCOUNT_CHANGED | DISCONNECTED, data? }
//! ```
//!
//! The bus itself is untyped JSON. [`MessageClass::of`] sorts an arbitrary
//! value into one of these namespaces by its `type` field alone; the
//! receiver then parses the full shape and drops anything that does not fit.

use crate::errors::{BridgeError, ErrorCode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag every request from the injected provider carries in `source`.
pub const PROVIDER_SOURCE_TAG: &str = "wallet-bridge-inpage";

/// Suffix that turns a request type into its response type.
pub const RESPONSE_SUFFIX: &str = "_RESPONSE";

/// Push type for an address change.
pub const ACCOUNT_CHANGED: &str = "ACCOUNT_CHANGED";

/// Push type for a forced disconnect.
pub const DISCONNECTED: &str = "DISCONNECTED";

/// Largest integer a JavaScript page can hold without losing precision.
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

// =============================================================================
// CORRELATION ID
// =============================================================================

/// Token pairing a request with its response.
///
/// Serialized as a bare JSON number so page scripts can read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(u64);

impl CorrelationId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric id.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// REQUEST KIND
// =============================================================================

/// Every request a page may issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestKind {
    Connect,
    Disconnect,
    SignTransaction,
    SignAllTransactions,
    SignMessage,
    SignAndSendTransaction,
}

impl RequestKind {
    /// All request kinds, in dispatch-table order.
    pub const ALL: [RequestKind; 6] = [
        RequestKind::Connect,
        RequestKind::Disconnect,
        RequestKind::SignTransaction,
        RequestKind::SignAllTransactions,
        RequestKind::SignMessage,
        RequestKind::SignAndSendTransaction,
    ];

    /// Wire name of the request type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Connect => "CONNECT",
            RequestKind::Disconnect => "DISCONNECT",
            RequestKind::SignTransaction => "SIGN_TRANSACTION",
            RequestKind::SignAllTransactions => "SIGN_ALL_TRANSACTIONS",
            RequestKind::SignMessage => "SIGN_MESSAGE",
            RequestKind::SignAndSendTransaction => "SIGN_AND_SEND_TRANSACTION",
        }
    }

    /// Wire name of the matching response type.
    #[must_use]
    pub const fn response_type(&self) -> &'static str {
        match self {
            RequestKind::Connect => "CONNECT_RESPONSE",
            RequestKind::Disconnect => "DISCONNECT_RESPONSE",
            RequestKind::SignTransaction => "SIGN_TRANSACTION_RESPONSE",
            RequestKind::SignAllTransactions => "SIGN_ALL_TRANSACTIONS_RESPONSE",
            RequestKind::SignMessage => "SIGN_MESSAGE_RESPONSE",
            RequestKind::SignAndSendTransaction => "SIGN_AND_SEND_TRANSACTION_RESPONSE",
        }
    }

    /// Parse a request type name.
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Parse a response type name back to the request kind it answers.
    #[must_use]
    pub fn from_response_type(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.response_type() == name)
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ENVELOPES
// =============================================================================

/// A request posted by the provider.
///
/// `kind` stays a string here: the relay must be able to read the
/// correlation id of a request whose type it does not know, so it can
/// answer with a `MALFORMED` failure instead of leaving the page to time out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
    pub correlation_id: CorrelationId,
    pub source: String,
}

impl WireRequest {
    /// Build a request for a known kind.
    #[must_use]
    pub fn new(
        kind: RequestKind,
        data: serde_json::Value,
        correlation_id: CorrelationId,
        source: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            data,
            correlation_id,
            source: source.into(),
        }
    }

    /// The request kind, if it is one the bridge knows.
    #[must_use]
    pub fn request_kind(&self) -> Option<RequestKind> {
        RequestKind::from_wire(&self.kind)
    }
}

/// A response posted by the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireResponse {
    #[serde(rename = "type")]
    pub kind: String,
    pub correlation_id: CorrelationId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl WireResponse {
    /// A successful response.
    #[must_use]
    pub fn success(
        kind: RequestKind,
        correlation_id: CorrelationId,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            kind: kind.response_type().to_string(),
            correlation_id,
            success: true,
            payload: Some(payload),
            error: None,
            code: None,
        }
    }

    /// A failure response carrying the error's code and detail.
    ///
    /// `response_type` is passed as a string so failures can be posted for
    /// requests whose type was not recognized.
    #[must_use]
    pub fn failure(
        response_type: impl Into<String>,
        correlation_id: CorrelationId,
        error: &BridgeError,
    ) -> Self {
        Self {
            kind: response_type.into(),
            correlation_id,
            success: false,
            payload: None,
            error: Some(error.detail()),
            code: Some(error.code()),
        }
    }

    /// The request kind this response answers.
    #[must_use]
    pub fn request_kind(&self) -> Option<RequestKind> {
        RequestKind::from_response_type(&self.kind)
    }

    /// Convert into the outcome delivered to the waiting caller.
    pub fn into_outcome(self) -> Result<serde_json::Value, BridgeError> {
        if self.success {
            Ok(self.payload.unwrap_or(serde_json::Value::Null))
        } else {
            Err(BridgeError::from_wire(self.code, self.error))
        }
    }
}

/// Data of an `ACCOUNT_CHANGED` push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountChangedData {
    pub address: String,
}

/// Unsolicited notification from the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PushMessage {
    AccountChanged(AccountChangedData),
    Disconnected,
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Namespace of a raw page-bus message, decided by its `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageClass {
    /// A response to the given request kind.
    Response(RequestKind),
    /// A push notification.
    Push,
    /// A request (known or not); has the `source` field.
    Request,
    /// Anything else on the bus.
    Foreign,
}

impl MessageClass {
    /// Classify a raw message.
    #[must_use]
    pub fn of(value: &serde_json::Value) -> Self {
        let Some(name) = value.get("type").and_then(serde_json::Value::as_str) else {
            return MessageClass::Foreign;
        };

        if let Some(kind) = RequestKind::from_response_type(name) {
            return MessageClass::Response(kind);
        }
        if name == ACCOUNT_CHANGED || name == DISCONNECTED {
            return MessageClass::Push;
        }
        if value.get("source").is_some() && value.get("correlationId").is_some() {
            return MessageClass::Request;
        }
        MessageClass::Foreign
    }
}
