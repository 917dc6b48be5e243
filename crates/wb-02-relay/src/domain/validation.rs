//! Inbound page message validation.
//!
//! Rejects everything that is not a well-formed request from our own page
//! before any handler runs. Order of checks:
//!
//! 1. posted by the relay's own window
//! 2. `source` carries the provider tag
//! 3. envelope parses and has a numeric `correlationId`
//! 4. `type` is a known request kind
//! 5. `data` matches the declared schema of that kind
//!
//! Failures at steps 1-3 are dropped silently. Failures at steps 4-5 have a
//! readable id, so the caller answers them with a `MALFORMED` failure.

use serde::de::DeserializeOwned;
use shared_bus::{WindowId, WindowMessage};
use shared_types::{
    ConnectParams, CorrelationId, DisconnectParams, RequestKind, SignAllTransactionsParams,
    SignAndSendParams, SignMessageParams, SignTransactionParams, WireRequest, RESPONSE_SUFFIX,
};
use thiserror::Error;

/// Why an inbound message was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Message posted by another window")]
    ForeignWindow,

    #[error("Unexpected source tag {0:?}")]
    ForeignSource(Option<String>),

    #[error("Not a request envelope: {0}")]
    NotARequest(String),

    #[error("Unknown request type {kind:?}")]
    UnknownKind {
        correlation_id: CorrelationId,
        kind: String,
    },

    #[error("Invalid {kind} data: {reason}")]
    InvalidData {
        correlation_id: CorrelationId,
        kind: RequestKind,
        reason: String,
    },
}

impl ValidationError {
    /// Response type and id to answer with, if the sender can be told.
    pub fn reply_target(&self) -> Option<(String, CorrelationId)> {
        match self {
            ValidationError::UnknownKind {
                correlation_id,
                kind,
            } => Some((format!("{kind}{RESPONSE_SUFFIX}"), *correlation_id)),
            ValidationError::InvalidData {
                correlation_id,
                kind,
                ..
            } => Some((kind.response_type().to_string(), *correlation_id)),
            _ => None,
        }
    }
}

/// A page request with its data parsed into the declared schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    Connect(ConnectParams),
    Disconnect(DisconnectParams),
    SignTransaction(SignTransactionParams),
    SignAllTransactions(SignAllTransactionsParams),
    SignMessage(SignMessageParams),
    SignAndSendTransaction(SignAndSendParams),
}

impl PageRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            PageRequest::Connect(_) => RequestKind::Connect,
            PageRequest::Disconnect(_) => RequestKind::Disconnect,
            PageRequest::SignTransaction(_) => RequestKind::SignTransaction,
            PageRequest::SignAllTransactions(_) => RequestKind::SignAllTransactions,
            PageRequest::SignMessage(_) => RequestKind::SignMessage,
            PageRequest::SignAndSendTransaction(_) => RequestKind::SignAndSendTransaction,
        }
    }

    /// Parse `data` into the schema declared for `kind`.
    ///
    /// Absent data is read as an empty object.
    pub fn parse(kind: RequestKind, data: serde_json::Value) -> Result<Self, String> {
        let data = if data.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            data
        };

        let request = match kind {
            RequestKind::Connect => PageRequest::Connect(from_data(data)?),
            RequestKind::Disconnect => PageRequest::Disconnect(from_data(data)?),
            RequestKind::SignTransaction => {
                let params: SignTransactionParams = from_data(data)?;
                check_hex("transaction", &params.transaction)?;
                PageRequest::SignTransaction(params)
            }
            RequestKind::SignAllTransactions => {
                let params: SignAllTransactionsParams = from_data(data)?;
                if params.transactions.is_empty() {
                    return Err("transactions cannot be empty".into());
                }
                for tx in &params.transactions {
                    check_hex("transactions", tx)?;
                }
                PageRequest::SignAllTransactions(params)
            }
            RequestKind::SignMessage => {
                let params: SignMessageParams = from_data(data)?;
                check_hex("message", &params.message)?;
                PageRequest::SignMessage(params)
            }
            RequestKind::SignAndSendTransaction => {
                let params: SignAndSendParams = from_data(data)?;
                check_hex("transaction", &params.transaction)?;
                PageRequest::SignAndSendTransaction(params)
            }
        };
        Ok(request)
    }
}

/// An accepted page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub correlation_id: CorrelationId,
    pub request: PageRequest,
}

/// Validate a raw page message.
pub fn validate(
    message: &WindowMessage,
    own_window: WindowId,
    source_tag: &str,
) -> Result<ValidatedRequest, ValidationError> {
    if message.source != own_window {
        return Err(ValidationError::ForeignWindow);
    }

    let source = message.data.get("source").and_then(serde_json::Value::as_str);
    if source != Some(source_tag) {
        return Err(ValidationError::ForeignSource(source.map(str::to_owned)));
    }

    let envelope: WireRequest = serde_json::from_value(message.data.clone())
        .map_err(|e| ValidationError::NotARequest(e.to_string()))?;

    let Some(kind) = envelope.request_kind() else {
        return Err(ValidationError::UnknownKind {
            correlation_id: envelope.correlation_id,
            kind: envelope.kind,
        });
    };

    let request = PageRequest::parse(kind, envelope.data).map_err(|reason| {
        ValidationError::InvalidData {
            correlation_id: envelope.correlation_id,
            kind,
            reason,
        }
    })?;

    Ok(ValidatedRequest {
        correlation_id: envelope.correlation_id,
        request,
    })
}

fn from_data<T: DeserializeOwned>(data: serde_json::Value) -> Result<T, String> {
    serde_json::from_value(data).map_err(|e| e.to_string())
}

fn check_hex(field: &str, value: &str) -> Result<(), String> {
    hex::decode(value)
        .map(|_| ())
        .map_err(|e| format!("{field} is not hex: {e}"))
}
