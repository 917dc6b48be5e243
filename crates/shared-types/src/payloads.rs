//! # Request Payload Schemas
//!
//! The declared `data` schema for each request kind and the payload schema of
//! each successful response. Binary values (transactions, messages,
//! signatures) are hex strings so they survive any structured-clone or JSON
//! boundary unchanged.

use serde::{Deserialize, Serialize};

// =============================================================================
// REQUEST DATA
// =============================================================================

/// `CONNECT` data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConnectParams {
    /// Only connect if the site is already trusted (no consent prompt).
    #[serde(default)]
    pub only_if_trusted: bool,
}

/// `DISCONNECT` data (none).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisconnectParams {}

/// `SIGN_TRANSACTION` data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignTransactionParams {
    /// Hex-encoded serialized transaction.
    pub transaction: String,
}

/// `SIGN_ALL_TRANSACTIONS` data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignAllTransactionsParams {
    pub transactions: Vec<String>,
}

/// `SIGN_MESSAGE` data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignMessageParams {
    /// Hex-encoded message bytes.
    pub message: String,
}

/// Options forwarded untouched with `SIGN_AND_SEND_TRANSACTION`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOptions {
    #[serde(default)]
    pub skip_preflight: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preflight_commitment: Option<String>,
}

/// `SIGN_AND_SEND_TRANSACTION` data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignAndSendParams {
    pub transaction: String,
    #[serde(default)]
    pub options: SendOptions,
}

// =============================================================================
// RESPONSE PAYLOADS
// =============================================================================

/// Payload of a successful `CONNECT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectResult {
    pub address: String,
}

/// Payload of a successful `SIGN_TRANSACTION`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub transaction: String,
}

/// Payload of a successful `SIGN_ALL_TRANSACTIONS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransactions {
    pub transactions: Vec<String>,
}

/// Payload of a successful `SIGN_MESSAGE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSignature {
    /// Hex-encoded signature.
    pub signature: String,
    pub address: String,
}

/// Payload of a successful `SIGN_AND_SEND_TRANSACTION`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResult {
    /// Transaction signature as reported by the network.
    pub signature: String,
}
