//! Boundary-safe transaction encoding.
//!
//! Transactions cross the page bus as hex strings of their serialized bytes.

use shared_types::BridgeError;
use thiserror::Error;

/// Transaction codec errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionCodecError {
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Invalid transaction bytes: {0}")]
    InvalidBytes(String),
}

impl From<TransactionCodecError> for BridgeError {
    fn from(e: TransactionCodecError) -> Self {
        BridgeError::Malformed(e.to_string())
    }
}

/// A transaction that can be carried across the page bus.
pub trait WireTransaction: Sized + Send + Sync {
    /// Serialized bytes of the transaction.
    fn to_wire_bytes(&self) -> Vec<u8>;

    /// Rebuild a transaction from its serialized bytes.
    fn from_wire_bytes(bytes: &[u8]) -> Result<Self, TransactionCodecError>;
}

/// Opaque serialized transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction(pub Vec<u8>);

impl RawTransaction {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl WireTransaction for RawTransaction {
    fn to_wire_bytes(&self) -> Vec<u8> {
        self.0.clone()
    }

    fn from_wire_bytes(bytes: &[u8]) -> Result<Self, TransactionCodecError> {
        Ok(Self(bytes.to_vec()))
    }
}

/// Hex-encode a transaction.
pub fn encode<T: WireTransaction>(tx: &T) -> String {
    hex::encode(tx.to_wire_bytes())
}

/// Decode a hex-encoded transaction.
pub fn decode<T: WireTransaction>(encoded: &str) -> Result<T, TransactionCodecError> {
    let bytes = hex::decode(encoded.trim_start_matches("0x"))
        .map_err(|e| TransactionCodecError::InvalidHex(e.to_string()))?;
    T::from_wire_bytes(&bytes)
}
