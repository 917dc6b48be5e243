//! # Privileged Channel Schema
//!
//! Messages the relay sends to the wallet background and the replies it
//! expects. The background is an external collaborator: this module is its
//! whole contract with the bridge.
//!
//! | message | sent when |
//! |---|---|
//! | `GET_SESSION_FLAGS` | every page `CONNECT`, before any consent prompt |
//! | `REQUEST_CONNECTION_APPROVAL` | origin not yet allowlisted, or no session |
//! | `DISCONNECT` | page `DISCONNECT` |
//! | `SIGN_*` | the matching page request |
//! | `STORAGE_CHANGED` | pushed by the background, never sent to it |

use crate::origin::{Origin, SiteAllowlist};
use crate::payloads::SendOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Storage key holding the session's authenticated flag.
pub const AUTH_FLAG_KEY: &str = "isAuthenticated";

/// Storage key holding the active wallet address.
pub const ADDRESS_FLAG_KEY: &str = "walletAddress";

/// Request from the relay to the background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackgroundRequest {
    GetSessionFlags,
    RequestConnectionApproval {
        origin: Origin,
    },
    Disconnect {
        origin: Origin,
    },
    SignTransaction {
        origin: Origin,
        transaction: String,
    },
    SignAllTransactions {
        origin: Origin,
        transactions: Vec<String>,
    },
    SignMessage {
        origin: Origin,
        message: String,
    },
    SignAndSendTransaction {
        origin: Origin,
        transaction: String,
        options: SendOptions,
    },
}

impl BackgroundRequest {
    /// Wire name, for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            BackgroundRequest::GetSessionFlags => "GET_SESSION_FLAGS",
            BackgroundRequest::RequestConnectionApproval { .. } => "REQUEST_CONNECTION_APPROVAL",
            BackgroundRequest::Disconnect { .. } => "DISCONNECT",
            BackgroundRequest::SignTransaction { .. } => "SIGN_TRANSACTION",
            BackgroundRequest::SignAllTransactions { .. } => "SIGN_ALL_TRANSACTIONS",
            BackgroundRequest::SignMessage { .. } => "SIGN_MESSAGE",
            BackgroundRequest::SignAndSendTransaction { .. } => "SIGN_AND_SEND_TRANSACTION",
        }
    }
}

/// Reply from the background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BackgroundReply {
    /// A successful reply.
    #[must_use]
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// A business-logic denial.
    #[must_use]
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(reason.into()),
        }
    }

    /// Split into data or denial reason.
    pub fn into_result(self) -> Result<serde_json::Value, String> {
        if self.success {
            Ok(self.data.unwrap_or(serde_json::Value::Null))
        } else {
            Err(self
                .error
                .unwrap_or_else(|| "request denied by wallet".to_string()))
        }
    }
}

/// Data of a `GET_SESSION_FLAGS` reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFlags {
    pub authenticated: bool,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub allowed_sites: SiteAllowlist,
}

/// One changed storage key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageDelta {
    #[serde(default)]
    pub old_value: Option<serde_json::Value>,
    #[serde(default)]
    pub new_value: Option<serde_json::Value>,
}

/// `STORAGE_CHANGED` push from the background.
///
/// Carries raw storage content; it never leaves the relay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageChange {
    pub changes: BTreeMap<String, StorageDelta>,
}

impl StorageChange {
    /// A change of a single key.
    #[must_use]
    pub fn single(
        key: impl Into<String>,
        old_value: Option<serde_json::Value>,
        new_value: Option<serde_json::Value>,
    ) -> Self {
        let mut changes = BTreeMap::new();
        changes.insert(
            key.into(),
            StorageDelta {
                old_value,
                new_value,
            },
        );
        Self { changes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_names() {
        let origin = Origin::parse("https://dapp.example").unwrap();
        let value = serde_json::to_value(BackgroundRequest::RequestConnectionApproval {
            origin: origin.clone(),
        })
        .unwrap();
        assert_eq!(
            value,
            json!({ "type": "REQUEST_CONNECTION_APPROVAL", "origin": "https://dapp.example" })
        );

        let value = serde_json::to_value(BackgroundRequest::GetSessionFlags).unwrap();
        assert_eq!(value, json!({ "type": "GET_SESSION_FLAGS" }));
        assert_eq!(BackgroundRequest::GetSessionFlags.name(), "GET_SESSION_FLAGS");
    }

    #[test]
    fn test_reply_into_result() {
        assert_eq!(
            BackgroundReply::ok(json!({ "address": "a" })).into_result(),
            Ok(json!({ "address": "a" }))
        );
        assert_eq!(
            BackgroundReply::denied("User rejected").into_result(),
            Err("User rejected".to_string())
        );

        let bare = BackgroundReply {
            success: false,
            data: None,
            error: None,
        };
        assert_eq!(bare.into_result(), Err("request denied by wallet".to_string()));
    }

    #[test]
    fn test_session_flags_parse() {
        let flags: SessionFlags = serde_json::from_value(json!({
            "authenticated": true,
            "address": "Wallet111",
            "allowedSites": ["https://dapp.example:443"]
        }))
        .unwrap();

        assert!(flags.authenticated);
        assert!(flags
            .allowed_sites
            .contains(&Origin::parse("https://dapp.example").unwrap()));
    }

    #[test]
    fn test_session_flags_minimal() {
        let flags: SessionFlags = serde_json::from_value(json!({ "authenticated": false })).unwrap();
        assert_eq!(flags, SessionFlags::default());
    }

    #[test]
    fn test_storage_change_single() {
        let change = StorageChange::single(ADDRESS_FLAG_KEY, None, Some(json!("abc")));
        assert_eq!(change.changes.len(), 1);
        assert_eq!(
            change.changes[ADDRESS_FLAG_KEY].new_value,
            Some(json!("abc"))
        );
    }
}
