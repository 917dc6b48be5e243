//! Storage change translation.
//!
//! The background reports raw storage deltas. Only the derived fact leaves
//! the relay: a new address, or the end of the session.

use shared_types::{
    AccountChangedData, PushMessage, StorageChange, StorageDelta, ADDRESS_FLAG_KEY, AUTH_FLAG_KEY,
};

/// Translate a storage change into the push the page should see, if any.
///
/// A revoked session wins over an address change in the same delta.
pub fn translate(change: &StorageChange) -> Option<PushMessage> {
    if let Some(delta) = change.changes.get(AUTH_FLAG_KEY) {
        if !is_true(delta) {
            return Some(PushMessage::Disconnected);
        }
    }

    let delta = change.changes.get(ADDRESS_FLAG_KEY)?;
    match delta.new_value.as_ref().and_then(serde_json::Value::as_str) {
        Some(address) if !address.is_empty() => {
            Some(PushMessage::AccountChanged(AccountChangedData {
                address: address.to_string(),
            }))
        }
        _ => Some(PushMessage::Disconnected),
    }
}

fn is_true(delta: &StorageDelta) -> bool {
    delta
        .new_value
        .as_ref()
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_auth_revoked() {
        let change = StorageChange::single(AUTH_FLAG_KEY, Some(json!(true)), Some(json!(false)));
        assert_eq!(translate(&change), Some(PushMessage::Disconnected));

        let removed = StorageChange::single(AUTH_FLAG_KEY, Some(json!(true)), None);
        assert_eq!(translate(&removed), Some(PushMessage::Disconnected));
    }

    #[test]
    fn test_auth_granted_is_silent() {
        let change = StorageChange::single(AUTH_FLAG_KEY, Some(json!(false)), Some(json!(true)));
        assert_eq!(translate(&change), None);
    }

    #[test]
    fn test_address_changed() {
        let change = StorageChange::single(ADDRESS_FLAG_KEY, Some(json!("a")), Some(json!("b")));
        assert_eq!(
            translate(&change),
            Some(PushMessage::AccountChanged(AccountChangedData {
                address: "b".into()
            }))
        );
    }

    #[test]
    fn test_address_cleared() {
        let change = StorageChange::single(ADDRESS_FLAG_KEY, Some(json!("a")), None);
        assert_eq!(translate(&change), Some(PushMessage::Disconnected));

        let empty = StorageChange::single(ADDRESS_FLAG_KEY, Some(json!("a")), Some(json!("")));
        assert_eq!(translate(&empty), Some(PushMessage::Disconnected));
    }

    #[test]
    fn test_unrelated_keys_never_leak() {
        let change = StorageChange::single("encryptedVault", None, Some(json!("c2VjcmV0")));
        assert_eq!(translate(&change), None);
    }

    #[test]
    fn test_revocation_wins() {
        let mut change = StorageChange::single(ADDRESS_FLAG_KEY, Some(json!("a")), Some(json!("b")));
        change.changes.insert(
            AUTH_FLAG_KEY.to_string(),
            StorageDelta {
                old_value: Some(json!(true)),
                new_value: Some(json!(false)),
            },
        );
        assert_eq!(translate(&change), Some(PushMessage::Disconnected));
    }
}
