//! Connect policy.
//!
//! | session | origin allowlisted | outcome |
//! |---|---|---|
//! | authenticated | yes | connect at once with the session address |
//! | authenticated | no | one approval request |
//! | not authenticated | - | one approval request |

use shared_types::{Origin, SessionFlags};

/// What a `CONNECT` needs after reading the session flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectDecision {
    /// Trusted site with a live session.
    Trusted { address: String },
    /// The user must approve the connection.
    NeedsApproval,
}

/// Decide how to handle a connect from `origin`.
pub fn decide(flags: &SessionFlags, origin: &Origin) -> ConnectDecision {
    if !flags.authenticated || !flags.allowed_sites.contains(origin) {
        return ConnectDecision::NeedsApproval;
    }
    match flags.address.as_deref() {
        Some(address) if !address.is_empty() => ConnectDecision::Trusted {
            address: address.to_string(),
        },
        // Session without an active account
        _ => ConnectDecision::NeedsApproval,
    }
}
