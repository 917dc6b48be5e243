//! Development wallet.
//!
//! Holds no key material. "Signatures" are SHA-256 digests over the
//! address and the payload, which is enough to exercise the bridge end to
//! end. Session changes are published as storage changes, the way a
//! browser wallet's storage would report them.

use crate::background::wallet_core::{CoreSignature, WalletCore};
use crate::config::WalletConfig;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use sha2::{Digest, Sha256};
use shared_types::{
    Origin, OriginError, SendOptions, SessionFlags, SiteAllowlist, StorageChange,
    ADDRESS_FLAG_KEY, AUTH_FLAG_KEY,
};
use tokio::sync::broadcast;
use tracing::{debug, info};

const CHANGE_CAPACITY: usize = 64;

#[derive(Debug)]
struct DevSession {
    authenticated: bool,
    address: String,
    allowed_sites: SiteAllowlist,
}

/// In-memory wallet driven by `[wallet]` configuration.
pub struct DevWalletCore {
    session: Mutex<DevSession>,
    auto_approve: bool,
    changes: broadcast::Sender<StorageChange>,
}

impl DevWalletCore {
    pub fn new(config: &WalletConfig) -> Result<Self, OriginError> {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Ok(Self {
            session: Mutex::new(DevSession {
                authenticated: config.authenticated,
                address: config.address.clone(),
                allowed_sites: config.allowlist()?,
            }),
            auto_approve: config.auto_approve,
            changes,
        })
    }

    /// Storage change sender, for the privileged channel.
    pub fn changes(&self) -> broadcast::Sender<StorageChange> {
        self.changes.clone()
    }

    /// Switch the active account.
    pub fn switch_account(&self, address: &str) {
        let old = {
            let mut session = self.session.lock();
            std::mem::replace(&mut session.address, address.to_string())
        };
        if old != address {
            info!(address = %address, "Dev wallet switched account");
            self.publish(StorageChange::single(
                ADDRESS_FLAG_KEY,
                Some(json!(old)),
                Some(json!(address)),
            ));
        }
    }

    /// End the session.
    pub fn lock(&self) {
        let was = std::mem::replace(&mut self.session.lock().authenticated, false);
        if was {
            info!("Dev wallet locked");
            self.publish(StorageChange::single(
                AUTH_FLAG_KEY,
                Some(json!(true)),
                Some(json!(false)),
            ));
        }
    }

    fn publish(&self, change: StorageChange) {
        // Nobody listening is fine
        let _ = self.changes.send(change);
    }

    /// Address to sign with, if `origin` may use the wallet.
    fn signer_for(&self, origin: &Origin) -> Result<String, String> {
        let session = self.session.lock();
        if !session.authenticated {
            return Err("wallet is locked".into());
        }
        if !session.allowed_sites.contains(origin) {
            return Err(format!("{origin} is not connected"));
        }
        Ok(session.address.clone())
    }
}

fn digest(domain: &str, address: &str, payload: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(domain.as_bytes());
    hasher.update(address.as_bytes());
    hasher.update(payload);
    hasher.finalize().to_vec()
}

#[async_trait]
impl WalletCore for DevWalletCore {
    fn session_flags(&self) -> SessionFlags {
        let session = self.session.lock();
        SessionFlags {
            authenticated: session.authenticated,
            address: Some(session.address.clone()),
            allowed_sites: session.allowed_sites.clone(),
        }
    }

    async fn approve_connection(&self, origin: &Origin) -> Result<String, String> {
        if !self.auto_approve {
            debug!(origin = %origin, "Dev wallet declined connection");
            return Err("User rejected the request".into());
        }

        let (address, unlocked) = {
            let mut session = self.session.lock();
            session.allowed_sites.insert(origin.clone());
            let unlocked = !std::mem::replace(&mut session.authenticated, true);
            (session.address.clone(), unlocked)
        };
        if unlocked {
            self.publish(StorageChange::single(
                AUTH_FLAG_KEY,
                Some(json!(false)),
                Some(json!(true)),
            ));
        }
        info!(origin = %origin, address = %address, "Dev wallet approved connection");
        Ok(address)
    }

    async fn disconnect(&self, origin: &Origin) {
        self.session.lock().allowed_sites.remove(origin);
        debug!(origin = %origin, "Dev wallet forgot site");
    }

    async fn sign_transaction(&self, origin: &Origin, tx: &[u8]) -> Result<Vec<u8>, String> {
        let address = self.signer_for(origin)?;
        let mut signed = tx.to_vec();
        signed.extend(digest("tx", &address, tx));
        Ok(signed)
    }

    async fn sign_message(&self, origin: &Origin, message: &[u8]) -> Result<CoreSignature, String> {
        let address = self.signer_for(origin)?;
        Ok(CoreSignature {
            signature: digest("msg", &address, message),
            address,
        })
    }

    async fn sign_and_send(
        &self,
        origin: &Origin,
        tx: &[u8],
        options: &SendOptions,
    ) -> Result<String, String> {
        let signed = self.sign_transaction(origin, tx).await?;
        debug!(skip_preflight = options.skip_preflight, "Dev wallet submitting transaction");
        Ok(hex::encode(digest("send", "", &signed)))
    }
}
