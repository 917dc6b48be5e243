//! The wallet behind the privileged channel.
//!
//! Keys, consent prompts and the network live behind this trait. A denial
//! is returned as `Err(reason)`; the host turns it into a failed reply.

use async_trait::async_trait;
use shared_types::{Origin, SendOptions, SessionFlags};

/// A signed message and the signing address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreSignature {
    pub signature: Vec<u8>,
    pub address: String,
}

#[async_trait]
pub trait WalletCore: Send + Sync {
    /// Current session flags.
    fn session_flags(&self) -> SessionFlags;

    /// Prompt the user to connect `origin`. Returns the approved address.
    async fn approve_connection(&self, origin: &Origin) -> Result<String, String>;

    /// Forget the connection of `origin`.
    async fn disconnect(&self, origin: &Origin);

    async fn sign_transaction(&self, origin: &Origin, tx: &[u8]) -> Result<Vec<u8>, String>;

    async fn sign_all_transactions(
        &self,
        origin: &Origin,
        txs: &[Vec<u8>],
    ) -> Result<Vec<Vec<u8>>, String> {
        let mut signed = Vec::with_capacity(txs.len());
        for tx in txs {
            signed.push(self.sign_transaction(origin, tx).await?);
        }
        Ok(signed)
    }

    async fn sign_message(&self, origin: &Origin, message: &[u8]) -> Result<CoreSignature, String>;

    /// Sign and submit. Returns the network signature of the transaction.
    async fn sign_and_send(
        &self,
        origin: &Origin,
        tx: &[u8],
        options: &SendOptions,
    ) -> Result<String, String>;
}
