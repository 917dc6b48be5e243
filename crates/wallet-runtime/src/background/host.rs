//! Background host - serves privileged-channel requests from a wallet core.

use crate::adapters::channel_background::Envelope;
use crate::background::wallet_core::WalletCore;
use serde_json::json;
use shared_types::{BackgroundReply, BackgroundRequest};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Dispatches each request to the wallet core on its own task.
pub struct BackgroundHost {
    core: Arc<dyn WalletCore>,
}

impl BackgroundHost {
    pub fn new(core: Arc<dyn WalletCore>) -> Self {
        Self { core }
    }

    /// Serve requests until every sender is gone.
    pub async fn run(self, mut inbox: mpsc::Receiver<Envelope>) {
        while let Some((request, reply_to)) = inbox.recv().await {
            let core = Arc::clone(&self.core);
            tokio::spawn(async move {
                let name = request.name();
                let reply = handle(core.as_ref(), request).await;
                if reply_to.send(reply).is_err() {
                    debug!(request = name, "Requester gone before reply");
                }
            });
        }
        debug!("Privileged channel closed, stopping background host");
    }
}

/// Answer one request.
pub async fn handle(core: &dyn WalletCore, request: BackgroundRequest) -> BackgroundReply {
    let name = request.name();
    let result = match request {
        BackgroundRequest::GetSessionFlags => {
            serde_json::to_value(core.session_flags()).map_err(|e| e.to_string())
        }
        BackgroundRequest::RequestConnectionApproval { origin } => core
            .approve_connection(&origin)
            .await
            .map(|address| json!({ "address": address })),
        BackgroundRequest::Disconnect { origin } => {
            core.disconnect(&origin).await;
            Ok(json!({}))
        }
        BackgroundRequest::SignTransaction {
            origin,
            transaction,
        } => match unhex(&transaction) {
            Ok(tx) => core
                .sign_transaction(&origin, &tx)
                .await
                .map(|signed| json!({ "transaction": hex::encode(signed) })),
            Err(e) => Err(e),
        },
        BackgroundRequest::SignAllTransactions {
            origin,
            transactions,
        } => match transactions.iter().map(|tx| unhex(tx)).collect::<Result<Vec<_>, _>>() {
            Ok(txs) => core.sign_all_transactions(&origin, &txs).await.map(|signed| {
                json!({ "transactions": signed.iter().map(hex::encode).collect::<Vec<_>>() })
            }),
            Err(e) => Err(e),
        },
        BackgroundRequest::SignMessage { origin, message } => match unhex(&message) {
            Ok(bytes) => core.sign_message(&origin, &bytes).await.map(|signed| {
                json!({ "signature": hex::encode(signed.signature), "address": signed.address })
            }),
            Err(e) => Err(e),
        },
        BackgroundRequest::SignAndSendTransaction {
            origin,
            transaction,
            options,
        } => match unhex(&transaction) {
            Ok(tx) => core
                .sign_and_send(&origin, &tx, &options)
                .await
                .map(|signature| json!({ "signature": signature })),
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(data) => BackgroundReply::ok(data),
        Err(reason) => {
            warn!(request = name, reason = %reason, "Wallet denied request");
            BackgroundReply::denied(reason)
        }
    }
}

fn unhex(value: &str) -> Result<Vec<u8>, String> {
    hex::decode(value).map_err(|e| format!("invalid hex: {e}"))
}
