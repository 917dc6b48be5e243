//! Privileged channel over Tokio channels.
//!
//! Requests travel on an mpsc queue, each with a oneshot for its reply.
//! Storage changes are broadcast.

use async_trait::async_trait;
use shared_types::{BackgroundReply, BackgroundRequest, StorageChange};
use tokio::sync::{broadcast, mpsc, oneshot};
use wb_02_relay::{BackgroundPort, ChannelError};

/// A request and where to send its reply.
pub type Envelope = (BackgroundRequest, oneshot::Sender<BackgroundReply>);

/// The relay's end of the privileged channel.
pub struct ChannelBackground {
    requests: mpsc::Sender<Envelope>,
    changes: broadcast::Sender<StorageChange>,
}

impl ChannelBackground {
    pub fn new(
        requests: mpsc::Sender<Envelope>,
        changes: broadcast::Sender<StorageChange>,
    ) -> Self {
        Self { requests, changes }
    }
}

#[async_trait]
impl BackgroundPort for ChannelBackground {
    async fn request(&self, request: BackgroundRequest) -> Result<BackgroundReply, ChannelError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.requests
            .send((request, reply_tx))
            .await
            .map_err(|_| ChannelError::Closed)?;
        reply_rx.await.map_err(|_| ChannelError::NoReply)
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}

/// Create a request queue pair.
pub fn privileged_channel(buffer: usize) -> (mpsc::Sender<Envelope>, mpsc::Receiver<Envelope>) {
    mpsc::channel(buffer)
}
