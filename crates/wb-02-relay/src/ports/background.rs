//! Privileged channel to the wallet background.

use async_trait::async_trait;
use shared_types::{BackgroundReply, BackgroundRequest, StorageChange};
use thiserror::Error;
use tokio::sync::broadcast;

/// Transport failures of the privileged channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("privileged channel closed")]
    Closed,

    #[error("background dropped the request without replying")]
    NoReply,

    #[error("send failed: {0}")]
    SendFailed(String),
}

/// The relay's view of the background.
#[async_trait]
pub trait BackgroundPort: Send + Sync {
    /// Send a request and wait for the reply.
    async fn request(&self, request: BackgroundRequest) -> Result<BackgroundReply, ChannelError>;

    /// Subscribe to `STORAGE_CHANGED` pushes.
    fn subscribe_changes(&self) -> broadcast::Receiver<StorageChange>;
}
