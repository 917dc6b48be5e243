//! Correlation Table - pairs page-bus responses with waiting callers.
//!
//! Flow:
//! 1. `send()` draws a fresh `CorrelationId` and registers a pending entry
//! 2. The request is posted on the page bus
//! 3. The page listener hands every parsed response to `complete()`
//! 4. `send()` returns the outcome, or `Timeout` once the window elapses
//!
//! An entry settles at most once: whichever of `complete()` or the timeout
//! removes it from the map first decides the outcome.

use crate::domain::config::ProviderConfig;
use crate::domain::correlation::next_correlation_id;
use dashmap::DashMap;
use shared_bus::MessagePoster;
use shared_types::{BridgeError, CorrelationId, RequestKind, WireRequest, WireResponse};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Outcome delivered to a waiting caller.
pub type Outcome = Result<serde_json::Value, BridgeError>;

/// A request waiting for its response.
struct PendingEntry {
    /// Channel to settle the caller
    sender: oneshot::Sender<Outcome>,
    /// Only a response of this kind may settle the entry
    expected: RequestKind,
    /// When the request was registered, on the clock `send` waits on
    created_at: Instant,
}

/// Counters for the correlation table.
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total requests registered
    pub registered: AtomicU64,
    /// Total requests settled by a response
    pub completed: AtomicU64,
    /// Total requests rejected by timeout
    pub timeouts: AtomicU64,
    /// Total requests withdrawn before a response (post failure, sweep)
    pub cancelled: AtomicU64,
}

/// In-flight request table of one provider.
pub struct CorrelationTable {
    /// Map of correlation id to pending entry
    pending: DashMap<CorrelationId, PendingEntry>,
    /// Where requests are posted
    poster: Arc<dyn MessagePoster>,
    /// Tag stamped into every request
    source_tag: String,
    /// Response window
    timeout: Duration,
    /// Statistics
    stats: PendingStats,
}

impl CorrelationTable {
    pub fn new(poster: Arc<dyn MessagePoster>, config: &ProviderConfig) -> Self {
        Self {
            pending: DashMap::new(),
            poster,
            source_tag: config.source_tag.clone(),
            timeout: config.request_timeout(),
            stats: PendingStats::default(),
        }
    }

    /// Post a request and wait for its outcome.
    pub async fn send(&self, kind: RequestKind, data: serde_json::Value) -> Outcome {
        let (correlation_id, mut rx) = self.register(kind);

        let request = WireRequest::new(kind, data, correlation_id, self.source_tag.as_str());
        let message = match serde_json::to_value(&request) {
            Ok(message) => message,
            Err(e) => {
                self.cancel(&correlation_id);
                return Err(BridgeError::Malformed(format!(
                    "{kind} request could not be encoded: {e}"
                )));
            }
        };

        if let Err(e) = self.poster.post_message(message) {
            self.cancel(&correlation_id);
            return Err(BridgeError::ChannelFailure(format!(
                "{kind} request could not be posted: {e}"
            )));
        }

        debug!(correlation_id = %correlation_id, kind = %kind, "Posted request");

        match tokio::time::timeout(self.timeout, &mut rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(BridgeError::ChannelFailure(format!(
                "{kind} request was withdrawn before a response arrived"
            ))),
            Err(_) => {
                if self.pending.remove(&correlation_id).is_none() {
                    // A response won the race against the timer
                    if let Ok(outcome) = rx.try_recv() {
                        return outcome;
                    }
                }
                self.stats.timeouts.fetch_add(1, Ordering::Relaxed);
                warn!(
                    correlation_id = %correlation_id,
                    kind = %kind,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Request timed out"
                );
                Err(BridgeError::Timeout(format!(
                    "{kind} received no response within {} ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }

    /// Register a pending entry and get a receiver for its outcome.
    fn register(&self, kind: RequestKind) -> (CorrelationId, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        let mut correlation_id = next_correlation_id();
        while self.pending.contains_key(&correlation_id) {
            correlation_id = next_correlation_id();
        }

        self.pending.insert(
            correlation_id,
            PendingEntry {
                sender: tx,
                expected: kind,
                created_at: Instant::now(),
            },
        );
        self.stats.registered.fetch_add(1, Ordering::Relaxed);

        (correlation_id, rx)
    }

    /// Settle the pending entry a response belongs to.
    ///
    /// Returns true if an entry was settled. Unknown, already-settled and
    /// wrong-kind responses are ignored.
    pub fn complete(&self, response: WireResponse) -> bool {
        let correlation_id = response.correlation_id;
        let Some(kind) = response.request_kind() else {
            debug!(correlation_id = %correlation_id, "Response of unknown type ignored");
            return false;
        };

        let Some((_, entry)) = self
            .pending
            .remove_if(&correlation_id, |_, entry| entry.expected == kind)
        else {
            if self.pending.contains_key(&correlation_id) {
                debug!(
                    correlation_id = %correlation_id,
                    kind = %kind,
                    "Response kind does not match pending request, ignored"
                );
            } else {
                debug!(
                    correlation_id = %correlation_id,
                    "Response for unknown or settled correlation id"
                );
            }
            return false;
        };

        let elapsed = entry.created_at.elapsed();
        if entry.sender.send(response.into_outcome()).is_err() {
            // Caller stopped waiting
            self.stats.cancelled.fetch_add(1, Ordering::Relaxed);
            debug!(correlation_id = %correlation_id, "Pending caller dropped");
            return false;
        }

        self.stats.completed.fetch_add(1, Ordering::Relaxed);
        debug!(
            correlation_id = %correlation_id,
            kind = %kind,
            response_time_ms = elapsed.as_millis() as u64,
            "Completed pending request"
        );
        true
    }

    /// Remove entries whose caller is gone.
    ///
    /// An entry with a live caller is left to that caller's timer, so a
    /// sweep never turns a `Timeout` into a withdrawal. Returns the number
    /// of entries removed.
    pub fn remove_expired(&self) -> usize {
        let mut removed = 0;

        self.pending.retain(|id, entry| {
            if entry.sender.is_closed() {
                debug!(
                    correlation_id = %id,
                    kind = %entry.expected,
                    age_ms = entry.created_at.elapsed().as_millis() as u64,
                    "Sweeping abandoned pending entry"
                );
                removed += 1;
                false
            } else {
                true
            }
        });

        self.stats
            .cancelled
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Withdraw a pending entry without settling it.
    pub fn cancel(&self, correlation_id: &CorrelationId) -> bool {
        if self.pending.remove(correlation_id).is_some() {
            self.stats.cancelled.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Number of in-flight requests
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if a correlation id is pending
    pub fn is_pending(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.contains_key(correlation_id)
    }

    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}

/// Background task sweeping abandoned entries.
pub async fn cleanup_task(table: Arc<CorrelationTable>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let removed = table.remove_expired();
        if removed > 0 {
            debug!(removed = removed, "Swept abandoned pending requests");
        }
    }
}
