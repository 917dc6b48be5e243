//! Correlation id generation.
//!
//! Ids combine the wall-clock millisecond with random low bits, and are
//! forced strictly increasing within the process, so two calls in the same
//! millisecond can never collide. The result stays below 2^53 so a page
//! script reads it back exactly.

use rand::Rng;
use shared_types::{CorrelationId, MAX_SAFE_INTEGER};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Number of random values mixed into each millisecond.
const JITTER_SPAN: u64 = 1 << 10;

/// Process-wide generator shared by every provider.
static PROCESS_IDS: CorrelationIdGenerator = CorrelationIdGenerator::new();

/// Next process-unique correlation id.
pub fn next_correlation_id() -> CorrelationId {
    PROCESS_IDS.next()
}

/// Strictly increasing, timestamp-seeded id source.
#[derive(Debug)]
pub struct CorrelationIdGenerator {
    last: AtomicU64,
}

impl CorrelationIdGenerator {
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Generate the next id.
    pub fn next(&self) -> CorrelationId {
        let candidate = Self::candidate();
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let next = candidate.max(last.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return CorrelationId::from_raw(next),
                Err(actual) => last = actual,
            }
        }
    }

    fn candidate() -> u64 {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let jitter = rand::thread_rng().gen_range(0..JITTER_SPAN);
        millis
            .saturating_mul(JITTER_SPAN)
            .saturating_add(jitter)
            .min(MAX_SAFE_INTEGER)
    }
}

impl Default for CorrelationIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
