//! Domain types for the provider.

pub mod config;
pub mod correlation;
pub mod events;
pub mod pending;
pub mod state;
pub mod transaction;

pub use config::{ConfigError, ProviderConfig};
pub use correlation::{next_correlation_id, CorrelationIdGenerator};
pub use events::{EventChannel, EventKind, ListenerId, ProviderEvent};
pub use pending::{cleanup_task, CorrelationTable, PendingStats};
pub use state::ConnectionState;
pub use transaction::{RawTransaction, TransactionCodecError, WireTransaction};
