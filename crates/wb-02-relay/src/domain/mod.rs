//! Domain logic for the relay.

pub mod config;
pub mod policy;
pub mod push;
pub mod validation;

pub use config::{ConfigError, RelayConfig};
pub use policy::{decide, ConnectDecision};
pub use push::translate;
pub use validation::{validate, PageRequest, ValidatedRequest, ValidationError};
