//! WB-02 Relay - the isolated content script between page and wallet.
//!
//! # Architecture
//!
//! ```text
//!        Page bus                                   Privileged channel
//!           │                                               │
//!  ┌────────▼──────────────────────────────────────────────┼───────┐
//!  │  Validation (window, tag, envelope, per-kind schema)  │       │
//!  │        │                                              │       │
//!  │  Dispatch (PageRequest → handler, one task each) ─────►       │
//!  │        │                  Connect policy              │       │
//!  │  Correlated response ◄────────────────────────────────┤       │
//!  │                                                       │       │
//!  │  Push translation ◄──────────── STORAGE_CHANGED ──────┘       │
//!  └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! The relay is the sole user of the privileged channel. Page origin is
//! always taken from the relay's own window, never from a message.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::config::{ConfigError, RelayConfig};
pub use domain::policy::ConnectDecision;
pub use domain::validation::{PageRequest, ValidationError};
pub use ports::background::{BackgroundPort, ChannelError};
pub use service::Relay;
