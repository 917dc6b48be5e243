//! WB-01 Provider - the wallet API injected into a web page.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      PROVIDER (wb-01)                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  connect / disconnect / sign_* / on / off                   │
//! │         │                                    ▲              │
//! │  ┌──────┴───────────┐              ┌─────────┴──────────┐   │
//! │  │ Connection State │              │   Event Channel    │   │
//! │  └──────┬───────────┘              └─────────▲──────────┘   │
//! │         │                                    │              │
//! │  ┌──────┴──────────────────┐      ┌──────────┴──────────┐   │
//! │  │   Correlation Table     │◄─────┤   Page Listener     │   │
//! │  │ (oneshot per request)   │      │ (responses, pushes) │   │
//! │  └──────┬──────────────────┘      └──────────▲──────────┘   │
//! └─────────┼────────────────────────────────────┼──────────────┘
//!           ▼                                    │
//!                         Page bus
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use wb_01_provider::{ConnectOptions, Provider, ProviderConfig, GLOBAL_PROVIDER};
//!
//! let provider = GLOBAL_PROVIDER.install(Provider::attach(window, ProviderConfig::default())?)?;
//! let account = provider.connect(ConnectOptions::default()).await?;
//! let signed = provider.sign_message(b"hello").await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod inject;
pub mod ipc;
pub mod service;

pub use domain::config::{ConfigError, ProviderConfig};
pub use domain::events::{EventKind, ListenerId, ProviderEvent};
pub use domain::pending::{CorrelationTable, PendingStats};
pub use domain::state::ConnectionState;
pub use domain::transaction::{RawTransaction, TransactionCodecError, WireTransaction};
pub use inject::{InjectError, InjectionSlot, GLOBAL_PROVIDER};
pub use service::{ConnectOptions, Provider, SignedMessage};
pub use shared_types::{BridgeError, ConnectResult, SendOptions, SendResult};
