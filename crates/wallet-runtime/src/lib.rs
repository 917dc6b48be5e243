//! # Wallet Runtime Library
//!
//! Runs the three execution contexts of the bridge in one process and
//! exposes them for tests. The binary entry point is `main.rs`.
//!
//! - `config/` - TOML and environment configuration
//! - `background/` - wallet core trait, development wallet, request host
//! - `adapters/` - the privileged channel behind the relay's background port
//! - `wiring/` - assembles bus, relay and background into a [`WalletBridge`]

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod background;
pub mod config;
pub mod wiring;

pub use background::{BackgroundHost, CoreSignature, DevWalletCore, WalletCore};
pub use config::{BridgeConfig, ConfigError, PageConfig, WalletConfig};
pub use wiring::{RuntimeError, WalletBridge};
