//! The wallet background context.

pub mod wallet_core;
pub mod dev;
pub mod host;

pub use wallet_core::{CoreSignature, WalletCore};
pub use dev::DevWalletCore;
pub use host::BackgroundHost;
