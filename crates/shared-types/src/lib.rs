//! # Shared Types Crate
//!
//! Types shared by every execution context of the wallet bridge.
//!
//! ## Contents
//!
//! - [`wire`]: page-bus envelopes (request, response, push) and the
//!   correlation id that pairs a request with its response.
//! - [`payloads`]: the declared schema of every request kind.
//! - [`background`]: the privileged-channel messages the relay exchanges
//!   with the wallet background.
//! - [`origin`]: normalized page origins and the site allowlist.
//! - [`errors`]: the bridge error taxonomy and its wire codes.
//!
//! ## Design Principles
//!
//! - **Untyped transport, typed edges**: the page bus carries plain JSON;
//!   every receiver parses into these types before acting on a message.
//! - **No secrets on the wire**: nothing in this crate can carry key material.

pub mod background;
pub mod errors;
pub mod origin;
pub mod payloads;
pub mod wire;

pub use background::*;
pub use errors::*;
pub use origin::*;
pub use payloads::*;
pub use wire::*;
