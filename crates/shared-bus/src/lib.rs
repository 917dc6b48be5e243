//! # Shared Bus - The Page Message Bus
//!
//! Models the page's `window.postMessage` channel: an insecure,
//! unauthenticated broadcast every script in the window can write to and
//! read from.
//!
//! ```text
//! ┌──────────────┐  post_message()   ┌──────────────┐
//! │   Provider   │ ────────┐         │    Relay     │
//! │ (page world) │         │         │ (isolated)   │
//! └──────────────┘         ▼         └──────────────┘
//!        ↑           ┌──────────┐           ↑
//!        └───────────│ PageBus  │───────────┘
//!         subscribe()└──────────┘ subscribe()
//!                          ↑
//!                 any other script / iframe
//! ```
//!
//! ## Properties
//!
//! - **Untyped payloads:** message data is plain JSON; receivers validate.
//! - **Window identity:** each message is stamped with the posting window's
//!   id and origin, which the poster cannot forge.
//! - **Everyone hears everything:** subscribers receive their own posts too.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod message;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use message::{WindowId, WindowMessage};
pub use publisher::{BusError, MessagePoster, PageBus, PageWindow};
pub use subscriber::{SubscriptionError, WindowSubscription};

/// Maximum messages to buffer per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
