//! Outbound ports for the relay.

pub mod background;

pub use background::{BackgroundPort, ChannelError};
