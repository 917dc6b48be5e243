//! Port implementations.

pub mod channel_background;

pub use channel_background::{privileged_channel, ChannelBackground, Envelope};
