//! Page bus integration.

pub mod listener;

pub use listener::PageListener;
