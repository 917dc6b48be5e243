//! # Wallet Bridge Test Suite
//!
//! Cross-context flows: a real provider, relay and background host wired
//! through the page bus and the privileged channel.
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── bridge_flows.rs     # request/response, pushes, timeouts
//!     └── connect_policy.rs   # trusted, approval and denial paths
//! ```
//!
//! ```bash
//! cargo test -p wb-tests
//! cargo test -p wb-tests integration::connect_policy
//! ```

pub mod integration;
