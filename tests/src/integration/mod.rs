//! Integration flows across provider, relay and background.

pub mod bridge_flows;
pub mod connect_policy;
