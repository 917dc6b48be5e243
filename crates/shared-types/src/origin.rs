//! # Page Origins
//!
//! Origins are compared in their normalized ASCII serialization
//! (`scheme://host[:port]`, lower-case host, default port removed), so
//! `https://DApp.example:443/swap` and `https://dapp.example` are the same
//! site for allowlist purposes.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

/// Errors from origin parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OriginError {
    #[error("Invalid origin {input:?}: {reason}")]
    Invalid { input: String, reason: String },

    /// Schemes such as `file:` or `data:` have no comparable origin.
    #[error("Origin of {0:?} is opaque")]
    Opaque(String),
}

/// A normalized web origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Origin(String);

impl Origin {
    /// Parse and normalize an origin (any URL is accepted; its path is dropped).
    pub fn parse(input: &str) -> Result<Self, OriginError> {
        let url = Url::parse(input.trim()).map_err(|e| OriginError::Invalid {
            input: input.to_string(),
            reason: e.to_string(),
        })?;

        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(OriginError::Opaque(input.to_string()));
        }
        Ok(Self(origin.ascii_serialization()))
    }

    /// The normalized origin string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Origin {
    type Err = OriginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for Origin {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Origin::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Origins previously granted wallet-connection consent.
///
/// Owned by the background; the relay only reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteAllowlist(BTreeSet<Origin>);

impl SiteAllowlist {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the origin was granted consent.
    #[must_use]
    pub fn contains(&self, origin: &Origin) -> bool {
        self.0.contains(origin)
    }

    /// Grant an origin. Returns false if it was already present.
    pub fn insert(&mut self, origin: Origin) -> bool {
        self.0.insert(origin)
    }

    /// Revoke an origin. Returns false if it was not present.
    pub fn remove(&mut self, origin: &Origin) -> bool {
        self.0.remove(origin)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Origin> for SiteAllowlist {
    fn from_iter<I: IntoIterator<Item = Origin>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
