// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration documents, version tokens, and agent identities.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// An opaque configuration document: string keys to arbitrary JSON values.
pub type ConfigDocument = serde_json::Map<String, serde_json::Value>;

/// Version reported by a store that has never had a document saved.
///
/// Real tokens are UUIDs, so this can never collide with one.
pub const EMPTY_VERSION: &str = "0";

/// Opaque marker identifying one saved document. Compared for equality only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    /// Mint a token distinct from every token minted before it.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// The fixed empty-store sentinel.
    pub fn empty() -> Self {
        Self(EMPTY_VERSION.to_owned())
    }

    pub fn is_empty_sentinel(&self) -> bool {
        self.0 == EMPTY_VERSION
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for VersionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VersionToken {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document paired with the version it was saved under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedDocument {
    pub config: ConfigDocument,
    pub version: VersionToken,
}

impl VersionedDocument {
    /// What a store with zero saves reports.
    pub fn empty() -> Self {
        Self { config: ConfigDocument::new(), version: VersionToken::empty() }
    }
}

/// Identity minted for an agent at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub agent_id: String,
    pub name: String,
    pub registered_at_ms: u64,
}

impl AgentIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            agent_id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            registered_at_ms: epoch_ms(),
        }
    }
}

/// Where and how often a registered agent polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollContract {
    pub poll_url: String,
    pub poll_interval_seconds: u64,
}

impl PollContract {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

/// Return current epoch millis.
pub fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
