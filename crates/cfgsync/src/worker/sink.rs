// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hot-swappable holder of the worker's active configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::document::ConfigDocument;
use crate::error::ErrorCode;

/// Key the hit action reads its target address from.
pub const ACTION_URL_KEY: &str = "url";

/// Why the hit action could not produce a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// The active configuration has no [`ACTION_URL_KEY`].
    MissingKey,
    /// [`ACTION_URL_KEY`] is present but not a string.
    WrongType,
    /// The outbound request or reading its body failed.
    TransportFailure(String),
}

impl ActionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MissingKey => ErrorCode::MissingKey,
            Self::WrongType => ErrorCode::WrongType,
            Self::TransportFailure(_) => ErrorCode::UpstreamError,
        }
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingKey => write!(f, "{ACTION_URL_KEY} not configured"),
            Self::WrongType => write!(f, "configured {ACTION_URL_KEY} is not a string"),
            Self::TransportFailure(e) => write!(f, "request failed: {e}"),
        }
    }
}

impl std::error::Error for ActionError {}

/// The worker's configuration cell.
///
/// Updates swap the whole document under the write lock; readers clone the
/// `Arc` under the read lock and drop the lock before doing any I/O, so an
/// in-flight action keeps the document it started with.
pub struct ConfigSink {
    active: RwLock<Arc<ConfigDocument>>,
    client: reqwest::Client,
}

impl ConfigSink {
    /// Create an empty sink whose hit action times out after `timeout`.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = crate::net::http_client(timeout)?;
        Ok(Self { active: RwLock::new(Arc::new(ConfigDocument::new())), client })
    }

    /// Replace the active configuration wholesale.
    pub fn update(&self, config: ConfigDocument) {
        let config = Arc::new(config);
        *self.active.write() = config;
    }

    /// The active configuration as of this instant.
    pub fn snapshot(&self) -> Arc<ConfigDocument> {
        Arc::clone(&self.active.read())
    }

    /// Resolve the hit target from the active configuration.
    pub fn target_url(&self) -> Result<String, ActionError> {
        let config = self.snapshot();
        match config.get(ACTION_URL_KEY) {
            None => Err(ActionError::MissingKey),
            Some(serde_json::Value::String(url)) => Ok(url.clone()),
            Some(_) => Err(ActionError::WrongType),
        }
    }

    /// GET the configured target and return its raw body, whatever the status.
    pub async fn execute_action(&self) -> Result<String, ActionError> {
        let url = self.target_url()?;
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ActionError::TransportFailure(e.to_string()))?;
        tracing::debug!(url = %url, status = %resp.status(), "hit target responded");
        resp.text().await.map_err(|e| ActionError::TransportFailure(e.to_string()))
    }
}

#[cfg(test)]
#[path = "sink_tests.rs"]
mod tests;
