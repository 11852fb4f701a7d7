// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP clients for the controller (upstream) and the worker (downstream).

use std::time::Duration;

use reqwest::Client;

use crate::agent::{BoxFuture, Downstream, PollError, Registration, Upstream};
use crate::document::{AgentIdentity, ConfigDocument, PollContract, VersionedDocument};
use crate::net::{http_client, join_url};
use crate::transport::{
    ConfigRequest, ConfigResponse, RegisterRequest, RegisterResponse, CONFIG_PATH, REGISTER_PATH,
};

/// Talks to the controller with the shared agent token.
pub struct HttpUpstream {
    base_url: String,
    token: String,
    client: Client,
}

impl HttpUpstream {
    pub fn new(base_url: String, token: String, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self { base_url, token, client: http_client(timeout)? })
    }

    async fn register_inner(&self, name: &str) -> anyhow::Result<Registration> {
        let resp = self
            .client
            .post(join_url(&self.base_url, REGISTER_PATH))
            .bearer_auth(&self.token)
            .json(&RegisterRequest { name: name.to_owned() })
            .send()
            .await?
            .error_for_status()?;
        let body: RegisterResponse = resp.json().await?;
        Ok(Registration {
            identity: AgentIdentity {
                agent_id: body.agent_id,
                name: name.to_owned(),
                registered_at_ms: body.registered_at_ms,
            },
            contract: PollContract {
                poll_url: body.poll_url,
                poll_interval_seconds: body.poll_interval_seconds,
            },
        })
    }

    async fn fetch_inner(&self, poll_url: &str) -> Result<VersionedDocument, PollError> {
        let resp = self
            .client
            .get(join_url(&self.base_url, poll_url))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| PollError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PollError::Status(status.as_u16()));
        }
        let bytes = resp.bytes().await.map_err(|e| PollError::Transport(e.to_string()))?;
        let body: ConfigResponse =
            serde_json::from_slice(&bytes).map_err(|e| PollError::Decode(e.to_string()))?;
        Ok(VersionedDocument { config: body.config, version: body.version })
    }
}

impl Upstream for HttpUpstream {
    fn register<'a>(&'a self, name: &'a str) -> BoxFuture<'a, anyhow::Result<Registration>> {
        Box::pin(self.register_inner(name))
    }

    fn fetch<'a>(
        &'a self,
        poll_url: &'a str,
    ) -> BoxFuture<'a, Result<VersionedDocument, PollError>> {
        Box::pin(self.fetch_inner(poll_url))
    }
}

/// Pushes documents to the paired worker. The worker API is unauthenticated.
pub struct HttpDownstream {
    base_url: String,
    client: Client,
}

impl HttpDownstream {
    pub fn new(base_url: String, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self { base_url, client: http_client(timeout)? })
    }

    async fn push_inner(&self, config: &ConfigDocument) -> anyhow::Result<()> {
        let resp = self
            .client
            .post(join_url(&self.base_url, CONFIG_PATH))
            .json(&ConfigRequest { config: config.clone() })
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("worker rejected config with status {}", status.as_u16());
        }
        Ok(())
    }
}

impl Downstream for HttpDownstream {
    fn push<'a>(&'a self, config: &'a ConfigDocument) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(self.push_inner(config))
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
