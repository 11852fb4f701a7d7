// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller role: the version store and registration authority.

pub mod persist;
pub mod store;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::ControllerConfig;
use crate::document::{AgentIdentity, ConfigDocument, PollContract, VersionToken, VersionedDocument};
use crate::transport::controller::{build_controller_router, ControllerState};

use self::store::{AgentRegistry, ConfigStore, FileStore, MemoryStore};

/// Answers "what is latest" and "register me".
pub struct Authority {
    configs: Arc<dyn ConfigStore>,
    agents: Arc<dyn AgentRegistry>,
    contract: PollContract,
}

impl Authority {
    pub fn new(
        configs: Arc<dyn ConfigStore>,
        agents: Arc<dyn AgentRegistry>,
        contract: PollContract,
    ) -> Self {
        Self { configs, agents, contract }
    }

    /// Authority over a fresh in-memory store.
    pub fn in_memory(contract: PollContract) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(store.clone(), store, contract)
    }

    /// Build the authority described by the controller config.
    pub fn open(config: &ControllerConfig) -> anyhow::Result<Self> {
        let contract = PollContract {
            poll_url: config.poll_path.clone(),
            poll_interval_seconds: config.poll_interval_secs,
        };
        match config.state_file {
            Some(ref path) => {
                let store = Arc::new(FileStore::open(path)?);
                tracing::info!(path = %path.display(), "using file-backed controller state");
                Ok(Self::new(store.clone(), store, contract))
            }
            None => Ok(Self::in_memory(contract)),
        }
    }

    pub fn contract(&self) -> &PollContract {
        &self.contract
    }

    /// Save a new authoritative document.
    pub fn save(&self, config: ConfigDocument) -> anyhow::Result<VersionToken> {
        let keys = config.len();
        let version = self.configs.save(config)?;
        tracing::info!(version = %version, keys, "configuration saved");
        Ok(version)
    }

    pub fn fetch_latest(&self) -> anyhow::Result<VersionedDocument> {
        self.configs.fetch_latest()
    }

    /// Mint an identity for `name` and hand back the poll contract.
    pub fn register(&self, name: &str) -> anyhow::Result<(AgentIdentity, PollContract)> {
        let identity = self.agents.register(name)?;
        tracing::info!(agent_id = %identity.agent_id, name, "agent registered");
        Ok((identity, self.contract.clone()))
    }

    pub fn agent(&self, agent_id: &str) -> anyhow::Result<Option<AgentIdentity>> {
        self.agents.get(agent_id)
    }

    pub fn agents(&self) -> anyhow::Result<Vec<AgentIdentity>> {
        self.agents.list()
    }
}

/// Run the controller until `shutdown` fires.
pub async fn run(config: ControllerConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let authority = Authority::open(&config)?;
    let state = Arc::new(ControllerState::new(authority, &config));
    let router = build_controller_router(state);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(
        poll_path = %config.poll_path,
        poll_interval_secs = config.poll_interval_secs,
        "controller listening on {addr}"
    );
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;
    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
