// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version store and agent registry backends.
//!
//! Both backends hold the write lock across the whole save (including the
//! file write for [`FileStore`]), so a `fetch_latest` issued after `save`
//! returns always observes it.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::controller::persist::{self, PersistedState, StoredConfig};
use crate::document::{epoch_ms, AgentIdentity, ConfigDocument, VersionToken, VersionedDocument};

/// Authoritative holder of the current configuration document.
pub trait ConfigStore: Send + Sync {
    /// Store `config` under a freshly minted version and return that version.
    fn save(&self, config: ConfigDocument) -> anyhow::Result<VersionToken>;

    /// The most recent document, or [`VersionedDocument::empty`] if none was saved.
    fn fetch_latest(&self) -> anyhow::Result<VersionedDocument>;
}

/// Registry of agents that have registered with the controller.
pub trait AgentRegistry: Send + Sync {
    /// Mint and record a new identity. Every call yields a new id.
    fn register(&self, name: &str) -> anyhow::Result<AgentIdentity>;

    fn get(&self, agent_id: &str) -> anyhow::Result<Option<AgentIdentity>>;

    /// All registered agents, oldest first.
    fn list(&self) -> anyhow::Result<Vec<AgentIdentity>>;
}

impl PersistedState {
    fn latest(&self) -> VersionedDocument {
        match self.configs.last() {
            Some(stored) => VersionedDocument {
                config: stored.config.clone(),
                version: stored.version.clone(),
            },
            None => VersionedDocument::empty(),
        }
    }

    fn find_agent(&self, agent_id: &str) -> Option<AgentIdentity> {
        self.agents.iter().find(|a| a.agent_id == agent_id).cloned()
    }
}

fn stamp(config: ConfigDocument) -> StoredConfig {
    StoredConfig { config, version: VersionToken::generate(), created_at_ms: epoch_ms() }
}

/// In-process store. Keeps only the latest document.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<PersistedState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryStore {
    fn save(&self, config: ConfigDocument) -> anyhow::Result<VersionToken> {
        let stored = stamp(config);
        let version = stored.version.clone();
        self.state.write().configs = vec![stored];
        Ok(version)
    }

    fn fetch_latest(&self) -> anyhow::Result<VersionedDocument> {
        Ok(self.state.read().latest())
    }
}

impl AgentRegistry for MemoryStore {
    fn register(&self, name: &str) -> anyhow::Result<AgentIdentity> {
        let identity = AgentIdentity::new(name);
        self.state.write().agents.push(identity.clone());
        Ok(identity)
    }

    fn get(&self, agent_id: &str) -> anyhow::Result<Option<AgentIdentity>> {
        Ok(self.state.read().find_agent(agent_id))
    }

    fn list(&self) -> anyhow::Result<Vec<AgentIdentity>> {
        Ok(self.state.read().agents.clone())
    }
}

/// Store backed by a JSON state file. Keeps the full save history.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: RwLock<PersistedState>,
}

impl FileStore {
    /// Open (or lazily create) the state file at `path`.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let state = persist::load(path)
            .map_err(|e| anyhow::anyhow!("failed to load state file {}: {e}", path.display()))?;
        tracing::debug!(
            path = %path.display(),
            configs = state.configs.len(),
            agents = state.agents.len(),
            "loaded controller state"
        );
        Ok(Self { path: path.to_owned(), state: RwLock::new(state) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of documents saved over the store's lifetime.
    pub fn history_len(&self) -> usize {
        self.state.read().configs.len()
    }
}

impl ConfigStore for FileStore {
    fn save(&self, config: ConfigDocument) -> anyhow::Result<VersionToken> {
        let stored = stamp(config);
        let version = stored.version.clone();
        let mut state = self.state.write();
        state.configs.push(stored);
        if let Err(e) = persist::save(&self.path, &state) {
            state.configs.pop();
            return Err(e);
        }
        Ok(version)
    }

    fn fetch_latest(&self) -> anyhow::Result<VersionedDocument> {
        Ok(self.state.read().latest())
    }
}

impl AgentRegistry for FileStore {
    fn register(&self, name: &str) -> anyhow::Result<AgentIdentity> {
        let identity = AgentIdentity::new(name);
        let mut state = self.state.write();
        state.agents.push(identity.clone());
        if let Err(e) = persist::save(&self.path, &state) {
            state.agents.pop();
            return Err(e);
        }
        Ok(identity)
    }

    fn get(&self, agent_id: &str) -> anyhow::Result<Option<AgentIdentity>> {
        Ok(self.state.read().find_agent(agent_id))
    }

    fn list(&self) -> anyhow::Result<Vec<AgentIdentity>> {
        Ok(self.state.read().agents.clone())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
