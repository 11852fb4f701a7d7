// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller state persistence: load/save to a JSON file with atomic writes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::document::{AgentIdentity, ConfigDocument, VersionToken};

/// Everything the controller keeps across restarts.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    /// Save history, oldest first. The last entry is the live document.
    #[serde(default)]
    pub configs: Vec<StoredConfig>,
    #[serde(default)]
    pub agents: Vec<AgentIdentity>,
}

/// One saved document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredConfig {
    pub config: ConfigDocument,
    pub version: VersionToken,
    pub created_at_ms: u64,
}

/// Load persisted state, or an empty state if the file does not exist yet.
pub fn load(path: &Path) -> anyhow::Result<PersistedState> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(PersistedState::default()),
        Err(e) => return Err(e.into()),
    };
    let state: PersistedState = serde_json::from_str(&contents)?;
    Ok(state)
}

/// Save state to a JSON file atomically (write tmp + rename).
///
/// Uses a unique temp filename (PID + counter) so two racing saves never
/// share a `.tmp` file.
pub fn save(path: &Path, state: &PersistedState) -> anyhow::Result<()> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let json = serde_json::to_string_pretty(state)?;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
