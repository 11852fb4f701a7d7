// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashSet;

use serde_json::json;

use super::*;

fn doc(value: serde_json::Value) -> anyhow::Result<ConfigDocument> {
    Ok(serde_json::from_value(value)?)
}

// -- MemoryStore ------------------------------------------------------------

#[test]
fn empty_store_returns_sentinel() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let latest = store.fetch_latest()?;
    assert!(latest.config.is_empty());
    assert!(latest.version.is_empty_sentinel());
    Ok(())
}

#[test]
fn save_then_fetch_sees_each_version() -> anyhow::Result<()> {
    let store = MemoryStore::new();

    let v1 = store.save(doc(json!({"url": "http://X"}))?)?;
    let latest = store.fetch_latest()?;
    assert_eq!(latest.version, v1);
    assert_eq!(latest.config["url"], "http://X");

    let v2 = store.save(doc(json!({"url": "http://Y"}))?)?;
    let latest = store.fetch_latest()?;
    assert_ne!(v1, v2);
    assert_eq!(latest.version, v2);
    assert_eq!(latest.config["url"], "http://Y");
    Ok(())
}

#[test]
fn fetch_never_returns_an_earlier_version() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let mut seen = HashSet::new();
    for i in 0..50 {
        let version = store.save(doc(json!({"n": i}))?)?;
        assert!(seen.insert(version.clone()), "version reused: {version}");
        let latest = store.fetch_latest()?;
        assert_eq!(latest.version, version);
        assert_eq!(latest.config["n"], i);
    }
    Ok(())
}

#[test]
fn saving_empty_document_is_not_the_sentinel() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let version = store.save(ConfigDocument::new())?;
    let latest = store.fetch_latest()?;
    assert!(latest.config.is_empty());
    assert_eq!(latest.version, version);
    assert!(!latest.version.is_empty_sentinel());
    Ok(())
}

#[test]
fn register_mints_distinct_identities() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let a = store.register("agent-1")?;
    let b = store.register("agent-1")?;
    assert_ne!(a.agent_id, b.agent_id);
    assert_eq!(store.get(&a.agent_id)?, Some(a.clone()));
    assert_eq!(store.get("nope")?, None);
    assert_eq!(store.list()?, vec![a, b]);
    Ok(())
}

// -- FileStore --------------------------------------------------------------

#[test]
fn file_store_survives_reopen() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("state.json");

    let (version, agent) = {
        let store = FileStore::open(&path)?;
        assert!(store.fetch_latest()?.version.is_empty_sentinel());
        let version = store.save(doc(json!({"url": "http://X", "retries": 3}))?)?;
        let agent = store.register("agent-1")?;
        (version, agent)
    };

    let reopened = FileStore::open(&path)?;
    let latest = reopened.fetch_latest()?;
    assert_eq!(latest.version, version);
    assert_eq!(latest.config["retries"], 3);
    assert_eq!(reopened.get(&agent.agent_id)?, Some(agent));
    Ok(())
}

#[test]
fn file_store_keeps_history_and_serves_latest() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileStore::open(&dir.path().join("nested/state.json"))?;
    store.save(doc(json!({"n": 1}))?)?;
    store.save(doc(json!({"n": 2}))?)?;
    let v3 = store.save(doc(json!({"n": 3}))?)?;

    assert_eq!(store.history_len(), 3);
    let latest = store.fetch_latest()?;
    assert_eq!(latest.version, v3);
    assert_eq!(latest.config["n"], 3);
    Ok(())
}

#[test]
fn file_store_save_failure_is_reported_and_not_applied() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let state_dir = dir.path().join("state");
    let store = FileStore::open(&state_dir.join("state.json"))?;
    let v1 = store.save(doc(json!({"n": 1}))?)?;

    std::fs::remove_dir_all(&state_dir)?;
    assert!(store.save(doc(json!({"n": 2}))?).is_err());
    assert!(store.register("agent-1").is_err());

    assert_eq!(store.fetch_latest()?.version, v1);
    assert_eq!(store.history_len(), 1);
    assert!(store.list()?.is_empty());
    Ok(())
}

#[test]
fn file_store_rejects_corrupt_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{not json")?;
    crate::assert_err_contains!(FileStore::open(&path), "failed to load state file");
    Ok(())
}
