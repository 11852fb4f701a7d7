// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;

use super::*;

fn contract() -> PollContract {
    PollContract { poll_url: "/v1/config".to_owned(), poll_interval_seconds: 30 }
}

#[test]
fn register_works_without_any_configuration() -> anyhow::Result<()> {
    let authority = Authority::in_memory(contract());
    let (identity, poll) = authority.register("agent-1")?;
    assert_eq!(identity.name, "agent-1");
    assert_eq!(poll, contract());
    assert!(authority.fetch_latest()?.version.is_empty_sentinel());
    Ok(())
}

#[test]
fn register_is_not_idempotent() -> anyhow::Result<()> {
    let authority = Authority::in_memory(contract());
    let (a, _) = authority.register("agent-1")?;
    let (b, _) = authority.register("agent-1")?;
    assert_ne!(a.agent_id, b.agent_id);
    assert_eq!(authority.agents()?.len(), 2);
    assert_eq!(authority.agent(&b.agent_id)?, Some(b));
    Ok(())
}

#[test]
fn save_is_visible_to_next_fetch() -> anyhow::Result<()> {
    let authority = Authority::in_memory(contract());
    let version = authority.save(serde_json::from_value(json!({"url": "http://X"}))?)?;
    let latest = authority.fetch_latest()?;
    assert_eq!(latest.version, version);
    assert_eq!(latest.config["url"], "http://X");
    Ok(())
}

#[test]
fn open_uses_state_file_when_configured() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("controller.json");
    let config = ControllerConfig {
        host: "127.0.0.1".to_owned(),
        port: 0,
        agent_token: "secret".to_owned(),
        admin_token: None,
        poll_path: "/v1/poll".to_owned(),
        poll_interval_secs: 7,
        state_file: Some(path.clone()),
    };

    let version = Authority::open(&config)?.save(serde_json::from_value(json!({"k": "v"}))?)?;
    assert!(path.exists());

    let reopened = Authority::open(&config)?;
    assert_eq!(reopened.fetch_latest()?.version, version);
    assert_eq!(reopened.contract().poll_url, "/v1/poll");
    assert_eq!(reopened.contract().poll_interval_seconds, 7);
    Ok(())
}
