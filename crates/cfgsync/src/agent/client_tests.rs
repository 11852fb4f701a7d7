// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::json;

use super::*;
use crate::test_support::spawn_router;

const TIMEOUT: Duration = Duration::from_secs(5);

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers.get("authorization").and_then(|v| v.to_str().ok()).map(str::to_owned)
}

#[tokio::test]
async fn register_sends_token_and_name() -> anyhow::Result<()> {
    let seen: Arc<Mutex<Option<(Option<String>, String)>>> = Arc::default();
    let captured = Arc::clone(&seen);
    let router = Router::new().route(
        "/v1/register",
        post(move |headers: HeaderMap, Json(req): Json<RegisterRequest>| {
            let captured = Arc::clone(&captured);
            async move {
                *captured.lock() = Some((bearer(&headers), req.name));
                Json(json!({
                    "agent_id": "a-1",
                    "poll_url": "/custom/poll",
                    "poll_interval_seconds": 7,
                    "registered_at_ms": 42,
                }))
            }
        }),
    );
    let (addr, _server) = spawn_router(router).await?;

    let upstream = HttpUpstream::new(format!("http://{addr}"), "secret".to_owned(), TIMEOUT)?;
    let reg = upstream.register("edge-3").await?;

    assert_eq!(reg.identity.agent_id, "a-1");
    assert_eq!(reg.identity.name, "edge-3");
    assert_eq!(reg.contract.poll_url, "/custom/poll");
    assert_eq!(reg.contract.poll_interval_seconds, 7);
    assert_eq!(
        seen.lock().clone(),
        Some((Some("Bearer secret".to_owned()), "edge-3".to_owned()))
    );
    Ok(())
}

#[tokio::test]
async fn register_rejects_error_status() -> anyhow::Result<()> {
    let router = Router::new().route("/v1/register", post(|| async { StatusCode::UNAUTHORIZED }));
    let (addr, _server) = spawn_router(router).await?;

    let upstream = HttpUpstream::new(format!("http://{addr}"), "wrong".to_owned(), TIMEOUT)?;
    assert!(upstream.register("edge").await.is_err());
    Ok(())
}

#[tokio::test]
async fn fetch_follows_poll_url() -> anyhow::Result<()> {
    let router = Router::new().route(
        "/custom/poll",
        get(|| async { Json(json!({"config": {"url": "http://t"}, "version": "v9"})) }),
    );
    let (addr, _server) = spawn_router(router).await?;

    let upstream = HttpUpstream::new(format!("http://{addr}/"), "t".to_owned(), TIMEOUT)?;
    let latest = upstream.fetch("/custom/poll").await;

    let latest = latest.map_err(|e| anyhow::anyhow!("{e}"))?;
    assert_eq!(latest.version.as_str(), "v9");
    assert_eq!(latest.config["url"], "http://t");
    Ok(())
}

#[tokio::test]
async fn fetch_classifies_failures() -> anyhow::Result<()> {
    let router = Router::new()
        .route("/status", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
        .route("/garbage", get(|| async { "not json" }))
        .route("/wrong-shape", get(|| async { Json(json!({"config": []})) }));
    let (addr, _server) = spawn_router(router).await?;
    let upstream = HttpUpstream::new(format!("http://{addr}"), "t".to_owned(), TIMEOUT)?;

    assert_eq!(upstream.fetch("/status").await, Err(PollError::Status(503)));
    assert!(matches!(upstream.fetch("/garbage").await, Err(PollError::Decode(_))));
    assert!(matches!(upstream.fetch("/wrong-shape").await, Err(PollError::Decode(_))));
    Ok(())
}

#[tokio::test]
async fn fetch_unreachable_is_transport() -> anyhow::Result<()> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);

    let upstream = HttpUpstream::new(format!("http://{addr}"), "t".to_owned(), TIMEOUT)?;
    assert!(matches!(upstream.fetch("/v1/config").await, Err(PollError::Transport(_))));
    Ok(())
}

#[tokio::test]
async fn push_posts_wrapped_config() -> anyhow::Result<()> {
    let seen: Arc<Mutex<Option<ConfigRequest>>> = Arc::default();
    let captured = Arc::clone(&seen);
    let router = Router::new().route(
        "/v1/config",
        post(move |Json(req): Json<ConfigRequest>| {
            let captured = Arc::clone(&captured);
            async move {
                *captured.lock() = Some(req);
                StatusCode::OK
            }
        }),
    );
    let (addr, _server) = spawn_router(router).await?;

    let downstream = HttpDownstream::new(format!("http://{addr}"), TIMEOUT)?;
    let config: ConfigDocument = serde_json::from_value(json!({"url": "http://x", "n": 3}))?;
    downstream.push(&config).await?;

    let received = seen.lock().clone().map(|r| r.config);
    assert_eq!(received, Some(config));
    Ok(())
}

#[tokio::test]
async fn push_surfaces_worker_rejection() -> anyhow::Result<()> {
    let router = Router::new().route("/v1/config", post(|| async { StatusCode::BAD_REQUEST }));
    let (addr, _server) = spawn_router(router).await?;

    let downstream = HttpDownstream::new(format!("http://{addr}"), TIMEOUT)?;
    crate::assert_err_contains!(downstream.push(&ConfigDocument::new()).await, "status 400");
    Ok(())
}
