// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker role: applies pushed configurations and serves the hit action.

pub mod sink;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::transport::worker::build_worker_router;

use self::sink::ConfigSink;

/// Run the worker until `shutdown` fires.
pub async fn run(config: WorkerConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let sink = Arc::new(ConfigSink::new(config.timeout())?);
    let router = build_worker_router(sink);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("worker listening on {addr}");
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;
    Ok(())
}
