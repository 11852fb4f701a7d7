// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the worker.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::document::ConfigDocument;
use crate::transport::{
    bad_json, health, request_id, with_request_ids, ConfigRequest, HitResponse, MessageResponse,
    CONFIG_PATH, HEALTH_PATH, HIT_PATH,
};
use crate::worker::sink::ConfigSink;

#[derive(Debug, Serialize)]
pub struct ActiveConfigResponse {
    pub config: ConfigDocument,
}

/// Build the worker `Router`. The push endpoint is unauthenticated: the
/// agent runs alongside the worker.
pub fn build_worker_router(sink: Arc<ConfigSink>) -> Router {
    let router = Router::new()
        .route(HEALTH_PATH, get(health))
        .route(CONFIG_PATH, get(active_config).post(receive_config))
        .route(HIT_PATH, get(hit))
        .with_state(sink);
    with_request_ids(router)
}

/// `POST /v1/config`: replace the active configuration.
pub async fn receive_config(
    State(sink): State<Arc<ConfigSink>>,
    headers: HeaderMap,
    payload: Result<Json<ConfigRequest>, JsonRejection>,
) -> Response {
    let request_id = request_id(&headers);
    let req = match payload {
        Ok(Json(req)) => req,
        Err(e) => return bad_json(e, request_id),
    };

    let keys = req.config.len();
    sink.update(req.config);
    tracing::info!(keys, request_id = %request_id, "worker received new config");

    Json(MessageResponse {
        message: "config updated".to_owned(),
        version: None,
        code: 200,
        request_id,
    })
    .into_response()
}

/// `GET /v1/config`: the configuration currently applied.
pub async fn active_config(State(sink): State<Arc<ConfigSink>>) -> impl IntoResponse {
    let config = sink.snapshot().as_ref().clone();
    Json(ActiveConfigResponse { config })
}

/// `GET /hit`: perform the outbound action against the configured target.
pub async fn hit(State(sink): State<Arc<ConfigSink>>, headers: HeaderMap) -> Response {
    let request_id = request_id(&headers);
    match sink.execute_action().await {
        Ok(result) => Json(HitResponse { result, code: 200, request_id }).into_response(),
        Err(e) => {
            tracing::error!(err = %e, request_id = %request_id, "failed to execute hit");
            e.code().to_http_response(format!("worker error: {e}"), Some(request_id)).into_response()
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
