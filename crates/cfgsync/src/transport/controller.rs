// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the controller.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::config::ControllerConfig;
use crate::controller::Authority;
use crate::error::ErrorCode;
use crate::transport::{
    auth, bad_json, health, request_id, with_request_ids, ConfigRequest, ConfigResponse,
    MessageResponse, RegisterRequest, RegisterResponse, AGENTS_PATH, CONFIG_PATH, HEALTH_PATH,
    REGISTER_PATH,
};

/// Shared controller state.
pub struct ControllerState {
    pub authority: Authority,
    pub agent_token: String,
    pub admin_token: Option<String>,
}

impl ControllerState {
    pub fn new(authority: Authority, config: &ControllerConfig) -> Self {
        Self {
            authority,
            agent_token: config.agent_token.clone(),
            admin_token: config.admin_token.clone(),
        }
    }
}

/// Build the controller `Router`.
pub fn build_controller_router(state: Arc<ControllerState>) -> Router {
    let poll_path = state.authority.contract().poll_url.clone();

    let mut router: Router<Arc<ControllerState>> = Router::new()
        .route(HEALTH_PATH, get(health))
        .route(REGISTER_PATH, post(register))
        .route(AGENTS_PATH, get(list_agents))
        .route("/v1/agents/{id}", get(get_agent));
    router = if poll_path == CONFIG_PATH {
        router.route(CONFIG_PATH, get(fetch_config).post(save_config))
    } else {
        router.route(CONFIG_PATH, post(save_config)).route(&poll_path, get(fetch_config))
    };

    let router = router
        .layer(middleware::from_fn_with_state(state.clone(), auth::controller_auth))
        .layer(CorsLayer::permissive())
        .with_state(state);
    with_request_ids(router)
}

fn internal(context: &str, err: anyhow::Error, request_id: String) -> Response {
    tracing::error!(err = %err, request_id = %request_id, "{context}");
    ErrorCode::Internal.to_http_response(err.to_string(), Some(request_id)).into_response()
}

/// `POST /v1/register`: mint an agent identity and hand out the poll contract.
pub async fn register(
    State(s): State<Arc<ControllerState>>,
    headers: HeaderMap,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Response {
    let request_id = request_id(&headers);
    let req = match payload {
        Ok(Json(req)) => req,
        Err(e) => return bad_json(e, request_id),
    };

    match s.authority.register(&req.name) {
        Ok((identity, contract)) => Json(RegisterResponse {
            agent_id: identity.agent_id,
            poll_url: contract.poll_url,
            poll_interval_seconds: contract.poll_interval_seconds,
            registered_at_ms: identity.registered_at_ms,
            code: 200,
            request_id,
        })
        .into_response(),
        Err(e) => internal("failed to register agent", e, request_id),
    }
}

/// `GET <poll path>`: latest document, with its version mirrored in `ETag`.
pub async fn fetch_config(
    State(s): State<Arc<ControllerState>>,
    headers: HeaderMap,
) -> Response {
    let request_id = request_id(&headers);
    match s.authority.fetch_latest() {
        Ok(latest) => {
            let etag = latest.version.to_string();
            let body = ConfigResponse {
                config: latest.config,
                version: latest.version,
                code: 200,
                request_id,
            };
            ([(header::ETAG, etag)], Json(body)).into_response()
        }
        Err(e) => internal("failed to get config", e, request_id),
    }
}

/// `POST /v1/config`: administrative save of a new document.
pub async fn save_config(
    State(s): State<Arc<ControllerState>>,
    headers: HeaderMap,
    payload: Result<Json<ConfigRequest>, JsonRejection>,
) -> Response {
    let request_id = request_id(&headers);
    let req = match payload {
        Ok(Json(req)) => req,
        Err(e) => return bad_json(e, request_id),
    };

    match s.authority.save(req.config) {
        Ok(version) => Json(MessageResponse {
            message: "success".to_owned(),
            version: Some(version),
            code: 200,
            request_id,
        })
        .into_response(),
        Err(e) => internal("failed to save config", e, request_id),
    }
}

/// `GET /v1/agents`
pub async fn list_agents(
    State(s): State<Arc<ControllerState>>,
    headers: HeaderMap,
) -> Response {
    match s.authority.agents() {
        Ok(agents) => Json(agents).into_response(),
        Err(e) => internal("failed to list agents", e, request_id(&headers)),
    }
}

/// `GET /v1/agents/{id}`
pub async fn get_agent(
    State(s): State<Arc<ControllerState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let request_id = request_id(&headers);
    match s.authority.agent(&id) {
        Ok(Some(agent)) => Json(agent).into_response(),
        Ok(None) => ErrorCode::NotFound
            .to_http_response(format!("agent not found: {id}"), Some(request_id))
            .into_response(),
        Err(e) => internal("failed to get agent", e, request_id),
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
