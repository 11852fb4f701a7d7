// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP API contract types and routers for the controller and worker.

pub mod auth;
pub mod controller;
pub mod worker;

use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::document::{ConfigDocument, VersionToken};
use crate::error::ErrorCode;

pub const HEALTH_PATH: &str = "/api/v1/health";
pub const REGISTER_PATH: &str = "/v1/register";
pub const AGENTS_PATH: &str = "/v1/agents";
pub const CONFIG_PATH: &str = "/v1/config";
pub const HIT_PATH: &str = "/hit";

pub const REQUEST_ID_HEADER: &str = "x-request-id";

// -- Request/Response types ---------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub agent_id: String,
    pub poll_url: String,
    pub poll_interval_seconds: u64,
    pub registered_at_ms: u64,
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub request_id: String,
}

/// Body of both the administrative save and the agent-to-worker push.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigRequest {
    pub config: ConfigDocument,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub config: ConfigDocument,
    pub version: VersionToken,
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub request_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionToken>,
    pub code: u16,
    pub request_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HitResponse {
    pub result: String,
    pub code: u16,
    pub request_id: String,
}

// -- Helpers ------------------------------------------------------------------

/// The request id stamped by [`with_request_ids`], or empty if absent.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

/// Map a JSON body rejection onto the error envelope.
pub fn bad_json(rejection: JsonRejection, request_id: String) -> Response {
    tracing::warn!(err = %rejection.body_text(), request_id = %request_id, "failed to bind request");
    ErrorCode::BadRequest.to_http_response(rejection.body_text(), Some(request_id)).into_response()
}

/// Stamp every request with an `x-request-id` (keeping a caller-supplied
/// one), echo it on the response, and trace each request.
pub fn with_request_ids(router: Router) -> Router {
    router
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// `GET /api/v1/health`
pub async fn health() -> impl IntoResponse {
    axum::Json(HealthResponse { status: "running".to_owned() })
}
