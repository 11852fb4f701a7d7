// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, Method, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ErrorCode;
use crate::transport::controller::ControllerState;
use crate::transport::{request_id, HEALTH_PATH, REGISTER_PATH};

/// Constant-time string comparison to prevent timing side-channel attacks.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

/// Validate a Bearer token from HTTP headers.
///
/// Returns `Ok(())` when `expected` is `None` (auth disabled) or when the
/// header matches. Returns `Err(ErrorCode::Unauthorized)` otherwise.
pub fn validate_bearer(headers: &HeaderMap, expected: Option<&str>) -> Result<(), ErrorCode> {
    let expected = match expected {
        Some(tok) => tok,
        None => return Ok(()),
    };

    let header =
        headers.get("authorization").and_then(|v| v.to_str().ok()).ok_or(ErrorCode::Unauthorized)?;

    let token = header.strip_prefix("Bearer ").ok_or(ErrorCode::Unauthorized)?;
    if constant_time_eq(token, expected) {
        Ok(())
    } else {
        Err(ErrorCode::Unauthorized)
    }
}

/// Which credential a controller route demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    None,
    Agent,
    Admin,
}

/// Health is open; registration and the poll endpoint take the agent token;
/// everything else is administrative.
pub fn required_credential(method: &Method, path: &str, poll_path: &str) -> Credential {
    if path == HEALTH_PATH {
        Credential::None
    } else if (method == Method::POST && path == REGISTER_PATH)
        || (method == Method::GET && path == poll_path)
    {
        Credential::Agent
    } else {
        Credential::Admin
    }
}

/// Axum middleware enforcing the controller's agent and admin tokens.
pub async fn controller_auth(
    state: State<Arc<ControllerState>>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let poll_path = &state.authority.contract().poll_url;
    let expected = match required_credential(req.method(), req.uri().path(), poll_path) {
        Credential::None => return next.run(req).await,
        Credential::Agent => Some(state.agent_token.as_str()),
        Credential::Admin => state.admin_token.as_deref(),
    };

    if let Err(code) = validate_bearer(req.headers(), expected) {
        let request_id = request_id(req.headers());
        tracing::warn!(path = %req.uri().path(), request_id = %request_id, "rejected unauthorized request");
        return code.to_http_response("unauthorized", Some(request_id)).into_response();
    }

    next.run(req).await
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
