//! Internal caller authentication middleware.
//!
//! A single static credential compared by exact match. Missing or
//! mismatched credential is a hard failure before any other
//! processing; a missing server-side key is a configuration error, not
//! an open door.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Header carrying the shared internal credential.
pub const GUARDIAN_KEY_HEADER: &str = "x-guardian-key";

#[derive(Clone)]
pub struct AuthState {
    pub internal_api_key: Arc<String>,
}

pub async fn require_internal_key(
    State(state): State<AuthState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if state.internal_api_key.is_empty() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": "internal api key not configured" })),
        )
            .into_response();
    }

    let presented = request
        .headers()
        .get(GUARDIAN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or_default();

    if presented != state.internal_api_key.as_str() {
        tracing::warn!("rejected request with missing or invalid internal key");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "unauthorized" })),
        )
            .into_response();
    }

    next.run(request).await
}
