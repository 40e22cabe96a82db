//! Bearer-token gate for the `/v1/agent/*` routes.
//!
//! The token comes from the env var named by `server.api_token_env`
//! (`AR_API_TOKEN` by default) and is hashed once in bootstrap. With no
//! token configured every request passes.

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::state::AppState;

pub async fn require_api_token(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.api_token_hash.as_deref() else {
        return next.run(req).await;
    };

    if !token_matches(expected, bearer_token(req.headers())) {
        tracing::debug!(path = %req.uri().path(), "rejected request without valid token");
        return (
            StatusCode::UNAUTHORIZED,
            axum::Json(serde_json::json!({ "error": "invalid or missing API token" })),
        )
            .into_response();
    }

    next.run(req).await
}

fn bearer_token(headers: &HeaderMap) -> &str {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("")
}

/// Digests have a fixed length, so the comparison leaks nothing about
/// the token itself.
fn token_matches(expected_digest: &[u8], provided: &str) -> bool {
    Sha256::digest(provided.as_bytes())
        .ct_eq(expected_digest)
        .into()
}
