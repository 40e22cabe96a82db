//! Agent run endpoints.
//!
//! - `POST /v1/agent/run`: start a run; the response is an SSE stream
//! - `POST /v1/agent/stop/:conversation_id`: stop the caller's run
//!
//! The caller is identified by the `X-Tenant-Id`, `X-User-Id` and
//! `X-Language` headers; missing headers fall back to `[identity]` config.

use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::Stream;

use ar_domain::agent::Language;

use crate::runtime::assemble::{Identity, RunRequest};
use crate::runtime::pipeline;
use crate::runtime::stop::stop_run;
use crate::state::AppState;

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const USER_HEADER: &str = "x-user-id";
pub const LANGUAGE_HEADER: &str = "x-language";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Identity
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub fn resolve_identity(state: &AppState, headers: &HeaderMap) -> Identity {
    let defaults = &state.config.identity;
    Identity {
        tenant_id: header_str(headers, TENANT_HEADER)
            .unwrap_or(defaults.default_tenant_id.as_str())
            .to_owned(),
        user_id: header_str(headers, USER_HEADER)
            .unwrap_or(defaults.default_user_id.as_str())
            .to_owned(),
        language: header_str(headers, LANGUAGE_HEADER)
            .map(Language::from_tag)
            .unwrap_or(defaults.default_language),
    }
}

fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/agent/run
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn run(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RunRequest>,
) -> Response {
    if body.conversation_id.trim().is_empty() || body.agent_id.trim().is_empty() {
        return api_error(
            StatusCode::BAD_REQUEST,
            "conversation_id and agent_id are required",
        );
    }

    let identity = resolve_identity(&state, &headers);
    tracing::info!(
        conversation_id = %body.conversation_id,
        agent_id = %body.agent_id,
        tenant_id = %identity.tenant_id,
        user_id = %identity.user_id,
        "agent run requested"
    );

    let rx = pipeline::start_run(state.runtime.clone(), body, identity);
    Sse::new(make_sse_stream(rx))
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// One SSE `data:` frame per payload, in order.
fn make_sse_stream(
    mut rx: tokio::sync::mpsc::Receiver<String>,
) -> impl Stream<Item = Result<Event, std::convert::Infallible>> {
    async_stream::stream! {
        while let Some(payload) = rx.recv().await {
            yield Ok(Event::default().data(unify_line_breaks(payload)));
        }
    }
}

/// `Event::data` splits on `\n` and rejects `\r`. SSE reads `\r\n`, `\r`
/// and `\n` as the same line break, so rewriting them keeps the frame
/// intact on the client side.
fn unify_line_breaks(payload: String) -> String {
    if !payload.contains('\r') {
        return payload;
    }
    payload.replace("\r\n", "\n").replace('\r', "\n")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/agent/stop/:conversation_id
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn stop(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
) -> Response {
    let identity = resolve_identity(&state, &headers);
    // A miss is reported in the body, not as an HTTP error.
    let outcome = stop_run(&state.runtime, &conversation_id, &identity.user_id);
    Json(outcome).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carriage_returns_become_newlines() {
        assert_eq!(unify_line_breaks("a\r\nb\rc\nd".into()), "a\nb\nc\nd");
        assert_eq!(unify_line_breaks("plain".into()), "plain");
    }
}
