//! REST implementation of [`MemoryProvider`].
//!
//! One pooled `reqwest::Client` per process. Both endpoints are POSTs with
//! JSON bodies; transient failures are retried with exponential back-off.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use ar_domain::config::MemoryServiceConfig;
use ar_domain::error::{Error, Result};
use ar_domain::trace::TraceEvent;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use uuid::Uuid;

use crate::provider::MemoryProvider;
use crate::types::{MemoryAddRequest, MemoryAddResponse, MemorySearchRequest, MemorySearchResponse};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A REST-based client for the memory service.
///
/// Created once and reused for the lifetime of the process.
/// The underlying `reqwest::Client` maintains a connection pool.
#[derive(Debug, Clone)]
pub struct RestMemoryClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    max_retries: u32,
}

impl RestMemoryClient {
    /// Build a new client from the shared `MemoryServiceConfig`.
    pub fn new(cfg: &MemoryServiceConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            api_key: cfg.api_key.clone(),
            max_retries: cfg.max_retries,
        })
    }

    // ── request helpers ──────────────────────────────────────────────

    /// Decorate a `RequestBuilder` with the standard AgentRelay headers.
    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        let trace_id = Uuid::new_v4().to_string();
        let rb = rb
            .header("X-Client-Type", "agent-relay")
            .header("X-Trace-Id", &trace_id);

        match self.api_key {
            Some(ref key) => rb.header("X-Api-Key", key),
            None => rb,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ── retry engine ─────────────────────────────────────────────────

    /// Send with up to `max_retries` extra attempts on 5xx, timeouts and
    /// connection errors. 4xx answers are final. Every attempt emits a
    /// `TraceEvent::MemoryServiceCall`.
    async fn execute_with_retry(
        &self,
        endpoint: &str,
        build_request: impl Fn() -> RequestBuilder,
    ) -> Result<Response> {
        let mut last_err = Error::Memory(format!("{endpoint}: no attempt made"));

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(backoff(attempt)).await;
            }
            match self.attempt(endpoint, build_request()).await {
                Attempt::Done(resp) => return Ok(resp),
                Attempt::Fatal(e) => return Err(e),
                Attempt::Transient(e) => {
                    tracing::debug!(endpoint, attempt, error = %e, "memory call failed, may retry");
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }

    async fn attempt(&self, endpoint: &str, request: RequestBuilder) -> Attempt {
        let start = Instant::now();
        let result = self.decorate(request).send().await;
        let trace = |status: u16| {
            TraceEvent::MemoryServiceCall {
                endpoint: endpoint.to_owned(),
                status,
                duration_ms: start.elapsed().as_millis() as u64,
            }
            .emit()
        };

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                trace(e.status().map(|s| s.as_u16()).unwrap_or(0));
                return Attempt::Transient(from_reqwest(e));
            }
        };

        let status = resp.status();
        trace(status.as_u16());
        if status.is_success() {
            return Attempt::Done(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let detail = format!("{endpoint} returned {status}: {body}");
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Attempt::Fatal(Error::Auth(detail)),
            s if s.is_server_error() => Attempt::Transient(Error::Memory(detail)),
            _ => Attempt::Fatal(Error::Memory(detail)),
        }
    }

    async fn post_json<Req, Resp>(&self, path: &str, req: &Req) -> Result<Resp>
    where
        Req: serde::Serialize + Sync,
        Resp: serde::de::DeserializeOwned,
    {
        let url = self.url(path);
        let endpoint = format!("POST {path}");
        let resp = self
            .execute_with_retry(&endpoint, || self.http.post(&url).json(req))
            .await?;

        let body = resp.text().await.map_err(from_reqwest)?;
        serde_json::from_str(&body)
            .map_err(|e| Error::Memory(format!("failed to parse {path} response: {e}: {body}")))
    }
}

/// Outcome of one HTTP attempt.
enum Attempt {
    Done(Response),
    Transient(Error),
    Fatal(Error),
}

/// 100ms, 200ms, 400ms, ...
fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(100u64.saturating_mul(1 << attempt.saturating_sub(1).min(16)))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl MemoryProvider for RestMemoryClient {
    async fn search(&self, req: MemorySearchRequest) -> Result<MemorySearchResponse> {
        self.post_json("/memory/search", &req).await
    }

    async fn add(&self, req: MemoryAddRequest) -> Result<MemoryAddResponse> {
        self.post_json("/memory/add", &req).await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error conversion helper
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert a `reqwest::Error` into a domain `Error`.
///
/// Timeout errors become `Error::Timeout`; everything else becomes
/// `Error::Http`.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}
