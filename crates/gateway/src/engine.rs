//! The execution engine that runs the agent loop.
//!
//! The engine receives a fully assembled [`AgentRunInfo`] and produces an
//! ordered stream of opaque chunks. The HTTP adapter talks to a remote
//! engine that answers `POST /agent/run` with server-sent events.

use std::time::Duration;

use ar_domain::error::{Error, Result};
use ar_domain::stream::{BoxStream, EngineChunk};
use ar_memory::from_reqwest;
use async_trait::async_trait;

use crate::runtime::assemble::AgentRunInfo;

#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Start a run. The engine must poll `info.cancel` and wind down
    /// cooperatively once it is set.
    async fn run(&self, info: AgentRunInfo) -> Result<BoxStream<'static, Result<EngineChunk>>>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HTTP/SSE adapter
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct HttpEngine {
    http: reqwest::Client,
    base_url: String,
}

impl HttpEngine {
    pub fn new(cfg: &ar_domain::config::EngineConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(cfg.connect_timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
        })
    }
}

#[async_trait]
impl ExecutionEngine for HttpEngine {
    async fn run(&self, info: AgentRunInfo) -> Result<BoxStream<'static, Result<EngineChunk>>> {
        let resp = self
            .http
            .post(format!("{}/agent/run", self.base_url))
            .header("Accept", "text/event-stream")
            .json(&info)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Engine(format!("engine returned {status}: {body}")));
        }

        let cancel = info.cancel.clone();
        let stream = async_stream::stream! {
            let mut response = resp;
            let mut decoder = SseDecoder::default();

            loop {
                // Once stopped, drop the connection; the remote engine sees
                // the disconnect and ends its loop.
                if cancel.is_cancelled() {
                    tracing::debug!("run cancelled, closing engine stream");
                    break;
                }
                match response.chunk().await {
                    Ok(Some(bytes)) => {
                        for data in decoder.feed(&bytes) {
                            yield Ok(data);
                        }
                    }
                    Ok(None) => {
                        for data in decoder.finish() {
                            yield Ok(data);
                        }
                        break;
                    }
                    Err(e) => {
                        yield Err(Error::Engine(format!("stream interrupted: {e}")));
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Incremental SSE parser over raw response bytes.
///
/// Reads may end anywhere, including inside a UTF-8 sequence or between
/// the `\r` and `\n` of a line break.
#[derive(Default)]
pub(crate) struct SseDecoder {
    /// Leading bytes of a UTF-8 sequence cut off by the last read.
    partial: Vec<u8>,
    text: String,
}

impl SseDecoder {
    pub(crate) fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.partial.extend_from_slice(bytes);
        self.decode_partial();
        drain_data_lines(&mut self.text)
    }

    /// Flush at end of stream, including an event that was never terminated.
    pub(crate) fn finish(&mut self) -> Vec<String> {
        if !self.partial.is_empty() {
            self.text.push_str(&String::from_utf8_lossy(&self.partial));
            self.partial.clear();
        }
        if self.text.trim().is_empty() {
            return Vec::new();
        }
        self.text.push_str("\n\n");
        drain_data_lines(&mut self.text)
    }

    fn decode_partial(&mut self) {
        loop {
            match std::str::from_utf8(&self.partial) {
                Ok(s) => {
                    self.text.push_str(s);
                    self.partial.clear();
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    self.text.push_str(&String::from_utf8_lossy(&self.partial[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            self.partial.drain(..valid + bad);
                        }
                        // Incomplete sequence: wait for the rest.
                        None => {
                            self.partial.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// Extract complete `data:` payloads from an SSE buffer.
///
/// Events are delimited by a blank line, with `\r\n`, `\r` and `\n` all
/// accepted as line breaks; multiple `data:` lines inside one event are
/// joined with `\n`. Consumed text is removed from `buffer` and a trailing
/// partial event stays for the next call.
pub(crate) fn drain_data_lines(buffer: &mut String) -> Vec<String> {
    unify_line_breaks(buffer);
    let mut payloads = Vec::new();

    while let Some(pos) = buffer.find("\n\n") {
        let block: String = buffer.drain(..pos).collect();
        buffer.drain(..2);

        let mut data: Option<String> = None;
        for line in block.lines() {
            if let Some(rest) = line.strip_prefix("data:") {
                let rest = rest.strip_prefix(' ').unwrap_or(rest);
                match data.as_mut() {
                    Some(d) => {
                        d.push('\n');
                        d.push_str(rest);
                    }
                    None => data = Some(rest.to_owned()),
                }
            }
        }
        if let Some(d) = data {
            if !d.is_empty() {
                payloads.push(d);
            }
        }
    }

    payloads
}

/// Rewrite `\r\n` and lone `\r` as `\n`. A trailing `\r` is held back since
/// its `\n` may arrive with the next read.
fn unify_line_breaks(buffer: &mut String) {
    if !buffer.contains('\r') {
        return;
    }
    let held = buffer.ends_with('\r');
    let body = if held {
        &buffer[..buffer.len() - 1]
    } else {
        buffer.as_str()
    };
    let mut unified = body.replace("\r\n", "\n").replace('\r', "\n");
    if held {
        unified.push('\r');
    }
    *buffer = unified;
}
