//! The streaming pipeline for one run.
//!
//! ```text
//! save user message ─► preview memory ─┬─ memory on ──► prepare with memory ─┐
//!                                      │                  │ failed           │
//!                                      │                  ▼                  │
//!                                      └─ memory off ─► prepare without ─────┤
//!                                                                            ▼
//!                                         register run ─► relay chunks ─► cleanup
//! ```
//!
//! The run executes on its own task and hands SSE payloads to the caller
//! through a channel, in engine order. Every payload the pipeline itself
//! produces is one of the two reserved shapes in [`PipelineFrame`].
//! Cleanup runs on every path: the stream ends only after persistence and
//! memory write-back have been scheduled and the run unregistered.

use std::sync::Arc;

use ar_domain::agent::Language;
use ar_domain::trace::TraceEvent;
use ar_memory::MemoryContext;
use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::assemble::{AgentRunInfo, Identity, RunAssembler, RunRequest};
use super::cancel::{CancelToken, PreprocessRegistry, RunHandle, RunKey};
use super::error::RunError;
use super::final_answer;
use super::memory::WriteBack;
use super::Runtime;
use crate::conversation::ConversationMessage;

/// Frames buffered between the run task and the client.
const RELAY_BUFFER: usize = 1;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Frames
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemorySearchStatus {
    Started,
    Done,
    Failed,
}

/// Payloads the pipeline emits besides relayed engine chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineFrame {
    MemorySearch {
        status: MemorySearchStatus,
        message: String,
    },
    Error {
        message: String,
    },
}

impl PipelineFrame {
    pub fn memory(status: MemorySearchStatus, language: Language) -> Self {
        Self::MemorySearch {
            status,
            message: memory_message(status, language).to_owned(),
        }
    }

    pub fn error(err: &RunError) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }

    pub fn payload(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn memory_message(status: MemorySearchStatus, language: Language) -> &'static str {
    match (language, status) {
        (Language::En, MemorySearchStatus::Started) => "Searching memory...",
        (Language::En, MemorySearchStatus::Done) => "Memory search complete",
        (Language::En, MemorySearchStatus::Failed) => {
            "Memory search failed, continuing without memory"
        }
        (Language::Zh, MemorySearchStatus::Started) => "正在检索记忆...",
        (Language::Zh, MemorySearchStatus::Done) => "记忆检索完成",
        (Language::Zh, MemorySearchStatus::Failed) => "记忆检索失败，将在无记忆的情况下继续",
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Start a run and return the channel its SSE payloads arrive on.
///
/// The channel closes once the run is finished and cleaned up.
pub fn start_run(rt: Runtime, request: RunRequest, identity: Identity) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel::<String>(RELAY_BUFFER);

    let span = tracing::info_span!(
        "agent_run",
        conversation_id = %request.conversation_id,
        agent_id = %request.agent_id,
        tenant_id = %identity.tenant_id,
        user_id = %identity.user_id,
        debug = request.is_debug,
        "otel.kind" = "SERVER",
    );

    let key = RunKey::new(&request.conversation_id, &identity.user_id);
    let run = PipelineRun {
        rt,
        request,
        identity,
        key,
        tx,
    };
    tokio::spawn(tracing::Instrument::instrument(run.execute(), span));

    rx
}

/// What the relay observed; drives cleanup.
#[derive(Debug, Default)]
struct RelayLog {
    chunks: Vec<String>,
    final_answer: Option<String>,
    errored: bool,
}

struct PipelineRun {
    rt: Runtime,
    request: RunRequest,
    identity: Identity,
    key: RunKey,
    tx: mpsc::Sender<String>,
}

impl PipelineRun {
    async fn execute(self) {
        tracing::debug!("run started");
        self.save_user_message().await;

        let memory = self.preview_memory().await;
        let mut log = RelayLog::default();

        let prepared = match &memory {
            Some(ctx) if ctx.enabled() => self.prepare_with_memory().await,
            _ => self.prepare_without_memory().await,
        };
        let prepared = match prepared {
            Ok(info) => info,
            Err(e) => {
                tracing::error!(error = %e, "run preparation failed");
                log.errored = true;
                self.send(PipelineFrame::error(&e).payload()).await;
                None
            }
        };

        let token = match prepared {
            Some(info) => {
                let token = info.cancel.clone();
                self.register(&token);
                self.relay(info, &mut log).await;
                Some(token)
            }
            None => None,
        };

        self.cleanup(log, token, memory);
    }

    async fn send(&self, payload: String) -> bool {
        self.tx.send(payload).await.is_ok()
    }

    async fn save_user_message(&self) {
        if self.request.is_debug {
            return;
        }
        let msg = ConversationMessage::user(
            &self.request.conversation_id,
            &self.identity.tenant_id,
            &self.identity.user_id,
            &self.request.agent_id,
            &self.request.query,
        );
        if let Err(e) = self.rt.conversations.append(msg).await {
            tracing::warn!(error = %e, "failed to save user message");
        }
    }

    /// The user's memory settings, or `None` for debug runs and when the
    /// settings cannot be read.
    async fn preview_memory(&self) -> Option<MemoryContext> {
        if self.request.is_debug {
            return None;
        }
        let tenant_id = &self.identity.tenant_id;
        let user_id = &self.identity.user_id;
        match self.rt.store.memory_settings(tenant_id, user_id).await {
            Ok(settings) => Some(MemoryContext::new(
                settings,
                &self.rt.config.memory,
                tenant_id,
                user_id,
                &self.request.agent_id,
            )),
            Err(e) => {
                tracing::warn!(error = %e, "memory settings unavailable, running without memory");
                None
            }
        }
    }

    /// `Ok(None)` means the preparation was stopped and the stream should
    /// end without further frames.
    async fn prepare_with_memory(&self) -> Result<Option<AgentRunInfo>, RunError> {
        let language = self.identity.language;
        let guard = PreprocessGuard::register(
            self.rt.preprocess.clone(),
            self.key.clone(),
            Uuid::new_v4().to_string(),
        );

        self.send(PipelineFrame::memory(MemorySearchStatus::Started, language).payload())
            .await;

        let attempt = RunAssembler::new(&self.rt)
            .assemble(&self.request, &self.identity, true)
            .await
            .map_err(RunError::into_memory_preparation);

        if guard.token.is_cancelled() {
            tracing::info!("stopped during memory preparation");
            return Ok(None);
        }

        let info = match attempt {
            Ok(info) => {
                self.send(PipelineFrame::memory(MemorySearchStatus::Done, language).payload())
                    .await;
                info
            }
            Err(e) => {
                tracing::warn!(error = %e, "memory preparation failed, retrying without memory");
                self.send(PipelineFrame::memory(MemorySearchStatus::Failed, language).payload())
                    .await;
                match self.prepare_without_memory().await? {
                    Some(info) => info,
                    None => return Ok(None),
                }
            }
        };

        if guard.token.is_cancelled() {
            tracing::info!("stopped during memory preparation");
            return Ok(None);
        }
        Ok(Some(info))
    }

    async fn prepare_without_memory(&self) -> Result<Option<AgentRunInfo>, RunError> {
        RunAssembler::new(&self.rt)
            .assemble(&self.request, &self.identity, false)
            .await
            .map(Some)
    }

    fn register(&self, token: &CancelToken) {
        let replaced = self.rt.runs.register(
            self.key.clone(),
            RunHandle::new(token.clone(), &self.request.agent_id),
        );
        TraceEvent::RunRegistered {
            conversation_id: self.request.conversation_id.clone(),
            user_id: self.identity.user_id.clone(),
            replaced,
        }
        .emit();
    }

    /// Forward engine chunks in order, noting the final answer. An engine
    /// error produces one error frame and ends the relay.
    async fn relay(&self, info: AgentRunInfo, log: &mut RelayLog) {
        let mut stream = match self.rt.engine.run(info).await {
            Ok(s) => s,
            Err(e) => {
                let err = RunError::engine(e);
                tracing::error!(error = %err, "engine failed to start");
                log.errored = true;
                self.send(PipelineFrame::error(&err).payload()).await;
                return;
            }
        };

        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => {
                    if let Some(answer) = final_answer::decode(&chunk) {
                        log.final_answer = Some(answer);
                    }
                    log.chunks.push(chunk.clone());
                    if !self.send(chunk).await {
                        tracing::info!("client went away, ending relay");
                        break;
                    }
                }
                Err(e) => {
                    let err = RunError::engine(e);
                    tracing::error!(error = %err, "engine stream failed");
                    log.errored = true;
                    self.send(PipelineFrame::error(&err).payload()).await;
                    break;
                }
            }
        }
    }

    fn cleanup(self, log: RelayLog, token: Option<CancelToken>, memory: Option<MemoryContext>) {
        let RelayLog {
            chunks,
            final_answer,
            errored,
        } = log;

        TraceEvent::RunFinished {
            conversation_id: self.request.conversation_id.clone(),
            chunks: chunks.len(),
            final_answer: final_answer.is_some(),
            errored,
        }
        .emit();

        if !self.request.is_debug {
            let store = self.rt.conversations.clone();
            let msg = ConversationMessage::assistant(
                &self.request.conversation_id,
                &self.identity.tenant_id,
                &self.identity.user_id,
                &self.request.agent_id,
                chunks,
            );
            self.rt.background.spawn("persist_assistant_message", async move {
                store.append(msg).await.map_err(RunError::background)
            });
        }

        if let Some(token) = &token {
            self.rt.runs.unregister(&self.key, token);
        }

        let write_back = match (memory, final_answer) {
            (Some(ctx), Some(answer)) => {
                WriteBack::prepare(ctx, &self.request.agent_id, &self.request.query, &answer)
            }
            _ => None,
        };
        if let Some(job) = write_back {
            let memory = self.rt.memory.clone();
            self.rt.background.spawn("memory_write_back", job.run(memory));
        }

        tracing::debug!("run finished");
    }
}

/// Keeps a preparation task registered for as long as it is alive.
struct PreprocessGuard {
    registry: Arc<dyn PreprocessRegistry>,
    key: RunKey,
    task_id: String,
    token: CancelToken,
}

impl PreprocessGuard {
    fn register(registry: Arc<dyn PreprocessRegistry>, key: RunKey, task_id: String) -> Self {
        let token = registry.register(&key, &task_id);
        Self {
            registry,
            key,
            task_id,
            token,
        }
    }
}

impl Drop for PreprocessGuard {
    fn drop(&mut self) {
        self.registry.unregister(&self.key, &self.task_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_frame_shapes() {
        let started = PipelineFrame::memory(MemorySearchStatus::Started, Language::En).payload();
        let v: serde_json::Value = serde_json::from_str(&started).unwrap();
        assert_eq!(v["type"], "memory_search");
        assert_eq!(v["status"], "started");
        assert_eq!(v["message"], "Searching memory...");

        let err = PipelineFrame::error(&RunError::Engine("boom".into())).payload();
        let v: serde_json::Value = serde_json::from_str(&err).unwrap();
        assert_eq!(v["type"], "error");
        assert_eq!(v["message"], "engine: boom");
    }

    #[test]
    fn marker_text_follows_language() {
        let zh = PipelineFrame::memory(MemorySearchStatus::Failed, Language::Zh);
        match zh {
            PipelineFrame::MemorySearch { message, .. } => assert!(message.contains("记忆")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
