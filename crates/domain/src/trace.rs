use serde::Serialize;

/// Structured trace events emitted across all AgentRelay crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    ConfigTreeResolved {
        agent_id: String,
        tool_count: usize,
        managed_agent_count: usize,
        memory_hits: usize,
        knowledge_summary_chars: usize,
    },
    McpEndpointsResolved {
        registered: usize,
        referenced: usize,
    },
    MemoryServiceCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
    RunRegistered {
        conversation_id: String,
        user_id: String,
        replaced: bool,
    },
    RunFinished {
        conversation_id: String,
        chunks: usize,
        final_answer: bool,
        errored: bool,
    },
    RunStopRequested {
        conversation_id: String,
        run_found: bool,
        preprocess_found: usize,
    },
    MessagePersisted {
        conversation_id: String,
        role: String,
        chunks: usize,
    },
    MemoryWriteBack {
        agent_id: String,
        levels: Vec<String>,
        stored: usize,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "ar_event");
    }
}
