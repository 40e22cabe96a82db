//! Test doubles and a runtime builder shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ar_domain::config::Config;
use ar_domain::error::{Error, Result};
use ar_domain::agent::Language;
use ar_domain::stream::{BoxStream, EngineChunk};
use ar_gateway::conversation::{ConversationMessage, ConversationStore};
use ar_gateway::engine::ExecutionEngine;
use ar_gateway::knowledge::KnowledgeBase;
use ar_gateway::plugins::{PluginScanner, PluginTool};
use ar_gateway::runtime::assemble::{AgentRunInfo, Identity, RunRequest};
use ar_gateway::runtime::background::BackgroundTasks;
use ar_gateway::runtime::cancel::{InMemoryPreprocessRegistry, InMemoryRunRegistry};
use ar_gateway::runtime::Runtime;
use ar_gateway::store::CatalogStore;
use ar_memory::{
    MemoryAddRequest, MemoryAddResponse, MemoryLevel, MemoryProvider, MemoryRecord,
    MemorySearchRequest, MemorySearchResponse,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Catalog
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// `planner` manages `researcher` (which manages `fact_checker`) and
/// `writer`. User `mem` has memory on; everyone else inherits the tenant
/// default (off).
pub const CATALOG: &str = r#"
[[tenants]]
id = "acme"
default_model = "fast"

[[tenants.models]]
cite_name = "fast"
model_name = "gpt-4o-mini"
url = "https://llm.local/v1"
api_key = "sk-test"

[[tenants.models]]
cite_name = "deep"
model_name = "o3"
url = "https://llm.local/v1"

[[tenants.mcp_endpoints]]
name = "github"
url = "http://mcp-github/sse"

[[tenants.mcp_endpoints]]
name = "jira"
url = "http://mcp-jira/sse"
enabled = false

[tenants.memory_defaults]
memory_switch = false

[[tenants.users]]
user_id = "mem"

[tenants.users.memory]
memory_switch = true

[[tenants.users]]
user_id = "mem-readonly"

[tenants.users.memory]
memory_switch = true
agent_share = "never"
disabled_user_agent_ids = ["planner"]

[[tenants.agents]]
agent_id = "planner"
name = "planner"
description = "Plans the work"
duty_prompt = "Break the task down and delegate."
constraint_prompt = "Be brief."
model_name = "deep"
sub_agents = ["researcher", "writer"]

[[tenants.agents.tools]]
name = "web_search"
source = "local"

[[tenants.agents.tools]]
name = "list_issues"
source = "mcp"
usage = "github"

[[tenants.agents.tools]]
name = "knowledge_base_search"
source = "knowledge_base"

[[tenants.agents.tools.params]]
name = "index_names"
default = "docs, missing, faq"

[[tenants.agents.tools]]
name = "shell"
source = "local"
enabled = false

[[tenants.agents]]
agent_id = "researcher"
prompt = "You research things."
sub_agents = ["fact_checker"]

[[tenants.agents.tools]]
name = "read_file"
source = "mcp"
usage = "local"

[[tenants.agents.tools]]
name = "tickets"
source = "mcp"
usage = "jira"

[[tenants.agents]]
agent_id = "fact_checker"
name = "fact_checker"
description = "Checks claims"
prompt = "Check every claim."

[[tenants.agents.tools]]
name = "pdf_reader"
source = "plugin"

[[tenants.agents]]
agent_id = "writer"
name = "writer"
description = "Writes the report"
duty_prompt = "Write clearly."
"#;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Memory
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
pub struct FakeMemory {
    pub searches: Mutex<Vec<MemorySearchRequest>>,
    pub adds: Mutex<Vec<MemoryAddRequest>>,
    pub fail_search: bool,
    /// When set, the first search waits for one notification before
    /// answering.
    pub gate: Option<Arc<Notify>>,
}

impl FakeMemory {
    pub fn failing() -> Self {
        Self {
            fail_search: true,
            ..Default::default()
        }
    }

    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Default::default()
        }
    }
}

#[async_trait]
impl MemoryProvider for FakeMemory {
    async fn search(&self, req: MemorySearchRequest) -> Result<MemorySearchResponse> {
        let first = self.searches.lock().is_empty();
        if let (Some(gate), true) = (&self.gate, first) {
            gate.notified().await;
        }
        let agent_id = req.agent_id.clone();
        self.searches.lock().push(req);
        if self.fail_search {
            return Err(Error::Memory("search returned 503".into()));
        }
        Ok(MemorySearchResponse {
            results: vec![MemoryRecord {
                id: Some(format!("m-{agent_id}")),
                memory: format!("{agent_id} prefers tables"),
                memory_level: MemoryLevel::User,
                score: Some(0.9),
                updated_at: None,
            }],
        })
    }

    async fn add(&self, req: MemoryAddRequest) -> Result<MemoryAddResponse> {
        self.adds.lock().push(req);
        Ok(MemoryAddResponse::default())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Knowledge base / plugins
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Knows `docs` and `faq`; every other index fails.
pub struct FakeKnowledge {
    pub summaries: HashMap<String, String>,
}

impl Default for FakeKnowledge {
    fn default() -> Self {
        let mut summaries = HashMap::new();
        summaries.insert("docs".to_owned(), "Product manuals.".to_owned());
        summaries.insert("faq".to_owned(), "Common questions.".to_owned());
        Self { summaries }
    }
}

#[async_trait]
impl KnowledgeBase for FakeKnowledge {
    async fn summary(&self, index_name: &str, _tenant_id: &str, _language: Language) -> Result<String> {
        self.summaries
            .get(index_name)
            .cloned()
            .ok_or_else(|| Error::Knowledge(format!("no index {index_name}")))
    }
}

#[derive(Default)]
pub struct FakePlugins {
    pub tools: Vec<PluginTool>,
}

impl FakePlugins {
    pub fn with_pdf_reader() -> Self {
        let tool: PluginTool = serde_json::from_value(serde_json::json!({
            "name": "pdf_reader",
            "description": "Reads PDF files",
            "class_name": "PdfReaderTool",
            "inputs": {"path": {"type": "string"}},
            "output_type": "string",
            "entrypoint": "plugins/pdf_reader.py"
        }))
        .unwrap();
        Self { tools: vec![tool] }
    }
}

#[async_trait]
impl PluginScanner for FakePlugins {
    async fn scan(&self) -> Result<Vec<PluginTool>> {
        Ok(self.tools.clone())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Engine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Plays back a fixed script of chunks.
#[derive(Default)]
pub struct ScriptedEngine {
    pub script: Vec<std::result::Result<String, String>>,
    pub start_error: Option<String>,
    /// After the first chunk, wait until the run is cancelled, then end.
    pub hold_until_cancelled: bool,
    pub received: Mutex<Vec<AgentRunInfo>>,
}

impl ScriptedEngine {
    pub fn chunks(chunks: &[&str]) -> Self {
        Self {
            script: chunks.iter().map(|c| Ok((*c).to_owned())).collect(),
            ..Default::default()
        }
    }

    pub fn last_run(&self) -> AgentRunInfo {
        self.received.lock().last().cloned().expect("engine was never started")
    }
}

#[async_trait]
impl ExecutionEngine for ScriptedEngine {
    async fn run(&self, info: AgentRunInfo) -> Result<BoxStream<'static, Result<EngineChunk>>> {
        let cancel = info.cancel.clone();
        self.received.lock().push(info);
        if let Some(msg) = &self.start_error {
            return Err(Error::Engine(msg.clone()));
        }

        let script = self.script.clone();
        let hold = self.hold_until_cancelled;
        let stream = async_stream::stream! {
            for (i, item) in script.into_iter().enumerate() {
                if cancel.is_cancelled() {
                    break;
                }
                match item {
                    Ok(chunk) => yield Ok(chunk),
                    Err(msg) => {
                        yield Err(Error::Engine(msg));
                        break;
                    }
                }
                if hold && i == 0 {
                    while !cancel.is_cancelled() {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversations
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
pub struct RecordingConversations {
    pub messages: Mutex<Vec<ConversationMessage>>,
}

#[async_trait]
impl ConversationStore for RecordingConversations {
    async fn append(&self, message: ConversationMessage) -> Result<()> {
        self.messages.lock().push(message);
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Harness
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct Harness {
    pub rt: Runtime,
    pub memory: Arc<FakeMemory>,
    pub engine: Arc<ScriptedEngine>,
    pub conversations: Arc<RecordingConversations>,
}

impl Harness {
    pub fn new(memory: FakeMemory, engine: ScriptedEngine) -> Self {
        let memory = Arc::new(memory);
        let engine = Arc::new(engine);
        let conversations = Arc::new(RecordingConversations::default());

        let rt = Runtime {
            config: Arc::new(Config::default()),
            store: Arc::new(CatalogStore::from_toml_str(CATALOG).unwrap()),
            memory: memory.clone(),
            knowledge: Arc::new(FakeKnowledge::default()),
            plugins: Arc::new(FakePlugins::with_pdf_reader()),
            engine: engine.clone(),
            conversations: conversations.clone(),
            runs: Arc::new(InMemoryRunRegistry::new()),
            preprocess: Arc::new(InMemoryPreprocessRegistry::new()),
            background: BackgroundTasks::new(),
        };

        Self {
            rt,
            memory,
            engine,
            conversations,
        }
    }

    pub fn with_engine(engine: ScriptedEngine) -> Self {
        Self::new(FakeMemory::default(), engine)
    }

    /// Collect every frame of a finished run, then wait for its background
    /// writes.
    pub async fn collect(&self, rx: mpsc::Receiver<String>) -> Vec<String> {
        let frames = drain(rx).await;
        self.rt.background.drain().await;
        frames
    }
}

pub async fn drain(mut rx: mpsc::Receiver<String>) -> Vec<String> {
    let mut frames = Vec::new();
    while let Some(frame) = rx.recv().await {
        frames.push(frame);
    }
    frames
}

pub fn identity(user_id: &str) -> Identity {
    Identity {
        tenant_id: "acme".into(),
        user_id: user_id.into(),
        language: Language::En,
    }
}

pub fn request(conversation_id: &str, agent_id: &str, query: &str) -> RunRequest {
    RunRequest {
        conversation_id: conversation_id.into(),
        agent_id: agent_id.into(),
        query: query.into(),
        history: Vec::new(),
        attachments: Vec::new(),
        is_debug: false,
    }
}

/// Parse a frame the pipeline produced itself.
pub fn json(frame: &str) -> serde_json::Value {
    serde_json::from_str(frame).unwrap_or(serde_json::Value::Null)
}

pub fn final_answer(text: &str) -> String {
    serde_json::json!({ "type": "final_answer", "content": text }).to_string()
}
