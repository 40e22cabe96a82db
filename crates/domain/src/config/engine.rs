use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Execution engine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Connection to the execution engine that runs the agent loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "d_engine_url")]
    pub base_url: String,
    /// Connect timeout.  The run stream itself has no deadline.
    #[serde(default = "d_5000")]
    pub connect_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: d_engine_url(),
            connect_timeout_ms: 5000,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Knowledge base
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Vector index service used for knowledge-base summaries and handed to
/// the knowledge-base search tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default = "d_knowledge_url")]
    pub base_url: String,
    /// Embedding model the index was built with.
    #[serde(default = "d_embedding")]
    pub embedding_model: String,
    #[serde(default = "d_5000")]
    pub timeout_ms: u64,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            base_url: d_knowledge_url(),
            embedding_model: d_embedding(),
            timeout_ms: 5000,
        }
    }
}

fn d_engine_url() -> String {
    "http://127.0.0.1:5012".into()
}
fn d_knowledge_url() -> String {
    "http://127.0.0.1:5013".into()
}
fn d_embedding() -> String {
    "text-embedding-3-small".into()
}
fn d_5000() -> u64 {
    5000
}
