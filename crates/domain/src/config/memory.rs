use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Memory service connection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryServiceConfig {
    #[serde(default = "d_memory_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "d_8000")]
    pub timeout_ms: u64,
    #[serde(default = "d_3")]
    pub max_retries: u32,
    /// Maximum number of memories returned per search.
    #[serde(default = "d_5")]
    pub top_k: u32,
    /// Minimum similarity score for a search hit (0.0-1.0).
    #[serde(default = "d_threshold")]
    pub threshold: f64,
    /// Backend settings forwarded verbatim with every search/add call.
    #[serde(default)]
    pub backend: MemoryBackendConfig,
}

impl Default for MemoryServiceConfig {
    fn default() -> Self {
        Self {
            base_url: d_memory_url(),
            api_key: None,
            timeout_ms: 8000,
            max_retries: 3,
            top_k: 5,
            threshold: d_threshold(),
            backend: MemoryBackendConfig::default(),
        }
    }
}

/// How the memory service stores and extracts memories.  Opaque to the
/// gateway; anything beyond the named keys lands in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryBackendConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_store: Option<String>,
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_memory_url() -> String {
    "http://localhost:5010".into()
}
fn d_8000() -> u64 {
    8000
}
fn d_3() -> u32 {
    3
}
fn d_5() -> u32 {
    5
}
fn d_threshold() -> f64 {
    0.65
}
