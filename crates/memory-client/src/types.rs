//! Data Transfer Objects for the memory service API.
//!
//! Field names are `snake_case` on the wire.

use ar_domain::config::MemoryBackendConfig;
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Memory levels
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Scope at which a memory is stored and retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryLevel {
    /// Shared by every user of the tenant.
    Tenant,
    /// Shared by every user of one agent.
    Agent,
    /// Private to one user, across agents.
    User,
    /// Private to one user of one agent.
    UserAgent,
}

impl MemoryLevel {
    pub const ALL: [MemoryLevel; 4] = [Self::Tenant, Self::Agent, Self::User, Self::UserAgent];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tenant => "tenant",
            Self::Agent => "agent",
            Self::User => "user",
            Self::UserAgent => "user_agent",
        }
    }
}

impl std::fmt::Display for MemoryLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Search
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// POST /memory/search: request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySearchRequest {
    pub query: String,
    pub tenant_id: String,
    pub user_id: String,
    pub agent_id: String,
    pub memory_levels: Vec<MemoryLevel>,
    pub top_k: u32,
    pub threshold: f64,
    pub config: MemoryBackendConfig,
}

/// POST /memory/search: response body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemorySearchResponse {
    #[serde(default)]
    pub results: Vec<MemoryRecord>,
}

/// One retrieved memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub memory: String,
    pub memory_level: MemoryLevel,
    #[serde(default)]
    pub score: Option<f64>,
    /// Timestamp string from the memory service (format not normalized).
    #[serde(default)]
    pub updated_at: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Add
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A message the memory service extracts memories from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryMessage {
    pub role: String,
    pub content: String,
}

impl MemoryMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

/// POST /memory/add: request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryAddRequest {
    pub messages: Vec<MemoryMessage>,
    pub tenant_id: String,
    pub user_id: String,
    pub agent_id: String,
    pub memory_levels: Vec<MemoryLevel>,
    /// Let the service extract facts instead of storing raw text.
    #[serde(default = "default_infer")]
    pub infer: bool,
    pub config: MemoryBackendConfig,
}

fn default_infer() -> bool {
    true
}

/// POST /memory/add: response body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryAddResponse {
    #[serde(default)]
    pub results: Vec<MemoryEvent>,
}

/// What the service did with one extracted memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub memory: Option<String>,
    /// `ADD`, `UPDATE`, `DELETE` or `NONE`.
    #[serde(default)]
    pub event: Option<String>,
}
