use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Name of the built-in knowledge-base search tool.
pub const KNOWLEDGE_BASE_TOOL: &str = "knowledge_base_search";

/// Where a tool implementation comes from.
///
/// Every resolution site matches on this exhaustively; nothing compares
/// source strings directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolSource {
    /// Compiled into the execution engine.
    Local,
    /// Discovered at run time from the plugin directory.
    Plugin,
    /// Served by a remote MCP endpoint named by `usage`.
    Mcp,
    /// The knowledge-base search tool backed by the vector index service.
    KnowledgeBase,
}

impl ToolSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Plugin => "plugin",
            Self::Mcp => "mcp",
            Self::KnowledgeBase => "knowledge_base",
        }
    }
}

impl std::fmt::Display for ToolSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An executable tool descriptor handed to the execution engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Implementation class identifier understood by the engine.
    pub class_name: String,
    /// Display name exposed to the model.
    pub name: String,
    pub description: String,
    /// JSON Schema text for the tool's inputs.
    pub inputs: String,
    pub output_type: String,
    /// Parameter name → default value.
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
    pub source: ToolSource,
    /// Source-specific key, e.g. the MCP endpoint name for `Mcp` tools.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    /// Runtime metadata (plugin descriptor, knowledge-base handles, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ToolConfig {
    pub fn is_knowledge_base(&self) -> bool {
        self.source == ToolSource::KnowledgeBase
    }
}
