//! Agent definitions, tool bindings, models and per-user memory settings.
//!
//! The orchestration layer only reads through [`AgentStore`]. The shipped
//! implementation is a TOML catalog ([`catalog::CatalogStore`]); a database
//! backed store plugs in behind the same trait.

pub mod catalog;

use std::collections::BTreeMap;

use ar_domain::agent::ModelConfig;
use ar_domain::error::Result;
use ar_domain::tool::{ToolConfig, ToolSource};
use ar_memory::MemoryUserConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use catalog::CatalogStore;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Records
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A stored agent definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub agent_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Structured prompt segments. When any is present the system prompt is
    /// rendered from the language template.
    #[serde(default)]
    pub duty_prompt: Option<String>,
    #[serde(default)]
    pub constraint_prompt: Option<String>,
    #[serde(default)]
    pub few_shots_prompt: Option<String>,
    /// Free-form system prompt for agents that predate the segments.
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default = "d_max_steps")]
    pub max_steps: u32,
    /// Citation name of the model; `None` means the main-model alias.
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub provide_run_summary: bool,
}

impl AgentRecord {
    pub fn has_structured_prompt(&self) -> bool {
        [&self.duty_prompt, &self.constraint_prompt, &self.few_shots_prompt]
            .iter()
            .any(|p| p.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

fn d_max_steps() -> u32 {
    5
}

/// One parameter of a tool binding with its configured value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParam {
    pub name: String,
    #[serde(default)]
    pub default: serde_json::Value,
}

/// A tool attached to an agent for a given user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolBinding {
    pub name: String,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub description: String,
    /// JSON-schema-like input description, passed through verbatim.
    #[serde(default)]
    pub inputs: String,
    #[serde(default = "d_output_type")]
    pub output_type: String,
    #[serde(default)]
    pub params: Vec<ToolParam>,
    pub source: ToolSource,
    /// For MCP tools, the name of the endpoint that serves the tool.
    #[serde(default)]
    pub usage: Option<String>,
    #[serde(default = "d_true")]
    pub enabled: bool,
}

fn d_output_type() -> String {
    "string".into()
}

fn d_true() -> bool {
    true
}

impl ToolBinding {
    /// Descriptor with parameters taken from their defaults and no
    /// metadata attached yet.
    pub fn to_tool_config(&self) -> ToolConfig {
        let params: BTreeMap<String, serde_json::Value> = self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.default.clone()))
            .collect();

        ToolConfig {
            class_name: self.class_name.clone().unwrap_or_else(|| self.name.clone()),
            name: self.name.clone(),
            description: self.description.clone(),
            inputs: self.inputs.clone(),
            output_type: self.output_type.clone(),
            params,
            source: self.source,
            usage: self.usage.clone(),
            metadata: None,
        }
    }
}

/// A tenant-registered remote tool server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpEndpoint {
    pub name: String,
    pub url: String,
    #[serde(default = "d_true")]
    pub enabled: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
pub trait AgentStore: Send + Sync {
    /// Fails with `Error::AgentNotFound` for unknown ids.
    async fn agent(&self, agent_id: &str, tenant_id: &str) -> Result<AgentRecord>;

    /// Direct sub-agents, in configured order.
    async fn sub_agent_ids(&self, agent_id: &str, tenant_id: &str) -> Result<Vec<String>>;

    async fn tool_bindings(
        &self,
        agent_id: &str,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<Vec<ToolBinding>>;

    async fn models(&self, tenant_id: &str) -> Result<Vec<ModelConfig>>;

    async fn default_model(&self, tenant_id: &str) -> Result<Option<ModelConfig>>;

    async fn mcp_endpoints(&self, tenant_id: &str) -> Result<Vec<McpEndpoint>>;

    async fn memory_settings(&self, tenant_id: &str, user_id: &str) -> Result<MemoryUserConfig>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_params_become_defaults() {
        let binding = ToolBinding {
            name: "web_search".into(),
            class_name: None,
            description: "search".into(),
            inputs: "{}".into(),
            output_type: "string".into(),
            params: vec![
                ToolParam {
                    name: "top_k".into(),
                    default: serde_json::json!(3),
                },
                ToolParam {
                    name: "lang".into(),
                    default: serde_json::json!("en"),
                },
            ],
            source: ToolSource::Local,
            usage: None,
            enabled: true,
        };
        let tool = binding.to_tool_config();
        assert_eq!(tool.class_name, "web_search");
        assert_eq!(tool.params["top_k"], serde_json::json!(3));
        assert_eq!(tool.params["lang"], serde_json::json!("en"));
        assert!(tool.metadata.is_none());
    }

    #[test]
    fn structured_prompt_detection_ignores_blank_segments() {
        let mut rec = AgentRecord {
            agent_id: "a".into(),
            duty_prompt: Some("   ".into()),
            ..Default::default()
        };
        assert!(!rec.has_structured_prompt());
        rec.few_shots_prompt = Some("Q: hi\nA: hello".into());
        assert!(rec.has_structured_prompt());
    }
}
