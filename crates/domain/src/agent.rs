use serde::{Deserialize, Serialize};

use crate::tool::ToolConfig;

/// Substituted for a missing agent name or description so the engine never
/// receives a null.
pub const UNDEFINED: &str = "undefined";

/// Citation names of the two aliases every run's model list carries for
/// agents configured before per-agent model selection existed.
pub const MAIN_MODEL_ALIAS: &str = "main_model";
pub const SUB_MODEL_ALIAS: &str = "sub_model";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Language
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Response language; selects prompt templates and marker text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl Language {
    /// Parse a loose language tag (`"zh-CN"`, `"en_US"`, `"ZH"`).
    /// Unknown tags fall back to English.
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim().to_ascii_lowercase();
        if tag.starts_with("zh") {
            Self::Zh
        } else {
            Self::En
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Resolved agent tree
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Prompt templates handed to the engine alongside the agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptTemplates {
    /// The fully rendered system prompt.
    pub system_prompt: String,
    /// Template the engine uses when a manager delegates to this agent.
    pub managed_agent_task: String,
    /// Template for the final-answer step.
    pub final_answer: String,
}

/// One node of the executable agent tree.
///
/// Built fresh for every run and discarded afterwards. The store it is
/// built from must be acyclic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    pub description: String,
    pub prompt_templates: PromptTemplates,
    pub max_steps: u32,
    pub model_name: String,
    pub provide_run_summary: bool,
    pub tools: Vec<ToolConfig>,
    pub managed_agents: Vec<AgentConfig>,
}

impl AgentConfig {
    /// Depth of the tree rooted here (a leaf has depth 1).
    pub fn depth(&self) -> usize {
        1 + self
            .managed_agents
            .iter()
            .map(AgentConfig::depth)
            .max()
            .unwrap_or(0)
    }

    /// Visit this agent and every nested managed agent, depth-first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a AgentConfig)) {
        visit(self);
        for child in &self.managed_agents {
            child.walk(visit);
        }
    }
}

/// One model binding available to the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Name agents use to reference this model.
    pub cite_name: String,
    #[serde(default)]
    pub api_key: String,
    pub model_name: String,
    pub url: String,
}

impl ModelConfig {
    /// Same binding under a different citation name.
    pub fn aliased(&self, cite_name: &str) -> Self {
        Self {
            cite_name: cite_name.to_owned(),
            ..self.clone()
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation history
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A prior turn of the conversation (provider-agnostic).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
}

impl HistoryMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }
}
