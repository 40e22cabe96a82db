//! Tool resolution: turn an agent's stored tool bindings into executable
//! descriptors with the runtime metadata each source needs.

use std::collections::HashMap;

use ar_domain::tool::{ToolConfig, ToolSource};
use serde_json::{json, Value};

use super::error::RunError;
use super::Runtime;

pub struct ToolResolver<'a> {
    rt: &'a Runtime,
}

impl<'a> ToolResolver<'a> {
    pub fn new(rt: &'a Runtime) -> Self {
        Self { rt }
    }

    /// Enabled tools of `agent_id` for this user, in binding order.
    ///
    /// Plugin discovery runs at most once per call and only when a plugin
    /// tool is bound. Discovery failures are logged; the affected tools
    /// simply carry no metadata.
    pub async fn resolve_tools(
        &self,
        agent_id: &str,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<Vec<ToolConfig>, RunError> {
        let bindings = self
            .rt
            .store
            .tool_bindings(agent_id, tenant_id, user_id)
            .await
            .map_err(RunError::config)?;

        let enabled: Vec<_> = bindings.into_iter().filter(|b| b.enabled).collect();

        let plugins = if enabled.iter().any(|b| b.source == ToolSource::Plugin) {
            self.scan_plugins().await
        } else {
            HashMap::new()
        };

        let tools = enabled
            .iter()
            .map(|binding| {
                let mut tool = binding.to_tool_config();
                tool.metadata = match tool.source {
                    ToolSource::Local | ToolSource::Mcp => None,
                    ToolSource::Plugin => {
                        let found = plugins.get(&tool.name).cloned();
                        if found.is_none() {
                            tracing::warn!(tool = %tool.name, agent_id, "no plugin manifest for bound tool");
                        }
                        found
                    }
                    ToolSource::KnowledgeBase => Some(self.knowledge_metadata(&tool)),
                };
                tool
            })
            .collect();

        Ok(tools)
    }

    async fn scan_plugins(&self) -> HashMap<String, Value> {
        let discovered = match self.rt.plugins.scan().await {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, "plugin discovery failed");
                return HashMap::new();
            }
        };

        let mut out = HashMap::with_capacity(discovered.len());
        for plugin in discovered {
            match serde_json::to_value(&plugin) {
                Ok(descriptor) => {
                    out.insert(plugin.name.clone(), descriptor);
                }
                Err(e) => {
                    tracing::warn!(plugin = %plugin.name, error = %e, "skipping plugin");
                }
            }
        }
        out
    }

    /// Handles the knowledge-base tool needs to query the vector index.
    fn knowledge_metadata(&self, tool: &ToolConfig) -> Value {
        let knowledge = &self.rt.config.knowledge;
        json!({
            "index_names": index_names(tool),
            "vector_backend": { "base_url": knowledge.base_url },
            "embedding_model": knowledge.embedding_model,
        })
    }
}

/// Index names selected for a knowledge-base tool (`index_names` param).
pub fn index_names(tool: &ToolConfig) -> Vec<String> {
    match tool.params.get("index_names") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_owned))
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}
