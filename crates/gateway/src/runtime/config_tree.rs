//! Resolve an agent id into the executable agent tree.
//!
//! Each node is built from its stored record: sub-agents first (depth-first,
//! in configured order), then tools, optional memory retrieval, knowledge
//! summaries, and finally the rendered system prompt. The store must be
//! acyclic; a cycle would recurse until the stack is exhausted.

use ar_domain::agent::{AgentConfig, Language, MAIN_MODEL_ALIAS, UNDEFINED};
use ar_domain::tool::ToolConfig;
use ar_domain::trace::TraceEvent;
use ar_memory::{MemoryContext, MemoryRecord};
use futures_util::future::BoxFuture;

use super::error::RunError;
use super::prompt::{self, AgentSummary, SystemPromptContext, ToolSummary};
use super::tools::{index_names, ToolResolver};
use super::Runtime;
use crate::store::AgentRecord;

/// Who the tree is being built for.
#[derive(Debug, Clone)]
pub struct ResolveScope {
    pub tenant_id: String,
    pub user_id: String,
    pub language: Language,
    /// Query the memory search runs against.
    pub last_user_query: String,
    pub allow_memory_search: bool,
}

pub struct ConfigTreeBuilder<'a> {
    rt: &'a Runtime,
}

impl<'a> ConfigTreeBuilder<'a> {
    pub fn new(rt: &'a Runtime) -> Self {
        Self { rt }
    }

    /// Build the tree rooted at `agent_id`.
    ///
    /// Store and tool failures become `RunError::ConfigResolution`; a failed
    /// memory search becomes `RunError::MemoryPreparation`. Knowledge-base
    /// summaries are best effort.
    pub fn resolve<'b>(
        &'b self,
        agent_id: &'b str,
        scope: &'b ResolveScope,
    ) -> BoxFuture<'b, Result<AgentConfig, RunError>> {
        Box::pin(async move {
            let store = &self.rt.store;
            let tenant_id = scope.tenant_id.as_str();

            let record = store
                .agent(agent_id, tenant_id)
                .await
                .map_err(RunError::config)?;

            let sub_ids = store
                .sub_agent_ids(agent_id, tenant_id)
                .await
                .map_err(RunError::config)?;
            let mut managed_agents = Vec::with_capacity(sub_ids.len());
            for sub_id in &sub_ids {
                managed_agents.push(self.resolve(sub_id, scope).await?);
            }

            let tools = ToolResolver::new(self.rt)
                .resolve_tools(agent_id, tenant_id, &scope.user_id)
                .await?;

            let memories = self.search_memory(agent_id, scope).await?;

            let knowledge_summary = match tools.iter().find(|t| t.is_knowledge_base()) {
                Some(kb) => self.knowledge_summary(kb, scope).await,
                None => String::new(),
            };

            let name = non_empty_or_undefined(record.name.as_deref());
            let description = non_empty_or_undefined(record.description.as_deref());

            let system_prompt = if record.has_structured_prompt() {
                self.render_prompt(
                    &record,
                    &name,
                    &tools,
                    &managed_agents,
                    &memories,
                    &knowledge_summary,
                    scope.language,
                )?
            } else {
                record.prompt.clone().unwrap_or_default()
            };

            TraceEvent::ConfigTreeResolved {
                agent_id: agent_id.to_owned(),
                tool_count: tools.len(),
                managed_agent_count: managed_agents.len(),
                memory_hits: memories.len(),
                knowledge_summary_chars: knowledge_summary.chars().count(),
            }
            .emit();

            Ok(AgentConfig {
                name,
                description,
                prompt_templates: prompt::templates(scope.language, system_prompt),
                max_steps: record.max_steps,
                model_name: record
                    .model_name
                    .clone()
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| MAIN_MODEL_ALIAS.to_owned()),
                provide_run_summary: record.provide_run_summary,
                tools,
                managed_agents,
            })
        })
    }

    async fn search_memory(
        &self,
        agent_id: &str,
        scope: &ResolveScope,
    ) -> Result<Vec<MemoryRecord>, RunError> {
        if !scope.allow_memory_search {
            return Ok(Vec::new());
        }

        let settings = self
            .rt
            .store
            .memory_settings(&scope.tenant_id, &scope.user_id)
            .await
            .map_err(RunError::config)?;
        let ctx = MemoryContext::new(
            settings,
            &self.rt.config.memory,
            &scope.tenant_id,
            &scope.user_id,
            agent_id,
        );
        if !ctx.enabled() {
            return Ok(Vec::new());
        }

        let levels = ctx.search_levels(agent_id);
        let request = ctx.search_request(&scope.last_user_query, agent_id, levels);
        let found = self
            .rt
            .memory
            .search(request)
            .await
            .map_err(|e| RunError::MemoryPreparation(format!("search for {agent_id}: {e}")))?;

        tracing::debug!(agent_id, hits = found.results.len(), "memory search done");
        Ok(found.results)
    }

    /// One paragraph per index; indices that fail are logged and left out.
    async fn knowledge_summary(&self, tool: &ToolConfig, scope: &ResolveScope) -> String {
        let mut summary = String::new();
        for index in index_names(tool) {
            match self
                .rt
                .knowledge
                .summary(&index, &scope.tenant_id, scope.language)
                .await
            {
                Ok(text) => {
                    summary.push_str(&format!("**{index}**: {text}\n\n"));
                }
                Err(e) => {
                    tracing::warn!(index = %index, error = %e, "knowledge summary unavailable");
                }
            }
        }
        summary
    }

    #[allow(clippy::too_many_arguments)]
    fn render_prompt(
        &self,
        record: &AgentRecord,
        name: &str,
        tools: &[ToolConfig],
        managed_agents: &[AgentConfig],
        memories: &[MemoryRecord],
        knowledge_summary: &str,
        language: Language,
    ) -> Result<String, RunError> {
        let app = &self.rt.config.prompt;
        let ctx = SystemPromptContext {
            name,
            duty: record.duty_prompt.as_deref().unwrap_or_default(),
            constraint: record.constraint_prompt.as_deref().unwrap_or_default(),
            few_shots: record.few_shots_prompt.as_deref().unwrap_or_default(),
            tools: tools
                .iter()
                .map(|t| ToolSummary {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    inputs: t.inputs.clone(),
                    output_type: t.output_type.clone(),
                })
                .collect(),
            managed_agents: managed_agents
                .iter()
                .map(|a| AgentSummary {
                    name: a.name.clone(),
                    description: a.description.clone(),
                })
                .collect(),
            memory_list: memories,
            knowledge_base_summary: knowledge_summary,
            app_name: &app.app_name,
            app_description: &app.app_description,
            time: prompt::now_string(),
        };
        prompt::render_system_prompt(language, &ctx).map_err(RunError::config)
    }
}

fn non_empty_or_undefined(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_owned(),
        _ => UNDEFINED.to_owned(),
    }
}
