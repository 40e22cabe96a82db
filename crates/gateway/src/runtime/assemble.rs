//! Assemble everything the engine needs for one run.

use std::collections::HashMap;

use ar_domain::agent::{
    AgentConfig, HistoryMessage, Language, ModelConfig, MAIN_MODEL_ALIAS, SUB_MODEL_ALIAS,
};
use ar_domain::trace::TraceEvent;
use serde::{Deserialize, Serialize};

use super::cancel::CancelToken;
use super::config_tree::{ConfigTreeBuilder, ResolveScope};
use super::error::RunError;
use super::mcp_filter;
use super::Runtime;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / identity
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A file the client attached to the query, already described by the
/// upload service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// What the client asked for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub conversation_id: String,
    pub agent_id: String,
    pub query: String,
    #[serde(default)]
    pub history: Vec<HistoryMessage>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Debug runs are neither persisted nor remembered.
    #[serde(default)]
    pub is_debug: bool,
}

/// Who is asking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub tenant_id: String,
    pub user_id: String,
    pub language: Language,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Run info
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Formatting hints for the engine's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputObserver {
    pub language: Language,
}

/// The complete, engine-ready description of a run.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRunInfo {
    /// Final query text, including the attachment preamble.
    pub query: String,
    pub models: Vec<ModelConfig>,
    pub agent: AgentConfig,
    pub mcp_urls: Vec<String>,
    pub history: Vec<HistoryMessage>,
    pub observer: OutputObserver,
    #[serde(skip)]
    pub cancel: CancelToken,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Assembler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct RunAssembler<'a> {
    rt: &'a Runtime,
}

impl<'a> RunAssembler<'a> {
    pub fn new(rt: &'a Runtime) -> Self {
        Self { rt }
    }

    /// Build the run info with a fresh cancellation token.
    pub async fn assemble(
        &self,
        request: &RunRequest,
        identity: &Identity,
        allow_memory_search: bool,
    ) -> Result<AgentRunInfo, RunError> {
        let query = with_attachment_preamble(&request.query, &request.attachments, identity.language);
        let models = self.models(&identity.tenant_id).await?;

        let scope = ResolveScope {
            tenant_id: identity.tenant_id.clone(),
            user_id: identity.user_id.clone(),
            language: identity.language,
            last_user_query: query.clone(),
            allow_memory_search,
        };
        let agent = ConfigTreeBuilder::new(self.rt)
            .resolve(&request.agent_id, &scope)
            .await?;

        let endpoints = self.endpoints(&identity.tenant_id).await?;
        let mcp_urls = mcp_filter::filter(&agent, &endpoints);
        TraceEvent::McpEndpointsResolved {
            registered: endpoints.len(),
            referenced: mcp_urls.len(),
        }
        .emit();

        Ok(AgentRunInfo {
            query,
            models,
            agent,
            mcp_urls,
            history: request.history.clone(),
            observer: OutputObserver {
                language: identity.language,
            },
            cancel: CancelToken::new(),
        })
    }

    /// Tenant models plus the two legacy aliases of the default model.
    async fn models(&self, tenant_id: &str) -> Result<Vec<ModelConfig>, RunError> {
        let store = &self.rt.store;
        let mut models = store.models(tenant_id).await.map_err(RunError::config)?;
        match store.default_model(tenant_id).await.map_err(RunError::config)? {
            Some(default) => {
                models.push(default.aliased(MAIN_MODEL_ALIAS));
                models.push(default.aliased(SUB_MODEL_ALIAS));
            }
            None => {
                tracing::warn!(tenant_id, "tenant has no default model; legacy aliases unavailable");
            }
        }
        Ok(models)
    }

    /// Enabled tenant endpoints plus the local tool server, by name.
    async fn endpoints(&self, tenant_id: &str) -> Result<HashMap<String, String>, RunError> {
        let registered = self
            .rt
            .store
            .mcp_endpoints(tenant_id)
            .await
            .map_err(RunError::config)?;

        let mut map: HashMap<String, String> = registered
            .into_iter()
            .filter(|e| e.enabled)
            .map(|e| (e.name, e.url))
            .collect();

        let local = &self.rt.config.mcp;
        map.insert(local.local_endpoint_name.clone(), local.local_endpoint_url.clone());
        Ok(map)
    }
}

/// Prefix the query with a description of each attachment.
pub fn with_attachment_preamble(
    query: &str,
    attachments: &[Attachment],
    language: Language,
) -> String {
    if attachments.is_empty() {
        return query.to_owned();
    }

    let (header, footer) = match language {
        Language::En => ("The user uploaded the following files:", "User question:"),
        Language::Zh => ("用户上传了以下文件：", "用户问题："),
    };

    let mut out = String::from(header);
    out.push('\n');
    for a in attachments {
        if a.description.trim().is_empty() {
            out.push_str(&format!("- {}\n", a.name));
        } else {
            out.push_str(&format!("- {}: {}\n", a.name, a.description.trim()));
        }
    }
    out.push('\n');
    out.push_str(footer);
    out.push('\n');
    out.push_str(query);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_attachments_keeps_query() {
        assert_eq!(with_attachment_preamble("hi", &[], Language::En), "hi");
    }

    #[test]
    fn attachments_are_listed_before_query() {
        let files = vec![
            Attachment {
                name: "q3.pdf".into(),
                description: " quarterly report ".into(),
            },
            Attachment {
                name: "logo.png".into(),
                description: String::new(),
            },
        ];
        let out = with_attachment_preamble("summarize", &files, Language::En);
        assert_eq!(
            out,
            "The user uploaded the following files:\n\
             - q3.pdf: quarterly report\n\
             - logo.png\n\
             \n\
             User question:\nsummarize"
        );
    }

    #[test]
    fn cancel_token_is_not_serialized() {
        let info = AgentRunInfo {
            query: "q".into(),
            models: vec![],
            agent: AgentConfig {
                name: "a".into(),
                description: "d".into(),
                prompt_templates: Default::default(),
                max_steps: 1,
                model_name: MAIN_MODEL_ALIAS.into(),
                provide_run_summary: false,
                tools: vec![],
                managed_agents: vec![],
            },
            mcp_urls: vec![],
            history: vec![HistoryMessage::user("earlier")],
            observer: OutputObserver {
                language: Language::Zh,
            },
            cancel: CancelToken::new(),
        };
        let v = serde_json::to_value(&info).unwrap();
        assert!(v.get("cancel").is_none());
        assert_eq!(v["observer"]["language"], "zh");
        assert_eq!(v["history"][0]["role"], "user");
    }
}
