//! Narrow the registered MCP endpoints to the ones a tree actually uses.

use std::collections::{BTreeSet, HashMap};

use ar_domain::agent::AgentConfig;
use ar_domain::tool::ToolSource;

/// URLs of the endpoints referenced by MCP tools anywhere in `tree`.
///
/// `endpoints` maps endpoint name to URL. References to unknown names are
/// dropped. The result is deduplicated and sorted.
pub fn filter(tree: &AgentConfig, endpoints: &HashMap<String, String>) -> Vec<String> {
    let mut urls = BTreeSet::new();
    tree.walk(&mut |agent| {
        for tool in &agent.tools {
            match tool.source {
                ToolSource::Mcp => {
                    let url = tool.usage.as_deref().and_then(|name| endpoints.get(name));
                    match url {
                        Some(url) => {
                            urls.insert(url.clone());
                        }
                        None => {
                            tracing::debug!(tool = %tool.name, usage = ?tool.usage, "mcp tool references unknown endpoint");
                        }
                    }
                }
                ToolSource::Local | ToolSource::Plugin | ToolSource::KnowledgeBase => {}
            }
        }
    });
    urls.into_iter().collect()
}
