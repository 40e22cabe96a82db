mod support;

use ar_domain::agent::{Language, MAIN_MODEL_ALIAS, SUB_MODEL_ALIAS, UNDEFINED};
use ar_domain::tool::ToolSource;
use ar_gateway::runtime::assemble::RunAssembler;
use ar_gateway::runtime::config_tree::{ConfigTreeBuilder, ResolveScope};
use ar_gateway::runtime::RunError;

use support::*;

fn scope(user_id: &str, allow_memory_search: bool) -> ResolveScope {
    ResolveScope {
        tenant_id: "acme".into(),
        user_id: user_id.into(),
        language: Language::En,
        last_user_query: "what changed?".into(),
        allow_memory_search,
    }
}

#[tokio::test]
async fn tree_follows_catalog_order() {
    let h = Harness::with_engine(ScriptedEngine::default());
    let scope = scope("u1", false);
    let root = ConfigTreeBuilder::new(&h.rt)
        .resolve("planner", &scope)
        .await
        .unwrap();

    assert_eq!(root.name, "planner");
    assert_eq!(root.depth(), 3);

    let names: Vec<&str> = root.managed_agents.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, [UNDEFINED, "writer"]);

    let researcher = &root.managed_agents[0];
    assert_eq!(researcher.description, UNDEFINED);
    assert_eq!(researcher.managed_agents[0].name, "fact_checker");

    let mut visited = Vec::new();
    root.walk(&mut |a| visited.push(a.name.clone()));
    assert_eq!(visited, ["planner", UNDEFINED, "fact_checker", "writer"]);
}

#[tokio::test]
async fn legacy_prompt_is_used_verbatim() {
    let h = Harness::with_engine(ScriptedEngine::default());
    let scope = scope("u1", false);
    let root = ConfigTreeBuilder::new(&h.rt)
        .resolve("planner", &scope)
        .await
        .unwrap();

    let researcher = &root.managed_agents[0];
    assert_eq!(researcher.prompt_templates.system_prompt, "You research things.");
    assert!(researcher.prompt_templates.managed_agent_task.contains("{{task}}"));

    let planner_prompt = &root.prompt_templates.system_prompt;
    assert!(planner_prompt.contains("Break the task down and delegate."));
    assert!(planner_prompt.contains("Be brief."));
    assert!(planner_prompt.contains("- writer: Writes the report"));
    assert!(planner_prompt.contains("- web_search"));
}

#[tokio::test]
async fn knowledge_summary_skips_failing_indices() {
    let h = Harness::with_engine(ScriptedEngine::default());
    let scope = scope("u1", false);
    let root = ConfigTreeBuilder::new(&h.rt)
        .resolve("planner", &scope)
        .await
        .unwrap();

    let prompt = &root.prompt_templates.system_prompt;
    assert!(prompt.contains("**docs**: Product manuals.\n\n**faq**: Common questions."));
    assert!(!prompt.contains("**missing**"));

    let kb = root.tools.iter().find(|t| t.is_knowledge_base()).unwrap();
    let meta = kb.metadata.as_ref().unwrap();
    assert_eq!(meta["index_names"], serde_json::json!(["docs", "missing", "faq"]));
    assert_eq!(meta["vector_backend"]["base_url"], h.rt.config.knowledge.base_url.as_str());
}

#[tokio::test]
async fn tools_keep_binding_order_and_drop_disabled() {
    let h = Harness::with_engine(ScriptedEngine::default());
    let scope = scope("u1", false);
    let root = ConfigTreeBuilder::new(&h.rt)
        .resolve("planner", &scope)
        .await
        .unwrap();

    let names: Vec<&str> = root.tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["web_search", "list_issues", "knowledge_base_search"]);
    assert!(root.tools[0].metadata.is_none());
    assert_eq!(root.tools[1].source, ToolSource::Mcp);
    assert_eq!(root.tools[1].usage.as_deref(), Some("github"));
}

#[tokio::test]
async fn plugin_tools_carry_their_manifest() {
    let h = Harness::with_engine(ScriptedEngine::default());
    let scope = scope("u1", false);
    let checker = ConfigTreeBuilder::new(&h.rt)
        .resolve("fact_checker", &scope)
        .await
        .unwrap();

    let tool = &checker.tools[0];
    assert_eq!(tool.source, ToolSource::Plugin);
    let meta = tool.metadata.as_ref().unwrap();
    assert_eq!(meta["class_name"], "PdfReaderTool");
    assert_eq!(meta["entrypoint"], "plugins/pdf_reader.py");
}

#[tokio::test]
async fn model_name_defaults_to_main_alias() {
    let h = Harness::with_engine(ScriptedEngine::default());
    let scope = scope("u1", false);
    let root = ConfigTreeBuilder::new(&h.rt)
        .resolve("planner", &scope)
        .await
        .unwrap();

    assert_eq!(root.model_name, "deep");
    assert_eq!(root.managed_agents[1].model_name, MAIN_MODEL_ALIAS);
    assert_eq!(root.max_steps, 5);
}

#[tokio::test]
async fn memory_is_searched_only_when_allowed() {
    let h = Harness::with_engine(ScriptedEngine::default());

    let plain = scope("mem", false);
    ConfigTreeBuilder::new(&h.rt)
        .resolve("writer", &plain)
        .await
        .unwrap();
    assert!(h.memory.searches.lock().is_empty());

    let with_memory = scope("mem", true);
    let writer = ConfigTreeBuilder::new(&h.rt)
        .resolve("writer", &with_memory)
        .await
        .unwrap();
    let searches = h.memory.searches.lock().clone();
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0].query, "what changed?");
    assert!(writer
        .prompt_templates
        .system_prompt
        .contains("- [user] writer prefers tables"));
}

#[tokio::test]
async fn memory_switch_off_means_no_search() {
    let h = Harness::with_engine(ScriptedEngine::default());
    let scope = scope("u1", true);
    ConfigTreeBuilder::new(&h.rt)
        .resolve("planner", &scope)
        .await
        .unwrap();
    assert!(h.memory.searches.lock().is_empty());
}

#[tokio::test]
async fn tools_belong_to_their_own_node() {
    let h = Harness::with_engine(ScriptedEngine::default());
    let scope = scope("u1", false);
    let researcher = ConfigTreeBuilder::new(&h.rt)
        .resolve("researcher", &scope)
        .await
        .unwrap();

    assert_eq!(researcher.managed_agents.len(), 1);
    assert!(!researcher.prompt_templates.system_prompt.is_empty());
    let names: Vec<&str> = researcher.tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["read_file", "tickets"]);
    assert_eq!(researcher.managed_agents[0].tools[0].name, "pdf_reader");
}

#[tokio::test]
async fn failed_memory_search_is_a_preparation_error() {
    let h = Harness::new(FakeMemory::failing(), ScriptedEngine::default());
    let scope = scope("mem", true);
    let err = ConfigTreeBuilder::new(&h.rt)
        .resolve("writer", &scope)
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::MemoryPreparation(_)));
}

#[tokio::test]
async fn unknown_agent_is_a_configuration_error() {
    let h = Harness::with_engine(ScriptedEngine::default());
    let scope = scope("u1", false);
    let err = ConfigTreeBuilder::new(&h.rt)
        .resolve("ghost", &scope)
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::ConfigResolution(_)));
}

#[tokio::test]
async fn assembled_run_lists_models_and_referenced_endpoints() {
    let h = Harness::with_engine(ScriptedEngine::default());
    let info = RunAssembler::new(&h.rt)
        .assemble(&request("c1", "planner", "go"), &identity("u1"), false)
        .await
        .unwrap();

    let cites: Vec<&str> = info.models.iter().map(|m| m.cite_name.as_str()).collect();
    assert_eq!(cites, ["fast", "deep", MAIN_MODEL_ALIAS, SUB_MODEL_ALIAS]);
    assert_eq!(info.models[2].model_name, "gpt-4o-mini");

    // `jira` is registered but disabled, so `tickets` contributes nothing.
    assert_eq!(
        info.mcp_urls,
        [
            h.rt.config.mcp.local_endpoint_url.clone(),
            "http://mcp-github/sse".to_owned(),
        ]
    );
    assert!(!info.cancel.is_cancelled());
}
