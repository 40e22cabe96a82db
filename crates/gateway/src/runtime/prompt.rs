//! System-prompt templates and rendering.
//!
//! The system prompt is a minijinja template per language. The two other
//! templates (`managed_agent_task`, `final_answer`) are passed to the engine
//! unrendered; their `{{task}}` and `{{name}}` placeholders belong to it.

use ar_domain::agent::{Language, PromptTemplates};
use ar_domain::error::{Error, Result};
use ar_memory::MemoryRecord;
use minijinja::Environment;
use serde::Serialize;

const SYSTEM_EN: &str = r#"You are {{ name }}, an assistant of {{ app_name }}. {{ app_description }}
The current time is {{ time }}.

## Duty
{{ duty }}
{% if tools %}
## Tools
You can call the following tools:
{% for tool in tools %}- {{ tool.name }}: {{ tool.description }}
  Inputs: {{ tool.inputs }}
  Returns: {{ tool.output_type }}
{% endfor %}{% endif %}{% if managed_agents %}
## Team members
You can delegate sub-tasks to the following agents:
{% for agent in managed_agents %}- {{ agent.name }}: {{ agent.description }}
{% endfor %}{% endif %}{% if knowledge_base_summary %}
## Knowledge bases
{{ knowledge_base_summary }}
{% endif %}{% if memory_list %}
## What you remember
{% for m in memory_list %}- [{{ m.memory_level }}] {{ m.memory }}
{% endfor %}{% endif %}
## Constraints
{{ constraint }}
{% if few_shots %}
## Examples
{{ few_shots }}
{% endif %}"#;

const SYSTEM_ZH: &str = r#"你是{{ name }}，{{ app_name }}的智能助手。{{ app_description }}
当前时间是 {{ time }}。

## 职责
{{ duty }}
{% if tools %}
## 可用工具
你可以调用以下工具：
{% for tool in tools %}- {{ tool.name }}：{{ tool.description }}
  输入：{{ tool.inputs }}
  返回：{{ tool.output_type }}
{% endfor %}{% endif %}{% if managed_agents %}
## 团队成员
你可以将子任务分派给以下助手：
{% for agent in managed_agents %}- {{ agent.name }}：{{ agent.description }}
{% endfor %}{% endif %}{% if knowledge_base_summary %}
## 知识库
{{ knowledge_base_summary }}
{% endif %}{% if memory_list %}
## 记忆
{% for m in memory_list %}- [{{ m.memory_level }}] {{ m.memory }}
{% endfor %}{% endif %}
## 约束
{{ constraint }}
{% if few_shots %}
## 示例
{{ few_shots }}
{% endif %}"#;

const MANAGED_TASK_EN: &str = "You're a helpful agent named '{{name}}'.\n\
You have been submitted this task by your manager.\n\
---\nTask:\n{{task}}\n---\n\
Give a thorough answer: your manager relies on it to solve the overall task.";

const MANAGED_TASK_ZH: &str = "你是一个名为“{{name}}”的助手。\n\
你的管理者交给你以下任务。\n\
---\n任务：\n{{task}}\n---\n\
请给出完整详尽的回答，管理者需要依靠它完成整体任务。";

const FINAL_ANSWER_EN: &str = "An agent tried to answer a user query but got stuck. \
Provide the best possible answer to the following request based on the steps so far:\n{{task}}";

const FINAL_ANSWER_ZH: &str = "助手在回答用户问题时未能完成。\
请根据已有的步骤，对以下请求给出尽可能好的回答：\n{{task}}";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Render context
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Serialize)]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
    pub inputs: String,
    pub output_type: String,
}

#[derive(Debug, Serialize)]
pub struct AgentSummary {
    pub name: String,
    pub description: String,
}

/// Everything the system-prompt template can reference.
#[derive(Debug, Serialize)]
pub struct SystemPromptContext<'a> {
    pub name: &'a str,
    pub duty: &'a str,
    pub constraint: &'a str,
    pub few_shots: &'a str,
    pub tools: Vec<ToolSummary>,
    pub managed_agents: Vec<AgentSummary>,
    pub memory_list: &'a [MemoryRecord],
    pub knowledge_base_summary: &'a str,
    pub app_name: &'a str,
    pub app_description: &'a str,
    pub time: String,
}

pub fn render_system_prompt(language: Language, ctx: &SystemPromptContext<'_>) -> Result<String> {
    let source = match language {
        Language::En => SYSTEM_EN,
        Language::Zh => SYSTEM_ZH,
    };
    Environment::new()
        .render_str(source, ctx)
        .map_err(|e| Error::Template(e.to_string()))
}

/// Templates for an agent, with the given system prompt.
pub fn templates(language: Language, system_prompt: String) -> PromptTemplates {
    let (managed_agent_task, final_answer) = match language {
        Language::En => (MANAGED_TASK_EN, FINAL_ANSWER_EN),
        Language::Zh => (MANAGED_TASK_ZH, FINAL_ANSWER_ZH),
    };
    PromptTemplates {
        system_prompt,
        managed_agent_task: managed_agent_task.to_owned(),
        final_answer: final_answer.to_owned(),
    }
}

/// Current local time as bound into prompts.
pub fn now_string() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
