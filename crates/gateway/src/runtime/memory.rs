//! Memory write-back after a finished run.

use std::sync::Arc;

use ar_domain::trace::TraceEvent;
use ar_memory::{MemoryContext, MemoryMessage, MemoryProvider};

use super::error::RunError;

/// A completed exchange the memory service should learn from.
#[derive(Debug, Clone)]
pub struct WriteBack {
    pub context: MemoryContext,
    pub agent_id: String,
    pub query: String,
    pub final_answer: String,
}

impl WriteBack {
    /// `None` when the user's settings leave no level to write to.
    pub fn prepare(
        context: MemoryContext,
        agent_id: &str,
        query: &str,
        final_answer: &str,
    ) -> Option<Self> {
        if !context.enabled() || context.write_levels(agent_id).is_empty() {
            return None;
        }
        Some(Self {
            context,
            agent_id: agent_id.to_owned(),
            query: query.to_owned(),
            final_answer: final_answer.to_owned(),
        })
    }

    pub async fn run(self, memory: Arc<dyn MemoryProvider>) -> Result<(), RunError> {
        let levels = self.context.write_levels(&self.agent_id);
        let request = self.context.add_request(
            vec![
                MemoryMessage::user(self.query),
                MemoryMessage::assistant(self.final_answer),
            ],
            levels.clone(),
        );

        let resp = memory
            .add(request)
            .await
            .map_err(|e| RunError::BackgroundWrite(format!("memory add: {e}")))?;

        TraceEvent::MemoryWriteBack {
            agent_id: self.agent_id,
            levels: levels.iter().map(|l| l.as_str().to_owned()).collect(),
            stored: resp.results.len(),
        }
        .emit();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ar_domain::config::MemoryServiceConfig;
    use ar_memory::{MemorySharing, MemoryUserConfig};

    fn ctx(cfg: MemoryUserConfig) -> MemoryContext {
        MemoryContext::new(cfg, &MemoryServiceConfig::default(), "t", "u", "a1")
    }

    #[test]
    fn switch_off_prepares_nothing() {
        assert!(WriteBack::prepare(ctx(MemoryUserConfig::default()), "a1", "q", "a").is_none());
    }

    #[test]
    fn no_eligible_levels_prepares_nothing() {
        let c = ctx(MemoryUserConfig {
            memory_switch: true,
            agent_share: MemorySharing::Never,
            disabled_agent_ids: vec![],
            disabled_user_agent_ids: vec!["a1".into()],
        });
        assert!(WriteBack::prepare(c, "a1", "q", "a").is_none());
    }

    #[test]
    fn eligible_run_is_prepared() {
        let c = ctx(MemoryUserConfig {
            memory_switch: true,
            ..Default::default()
        });
        let wb = WriteBack::prepare(c, "a1", "q", "answer").unwrap();
        assert_eq!(wb.final_answer, "answer");
    }
}
