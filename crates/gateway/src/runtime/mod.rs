//! Run orchestration: turn a client request into an assembled agent run,
//! relay the engine's output, and clean up afterwards.
//!
//! Entry points:
//! - [`pipeline::start_run`] drives one run and returns its SSE payloads.
//! - [`stop::stop_run`] cancels a user's active run and any in-flight
//!   memory preparation.

pub mod assemble;
pub mod background;
pub mod cancel;
pub mod config_tree;
pub mod error;
pub mod final_answer;
pub mod mcp_filter;
pub mod memory;
pub mod pipeline;
pub mod prompt;
pub mod stop;
pub mod tools;

use std::sync::Arc;

use ar_domain::config::Config;
use ar_memory::MemoryProvider;

use crate::conversation::ConversationStore;
use crate::engine::ExecutionEngine;
use crate::knowledge::KnowledgeBase;
use crate::plugins::PluginScanner;
use crate::store::AgentStore;

use self::background::BackgroundTasks;
use self::cancel::{PreprocessRegistry, RunRegistry};

pub use self::error::RunError;

/// The collaborators a run needs, shared by every request.
#[derive(Clone)]
pub struct Runtime {
    pub config: Arc<Config>,
    pub store: Arc<dyn AgentStore>,
    pub memory: Arc<dyn MemoryProvider>,
    pub knowledge: Arc<dyn KnowledgeBase>,
    pub plugins: Arc<dyn PluginScanner>,
    pub engine: Arc<dyn ExecutionEngine>,
    pub conversations: Arc<dyn ConversationStore>,
    pub runs: Arc<dyn RunRegistry>,
    pub preprocess: Arc<dyn PreprocessRegistry>,
    pub background: BackgroundTasks,
}
