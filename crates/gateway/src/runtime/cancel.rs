//! Cancellation tokens and the two registries the stop endpoint consults.
//!
//! Every run gets a `CancelToken`. Calling `cancel()` on it signals the
//! execution engine to wind the run down cooperatively; nothing is killed.
//!
//! Two registries are keyed by `(conversation_id, user_id)`:
//! - **runs**: at most one active run per key, holding the token the engine
//!   was handed.
//! - **preprocess**: zero or more memory-preparation tasks per key, each with
//!   its own token, so a stop can interrupt a run before it has started.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Token
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A cancellation token that can be checked by the engine loop.
#[derive(Debug, Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// True when both handles share the same underlying flag.
    pub fn same_as(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Keys & handles
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Identifies a user's run within a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunKey {
    pub conversation_id: String,
    pub user_id: String,
}

impl RunKey {
    pub fn new(conversation_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user_id: user_id.into(),
        }
    }
}

impl std::fmt::Display for RunKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.conversation_id, self.user_id)
    }
}

/// Registry entry for an active run.
#[derive(Debug, Clone)]
pub struct RunHandle {
    pub token: CancelToken,
    pub agent_id: String,
    pub started_at: Instant,
}

impl RunHandle {
    pub fn new(token: CancelToken, agent_id: impl Into<String>) -> Self {
        Self {
            token,
            agent_id: agent_id.into(),
            started_at: Instant::now(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Traits
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Active runs, one per key.
pub trait RunRegistry: Send + Sync {
    /// Register a run. Returns true when an existing entry was replaced.
    fn register(&self, key: RunKey, handle: RunHandle) -> bool;

    /// Remove the entry for `key`, but only if it still holds `token`.
    /// A newer run registered under the same key is left alone.
    fn unregister(&self, key: &RunKey, token: &CancelToken) -> bool;

    /// Cancel the run under `key`. Returns true if one was found.
    fn stop(&self, key: &RunKey) -> bool;

    fn is_active(&self, key: &RunKey) -> bool;
}

/// In-flight memory-preparation tasks, several per key.
pub trait PreprocessRegistry: Send + Sync {
    /// Create and register a token for one preparation task.
    fn register(&self, key: &RunKey, task_id: &str) -> CancelToken;

    fn unregister(&self, key: &RunKey, task_id: &str);

    /// Cancel every task under `key`. Returns how many were cancelled.
    fn stop(&self, key: &RunKey) -> usize;

    fn active(&self, key: &RunKey) -> usize;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// In-memory implementations
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
pub struct InMemoryRunRegistry {
    runs: Mutex<HashMap<RunKey, RunHandle>>,
}

impl InMemoryRunRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunRegistry for InMemoryRunRegistry {
    fn register(&self, key: RunKey, handle: RunHandle) -> bool {
        let previous = self.runs.lock().insert(key.clone(), handle);
        if let Some(prev) = &previous {
            tracing::warn!(
                run = %key,
                previous_agent = %prev.agent_id,
                "run registered over an active run; previous token is no longer reachable"
            );
        }
        previous.is_some()
    }

    fn unregister(&self, key: &RunKey, token: &CancelToken) -> bool {
        let mut runs = self.runs.lock();
        match runs.get(key) {
            Some(handle) if handle.token.same_as(token) => {
                runs.remove(key);
                true
            }
            _ => false,
        }
    }

    fn stop(&self, key: &RunKey) -> bool {
        match self.runs.lock().get(key) {
            Some(handle) => {
                handle.token.cancel();
                true
            }
            None => false,
        }
    }

    fn is_active(&self, key: &RunKey) -> bool {
        self.runs.lock().contains_key(key)
    }
}

#[derive(Default)]
pub struct InMemoryPreprocessRegistry {
    tasks: Mutex<HashMap<RunKey, HashMap<String, CancelToken>>>,
}

impl InMemoryPreprocessRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreprocessRegistry for InMemoryPreprocessRegistry {
    fn register(&self, key: &RunKey, task_id: &str) -> CancelToken {
        let token = CancelToken::new();
        self.tasks
            .lock()
            .entry(key.clone())
            .or_default()
            .insert(task_id.to_owned(), token.clone());
        token
    }

    fn unregister(&self, key: &RunKey, task_id: &str) {
        let mut tasks = self.tasks.lock();
        if let Some(per_key) = tasks.get_mut(key) {
            per_key.remove(task_id);
            if per_key.is_empty() {
                tasks.remove(key);
            }
        }
    }

    fn stop(&self, key: &RunKey) -> usize {
        match self.tasks.lock().get(key) {
            Some(per_key) => {
                for token in per_key.values() {
                    token.cancel();
                }
                per_key.len()
            }
            None => 0,
        }
    }

    fn active(&self, key: &RunKey) -> usize {
        self.tasks.lock().get(key).map_or(0, HashMap::len)
    }
}
