//! Stop a user's run in a conversation.

use ar_domain::trace::TraceEvent;
use serde::{Deserialize, Serialize};

use super::cancel::RunKey;
use super::Runtime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopOutcome {
    pub status: StopStatus,
    pub message: String,
}

/// Signal the active run and every in-flight memory preparation for
/// `(conversation_id, user_id)`. Succeeds if anything was signalled.
///
/// Cancellation is cooperative: the run winds down at the engine's next
/// check, so the client stream may still deliver a few frames.
pub fn stop_run(rt: &Runtime, conversation_id: &str, user_id: &str) -> StopOutcome {
    let key = RunKey::new(conversation_id, user_id);
    let run_found = rt.runs.stop(&key);
    let preprocess_found = rt.preprocess.stop(&key);

    TraceEvent::RunStopRequested {
        conversation_id: conversation_id.to_owned(),
        run_found,
        preprocess_found,
    }
    .emit();

    if run_found || preprocess_found > 0 {
        StopOutcome {
            status: StopStatus::Success,
            message: format!("stop signal sent to conversation {conversation_id}"),
        }
    } else {
        StopOutcome {
            status: StopStatus::Error,
            message: format!("no running agent found for conversation {conversation_id}"),
        }
    }
}
