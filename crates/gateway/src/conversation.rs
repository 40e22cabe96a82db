//! Conversation persistence.
//!
//! The JSONL store appends one line per message to
//! `<dir>/<conversation_id>.jsonl`. Assistant messages keep the raw engine
//! chunks so the conversation can be replayed exactly as it streamed.

use std::path::{Path, PathBuf};

use ar_domain::agent::Role;
use ar_domain::error::{Error, Result};
use ar_domain::trace::TraceEvent;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One persisted message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub timestamp: String,
    pub conversation_id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub agent_id: String,
    pub role: Role,
    /// User text; empty for assistant messages.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    /// Ordered engine chunks; empty for user messages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chunks: Vec<String>,
}

impl ConversationMessage {
    pub fn user(
        conversation_id: &str,
        tenant_id: &str,
        user_id: &str,
        agent_id: &str,
        content: &str,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            conversation_id: conversation_id.to_owned(),
            tenant_id: tenant_id.to_owned(),
            user_id: user_id.to_owned(),
            agent_id: agent_id.to_owned(),
            role: Role::User,
            content: content.to_owned(),
            chunks: Vec::new(),
        }
    }

    pub fn assistant(
        conversation_id: &str,
        tenant_id: &str,
        user_id: &str,
        agent_id: &str,
        chunks: Vec<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            conversation_id: conversation_id.to_owned(),
            tenant_id: tenant_id.to_owned(),
            user_id: user_id.to_owned(),
            agent_id: agent_id.to_owned(),
            role: Role::Assistant,
            content: String::new(),
            chunks,
        }
    }
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn append(&self, message: ConversationMessage) -> Result<()>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// JSONL store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct JsonlConversationStore {
    base_dir: PathBuf,
}

impl JsonlConversationStore {
    pub fn new(base_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(base_dir)?;
        Ok(Self {
            base_dir: base_dir.to_path_buf(),
        })
    }

    fn path_for(&self, conversation_id: &str) -> Result<PathBuf> {
        if conversation_id.is_empty()
            || conversation_id.contains(['/', '\\'])
            || conversation_id.starts_with('.')
        {
            return Err(Error::Store(format!(
                "invalid conversation id {conversation_id:?}"
            )));
        }
        Ok(self.base_dir.join(format!("{conversation_id}.jsonl")))
    }

    /// Read a conversation back (used by tests and tooling).
    pub async fn read(&self, conversation_id: &str) -> Result<Vec<ConversationMessage>> {
        let path = self.path_for(conversation_id)?;
        tokio::task::spawn_blocking(move || read_jsonl_file(&path))
            .await
            .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))?
    }
}

#[async_trait]
impl ConversationStore for JsonlConversationStore {
    async fn append(&self, message: ConversationMessage) -> Result<()> {
        let path = self.path_for(&message.conversation_id)?;
        let mut buf = serde_json::to_string(&message)?;
        buf.push('\n');

        tokio::task::spawn_blocking(move || {
            use std::io::Write;
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            file.write_all(buf.as_bytes())?;
            Ok::<(), Error>(())
        })
        .await
        .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))??;

        TraceEvent::MessagePersisted {
            conversation_id: message.conversation_id,
            role: format!("{:?}", message.role).to_lowercase(),
            chunks: message.chunks.len(),
        }
        .emit();

        Ok(())
    }
}

fn read_jsonl_file(path: &Path) -> Result<Vec<ConversationMessage>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)?;
    let mut out = Vec::new();
    for (i, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(msg) => out.push(msg),
            Err(e) => {
                tracing::warn!(path = %path.display(), line = i + 1, error = %e, "skipping corrupt conversation line");
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_and_read_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlConversationStore::new(dir.path()).unwrap();

        store
            .append(ConversationMessage::user("c1", "t", "u", "a", "hello"))
            .await
            .unwrap();
        store
            .append(ConversationMessage::assistant(
                "c1",
                "t",
                "u",
                "a",
                vec!["chunk-1".into(), "chunk-2".into()],
            ))
            .await
            .unwrap();

        let msgs = store.read("c1").await.unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, Role::User);
        assert_eq!(msgs[0].content, "hello");
        assert_eq!(msgs[1].chunks, vec!["chunk-1", "chunk-2"]);
        assert!(store.read("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlConversationStore::new(dir.path()).unwrap();
        let msg = ConversationMessage::user("../escape", "t", "u", "a", "x");
        assert!(matches!(store.append(msg).await, Err(Error::Store(_))));
    }

    #[tokio::test]
    async fn corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlConversationStore::new(dir.path()).unwrap();
        store
            .append(ConversationMessage::user("c1", "t", "u", "a", "first"))
            .await
            .unwrap();
        {
            use std::io::Write;
            let mut f = std::fs::OpenOptions::new()
                .append(true)
                .open(dir.path().join("c1.jsonl"))
                .unwrap();
            writeln!(f, "garbage").unwrap();
        }
        assert_eq!(store.read("c1").await.unwrap().len(), 1);
    }
}
