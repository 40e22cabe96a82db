//! Sniffs engine chunks for the run's final answer.
//!
//! The engine marks the answer with a chunk of the form
//! `{"type":"final_answer","content":"..."}`. Everything else is opaque and
//! passes through untouched.

use serde::Deserialize;

const FINAL_ANSWER_TYPE: &str = "final_answer";

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    content: Option<serde_json::Value>,
}

/// Return the final-answer text if `chunk` carries one.
pub fn decode(chunk: &str) -> Option<String> {
    let trimmed = chunk.trim_start();
    if !trimmed.starts_with('{') || !trimmed.contains(FINAL_ANSWER_TYPE) {
        return None;
    }
    let envelope: Envelope = serde_json::from_str(trimmed).ok()?;
    if envelope.kind.as_deref() != Some(FINAL_ANSWER_TYPE) {
        return None;
    }
    match envelope.content? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_string_content() {
        let chunk = r#"{"type":"final_answer","content":"42 is the answer"}"#;
        assert_eq!(decode(chunk).as_deref(), Some("42 is the answer"));
    }

    #[test]
    fn structured_content_is_serialized() {
        let chunk = r#"{"type":"final_answer","content":{"table":[1,2]}}"#;
        assert_eq!(decode(chunk).as_deref(), Some(r#"{"table":[1,2]}"#));
    }

    #[test]
    fn other_chunks_are_ignored() {
        assert!(decode(r#"{"type":"step_count","content":"1"}"#).is_none());
        assert!(decode(r#"{"type":"model_output","content":"final_answer soon"}"#).is_none());
        assert!(decode("plain text mentioning final_answer").is_none());
        assert!(decode(r#"{"type":"final_answer"}"#).is_none());
        assert!(decode("{not json final_answer").is_none());
    }
}
