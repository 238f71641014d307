use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One unit of agent activity as emitted by the backend's chat stream.
///
/// The wire discriminant is the `type` field; a payload without one takes the
/// SSE event label instead (see `api::sse::parse_event`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    Thought {
        #[serde(default)]
        content: String,
    },
    ToolCall {
        name: String,
        #[serde(default = "default_json_object")]
        input: Value,
    },
    ToolResult {
        name: String,
        #[serde(default)]
        output: String,
    },
    Error {
        #[serde(default)]
        content: String,
    },
    Final {
        #[serde(default)]
        content: String,
    },
}

pub fn default_json_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// One row of the backend's session listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub updated_at: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    User,
    Assistant,
    Tool,
}

/// A persisted transcript record. A `tool` entry with `output` present is a
/// completed call; without it, the call is still in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub ts: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<ToolRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_event_deserializes_tagged_variants() {
        let event: ChatEvent =
            serde_json::from_value(json!({"type": "thought", "content": "hi"})).unwrap();
        assert_eq!(
            event,
            ChatEvent::Thought {
                content: "hi".to_string()
            }
        );

        let event: ChatEvent =
            serde_json::from_value(json!({"type": "tool_call", "name": "search"})).unwrap();
        assert_eq!(
            event,
            ChatEvent::ToolCall {
                name: "search".to_string(),
                input: json!({}),
            }
        );
    }

    #[test]
    fn test_session_entry_tool_output_distinguishes_call_from_result() {
        let pending: SessionEntry = serde_json::from_value(json!({
            "type": "tool",
            "ts": "2026-01-01T00:00:00Z",
            "content": "",
            "tool": {"name": "search", "input": {"q": "x"}}
        }))
        .unwrap();
        assert!(pending.tool.as_ref().unwrap().output.is_none());

        let done: SessionEntry = serde_json::from_value(json!({
            "type": "tool",
            "ts": "2026-01-01T00:00:01Z",
            "content": "",
            "tool": {"name": "search", "output": "y"}
        }))
        .unwrap();
        assert_eq!(done.tool.as_ref().unwrap().output.as_deref(), Some("y"));
    }

    #[test]
    fn test_session_summary_round_trip() {
        let summary = SessionSummary {
            id: "default".to_string(),
            updated_at: "2026-02-01T10:00:00Z".to_string(),
            size_bytes: 512,
        };
        let json = serde_json::to_string(&summary).unwrap();
        let parsed: SessionSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, summary);
    }
}
