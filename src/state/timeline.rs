use crate::types::ChatEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A render-ready unit of the chat timeline. The id is stable for the item's
/// lifetime; an in-place thought merge keeps the id of the replaced item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineItem {
    pub id: String,
    #[serde(flatten)]
    pub body: ItemBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemBody {
    User { content: String },
    Assistant { content: String },
    Thought { content: String },
    ToolCall { name: String, payload: Value },
    ToolResult { name: String, payload: Value },
    Error { content: String },
}

/// Folds one chat event into the timeline.
///
/// Consecutive thought fragments merge into the tail item (verbatim
/// concatenation, same id); whitespace-only thought fragments are keep-alive
/// noise and leave the timeline untouched. Every other event appends exactly
/// one item. Ids derive from the append ordinal, which is deterministic
/// because items are never removed.
pub fn fold(mut current: Vec<TimelineItem>, event: &ChatEvent) -> Vec<TimelineItem> {
    if let ChatEvent::Thought { content } = event {
        if content.trim().is_empty() {
            return current;
        }
        if let Some(last) = current.last_mut() {
            if let ItemBody::Thought {
                content: existing, ..
            } = &mut last.body
            {
                existing.push_str(content);
                return current;
            }
        }
    }

    let id = format!("item-{}", current.len());
    current.push(TimelineItem {
        id,
        body: event_body(event),
    });
    current
}

fn event_body(event: &ChatEvent) -> ItemBody {
    match event {
        ChatEvent::Thought { content } => ItemBody::Thought {
            content: content.clone(),
        },
        ChatEvent::ToolCall { name, input } => ItemBody::ToolCall {
            name: name.clone(),
            payload: input.clone(),
        },
        ChatEvent::ToolResult { name, output } => ItemBody::ToolResult {
            name: name.clone(),
            payload: Value::String(output.clone()),
        },
        ChatEvent::Error { content } => ItemBody::Error {
            content: content.clone(),
        },
        ChatEvent::Final { content } => ItemBody::Assistant {
            content: content.clone(),
        },
    }
}

/// Appends a locally composed user message, outside the event fold: user input
/// never arrives over the wire.
pub fn push_user_message(mut current: Vec<TimelineItem>, content: String) -> Vec<TimelineItem> {
    let id = format!("item-{}", current.len());
    current.push(TimelineItem {
        id,
        body: ItemBody::User { content },
    });
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn thought(content: &str) -> ChatEvent {
        ChatEvent::Thought {
            content: content.to_string(),
        }
    }

    #[test]
    fn test_consecutive_thoughts_merge_into_tail() {
        let mut timeline = Vec::new();
        timeline = fold(timeline, &thought("He"));
        timeline = fold(timeline, &thought("llo"));
        timeline = fold(
            timeline,
            &ChatEvent::Final {
                content: "world".to_string(),
            },
        );

        assert_eq!(timeline.len(), 2);
        assert_eq!(
            timeline[0].body,
            ItemBody::Thought {
                content: "Hello".to_string()
            }
        );
        assert_eq!(
            timeline[1].body,
            ItemBody::Assistant {
                content: "world".to_string()
            }
        );
    }

    #[test]
    fn test_merge_keeps_the_original_item_id() {
        let mut timeline = fold(Vec::new(), &thought("He"));
        let original_id = timeline[0].id.clone();
        timeline = fold(timeline, &thought("llo"));
        assert_eq!(timeline[0].id, original_id);
    }

    #[test]
    fn test_whitespace_thought_is_a_no_op() {
        let timeline = fold(Vec::new(), &thought("keep"));
        let before_ptr = timeline.as_ptr();
        let after = fold(timeline, &thought("   "));

        assert_eq!(after.len(), 1);
        // Same backing vector, not a value-equal copy.
        assert_eq!(after.as_ptr(), before_ptr);
    }

    #[test]
    fn test_non_thought_events_always_append() {
        let mut timeline = Vec::new();
        timeline = fold(
            timeline,
            &ChatEvent::ToolCall {
                name: "search".to_string(),
                input: json!({"q": "x"}),
            },
        );
        timeline = fold(
            timeline,
            &ChatEvent::ToolResult {
                name: "search".to_string(),
                output: "y".to_string(),
            },
        );
        timeline = fold(
            timeline,
            &ChatEvent::Error {
                content: "boom".to_string(),
            },
        );

        assert_eq!(timeline.len(), 3);
        assert_eq!(
            timeline[0].body,
            ItemBody::ToolCall {
                name: "search".to_string(),
                payload: json!({"q": "x"}),
            }
        );
        assert_eq!(
            timeline[1].body,
            ItemBody::ToolResult {
                name: "search".to_string(),
                payload: json!("y"),
            }
        );
        assert_eq!(
            timeline[2].body,
            ItemBody::Error {
                content: "boom".to_string()
            }
        );
    }

    #[test]
    fn test_intervening_item_breaks_the_merge_run() {
        let mut timeline = Vec::new();
        timeline = fold(timeline, &thought("one"));
        timeline = fold(
            timeline,
            &ChatEvent::Final {
                content: "mid".to_string(),
            },
        );
        timeline = fold(timeline, &thought("two"));

        assert_eq!(timeline.len(), 3);
        assert_eq!(
            timeline[2].body,
            ItemBody::Thought {
                content: "two".to_string()
            }
        );
    }

    #[test]
    fn test_fold_is_deterministic_across_runs() {
        let events = vec![
            thought("a"),
            thought("b"),
            ChatEvent::ToolCall {
                name: "x".to_string(),
                input: json!({}),
            },
            thought("c"),
        ];

        let run = |events: &[ChatEvent]| {
            events
                .iter()
                .fold(Vec::new(), |timeline, event| fold(timeline, event))
        };

        assert_eq!(run(&events), run(&events));
    }

    #[test]
    fn test_push_user_message_appends_user_item() {
        let timeline = push_user_message(Vec::new(), "hi there".to_string());
        assert_eq!(timeline.len(), 1);
        assert_eq!(
            timeline[0].body,
            ItemBody::User {
                content: "hi there".to_string()
            }
        );
    }
}
