use crate::state::timeline::{ItemBody, TimelineItem};
use crate::types::{default_json_object, EntryKind, SessionEntry, ToolRecord};
use serde_json::Value;

/// Rebuilds a timeline from a persisted transcript, one item per entry.
///
/// Persisted transcripts are already coalesced by the backend, so no merging
/// happens here; ids derive from each entry's timestamp and mapped kind so
/// re-reconstruction of the same transcript is stable.
pub fn reconstruct(entries: &[SessionEntry]) -> Vec<TimelineItem> {
    entries.iter().map(entry_item).collect()
}

fn entry_item(entry: &SessionEntry) -> TimelineItem {
    match entry.kind {
        EntryKind::User => TimelineItem {
            id: format!("{}-user", entry.ts),
            body: ItemBody::User {
                content: entry.content.clone(),
            },
        },
        EntryKind::Assistant => TimelineItem {
            id: format!("{}-assistant", entry.ts),
            body: ItemBody::Assistant {
                content: entry.content.clone(),
            },
        },
        EntryKind::Tool => {
            let tool = entry.tool.clone().unwrap_or_else(ToolRecord::default);
            match tool.output {
                Some(output) => TimelineItem {
                    id: format!("{}-tool-result", entry.ts),
                    body: ItemBody::ToolResult {
                        name: tool.name,
                        payload: Value::String(output),
                    },
                },
                None => TimelineItem {
                    id: format!("{}-tool-call", entry.ts),
                    body: ItemBody::ToolCall {
                        name: tool.name,
                        payload: tool.input.unwrap_or_else(default_json_object),
                    },
                },
            }
        }
    }
}
