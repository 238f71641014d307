use crate::api::logging::emit_event_decode_error;
use crate::types::ChatEvent;
use anyhow::Result;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::{json, Value};
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

const DEFAULT_EVENT_LABEL: &str = "message";

/// Splits an incoming byte stream into blank-line-delimited SSE frames.
///
/// Chunks may arrive at arbitrary boundaries; a single pending buffer carries
/// the unterminated tail across calls. The buffer holds raw bytes and only
/// complete frames are decoded as text, so a multibyte character split across
/// chunks survives intact (the `\n\n` separator is ASCII). Frames come out in
/// wire order, trimmed, and whitespace-only frames are dropped.
#[derive(Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(offset) = find_separator(&self.buffer[start..]) {
            let frame_text = String::from_utf8_lossy(&self.buffer[start..start + offset]);
            let frame = frame_text.trim();
            if !frame.is_empty() {
                frames.push(frame.to_string());
            }
            start += offset + 2;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }
        frames
    }

    /// Drains the pending buffer at end of stream. A non-empty residue is one
    /// last frame whose terminator never arrived.
    pub fn finish(&mut self) -> Option<String> {
        let residue = std::mem::take(&mut self.buffer);
        let residue_text = String::from_utf8_lossy(&residue);
        let trimmed = residue_text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

fn find_separator(haystack: &[u8]) -> Option<usize> {
    haystack.windows(2).position(|window| window == b"\n\n")
}

/// Parses one raw frame into a `ChatEvent`.
///
/// Returns `None` only for frames without any `data:` line. Malformed payloads
/// never fail: they come back as a best-effort event carrying the raw text.
pub fn parse_event(frame: &str) -> Option<ChatEvent> {
    let mut label = DEFAULT_EVENT_LABEL.to_string();
    let mut data_lines: Vec<&str> = Vec::new();

    for line in frame.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            label = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("data:") {
            // Per the SSE framing convention, only a single leading space
            // belongs to the marker.
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }

    if data_lines.is_empty() {
        return None;
    }

    let data = data_lines.join("\n");
    Some(decode_event(&label, &data))
}

fn decode_event(label: &str, data: &str) -> ChatEvent {
    match serde_json::from_str::<Value>(data) {
        Ok(Value::Object(mut object)) => {
            if !object.contains_key("type") {
                object.insert(
                    "type".to_string(),
                    Value::String(normalize_label(label).to_string()),
                );
            }
            match serde_json::from_value::<ChatEvent>(Value::Object(object)) {
                Ok(event) => event,
                Err(error) => {
                    emit_event_decode_error(label, data, &error);
                    fallback_event(label, data)
                }
            }
        }
        Ok(_) => fallback_event(label, data),
        Err(error) => {
            emit_event_decode_error(label, data, &error);
            fallback_event(label, data)
        }
    }
}

/// The SSE default label and anything unrecognized resolve to `final`, the
/// implicit discriminant for a completed assistant utterance.
fn normalize_label(label: &str) -> &str {
    match label {
        "thought" | "tool_call" | "tool_result" | "error" | "final" => label,
        _ => "final",
    }
}

/// Best-effort event for a payload that is not valid JSON (or decoded to no
/// known shape): label-typed when the label can carry bare content, `error`
/// otherwise. Always succeeds.
fn fallback_event(label: &str, data: &str) -> ChatEvent {
    serde_json::from_value::<ChatEvent>(json!({ "type": label, "content": data })).unwrap_or(
        ChatEvent::Error {
            content: data.to_string(),
        },
    )
}

/// Drives one chat stream to completion: pulls chunks, decodes frames, parses
/// events, and hands each event to `on_event` in wire order.
///
/// Cancellation stops the loop without further callbacks. A mid-stream
/// transport error propagates; events already delivered stay delivered. The
/// trailing partial frame, if any, is flushed when the source ends.
pub async fn run_stream(
    mut stream: ByteStream,
    cancel: CancellationToken,
    mut on_event: impl FnMut(ChatEvent),
) -> Result<()> {
    let mut decoder = FrameDecoder::new();

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            next = stream.next() => next,
        };
        let Some(chunk) = next else {
            break;
        };

        for frame in decoder.push(&chunk?) {
            if let Some(event) = parse_event(&frame) {
                on_event(event);
            }
        }
    }

    if let Some(frame) = decoder.finish() {
        if let Some(event) = parse_event(&frame) {
            on_event(event);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decoder_splits_complete_frames() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"event: thought\ndata: one\n\ndata: two\n\n");
        assert_eq!(frames, vec!["event: thought\ndata: one", "data: two"]);
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_decoder_holds_partial_frame_across_chunks() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: {\"type\":\"tho").is_empty());
        let frames = decoder.push(b"ught\",\"content\":\"hi\"}\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], "data: {\"type\":\"thought\",\"content\":\"hi\"}");
    }

    #[test]
    fn test_decoder_finish_flushes_unterminated_frame() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: tail without terminator").is_empty());
        assert_eq!(
            decoder.finish().as_deref(),
            Some("data: tail without terminator")
        );
        // A second finish is a no-op.
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_decoder_survives_multibyte_split_across_chunks() {
        let wire = "data: {\"type\":\"thought\",\"content\":\"思考中\"}\n\n".as_bytes();
        // Split inside the first multibyte character of the payload.
        let split = wire.iter().position(|&b| b > 0x7f).unwrap() + 1;

        let mut decoder = FrameDecoder::new();
        let mut frames = decoder.push(&wire[..split]);
        frames.extend(decoder.push(&wire[split..]));

        assert_eq!(frames.len(), 1);
        assert_eq!(
            parse_event(&frames[0]),
            Some(ChatEvent::Thought {
                content: "思考中".to_string()
            })
        );
    }

    #[test]
    fn test_decoder_skips_whitespace_only_frames() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"\n\n   \n\ndata: real\n\n");
        assert_eq!(frames, vec!["data: real"]);
    }

    #[test]
    fn test_parse_event_reads_typed_json_payload() {
        let event = parse_event("data: {\"type\":\"thought\",\"content\":\"hi\"}");
        assert_eq!(
            event,
            Some(ChatEvent::Thought {
                content: "hi".to_string()
            })
        );
    }

    #[test]
    fn test_parse_event_falls_back_to_label_for_plain_text() {
        let event = parse_event("event: error\ndata: boom");
        assert_eq!(
            event,
            Some(ChatEvent::Error {
                content: "boom".to_string()
            })
        );
    }

    #[test]
    fn test_parse_event_without_data_line_yields_nothing() {
        assert_eq!(parse_event("event: final"), None);
    }

    #[test]
    fn test_parse_event_label_fills_missing_type() {
        let event = parse_event("event: thought\ndata: {\"content\":\"partial\"}");
        assert_eq!(
            event,
            Some(ChatEvent::Thought {
                content: "partial".to_string()
            })
        );
    }

    #[test]
    fn test_parse_event_default_label_maps_to_final() {
        let event = parse_event("data: {\"content\":\"done\"}");
        assert_eq!(
            event,
            Some(ChatEvent::Final {
                content: "done".to_string()
            })
        );
    }

    #[test]
    fn test_parse_event_last_label_wins() {
        let event = parse_event("event: thought\nevent: error\ndata: boom");
        assert_eq!(
            event,
            Some(ChatEvent::Error {
                content: "boom".to_string()
            })
        );
    }

    #[test]
    fn test_parse_event_joins_multiple_data_lines() {
        let event = parse_event("data: line one\ndata: line two");
        assert_eq!(
            event,
            Some(ChatEvent::Error {
                content: "line one\nline two".to_string()
            })
        );
    }

    #[test]
    fn test_parse_event_malformed_tool_call_degrades_to_error() {
        // Label names a discriminant that cannot carry bare content.
        let event = parse_event("event: tool_call\ndata: not json");
        assert_eq!(
            event,
            Some(ChatEvent::Error {
                content: "not json".to_string()
            })
        );
    }

    #[test]
    fn test_parse_event_tool_call_payload() {
        let frame = format!(
            "event: tool_call\ndata: {}",
            json!({"type": "tool_call", "name": "search", "input": {"q": "x"}})
        );
        let event = parse_event(&frame);
        assert_eq!(
            event,
            Some(ChatEvent::ToolCall {
                name: "search".to_string(),
                input: json!({"q": "x"}),
            })
        );
    }
}
