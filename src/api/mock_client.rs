use crate::api::client::MockStreamProducer;
use crate::api::sse::ByteStream;
use anyhow::{anyhow, Result};
use bytes::Bytes;
use futures::stream;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Bytes per playback chunk. Deliberately small and unaligned with any frame
/// length, so the decoder sees frames split mid-line the way a real transport
/// delivers them.
const PLAYBACK_CHUNK: usize = 7;

/// Plays back canned chat turns as SSE wire bytes. Each configured turn is a
/// list of frames, joined and terminated once at construction; a turn is
/// consumed per opened stream, and an exhausted backend refuses the request.
#[derive(Clone)]
pub struct MockChatBackend {
    turns: Arc<Mutex<VecDeque<Bytes>>>,
}

impl MockChatBackend {
    pub fn new(responses: Vec<Vec<String>>) -> Self {
        let turns = responses.into_iter().map(wire_bytes).collect();
        Self {
            turns: Arc::new(Mutex::new(turns)),
        }
    }
}

fn wire_bytes(frames: Vec<String>) -> Bytes {
    let mut wire = String::new();
    for frame in frames {
        wire.push_str(frame.trim_end_matches('\n'));
        wire.push_str("\n\n");
    }
    Bytes::from(wire)
}

impl MockStreamProducer for MockChatBackend {
    fn create_mock_stream(&self, _message: &str, _session_id: &str) -> Result<ByteStream> {
        let wire = self
            .turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("mock backend has no turn queued"))?;

        let chunks: Vec<Result<Bytes>> = (0..wire.len())
            .step_by(PLAYBACK_CHUNK)
            .map(|start| Ok(wire.slice(start..wire.len().min(start + PLAYBACK_CHUNK))))
            .collect();
        Ok(Box::pin(stream::iter(chunks)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::sse::run_stream;
    use crate::types::ChatEvent;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_chunked_playback_still_parses_whole_events() {
        let backend = MockChatBackend::new(vec![vec![
            "event: thought\ndata: {\"type\":\"thought\",\"content\":\"mulling\"}".to_string(),
            "data: {\"type\":\"final\",\"content\":\"done\"}".to_string(),
        ]]);

        let stream = backend
            .create_mock_stream("hello", "default")
            .expect("queued turn");

        let mut events = Vec::new();
        run_stream(stream, CancellationToken::new(), |event| events.push(event))
            .await
            .expect("playback runs to completion");

        assert_eq!(
            events,
            vec![
                ChatEvent::Thought {
                    content: "mulling".to_string()
                },
                ChatEvent::Final {
                    content: "done".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_exhausted_backend_refuses_the_stream() {
        let backend = MockChatBackend::new(vec![]);
        assert!(backend.create_mock_stream("hello", "default").is_err());
    }
}
