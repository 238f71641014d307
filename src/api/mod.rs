pub mod client;
pub mod logging;
#[cfg(test)]
pub mod mock_client;
pub mod sse;

pub use client::ApiClient;
pub use sse::{parse_event, run_stream, ByteStream, FrameDecoder};
