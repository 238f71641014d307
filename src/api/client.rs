use crate::api::logging::{debug_requests_enabled, emit_debug_request};
use crate::api::sse::ByteStream;
use crate::config::Config;
use crate::types::{SessionEntry, SessionSummary};
use crate::util::is_local_endpoint_url;
use anyhow::{anyhow, Result};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
#[cfg(test)]
use std::sync::Arc;

/// HTTP client for the workspace backend. Everything the app needs from the
/// server goes through here: session listing, transcript loading, workspace
/// file access, and the streaming chat endpoint.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    #[cfg(test)]
    mock_stream_producer: Option<Arc<dyn MockStreamProducer>>,
}

#[cfg(test)]
pub trait MockStreamProducer: Send + Sync {
    fn create_mock_stream(&self, message: &str, session_id: &str) -> Result<ByteStream>;
}

#[derive(Deserialize)]
struct SessionsEnvelope {
    #[serde(default)]
    sessions: Vec<SessionSummary>,
}

#[derive(Deserialize)]
struct EntriesEnvelope {
    #[serde(default)]
    entries: Vec<SessionEntry>,
}

#[derive(Deserialize)]
struct FileEnvelope {
    #[serde(default)]
    content: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_base.trim_end_matches('/').to_string(),
            #[cfg(test)]
            mock_stream_producer: None,
        }
    }

    #[cfg(test)]
    pub fn new_mock(producer: Arc<dyn MockStreamProducer>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "http://localhost:8002".to_string(),
            mock_stream_producer: Some(producer),
        }
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let url = format!("{}/api/sessions", self.base_url);
        let envelope: SessionsEnvelope = self.get_json(&url, &[]).await?;
        Ok(envelope.sessions)
    }

    pub async fn session_entries(&self, session_id: &str) -> Result<Vec<SessionEntry>> {
        let url = format!("{}/api/sessions/{}", self.base_url, session_id);
        let envelope: EntriesEnvelope = self.get_json(&url, &[]).await?;
        Ok(envelope.entries)
    }

    pub async fn read_file(&self, path: &str) -> Result<String> {
        let url = format!("{}/api/files", self.base_url);
        let envelope: FileEnvelope = self.get_json(&url, &[("path", path)]).await?;
        Ok(envelope.content)
    }

    pub async fn save_file(&self, path: &str, content: &str) -> Result<()> {
        let url = format!("{}/api/files", self.base_url);
        let payload = json!({ "path": path, "content": content });
        self.http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|error| map_request_error(error, &url))?
            .error_for_status()
            .map_err(|error| map_request_error(error, &url))?;
        Ok(())
    }

    /// Opens the streaming chat endpoint and returns the response body as a
    /// byte stream. Fails before any read on a refused request or non-success
    /// status; chunk errors carry the endpoint context.
    pub async fn open_chat_stream(&self, message: &str, session_id: &str) -> Result<ByteStream> {
        #[cfg(test)]
        {
            if let Some(producer) = &self.mock_stream_producer {
                return producer.create_mock_stream(message, session_id);
            }
        }

        let url = format!("{}/api/chat", self.base_url);
        let payload = json!({
            "message": message,
            "session_id": session_id,
            "stream": true,
        });

        if debug_requests_enabled() {
            emit_debug_request(&url, &payload);
        }

        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|error| map_request_error(error, &url))?
            .error_for_status()
            .map_err(|error| map_request_error(error, &url))?;

        let url_for_stream = url.clone();
        let stream = response
            .bytes_stream()
            .map(move |item| item.map_err(|error| map_request_error(error, &url_for_stream)));
        Ok(Box::pin(stream))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let mut request = self.http.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request
            .send()
            .await
            .map_err(|error| map_request_error(error, url))?
            .error_for_status()
            .map_err(|error| map_request_error(error, url))?;

        response
            .json::<T>()
            .await
            .map_err(|error| map_request_error(error, url))
    }
}

fn map_request_error(error: reqwest::Error, request_url: &str) -> anyhow::Error {
    if error.is_connect() && is_local_endpoint_url(request_url) {
        return anyhow!(
            "cannot reach local backend '{}': {}. Start the backend or update WORKDECK_API_BASE.",
            request_url,
            error
        );
    }
    if error.is_connect() {
        return anyhow!("cannot reach backend '{}': {}", request_url, error);
    }
    if error.is_timeout() {
        return anyhow!("request to '{}' timed out: {}", request_url, error);
    }
    if let Some(status) = error.status() {
        return anyhow!("backend '{}' returned HTTP {}: {}", request_url, status, error);
    }
    anyhow!("request to '{}' failed: {}", request_url, error)
}
