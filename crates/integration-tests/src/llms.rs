//! Mock upstream providers and a client for the gateway's chat endpoints.

pub mod anthropic;
pub mod openrouter;
mod provider;

use std::sync::{Arc, Mutex};

use axum::http::HeaderMap;
use serde_json::Value;

pub use anthropic::AnthropicMock;
pub use openrouter::OpenRouterMock;
pub use provider::{LlmProviderConfig, ProviderType, TestLlmProvider};

use crate::TestClient;

/// A request received by a mock provider.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub headers: HeaderMap,
    pub body: Value,
}

impl RecordedRequest {
    /// A header value as text, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Shared log of the requests a mock provider received.
#[derive(Debug, Clone, Default)]
pub struct RecordedRequests {
    inner: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl RecordedRequests {
    pub(crate) fn push(&self, headers: HeaderMap, body: Value) {
        self.inner.lock().unwrap().push(RecordedRequest { headers, body });
    }

    /// Number of requests received so far.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// Whether no request reached the mock.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The most recent request. Panics if there is none.
    pub fn last(&self) -> RecordedRequest {
        self.inner
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("the mock did not receive any request")
    }
}

/// Client for the chat endpoints of a test server.
pub struct LlmClient {
    client: TestClient,
    path: String,
}

impl LlmClient {
    pub(crate) fn new(client: TestClient, path: &str) -> Self {
        Self {
            client,
            path: path.trim_end_matches('/').to_string(),
        }
    }

    /// `GET /v1/models`, expecting success.
    pub async fn list_models(&self) -> Value {
        let response = self.client.get(&format!("{}/v1/models", self.path)).await;
        assert_eq!(response.status(), 200);

        response.json().await.unwrap()
    }

    /// `POST /v1/chat/completions` returning the raw response.
    pub async fn completions_response(&self, request: &Value) -> reqwest::Response {
        self.client
            .post(&format!("{}/v1/chat/completions", self.path), request)
            .await
    }

    /// `POST /v1/chat/completions`, expecting a successful JSON answer.
    pub async fn completions(&self, request: Value) -> Value {
        let response = self.completions_response(&request).await;
        let status = response.status();
        let body = response.text().await.unwrap();

        assert_eq!(status, 200, "unexpected response: {body}");

        serde_json::from_str(&body).unwrap()
    }

    /// `POST /v1/chat/completions` with `stream: true`, returning the whole event stream.
    pub async fn stream(&self, mut request: Value) -> String {
        request["stream"] = Value::Bool(true);

        let response = self.completions_response(&request).await;
        assert_eq!(response.status(), 200);

        let content_type = response.headers().get("content-type").cloned();
        assert_eq!(content_type.as_ref().and_then(|value| value.to_str().ok()), Some("text/event-stream"));

        response.text().await.unwrap()
    }
}

/// Split an event stream body into its `data:` payloads.
pub fn data_payloads(body: &str) -> Vec<&str> {
    body.split("\n\n")
        .filter_map(|frame| frame.lines().find_map(|line| line.strip_prefix("data: ")))
        .collect()
}
