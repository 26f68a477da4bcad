use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    Router,
    body::{Body, Bytes},
    extract::{Json, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use futures::StreamExt;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use super::{
    RecordedRequests,
    provider::{LlmProviderConfig, ProviderType, TestLlmProvider},
};

/// Mock of the Anthropic Messages API.
pub struct AnthropicMock {
    requests: RecordedRequests,
    stream_fragments: Vec<String>,
    error: Option<(StatusCode, String)>,
    response_delay: Option<Duration>,
    chunk_delay: Option<Duration>,
}

impl AnthropicMock {
    pub fn new() -> Self {
        Self {
            requests: RecordedRequests::default(),
            stream_fragments: vec!["Hel".to_string(), "lo".to_string()],
            error: None,
            response_delay: None,
            chunk_delay: None,
        }
    }

    /// Handle to the requests this mock receives.
    pub fn requests(&self) -> RecordedRequests {
        self.requests.clone()
    }

    /// Text fragments sent as `text_delta` events when streaming.
    pub fn with_stream_fragments(mut self, fragments: &[&str]) -> Self {
        self.stream_fragments = fragments.iter().map(|fragment| fragment.to_string()).collect();
        self
    }

    /// Wait this long before sending the response headers.
    pub fn with_response_delay(mut self, delay: Duration) -> Self {
        self.response_delay = Some(delay);
        self
    }

    /// Wait this long before every chunk of a streamed body.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    /// Answer every request with this status and raw body.
    pub fn with_error(mut self, status: u16, body: impl Into<String>) -> Self {
        self.error = Some((StatusCode::from_u16(status).unwrap(), body.into()));
        self
    }
}

impl Default for AnthropicMock {
    fn default() -> Self {
        Self::new()
    }
}

impl TestLlmProvider for AnthropicMock {
    async fn spawn(self) -> anyhow::Result<LlmProviderConfig> {
        let state = Arc::new(self);

        let app = Router::new()
            .route("/v1/messages", post(create_message))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Ok(LlmProviderConfig {
            address,
            provider_type: ProviderType::Anthropic,
        })
    }
}

async fn create_message(State(mock): State<Arc<AnthropicMock>>, headers: HeaderMap, Json(request): Json<Value>) -> Response {
    mock.requests.push(headers.clone(), request.clone());

    if !headers.contains_key("x-api-key") {
        let body = json!({
            "type": "error",
            "error": { "type": "authentication_error", "message": "x-api-key header is required" }
        });

        return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
    }

    if let Some(delay) = mock.response_delay {
        tokio::time::sleep(delay).await;
    }

    if let Some((status, body)) = &mock.error {
        return (*status, body.clone()).into_response();
    }

    let model = request["model"].as_str().unwrap_or_default().to_string();

    if request["stream"].as_bool().unwrap_or(false) {
        return stream_response(&model, &mock.stream_fragments, mock.chunk_delay);
    }

    let last_message = request["messages"]
        .as_array()
        .and_then(|messages| messages.last())
        .and_then(|message| message["content"].as_str())
        .unwrap_or("empty");

    let body = json!({
        "id": "msg_01XFDUDYJgAACzvnptvVoYEL",
        "type": "message",
        "role": "assistant",
        "model": model,
        "content": [{ "type": "text", "text": format!("Test response to: {last_message}") }],
        "stop_reason": "end_turn",
        "stop_sequence": null,
        "usage": { "input_tokens": 10, "output_tokens": 15 }
    });

    (StatusCode::OK, Json(body)).into_response()
}

/// The event sequence of a streamed message, delivered in small byte chunks
/// that split lines in the middle.
fn stream_response(model: &str, fragments: &[String], chunk_delay: Option<Duration>) -> Response {
    let mut events = vec![
        (
            "message_start",
            json!({
                "type": "message_start",
                "message": {
                    "id": "msg_01XFDUDYJgAACzvnptvVoYEL", "type": "message", "role": "assistant", "model": model,
                    "content": [], "stop_reason": null, "usage": { "input_tokens": 10, "output_tokens": 1 }
                }
            }),
        ),
        (
            "content_block_start",
            json!({ "type": "content_block_start", "index": 0, "content_block": { "type": "text", "text": "" } }),
        ),
        ("ping", json!({ "type": "ping" })),
    ];

    for fragment in fragments {
        events.push((
            "content_block_delta",
            json!({ "type": "content_block_delta", "index": 0, "delta": { "type": "text_delta", "text": fragment } }),
        ));
    }

    events.extend([
        ("content_block_stop", json!({ "type": "content_block_stop", "index": 0 })),
        (
            "message_delta",
            json!({ "type": "message_delta", "delta": { "stop_reason": "end_turn", "stop_sequence": null }, "usage": { "output_tokens": 15 } }),
        ),
        ("message_stop", json!({ "type": "message_stop" })),
    ]);

    let body: String = events
        .into_iter()
        .map(|(event, data)| format!("event: {event}\ndata: {data}\n\n"))
        .collect();

    let chunks: Vec<_> = body
        .into_bytes()
        .chunks(7)
        .map(|chunk| Ok::<_, Infallible>(Bytes::copy_from_slice(chunk)))
        .collect();

    let chunks = futures::stream::iter(chunks).then(move |chunk| async move {
        if let Some(delay) = chunk_delay {
            tokio::time::sleep(delay).await;
        }

        chunk
    });

    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(Body::from_stream(chunks))
        .unwrap()
}
