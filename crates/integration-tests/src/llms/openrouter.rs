use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use super::{
    RecordedRequests,
    provider::{LlmProviderConfig, ProviderType, TestLlmProvider},
};

/// Keepalive comment OpenRouter sends while the model warms up.
pub const PROCESSING_COMMENT: &str = ": OPENROUTER PROCESSING";

/// Mock of the OpenRouter chat completions API.
pub struct OpenRouterMock {
    requests: RecordedRequests,
    stream_fragments: Vec<String>,
    stream_done: bool,
    response: Option<Value>,
    error: Option<(StatusCode, String)>,
}

impl OpenRouterMock {
    pub fn new() -> Self {
        Self {
            requests: RecordedRequests::default(),
            stream_fragments: vec!["Hel".to_string(), "lo".to_string()],
            stream_done: true,
            response: None,
            error: None,
        }
    }

    /// Handle to the requests this mock receives.
    pub fn requests(&self) -> RecordedRequests {
        self.requests.clone()
    }

    /// Close streams without sending `data: [DONE]`.
    pub fn without_done(mut self) -> Self {
        self.stream_done = false;
        self
    }

    /// Answer non-streaming requests with this body instead of the default completion.
    pub fn with_response(mut self, response: Value) -> Self {
        self.response = Some(response);
        self
    }

    /// Answer every request with this status and raw body.
    pub fn with_error(mut self, status: u16, body: impl Into<String>) -> Self {
        self.error = Some((StatusCode::from_u16(status).unwrap(), body.into()));
        self
    }
}

impl Default for OpenRouterMock {
    fn default() -> Self {
        Self::new()
    }
}

impl TestLlmProvider for OpenRouterMock {
    async fn spawn(self) -> anyhow::Result<LlmProviderConfig> {
        let state = Arc::new(self);

        let app = Router::new()
            .route("/chat/completions", post(chat_completions))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Ok(LlmProviderConfig {
            address,
            provider_type: ProviderType::OpenRouter,
        })
    }
}

async fn chat_completions(
    State(mock): State<Arc<OpenRouterMock>>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> Response {
    mock.requests.push(headers.clone(), request.clone());

    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("Bearer "));

    if !authorized {
        let body = json!({ "error": { "message": "No auth credentials found", "code": 401 } });
        return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
    }

    if let Some((status, body)) = &mock.error {
        return (*status, body.clone()).into_response();
    }

    let model = request["model"].as_str().unwrap_or_default();

    if request["stream"].as_bool().unwrap_or(false) {
        let body = stream_body(model, &mock.stream_fragments, mock.stream_done);
        return ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response();
    }

    if let Some(response) = &mock.response {
        return Json(response.clone()).into_response();
    }

    let last_message = request["messages"]
        .as_array()
        .and_then(|messages| messages.last())
        .and_then(|message| message["content"].as_str())
        .unwrap_or("empty");

    let body = json!({
        "id": "gen-1700000000-abcdef",
        "object": "chat.completion",
        "created": 1700000000,
        "model": model,
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": format!("Test response to: {last_message}") },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 15, "total_tokens": 25 }
    });

    Json(body).into_response()
}

/// One upstream streaming chunk payload, as OpenRouter sends it.
pub fn stream_chunk(model: &str, content: &str) -> String {
    format!(
        r#"{{"id":"gen-1700000000-abcdef","object":"chat.completion.chunk","created":1700000000,"model":"{model}","choices":[{{"index":0,"delta":{{"content":"{content}"}},"finish_reason":null}}]}}"#
    )
}

fn stream_body(model: &str, fragments: &[String], done: bool) -> String {
    let mut body = format!("{PROCESSING_COMMENT}\n\n");

    for fragment in fragments {
        body.push_str(&format!("data: {}\n\n", stream_chunk(model, fragment)));
    }

    if done {
        body.push_str("data: [DONE]\n\n");
    }

    body
}
