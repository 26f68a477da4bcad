//! OpenAI-compatible chat completion endpoints in front of Anthropic and OpenRouter.

use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use config::LlmConfig;
use messages::ChatCompletionRequest;

mod error;
mod messages;
mod provider;
mod registry;
mod request;
mod server;
mod sse;

pub use error::LlmError;
use request::ClientAddress;
use server::LlmServer;

pub(crate) type Result<T> = std::result::Result<T, LlmError>;

/// Creates an axum router for the chat gateway endpoints.
///
/// The routes are mounted below `config.path`. Serve the router with
/// `ConnectInfo<SocketAddr>` so the per-IP rate limit sees the peer address.
pub fn router(config: LlmConfig) -> Router {
    let path = config.path.trim_end_matches('/').to_string();
    let server = LlmServer::new(config);

    let ai_routes = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/models", get(list_models))
        .with_state(server);

    if path.is_empty() {
        Router::new().merge(ai_routes)
    } else {
        Router::new().nest(&path, ai_routes)
    }
}

/// Handle chat completion requests.
///
/// This endpoint supports both streaming and non-streaming responses.
/// When `stream: true` is set in the request, the response is sent as
/// Server-Sent Events (SSE). Otherwise, a standard JSON response is returned.
async fn chat_completions(
    State(server): State<LlmServer>,
    ClientAddress(ip): ClientAddress,
    request: std::result::Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> Result<Response> {
    // Throttled requests never reach a provider, whatever their body.
    server.check_rate_limit(ip).await?;

    let Json(request) = request.map_err(|rejection| {
        log::debug!("Rejected chat completion body: {rejection}");
        LlmError::InvalidRequest(rejection.body_text())
    })?;

    log::info!("Chat completions handler called for model: {}", request.model);
    log::debug!("Request has {} messages", request.messages.len());
    log::debug!("Streaming: {}", request.stream);

    if request.stream {
        let stream = server.completions_stream(request).await?;

        log::debug!("Returning streaming response");
        Ok(sse::response(stream))
    } else {
        let response = server.completions(request).await?;

        log::debug!(
            "Chat completion successful, returning response with {} choices",
            response.choices.len()
        );

        Ok(Json(response).into_response())
    }
}

/// Handle list models requests.
async fn list_models(State(server): State<LlmServer>) -> Result<impl IntoResponse> {
    let response = server.list_models().await?;

    log::debug!("Returning {} models", response.data.len());
    Ok(Json(response))
}
