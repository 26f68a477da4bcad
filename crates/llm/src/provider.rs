pub(crate) mod anthropic;
pub(crate) mod openrouter;

use std::{pin::Pin, time::Duration};

use async_trait::async_trait;
use futures::Stream;
use reqwest::{Client, RequestBuilder, Response, header::HeaderMap};

use crate::{
    error::LlmError,
    messages::{ChatCompletionRequest, ChatCompletionResponse, Model},
    sse::SseFrame,
};

/// Type alias for a stream of outbound SSE frames.
///
/// The stream is lazy: nothing is read from the upstream connection until the
/// client polls, and dropping it releases the connection.
pub(crate) type ChatCompletionStream = Pin<Box<dyn Stream<Item = crate::Result<SseFrame>> + Send>>;

/// Trait for upstream AI provider implementations.
///
/// Note for async_trait: We need this trait to be dyn-compatible, so we can't just use the
/// Rust async trait functions without Box/Pin.
#[async_trait]
pub(crate) trait Provider: Send + Sync {
    /// Stable identifier used in routing decisions and diagnostics.
    fn name(&self) -> &str;

    /// Process a chat completion request with a single upstream round trip.
    async fn chat_completion(&self, request: ChatCompletionRequest) -> crate::Result<ChatCompletionResponse>;

    /// Process a streaming chat completion request.
    ///
    /// Fails before returning a stream when the upstream rejects the request,
    /// so the client still gets a proper error status.
    async fn chat_completion_stream(&self, request: ChatCompletionRequest) -> crate::Result<ChatCompletionStream>;

    /// The static model catalog of this provider.
    fn list_models(&self) -> Vec<Model>;

    /// Whether the model id belongs to this provider. Never touches the network.
    fn supports_model(&self, model: &str) -> bool;
}

/// Build the shared HTTP client of a provider instance.
///
/// The client bounds connecting and every single read with `timeout`, so a
/// stream that keeps delivering data runs as long as the upstream needs.
/// Requests that read the whole body at once add a total deadline with
/// [`with_deadline`].
pub(super) fn http_client(provider: &str, headers: HeaderMap, timeout: Duration) -> crate::Result<Client> {
    Client::builder()
        .connect_timeout(timeout)
        .read_timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(|e| {
            log::error!("Failed to create HTTP client for {provider} provider: {e}");
            LlmError::InternalError(None)
        })
}

/// Bound a request, including reading its body, by `timeout` unless it is streamed.
pub(super) fn with_deadline(request: RequestBuilder, stream: bool, timeout: Duration) -> RequestBuilder {
    if stream {
        request
    } else {
        request.timeout(timeout)
    }
}

/// Send a request and turn transport failures and non-2xx answers into errors.
pub(super) async fn send(provider: &str, request: RequestBuilder) -> crate::Result<Response> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            log::error!("Request to {provider} timed out: {e}");
            LlmError::ConnectionError(format!("Request to {provider} timed out"))
        } else {
            log::error!("Failed to send request to {provider}: {e}");
            LlmError::ConnectionError(format!("Failed to send request to {provider}: {e}"))
        }
    })?;

    let status = response.status();

    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        log::error!("{provider} API error ({status}): {error_text}");

        return Err(LlmError::UpstreamError {
            status: status.as_u16(),
            message: error_text,
        });
    }

    Ok(response)
}

/// Read a successful response body and parse it as JSON.
pub(super) async fn json_body<T>(provider: &str, response: Response) -> crate::Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let status = response.status().as_u16();

    // First get the response as text to log if parsing fails
    let response_text = response.text().await.map_err(|e| {
        log::error!("Failed to read {provider} response body: {e}");

        if e.is_timeout() {
            LlmError::ConnectionError(format!("Request to {provider} timed out"))
        } else {
            LlmError::ConnectionError(format!("Failed to read {provider} response: {e}"))
        }
    })?;

    sonic_rs::from_str(&response_text).map_err(|e| {
        log::error!("Failed to parse {provider} chat completion response: {e}");
        log::error!("Raw response that failed to parse: {response_text}");

        LlmError::UpstreamError {
            status,
            message: response_text,
        }
    })
}
