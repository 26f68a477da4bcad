mod input;
mod output;

use std::time::Duration;

use async_trait::async_trait;
use config::AnthropicConfig;
use futures::{StreamExt, stream};
use reqwest::{
    Client,
    header::{CONTENT_TYPE, HeaderMap, HeaderValue},
};
use secrecy::ExposeSecret;

use self::{
    input::AnthropicRequest,
    output::{AnthropicResponse, AnthropicStreamProcessor},
};

use crate::{
    error::LlmError,
    messages::{ChatCompletionRequest, ChatCompletionResponse, Model},
    provider::{self, ChatCompletionStream, Provider},
    sse::{self, SseFrame, StreamIdentity},
};

const PROVIDER_NAME: &str = "anthropic";
const DEFAULT_ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Models served natively, newest first.
const MODELS: &[&str] = &[
    "claude-opus-4-5-20251101",
    "claude-sonnet-4-5-20250929",
    "claude-haiku-4-5-20251001",
];

/// Whether the model id names a Claude model.
pub(crate) fn is_native_model(model: &str) -> bool {
    model.starts_with("claude-")
}

pub(crate) struct AnthropicProvider {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl AnthropicProvider {
    pub fn new(config: &AnthropicConfig, timeout: Duration) -> crate::Result<Self> {
        let api_key = config
            .api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .ok_or_else(|| LlmError::InternalError(Some("Anthropic API key is not configured".to_string())))?;

        let mut api_key = HeaderValue::from_str(api_key).map_err(|e| {
            log::error!("Failed to parse API key header for Anthropic provider: {e}");
            LlmError::InternalError(None)
        })?;

        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", api_key);
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = provider::http_client(PROVIDER_NAME, headers, timeout)?;

        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_ANTHROPIC_API_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    async fn post(&self, request: &AnthropicRequest) -> crate::Result<reqwest::Response> {
        let url = format!("{}/messages", self.base_url);
        log::debug!("Sending request to Anthropic for model {}", request.model);

        let stream = request.stream.unwrap_or(false);
        let builder = provider::with_deadline(self.client.post(&url).json(request), stream, self.timeout);

        provider::send(PROVIDER_NAME, builder).await
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn chat_completion(&self, request: ChatCompletionRequest) -> crate::Result<ChatCompletionResponse> {
        let original_model = request.model.clone();

        let mut anthropic_request = AnthropicRequest::from(request);
        anthropic_request.stream = None;

        let response = self.post(&anthropic_request).await?;
        let anthropic_response: AnthropicResponse = provider::json_body(PROVIDER_NAME, response).await?;

        let mut response = ChatCompletionResponse::from(anthropic_response);
        response.model = original_model;

        Ok(response)
    }

    async fn chat_completion_stream(&self, request: ChatCompletionRequest) -> crate::Result<ChatCompletionStream> {
        let processor = AnthropicStreamProcessor::new(request.model.clone(), StreamIdentity::generate());

        let mut anthropic_request = AnthropicRequest::from(request);
        anthropic_request.stream = Some(true);

        let response = self.post(&anthropic_request).await?;

        let frames = sse::lines(response.bytes_stream()).flat_map(move |line| {
            let frames: Vec<crate::Result<SseFrame>> = match line {
                Ok(line) => processor.process_line(&line).into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            };

            stream::iter(frames)
        });

        Ok(Box::pin(frames))
    }

    fn list_models(&self) -> Vec<Model> {
        MODELS.iter().map(|id| Model::new(*id, PROVIDER_NAME)).collect()
    }

    fn supports_model(&self, model: &str) -> bool {
        is_native_model(model)
    }
}
