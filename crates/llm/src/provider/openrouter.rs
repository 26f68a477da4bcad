mod input;
mod output;

use std::time::Duration;

use async_trait::async_trait;
use config::OpenRouterConfig;
use futures::{StreamExt, future};
use reqwest::{
    Client,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use secrecy::ExposeSecret;

use self::{
    input::OpenRouterRequest,
    output::{OpenRouterResponse, stream_frame},
};

use crate::{
    error::LlmError,
    messages::{ChatCompletionRequest, ChatCompletionResponse, Model},
    provider::{self, ChatCompletionStream, Provider},
    sse,
};

const PROVIDER_NAME: &str = "openrouter";
const DEFAULT_OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1";

/// Namespaces routed to OpenRouter.
const MODEL_PREFIXES: &[&str] = &["openai/", "deepseek/", "mistralai/", "google/", "meta-llama/", "anthropic/"];

/// The OpenRouter alias of a native Claude model id.
pub(crate) fn claude_alias(model: &str) -> String {
    format!("anthropic/{model}")
}

pub(crate) struct OpenRouterProvider {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl OpenRouterProvider {
    pub fn new(config: &OpenRouterConfig, timeout: Duration) -> crate::Result<Self> {
        let api_key = config
            .api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .ok_or_else(|| LlmError::InternalError(Some("OpenRouter API key is not configured".to_string())))?;

        let mut authorization = header_value("Authorization", &format!("Bearer {api_key}"))?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("HTTP-Referer", header_value("HTTP-Referer", &config.referer)?);
        headers.insert("X-Title", header_value("X-Title", &config.title)?);

        let client = provider::http_client(PROVIDER_NAME, headers, timeout)?;

        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_OPENROUTER_API_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    async fn post(&self, request: &OpenRouterRequest) -> crate::Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);
        log::debug!("Sending request to OpenRouter for model {}", request.model);

        let stream = request.stream.unwrap_or(false);
        let builder = provider::with_deadline(self.client.post(&url).json(request), stream, self.timeout);

        provider::send(PROVIDER_NAME, builder).await
    }
}

fn header_value(name: &str, value: &str) -> crate::Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| {
        log::error!("Failed to parse {name} header for OpenRouter provider: {e}");
        LlmError::InternalError(None)
    })
}

#[async_trait]
impl Provider for OpenRouterProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn chat_completion(&self, request: ChatCompletionRequest) -> crate::Result<ChatCompletionResponse> {
        let original_model = request.model.clone();

        let mut openrouter_request = OpenRouterRequest::from(request);
        openrouter_request.stream = None;

        let response = self.post(&openrouter_request).await?;
        let openrouter_response: OpenRouterResponse = provider::json_body(PROVIDER_NAME, response).await?;

        let mut response = ChatCompletionResponse::from(openrouter_response);
        response.model = original_model;

        Ok(response)
    }

    async fn chat_completion_stream(&self, request: ChatCompletionRequest) -> crate::Result<ChatCompletionStream> {
        let mut openrouter_request = OpenRouterRequest::from(request);
        openrouter_request.stream = Some(true);

        let response = self.post(&openrouter_request).await?;

        let frames = sse::lines(response.bytes_stream()).filter_map(|line| {
            let frame = match line {
                Ok(line) => stream_frame(&line).map(Ok),
                Err(e) => Some(Err(e)),
            };

            future::ready(frame)
        });

        Ok(Box::pin(frames))
    }

    fn list_models(&self) -> Vec<Model> {
        vec![Model::new("openai/gpt-4o", "openai")]
    }

    fn supports_model(&self, model: &str) -> bool {
        MODEL_PREFIXES.iter().any(|prefix| model.starts_with(prefix))
    }
}
