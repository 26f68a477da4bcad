use serde::Serialize;

use crate::messages::{ChatCompletionRequest, ChatMessage};

/// Request body for the OpenRouter chat completions API.
///
/// OpenRouter speaks the OpenAI schema already, so messages and roles are
/// forwarded untouched. Optional sampling parameters are only sent when the
/// client set them.
#[derive(Debug, Serialize)]
pub(super) struct OpenRouterRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl From<ChatCompletionRequest> for OpenRouterRequest {
    fn from(request: ChatCompletionRequest) -> Self {
        Self {
            model: request.model,
            messages: request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: request.stream.then_some(true),
        }
    }
}
