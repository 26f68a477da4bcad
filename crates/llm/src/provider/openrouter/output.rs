use serde::Deserialize;

use crate::{
    messages::{self, ChatChoice, ChatCompletionResponse, ChatMessage, ChatRole, ObjectType, Usage},
    sse::SseFrame,
};

/// OpenRouter chat completion response.
///
/// OpenRouter is OpenAI-compatible, but individual upstream models leave out
/// fields now and then. Everything is optional here and normalized when
/// converted.
#[derive(Debug, Deserialize)]
pub(super) struct OpenRouterResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub created: Option<u64>,
    #[serde(default)]
    pub choices: Vec<OpenRouterChoice>,
    #[serde(default)]
    pub usage: Option<OpenRouterUsage>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OpenRouterChoice {
    #[serde(default)]
    pub message: OpenRouterMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct OpenRouterMessage {
    #[serde(default)]
    pub role: Option<ChatRole>,
    /// `null` for tool calls and refusals.
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OpenRouterUsage {
    #[serde(default)]
    pub prompt_tokens: Option<u32>,
    #[serde(default)]
    pub completion_tokens: Option<u32>,
    #[serde(default)]
    pub total_tokens: Option<u32>,
}

impl OpenRouterUsage {
    /// Token counts, or `None` for an empty usage object.
    fn into_usage(self) -> Option<Usage> {
        if self.prompt_tokens.is_none() && self.completion_tokens.is_none() && self.total_tokens.is_none() {
            return None;
        }

        let computed = Usage::new(self.prompt_tokens.unwrap_or(0), self.completion_tokens.unwrap_or(0));

        Some(Usage {
            total_tokens: self.total_tokens.unwrap_or(computed.total_tokens),
            ..computed
        })
    }
}

impl From<OpenRouterResponse> for ChatCompletionResponse {
    fn from(response: OpenRouterResponse) -> Self {
        let choices = response
            .choices
            .into_iter()
            .zip(0..)
            .map(|(choice, index)| ChatChoice {
                index,
                message: ChatMessage {
                    role: choice.message.role.unwrap_or(ChatRole::Assistant),
                    content: choice.message.content.unwrap_or_default(),
                },
                finish_reason: Some(choice.finish_reason.unwrap_or_else(|| "stop".to_string())),
            })
            .collect();

        Self {
            id: response.id.unwrap_or_else(messages::completion_id),
            object: ObjectType::ChatCompletion,
            created: response.created.unwrap_or_else(messages::unix_timestamp),
            model: String::new(), // Will be set by the provider
            choices,
            usage: response.usage.and_then(OpenRouterUsage::into_usage),
        }
    }
}

/// Map one upstream stream line to an outbound frame.
///
/// OpenRouter already streams OpenAI chunks, so payloads are passed through
/// untouched. Comment lines such as `: OPENROUTER PROCESSING` keep the client
/// connection alive and are forwarded as well. Blank event separators are
/// dropped, the encoder writes its own.
pub(super) fn stream_frame(line: &str) -> Option<SseFrame> {
    if line.trim().is_empty() {
        return None;
    }

    let Some(data) = line.strip_prefix("data:") else {
        return Some(SseFrame::Line(line.to_string()));
    };

    let data = data.strip_prefix(' ').unwrap_or(data);

    if data.trim() == "[DONE]" {
        Some(SseFrame::Done)
    } else {
        Some(SseFrame::Data(data.to_string()))
    }
}
