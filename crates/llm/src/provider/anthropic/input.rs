use serde::Serialize;

use crate::messages::{ChatCompletionRequest, ChatRole};

/// Used when the client leaves `max_tokens` unset, the Messages API requires it.
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Request body for Anthropic Messages API.
///
/// This struct represents the request format for creating messages with Claude models
/// as documented in the [Anthropic API Reference](https://docs.anthropic.com/en/api/messages).
#[derive(Debug, Serialize)]
pub(super) struct AnthropicRequest {
    /// The model that will complete your prompt.
    pub model: String,

    /// Input messages, alternating between user and assistant turns.
    pub messages: Vec<AnthropicMessage>,

    /// System prompt, separate from the conversation turns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// The maximum number of tokens to generate before stopping.
    pub max_tokens: u32,

    /// Amount of randomness injected into the response. Omitted to let the
    /// API apply its own default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Whether to incrementally stream the response using server-sent events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// Represents a message in the conversation with Claude.
#[derive(Debug, Serialize, PartialEq)]
pub(super) struct AnthropicMessage {
    /// Either "user" or "assistant".
    pub role: ChatRole,
    pub content: String,
}

impl From<ChatCompletionRequest> for AnthropicRequest {
    fn from(request: ChatCompletionRequest) -> Self {
        let mut system = None;
        let mut messages = Vec::with_capacity(request.messages.len());

        for message in request.messages {
            let role = match message.role {
                ChatRole::System if system.is_none() => {
                    system = Some(message.content);
                    continue;
                }
                role @ (ChatRole::User | ChatRole::Assistant) => role,
                ChatRole::System => {
                    log::warn!("Additional system message sent to Anthropic as a user turn");
                    ChatRole::User
                }
                ChatRole::Other(role) => {
                    log::warn!("Unknown chat role from request: {role}, treating as user");
                    ChatRole::User
                }
            };

            messages.push(AnthropicMessage {
                role,
                content: message.content,
            });
        }

        AnthropicRequest {
            model: request.model,
            messages,
            system: system.filter(|system| !system.is_empty()),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.temperature,
            stream: request.stream.then_some(true),
        }
    }
}
