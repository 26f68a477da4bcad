//! The OpenAI-compatible schema the gateway speaks to its own clients.

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Upper bound accepted for `max_tokens`.
const MAX_TOKENS_LIMIT: u32 = 128_000;

/// OpenAI-compatible chat completion request.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatCompletionRequest {
    /// Requested model id. Empty selects the configured default.
    #[serde(default)]
    pub(crate) model: String,
    #[serde(default)]
    pub(crate) messages: Vec<ChatMessage>,
    #[serde(default)]
    pub(crate) stream: bool,
    pub(crate) max_tokens: Option<u32>,
    pub(crate) temperature: Option<f32>,
}

impl ChatCompletionRequest {
    /// Rejects requests that must never reach a provider.
    pub(crate) fn validate(&self) -> crate::Result<()> {
        if self.messages.is_empty() {
            return Err(LlmError::InvalidRequest("messages must contain at least one message".into()));
        }

        let max_tokens = self.max_tokens.filter(|max_tokens| !(1..=MAX_TOKENS_LIMIT).contains(max_tokens));

        if let Some(max_tokens) = max_tokens {
            return Err(LlmError::InvalidRequest(format!(
                "max_tokens must be between 1 and {MAX_TOKENS_LIMIT}, got {max_tokens}"
            )));
        }

        let temperature = self
            .temperature
            .filter(|temperature| !temperature.is_finite() || !(0.0..=2.0).contains(temperature));

        if let Some(temperature) = temperature {
            return Err(LlmError::InvalidRequest(format!(
                "temperature must be between 0 and 2, got {temperature}"
            )));
        }

        Ok(())
    }
}

/// The author of a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ChatRole {
    System,
    User,
    Assistant,
    /// Any role we do not know about, kept verbatim.
    #[serde(untagged)]
    Other(String),
}

/// Chat message in OpenAI format.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub(crate) struct ChatMessage {
    pub(crate) role: ChatRole,
    pub(crate) content: String,
}

/// Constant `object` discriminators of the OpenAI schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum ObjectType {
    #[serde(rename = "chat.completion")]
    ChatCompletion,
    #[serde(rename = "chat.completion.chunk")]
    ChatCompletionChunk,
    #[serde(rename = "model")]
    Model,
    #[serde(rename = "list")]
    List,
}

/// OpenAI-compatible chat completion response.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatCompletionResponse {
    pub(crate) id: String,
    pub(crate) object: ObjectType,
    pub(crate) created: u64,
    pub(crate) model: String,
    pub(crate) choices: Vec<ChatChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) usage: Option<Usage>,
}

/// Chat completion choice.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatChoice {
    pub(crate) index: u32,
    pub(crate) message: ChatMessage,
    pub(crate) finish_reason: Option<String>,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Usage {
    pub(crate) prompt_tokens: u32,
    pub(crate) completion_tokens: u32,
    pub(crate) total_tokens: u32,
}

impl Usage {
    /// Usage computed locally, where the total is always the sum of its parts.
    pub(crate) fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// One incremental unit of a streaming chat response.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatCompletionChunk {
    pub(crate) id: String,
    pub(crate) object: ObjectType,
    pub(crate) created: u64,
    pub(crate) model: String,
    pub(crate) choices: Vec<ChatChoiceDelta>,
}

/// A choice inside a streaming chunk.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatChoiceDelta {
    pub(crate) index: u32,
    pub(crate) delta: ChatMessageDelta,
    pub(crate) finish_reason: Option<String>,
}

/// Partial message fields carried by a chunk. An empty delta serializes as `{}`.
#[derive(Debug, Clone, Default, Serialize)]
pub(crate) struct ChatMessageDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) role: Option<ChatRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) content: Option<String>,
}

/// Model information.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Model {
    pub(crate) id: String,
    pub(crate) object: ObjectType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) created: Option<u64>,
    pub(crate) owned_by: String,
}

impl Model {
    pub(crate) fn new(id: &str, owned_by: &str) -> Self {
        Self {
            id: id.to_string(),
            object: ObjectType::Model,
            created: None,
            owned_by: owned_by.to_string(),
        }
    }
}

/// Models list response.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ModelsResponse {
    pub(crate) object: ObjectType,
    pub(crate) data: Vec<Model>,
}

/// A fresh completion id in the `chatcmpl-<12 hex>` form.
pub(crate) fn completion_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("chatcmpl-{}", &uuid[..12])
}

/// Current unix timestamp in seconds.
pub(crate) fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
