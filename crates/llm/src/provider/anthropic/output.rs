use std::borrow::Cow;

use serde::Deserialize;

use crate::{
    messages::{
        self, ChatChoice, ChatChoiceDelta, ChatCompletionChunk, ChatCompletionResponse, ChatMessage, ChatMessageDelta,
        ChatRole, ObjectType, Usage,
    },
    sse::{SseFrame, StreamIdentity},
};

/// Response from Anthropic Messages API.
///
/// Only the fields the gateway maps are read; everything is optional so a
/// sparse body still yields a response.
#[derive(Debug, Deserialize)]
pub(super) struct AnthropicResponse {
    /// Unique identifier for the message.
    #[serde(default)]
    pub id: Option<String>,

    /// Content blocks in the response.
    #[serde(default)]
    pub content: Vec<AnthropicContent>,

    /// The reason the model stopped generating, e.g. `end_turn` or `max_tokens`.
    #[serde(default)]
    pub stop_reason: Option<String>,

    /// Billing and rate limit usage information.
    #[serde(default)]
    pub usage: AnthropicUsage,
}

/// A content block in an Anthropic message response.
#[derive(Debug, Deserialize)]
pub(super) struct AnthropicContent {
    /// Text content if this is a text block.
    #[serde(default)]
    pub text: Option<String>,
}

/// Token usage information for an Anthropic API request.
#[derive(Debug, Default, Deserialize, Clone, Copy)]
pub(super) struct AnthropicUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

impl From<AnthropicResponse> for ChatCompletionResponse {
    fn from(response: AnthropicResponse) -> Self {
        // The unified content is the first block, whatever else follows.
        let content = response
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .unwrap_or_default();

        Self {
            id: response.id.unwrap_or_else(messages::completion_id),
            object: ObjectType::ChatCompletion,
            created: messages::unix_timestamp(),
            model: String::new(), // Will be set by the provider
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessage {
                    role: ChatRole::Assistant,
                    content,
                },
                finish_reason: Some(response.stop_reason.unwrap_or_else(|| "stop".to_string())),
            }],
            usage: Some(Usage::new(response.usage.input_tokens, response.usage.output_tokens)),
        }
    }
}

// Streaming types for Anthropic SSE responses

/// Anthropic streaming event types with borrowed strings for zero-copy parsing.
///
/// See: https://docs.anthropic.com/en/api/messages-streaming
///
/// Only the events that produce output are modelled. `message_start`,
/// `content_block_start`, `content_block_stop`, `message_delta`, `ping` and
/// any event type added later land in `Unknown`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", bound = "'de: 'a")]
pub(super) enum AnthropicStreamEvent<'a> {
    /// Sent for each incremental update to a content block.
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta {
        #[serde(borrow)]
        delta: AnthropicBlockDelta<'a>,
    },

    /// Sent at the end of the streaming response.
    #[serde(rename = "message_stop")]
    MessageStop,

    /// Error event if something goes wrong during streaming.
    #[serde(rename = "error")]
    Error {
        #[serde(borrow)]
        error: AnthropicStreamError<'a>,
    },

    /// Anything else.
    #[serde(other)]
    Unknown,
}

/// Delta content for a content block.
///
/// Uses Cow (Clone on Write) to handle both borrowed strings (when no escaping needed)
/// and owned strings (when escape sequences like \n need to be unescaped).
#[derive(Debug, Deserialize)]
pub(super) struct AnthropicBlockDelta<'a> {
    /// `text_delta` for text fragments, `input_json_delta` for tool arguments.
    #[serde(rename = "type", borrow)]
    pub delta_type: Cow<'a, str>,

    /// Text fragment to append to the current text block.
    #[serde(default, borrow)]
    pub text: Option<Cow<'a, str>>,
}

/// Error information in streaming response.
#[derive(Debug, Deserialize)]
pub(super) struct AnthropicStreamError<'a> {
    #[serde(rename = "type", borrow)]
    pub error_type: Cow<'a, str>,
    #[serde(borrow)]
    pub message: Cow<'a, str>,
}

/// Converts Anthropic stream lines to OpenAI-compatible frames.
///
/// Anthropic's streaming format is a typed event state machine, OpenAI's is a
/// flat sequence of delta chunks. Every chunk of one stream carries the same
/// identity and the model the client asked for.
pub(super) struct AnthropicStreamProcessor {
    identity: StreamIdentity,
    model: String,
}

impl AnthropicStreamProcessor {
    pub fn new(model: String, identity: StreamIdentity) -> Self {
        Self { identity, model }
    }

    /// Process one upstream line.
    ///
    /// Lines that are not `data:` payloads are ignored, as are payloads that
    /// fail to parse.
    pub fn process_line(&self, line: &str) -> Vec<SseFrame> {
        let Some(data) = line.strip_prefix("data:") else {
            return Vec::new();
        };

        let data = data.strip_prefix(' ').unwrap_or(data);

        if data.trim() == "[DONE]" {
            return vec![SseFrame::Done];
        }

        match sonic_rs::from_str::<AnthropicStreamEvent<'_>>(data) {
            Ok(event) => self.process_event(event),
            Err(e) => {
                log::warn!("Failed to parse Anthropic streaming event: {e}");
                Vec::new()
            }
        }
    }

    /// Process an Anthropic stream event and convert it to outbound frames.
    pub fn process_event(&self, event: AnthropicStreamEvent<'_>) -> Vec<SseFrame> {
        match event {
            AnthropicStreamEvent::ContentBlockDelta { delta } if delta.delta_type == "text_delta" => {
                let text = delta.text.map(Cow::into_owned).unwrap_or_default();

                let delta = ChatMessageDelta {
                    role: None,
                    content: Some(text),
                };

                vec![self.chunk(delta, None)]
            }

            AnthropicStreamEvent::MessageStop => {
                let stop = self.chunk(ChatMessageDelta::default(), Some("stop".to_string()));
                vec![stop, SseFrame::Done]
            }

            AnthropicStreamEvent::Error { error } => {
                log::error!("Anthropic stream error event: {} - {}", error.error_type, error.message);
                Vec::new()
            }

            AnthropicStreamEvent::ContentBlockDelta { .. } | AnthropicStreamEvent::Unknown => Vec::new(),
        }
    }

    fn chunk(&self, delta: ChatMessageDelta, finish_reason: Option<String>) -> SseFrame {
        SseFrame::Chunk(Box::new(ChatCompletionChunk {
            id: self.identity.id.clone(),
            object: ObjectType::ChatCompletionChunk,
            created: self.identity.created,
            model: self.model.clone(),
            choices: vec![ChatChoiceDelta {
                index: 0,
                delta,
                finish_reason,
            }],
        }))
    }
}
