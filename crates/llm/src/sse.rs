//! Server-Sent Events framing towards the gateway's clients.

mod lines;

use std::convert::Infallible;

use axum::{
    body::{Body, Bytes},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use futures::{Stream, StreamExt, stream};

pub(crate) use lines::lines;

use crate::{
    error::ErrorResponse,
    messages::{self, ChatCompletionChunk},
    provider::ChatCompletionStream,
};

const DONE: &str = "data: [DONE]\n\n";

/// One frame of an outbound event stream.
#[derive(Debug, Clone)]
pub(crate) enum SseFrame {
    /// A chunk produced by the gateway, serialized as `data: <json>`.
    Chunk(Box<ChatCompletionChunk>),
    /// An upstream `data:` payload forwarded verbatim.
    Data(String),
    /// A non-data upstream line (comment, keepalive), forwarded as-is.
    Line(String),
    /// The `[DONE]` sentinel.
    Done,
}

impl SseFrame {
    /// Wire representation of the frame.
    pub(crate) fn encode(&self) -> String {
        match self {
            Self::Chunk(chunk) => match sonic_rs::to_string(chunk) {
                Ok(json) => format!("data: {json}\n\n"),
                Err(e) => {
                    log::error!("Failed to serialize streaming chunk: {e}");
                    "data: {\"error\":\"serialization failed\"}\n\n".to_string()
                }
            },
            Self::Data(payload) => format!("data: {payload}\n\n"),
            Self::Line(line) => format!("{line}\n"),
            Self::Done => DONE.to_string(),
        }
    }
}

/// The `id` and `created` values shared by every chunk of one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StreamIdentity {
    pub(crate) id: String,
    pub(crate) created: u64,
}

impl StreamIdentity {
    /// A fresh identity stamped with the current time.
    pub(crate) fn generate() -> Self {
        Self {
            id: messages::completion_id(),
            created: messages::unix_timestamp(),
        }
    }
}

enum WireState {
    Streaming(ChatCompletionStream),
    Finished,
}

/// Encode a frame stream for the client.
///
/// The output ends with exactly one `[DONE]` frame: frames after the first
/// `Done` are dropped together with the upstream connection, a missing `Done`
/// is appended, and an error is reported as a single `data: {"error": ...}`
/// frame followed by `Done`.
pub(crate) fn into_wire(frames: ChatCompletionStream) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
    stream::unfold(WireState::Streaming(frames), |state| async move {
        let WireState::Streaming(mut frames) = state else {
            return None;
        };

        let (bytes, state) = match frames.next().await {
            Some(Ok(SseFrame::Done)) | None => (DONE.to_string(), WireState::Finished),
            Some(Ok(frame)) => (frame.encode(), WireState::Streaming(frames)),
            Some(Err(e)) => {
                log::error!("Stream error: {e}");

                let error = sonic_rs::to_string(&ErrorResponse::from(&e))
                    .unwrap_or_else(|_| r#"{"error":{"message":"stream failed"}}"#.to_string());

                (format!("data: {error}\n\n{DONE}"), WireState::Finished)
            }
        };

        Some((Ok(Bytes::from(bytes)), state))
    })
}

/// Build the `text/event-stream` response for a frame stream.
pub(crate) fn response(frames: ChatCompletionStream) -> Response {
    let mut response = Body::from_stream(into_wire(frames)).into_response();
    let headers = response.headers_mut();

    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

    response
}
