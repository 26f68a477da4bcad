use std::time::Duration;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use rate_limit::RateLimitError;
use serde::Serialize;
use thiserror::Error;

/// Chat gateway errors with appropriate HTTP status codes.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Invalid request parameters, rejected before any provider is contacted.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No configured provider can serve the requested model.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Provider API returned a non-success status or an unreadable body.
    #[error("Upstream error ({status}): {message}")]
    UpstreamError { status: u16, message: String },

    /// Network, transport or timeout failure while talking to a provider.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Internal server error.
    /// If Some(message), the text is safe to show to the client.
    /// If None, details stay in the logs.
    #[error("Internal server error")]
    InternalError(Option<String>),
}

impl LlmError {
    /// Get the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::UpstreamError { .. } | Self::ConnectionError(_) => StatusCode::BAD_GATEWAY,
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type string for the response.
    pub fn error_type(&self) -> &str {
        match self {
            Self::InvalidRequest(_) => "invalid_request_error",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::UpstreamError { .. } | Self::ConnectionError(_) => "api_error",
            Self::RateLimitExceeded { .. } => "rate_limit_error",
            Self::InternalError(_) => "internal_error",
        }
    }

    /// The message shown to clients.
    fn client_message(&self) -> String {
        match self {
            Self::InternalError(Some(message)) => message.clone(),
            _ => self.to_string(),
        }
    }
}

impl From<RateLimitError> for LlmError {
    fn from(error: RateLimitError) -> Self {
        match error {
            RateLimitError::Storage(error) => {
                log::error!("Rate limit storage failure: {error}");
                Self::InternalError(None)
            }
            error => Self::RateLimitExceeded {
                message: error.to_string(),
                retry_after: error.retry_after(),
            },
        }
    }
}

/// Error response format compatible with OpenAI API.
#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    error: ErrorDetails,
}

impl From<&LlmError> for ErrorResponse {
    fn from(error: &LlmError) -> Self {
        Self {
            error: ErrorDetails {
                message: error.client_message(),
                r#type: error.error_type().to_string(),
                code: error.status_code().as_u16(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorDetails {
    message: String,
    r#type: String,
    code: u16,
}

impl IntoResponse for LlmError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log all 5xx errors for administrators
        if status.is_server_error() {
            match &self {
                Self::InternalError(None) => log::error!("Internal server error occurred"),
                _ => log::error!("Server error ({}): {}", status.as_u16(), self),
            }
        }

        let mut response = (status, Json(ErrorResponse::from(&self))).into_response();

        if let Self::RateLimitExceeded {
            retry_after: Some(retry_after),
            ..
        } = &self
        {
            // Round up so clients never retry before the quota refills.
            let seconds = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            response.headers_mut().insert(RETRY_AFTER, HeaderValue::from(seconds.max(1)));
        }

        response
    }
}
