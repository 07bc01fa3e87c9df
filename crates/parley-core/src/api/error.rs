//! Backend error types.

use serde_json::Value;
use thiserror::Error;

/// Errors returned by backend operations.
///
/// `Cancelled` is produced only when the caller aborts a request; it is never
/// a transport failure and must not reach user-visible error paths.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Network-level failure (connection refused, reset, DNS).
    #[error("network error: {0}")]
    Transport(String),

    /// Connection or request timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Backend answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error text from the body, or the canonical reason.
        message: String,
    },

    /// Response body could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),

    /// The request was aborted by the caller.
    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    /// Builds a status error, extracting `{"error": "..."}` from the body when present.
    pub fn status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|json| {
                json.get("error")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .or_else(|| {
                reqwest::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|code| code.canonical_reason())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "request failed".to_string());
        Self::Status { status, message }
    }

    /// Returns true if the caller aborted the request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout(e.to_string())
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            ApiError::status(status.as_u16(), "")
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// Result type for backend operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
