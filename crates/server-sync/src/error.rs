//! Error types for the server transport.

use thiserror::Error;

/// Result type alias for server API operations.
pub type Result<T> = std::result::Result<T, SyncApiError>;

/// Errors raised while talking to the records server.
#[derive(Debug, Error)]
pub enum SyncApiError {
    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success HTTP status from the server.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The server answered 200 but refused the operation in the payload.
    #[error("server rejected request: {0}")]
    Rejected(String),

    /// The reply parsed but is missing something the protocol requires.
    #[error("malformed server response: {0}")]
    Malformed(String),
}

impl SyncApiError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
