//! Error types for the Conduit clients

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when calling the pipeline or cluster APIs
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The API endpoint could not be reached
    #[error("Endpoint unreachable: {0}")]
    Unreachable(String),
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || matches!(self, Self::ApiError { status: 404, .. })
    }

    /// Check if the endpoint could not be reached at all
    ///
    /// Covers transport failures (connect, timeout) and gateway statuses.
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Unreachable(_) => true,
            Self::RequestFailed(e) => e.is_connect() || e.is_timeout(),
            Self::ApiError { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }

    /// Check if the caller lacks permission for the operation
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::ApiError { status: 403, .. })
    }
}
