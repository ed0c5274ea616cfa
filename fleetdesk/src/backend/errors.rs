//! Backend call error types.

use thiserror::Error;

/// Errors surfaced by calls to the backend REST API.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No access token was available for an authenticated call
    #[error("Missing access token")]
    MissingToken,

    /// The refresh exchange failed or no refresh token was available
    #[error("Session expired")]
    SessionExpired,

    /// The backend answered with a non-success status
    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Network failure or timeout talking to the backend
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a body we could not decode
    #[error("Malformed backend response: {0}")]
    Decode(String),

    /// The request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A record identifier that is not a single path segment
    #[error("Invalid identifier '{0}'")]
    InvalidPath(String),
}

impl BackendError {
    /// Whether the backend rejected the bearer credential.
    pub fn is_token_rejected(&self) -> bool {
        matches!(self, BackendError::Status { status: 401, .. })
    }

    /// HTTP status the proxy should answer with.
    ///
    /// Client errors are mirrored; everything else collapses to 500.
    pub fn status_code(&self) -> u16 {
        match self {
            BackendError::MissingToken | BackendError::SessionExpired => 401,
            BackendError::InvalidPath(_) => 400,
            BackendError::Status { status, .. } if (400..500).contains(status) => *status,
            _ => 500,
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            BackendError::MissingToken => "Unauthorized".to_string(),
            BackendError::SessionExpired => "Session expired, please sign in again".to_string(),
            BackendError::InvalidPath(_) => self.to_string(),
            BackendError::Status { status, message } if (400..500).contains(status) => {
                message.clone()
            }
            _ => "Internal server error".to_string(),
        }
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;
