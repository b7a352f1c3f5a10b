use reqwest::StatusCode;

/// Errors surfaced to callers of the favorites client
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// The favorite is already stored on the server
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The server rejected the request body or parameters
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Server returned {status}: {message}")]
    Server { status: StatusCode, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    /// Whether retrying the same request later could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Server { status, .. } => status.is_server_error(),
            ClientError::Conflict(_) | ClientError::Validation(_) => false,
        }
    }

    pub(crate) fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::CONFLICT => ClientError::Conflict(message),
            StatusCode::BAD_REQUEST => ClientError::Validation(message),
            status => ClientError::Server { status, message },
        }
    }
}
