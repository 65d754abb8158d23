//! Error types for the client layer

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Errors surfaced by requests to the research service
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service rejected the credential; it has been cleared locally
    #[error("Unauthorized")]
    Unauthorized,

    /// The addressed resource does not exist
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// The request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// The service could not be reached at all
    #[error("Network unavailable: {message}")]
    NetworkUnavailable { message: String },

    /// The service answered with a non-success status or an
    /// undecodable payload
    #[error("Server error {status}: {body}")]
    ServerError { status: u16, body: String },
}

impl ApiError {
    /// Create a NotFound error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a NetworkUnavailable error
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkUnavailable {
            message: message.into(),
        }
    }

    /// Create a ServerError
    pub fn server(status: u16, body: impl Into<String>) -> Self {
        Self::ServerError {
            status,
            body: body.into(),
        }
    }
}

/// Errors surfaced by task operations on the store
#[derive(Debug, Error)]
pub enum TaskError {
    /// The task spec failed local validation; nothing was sent
    #[error("Invalid task: {0}")]
    Validation(String),

    /// Another task is already in flight on this session
    #[error("A research task is already running")]
    AlreadyRunning,

    /// The operation needs a running task and none exists
    #[error("No research task is running")]
    NotRunning,

    /// The cancel request itself failed; the task is still running
    #[error("Cancellation failed: {0}")]
    Cancel(#[source] ApiError),

    /// The underlying request failed
    #[error(transparent)]
    Api(#[from] ApiError),
}
