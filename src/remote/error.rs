//! Remote store error types
//!
//! Every variant names the store operation that failed so that callers can
//! tell which call of a sync went wrong without extra wrapping.

use thiserror::Error;

/// the main error type for remote store operations
#[derive(Debug, Error)]
pub enum RemoteError {
    /// repository, branch or object does not exist
    #[error("{op}: not found: {what}")]
    NotFound { op: &'static str, what: String },

    /// the API answered with an error status
    #[error("{op}: api error {status}: {message}")]
    Api {
        op: &'static str,
        status: u16,
        message: String,
    },

    /// the request never got an answer (DNS, TLS, connection, timeout)
    #[error("{op}: transport error: {message}")]
    Transport { op: &'static str, message: String },

    /// the answer could not be decoded
    #[error("{op}: invalid response: {message}")]
    Decode { op: &'static str, message: String },

    /// the request itself was malformed (bad mode string, bad payload)
    #[error("{op}: invalid request: {message}")]
    InvalidRequest { op: &'static str, message: String },

    /// error from the git2 backend
    #[error("{op}: git error: {source}")]
    Git {
        op: &'static str,
        #[source]
        source: git2::Error,
    },
}

impl RemoteError {
    /// check if this error indicates the resource doesn't exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }

    /// the store operation that failed
    pub fn operation(&self) -> &'static str {
        match self {
            RemoteError::NotFound { op, .. }
            | RemoteError::Api { op, .. }
            | RemoteError::Transport { op, .. }
            | RemoteError::Decode { op, .. }
            | RemoteError::InvalidRequest { op, .. }
            | RemoteError::Git { op, .. } => *op,
        }
    }

    pub(crate) fn git(op: &'static str) -> impl FnOnce(git2::Error) -> RemoteError {
        move |source| {
            if source.code() == git2::ErrorCode::NotFound {
                RemoteError::NotFound {
                    op,
                    what: source.message().to_string(),
                }
            } else {
                RemoteError::Git { op, source }
            }
        }
    }
}

/// result type alias for remote operations
pub type RemoteResult<T> = Result<T, RemoteError>;
