//! Error types for hub-client.

use std::time::Duration;

use hub_proto::ProtoError;
use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Broad category of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing configuration. A caller bug; do not retry.
    Config,
    /// Bad credentials or an invalid session.
    Authentication,
    /// The referenced record or run does not exist.
    NotFound,
    /// The node or registry could not be reached or answered nonsense.
    Transport,
    /// The operation or module type is not supported. A caller bug.
    Unsupported,
    /// Local filesystem failure.
    Io,
}

/// Errors that can occur in hub and node client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid address combination or other configuration problem.
    #[error("configuration error: {0}")]
    Config(String),

    /// Sign-in failed or the session is not authenticated.
    #[error("authentication failed: {0}; sign in again (check HUB_USERNAME/HUB_PASSWORD or run `hub signup`)")]
    Authentication(String),

    /// Unknown module, record or run.
    #[error("{what} not found: {id}")]
    NotFound {
        /// What kind of thing was looked up.
        what: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// Node or registry unreachable, non-success status, or malformed response.
    #[error("{operation} against {target} failed: {reason}")]
    Transport {
        /// Operation being performed.
        operation: String,
        /// Address of the node or registry.
        target: String,
        /// Underlying cause.
        reason: String,
    },

    /// Unknown module type or storage operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// A run did not reach a terminal state in time.
    #[error("run {run_id} did not finish within {elapsed:?}")]
    RunTimeout {
        /// Run being polled.
        run_id: String,
        /// How long polling lasted.
        elapsed: Duration,
    },

    /// Local IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Build a transport error.
    pub fn transport(
        operation: impl Into<String>,
        target: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::Transport {
            operation: operation.into(),
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    /// Category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Transport { .. } | Self::RunTimeout { .. } => ErrorKind::Transport,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<ProtoError> for ClientError {
    fn from(err: ProtoError) -> Self {
        match err {
            ProtoError::InvalidAddress(msg) => Self::Config(msg),
            ProtoError::UnsupportedModuleType(kind) => {
                Self::Unsupported(format!("module type '{kind}'"))
            }
            ProtoError::UnsupportedStorage(msg) => Self::Unsupported(msg),
            other => Self::Config(other.to_string()),
        }
    }
}
