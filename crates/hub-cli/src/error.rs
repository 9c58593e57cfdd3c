//! CLI error types.

use hub_client::ClientError;
use hub_proto::ProtoError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// A hub or node operation failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Invalid argument or argument combination.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// A file given on the command line could not be parsed.
    #[error("cannot parse {path}")]
    Parse {
        /// File being parsed.
        path: String,
        /// Underlying parser error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The run finished with an error status.
    #[error("run {run_id} failed: {message}")]
    RunFailed {
        /// Run id.
        run_id: String,
        /// Error reported by the node.
        message: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProtoError> for CliError {
    fn from(err: ProtoError) -> Self {
        Self::Client(err.into())
    }
}

impl CliError {
    /// Wrap a parser error for `path`.
    pub fn parse(
        path: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Parse {
            path: path.into(),
            source: source.into(),
        }
    }
}
