//! Error types for the hub-proto crate.

use thiserror::Error;

/// Errors that can occur while building or decoding protocol records.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// A node address (or combination of address fields) is invalid.
    #[error("invalid node address: {0}")]
    InvalidAddress(String),

    /// The module type prefix does not name a known module kind.
    #[error("unsupported module type: {0}")]
    UnsupportedModuleType(String),

    /// The requested storage operation is not supported.
    #[error("unsupported storage operation: {0}")]
    UnsupportedStorage(String),

    /// Failed to encode a record.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Failed to decode a record.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// Missing required field.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(String),
}
