//! Error types for the hub protocol.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding protocol messages.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Serializing to CBOR failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// The bytes are not valid CBOR or do not have the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// A hub id was empty or blank.
    #[error("invalid hub id: {0:?}")]
    InvalidHubId(String),
}

impl ProtocolError {
    /// Creates a decode error for a missing or mistyped field.
    pub fn invalid_field(name: &str, expected: &str) -> Self {
        Self::Decode(format!("field {:?}: expected {}", name, expected))
    }
}
