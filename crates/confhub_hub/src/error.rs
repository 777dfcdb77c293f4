//! Error types for the hub.

use confhub_storage::StorageError;
use confhub_sync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for hub operations.
pub type HubResult<T> = Result<T, HubError>;

/// Errors that can occur in the hub.
#[derive(Error, Debug)]
pub enum HubError {
    /// Request failed validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No record with this id.
    #[error("unknown hub id: {0}")]
    NotFound(String),

    /// The record may not be removed.
    #[error("record {0} is not removable")]
    NotRemovable(String),

    /// Backend error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Malformed message or stored record.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl HubError {
    /// Returns true if the caller is at fault (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            HubError::InvalidRequest(_)
                | HubError::NotFound(_)
                | HubError::NotRemovable(_)
                | HubError::Protocol(_)
        )
    }

    /// Returns true if the hub is at fault (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(self, HubError::Storage(_))
    }
}
