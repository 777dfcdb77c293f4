//! Error types for the sync engine.

use confhub_core::{CoreError, LocalId};
use confhub_sync_protocol::{HubId, ProtocolError};
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Hub unreachable or non-success status.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// A remote record failed validation.
    #[error("invalid remote record: {0}")]
    Validation(String),

    /// The local store is in a state the algorithm does not expect.
    #[error("consistency violation: {0}")]
    Consistency(String),

    /// Local store error.
    #[error("store error: {0}")]
    Core(#[from] CoreError),

    /// Malformed hub message.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Client is not connected.
    #[error("not connected to hub")]
    NotConnected,

    /// The hub has no record with this id.
    #[error("hub has no record {hub_id}")]
    UnknownHubId {
        /// The id that was not found.
        hub_id: HubId,
    },

    /// The hub does not allow removing this snapshot.
    #[error("snapshot {hub_id} is not removable")]
    NotRemovable {
        /// Hub id of the snapshot.
        hub_id: HubId,
    },

    /// The hub does not allow editing this snapshot.
    #[error("snapshot {local_id} is not editable")]
    NotEditable {
        /// Local id of the snapshot.
        local_id: LocalId,
    },
}

/// Coarse classification used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Remote unreachable or refused.
    Transport,
    /// Remote data did not validate.
    Validation,
    /// Local invariants broken.
    Consistency,
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::NotConnected => true,
            _ => false,
        }
    }

    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Transport { .. }
            | SyncError::NotConnected
            | SyncError::Protocol(_)
            | SyncError::UnknownHubId { .. }
            | SyncError::NotRemovable { .. } => ErrorKind::Transport,
            SyncError::Validation(_) => ErrorKind::Validation,
            SyncError::Core(CoreError::InvalidRecord { .. }) => ErrorKind::Validation,
            SyncError::Consistency(_) | SyncError::Core(_) | SyncError::NotEditable { .. } => {
                ErrorKind::Consistency
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::transport_retryable("connection reset").is_retryable());
        assert!(!SyncError::transport_fatal("name rejected").is_retryable());
        assert!(SyncError::NotConnected.is_retryable());
        assert!(!SyncError::Validation("bad".into()).is_retryable());
    }

    #[test]
    fn kinds() {
        assert_eq!(
            SyncError::transport_fatal("x").kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            SyncError::Validation("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            SyncError::Core(CoreError::invalid_record("7", "bad payload")).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            SyncError::Consistency("x".into()).kind(),
            ErrorKind::Consistency
        );
    }

    #[test]
    fn error_display() {
        assert_eq!(SyncError::NotConnected.to_string(), "not connected to hub");

        let err = SyncError::NotRemovable {
            hub_id: HubId::from(12),
        };
        assert!(err.to_string().contains("12"));
    }
}
