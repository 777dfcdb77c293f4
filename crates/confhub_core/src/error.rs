//! Error types for ConfHub core.

use crate::id::LocalId;
use confhub_storage::StorageError;
use confhub_sync_protocol::{HubId, ProtocolError};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Record or message codec error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Payload could not be serialized or deserialized.
    #[error("codec error: {0}")]
    Codec(String),

    /// A snapshot was built from incomplete or invalid fields.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// A remote catalog record failed validation.
    #[error("invalid catalog record {hub_id:?}: {reason}")]
    InvalidRecord {
        /// Catalog id as received (possibly blank).
        hub_id: String,
        /// Why the record was rejected.
        reason: String,
    },

    /// Another snapshot already carries this hub id.
    #[error("hub id {hub_id} already belongs to snapshot {existing}")]
    DuplicateHubId {
        /// The contested hub id.
        hub_id: HubId,
        /// Snapshot currently holding it.
        existing: LocalId,
    },

    /// A settings section with this name is already registered.
    #[error("settings section already registered: {0}")]
    DuplicateSection(String),

    /// No active snapshot has this id.
    #[error("snapshot not found: {0}")]
    SnapshotNotFound(LocalId),

    /// The stored index was rewritten by another writer since it was loaded.
    #[error("index revision conflict: loaded {expected}, found {found}")]
    RevisionConflict {
        /// Revision this store loaded.
        expected: u64,
        /// Revision currently in storage.
        found: u64,
    },

    /// Some writes during persist failed; the rest were kept.
    #[error("persist incomplete: {failed} write(s) failed")]
    PartialPersist {
        /// Number of failed writes.
        failed: usize,
    },

    /// A settings section failed to apply its state.
    #[error("settings section {section} failed: {message}")]
    Settings {
        /// Section name.
        section: String,
        /// Error message.
        message: String,
    },
}

impl CoreError {
    /// Creates an invalid-record error.
    pub fn invalid_record(hub_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            hub_id: hub_id.into(),
            reason: reason.into(),
        }
    }

    /// Creates a settings error for `section`.
    pub fn settings(section: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Settings {
            section: section.into(),
            message: message.into(),
        }
    }
}
