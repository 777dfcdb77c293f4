//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The key is empty, too long, or contains characters outside the
    /// portable file-name set.
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    /// Another process holds the store lock.
    #[error("store is locked by another process")]
    Locked,
}
