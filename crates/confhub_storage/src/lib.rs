//! # ConfHub Storage
//!
//! Key/value persistence contract and implementations for ConfHub.
//!
//! This crate provides the lowest-level storage abstraction used by the
//! snapshot store. Backends are **opaque value stores** - they do not
//! interpret the bytes they hold.
//!
//! ## Design Principles
//!
//! - Backends are simple key/value stores (get, set, delete)
//! - No knowledge of snapshot records or index formats
//! - Must be `Send + Sync` so a store can be shared behind an `Arc`
//! - ConfHub owns all record format interpretation
//!
//! ## Available Backends
//!
//! - [`InMemoryStore`] - For testing and ephemeral storage
//! - [`FileStore`] - One file per key inside a locked directory
//!
//! ## Example
//!
//! ```rust
//! use confhub_storage::{KeyValueStore, InMemoryStore};
//!
//! let store = InMemoryStore::new();
//! store.set("greeting", b"hello world").unwrap();
//! assert_eq!(store.get("greeting").unwrap().as_deref(), Some(&b"hello world"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::{validate_key, KeyValueStore, MAX_KEY_LEN};
pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::InMemoryStore;
