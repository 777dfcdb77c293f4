//! # ConfHub Core
//!
//! Snapshot model, settings capture/apply and the local snapshot store.
//!
//! A [`Snapshot`] is a named, timestamped capture of an installation's full
//! settings state. Snapshots live in a [`SnapshotStore`] keyed by their
//! immutable [`LocalId`]; once published they also carry the [`HubId`]
//! the remote catalog assigned.
//!
//! ## Key Invariants
//!
//! - A `LocalId` is assigned once and never reassigned
//! - At most one active snapshot per `HubId`
//! - Payloads are opaque to everything except [`Payload`] and the
//!   [`SettingsRegistry`]
//! - Removals are staged until [`SnapshotStore::persist`]
//!
//! ## Example
//!
//! ```rust
//! use confhub_core::{SnapshotBuilder, Payload, SnapshotStore};
//! use confhub_storage::InMemoryStore;
//! use std::collections::BTreeMap;
//!
//! let mut store = SnapshotStore::open(InMemoryStore::new()).unwrap();
//! let payload = Payload::from_sections(&BTreeMap::new()).unwrap();
//! let snapshot = SnapshotBuilder::new().name("Defaults").payload(payload).build().unwrap();
//! let id = snapshot.local_id();
//! store.add(snapshot).unwrap();
//! store.persist().unwrap();
//! assert!(store.by_local_id(&id).is_some());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod id;
mod payload;
mod settings;
mod snapshot;
mod store;

pub use config::StoreConfig;
pub use confhub_sync_protocol::HubId;
pub use error::{CoreError, CoreResult};
pub use id::LocalId;
pub use payload::{Payload, SectionState};
pub use settings::{ApplyReport, Capture, SettingsRegistry, SettingsSection};
pub use snapshot::{
    sanitize_description, sanitize_name, unix_now, Snapshot, SnapshotBuilder, UNTITLED_NAME,
};
pub use store::SnapshotStore;
