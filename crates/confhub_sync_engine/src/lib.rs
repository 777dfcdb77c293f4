//! # ConfHub Sync Engine
//!
//! Reconciles a local [`SnapshotStore`](confhub_core::SnapshotStore) with a
//! remote hub catalog.
//!
//! This crate provides:
//! - The [`HubClient`] abstraction (publish / list / remove)
//! - An HTTP-style client over any [`HttpClient`] and a loopback client for
//!   in-process hubs
//! - A mock client with failure injection for tests
//! - The [`SyncOrchestrator`] that drives a sync cycle and the admin entry
//!   points (create, rename, remove, apply)
//!
//! ## Architecture
//!
//! The orchestrator implements a **push-then-pull** model:
//! 1. Publish every local-only snapshot (best effort)
//! 2. List the hub catalog and validate every record (fail fast)
//! 3. Update matched snapshots, add unmatched records
//! 4. Stage local snapshots whose hub record disappeared
//! 5. Persist the store, even when an earlier phase failed
//!
//! ## Key Invariants
//!
//! - The hub is authoritative for catalog metadata
//! - Payloads of already-known snapshots are never overwritten by pull
//! - Push only acts on snapshots without a hub id, so cycles are idempotent
//! - Errors never cross `sync_with_hub`; they become `false` plus a log line

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod orchestrator;
mod transport;

pub use config::SyncConfig;
pub use error::{ErrorKind, SyncError, SyncResult};
pub use http::{HttpClient, HttpHubClient, LoopbackClient, LoopbackServer};
pub use orchestrator::{SyncCycleResult, SyncOrchestrator, SyncState, SyncStats};
pub use transport::{HubClient, MockHubClient};
