//! # ConfHub Sync Protocol
//!
//! Hub catalog protocol types and CBOR codecs for ConfHub.
//!
//! This crate provides:
//! - [`HubId`], the identifier a hub assigns to a published snapshot
//! - [`CatalogRecord`], one snapshot as the hub lists it
//! - Protocol messages (publish, list, remove)
//! - CBOR encoding/decoding
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
mod error;
mod hub_id;
mod messages;
mod record;

pub use error::{ProtocolError, ProtocolResult};
pub use hub_id::HubId;
pub use messages::{
    HubMessage, ListResponse, PublishRequest, PublishResponse, RemoveRequest, RemoveResponse,
};
pub use record::CatalogRecord;

/// Protocol version spoken by this crate.
pub const PROTOCOL_VERSION: u16 = 1;
