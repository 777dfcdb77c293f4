//! # ConfHub Hub
//!
//! Reference snapshot hub for ConfHub.
//!
//! This crate provides:
//! - A catalog of published snapshot records with sequential numeric ids
//! - Request handling for publish, list and remove
//! - CBOR dispatch by endpoint path (`/hub/publish`, `/hub/list`,
//!   `/hub/remove`) for loopback clients
//! - Optional persistence through any key/value backend
//!
//! The hub is authoritative for catalog metadata: it stamps the creation
//! time and the edit/remove rights, and curators can mark records official
//! or change their name and description.

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod catalog;
mod config;
mod error;
mod handler;
mod server;

pub use catalog::HubCatalog;
pub use config::HubConfig;
pub use error::{HubError, HubResult};
pub use handler::RequestHandler;
pub use server::HubServer;
