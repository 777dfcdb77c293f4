//! Main hub server.

use crate::catalog::HubCatalog;
use crate::config::HubConfig;
use crate::error::HubResult;
use crate::handler::RequestHandler;
use confhub_storage::KeyValueStore;
use confhub_sync_protocol::{
    CatalogRecord, HubId, HubMessage, PublishRequest, RemoveRequest,
};
use std::sync::Arc;

/// The reference hub.
///
/// Holds a catalog and answers publish, list and remove requests, either
/// through typed methods or as CBOR bodies posted to an endpoint path.
///
/// # Example
///
/// ```
/// use confhub_hub::{HubConfig, HubServer};
/// use confhub_sync_protocol::PublishRequest;
///
/// let hub = HubServer::new(HubConfig::default());
/// let id = hub.publish(&PublishRequest::new(vec![0xa0], "Defaults", "")).unwrap();
/// hub.set_official(&id, true).unwrap();
/// assert!(hub.list()[0].official);
/// ```
pub struct HubServer {
    handler: RequestHandler,
    catalog: Arc<HubCatalog>,
}

impl HubServer {
    /// Creates a hub with an empty in-memory catalog.
    pub fn new(config: HubConfig) -> Self {
        Self::with_catalog(config, Arc::new(HubCatalog::new()))
    }

    /// Creates a hub over an existing catalog.
    pub fn with_catalog(config: HubConfig, catalog: Arc<HubCatalog>) -> Self {
        let handler = RequestHandler::new(config, Arc::clone(&catalog));
        Self { handler, catalog }
    }

    /// Opens a hub whose catalog is persisted in `backend`.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    pub fn open(config: HubConfig, backend: impl KeyValueStore + 'static) -> HubResult<Self> {
        Ok(Self::with_catalog(config, Arc::new(HubCatalog::open(backend)?)))
    }

    /// Publishes a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid or cannot be stored.
    pub fn publish(&self, request: &PublishRequest) -> HubResult<HubId> {
        self.handler.publish(request)
    }

    /// Lists every record in id order.
    pub fn list(&self) -> Vec<CatalogRecord> {
        self.catalog.list()
    }

    /// Removes a record.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown or non-removable records.
    pub fn remove(&self, hub_id: &HubId) -> HubResult<()> {
        self.handler.remove(hub_id)
    }

    /// Marks a record as vetted (or not).
    ///
    /// # Errors
    ///
    /// Returns an error for unknown records.
    pub fn set_official(&self, hub_id: &HubId, official: bool) -> HubResult<()> {
        self.catalog.update(hub_id, |record| record.official = official)
    }

    /// Changes a record's name and description.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown records.
    pub fn update_metadata(&self, hub_id: &HubId, name: &str, description: &str) -> HubResult<()> {
        self.catalog.update(hub_id, |record| {
            record.name = name.trim().to_string();
            record.description = description.trim().to_string();
        })
    }

    /// Changes the rights publishers have over a record.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown records.
    pub fn set_rights(&self, hub_id: &HubId, editable: bool, removable: bool) -> HubResult<()> {
        self.catalog.update(hub_id, |record| {
            record.editable = editable;
            record.removable = removable;
        })
    }

    /// Handles a CBOR body posted to an endpoint path.
    ///
    /// Unknown paths, undecodable bodies and hub-side failures are returned
    /// as `Err`; rejected requests are encoded as error responses.
    pub fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, String> {
        let response = match path {
            "/hub/publish" => {
                let request = PublishRequest::decode(body).map_err(|e| e.to_string())?;
                self.handler
                    .handle_publish(&request)
                    .map(HubMessage::PublishResponse)
            }
            "/hub/list" => self.handler.handle_list().map(HubMessage::ListResponse),
            "/hub/remove" => {
                let request = RemoveRequest::decode(body).map_err(|e| e.to_string())?;
                self.handler
                    .handle_remove(&request)
                    .map(HubMessage::RemoveResponse)
            }
            other => return Err(format!("unknown endpoint: {}", other)),
        };

        response
            .map_err(|e| e.to_string())?
            .encode()
            .map_err(|e| e.to_string())
    }

    /// Returns the number of records.
    pub fn record_count(&self) -> usize {
        self.catalog.len()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &HubConfig {
        self.handler.config()
    }
}
