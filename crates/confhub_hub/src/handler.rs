//! Request handlers for hub endpoints.

use crate::catalog::HubCatalog;
use crate::config::HubConfig;
use crate::error::{HubError, HubResult};
use confhub_sync_protocol::{
    CatalogRecord, HubId, ListResponse, PublishRequest, PublishResponse, RemoveRequest,
    RemoveResponse,
};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Handler for hub requests.
///
/// The typed methods (`publish`, `remove`) return client mistakes as
/// [`HubError`]s. The `handle_*` methods turn those into error responses
/// and only fail for hub-side problems.
pub struct RequestHandler {
    config: HubConfig,
    catalog: Arc<HubCatalog>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(config: HubConfig, catalog: Arc<HubCatalog>) -> Self {
        Self { config, catalog }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Validates and stores a publish request.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidRequest`] for a blank or over-long name,
    /// an empty payload or one above the size limit.
    pub fn publish(&self, request: &PublishRequest) -> HubResult<HubId> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(HubError::InvalidRequest("name is empty".into()));
        }
        if name.chars().count() > self.config.max_name_len {
            return Err(HubError::InvalidRequest(format!(
                "name longer than {} characters",
                self.config.max_name_len
            )));
        }
        if request.payload.is_empty() {
            return Err(HubError::InvalidRequest("payload is empty".into()));
        }
        if request.payload.len() > self.config.max_payload_bytes {
            return Err(HubError::InvalidRequest(format!(
                "payload too large: {} > {} bytes",
                request.payload.len(),
                self.config.max_payload_bytes
            )));
        }

        let record = CatalogRecord::new("", request.payload.clone(), name)
            .with_description(request.description.trim())
            .with_created_time(unix_now())
            .with_flags(
                self.config.default_editable,
                self.config.default_removable,
                false,
            )
            .with_display_strings(request.display_strings.clone());

        let hub_id = self.catalog.insert(record)?;
        tracing::info!(%hub_id, name, "published record");
        Ok(hub_id)
    }

    /// Removes a record.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] for an unknown id and
    /// [`HubError::NotRemovable`] if the record is protected.
    pub fn remove(&self, hub_id: &HubId) -> HubResult<()> {
        let record = self
            .catalog
            .get(hub_id)
            .ok_or_else(|| HubError::NotFound(hub_id.to_string()))?;
        if !record.removable {
            return Err(HubError::NotRemovable(hub_id.to_string()));
        }

        self.catalog.remove(hub_id)?;
        tracing::info!(%hub_id, "removed record");
        Ok(())
    }

    /// Handles a publish request.
    pub fn handle_publish(&self, request: &PublishRequest) -> HubResult<PublishResponse> {
        match self.publish(request) {
            Ok(hub_id) => Ok(PublishResponse::success(hub_id)),
            Err(e) if e.is_client_error() => {
                tracing::warn!(error = %e, "rejected publish");
                Ok(PublishResponse::error(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Handles a list request.
    pub fn handle_list(&self) -> HubResult<ListResponse> {
        Ok(ListResponse::new(self.catalog.list()))
    }

    /// Handles a remove request.
    pub fn handle_remove(&self, request: &RemoveRequest) -> HubResult<RemoveResponse> {
        match self.remove(&request.hub_id) {
            Ok(()) => Ok(RemoveResponse::success()),
            Err(e @ HubError::NotFound(_)) => {
                tracing::debug!(hub_id = %request.hub_id, "remove of unknown record");
                Ok(RemoveResponse::not_found(e.to_string()))
            }
            Err(e) if e.is_client_error() => {
                tracing::warn!(hub_id = %request.hub_id, error = %e, "rejected remove");
                Ok(RemoveResponse::error(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
