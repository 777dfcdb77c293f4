//! HTTP hub client.
//!
//! The actual HTTP client is abstracted via a trait so any library (or a
//! loopback into an in-process hub) can carry the CBOR bodies.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::HubClient;
use confhub_sync_protocol::{
    CatalogRecord, HubId, HubMessage, ListResponse, PublishRequest, PublishResponse,
    RemoveRequest, RemoveResponse,
};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport.
pub trait HttpClient: Send + Sync {
    /// Sends a POST request and returns the response body.
    ///
    /// Implementations must give up after `timeout`.
    fn post(&self, url: &str, body: Vec<u8>, timeout: Duration) -> Result<Vec<u8>, String>;

    /// Checks if the client is connected/healthy.
    fn is_healthy(&self) -> bool {
        true
    }
}

/// Hub client speaking CBOR over an [`HttpClient`].
pub struct HttpHubClient<C: HttpClient> {
    base_url: String,
    client: C,
    timeout: Duration,
    connected: AtomicBool,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpHubClient<C> {
    /// Creates a client for the hub at `base_url`.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            timeout: Duration::from_secs(30),
            connected: AtomicBool::new(true),
            last_error: RwLock::new(None),
        }
    }

    /// Creates a client from the sync configuration.
    pub fn from_config(config: &SyncConfig, client: C) -> Self {
        Self::new(config.hub_url.clone(), client).with_timeout(config.request_timeout)
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the last transport error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Checks if the client is usable.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.client.is_healthy()
    }

    /// Closes the client. Later requests fail with `NotConnected`.
    pub fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn post(&self, message: &HubMessage) -> SyncResult<Vec<u8>> {
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }

        let body = message.encode()?;
        let url = format!("{}{}", self.base_url, message.endpoint());
        tracing::debug!(%url, bytes = body.len(), "posting hub request");

        match self.client.post(&url, body, self.timeout) {
            Ok(response) => {
                *self.last_error.write() = None;
                Ok(response)
            }
            Err(e) => {
                *self.last_error.write() = Some(e.clone());
                Err(SyncError::transport_retryable(e))
            }
        }
    }
}

/// Turns an application-level rejection into a transport error.
fn rejected(operation: &str, error: Option<String>) -> SyncError {
    SyncError::transport_fatal(format!(
        "hub rejected {}: {}",
        operation,
        error.unwrap_or_else(|| "no reason given".into())
    ))
}

impl<C: HttpClient> HubClient for HttpHubClient<C> {
    fn publish(&self, request: &PublishRequest) -> SyncResult<HubId> {
        let body = self.post(&HubMessage::PublishRequest(request.clone()))?;
        let response = PublishResponse::decode(&body)?;

        match (response.success, response.hub_id) {
            (true, Some(hub_id)) => Ok(hub_id),
            (true, None) => Err(rejected("publish", Some("no id assigned".into()))),
            (false, _) => Err(rejected("publish", response.error)),
        }
    }

    fn list(&self) -> SyncResult<Vec<CatalogRecord>> {
        let body = self.post(&HubMessage::ListRequest)?;
        let response = ListResponse::decode(&body)?;

        if response.success {
            Ok(response.records)
        } else {
            Err(rejected("list", response.error))
        }
    }

    fn remove(&self, hub_id: &HubId) -> SyncResult<()> {
        let body = self.post(&HubMessage::RemoveRequest(RemoveRequest::new(hub_id.clone())))?;
        let response = RemoveResponse::decode(&body)?;

        if response.success {
            Ok(())
        } else if response.not_found {
            Err(SyncError::UnknownHubId {
                hub_id: hub_id.clone(),
            })
        } else {
            Err(rejected("remove", response.error))
        }
    }
}

/// Trait for hubs that can handle loopback requests.
pub trait LoopbackServer {
    /// Handles a POST request and returns the response body.
    fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, String>;
}

impl<S: LoopbackServer + ?Sized> LoopbackServer for Arc<S> {
    fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, String> {
        (**self).handle_post(path, body)
    }
}

/// A loopback HTTP client that routes requests directly to a hub.
///
/// Useful for tests and for directory-backed hubs without network
/// overhead. The endpoint path is the last `/hub/` segment of the URL.
/// The timeout is ignored.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
}

impl<S: LoopbackServer + Send + Sync> LoopbackClient<S> {
    /// Creates a new loopback client connected to the given hub.
    pub fn new(server: S) -> Self {
        Self { server }
    }
}

impl<S: LoopbackServer + Send + Sync> HttpClient for LoopbackClient<S> {
    fn post(&self, url: &str, body: Vec<u8>, _timeout: Duration) -> Result<Vec<u8>, String> {
        let path = url.rfind("/hub/").map(|i| &url[i..]).unwrap_or(url);
        self.server.handle_post(path, &body)
    }
}
