//! Configuration for the sync engine.

use std::time::Duration;

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the hub.
    pub hub_url: String,
    /// Timeout handed to the HTTP client for every request.
    pub request_timeout: Duration,
    /// When a local-only snapshot is still present during the remove
    /// phase, abort the phase (true) or skip the snapshot (false).
    pub abort_remove_on_unpublished: bool,
}

impl SyncConfig {
    /// Creates a new sync configuration.
    pub fn new(hub_url: impl Into<String>) -> Self {
        Self {
            hub_url: hub_url.into(),
            request_timeout: Duration::from_secs(30),
            abort_remove_on_unpublished: true,
        }
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the remove-phase policy for local-only snapshots.
    pub fn with_abort_remove_on_unpublished(mut self, abort: bool) -> Self {
        self.abort_remove_on_unpublished = abort;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new("")
    }
}
