//! Hub client abstraction.

use crate::error::{SyncError, SyncResult};
use confhub_core::unix_now;
use confhub_sync_protocol::{CatalogRecord, HubId, PublishRequest};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A hub client talks to the remote snapshot catalog.
///
/// This trait abstracts the network layer so the orchestrator can run
/// against HTTP, an in-process hub, or a mock.
pub trait HubClient: Send + Sync {
    /// Publishes a snapshot and returns the id the hub assigned.
    fn publish(&self, request: &PublishRequest) -> SyncResult<HubId>;

    /// Lists every record in the catalog.
    fn list(&self) -> SyncResult<Vec<CatalogRecord>>;

    /// Removes a record from the catalog.
    fn remove(&self, hub_id: &HubId) -> SyncResult<()>;
}

impl<C: HubClient + ?Sized> HubClient for Arc<C> {
    fn publish(&self, request: &PublishRequest) -> SyncResult<HubId> {
        (**self).publish(request)
    }

    fn list(&self) -> SyncResult<Vec<CatalogRecord>> {
        (**self).list()
    }

    fn remove(&self, hub_id: &HubId) -> SyncResult<()> {
        (**self).remove(hub_id)
    }
}

/// An in-memory hub client for testing.
///
/// Behaves like a tiny catalog: publishing assigns sequential numeric ids
/// and stores the record, listing returns the stored records in insertion
/// order. Failures can be injected per operation.
#[derive(Debug)]
pub struct MockHubClient {
    connected: AtomicBool,
    next_id: AtomicU64,
    records: Mutex<Vec<CatalogRecord>>,
    published: Mutex<Vec<PublishRequest>>,
    fail_publish_names: Mutex<BTreeSet<String>>,
    fail_all_publishes: AtomicBool,
    fail_list: AtomicBool,
    fail_remove: AtomicBool,
}

impl Default for MockHubClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHubClient {
    /// Creates an empty mock catalog whose first assigned id is 1.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            next_id: AtomicU64::new(1),
            records: Mutex::new(Vec::new()),
            published: Mutex::new(Vec::new()),
            fail_publish_names: Mutex::new(BTreeSet::new()),
            fail_all_publishes: AtomicBool::new(false),
            fail_list: AtomicBool::new(false),
            fail_remove: AtomicBool::new(false),
        }
    }

    /// Sets the id the next publish will be assigned.
    pub fn set_next_id(&self, id: u64) {
        self.next_id.store(id, Ordering::SeqCst);
    }

    /// Adds a record directly to the catalog, as if another installation
    /// had published it. No validation is performed.
    ///
    /// Numeric ids move the id counter past them so later publishes never
    /// collide.
    pub fn insert_record(&self, record: CatalogRecord) {
        if let Ok(id) = record.hub_id.parse::<u64>() {
            self.next_id.fetch_max(id.saturating_add(1), Ordering::SeqCst);
        }
        self.records.lock().push(record);
    }

    /// Drops a record from the catalog without going through `remove`.
    pub fn delete_record(&self, hub_id: &str) -> bool {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|r| r.hub_id != hub_id);
        records.len() != before
    }

    /// Applies `f` to the stored record with the given id.
    pub fn update_record(&self, hub_id: &str, f: impl FnOnce(&mut CatalogRecord)) -> bool {
        match self.records.lock().iter_mut().find(|r| r.hub_id == hub_id) {
            Some(record) => {
                f(record);
                true
            }
            None => false,
        }
    }

    /// Returns a copy of the catalog.
    pub fn records(&self) -> Vec<CatalogRecord> {
        self.records.lock().clone()
    }

    /// Returns every publish request that succeeded, in order.
    pub fn published(&self) -> Vec<PublishRequest> {
        self.published.lock().clone()
    }

    /// Makes publishing a snapshot with this name fail.
    pub fn fail_publish_for(&self, name: impl Into<String>) {
        self.fail_publish_names.lock().insert(name.into());
    }

    /// Makes every publish fail (or succeed again).
    pub fn set_fail_publish(&self, fail: bool) {
        self.fail_all_publishes.store(fail, Ordering::SeqCst);
        if !fail {
            self.fail_publish_names.lock().clear();
        }
    }

    /// Makes list fail.
    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Makes remove fail.
    pub fn set_fail_remove(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    fn check_connected(&self) -> SyncResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SyncError::NotConnected)
        }
    }
}

impl HubClient for MockHubClient {
    fn publish(&self, request: &PublishRequest) -> SyncResult<HubId> {
        self.check_connected()?;
        if self.fail_all_publishes.load(Ordering::SeqCst)
            || self.fail_publish_names.lock().contains(&request.name)
        {
            return Err(SyncError::transport_retryable("publish rejected by mock"));
        }

        let hub_id = HubId::from(self.next_id.fetch_add(1, Ordering::SeqCst));
        let record = CatalogRecord::new(hub_id.as_str(), request.payload.clone(), &request.name)
            .with_description(&request.description)
            .with_created_time(unix_now())
            .with_flags(true, true, false)
            .with_display_strings(request.display_strings.clone());

        self.records.lock().push(record);
        self.published.lock().push(request.clone());
        Ok(hub_id)
    }

    fn list(&self) -> SyncResult<Vec<CatalogRecord>> {
        self.check_connected()?;
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(SyncError::transport_retryable("list rejected by mock"));
        }
        Ok(self.records())
    }

    fn remove(&self, hub_id: &HubId) -> SyncResult<()> {
        self.check_connected()?;
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(SyncError::transport_retryable("remove rejected by mock"));
        }
        if self.delete_record(hub_id.as_str()) {
            Ok(())
        } else {
            Err(SyncError::UnknownHubId {
                hub_id: hub_id.clone(),
            })
        }
    }
}
