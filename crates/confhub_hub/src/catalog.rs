//! Hub-side catalog of published records.

use crate::error::{HubError, HubResult};
use confhub_storage::KeyValueStore;
use confhub_sync_protocol::codec::{from_cbor, MapBuilder, MapReader};
use confhub_sync_protocol::{CatalogRecord, HubId};
use parking_lot::RwLock;
use std::collections::BTreeMap;

const RECORD_PREFIX: &str = "hub.record.";
const META_KEY: &str = "hub.meta";

struct CatalogState {
    records: BTreeMap<u64, CatalogRecord>,
    next_id: u64,
}

/// Catalog of published snapshot records.
///
/// The catalog maintains:
/// - Records keyed by their numeric id, in id order
/// - The next id to hand out (ids are never reused)
/// - An optional backend every change is written through to
pub struct HubCatalog {
    state: RwLock<CatalogState>,
    backend: Option<Box<dyn KeyValueStore>>,
}

impl HubCatalog {
    /// Creates an empty in-memory catalog.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CatalogState {
                records: BTreeMap::new(),
                next_id: 1,
            }),
            backend: None,
        }
    }

    /// Opens a catalog persisted in `backend`, loading existing records.
    ///
    /// Records that fail to decode are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn open(backend: impl KeyValueStore + 'static) -> HubResult<Self> {
        let mut records = BTreeMap::new();
        for key in backend.keys()? {
            let Some(id) = key
                .strip_prefix(RECORD_PREFIX)
                .and_then(|s| s.parse::<u64>().ok())
            else {
                continue;
            };
            let Some(bytes) = backend.get(&key)? else {
                continue;
            };
            match CatalogRecord::decode(&bytes) {
                Ok(record) => {
                    records.insert(id, record);
                }
                Err(e) => tracing::warn!(hub_id = id, error = %e, "skipping undecodable hub record"),
            }
        }

        let stored_next = match backend.get(META_KEY)? {
            Some(bytes) => {
                let value = from_cbor(&bytes)?;
                MapReader::new(&value)?.int("next_id")?.unwrap_or(1).max(1) as u64
            }
            None => 1,
        };
        let next_id = records
            .keys()
            .next_back()
            .map_or(stored_next, |last| stored_next.max(last + 1));

        tracing::debug!(records = records.len(), next_id, "opened hub catalog");
        Ok(Self {
            state: RwLock::new(CatalogState { records, next_id }),
            backend: Some(Box::new(backend)),
        })
    }

    /// Stores a new record and returns the id assigned to it.
    ///
    /// The record's own `hub_id` field is overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails; the catalog is then
    /// unchanged.
    pub fn insert(&self, mut record: CatalogRecord) -> HubResult<HubId> {
        let mut state = self.state.write();
        let id = state.next_id;
        let hub_id = HubId::from(id);
        record.hub_id = hub_id.as_str().to_string();

        if let Some(backend) = &self.backend {
            backend.set(&record_key(id), &record.encode()?)?;
            let meta = MapBuilder::new().int("next_id", (id + 1) as i64).encode()?;
            backend.set(META_KEY, &meta)?;
        }

        state.records.insert(id, record);
        state.next_id = id + 1;
        Ok(hub_id)
    }

    /// Returns every record in id order.
    pub fn list(&self) -> Vec<CatalogRecord> {
        self.state.read().records.values().cloned().collect()
    }

    /// Returns a record by id.
    pub fn get(&self, hub_id: &HubId) -> Option<CatalogRecord> {
        let id = hub_id.as_u64()?;
        self.state.read().records.get(&id).cloned()
    }

    /// Applies `f` to a record and writes it back.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] for an unknown id, or a backend error.
    pub fn update(&self, hub_id: &HubId, f: impl FnOnce(&mut CatalogRecord)) -> HubResult<()> {
        let id = numeric_id(hub_id)?;
        let mut state = self.state.write();
        let mut record = state
            .records
            .get(&id)
            .cloned()
            .ok_or_else(|| HubError::NotFound(hub_id.to_string()))?;
        f(&mut record);
        record.hub_id = hub_id.as_str().to_string();

        if let Some(backend) = &self.backend {
            backend.set(&record_key(id), &record.encode()?)?;
        }
        state.records.insert(id, record);
        Ok(())
    }

    /// Removes a record and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] for an unknown id, or a backend error.
    pub fn remove(&self, hub_id: &HubId) -> HubResult<CatalogRecord> {
        let id = numeric_id(hub_id)?;
        let mut state = self.state.write();
        if !state.records.contains_key(&id) {
            return Err(HubError::NotFound(hub_id.to_string()));
        }

        if let Some(backend) = &self.backend {
            backend.delete(&record_key(id))?;
        }
        state
            .records
            .remove(&id)
            .ok_or_else(|| HubError::NotFound(hub_id.to_string()))
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    /// Returns true if the catalog has no records.
    pub fn is_empty(&self) -> bool {
        self.state.read().records.is_empty()
    }

    /// Returns the id the next insert will get.
    pub fn next_id(&self) -> u64 {
        self.state.read().next_id
    }
}

impl Default for HubCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn record_key(id: u64) -> String {
    format!("{}{}", RECORD_PREFIX, id)
}

fn numeric_id(hub_id: &HubId) -> HubResult<u64> {
    hub_id
        .as_u64()
        .ok_or_else(|| HubError::NotFound(hub_id.to_string()))
}
