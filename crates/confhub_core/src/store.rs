//! Local snapshot store.
//!
//! Storage layout (keys relative to the configured namespace):
//!
//! ```text
//! <ns>.index                 # { revision, ids: [local_id, ...] }
//! <ns>.snapshot.<local_id>   # one record per active snapshot
//! ```

use crate::config::StoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::id::LocalId;
use crate::snapshot::Snapshot;
use ciborium::Value;
use confhub_storage::KeyValueStore;
use confhub_sync_protocol::codec::{from_cbor, MapBuilder, MapReader};
use confhub_sync_protocol::HubId;
use std::collections::{BTreeMap, BTreeSet};

/// Keyed collection of snapshots persisted through a [`KeyValueStore`].
///
/// Mutations only touch memory until [`SnapshotStore::persist`] is called.
/// Removed snapshots are staged and their records erased on the next
/// persist.
///
/// # Concurrency
///
/// The store is single-writer: it takes `&mut self` for every mutation.
/// Across processes, the index carries a revision counter; `persist`
/// refuses to overwrite an index that another writer advanced since this
/// store loaded it.
pub struct SnapshotStore<S: KeyValueStore> {
    backend: S,
    config: StoreConfig,
    active: BTreeMap<LocalId, Snapshot>,
    pending_deletion: BTreeSet<LocalId>,
    revision: u64,
}

impl<S: KeyValueStore> SnapshotStore<S> {
    /// Opens a store with the default configuration and loads it.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be read or decoded.
    pub fn open(backend: S) -> CoreResult<Self> {
        Self::open_with_config(backend, StoreConfig::default())
    }

    /// Opens a store with the given configuration and loads it.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be read or decoded.
    pub fn open_with_config(backend: S, config: StoreConfig) -> CoreResult<Self> {
        let mut store = Self {
            backend,
            config,
            active: BTreeMap::new(),
            pending_deletion: BTreeSet::new(),
            revision: 0,
        };
        store.load()?;
        Ok(store)
    }

    /// Replaces the in-memory state with what is persisted.
    ///
    /// Records that are missing, whose id does not parse, that fail to
    /// decode, or whose hub id is already taken are skipped and logged.
    /// Returns the number of snapshots loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be read or decoded.
    pub fn load(&mut self) -> CoreResult<usize> {
        let (revision, ids) = self.read_index()?;

        self.active.clear();
        self.pending_deletion.clear();
        self.revision = revision;

        for raw_id in ids {
            let Ok(local_id) = raw_id.parse::<LocalId>() else {
                tracing::warn!(local_id = %raw_id, "index entry is not a valid id, skipping");
                continue;
            };

            let key = self.config.snapshot_key(&local_id);
            let bytes = match self.backend.get(&key) {
                Ok(Some(bytes)) => bytes,
                Ok(None) => {
                    tracing::warn!(%local_id, "indexed snapshot record is missing, skipping");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(%local_id, error = %e, "failed to read snapshot record, skipping");
                    continue;
                }
            };

            let snapshot = match Snapshot::decode_record(&bytes) {
                Ok(snapshot) if snapshot.local_id() == local_id => snapshot,
                Ok(snapshot) => {
                    tracing::warn!(
                        %local_id,
                        record_id = %snapshot.local_id(),
                        "snapshot record does not match its key, skipping"
                    );
                    continue;
                }
                Err(e) => {
                    tracing::warn!(%local_id, error = %e, "failed to decode snapshot record, skipping");
                    continue;
                }
            };

            if let Err(e) = self.add(snapshot) {
                tracing::warn!(%local_id, error = %e, "rejected stored snapshot, skipping");
            }
        }

        tracing::debug!(
            revision = self.revision,
            snapshots = self.active.len(),
            "loaded snapshot store"
        );
        Ok(self.active.len())
    }

    /// Inserts or replaces a snapshot by local id.
    ///
    /// Re-adding a staged snapshot cancels its pending deletion.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateHubId`] if a different snapshot already
    /// carries the same hub id.
    pub fn add(&mut self, snapshot: Snapshot) -> CoreResult<()> {
        if let Some(hub_id) = snapshot.hub_id() {
            self.ensure_hub_id_free(hub_id, &snapshot.local_id())?;
        }

        let local_id = snapshot.local_id();
        self.pending_deletion.remove(&local_id);
        self.active.insert(local_id, snapshot);
        Ok(())
    }

    /// Stages a snapshot for deletion.
    ///
    /// Returns the removed snapshot, or `None` if no active snapshot has
    /// this id.
    pub fn remove(&mut self, local_id: &LocalId) -> Option<Snapshot> {
        let removed = self.active.remove(local_id)?;
        self.pending_deletion.insert(*local_id);
        Some(removed)
    }

    /// Looks up an active snapshot by local id.
    pub fn by_local_id(&self, local_id: &LocalId) -> Option<&Snapshot> {
        self.active.get(local_id)
    }

    /// Mutable access for owner edits (name, description, flags).
    pub fn get_mut(&mut self, local_id: &LocalId) -> Option<&mut Snapshot> {
        self.active.get_mut(local_id)
    }

    /// Looks up an active snapshot by hub id.
    pub fn by_hub_id(&self, hub_id: &HubId) -> Option<&Snapshot> {
        self.active
            .values()
            .find(|snapshot| snapshot.hub_id() == Some(hub_id))
    }

    /// Records the hub id assigned to a snapshot on publish.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SnapshotNotFound`] for an unknown id and
    /// [`CoreError::DuplicateHubId`] if another snapshot holds `hub_id`.
    pub fn assign_hub_id(&mut self, local_id: &LocalId, hub_id: HubId) -> CoreResult<()> {
        if !self.active.contains_key(local_id) {
            return Err(CoreError::SnapshotNotFound(*local_id));
        }
        self.ensure_hub_id_free(&hub_id, local_id)?;

        if let Some(snapshot) = self.active.get_mut(local_id) {
            snapshot.set_hub_id(hub_id);
        }
        Ok(())
    }

    /// Iterates over active snapshots in local id order.
    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.active.values()
    }

    /// Returns the number of active snapshots.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Returns true if there are no active snapshots.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Returns the ids of snapshots the hub has not acknowledged yet.
    pub fn local_only_ids(&self) -> Vec<LocalId> {
        self.active
            .values()
            .filter(|snapshot| snapshot.is_local_only())
            .map(Snapshot::local_id)
            .collect()
    }

    /// Returns the ids staged for deletion.
    pub fn pending_deletions(&self) -> impl Iterator<Item = &LocalId> {
        self.pending_deletion.iter()
    }

    /// Returns active snapshots, most recent first.
    ///
    /// Equal timestamps are ordered by local id so the result is stable.
    pub fn sorted(&self) -> Vec<&Snapshot> {
        let mut snapshots: Vec<&Snapshot> = self.active.values().collect();
        snapshots.sort_by(|a, b| {
            b.timestamp()
                .cmp(&a.timestamp())
                .then_with(|| a.local_id().cmp(&b.local_id()))
        });
        snapshots
    }

    /// Returns the index revision this store last loaded or wrote.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the storage backend.
    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Writes the store to the backend.
    ///
    /// Every active snapshot is written under its local id, every staged
    /// deletion is erased, and the index is rewritten with the active ids
    /// and the next revision. Failed writes are logged and counted; the
    /// remaining writes still happen and nothing is rolled back. Staged
    /// deletions whose erase failed stay staged.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RevisionConflict`] (and writes nothing) if the
    /// stored index moved since this store loaded it, and
    /// [`CoreError::PartialPersist`] if any individual write failed.
    pub fn persist(&mut self) -> CoreResult<()> {
        if self.config.check_revision {
            let (stored, _) = self.read_index()?;
            if stored != self.revision {
                return Err(CoreError::RevisionConflict {
                    expected: self.revision,
                    found: stored,
                });
            }
        }

        let mut failed = 0usize;

        for (local_id, snapshot) in &self.active {
            let key = self.config.snapshot_key(local_id);
            let result = snapshot
                .encode_record()
                .and_then(|bytes| Ok(self.backend.set(&key, &bytes)?));
            if let Err(e) = result {
                tracing::error!(%local_id, error = %e, "failed to write snapshot record");
                failed += 1;
            }
        }

        let staged: Vec<LocalId> = self.pending_deletion.iter().copied().collect();
        for local_id in staged {
            match self.backend.delete(&self.config.snapshot_key(&local_id)) {
                Ok(_) => {
                    self.pending_deletion.remove(&local_id);
                }
                Err(e) => {
                    tracing::error!(%local_id, error = %e, "failed to erase snapshot record");
                    failed += 1;
                }
            }
        }

        let next_revision = self.revision + 1;
        match self.write_index(next_revision) {
            Ok(()) => self.revision = next_revision,
            Err(e) => {
                tracing::error!(error = %e, "failed to write snapshot index");
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(CoreError::PartialPersist { failed });
        }

        tracing::debug!(
            revision = self.revision,
            snapshots = self.active.len(),
            "persisted snapshot store"
        );
        Ok(())
    }

    fn ensure_hub_id_free(&self, hub_id: &HubId, owner: &LocalId) -> CoreResult<()> {
        match self.by_hub_id(hub_id) {
            Some(existing) if existing.local_id() != *owner => Err(CoreError::DuplicateHubId {
                hub_id: hub_id.clone(),
                existing: existing.local_id(),
            }),
            _ => Ok(()),
        }
    }

    fn read_index(&self) -> CoreResult<(u64, Vec<String>)> {
        let Some(bytes) = self.backend.get(&self.config.index_key())? else {
            return Ok((0, Vec::new()));
        };

        let value = from_cbor(&bytes)?;
        let map = MapReader::new(&value)?;
        let revision = map.int("revision")?.unwrap_or(0).max(0) as u64;
        let ids = map
            .array("ids")?
            .unwrap_or_default()
            .iter()
            .filter_map(|v| v.as_text().map(str::to_string))
            .collect();

        Ok((revision, ids))
    }

    fn write_index(&self, revision: u64) -> CoreResult<()> {
        let ids = self
            .active
            .keys()
            .map(|id| Value::Text(id.to_string()))
            .collect();
        let bytes = MapBuilder::new()
            .int("revision", revision as i64)
            .value("ids", Value::Array(ids))
            .encode()?;
        self.backend.set(&self.config.index_key(), &bytes)?;
        Ok(())
    }
}

impl<S: KeyValueStore> std::fmt::Debug for SnapshotStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("namespace", &self.config.namespace)
            .field("revision", &self.revision)
            .field("active", &self.active.len())
            .field("pending_deletion", &self.pending_deletion.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Payload;
    use crate::snapshot::SnapshotBuilder;
    use confhub_storage::{InMemoryStore, StorageError, StorageResult};
    use proptest::prelude::*;
    use std::sync::Arc;

    fn snapshot(name: &str, timestamp: i64) -> Snapshot {
        SnapshotBuilder::new()
            .name(name)
            .payload(Payload::from_sections(&BTreeMap::new()).unwrap())
            .timestamp(timestamp)
            .build()
            .unwrap()
    }

    fn published(name: &str, hub_id: u64) -> Snapshot {
        SnapshotBuilder::new()
            .name(name)
            .hub_id(HubId::from(hub_id))
            .payload(Payload::from_sections(&BTreeMap::new()).unwrap())
            .timestamp(1)
            .build()
            .unwrap()
    }

    /// Backend that fails writes to keys containing a marker.
    struct FlakyStore {
        inner: InMemoryStore,
        fail_marker: String,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
            if key.contains(&self.fail_marker) {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            self.inner.set(key, value)
        }

        fn delete(&self, key: &str) -> StorageResult<bool> {
            if key.contains(&self.fail_marker) {
                return Err(StorageError::Io(std::io::Error::other("read-only")));
            }
            self.inner.delete(key)
        }

        fn keys(&self) -> StorageResult<Vec<String>> {
            self.inner.keys()
        }
    }

    #[test]
    fn add_and_lookup() {
        let mut store = SnapshotStore::open(InMemoryStore::new()).unwrap();
        let a = published("A", 7);
        let id = a.local_id();
        store.add(a).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.by_local_id(&id).unwrap().name(), "A");
        assert_eq!(store.by_hub_id(&HubId::from(7)).unwrap().local_id(), id);
        assert!(store.by_hub_id(&HubId::from(8)).is_none());
        assert!(store.by_local_id(&LocalId::new()).is_none());
    }

    #[test]
    fn add_upserts_by_local_id() {
        let mut store = SnapshotStore::open(InMemoryStore::new()).unwrap();
        let mut a = snapshot("A", 1);
        let id = a.local_id();
        store.add(a.clone()).unwrap();

        a.set_name("A2").unwrap();
        store.add(a).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.by_local_id(&id).unwrap().name(), "A2");
    }

    #[test]
    fn add_rejects_duplicate_hub_id() {
        let mut store = SnapshotStore::open(InMemoryStore::new()).unwrap();
        store.add(published("A", 7)).unwrap();

        let result = store.add(published("B", 7));
        assert!(matches!(result, Err(CoreError::DuplicateHubId { .. })));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn assign_hub_id_checks_owner() {
        let mut store = SnapshotStore::open(InMemoryStore::new()).unwrap();
        let a = snapshot("A", 1);
        let b = snapshot("B", 2);
        let (a_id, b_id) = (a.local_id(), b.local_id());
        store.add(a).unwrap();
        store.add(b).unwrap();

        store.assign_hub_id(&a_id, HubId::from(1)).unwrap();
        // Reassigning the same id to its owner is fine.
        store.assign_hub_id(&a_id, HubId::from(1)).unwrap();

        let result = store.assign_hub_id(&b_id, HubId::from(1));
        assert!(matches!(result, Err(CoreError::DuplicateHubId { .. })));
        assert!(store.by_local_id(&b_id).unwrap().is_local_only());

        let missing = store.assign_hub_id(&LocalId::new(), HubId::from(2));
        assert!(matches!(missing, Err(CoreError::SnapshotNotFound(_))));
    }

    #[test]
    fn remove_stages_until_persist() {
        let backend = Arc::new(InMemoryStore::new());
        let mut store = SnapshotStore::open(Arc::clone(&backend)).unwrap();
        let a = snapshot("A", 1);
        let id = a.local_id();
        store.add(a).unwrap();
        store.persist().unwrap();

        let key = store.config().snapshot_key(&id);
        assert!(backend.get(&key).unwrap().is_some());

        assert!(store.remove(&id).is_some());
        assert!(store.remove(&id).is_none());
        assert_eq!(store.pending_deletions().count(), 1);
        assert!(backend.get(&key).unwrap().is_some());

        store.persist().unwrap();
        assert_eq!(store.pending_deletions().count(), 0);
        assert!(backend.get(&key).unwrap().is_none());
    }

    #[test]
    fn re_adding_cancels_staged_deletion() {
        let mut store = SnapshotStore::open(InMemoryStore::new()).unwrap();
        let a = snapshot("A", 1);
        let id = a.local_id();
        store.add(a).unwrap();

        let removed = store.remove(&id).unwrap();
        store.add(removed).unwrap();
        assert_eq!(store.pending_deletions().count(), 0);
        assert!(store.by_local_id(&id).is_some());
    }

    #[test]
    fn persist_and_reload() {
        let backend = Arc::new(InMemoryStore::new());
        let mut store = SnapshotStore::open(Arc::clone(&backend)).unwrap();
        let a = snapshot("A", 10);
        let b = published("B", 3);
        store.add(a.clone()).unwrap();
        store.add(b.clone()).unwrap();
        store.persist().unwrap();
        assert_eq!(store.revision(), 1);

        let reloaded = SnapshotStore::open(Arc::clone(&backend)).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.revision(), 1);
        assert_eq!(reloaded.by_local_id(&a.local_id()), Some(&a));
        assert_eq!(reloaded.by_local_id(&b.local_id()), Some(&b));
    }

    #[test]
    fn load_skips_missing_and_corrupt_records() {
        let backend = Arc::new(InMemoryStore::new());
        let mut store = SnapshotStore::open(Arc::clone(&backend)).unwrap();
        let good = snapshot("Good", 1);
        let missing = snapshot("Missing", 2);
        let corrupt = snapshot("Corrupt", 3);
        for s in [&good, &missing, &corrupt] {
            store.add(s.clone()).unwrap();
        }
        store.persist().unwrap();

        let config = StoreConfig::default();
        backend.delete(&config.snapshot_key(&missing.local_id())).unwrap();
        backend
            .set(&config.snapshot_key(&corrupt.local_id()), b"\xff\xff")
            .unwrap();

        let reloaded = SnapshotStore::open(Arc::clone(&backend)).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.by_local_id(&good.local_id()).is_some());
    }

    #[test]
    fn load_skips_unparseable_index_entries() {
        let backend = Arc::new(InMemoryStore::new());
        let bytes = MapBuilder::new()
            .int("revision", 4)
            .value("ids", Value::Array(vec![Value::Text("garbage".into())]))
            .encode()
            .unwrap();
        backend.set("confhub.index", &bytes).unwrap();

        let store = SnapshotStore::open(backend).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.revision(), 4);
    }

    #[test]
    fn persist_detects_revision_conflict() {
        let backend = Arc::new(InMemoryStore::new());
        let mut first = SnapshotStore::open(Arc::clone(&backend)).unwrap();
        let mut second = SnapshotStore::open(Arc::clone(&backend)).unwrap();

        first.add(snapshot("From first", 1)).unwrap();
        first.persist().unwrap();

        second.add(snapshot("From second", 2)).unwrap();
        let result = second.persist();
        assert!(matches!(
            result,
            Err(CoreError::RevisionConflict {
                expected: 0,
                found: 1
            })
        ));

        // Nothing from the conflicting writer reached storage.
        let reloaded = SnapshotStore::open(Arc::clone(&backend)).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.iter().next().unwrap().name(), "From first");

        // After reloading, the second writer can persist again.
        second.load().unwrap();
        second.add(snapshot("From second", 2)).unwrap();
        second.persist().unwrap();
        assert_eq!(second.revision(), 2);
    }

    #[test]
    fn revision_check_can_be_disabled() {
        let backend = Arc::new(InMemoryStore::new());
        let config = StoreConfig::default().with_check_revision(false);
        let mut first =
            SnapshotStore::open_with_config(Arc::clone(&backend), config.clone()).unwrap();
        let mut second = SnapshotStore::open_with_config(Arc::clone(&backend), config).unwrap();

        first.add(snapshot("A", 1)).unwrap();
        first.persist().unwrap();
        second.add(snapshot("B", 1)).unwrap();
        assert!(second.persist().is_ok());
    }

    #[test]
    fn partial_persist_keeps_successful_writes() {
        let ok = snapshot("Ok", 1);
        let bad = snapshot("Bad", 2);
        let backend = Arc::new(FlakyStore {
            inner: InMemoryStore::new(),
            fail_marker: bad.local_id().to_string(),
        });

        let mut store = SnapshotStore::open(Arc::clone(&backend)).unwrap();
        store.add(ok.clone()).unwrap();
        store.add(bad.clone()).unwrap();

        let result = store.persist();
        assert!(matches!(result, Err(CoreError::PartialPersist { failed: 1 })));

        let config = StoreConfig::default();
        assert!(backend
            .get(&config.snapshot_key(&ok.local_id()))
            .unwrap()
            .is_some());
        // The index still lists both ids, so a reload skips the missing one.
        let reloaded = SnapshotStore::open(Arc::clone(&backend)).unwrap();
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn failed_erase_stays_staged() {
        let doomed = snapshot("Doomed", 1);
        let backend = Arc::new(FlakyStore {
            inner: InMemoryStore::new(),
            fail_marker: doomed.local_id().to_string(),
        });
        let mut store = SnapshotStore::open(Arc::clone(&backend)).unwrap();
        store.add(doomed.clone()).unwrap();
        store.remove(&doomed.local_id());

        let result = store.persist();
        assert!(matches!(result, Err(CoreError::PartialPersist { failed: 1 })));
        assert_eq!(
            store.pending_deletions().copied().collect::<Vec<_>>(),
            vec![doomed.local_id()]
        );
    }

    #[test]
    fn sorted_is_most_recent_first_with_stable_ties() {
        let mut store = SnapshotStore::open(InMemoryStore::new()).unwrap();
        let old = snapshot("Old", 100);
        let new = snapshot("New", 300);
        let tie_a = snapshot("TieA", 200);
        let tie_b = snapshot("TieB", 200);
        for s in [&old, &new, &tie_a, &tie_b] {
            store.add(s.clone()).unwrap();
        }

        let names: Vec<&str> = store.sorted().iter().map(|s| s.name()).collect();
        assert_eq!(names[0], "New");
        assert_eq!(names[3], "Old");

        let (first_tie, second_tie) = if tie_a.local_id() < tie_b.local_id() {
            ("TieA", "TieB")
        } else {
            ("TieB", "TieA")
        };
        assert_eq!(names[1], first_tie);
        assert_eq!(names[2], second_tie);
    }

    #[test]
    fn local_only_ids_lists_unpublished() {
        let mut store = SnapshotStore::open(InMemoryStore::new()).unwrap();
        let local = snapshot("Local", 1);
        store.add(local.clone()).unwrap();
        store.add(published("Remote", 5)).unwrap();

        assert_eq!(store.local_only_ids(), vec![local.local_id()]);
    }

    proptest! {
        #[test]
        fn sorted_timestamps_never_increase(timestamps in proptest::collection::vec(-1000i64..1000, 0..40)) {
            let mut store = SnapshotStore::open(InMemoryStore::new()).unwrap();
            for (i, ts) in timestamps.iter().enumerate() {
                store.add(snapshot(&format!("s{}", i), *ts)).unwrap();
            }

            let sorted = store.sorted();
            prop_assert_eq!(sorted.len(), timestamps.len());
            for pair in sorted.windows(2) {
                prop_assert!(pair[0].timestamp() >= pair[1].timestamp());
                if pair[0].timestamp() == pair[1].timestamp() {
                    prop_assert!(pair[0].local_id() < pair[1].local_id());
                }
            }
        }
    }
}
