//! On-disk persistence tests for the snapshot store.

use confhub_core::{
    CoreError, CoreResult, SectionState, SettingsRegistry, SettingsSection, Snapshot,
    SnapshotStore, StoreConfig,
};
use confhub_storage::{FileStore, KeyValueStore, StorageError};
use serde_json::json;
use tempfile::tempdir;

struct StaticSection {
    name: &'static str,
    state: SectionState,
}

impl SettingsSection for StaticSection {
    fn name(&self) -> &str {
        self.name
    }

    fn current_state(&self) -> SectionState {
        self.state.clone()
    }

    fn apply_state(&mut self, state: &SectionState) -> CoreResult<()> {
        self.state = state.clone();
        Ok(())
    }
}

fn registry() -> SettingsRegistry {
    let mut registry = SettingsRegistry::new();
    registry
        .register(Box::new(StaticSection {
            name: "theme",
            state: json!({"accent": "blue", "dark": true}),
        }))
        .unwrap();
    registry
        .register(Box::new(StaticSection {
            name: "plugins",
            state: json!(["search", "tags"]),
        }))
        .unwrap();
    registry
}

#[test]
fn captured_snapshots_survive_reopen() {
    let dir = tempdir().unwrap();
    let registry = registry();

    let (first, second) = {
        let mut store = SnapshotStore::open(FileStore::open(dir.path()).unwrap()).unwrap();
        let first = Snapshot::capture(&registry, "Workstation", "Daily driver").unwrap();
        let second = Snapshot::capture(&registry, "Laptop", "").unwrap();
        store.add(first.clone()).unwrap();
        store.add(second.clone()).unwrap();
        store.persist().unwrap();
        (first, second)
    };

    let store = SnapshotStore::open(FileStore::open(dir.path()).unwrap()).unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(store.revision(), 1);

    let reloaded = store.by_local_id(&first.local_id()).unwrap();
    assert_eq!(reloaded, &first);
    assert_eq!(reloaded.display_strings()["theme"], "2 settings");
    assert_eq!(reloaded.display_strings()["plugins"], "2 entries");
    assert_eq!(store.by_local_id(&second.local_id()), Some(&second));
}

#[test]
fn staged_deletions_are_erased_on_disk() {
    let dir = tempdir().unwrap();
    let registry = registry();
    let snapshot = Snapshot::capture(&registry, "Doomed", "").unwrap();
    let id = snapshot.local_id();

    {
        let mut store = SnapshotStore::open(FileStore::open(dir.path()).unwrap()).unwrap();
        store.add(snapshot).unwrap();
        store.persist().unwrap();
        store.remove(&id).unwrap();
        store.persist().unwrap();
    }

    let backend = FileStore::open(dir.path()).unwrap();
    let config = StoreConfig::default();
    assert!(backend.get(&config.snapshot_key(&id)).unwrap().is_none());
    assert_eq!(backend.keys().unwrap(), vec![config.index_key()]);

    let store = SnapshotStore::open(backend).unwrap();
    assert!(store.is_empty());
    assert_eq!(store.revision(), 2);
}

#[test]
fn corrupt_record_on_disk_is_skipped() {
    let dir = tempdir().unwrap();
    let registry = registry();
    let good = Snapshot::capture(&registry, "Good", "").unwrap();
    let bad = Snapshot::capture(&registry, "Bad", "").unwrap();

    {
        let mut store = SnapshotStore::open(FileStore::open(dir.path()).unwrap()).unwrap();
        store.add(good.clone()).unwrap();
        store.add(bad.clone()).unwrap();
        store.persist().unwrap();
    }

    let bad_key = StoreConfig::default().snapshot_key(&bad.local_id());
    std::fs::write(dir.path().join(bad_key), b"not cbor").unwrap();

    let store = SnapshotStore::open(FileStore::open(dir.path()).unwrap()).unwrap();
    assert_eq!(store.len(), 1);
    assert!(store.by_local_id(&good.local_id()).is_some());
    assert!(store.by_local_id(&bad.local_id()).is_none());
}

#[test]
fn namespaces_are_independent() {
    let dir = tempdir().unwrap();
    let registry = registry();
    let backend = FileStore::open(dir.path()).unwrap();

    let mut work = SnapshotStore::open_with_config(
        &backend,
        StoreConfig::new().with_namespace("work"),
    )
    .unwrap();
    work.add(Snapshot::capture(&registry, "Work", "").unwrap())
        .unwrap();
    work.persist().unwrap();

    let home = SnapshotStore::open_with_config(
        &backend,
        StoreConfig::new().with_namespace("home"),
    )
    .unwrap();
    assert!(home.is_empty());
    assert_eq!(work.len(), 1);
}

#[test]
fn second_open_of_same_directory_is_refused() {
    let dir = tempdir().unwrap();
    let _held = FileStore::open(dir.path()).unwrap();

    let result = FileStore::open(dir.path());
    assert!(matches!(result, Err(StorageError::Locked)));
}

#[test]
fn revision_conflict_after_external_write() {
    let dir = tempdir().unwrap();
    let registry = registry();
    let backend = FileStore::open(dir.path()).unwrap();

    let mut stale = SnapshotStore::open(&backend).unwrap();
    {
        let mut fresh = SnapshotStore::open(&backend).unwrap();
        fresh
            .add(Snapshot::capture(&registry, "Fresh", "").unwrap())
            .unwrap();
        fresh.persist().unwrap();
    }

    stale
        .add(Snapshot::capture(&registry, "Stale", "").unwrap())
        .unwrap();
    let err = stale.persist().unwrap_err();
    assert!(matches!(err, CoreError::RevisionConflict { .. }));
    assert_eq!(stale.revision(), 0);
}
