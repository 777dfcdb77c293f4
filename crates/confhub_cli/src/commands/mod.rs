//! CLI command implementations.

pub mod apply;
pub mod create;
pub mod list;
pub mod remove;
pub mod rename;
pub mod show;
pub mod sync;

use confhub_core::{LocalId, SnapshotStore};
use confhub_hub::{HubConfig, HubServer};
use confhub_storage::FileStore;
use confhub_sync_engine::{
    HttpHubClient, HubClient, LoopbackClient, LoopbackServer, SyncConfig, SyncError,
    SyncOrchestrator, SyncResult,
};
use confhub_sync_protocol::{CatalogRecord, HubId, PublishRequest};
use std::path::Path;
use std::sync::Arc;

/// Orchestrator over the on-disk store and the configured hub.
pub type Session = SyncOrchestrator<Arc<dyn HubClient>, FileStore>;

/// Directory-backed hub reached through the loopback client.
struct LocalHub(HubServer);

impl LoopbackServer for LocalHub {
    fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, String> {
        self.0.handle_post(path, body)
    }
}

/// Client used when no hub is configured.
struct Offline;

impl HubClient for Offline {
    fn publish(&self, _request: &PublishRequest) -> SyncResult<HubId> {
        Err(SyncError::NotConnected)
    }

    fn list(&self) -> SyncResult<Vec<CatalogRecord>> {
        Err(SyncError::NotConnected)
    }

    fn remove(&self, _hub_id: &HubId) -> SyncResult<()> {
        Err(SyncError::NotConnected)
    }
}

/// Opens the store at `path` and, if given, the hub at `hub`.
pub fn open_session(path: &Path, hub: Option<&Path>) -> Result<Session, Box<dyn std::error::Error>> {
    let store = SnapshotStore::open(FileStore::open(path)?)?;

    let (config, client): (SyncConfig, Arc<dyn HubClient>) = match hub {
        Some(dir) => {
            let config = SyncConfig::new(format!("file://{}", dir.display()));
            let server = HubServer::open(HubConfig::default(), FileStore::open(dir)?)?;
            let client =
                HttpHubClient::from_config(&config, LoopbackClient::new(LocalHub(server)));
            (config, Arc::new(client))
        }
        None => (SyncConfig::default(), Arc::new(Offline)),
    };

    Ok(SyncOrchestrator::new(config, client, store))
}

/// Resolves a user-supplied id: a full local id, a hub id, or a unique
/// prefix of a local id.
pub fn resolve(session: &Session, token: &str) -> Result<LocalId, Box<dyn std::error::Error>> {
    let token = token.trim();
    if token.is_empty() {
        return Err("Snapshot id must not be empty".into());
    }
    let store = session.store();

    if let Ok(local_id) = token.parse::<LocalId>() {
        if store.by_local_id(&local_id).is_some() {
            return Ok(local_id);
        }
    }

    if let Ok(hub_id) = HubId::new(token) {
        if let Some(snapshot) = store.by_hub_id(&hub_id) {
            return Ok(snapshot.local_id());
        }
    }

    let matches: Vec<LocalId> = store
        .iter()
        .map(|s| s.local_id())
        .filter(|id| id.to_string().starts_with(token))
        .collect();

    match matches.as_slice() {
        [only] => Ok(*only),
        [] => Err(format!("No snapshot matches {:?}", token).into()),
        _ => Err(format!("{:?} matches {} snapshots", token, matches.len()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confhub_core::{Payload, SnapshotBuilder};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[test]
    fn resolve_by_full_id_prefix_and_hub_id() {
        let dir = tempdir().unwrap();
        let mut session = open_session(dir.path(), None).unwrap();
        let snapshot = SnapshotBuilder::new()
            .name("A")
            .hub_id(HubId::from(9))
            .payload(Payload::from_sections(&BTreeMap::new()).unwrap())
            .build()
            .unwrap();
        let id = snapshot.local_id();
        session.store_mut().add(snapshot).unwrap();

        assert_eq!(resolve(&session, &id.to_string()).unwrap(), id);
        assert_eq!(resolve(&session, &id.to_string()[..8]).unwrap(), id);
        assert_eq!(resolve(&session, "9").unwrap(), id);
        assert!(resolve(&session, "zzz").is_err());
    }

    #[test]
    fn resolve_rejects_empty_token() {
        let dir = tempdir().unwrap();
        let mut session = open_session(dir.path(), None).unwrap();
        let snapshot = SnapshotBuilder::new()
            .name("Only")
            .payload(Payload::from_sections(&BTreeMap::new()).unwrap())
            .build()
            .unwrap();
        session.store_mut().add(snapshot).unwrap();

        assert!(resolve(&session, "").is_err());
        assert!(resolve(&session, "  ").is_err());
    }

    #[test]
    fn offline_session_cannot_sync() {
        let dir = tempdir().unwrap();
        let mut session = open_session(dir.path(), None).unwrap();
        assert!(!session.sync_with_hub());
    }
}
