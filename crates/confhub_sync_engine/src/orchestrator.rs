//! Sync orchestrator: push-then-pull reconciliation and admin entry points.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::HubClient;
use confhub_core::{
    ApplyReport, CoreError, CoreResult, LocalId, SettingsRegistry, Snapshot, SnapshotStore,
};
use confhub_storage::KeyValueStore;
use confhub_sync_protocol::HubId;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// The current state of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No sync has run yet.
    Idle,
    /// Publishing local-only snapshots.
    Pushing,
    /// Listing and merging the hub catalog.
    Pulling,
    /// Writing the local store.
    Persisting,
    /// The last cycle completed without failures.
    Synced,
    /// The last cycle had at least one failure.
    Error,
}

impl SyncState {
    /// Returns true while a cycle is running.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SyncState::Pushing | SyncState::Pulling | SyncState::Persisting
        )
    }
}

/// Cumulative statistics across sync cycles.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Total number of sync cycles run.
    pub cycles_completed: u64,
    /// Cycles that reported failure.
    pub cycles_failed: u64,
    /// Snapshots published to the hub.
    pub snapshots_published: u64,
    /// Snapshots added from the hub.
    pub snapshots_added: u64,
    /// Snapshots whose metadata was refreshed from the hub.
    pub snapshots_updated: u64,
    /// Snapshots removed because the hub dropped them.
    pub snapshots_removed: u64,
    /// Last sync time.
    pub last_sync_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Result of a sync cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncCycleResult {
    /// Snapshots published during push.
    pub published: usize,
    /// Remote records added locally.
    pub added: usize,
    /// Local snapshots refreshed from the hub.
    pub updated: usize,
    /// Local snapshots staged for removal.
    pub removed: usize,
    /// Every publish succeeded (or there was nothing to publish).
    pub push_ok: bool,
    /// List, validation, apply and remove all succeeded.
    pub pull_ok: bool,
    /// The store was written completely.
    pub persist_ok: bool,
    /// Duration of the cycle.
    pub duration: Duration,
}

impl SyncCycleResult {
    /// Returns true if every phase succeeded.
    pub fn success(&self) -> bool {
        self.push_ok && self.pull_ok && self.persist_ok
    }
}

/// Reconciles a local snapshot store with a hub catalog.
///
/// The orchestrator owns the store and the client for its lifetime; every
/// operation takes `&mut self` and runs to completion on the caller's
/// thread.
pub struct SyncOrchestrator<C: HubClient, S: KeyValueStore> {
    config: SyncConfig,
    client: C,
    store: SnapshotStore<S>,
    state: SyncState,
    stats: SyncStats,
}

impl<C: HubClient, S: KeyValueStore> SyncOrchestrator<C, S> {
    /// Creates a new orchestrator.
    pub fn new(config: SyncConfig, client: C, store: SnapshotStore<S>) -> Self {
        Self {
            config,
            client,
            store,
            state: SyncState::Idle,
            stats: SyncStats::default(),
        }
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Gets the cumulative stats.
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the hub client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the local store.
    pub fn store(&self) -> &SnapshotStore<S> {
        &self.store
    }

    /// Returns the local store for direct edits.
    pub fn store_mut(&mut self) -> &mut SnapshotStore<S> {
        &mut self.store
    }

    /// Consumes the orchestrator and returns the store.
    pub fn into_store(self) -> SnapshotStore<S> {
        self.store
    }

    /// Runs push, pull and persist, then reports whether all succeeded.
    pub fn sync_with_hub(&mut self) -> bool {
        self.sync_cycle().success()
    }

    /// Runs a full cycle: push, pull, then persist.
    ///
    /// Persist runs even if push or pull failed, so successful publishes
    /// and already-merged updates are kept. If another writer persisted the
    /// store in the meantime, the store is reloaded, this cycle's hub ids
    /// are re-assigned, the pull is run again and the store persisted once
    /// more.
    pub fn sync_cycle(&mut self) -> SyncCycleResult {
        let start = Instant::now();
        let mut result = SyncCycleResult::default();
        let mut first_error: Option<String> = None;

        self.state = SyncState::Pushing;
        let pending = self.store.local_only_ids();
        result.push_ok = self.push_phase(&mut result, &mut first_error);
        let assigned: Vec<(LocalId, HubId)> = pending
            .iter()
            .filter_map(|id| self.store.by_local_id(id))
            .filter_map(|s| s.hub_id().map(|h| (s.local_id(), h.clone())))
            .collect();

        self.state = SyncState::Pulling;
        result.pull_ok = match self.pull_phase(&mut result) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, kind = ?e.kind(), "pull failed");
                first_error.get_or_insert_with(|| e.to_string());
                false
            }
        };

        self.state = SyncState::Persisting;
        result.persist_ok = match self.store.persist() {
            Ok(()) => true,
            Err(CoreError::RevisionConflict { expected, found }) => {
                tracing::warn!(expected, found, "snapshot index moved on disk, reloading");
                self.merge_after_reload(&assigned, &mut result, &mut first_error)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to persist snapshot store after sync");
                first_error.get_or_insert_with(|| e.to_string());
                false
            }
        };

        result.duration = start.elapsed();
        let success = result.success();
        self.state = if success {
            SyncState::Synced
        } else {
            SyncState::Error
        };

        let stats = &mut self.stats;
        stats.cycles_completed += 1;
        stats.snapshots_published += result.published as u64;
        stats.snapshots_added += result.added as u64;
        stats.snapshots_updated += result.updated as u64;
        stats.snapshots_removed += result.removed as u64;
        stats.last_sync_time = Some(Instant::now());
        if success {
            stats.last_error = None;
        } else {
            stats.cycles_failed += 1;
            stats.last_error = first_error;
        }

        tracing::info!(
            published = result.published,
            added = result.added,
            updated = result.updated,
            removed = result.removed,
            success,
            duration_ms = result.duration.as_millis() as u64,
            "sync cycle finished"
        );
        result
    }

    /// Publishes every local-only snapshot.
    ///
    /// Best effort: a failed publish is logged and the rest still run.
    /// Returns true if there was nothing to publish or every publish
    /// succeeded.
    pub fn push_local_changes(&mut self) -> bool {
        let mut scratch = SyncCycleResult::default();
        self.push_phase(&mut scratch, &mut None)
    }

    /// Lists the hub catalog and merges it into the local store.
    ///
    /// Returns false (leaving the store untouched) if the listing fails or
    /// any record is invalid, and false if the remove phase aborts.
    pub fn pull_remote_changes(&mut self) -> bool {
        let mut scratch = SyncCycleResult::default();
        match self.pull_phase(&mut scratch) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, kind = ?e.kind(), "pull failed");
                false
            }
        }
    }

    /// Fetches every hub record and converts it into a snapshot.
    ///
    /// # Errors
    ///
    /// Fails as a whole if the listing fails or any single record does not
    /// validate.
    pub fn fetch_remote(&self) -> SyncResult<Vec<Snapshot>> {
        let records = self.client.list()?;
        tracing::debug!(records = records.len(), "fetched hub catalog");

        records
            .iter()
            .map(|record| {
                Snapshot::from_remote_record(record)
                    .map_err(|e| SyncError::Validation(e.to_string()))
            })
            .collect()
    }

    /// Refreshes matched snapshots from `remote` and adds unmatched ones.
    ///
    /// Matching is by hub id. Matched snapshots keep their local id and
    /// payload. Returns `(added, updated)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store refuses an added snapshot.
    pub fn apply_remote_changes_to_local(
        &mut self,
        remote: &[Snapshot],
    ) -> SyncResult<(usize, usize)> {
        let mut added = 0;
        let mut updated = 0;

        for incoming in remote {
            let Some(hub_id) = incoming.hub_id() else {
                continue;
            };

            let matched = self.store.by_hub_id(hub_id).map(Snapshot::local_id);
            match matched.and_then(|local_id| self.store.get_mut(&local_id)) {
                Some(local) => {
                    if local.differs_in_metadata(incoming) {
                        local.refresh_from(incoming);
                        tracing::debug!(%hub_id, local_id = %local.local_id(), "refreshed snapshot from hub");
                        updated += 1;
                    }
                }
                None => {
                    self.store.add(incoming.clone())?;
                    tracing::debug!(%hub_id, local_id = %incoming.local_id(), "added snapshot from hub");
                    added += 1;
                }
            }
        }

        Ok((added, updated))
    }

    /// Stages every published local snapshot whose hub id is not in
    /// `remote`. Returns the number staged.
    ///
    /// # Errors
    ///
    /// A local-only snapshot at this point means a publish failed. With
    /// `abort_remove_on_unpublished` set this is a consistency error and
    /// nothing is staged; otherwise the snapshot is skipped.
    pub fn remove_remotely_deleted_from_local(&mut self, remote: &[Snapshot]) -> SyncResult<usize> {
        let unpublished = self.store.local_only_ids();
        if let Some(local_id) = unpublished.first() {
            if self.config.abort_remove_on_unpublished {
                tracing::error!(%local_id, "unpublished snapshot found while removing, aborting");
                return Err(SyncError::Consistency(format!(
                    "snapshot {} has no hub id during remove phase",
                    local_id
                )));
            }
            for local_id in &unpublished {
                tracing::warn!(%local_id, "unpublished snapshot found while removing, skipping");
            }
        }

        let known: BTreeSet<&HubId> = remote.iter().filter_map(Snapshot::hub_id).collect();
        let gone: Vec<(LocalId, HubId)> = self
            .store
            .iter()
            .filter_map(|s| s.hub_id().map(|h| (s.local_id(), h)))
            .filter(|(_, hub_id)| !known.contains(hub_id))
            .map(|(local_id, hub_id)| (local_id, hub_id.clone()))
            .collect();

        for (local_id, hub_id) in &gone {
            self.store.remove(local_id);
            tracing::info!(%local_id, %hub_id, "snapshot no longer on hub, removing");
        }

        Ok(gone.len())
    }

    /// Captures the current settings into a new local-only snapshot and
    /// persists the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the capture or the persist fails.
    pub fn create_from_current_state(
        &mut self,
        registry: &SettingsRegistry,
        name: &str,
        description: &str,
    ) -> SyncResult<LocalId> {
        let snapshot = Snapshot::capture(registry, name, description)?;
        let local_id = snapshot.local_id();
        self.store.add(snapshot.clone())?;
        self.persist_or_replay(move |store| store.add(snapshot))?;

        tracing::info!(%local_id, name, "created snapshot from current state");
        Ok(local_id)
    }

    /// Removes a snapshot locally, and from the hub if it was published.
    ///
    /// # Errors
    ///
    /// - [`SyncError::NotRemovable`] if the hub does not allow it
    /// - a transport error if the hub refuses the removal (nothing is
    ///   removed locally then)
    /// - [`CoreError::SnapshotNotFound`] for an unknown id
    pub fn remove_snapshot(&mut self, local_id: &LocalId) -> SyncResult<Snapshot> {
        let snapshot = self
            .store
            .by_local_id(local_id)
            .ok_or(CoreError::SnapshotNotFound(*local_id))?;

        if let Some(hub_id) = snapshot.hub_id() {
            if !snapshot.removable() {
                return Err(SyncError::NotRemovable {
                    hub_id: hub_id.clone(),
                });
            }
            match self.client.remove(hub_id) {
                Ok(()) => tracing::debug!(%local_id, %hub_id, "removed snapshot from hub"),
                Err(SyncError::UnknownHubId { .. }) => {
                    tracing::debug!(%local_id, %hub_id, "snapshot already gone from hub");
                }
                Err(e) => return Err(e),
            }
        }

        let removed = self
            .store
            .remove(local_id)
            .ok_or(CoreError::SnapshotNotFound(*local_id))?;
        let id = *local_id;
        self.persist_or_replay(move |store| {
            store.remove(&id);
            Ok(())
        })?;

        tracing::info!(%local_id, name = removed.name(), "removed snapshot");
        Ok(removed)
    }

    /// Changes a snapshot's name and description and persists the store.
    ///
    /// Published snapshots keep the hub as the authority for metadata, so
    /// the next pull overwrites a local rename with the hub's values.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotEditable`] for a published snapshot the hub
    /// marks read-only, or an error if the new name is blank.
    pub fn rename_snapshot(
        &mut self,
        local_id: &LocalId,
        name: &str,
        description: &str,
    ) -> SyncResult<()> {
        let snapshot = self
            .store
            .get_mut(local_id)
            .ok_or(CoreError::SnapshotNotFound(*local_id))?;

        if !snapshot.is_local_only() && !snapshot.editable() {
            return Err(SyncError::NotEditable {
                local_id: *local_id,
            });
        }

        snapshot.set_name(name)?;
        snapshot.set_description(description);
        let id = *local_id;
        self.persist_or_replay(move |store| {
            if let Some(snapshot) = store.get_mut(&id) {
                snapshot.set_name(name)?;
                snapshot.set_description(description);
            }
            Ok(())
        })?;

        tracing::info!(%local_id, name, "renamed snapshot");
        Ok(())
    }

    /// Applies a snapshot's payload to the registered settings sections.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown id, an undecodable payload, or a
    /// section that rejects its state.
    pub fn apply_snapshot(
        &self,
        local_id: &LocalId,
        registry: &mut SettingsRegistry,
    ) -> SyncResult<ApplyReport> {
        let snapshot = self
            .store
            .by_local_id(local_id)
            .ok_or(CoreError::SnapshotNotFound(*local_id))?;

        let report = registry.apply(snapshot.payload())?;
        tracing::info!(
            %local_id,
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            "applied snapshot"
        );
        Ok(report)
    }

    /// Returns all snapshots, most recent first.
    pub fn list_sorted(&self) -> Vec<&Snapshot> {
        self.store.sorted()
    }

    fn push_phase(
        &mut self,
        result: &mut SyncCycleResult,
        first_error: &mut Option<String>,
    ) -> bool {
        let pending = self.store.local_only_ids();
        if pending.is_empty() {
            return true;
        }

        let mut failed = 0usize;
        for local_id in pending {
            let Some(request) = self.store.by_local_id(&local_id).map(Snapshot::publish_request)
            else {
                continue;
            };

            let outcome = self
                .client
                .publish(&request)
                .and_then(|hub_id| {
                    self.store.assign_hub_id(&local_id, hub_id.clone())?;
                    Ok(hub_id)
                });

            match outcome {
                Ok(hub_id) => {
                    tracing::info!(%local_id, %hub_id, "published snapshot");
                    result.published += 1;
                }
                Err(e) => {
                    tracing::warn!(%local_id, error = %e, "failed to publish snapshot");
                    first_error.get_or_insert_with(|| e.to_string());
                    failed += 1;
                }
            }
        }

        failed == 0
    }

    /// Persists the store. On a revision conflict the store is reloaded,
    /// `replay` re-applies the caller's change and the persist is retried
    /// once.
    fn persist_or_replay<F>(&mut self, replay: F) -> SyncResult<()>
    where
        F: FnOnce(&mut SnapshotStore<S>) -> CoreResult<()>,
    {
        match self.store.persist() {
            Err(CoreError::RevisionConflict { expected, found }) => {
                tracing::warn!(expected, found, "snapshot index moved on disk, reloading");
                self.store.load()?;
                replay(&mut self.store)?;
                self.store.persist()?;
                Ok(())
            }
            other => Ok(other?),
        }
    }

    fn merge_after_reload(
        &mut self,
        assigned: &[(LocalId, HubId)],
        result: &mut SyncCycleResult,
        first_error: &mut Option<String>,
    ) -> bool {
        if let Err(e) = self.store.load() {
            tracing::error!(error = %e, "failed to reload snapshot store");
            first_error.get_or_insert_with(|| e.to_string());
            return false;
        }

        for (local_id, hub_id) in assigned {
            let still_local = self
                .store
                .by_local_id(local_id)
                .is_some_and(Snapshot::is_local_only);
            if !still_local {
                continue;
            }
            if let Err(e) = self.store.assign_hub_id(local_id, hub_id.clone()) {
                tracing::warn!(%local_id, %hub_id, error = %e, "failed to re-assign hub id");
            }
        }

        let mut again = SyncCycleResult::default();
        result.pull_ok = match self.pull_phase(&mut again) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, kind = ?e.kind(), "pull after reload failed");
                first_error.get_or_insert_with(|| e.to_string());
                false
            }
        };
        result.added = again.added;
        result.updated = again.updated;
        result.removed = again.removed;

        match self.store.persist() {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "failed to persist reloaded snapshot store");
                first_error.get_or_insert_with(|| e.to_string());
                false
            }
        }
    }

    fn pull_phase(&mut self, result: &mut SyncCycleResult) -> SyncResult<()> {
        let remote = self.fetch_remote()?;

        let (added, updated) = self.apply_remote_changes_to_local(&remote)?;
        result.added = added;
        result.updated = updated;

        result.removed = self.remove_remotely_deleted_from_local(&remote)?;
        Ok(())
    }
}

impl<C: HubClient, S: KeyValueStore> std::fmt::Debug for SyncOrchestrator<C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("store", &self.store)
            .finish()
    }
}
