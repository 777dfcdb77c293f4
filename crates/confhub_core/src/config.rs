//! Snapshot store configuration.

use crate::id::LocalId;

/// Configuration for a [`crate::SnapshotStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Prefix for every storage key the store writes.
    pub namespace: String,
    /// Whether `persist` refuses to overwrite an index another writer
    /// persisted after this store loaded.
    pub check_revision: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: "confhub".into(),
            check_revision: true,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the key namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets whether index revisions are checked on persist.
    #[must_use]
    pub fn with_check_revision(mut self, check: bool) -> Self {
        self.check_revision = check;
        self
    }

    /// Key of the index record.
    #[must_use]
    pub fn index_key(&self) -> String {
        format!("{}.index", self.namespace)
    }

    /// Key of one snapshot record.
    #[must_use]
    pub fn snapshot_key(&self, id: &LocalId) -> String {
        format!("{}.snapshot.{}", self.namespace, id)
    }
}
