//! In-memory key/value store for testing.

use crate::backend::{validate_key, KeyValueStore};
use crate::error::StorageResult;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An in-memory key/value store.
///
/// This store keeps all values in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral installations that don't need persistence
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use confhub_storage::{KeyValueStore, InMemoryStore};
///
/// let store = InMemoryStore::new();
/// store.set("a", b"1").unwrap();
/// assert!(store.delete("a").unwrap());
/// assert_eq!(store.get("a").unwrap(), None);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory store with pre-existing entries.
    ///
    /// Useful for testing load and recovery scenarios.
    #[must_use]
    pub fn with_data(data: BTreeMap<String, Vec<u8>>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Returns a copy of all entries in the store.
    #[must_use]
    pub fn data(&self) -> BTreeMap<String, Vec<u8>> {
        self.data.read().clone()
    }

    /// Returns the number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Clears all entries from the store.
    pub fn clear(&self) {
        self.data.write().clear();
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        Ok(self.data.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        validate_key(key)?;
        self.data.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        Ok(self.data.write().remove(key).is_some())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.data.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;

    #[test]
    fn memory_new_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.is_empty());
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn memory_set_and_get() {
        let store = InMemoryStore::new();
        store.set("alpha", b"one").unwrap();
        store.set("beta", b"two").unwrap();

        assert_eq!(store.get("alpha").unwrap(), Some(b"one".to_vec()));
        assert_eq!(store.get("beta").unwrap(), Some(b"two".to_vec()));
        assert_eq!(store.get("gamma").unwrap(), None);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn memory_set_overwrites() {
        let store = InMemoryStore::new();
        store.set("alpha", b"one").unwrap();
        store.set("alpha", b"uno").unwrap();

        assert_eq!(store.get("alpha").unwrap(), Some(b"uno".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn memory_delete_reports_presence() {
        let store = InMemoryStore::new();
        store.set("alpha", b"one").unwrap();

        assert!(store.delete("alpha").unwrap());
        assert!(!store.delete("alpha").unwrap());
        assert_eq!(store.get("alpha").unwrap(), None);
    }

    #[test]
    fn memory_keys_are_sorted() {
        let store = InMemoryStore::new();
        store.set("c", b"").unwrap();
        store.set("a", b"").unwrap();
        store.set("b", b"").unwrap();

        assert_eq!(store.keys().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn memory_rejects_invalid_key() {
        let store = InMemoryStore::new();
        let result = store.set("bad key", b"x");
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[test]
    fn memory_with_data() {
        let mut data = BTreeMap::new();
        data.insert("preloaded".to_string(), b"value".to_vec());
        let store = InMemoryStore::with_data(data);

        assert_eq!(store.get("preloaded").unwrap(), Some(b"value".to_vec()));
    }

    #[test]
    fn memory_clear() {
        let store = InMemoryStore::new();
        store.set("alpha", b"one").unwrap();
        store.clear();
        assert!(store.is_empty());
    }
}
