//! An in-memory store.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::storage::{AsyncReadableStorageTraits, Bytes, MaybeBytes, StorageError, StoreKey};

/// An in-memory store.
///
/// Keys can be populated with [`set`](MemoryStore::set), which makes this store the
/// natural home for fixture datasets in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data_map: RwLock<BTreeMap<StoreKey, Bytes>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing any existing value.
    pub fn set(&self, key: &StoreKey, value: impl Into<Bytes>) {
        let mut data_map = self.data_map.write();
        data_map.insert(key.clone(), value.into());
    }

    /// Remove `key` from the store.
    pub fn erase(&self, key: &StoreKey) {
        let mut data_map = self.data_map.write();
        data_map.remove(key);
    }
}

#[async_trait::async_trait]
impl AsyncReadableStorageTraits for MemoryStore {
    async fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        let data_map = self.data_map.read();
        Ok(data_map.get(key).cloned())
    }
}
