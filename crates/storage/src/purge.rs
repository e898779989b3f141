//! Destructive purge collaborator.
//!
//! The purge guard never touches storage itself. It calls back into a
//! [`RecordPurger`] supplied by the storage layer once the termination secret
//! has been authenticated and the attempt has been logged.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use fail::fail_point;
use parking_lot::RwLock;

use crate::error::{StorageError, StorageResult};

/// Storage-layer hook that irreversibly deletes every sensitive record.
#[async_trait]
pub trait RecordPurger: Send + Sync {
    /// Deletes all sensitive records and returns how many were removed.
    ///
    /// Implementations should make the deletion all-or-nothing where the
    /// backend allows it. On `Err` the caller treats the purge as failed.
    async fn delete_all_sensitive_records(&self) -> StorageResult<u64>;
}

#[async_trait]
impl<P: RecordPurger + ?Sized> RecordPurger for Arc<P> {
    async fn delete_all_sensitive_records(&self) -> StorageResult<u64> {
        (**self).delete_all_sensitive_records().await
    }
}

/// In-memory store of sensitive records implementing [`RecordPurger`].
///
/// Stands in for the grade tables of the excluded storage layer in tests and
/// development. Clones share the same records.
#[derive(Clone, Debug, Default)]
pub struct MemoryRecordStore {
    records: Arc<RwLock<BTreeMap<String, Bytes>>>,
}

impl MemoryRecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites a record.
    pub fn insert(&self, id: impl Into<String>, value: impl Into<Bytes>) {
        self.records.write().insert(id.into(), value.into());
    }

    /// Returns a record by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Bytes> {
        self.records.read().get(id).cloned()
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns `true` when the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl RecordPurger for MemoryRecordStore {
    #[tracing::instrument(skip_all)]
    async fn delete_all_sensitive_records(&self) -> StorageResult<u64> {
        fail_point!("purger-before-delete", |_| {
            Err(StorageError::connection("purger-before-delete fail point"))
        });

        let mut records = self.records.write();
        let deleted = records.len() as u64;
        records.clear();
        tracing::debug!(deleted, "sensitive records cleared");
        Ok(deleted)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_purge_clears_everything() {
        let store = MemoryRecordStore::new();
        store.insert("grade:1", Bytes::from_static(b"B+"));
        store.insert("grade:2", Bytes::from_static(b"A-"));

        let deleted = store.delete_all_sensitive_records().await.unwrap();
        assert_eq!(deleted, 2);
        assert!(store.is_empty());
        assert_eq!(store.get("grade:1"), None);
    }

    #[tokio::test]
    async fn test_purge_empty_store() {
        let store = MemoryRecordStore::new();
        assert_eq!(store.delete_all_sensitive_records().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_through_shared_handle() {
        let store = MemoryRecordStore::new();
        store.insert("grade:1", Bytes::from_static(b"C"));
        let purger: Arc<dyn RecordPurger> = Arc::new(store.clone());

        purger.delete_all_sensitive_records().await.unwrap();
        assert_eq!(store.len(), 0);
    }
}
