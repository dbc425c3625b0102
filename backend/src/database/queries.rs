//! In-memory implementation of the storage gateway.
//!
//! Keeps every stored document in insertion order, which makes it suitable
//! both as a non-durable store and as a test double (writes can be made to
//! fail on demand).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::{SnapshotStore, StorageError, StoredSnapshot};

#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<Vec<StoredSnapshot>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with one previously persisted document.
    pub fn with_document(timestamp: i64, document: impl Into<String>) -> Self {
        let store = Self::new();
        store.rows().push(StoredSnapshot {
            timestamp,
            document: document.into(),
        });
        store
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    pub fn latest(&self) -> Option<StoredSnapshot> {
        self.rows().last().cloned()
    }

    fn rows(&self) -> std::sync::MutexGuard<'_, Vec<StoredSnapshot>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl SnapshotStore for MemoryStore {
    async fn store(&self, timestamp: i64, document: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Write("memory store refused the write".into()));
        }
        self.rows().push(StoredSnapshot {
            timestamp,
            document: document.to_string(),
        });
        Ok(())
    }

    async fn load_latest(&self) -> Result<Option<String>, StorageError> {
        Ok(self.latest().map(|row| row.document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_and_load_latest() {
        let store = MemoryStore::new();
        assert!(store.load_latest().await.unwrap().is_none());

        store.store(10, "{\"a\":1}").await.unwrap();
        store.store(20, "{\"a\":2}").await.unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.load_latest().await.unwrap().as_deref(), Some("{\"a\":2}"));
    }

    #[tokio::test]
    async fn failing_writes_keep_rows_untouched() {
        let store = MemoryStore::with_document(1, "{}");
        store.set_fail_writes(true);

        let err = store.store(2, "{}").await.unwrap_err();
        assert!(matches!(err, StorageError::Write(_)));
        assert_eq!(store.len(), 1);
    }
}
