//! Storage gateway for metric documents.
//!
//! The durable writer itself lives outside this crate; this module defines the
//! contract the metric services persist through and an in-memory store used
//! by tests and by embedders that do not need durability.

pub mod models;
pub mod queries;

pub use models::StoredSnapshot;
pub use queries::MemoryStore;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("write failed: {0}")]
    Write(String),

    #[error("read failed: {0}")]
    Read(String),
}

/// Durable sink for serialized metric documents.
#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Stores the document under the timestamp of its latest snapshot.
    async fn store(&self, timestamp: i64, document: &str) -> Result<(), StorageError>;

    /// The most recently stored document, if any.
    async fn load_latest(&self) -> Result<Option<String>, StorageError>;
}
