//! Rows kept by the storage gateway.

/// A serialized metric document together with the timestamp it was stored at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSnapshot {
    pub timestamp: i64,
    pub document: String,
}
