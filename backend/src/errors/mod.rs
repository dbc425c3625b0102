//! Global application error types and handlers.
//!
//! This module defines the error type shared by the metric services. Gateway
//! failures (storage, node queries, serialization) are wrapped so that a
//! lifecycle step can propagate any of them with `?`.

use adapters::AdapterError;

use crate::database::StorageError;
use crate::services::models::MetricKind;

pub type MetricResult<T> = Result<T, MetricError>;

#[derive(Debug, thiserror::Error)]
pub enum MetricError {
    #[error("node query failed: {0}")]
    Node(#[from] AdapterError),

    #[error("forward status {0} unexpected")]
    UnexpectedStatus(String),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("unknown metric: {0}")]
    UnknownMetric(String),

    #[error("metric {0} already registered")]
    AlreadyRegistered(MetricKind),

    #[error("metric {0} is closed")]
    Closed(MetricKind),
}
