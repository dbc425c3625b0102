//! Lifecycle contract shared by every metric kind.

use adapters::NodeAdapter;

use super::models::MetricKind;
use crate::errors::MetricResult;
use crate::publisher::{MetricPublisher, PublishError};

/// Where a metric is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricPhase {
    Uninitialized,
    Active,
    /// Terminal.
    Closed,
}

/// A metric collected from the node and driven by the scheduler.
#[async_trait::async_trait]
pub trait Metric: Send + Sync {
    fn kind(&self) -> MetricKind;

    fn phase(&self) -> MetricPhase;

    /// Fills identity and environment from the node and records the first
    /// snapshot.
    async fn on_init(&mut self, node: &dyn NodeAdapter) -> MetricResult<()>;

    /// Records a fresh snapshot.
    async fn update(&mut self, node: &dyn NodeAdapter) -> MetricResult<()>;

    /// Records the closing snapshot without querying the node.
    async fn on_close(&mut self) -> MetricResult<()>;

    /// Writes the current document to storage.
    async fn make_persistent(&self) -> MetricResult<()>;

    fn to_json(&self) -> MetricResult<String>;

    /// Registers the node and its document on the metrics server.
    async fn init_on_repo(
        &self,
        publisher: &dyn MetricPublisher,
        node: &dyn NodeAdapter,
    ) -> Result<(), PublishError>;

    /// Uploads the current document to the metrics server.
    async fn upload_on_repo(
        &self,
        publisher: &dyn MetricPublisher,
        node: &dyn NodeAdapter,
    ) -> Result<(), PublishError>;
}
