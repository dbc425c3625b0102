//! Publish gateway towards the remote metrics server.
//!
//! The authenticated transport is provided by the embedder. Publishing is
//! best-effort telemetry export: callers persist first and only log a
//! [`PublishError`].

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("server rejected the metric: {0}")]
    Rejected(String),

    #[error("payload signing failed: {0}")]
    Signing(String),

    #[error("payload encoding failed: {0}")]
    Encoding(String),
}

/// Client of the remote metrics server.
#[async_trait::async_trait]
pub trait MetricPublisher: Send + Sync {
    /// Registers the node and its first document on the server.
    async fn init_metric(
        &self,
        node_id: &str,
        payload: &str,
        signature: &str,
    ) -> Result<(), PublishError>;

    /// Uploads a newer document for an already registered node.
    async fn upload_metric(
        &self,
        node_id: &str,
        payload: &str,
        signature: &str,
    ) -> Result<(), PublishError>;
}
