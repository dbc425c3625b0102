#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use adapters::mock::MockNode;
use adapters::{AdapterError, ChannelDescriptor, ForwardRecord, NodeAdapter, NodeIdentity, PeerInfo};
use backend::publisher::{MetricPublisher, PublishError};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Node with one normal channel towards Bob and no forwards.
pub fn node_with_bob() -> MockNode {
    let node = MockNode::with_sample_identity();
    node.set_channels(vec![MockNode::channel("02bb", "100x1x0")]);
    node.add_peer("02bb", "Bob", "3399ff");
    node
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Init(String),
    Upload(String),
}

#[derive(Clone, Default)]
pub struct RecordingPublisher {
    calls: Arc<Mutex<Vec<Call>>>,
    reject: Arc<Mutex<bool>>,
}

impl RecordingPublisher {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_reject(&self, reject: bool) {
        *self.reject.lock().unwrap() = reject;
    }

    fn record(&self, call: Call) -> Result<(), PublishError> {
        if *self.reject.lock().unwrap() {
            return Err(PublishError::Rejected("signature does not match".into()));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait::async_trait]
impl MetricPublisher for RecordingPublisher {
    async fn init_metric(&self, node_id: &str, _payload: &str, _signature: &str) -> Result<(), PublishError> {
        self.record(Call::Init(node_id.to_string()))
    }

    async fn upload_metric(&self, node_id: &str, _payload: &str, _signature: &str) -> Result<(), PublishError> {
        self.record(Call::Upload(node_id.to_string()))
    }
}

/// Node whose channel listing takes `delay` to answer.
pub struct SlowNode {
    pub inner: MockNode,
    pub delay: Duration,
}

#[async_trait::async_trait]
impl NodeAdapter for SlowNode {
    async fn get_info(&self) -> Result<NodeIdentity, AdapterError> {
        self.inner.get_info().await
    }

    async fn list_channels(&self) -> Result<Vec<ChannelDescriptor>, AdapterError> {
        tokio::time::sleep(self.delay).await;
        self.inner.list_channels().await
    }

    async fn list_forwards(&self) -> Result<Vec<ForwardRecord>, AdapterError> {
        self.inner.list_forwards().await
    }

    async fn lookup_peer(&self, peer_id: &str) -> Result<PeerInfo, AdapterError> {
        self.inner.lookup_peer(peer_id).await
    }

    async fn probe_liveness(&self, peer_id: &str) -> bool {
        self.inner.probe_liveness(peer_id).await
    }

    async fn sign_message(&self, payload: &str) -> Result<String, AdapterError> {
        self.inner.sign_message(payload).await
    }
}
