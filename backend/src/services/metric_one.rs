//! Metric one: channel liveness, peer identity and forwarding outcomes of the
//! node, sampled at start, periodically and at shutdown.
//!
//! [`MetricState`] is the versioned aggregate kept in memory, with the ledger
//! keyed by channel id. [`MetricDocument`] is its wire form, where the ledger
//! is an ordered array. [`MetricOne`] drives the state through its lifecycle
//! and persists it after every step.

use std::sync::Arc;

use adapters::{NodeAdapter, NodeAddress};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::data_aggregator::SnapshotBuilder;
use super::ledger::ChannelLedger;
use super::metric::{Metric, MetricPhase};
use super::migration::{self, CURRENT_VERSION};
use super::models::*;
use crate::database::SnapshotStore;
use crate::errors::{MetricError, MetricResult};
use crate::publisher::{MetricPublisher, PublishError};

/// Persisted and published form of a metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDocument {
    pub version: u64,
    pub metric_name: String,
    pub node_id: String,
    pub node_alias: String,
    pub color: String,
    pub network: String,
    pub os_info: OsInfo,
    pub node_info: NodeInfo,
    #[serde(default)]
    pub address: Vec<NodeAddress>,
    #[serde(default)]
    pub timezone: String,
    #[serde(default, alias = "up_time", deserialize_with = "null_as_empty")]
    pub history: Vec<Snapshot>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub channels_info: Vec<ChannelRecord>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricState {
    pub version: u64,
    pub kind: MetricKind,
    pub identity: Identity,
    pub environment: Environment,
    history: Vec<Snapshot>,
    ledger: ChannelLedger,
}

impl MetricState {
    pub fn new(kind: MetricKind, identity: Identity, environment: Environment) -> Self {
        Self {
            version: CURRENT_VERSION,
            kind,
            identity,
            environment,
            history: Vec::new(),
            ledger: ChannelLedger::new(),
        }
    }

    /// Snapshots in the order they were recorded.
    pub fn history(&self) -> &[Snapshot] {
        &self.history
    }

    pub fn ledger(&self) -> &ChannelLedger {
        &self.ledger
    }

    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.history.last()
    }

    /// Timestamp of the latest snapshot, 0 before the first one.
    pub fn last_check(&self) -> i64 {
        self.last_snapshot().map_or(0, |snapshot| snapshot.timestamp)
    }

    pub fn push_snapshot(&mut self, snapshot: Snapshot) {
        self.history.push(snapshot);
    }

    /// Queries the node and reconciles the ledger, returning the snapshot
    /// without recording it.
    pub async fn collect(
        &mut self,
        node: &dyn NodeAdapter,
        event: SnapshotEvent,
    ) -> MetricResult<Snapshot> {
        SnapshotBuilder::new(node).collect(event, &mut self.ledger).await
    }

    /// Sets identity and environment and records the start snapshot.
    pub fn initialize(&mut self, identity: Identity, environment: Environment, snapshot: Snapshot) {
        self.identity = identity;
        self.environment = environment;
        self.push_snapshot(snapshot);
    }

    /// Records a close snapshot carrying over the latest summaries.
    pub fn close(&mut self, timestamp: i64) -> Snapshot {
        let (channels, forwards) = match self.last_snapshot() {
            Some(last) => (last.channels.clone(), last.forwards),
            None => (ChannelsSummary::default(), PaymentsSummary::default()),
        };
        let snapshot = Snapshot {
            event: SnapshotEvent::OnClose,
            timestamp,
            channels,
            forwards,
        };
        self.history.push(snapshot.clone());
        snapshot
    }

    pub fn to_wire(&self) -> MetricDocument {
        MetricDocument {
            version: self.version,
            metric_name: self.kind.name().to_string(),
            node_id: self.identity.node_id.clone(),
            node_alias: self.identity.alias.clone(),
            color: self.identity.color.clone(),
            network: self.identity.network.clone(),
            os_info: self.environment.os_info.clone(),
            node_info: self.environment.node_info.clone(),
            address: self.environment.address.clone(),
            timezone: self.environment.timezone.clone(),
            history: self.history.clone(),
            channels_info: self.ledger.to_wire(),
        }
    }

    pub fn from_wire(document: MetricDocument) -> MetricResult<Self> {
        let kind = MetricKind::from_name(&document.metric_name)
            .ok_or_else(|| MetricError::UnknownMetric(document.metric_name.clone()))?;
        Ok(Self {
            version: document.version,
            kind,
            identity: Identity {
                node_id: document.node_id,
                alias: document.node_alias,
                color: document.color,
                network: document.network,
            },
            environment: Environment {
                os_info: document.os_info,
                node_info: document.node_info,
                address: document.address,
                timezone: document.timezone,
            },
            history: document.history,
            ledger: ChannelLedger::from_wire(document.channels_info),
        })
    }

    pub fn to_json(&self) -> MetricResult<String> {
        Ok(serde_json::to_string(&self.to_wire())?)
    }

    /// Decodes a stored document, migrating older schemas first.
    pub fn from_json(payload: &str) -> MetricResult<Self> {
        let mut document: Value = serde_json::from_str(payload)?;
        migration::migrate_value(&mut document)?;
        Self::from_wire(serde_json::from_value(document)?)
    }
}

pub struct MetricOne {
    state: MetricState,
    phase: MetricPhase,
    storage: Arc<dyn SnapshotStore>,
}

impl MetricOne {
    pub fn new(node_id: &str, environment: Environment, storage: Arc<dyn SnapshotStore>) -> Self {
        Self {
            state: MetricState::new(
                MetricKind::MetricOne,
                Identity::placeholder(node_id),
                environment,
            ),
            phase: MetricPhase::Uninitialized,
            storage,
        }
    }

    /// Resumes from the latest stored document, or starts empty when the
    /// store has none.
    pub async fn load_or_new(
        node_id: &str,
        environment: Environment,
        storage: Arc<dyn SnapshotStore>,
    ) -> MetricResult<Self> {
        let Some(payload) = storage.load_latest().await? else {
            return Ok(Self::new(node_id, environment, storage));
        };
        let mut state = MetricState::from_json(&payload)?;
        if state.kind != MetricKind::MetricOne {
            return Err(MetricError::UnknownMetric(state.kind.to_string()));
        }
        state.environment.os_info = environment.os_info;
        state.environment.timezone = environment.timezone;
        info!(
            snapshots = state.history().len(),
            channels = state.ledger().len(),
            "restored metric_one from storage"
        );
        Ok(Self {
            state,
            phase: MetricPhase::Uninitialized,
            storage,
        })
    }

    pub fn state(&self) -> &MetricState {
        &self.state
    }

    fn ensure_open(&self) -> MetricResult<()> {
        if self.phase == MetricPhase::Closed {
            return Err(MetricError::Closed(self.state.kind));
        }
        Ok(())
    }

    /// Persists the current state. On failure the state goes back to
    /// `previous`, so a step either lands in storage or leaves no trace.
    async fn commit(&mut self, previous: MetricState) -> MetricResult<()> {
        if let Err(err) = self.make_persistent().await {
            self.state = previous;
            return Err(err);
        }
        Ok(())
    }

    async fn signed_payload(&self, node: &dyn NodeAdapter) -> Result<(String, String), PublishError> {
        let payload = self
            .to_json()
            .map_err(|err| PublishError::Encoding(err.to_string()))?;
        let signature = node
            .sign_message(&payload)
            .await
            .map_err(|err| PublishError::Signing(err.to_string()))?;
        Ok((payload, signature))
    }
}

#[async_trait::async_trait]
impl Metric for MetricOne {
    fn kind(&self) -> MetricKind {
        self.state.kind
    }

    fn phase(&self) -> MetricPhase {
        self.phase
    }

    async fn on_init(&mut self, node: &dyn NodeAdapter) -> MetricResult<()> {
        self.ensure_open()?;
        let info = node.get_info().await?;
        let previous = self.state.clone();
        let snapshot = self.state.collect(node, SnapshotEvent::OnStart).await?;

        let identity = Identity {
            node_id: info.id.to_string(),
            alias: info.alias,
            color: info.color,
            network: info.network,
        };
        let environment = Environment {
            node_info: NodeInfo {
                implementation: info.implementation,
                version: info.version,
            },
            address: info.addresses,
            ..self.state.environment.clone()
        };
        self.state.initialize(identity, environment, snapshot);
        self.commit(previous).await?;
        self.phase = MetricPhase::Active;
        debug!(node_id = %self.state.identity.node_id, "metric_one initialized");
        Ok(())
    }

    async fn update(&mut self, node: &dyn NodeAdapter) -> MetricResult<()> {
        self.ensure_open()?;
        let previous = self.state.clone();
        let snapshot = self.state.collect(node, SnapshotEvent::OnUpdate).await?;
        self.state.push_snapshot(snapshot);
        self.commit(previous).await
    }

    async fn on_close(&mut self) -> MetricResult<()> {
        self.ensure_open()?;
        debug!("close event on metric_one");
        let previous = self.state.clone();
        self.state.close(chrono::Utc::now().timestamp());
        self.commit(previous).await?;
        self.phase = MetricPhase::Closed;
        Ok(())
    }

    async fn make_persistent(&self) -> MetricResult<()> {
        let json = self.to_json()?;
        self.storage.store(self.state.last_check(), &json).await?;
        Ok(())
    }

    fn to_json(&self) -> MetricResult<String> {
        self.state.to_json()
    }

    async fn init_on_repo(
        &self,
        publisher: &dyn MetricPublisher,
        node: &dyn NodeAdapter,
    ) -> Result<(), PublishError> {
        let (payload, signature) = self.signed_payload(node).await?;
        publisher
            .init_metric(&self.state.identity.node_id, &payload, &signature)
            .await?;
        info!(at = %chrono::Utc::now().to_rfc2822(), "metric_one initialized on server");
        Ok(())
    }

    async fn upload_on_repo(
        &self,
        publisher: &dyn MetricPublisher,
        node: &dyn NodeAdapter,
    ) -> Result<(), PublishError> {
        let (payload, signature) = self.signed_payload(node).await?;
        publisher
            .upload_metric(&self.state.identity.node_id, &payload, &signature)
            .await?;
        info!(at = %chrono::Utc::now().to_rfc2822(), "metric_one uploaded");
        Ok(())
    }
}
