//! Scripted in-memory node used to exercise consumers of [`NodeAdapter`].
//!
//! Enabled for this crate's tests and, through the `mock` feature, for the
//! tests of downstream crates.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::errors::AdapterError;
use crate::models::*;
use crate::NodeAdapter;

/// Public key of the secp256k1 generator point, a valid node id for fixtures.
pub const MOCK_NODE_ID: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

#[derive(Default)]
struct MockState {
    identity: Option<NodeIdentity>,
    channels: Vec<ChannelDescriptor>,
    forwards: Vec<ForwardRecord>,
    peers: HashMap<String, PeerInfo>,
    offline: HashSet<String>,
    unreachable: bool,
    fail_signing: bool,
    calls: HashMap<&'static str, usize>,
}

/// Fake node answering from scripted state and counting calls.
#[derive(Clone, Default)]
pub struct MockNode {
    state: Arc<Mutex<MockState>>,
}

impl MockNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// A node that answers `get_info` with [`MockNode::sample_identity`].
    pub fn with_sample_identity() -> Self {
        let node = Self::new();
        node.set_identity(Self::sample_identity());
        node
    }

    pub fn sample_identity() -> NodeIdentity {
        NodeIdentity {
            id: NodeId::parse(MOCK_NODE_ID).expect("generator point is a valid key"),
            alias: "alice".to_string(),
            color: "02bf81".to_string(),
            network: "regtest".to_string(),
            implementation: "c-lightning".to_string(),
            version: "v0.10.2".to_string(),
            addresses: vec![NodeAddress {
                address_type: "ipv4".to_string(),
                host: "127.0.0.1".to_string(),
                port: 9735,
            }],
        }
    }

    /// Channel in normal operation with a connected peer.
    pub fn channel(peer_id: &str, short_channel_id: &str) -> ChannelDescriptor {
        ChannelDescriptor {
            peer_id: peer_id.to_string(),
            short_channel_id: short_channel_id.to_string(),
            state: "CHANNELD_NORMAL".to_string(),
            capacity: 1_000_000,
            connected: true,
            public: true,
            last_update: 0,
            direction: ChannelDirection::Unknown,
        }
    }

    pub fn forward(in_channel: &str, out_channel: &str, status: &str) -> ForwardRecord {
        ForwardRecord {
            in_channel: in_channel.to_string(),
            out_channel: Some(out_channel.to_string()),
            status: status.to_string(),
            fail_reason: None,
            fail_code: None,
        }
    }

    pub fn set_identity(&self, identity: NodeIdentity) {
        self.state.lock().unwrap().identity = Some(identity);
    }

    pub fn set_channels(&self, channels: Vec<ChannelDescriptor>) {
        self.state.lock().unwrap().channels = channels;
    }

    pub fn set_forwards(&self, forwards: Vec<ForwardRecord>) {
        self.state.lock().unwrap().forwards = forwards;
    }

    pub fn add_peer(&self, peer_id: &str, alias: &str, color: &str) {
        self.state.lock().unwrap().peers.insert(
            peer_id.to_string(),
            PeerInfo {
                alias: alias.to_string(),
                color: color.to_string(),
            },
        );
    }

    pub fn remove_peer(&self, peer_id: &str) {
        self.state.lock().unwrap().peers.remove(peer_id);
    }

    /// Makes liveness probes towards the peer fail.
    pub fn set_offline(&self, peer_id: &str, offline: bool) {
        let mut state = self.state.lock().unwrap();
        if offline {
            state.offline.insert(peer_id.to_string());
        } else {
            state.offline.remove(peer_id);
        }
    }

    /// Makes every query fail as if the RPC socket were gone.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unwrap().unreachable = unreachable;
    }

    pub fn set_fail_signing(&self, fail: bool) {
        self.state.lock().unwrap().fail_signing = fail;
    }

    /// How many times the named trait method has been called.
    pub fn calls(&self, method: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(method)
            .copied()
            .unwrap_or(0)
    }

    fn enter(&self, method: &'static str) -> std::sync::MutexGuard<'_, MockState> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(method).or_default() += 1;
        state
    }
}

#[async_trait::async_trait]
impl NodeAdapter for MockNode {
    async fn get_info(&self) -> Result<NodeIdentity, AdapterError> {
        let state = self.enter("get_info");
        if state.unreachable {
            return Err(AdapterError::ConnectionError("mock: node unreachable".into()));
        }
        state
            .identity
            .clone()
            .ok_or_else(|| AdapterError::GetInfoError("mock: no identity scripted".into()))
    }

    async fn list_channels(&self) -> Result<Vec<ChannelDescriptor>, AdapterError> {
        let state = self.enter("list_channels");
        if state.unreachable {
            return Err(AdapterError::ConnectionError("mock: node unreachable".into()));
        }
        Ok(state.channels.clone())
    }

    async fn list_forwards(&self) -> Result<Vec<ForwardRecord>, AdapterError> {
        let state = self.enter("list_forwards");
        if state.unreachable {
            return Err(AdapterError::ConnectionError("mock: node unreachable".into()));
        }
        Ok(state.forwards.clone())
    }

    async fn lookup_peer(&self, peer_id: &str) -> Result<PeerInfo, AdapterError> {
        let state = self.enter("lookup_peer");
        match state.peers.get(peer_id) {
            Some(info) if !state.unreachable => Ok(info.clone()),
            _ => {
                log::debug!("mock: peer {} not in gossip map", peer_id);
                Err(AdapterError::PeerNotFound(peer_id.to_string()))
            }
        }
    }

    async fn probe_liveness(&self, peer_id: &str) -> bool {
        let state = self.enter("probe_liveness");
        !state.unreachable && !state.offline.contains(peer_id)
    }

    async fn sign_message(&self, payload: &str) -> Result<String, AdapterError> {
        let state = self.enter("sign_message");
        if state.unreachable || state.fail_signing {
            return Err(AdapterError::SignError("mock: signing refused".into()));
        }
        Ok(format!("mock-sig-{}", hex::encode(payload.len().to_be_bytes())))
    }
}
