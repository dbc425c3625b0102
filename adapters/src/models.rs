//! Generic data models for the `adapters` crate.
//!
//! These models define common, abstracted representations of Lightning Network
//! entities (node identity, funded channels, forwarded payments, gossip peers)
//! that any adapter implementation returns, allowing the backend services to
//! interact with a consistent data format.

use std::fmt;
use std::str::FromStr;

use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};

use crate::errors::AdapterError;

/// State reported for a channel whose closing transaction is already on chain.
///
/// Such channels stay in the funds listing for a while after closing but are
/// no longer logical channels.
pub const ONCHAIN_STATE: &str = "ONCHAIN";

/// Public key of a Lightning node, kept in its hex encoded form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Parses a hex encoded compressed secp256k1 public key.
    pub fn parse(id: &str) -> Result<Self, AdapterError> {
        let pubkey = hex::decode(id)
            .map_err(|err| err.to_string())
            .and_then(|bytes| PublicKey::from_slice(&bytes).map_err(|err| err.to_string()))
            .map_err(|reason| {
                log::warn!("rejecting node id {}: {}", id, reason);
                AdapterError::InvalidNodeId {
                    id: id.to_string(),
                    reason,
                }
            })?;
        Ok(Self(hex::encode(pubkey.serialize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for NodeId {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Address where the node can be reached by other nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAddress {
    #[serde(rename = "type")]
    pub address_type: String,
    pub host: String,
    pub port: u16,
}

/// Identity and software information of the local node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    pub id: NodeId,
    pub alias: String,
    pub color: String,
    pub network: String,
    pub implementation: String,
    pub version: String,
    pub addresses: Vec<NodeAddress>,
}

/// Alias and color announced by a peer in the gossip map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub alias: String,
    pub color: String,
}

/// Who opened the channel, seen from the local node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelDirection {
    Outcoming,
    Incoming,
    Mutual,
    #[default]
    #[serde(other)]
    Unknown,
}

/// A funded channel as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    pub peer_id: String,
    pub short_channel_id: String,
    pub state: String,
    #[serde(alias = "channel_sat")]
    pub capacity: u64,
    pub connected: bool,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub last_update: u64,
    #[serde(default)]
    pub direction: ChannelDirection,
}

impl ChannelDescriptor {
    pub fn is_onchain(&self) -> bool {
        self.state == ONCHAIN_STATE
    }
}

/// Outcome of a forwarded payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForwardStatus {
    Settled,
    Failed,
    LocalFailed,
}

impl FromStr for ForwardStatus {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "settled" => Ok(ForwardStatus::Settled),
            "failed" => Ok(ForwardStatus::Failed),
            "local_failed" => Ok(ForwardStatus::LocalFailed),
            other => {
                log::warn!("unexpected forward status {:?}", other);
                Err(AdapterError::UnexpectedForwardStatus(other.to_string()))
            }
        }
    }
}

/// A payment routed through the node.
///
/// The status is kept as reported so that unknown values can be surfaced
/// verbatim by the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardRecord {
    pub in_channel: String,
    #[serde(default)]
    pub out_channel: Option<String>,
    pub status: String,
    #[serde(default, alias = "failreason")]
    pub fail_reason: Option<String>,
    #[serde(default, alias = "failcode")]
    pub fail_code: Option<u32>,
}

impl ForwardRecord {
    pub fn status(&self) -> Result<ForwardStatus, AdapterError> {
        self.status.parse()
    }
}
