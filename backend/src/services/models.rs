//! Data model of the metrics: snapshots, channel records and node metadata.
//!
//! Field names follow the JSON documents exchanged with the metrics server,
//! so these types are used both in memory and on the wire.

use std::fmt;

use adapters::{ChannelDirection, NodeAddress};
use serde::{Deserialize, Serialize};
use sysinfo::System;

pub const UNKNOWN: &str = "unknown";

/// Metric kinds this reporter knows how to collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKind {
    MetricOne,
}

impl MetricKind {
    pub const ALL: [MetricKind; 1] = [MetricKind::MetricOne];

    /// Identifier used by the diagnostic command.
    pub fn id(self) -> u32 {
        match self {
            MetricKind::MetricOne => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MetricKind::MetricOne => "metric_one",
        }
    }

    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle event a snapshot was taken for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotEvent {
    OnStart,
    OnUpdate,
    OnClose,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub node_id: String,
    pub alias: String,
    pub color: String,
    pub channel_id: String,
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelsSummary {
    pub tot_channels: u64,
    pub summary: Vec<ChannelSummary>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentsSummary {
    pub completed: u64,
    pub failed: u64,
}

/// One point-in-time sample of the node health. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub event: SnapshotEvent,
    pub timestamp: i64,
    pub channels: ChannelsSummary,
    pub forwards: PaymentsSummary,
}

/// Side of the channel a forwarded payment went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentDirection {
    Incoming,
    Outcoming,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub direction: PaymentDirection,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_code: Option<u32>,
}

/// Liveness sample; a zero timestamp means the peer did not answer the ping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UptimeSample {
    pub timestamp: i64,
    pub status: String,
}

/// Everything tracked about one open channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub channel_id: String,
    pub node_id: String,
    pub node_alias: String,
    pub color: String,
    pub capacity: u64,
    #[serde(default)]
    pub forwards: Vec<PaymentInfo>,
    #[serde(default)]
    pub up_time: Vec<UptimeSample>,
    pub online: bool,
    #[serde(default)]
    pub last_update: u64,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub direction: ChannelDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsInfo {
    pub os: String,
    pub version: String,
    pub architecture: String,
}

impl OsInfo {
    /// Information about the host the reporter runs on.
    pub fn detect() -> Self {
        Self {
            os: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
            version: System::os_version().unwrap_or_else(|| UNKNOWN.to_string()),
            architecture: System::cpu_arch().unwrap_or_else(|| std::env::consts::ARCH.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub implementation: String,
    pub version: String,
}

impl Default for NodeInfo {
    fn default() -> Self {
        Self {
            implementation: UNKNOWN.to_string(),
            version: UNKNOWN.to_string(),
        }
    }
}

/// Who the node is on the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub node_id: String,
    pub alias: String,
    pub color: String,
    pub network: String,
}

impl Identity {
    /// Identity known before the node answered `get_info`.
    pub fn placeholder(node_id: &str) -> Self {
        Self {
            node_id: node_id.to_string(),
            alias: UNKNOWN.to_string(),
            color: String::new(),
            network: UNKNOWN.to_string(),
        }
    }
}

/// Where and on what software the node runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub os_info: OsInfo,
    pub node_info: NodeInfo,
    pub address: Vec<NodeAddress>,
    pub timezone: String,
}

impl Environment {
    pub fn detect() -> Self {
        Self {
            os_info: OsInfo::detect(),
            node_info: NodeInfo::default(),
            address: Vec::new(),
            timezone: local_timezone(),
        }
    }
}

/// UTC offset of the host, e.g. `+02:00`.
pub fn local_timezone() -> String {
    chrono::Local::now().offset().to_string()
}
