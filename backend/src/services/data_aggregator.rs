//! Logic for collecting, processing, and aggregating observability data.
//!
//! A [`SnapshotBuilder`] runs one collection cycle against the node: it
//! classifies the forwards, reconciles the [`ChannelLedger`] with the live
//! channel set and summarizes the channels into a [`Snapshot`].
//!
//! Failure policy of a cycle:
//! - listing channels or forwards fails: the cycle is aborted;
//! - a forward carries an unknown status: the cycle is aborted before the
//!   ledger is touched;
//! - a peer lookup or liveness probe fails: the channel falls back to stored
//!   or unknown data and the cycle goes on.

use std::collections::HashMap;

use adapters::{ChannelDescriptor, ForwardRecord, ForwardStatus, NodeAdapter, PeerInfo};
use tracing::{debug, info};

use super::ledger::{ChannelLedger, ChannelObservation};
use super::models::{
    ChannelSummary, ChannelsSummary, PaymentDirection, PaymentInfo, PaymentsSummary, Snapshot,
    SnapshotEvent, UptimeSample,
};
use crate::errors::{MetricError, MetricResult};

/// Aggregates one snapshot from the node, memoizing peer lookups for the
/// duration of the cycle.
pub struct SnapshotBuilder<'a> {
    node: &'a dyn NodeAdapter,
    peers: HashMap<String, Option<PeerInfo>>,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(node: &'a dyn NodeAdapter) -> Self {
        Self {
            node,
            peers: HashMap::new(),
        }
    }

    /// Runs a full collection cycle, updating `ledger` in place.
    pub async fn collect(
        &mut self,
        event: SnapshotEvent,
        ledger: &mut ChannelLedger,
    ) -> MetricResult<Snapshot> {
        let channels = self.node.list_channels().await?;
        let forwards = self.node.list_forwards().await?;
        let payments = payments_summary(&forwards)?;

        self.reconcile(ledger, &channels, &forwards).await?;
        let summary = self.channels_summary(&channels).await;

        Ok(Snapshot {
            event,
            timestamp: chrono::Utc::now().timestamp(),
            channels: summary,
            forwards: payments,
        })
    }

    /// Upserts every live channel into the ledger and drops the others.
    pub async fn reconcile(
        &mut self,
        ledger: &mut ChannelLedger,
        channels: &[ChannelDescriptor],
        forwards: &[ForwardRecord],
    ) -> MetricResult<()> {
        for channel in channels {
            let timestamp = if self.node.probe_liveness(&channel.peer_id).await {
                chrono::Utc::now().timestamp()
            } else {
                debug!(peer_id = %channel.peer_id, "peer did not answer the ping");
                0
            };
            let peer = self.resolve_peer(&channel.peer_id).await;
            let attributed = attribute_forwards(&channel.short_channel_id, forwards)?;

            ledger.upsert(ChannelObservation {
                channel,
                peer,
                sample: UptimeSample {
                    timestamp,
                    status: channel.state.clone(),
                },
                forwards: attributed,
            });
        }

        let removed = ledger.retain_live(channels.iter().map(|c| c.short_channel_id.as_str()));
        if !removed.is_empty() {
            info!(channels = ?removed, "dropped closed channels from the ledger");
        }
        Ok(())
    }

    /// Summary of the logical channels whose peer could be resolved.
    pub async fn channels_summary(&mut self, channels: &[ChannelDescriptor]) -> ChannelsSummary {
        let mut summary = Vec::with_capacity(channels.len());
        for channel in channels {
            if channel.is_onchain() {
                debug!(channel_id = %channel.short_channel_id, "skipping on chain channel");
                continue;
            }
            let Some(peer) = self.resolve_peer(&channel.peer_id).await else {
                continue;
            };
            summary.push(ChannelSummary {
                node_id: channel.peer_id.clone(),
                alias: peer.alias,
                color: peer.color,
                channel_id: channel.short_channel_id.clone(),
                state: channel.state.clone(),
            });
        }

        ChannelsSummary {
            tot_channels: summary.len() as u64,
            summary,
        }
    }

    async fn resolve_peer(&mut self, peer_id: &str) -> Option<PeerInfo> {
        if let Some(cached) = self.peers.get(peer_id) {
            return cached.clone();
        }
        let resolved = match self.node.lookup_peer(peer_id).await {
            Ok(info) => Some(info),
            Err(err) => {
                // Peers offline for long enough are forgotten by the gossip map.
                info!(peer_id, error = %err, "peer lookup failed");
                None
            }
        };
        self.peers.insert(peer_id.to_string(), resolved.clone());
        resolved
    }
}

/// Counts settled and failed forwards.
pub fn payments_summary(forwards: &[ForwardRecord]) -> MetricResult<PaymentsSummary> {
    let mut summary = PaymentsSummary::default();
    for forward in forwards {
        match forward_status(forward)? {
            ForwardStatus::Settled => summary.completed += 1,
            ForwardStatus::Failed | ForwardStatus::LocalFailed => summary.failed += 1,
        }
    }
    Ok(summary)
}

/// Forwards that went through `channel_id`, tagged with their direction.
///
/// A local failure annotates the most recent attributed payment with its
/// failure reason and code.
pub fn attribute_forwards(
    channel_id: &str,
    forwards: &[ForwardRecord],
) -> MetricResult<Vec<PaymentInfo>> {
    let mut payments: Vec<PaymentInfo> = Vec::new();
    for forward in forwards {
        let direction = if forward.in_channel == channel_id {
            Some(PaymentDirection::Incoming)
        } else if forward.out_channel.as_deref() == Some(channel_id) {
            Some(PaymentDirection::Outcoming)
        } else {
            None
        };
        if let Some(direction) = direction {
            payments.push(PaymentInfo {
                direction,
                status: forward.status.clone(),
                failure_reason: None,
                failure_code: None,
            });
        }

        match forward_status(forward)? {
            ForwardStatus::Settled | ForwardStatus::Failed => {}
            ForwardStatus::LocalFailed => {
                if let Some(last) = payments.last_mut() {
                    last.failure_reason = forward.fail_reason.clone();
                    last.failure_code = forward.fail_code;
                }
            }
        }
    }
    Ok(payments)
}

fn forward_status(forward: &ForwardRecord) -> MetricResult<ForwardStatus> {
    forward
        .status()
        .map_err(|_| MetricError::UnexpectedStatus(forward.status.clone()))
}
