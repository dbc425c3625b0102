//! Per-channel working state, reconciled against the live channel set on
//! every collection cycle.
//!
//! Records are keyed by short channel id. Forward history and uptime samples
//! only grow while a channel is open; a channel that disappears from the live
//! set is dropped together with its whole history.

use std::collections::{HashMap, HashSet};

use adapters::{ChannelDescriptor, PeerInfo};

use super::models::{ChannelRecord, PaymentInfo, UptimeSample, UNKNOWN};

/// What a cycle learned about one live channel.
#[derive(Debug, Clone)]
pub struct ChannelObservation<'a> {
    pub channel: &'a ChannelDescriptor,
    /// Gossip data for the peer, `None` when the lookup failed.
    pub peer: Option<PeerInfo>,
    pub sample: UptimeSample,
    /// Every forward attributed to the channel so far, oldest first.
    pub forwards: Vec<PaymentInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelLedger {
    records: HashMap<String, ChannelRecord>,
}

impl ChannelLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, channel_id: &str) -> Option<&ChannelRecord> {
        self.records.get(channel_id)
    }

    pub fn contains(&self, channel_id: &str) -> bool {
        self.records.contains_key(channel_id)
    }

    pub fn channel_ids(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Creates the record of a new channel or refreshes an existing one.
    pub fn upsert(&mut self, observation: ChannelObservation<'_>) {
        let ChannelObservation {
            channel,
            peer,
            sample,
            forwards,
        } = observation;

        match self.records.get_mut(&channel.short_channel_id) {
            Some(record) => {
                if let Some(peer) = peer {
                    record.node_alias = peer.alias;
                    record.color = peer.color;
                }
                record.capacity = channel.capacity;
                record.online = channel.connected;
                record.public = channel.public;
                record.last_update = channel.last_update;
                record.direction = channel.direction;
                record.up_time.push(sample);
                // Attribution covers every forward since the channel opened,
                // only the tail past what is already recorded is new. Stored
                // payments are never rewritten, so a later local failure
                // annotating one of them is dropped.
                if forwards.len() > record.forwards.len() {
                    let known = record.forwards.len();
                    record.forwards.extend(forwards.into_iter().skip(known));
                }
            }
            None => {
                let (alias, color) = match peer {
                    Some(peer) => (peer.alias, peer.color),
                    None => (UNKNOWN.to_string(), UNKNOWN.to_string()),
                };
                self.records.insert(
                    channel.short_channel_id.clone(),
                    ChannelRecord {
                        channel_id: channel.short_channel_id.clone(),
                        node_id: channel.peer_id.clone(),
                        node_alias: alias,
                        color,
                        capacity: channel.capacity,
                        forwards,
                        up_time: vec![sample],
                        online: channel.connected,
                        last_update: channel.last_update,
                        public: channel.public,
                        direction: channel.direction,
                    },
                );
            }
        }
    }

    /// Drops every record whose channel is not in `live`, returning the
    /// removed channel ids.
    pub fn retain_live<'a>(&mut self, live: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let live: HashSet<&str> = live.into_iter().collect();
        let stale: Vec<String> = self
            .records
            .keys()
            .filter(|id| !live.contains(id.as_str()))
            .cloned()
            .collect();
        for id in &stale {
            self.records.remove(id);
        }
        stale
    }

    /// Ordered sequence used by the wire document.
    pub fn to_wire(&self) -> Vec<ChannelRecord> {
        let mut records: Vec<ChannelRecord> = self.records.values().cloned().collect();
        records.sort_by(|a, b| a.channel_id.cmp(&b.channel_id));
        records
    }

    /// Rebuilds the keyed ledger from its wire sequence.
    pub fn from_wire(records: Vec<ChannelRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| (record.channel_id.clone(), record))
                .collect(),
        }
    }
}
