//! Core `adapters` crate for abstracting Lightning Network node interactions.
//!
//! This crate defines the `NodeAdapter` trait, which outlines the queries the
//! metric collector issues against a running node (funded channels, forwards,
//! gossip lookups, liveness pings, identity and message signing), together
//! with the generic models those queries return.

pub mod errors;
pub mod models;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use errors::AdapterError;
pub use models::*;

/// Queries the metric collector needs from a Lightning node.
///
/// Every call may fail independently; callers decide which failures are
/// tolerable for the cycle they are running.
#[async_trait::async_trait]
pub trait NodeAdapter: Send + Sync {
    /// Identity, network and software version of the local node.
    async fn get_info(&self) -> Result<NodeIdentity, AdapterError>;

    /// Funded channels of the local node, including those already on chain.
    async fn list_channels(&self) -> Result<Vec<ChannelDescriptor>, AdapterError>;

    /// Every forward the node has attempted, oldest first.
    async fn list_forwards(&self) -> Result<Vec<ForwardRecord>, AdapterError>;

    /// Alias and color of a peer as known by the gossip map.
    async fn lookup_peer(&self, peer_id: &str) -> Result<PeerInfo, AdapterError>;

    /// Pings the peer; `false` when it does not answer.
    async fn probe_liveness(&self, peer_id: &str) -> bool;

    /// Signs the payload with the node key, returning the encoded signature.
    async fn sign_message(&self, payload: &str) -> Result<String, AdapterError>;
}
