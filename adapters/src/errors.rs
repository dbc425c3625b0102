//! Custom error types specific to the `adapters` crate.
//!
//! This module defines errors that can occur during node connection, RPC calls,
//! or data conversions within the adapter layer, providing a unified error
//! handling mechanism for all node interactions.

/// Errors returned by a [`NodeAdapter`](crate::NodeAdapter) implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("get info failed: {0}")]
    GetInfoError(String),

    #[error("list channels failed: {0}")]
    ListChannelsError(String),

    #[error("list forwards failed: {0}")]
    ListForwardsError(String),

    #[error("peer {0} not found in the gossip map")]
    PeerNotFound(String),

    #[error("signing failed: {0}")]
    SignError(String),

    #[error("invalid node id {id}: {reason}")]
    InvalidNodeId { id: String, reason: String },

    #[error("forward status {0} unexpected")]
    UnexpectedForwardStatus(String),
}
