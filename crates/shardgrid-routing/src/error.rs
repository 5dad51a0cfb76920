//! Error types for the ShardGrid routing registry.

use thiserror::Error;

use crate::types::{NodeId, ShardId, ShardRoutingState};

/// Result type alias for routing registry operations.
pub type RoutingResult<T> = Result<T, RoutingError>;

/// Consistency violations raised by [`RoutingNode`](crate::RoutingNode) and
/// [`RoutingTable`](crate::RoutingTable).
///
/// Every variant means the caller's view of the registry is stale. None of
/// them is retried internally.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("shard {shard} already exists on node [{node}]: current [{current}], new [{new}]")]
    DuplicateShard {
        node: NodeId,
        shard: ShardId,
        current: String,
        new: String,
    },

    #[error("shard {shard} is not hosted on node [{node}]")]
    ShardNotFound { node: NodeId, shard: ShardId },

    #[error("shard {shard} on node [{node}] is stale: expected [{stored}] but was [{given}]")]
    StaleShard {
        node: NodeId,
        shard: ShardId,
        stored: String,
        given: String,
    },

    #[error("shard {shard} cannot move from {from} to {to}")]
    InvalidTransition {
        shard: ShardId,
        from: ShardRoutingState,
        to: ShardRoutingState,
    },

    #[error("node already registered: {0}")]
    DuplicateNode(NodeId),

    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("invalid routing snapshot: {0}")]
    Snapshot(String),
}
