//! Routing table: the set of per-node registries in the cluster.
//!
//! Each [`RoutingNode`] sits behind its own `RwLock`, so an allocation pass
//! writing one node never blocks deciders reading another. The outer lock
//! only guards node membership (join / leave).

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use crate::error::{RoutingError, RoutingResult};
use crate::node::RoutingNode;
use crate::types::NodeId;

/// Shared handle to one node's registry.
pub type SharedRoutingNode = Arc<RwLock<RoutingNode>>;

/// Node id → per-node registry.
#[derive(Debug, Default)]
pub struct RoutingTable {
    nodes: RwLock<HashMap<NodeId, SharedRoutingNode>>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node that joined the cluster, possibly pre-seeded.
    pub fn join(&self, node: RoutingNode) -> RoutingResult<SharedRoutingNode> {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        if nodes.contains_key(node.node_id()) {
            return Err(RoutingError::DuplicateNode(node.node_id().to_string()));
        }
        info!(node = %node.node_id(), shards = node.size(), "node joined routing table");
        let id = node.node_id().to_string();
        let shared = Arc::new(RwLock::new(node));
        nodes.insert(id, shared.clone());
        Ok(shared)
    }

    /// Drop a node that left the cluster, returning its last registry.
    pub fn leave(&self, node_id: &str) -> RoutingResult<SharedRoutingNode> {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        let removed = nodes
            .remove(node_id)
            .ok_or_else(|| RoutingError::NodeNotFound(node_id.to_string()))?;
        info!(node = node_id, "node left routing table");
        Ok(removed)
    }

    pub fn node(&self, node_id: &str) -> Option<SharedRoutingNode> {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        nodes.get(node_id).cloned()
    }

    /// Registered node ids, sorted.
    pub fn node_ids(&self) -> Vec<NodeId> {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<NodeId> = nodes.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` against a read view of one node.
    pub fn read_node<R>(&self, node_id: &str, f: impl FnOnce(&RoutingNode) -> R) -> RoutingResult<R> {
        let node = self
            .node(node_id)
            .ok_or_else(|| RoutingError::NodeNotFound(node_id.to_string()))?;
        let guard = node.read().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&guard))
    }

    /// Run a mutation against one node under that node's write lock.
    pub fn write_node<R>(
        &self,
        node_id: &str,
        f: impl FnOnce(&mut RoutingNode) -> RoutingResult<R>,
    ) -> RoutingResult<R> {
        let node = self
            .node(node_id)
            .ok_or_else(|| RoutingError::NodeNotFound(node_id.to_string()))?;
        let mut guard = node.write().unwrap_or_else(PoisonError::into_inner);
        debug!(node = node_id, "mutating routing node");
        f(&mut guard)
    }
}
