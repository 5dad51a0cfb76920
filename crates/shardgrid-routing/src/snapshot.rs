//! JSON routing snapshots.
//!
//! A snapshot lists, per node, the shards hosted there in insertion order:
//!
//! ```json
//! { "nodes": { "node-1": [ { "shard_id": { "class": "logs", "ordinal": 0 },
//!                            "primary": true, "state": "started",
//!                            "current_node_id": "node-1" } ] } }
//! ```

use std::collections::BTreeMap;
use std::sync::PoisonError;

use serde::{Deserialize, Serialize};

use crate::error::{RoutingError, RoutingResult};
use crate::node::RoutingNode;
use crate::table::RoutingTable;
use crate::types::{NodeId, ShardRouting};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingSnapshot {
    #[serde(default)]
    pub nodes: BTreeMap<NodeId, Vec<ShardRouting>>,
}

impl RoutingSnapshot {
    pub fn from_json(json: &str) -> RoutingResult<Self> {
        serde_json::from_str(json).map_err(|e| RoutingError::Snapshot(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> RoutingResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| RoutingError::Snapshot(e.to_string()))
    }

    /// Capture every node of `table`.
    pub fn capture(table: &RoutingTable) -> Self {
        let mut nodes = BTreeMap::new();
        for id in table.node_ids() {
            if let Some(node) = table.node(&id) {
                let node = node.read().unwrap_or_else(PoisonError::into_inner);
                nodes.insert(id, node.copy_shards());
            }
        }
        Self { nodes }
    }

    /// Build a table, rejecting duplicate shard ids on any node.
    pub fn into_table(self) -> RoutingResult<RoutingTable> {
        let table = RoutingTable::new();
        for (id, shards) in self.nodes {
            table.join(RoutingNode::with_shards(id, shards)?)?;
        }
        Ok(table)
    }
}
