//! Per-node shard registry.
//!
//! A [`RoutingNode`] holds every shard assigned to one node, keyed by
//! [`ShardId`] in insertion order, plus two derived indices:
//!
//! ```text
//! RoutingNode
//!   ├── shards:   ShardId → ShardRouting   (insertion ordered)
//!   ├── by_state: state   → {ShardId}
//!   └── by_class: class   → {ShardId}
//! ```
//!
//! Every shard in `shards` sits in exactly one `by_state` bucket (its state)
//! and exactly one `by_class` bucket (its class). Buckets emptied by a
//! removal are dropped. The three structures are private and only change
//! together, through [`add`](RoutingNode::add), [`update`](RoutingNode::update)
//! and [`remove`](RoutingNode::remove).

use std::collections::{HashMap, HashSet};
use std::fmt;

use indexmap::IndexMap;
use tracing::{debug, error};

use crate::error::{RoutingError, RoutingResult};
use crate::types::{ClassName, NodeId, ShardId, ShardRouting, ShardRoutingState};

/// All shards hosted on a single node.
#[derive(Debug, Clone)]
pub struct RoutingNode {
    node_id: NodeId,
    shards: IndexMap<ShardId, ShardRouting>,
    by_state: HashMap<ShardRoutingState, HashSet<ShardId>>,
    by_class: HashMap<ClassName, HashSet<ShardId>>,
}

impl RoutingNode {
    /// An empty registry for `node_id`.
    pub fn new(node_id: impl Into<NodeId>) -> Self {
        Self {
            node_id: node_id.into(),
            shards: IndexMap::new(),
            by_state: HashMap::new(),
            by_class: HashMap::new(),
        }
    }

    /// A registry pre-seeded with `shards`, in the given order.
    ///
    /// Two shards with the same id are rejected.
    pub fn with_shards(
        node_id: impl Into<NodeId>,
        shards: impl IntoIterator<Item = ShardRouting>,
    ) -> RoutingResult<Self> {
        let mut node = Self::new(node_id);
        for shard in shards {
            node.add(shard)?;
        }
        Ok(node)
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn get(&self, id: &ShardId) -> Option<&ShardRouting> {
        self.shards.get(id)
    }

    pub fn size(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Hosted shards in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ShardRouting> + '_ {
        self.shards.values()
    }

    /// Workload classes with at least one shard on this node.
    pub fn classes(&self) -> impl Iterator<Item = &str> + '_ {
        self.by_class.keys().map(String::as_str)
    }

    pub fn copy_shards(&self) -> Vec<ShardRouting> {
        self.shards.values().cloned().collect()
    }

    /// Add a new shard to this node.
    pub fn add(&mut self, shard: ShardRouting) -> RoutingResult<()> {
        if let Some(current) = self.shards.get(shard.shard_id()) {
            error!(
                node = %self.node_id,
                shard = %shard.shard_id(),
                "shard already exists on node"
            );
            return Err(RoutingError::DuplicateShard {
                node: self.node_id.clone(),
                shard: shard.shard_id().clone(),
                current: current.short_summary(),
                new: shard.short_summary(),
            });
        }
        self.index(&shard);
        self.shards.insert(shard.shard_id().clone(), shard);
        Ok(())
    }

    /// Replace `old` with `new`, re-filing both indices.
    ///
    /// If `old` is no longer the stored value (already removed, or replaced
    /// by a concurrent pass) this is a no-op and returns `Ok(false)`.
    /// Changing the shard id onto an id that is already hosted is rejected.
    pub fn update(&mut self, old: &ShardRouting, new: ShardRouting) -> RoutingResult<bool> {
        match self.shards.get(old.shard_id()) {
            Some(stored) if stored == old => {}
            _ => {
                debug!(
                    node = %self.node_id,
                    shard = %old.shard_id(),
                    "skipping update of shard that was already superseded"
                );
                return Ok(false);
            }
        }

        let id_changed = old.shard_id() != new.shard_id();
        if id_changed {
            if let Some(current) = self.shards.get(new.shard_id()) {
                error!(
                    node = %self.node_id,
                    shard = %new.shard_id(),
                    "update would overwrite a shard already on node"
                );
                return Err(RoutingError::DuplicateShard {
                    node: self.node_id.clone(),
                    shard: new.shard_id().clone(),
                    current: current.short_summary(),
                    new: new.short_summary(),
                });
            }
        }

        self.unindex(old);
        self.index(&new);
        if id_changed {
            self.shards.shift_remove(old.shard_id());
        }
        // Same key keeps its insertion position.
        self.shards.insert(new.shard_id().clone(), new);
        Ok(true)
    }

    /// Remove `shard`, which must be exactly the stored value.
    pub fn remove(&mut self, shard: &ShardRouting) -> RoutingResult<ShardRouting> {
        let err = match self.shards.get(shard.shard_id()) {
            Some(stored) if stored == shard => None,
            Some(stored) => Some(RoutingError::StaleShard {
                node: self.node_id.clone(),
                shard: shard.shard_id().clone(),
                stored: stored.short_summary(),
                given: shard.short_summary(),
            }),
            None => Some(RoutingError::ShardNotFound {
                node: self.node_id.clone(),
                shard: shard.shard_id().clone(),
            }),
        };
        if let Some(err) = err {
            error!(node = %self.node_id, error = %err, "rejected shard removal");
            return Err(err);
        }

        self.unindex(shard);
        self.shards
            .shift_remove(shard.shard_id())
            .ok_or_else(|| RoutingError::ShardNotFound {
                node: self.node_id.clone(),
                shard: shard.shard_id().clone(),
            })
    }

    /// Number of shards in any of `states`.
    pub fn count_by_states(&self, states: &[ShardRoutingState]) -> usize {
        states
            .iter()
            .filter_map(|s| self.by_state.get(s))
            .map(HashSet::len)
            .sum()
    }

    /// Shards in any of `states`, grouped by state in the order given.
    pub fn shards_by_states(&self, states: &[ShardRoutingState]) -> Vec<&ShardRouting> {
        states
            .iter()
            .filter_map(|s| self.by_state.get(s))
            .flatten()
            .filter_map(|id| self.shards.get(id))
            .collect()
    }

    /// Shards of `class` in any of `states`.
    pub fn shards_by_states_in_class(
        &self,
        class: &str,
        states: &[ShardRoutingState],
    ) -> Vec<&ShardRouting> {
        let Some(ids) = self.by_class.get(class) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| self.shards.get(id))
            .filter(|s| states.contains(&s.state()))
            .collect()
    }

    /// Number of shards of `class` in any of `states`.
    pub fn count_by_states_in_class(&self, class: &str, states: &[ShardRoutingState]) -> usize {
        self.shards_by_states_in_class(class, states).len()
    }

    /// Shards on this node that will not eventually move away.
    pub fn count_owning_shards(&self) -> usize {
        self.shards.len() - self.count_by_states(&[ShardRoutingState::Relocating])
    }

    /// Non-relocating shards of `class`.
    pub fn count_owning_shards_in_class(&self, class: &str) -> usize {
        self.by_class.get(class).map_or(0, |ids| {
            ids.iter()
                .filter_map(|id| self.shards.get(id))
                .filter(|s| !s.relocating())
                .count()
        })
    }

    /// Multi-line listing of every hosted shard, in insertion order.
    pub fn pretty_print(&self) -> String {
        let mut out = format!("-----node_id[{}]\n", self.node_id);
        for shard in self.shards.values() {
            out.push_str("--------");
            out.push_str(&shard.short_summary());
            out.push('\n');
        }
        out
    }

    fn index(&mut self, shard: &ShardRouting) {
        self.by_state
            .entry(shard.state())
            .or_default()
            .insert(shard.shard_id().clone());
        self.by_class
            .entry(shard.class().to_string())
            .or_default()
            .insert(shard.shard_id().clone());
    }

    fn unindex(&mut self, shard: &ShardRouting) {
        if let Some(bucket) = self.by_state.get_mut(&shard.state()) {
            bucket.remove(shard.shard_id());
            if bucket.is_empty() {
                self.by_state.remove(&shard.state());
            }
        }
        if let Some(bucket) = self.by_class.get_mut(shard.class()) {
            bucket.remove(shard.shard_id());
            if bucket.is_empty() {
                self.by_class.remove(shard.class());
            }
        }
    }
}

impl<'a> IntoIterator for &'a RoutingNode {
    type Item = &'a ShardRouting;
    type IntoIter = indexmap::map::Values<'a, ShardId, ShardRouting>;

    fn into_iter(self) -> Self::IntoIter {
        self.shards.values()
    }
}

impl fmt::Display for RoutingNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "routingNode ([{}], [{} assigned shards])",
            self.node_id,
            self.shards.len()
        )
    }
}
