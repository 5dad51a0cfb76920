//! Decision results and the decider trait.

use std::fmt;

use serde::{Deserialize, Serialize};

use shardgrid_routing::{RoutingNode, ShardRouting};

use crate::metadata::ClusterMetadata;

/// Outcome of one constraint check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Allow,
    Deny,
    /// The check does not apply or found nothing to veto. Never surfaced by
    /// a decider entry point; only used to compose checks.
    Abstain,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Allow => "ALLOW",
            Outcome::Deny => "DENY",
            Outcome::Abstain => "ABSTAIN",
        })
    }
}

/// An outcome plus the justification an operator reads in the decision log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub outcome: Outcome,
    /// Name of the decider that produced this verdict.
    pub label: String,
    pub explanation: String,
}

impl Verdict {
    pub fn new(outcome: Outcome, label: &str, explanation: impl Into<String>) -> Self {
        Self {
            outcome,
            label: label.to_string(),
            explanation: explanation.into(),
        }
    }

    pub fn allow(label: &str, explanation: impl Into<String>) -> Self {
        Self::new(Outcome::Allow, label, explanation)
    }

    pub fn deny(label: &str, explanation: impl Into<String>) -> Self {
        Self::new(Outcome::Deny, label, explanation)
    }

    pub fn abstain(label: &str) -> Self {
        Self::new(Outcome::Abstain, label, String::new())
    }

    pub fn is_allow(&self) -> bool {
        self.outcome == Outcome::Allow
    }

    pub fn is_deny(&self) -> bool {
        self.outcome == Outcome::Deny
    }

    pub fn is_abstain(&self) -> bool {
        self.outcome == Outcome::Abstain
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}): {}", self.outcome, self.label, self.explanation)
    }
}

/// A single placement constraint consulted by the allocator.
///
/// Every method defaults to [`Outcome::Abstain`]; a decider overrides the
/// checks it has an opinion on.
pub trait AllocationDecider: Send + Sync {
    fn name(&self) -> &'static str;

    /// May `shard` be placed on `node`?
    fn can_allocate(
        &self,
        _shard: &ShardRouting,
        _node: &RoutingNode,
        _metadata: &ClusterMetadata,
    ) -> Verdict {
        Verdict::abstain(self.name())
    }

    /// May `shard`, already on `node`, stay there?
    fn can_remain(
        &self,
        _shard: &ShardRouting,
        _node: &RoutingNode,
        _metadata: &ClusterMetadata,
    ) -> Verdict {
        Verdict::abstain(self.name())
    }

    /// Can `node` accept shards at all?
    fn can_allocate_to_node(&self, _node: &RoutingNode, _metadata: &ClusterMetadata) -> Verdict {
        Verdict::abstain(self.name())
    }

    /// Is `node` as a whole within its limits?
    fn can_remain_on_node(&self, _node: &RoutingNode, _metadata: &ClusterMetadata) -> Verdict {
        Verdict::abstain(self.name())
    }

    fn can_allocate_any_shard_to_node(
        &self,
        node: &RoutingNode,
        metadata: &ClusterMetadata,
    ) -> Verdict {
        self.can_allocate_to_node(node, metadata)
    }
}
