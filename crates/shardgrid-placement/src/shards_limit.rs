//! Shards-per-node limit decider.
//!
//! Limits how many shards a single node may hold, both in total
//! (`cluster.routing.allocation.total_shards_per_node`) and per workload
//! class (`index.routing.allocation.total_shards_per_node`). Negative or
//! zero values mean unlimited. Both limits are dynamic: the cluster one is
//! pushed through [`LimitConfig`], the class one is read from the metadata
//! passed into every call.
//!
//! Shards in the RELOCATING state are not counted on either end until they
//! settle as STARTED, INITIALIZING or UNASSIGNED.
//!
//! Lowering a limit can trigger relocations across the cluster.

use std::sync::Arc;

use tracing::debug;

use shardgrid_routing::{RoutingNode, ShardRouting, ShardRoutingState};

use crate::decision::{AllocationDecider, Outcome, Verdict};
use crate::limits::{
    CLUSTER_TOTAL_SHARDS_PER_NODE, INDEX_TOTAL_SHARDS_PER_NODE, LimitConfig, LimitSnapshot,
};
use crate::metadata::ClusterMetadata;

pub const NAME: &str = "shards_limit";

/// States counted by the node-wide health check against the cluster limit.
const NODE_COUNTED_STATES: [ShardRoutingState; 3] = [
    ShardRoutingState::Initializing,
    ShardRoutingState::Started,
    ShardRoutingState::Unassigned,
];

/// States counted by the node-wide health check against class limits.
const CLASS_COUNTED_STATES: [ShardRoutingState; 2] =
    [ShardRoutingState::Initializing, ShardRoutingState::Started];

/// When a count is over a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threshold {
    /// `count >= limit`: placing one more shard would break the limit.
    AtLeast,
    /// `count > limit`: the counted shards already break the limit.
    StrictlyGreater,
}

impl Threshold {
    fn exceeded(self, count: usize, limit: i32) -> bool {
        let count = i64::try_from(count).unwrap_or(i64::MAX);
        let limit = i64::from(limit);
        match self {
            Threshold::AtLeast => count >= limit,
            Threshold::StrictlyGreater => count > limit,
        }
    }
}

/// Enforces the cluster-wide and per-class shards-per-node limits.
#[derive(Debug, Clone)]
pub struct ShardsLimitDecider {
    limits: Arc<LimitConfig>,
}

impl ShardsLimitDecider {
    pub fn new(limits: Arc<LimitConfig>) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &LimitConfig {
        &self.limits
    }

    fn decide(
        &self,
        snapshot: LimitSnapshot,
        shard: &ShardRouting,
        node: &RoutingNode,
        metadata: &ClusterMetadata,
        threshold: Threshold,
    ) -> Verdict {
        let class_limit = self.limits.class_limit_for(metadata, shard.class());
        let cluster_limit = snapshot.cluster_limit;

        if class_limit <= 0 && cluster_limit <= 0 {
            return Verdict::allow(
                NAME,
                format!(
                    "total shard limits are disabled: [class: {class_limit}, cluster: {cluster_limit}] <= 0"
                ),
            );
        }

        let node_count = node.count_owning_shards();
        let cluster = cluster_ceiling_check(node_count, cluster_limit, threshold);
        if cluster.is_deny() {
            log_deny(node, &cluster);
            return cluster;
        }

        let class_count = node.count_owning_shards_in_class(shard.class());
        let class = class_ceiling_check(class_count, class_limit, threshold, shard.class());
        if class.is_deny() {
            log_deny(node, &class);
            return class;
        }

        Verdict::allow(
            NAME,
            format!(
                "the shard count [{node_count}] for this node is under the class limit [{class_limit}] and cluster level node limit [{cluster_limit}]"
            ),
        )
    }

    fn decide_node_allocation(&self, snapshot: LimitSnapshot, node: &RoutingNode) -> Verdict {
        let cluster_limit = snapshot.cluster_limit;
        if cluster_limit <= 0 {
            return Verdict::allow(
                NAME,
                format!("total shard limits are disabled: [cluster: {cluster_limit}] <= 0"),
            );
        }

        let node_count = node.count_owning_shards();
        let cluster = cluster_ceiling_check(node_count, cluster_limit, Threshold::AtLeast);
        if cluster.is_deny() {
            log_deny(node, &cluster);
            return cluster;
        }

        Verdict::allow(
            NAME,
            format!(
                "the shard count [{node_count}] for this node is under the cluster level node limit [{cluster_limit}]"
            ),
        )
    }

    fn decide_node_health(
        &self,
        snapshot: LimitSnapshot,
        node: &RoutingNode,
        metadata: &ClusterMetadata,
    ) -> Verdict {
        let node_count = node.count_by_states(&NODE_COUNTED_STATES);
        let cluster = cluster_ceiling_check(
            node_count,
            snapshot.cluster_limit,
            Threshold::StrictlyGreater,
        );
        if cluster.is_deny() {
            log_deny(node, &cluster);
            return cluster;
        }

        for class_md in metadata.classes() {
            let class_limit = self.limits.class_limit(class_md.settings());
            if class_limit <= 0 {
                continue;
            }
            let class_count = node.count_by_states_in_class(class_md.name(), &CLASS_COUNTED_STATES);
            let class = class_ceiling_check(
                class_count,
                class_limit,
                Threshold::StrictlyGreater,
                class_md.name(),
            );
            if class.is_deny() {
                log_deny(node, &class);
                return class;
            }
        }

        Verdict::allow(NAME, "the shard count is under class and cluster limit per node")
    }
}

impl AllocationDecider for ShardsLimitDecider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn can_allocate(
        &self,
        shard: &ShardRouting,
        node: &RoutingNode,
        metadata: &ClusterMetadata,
    ) -> Verdict {
        self.decide(self.limits.snapshot(), shard, node, metadata, Threshold::AtLeast)
    }

    fn can_remain(
        &self,
        shard: &ShardRouting,
        node: &RoutingNode,
        metadata: &ClusterMetadata,
    ) -> Verdict {
        self.decide(
            self.limits.snapshot(),
            shard,
            node,
            metadata,
            Threshold::StrictlyGreater,
        )
    }

    /// Checks only the cluster limit; class limits are enforced per shard.
    fn can_allocate_to_node(&self, node: &RoutingNode, _metadata: &ClusterMetadata) -> Verdict {
        self.decide_node_allocation(self.limits.snapshot(), node)
    }

    fn can_remain_on_node(&self, node: &RoutingNode, metadata: &ClusterMetadata) -> Verdict {
        self.decide_node_health(self.limits.snapshot(), node, metadata)
    }
}

/// DENY if the cluster limit is enabled and `count` breaks it, else ABSTAIN.
fn cluster_ceiling_check(count: usize, limit: i32, threshold: Threshold) -> Verdict {
    if limit > 0 && threshold.exceeded(count, limit) {
        return Verdict::deny(
            NAME,
            format!(
                "too many shards [{count}] allocated to this node, cluster setting [{}={limit}]",
                CLUSTER_TOTAL_SHARDS_PER_NODE.key()
            ),
        );
    }
    Verdict::abstain(NAME)
}

/// DENY if the class limit is enabled and `count` breaks it, else ABSTAIN.
fn class_ceiling_check(count: usize, limit: i32, threshold: Threshold, class: &str) -> Verdict {
    if limit > 0 && threshold.exceeded(count, limit) {
        return Verdict::deny(
            NAME,
            format!(
                "too many shards [{count}] allocated to this node for class [{class}], class setting [{}={limit}]",
                INDEX_TOTAL_SHARDS_PER_NODE.key()
            ),
        );
    }
    Verdict::abstain(NAME)
}

fn log_deny(node: &RoutingNode, verdict: &Verdict) {
    debug_assert_eq!(verdict.outcome, Outcome::Deny);
    debug!(node = %node.node_id(), reason = %verdict.explanation, "shard limit reached");
}
