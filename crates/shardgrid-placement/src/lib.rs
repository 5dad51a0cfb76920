//! shardgrid-placement — allocation deciders for ShardGrid.
//!
//! Answers "may this shard be placed on, or stay on, this node?" under
//! shard-count limits. It does NOT combine verdicts of several deciders or
//! move shards; the surrounding allocator does that.
//!
//! # Components
//!
//! - **`decision`** — [`Verdict`], [`Outcome`] and the [`AllocationDecider`] trait
//! - **`limits`** — [`LimitConfig`] and the shard-limit setting definitions
//! - **`metadata`** — workload classes and their settings
//! - **`shards_limit`** — [`ShardsLimitDecider`]

pub mod decision;
pub mod limits;
pub mod metadata;
pub mod shards_limit;

pub use decision::{AllocationDecider, Outcome, Verdict};
pub use limits::{
    CLUSTER_TOTAL_SHARDS_PER_NODE, INDEX_TOTAL_SHARDS_PER_NODE, LimitConfig, LimitSnapshot,
    class_ceiling,
};
pub use metadata::{ClassMetadata, ClusterMetadata};
pub use shards_limit::{ShardsLimitDecider, Threshold};
