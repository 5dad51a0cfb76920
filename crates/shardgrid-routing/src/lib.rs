//! shardgrid-routing — per-node shard registry for ShardGrid.
//!
//! Tracks which shards live on which node and answers the membership
//! queries placement deciders need (count by lifecycle state, shards of one
//! workload class) without scanning the whole node.
//!
//! # Architecture
//!
//! ```text
//! RoutingTable
//!   └── node id → RwLock<RoutingNode>
//!         ├── shards   (insertion ordered)
//!         ├── by_state (derived index)
//!         └── by_class (derived index)
//! ```
//!
//! [`ShardRouting`] values are immutable; lifecycle transitions return new
//! values, which the registry uses to detect callers holding a stale view.

pub mod error;
pub mod node;
pub mod snapshot;
pub mod table;
pub mod types;

pub use error::{RoutingError, RoutingResult};
pub use node::RoutingNode;
pub use snapshot::RoutingSnapshot;
pub use table::{RoutingTable, SharedRoutingNode};
pub use types::*;
