//! End-to-end behaviour of the shards-limit decider against real registries.

use std::sync::Arc;

use proptest::prelude::*;

use shardgrid_core::{ClusterSettings, Settings};
use shardgrid_placement::{
    AllocationDecider, CLUSTER_TOTAL_SHARDS_PER_NODE, ClassMetadata, ClusterMetadata,
    INDEX_TOTAL_SHARDS_PER_NODE, LimitConfig, Outcome, ShardsLimitDecider,
};
use shardgrid_routing::{RoutingNode, ShardId, ShardRouting};

const NODE: &str = "node-1";

fn started(class: &str, ordinal: u32) -> ShardRouting {
    ShardRouting::started(ShardId::new(class, ordinal), true, NODE)
}

fn relocating(class: &str, ordinal: u32) -> ShardRouting {
    started(class, ordinal).relocate("node-2").unwrap()
}

fn initializing(class: &str, ordinal: u32) -> ShardRouting {
    ShardRouting::unassigned(ShardId::new(class, ordinal), false)
        .initialize(NODE)
        .unwrap()
}

fn unassigned(class: &str, ordinal: u32) -> ShardRouting {
    ShardRouting::unassigned(ShardId::new(class, ordinal), false)
}

fn incoming(class: &str) -> ShardRouting {
    ShardRouting::unassigned(ShardId::new(class, 1000), true)
}

fn decider(cluster_limit: i32) -> ShardsLimitDecider {
    let settings = Settings::new().with(CLUSTER_TOTAL_SHARDS_PER_NODE.key(), cluster_limit);
    ShardsLimitDecider::new(Arc::new(LimitConfig::new(settings)))
}

fn class(name: &str, limit: Option<i32>) -> ClassMetadata {
    let mut settings = Settings::new();
    if let Some(limit) = limit {
        settings.put(INDEX_TOTAL_SHARDS_PER_NODE.key(), limit);
    }
    ClassMetadata::new(name, settings).unwrap()
}

fn node(shards: Vec<ShardRouting>) -> RoutingNode {
    RoutingNode::with_shards(NODE, shards).unwrap()
}

#[test]
fn cluster_limit_denies_at_limit() {
    let d = decider(2);
    let md = ClusterMetadata::new().with_class(class("logs", None));
    let n = node(vec![started("logs", 0), started("logs", 1)]);

    let v = d.can_allocate(&incoming("logs"), &n, &md);
    assert_eq!(v.outcome, Outcome::Deny);
    assert_eq!(v.label, "shards_limit");
    assert_eq!(
        v.explanation,
        "too many shards [2] allocated to this node, cluster setting [cluster.routing.allocation.total_shards_per_node=2]"
    );
}

#[test]
fn class_limit_denies_only_its_class() {
    let d = decider(-1);
    let md = ClusterMetadata::new()
        .with_class(class("logs", Some(1)))
        .with_class(class("metrics", None));
    let mut shards = vec![started("logs", 0)];
    shards.extend((0..5).map(|i| started("metrics", i)));
    let n = node(shards);

    let v = d.can_allocate(&incoming("logs"), &n, &md);
    assert!(v.is_deny());
    assert!(v.explanation.contains("for class [logs]"));
    assert!(v.explanation.contains("index.routing.allocation.total_shards_per_node=1"));

    let v = d.can_allocate(&incoming("metrics"), &n, &md);
    assert!(v.is_allow());
}

#[test]
fn can_allocate_boundary_ignores_relocating() {
    let md = ClusterMetadata::new().with_class(class("logs", None));
    let d = decider(3);

    let full = node(vec![
        started("logs", 0),
        started("logs", 1),
        initializing("logs", 2),
        relocating("logs", 3),
        relocating("logs", 4),
    ]);
    assert!(d.can_allocate(&incoming("logs"), &full, &md).is_deny());

    let one_short = node(vec![
        started("logs", 0),
        started("logs", 1),
        relocating("logs", 3),
        relocating("logs", 4),
    ]);
    let v = d.can_allocate(&incoming("logs"), &one_short, &md);
    assert!(v.is_allow());
    assert_eq!(
        v.explanation,
        "the shard count [2] for this node is under the class limit [-1] and cluster level node limit [3]"
    );
}

#[test]
fn can_remain_boundary() {
    let md = ClusterMetadata::new().with_class(class("logs", None));
    let d = decider(2);

    let at_limit = node(vec![started("logs", 0), started("logs", 1)]);
    assert!(d.can_remain(&started("logs", 0), &at_limit, &md).is_allow());

    let over = node(vec![started("logs", 0), started("logs", 1), started("logs", 2)]);
    let v = d.can_remain(&started("logs", 0), &over, &md);
    assert!(v.is_deny());
    assert!(v.explanation.starts_with("too many shards [3]"));
}

#[test]
fn class_can_remain_boundary() {
    let md = ClusterMetadata::new().with_class(class("logs", Some(2)));
    let d = decider(-1);

    let at_limit = node(vec![started("logs", 0), started("logs", 1), started("other", 0)]);
    assert!(d.can_remain(&started("logs", 0), &at_limit, &md).is_allow());

    let over = node(vec![started("logs", 0), started("logs", 1), started("logs", 2)]);
    let v = d.can_remain(&started("logs", 0), &over, &md);
    assert!(v.is_deny());
    assert!(v.explanation.contains("for class [logs]"));
}

#[test]
fn cluster_deny_short_circuits_class_check() {
    // Cluster limit broken, class limit generous.
    let md = ClusterMetadata::new().with_class(class("logs", Some(100)));
    let d = decider(1);
    let n = node(vec![started("logs", 0), started("metrics", 0)]);

    let v = d.can_allocate(&incoming("logs"), &n, &md);
    assert!(v.is_deny());
    assert!(v.explanation.contains("cluster setting [cluster.routing.allocation.total_shards_per_node=1]"));
    assert!(!v.explanation.contains("index.routing"));

    // Both broken: still only the cluster setting is cited.
    let md = ClusterMetadata::new().with_class(class("logs", Some(1)));
    let v = d.can_allocate(&incoming("logs"), &n, &md);
    assert!(v.explanation.contains("cluster setting"));
    assert!(!v.explanation.contains("class setting"));
}

#[test]
fn owning_shards_excludes_relocating() {
    let n = node(vec![started("logs", 0), started("logs", 1), relocating("logs", 2)]);
    assert_eq!(n.count_owning_shards(), 2);
}

#[test]
fn remain_on_node_checks_every_known_class() {
    let d = decider(-1);
    let md = ClusterMetadata::new()
        .with_class(class("absent", Some(1)))
        .with_class(class("logs", Some(2)))
        .with_class(class("metrics", None));

    // Relocating shards are not counted against the class limit.
    let ok = node(vec![
        started("logs", 0),
        initializing("logs", 1),
        relocating("logs", 2),
        started("metrics", 0),
        started("metrics", 1),
        started("metrics", 2),
    ]);
    let v = d.can_remain_on_node(&ok, &md);
    assert!(v.is_allow());
    assert_eq!(v.explanation, "the shard count is under class and cluster limit per node");

    let over = node(vec![started("logs", 0), started("logs", 1), initializing("logs", 2)]);
    let v = d.can_remain_on_node(&over, &md);
    assert!(v.is_deny());
    assert!(v.explanation.starts_with("too many shards [3] allocated to this node for class [logs]"));
}

#[test]
fn remain_on_node_cluster_limit_is_strict() {
    let md = ClusterMetadata::new();
    let d = decider(2);

    let at_limit = node(vec![started("logs", 0), initializing("logs", 1), relocating("logs", 2)]);
    assert!(d.can_remain_on_node(&at_limit, &md).is_allow());

    let over = node(vec![started("logs", 0), started("logs", 1), initializing("logs", 2)]);
    let v = d.can_remain_on_node(&over, &md);
    assert!(v.is_deny());
    assert!(v.explanation.contains("cluster setting"));
}

#[test]
fn remain_on_node_cluster_count_includes_unassigned() {
    let md = ClusterMetadata::new().with_class(class("logs", None));
    let d = decider(2);

    let n = node(vec![started("logs", 0), started("logs", 1), unassigned("logs", 2)]);
    let v = d.can_remain_on_node(&n, &md);
    assert!(v.is_deny());
    assert_eq!(
        v.explanation,
        "too many shards [3] allocated to this node, cluster setting [cluster.routing.allocation.total_shards_per_node=2]"
    );
}

#[test]
fn remain_on_node_class_count_ignores_unassigned() {
    let md = ClusterMetadata::new().with_class(class("logs", Some(2)));
    let d = decider(-1);

    let n = node(vec![started("logs", 0), started("logs", 1), unassigned("logs", 2)]);
    let v = d.can_remain_on_node(&n, &md);
    assert!(v.is_allow());
    assert_eq!(v.explanation, "the shard count is under class and cluster limit per node");
}

#[test]
fn allocate_to_node_boundary() {
    let md = ClusterMetadata::new();
    let d = decider(2);

    let n = node(vec![started("logs", 0), relocating("logs", 1)]);
    assert!(d.can_allocate_to_node(&n, &md).is_allow());

    let n = node(vec![started("logs", 0), started("logs", 1)]);
    assert!(d.can_allocate_any_shard_to_node(&n, &md).is_deny());
}

#[test]
fn dynamic_cluster_limit_update() {
    let settings = ClusterSettings::new(
        Settings::new().with(CLUSTER_TOTAL_SHARDS_PER_NODE.key(), 5),
        [CLUSTER_TOTAL_SHARDS_PER_NODE],
    )
    .unwrap();
    let limits = LimitConfig::from_cluster_settings(&settings).unwrap();
    let d = ShardsLimitDecider::new(limits.clone());
    let md = ClusterMetadata::new().with_class(class("logs", None));
    let n = node(vec![started("logs", 0), started("logs", 1)]);

    let before = d.can_allocate(&incoming("logs"), &n, &md);
    assert!(before.is_allow());

    settings
        .apply(&Settings::new().with(CLUSTER_TOTAL_SHARDS_PER_NODE.key(), 1))
        .unwrap();

    let after = d.can_allocate(&incoming("logs"), &n, &md);
    assert!(after.is_deny());
    assert!(after.explanation.ends_with("total_shards_per_node=1]"));
    // Verdicts handed out earlier are values; nothing rewrites them.
    assert!(before.is_allow());
    assert!(before.explanation.contains("node limit [5]"));
}

#[test]
fn class_limit_follows_metadata_passed_in() {
    let d = decider(-1);
    let n = node(vec![started("logs", 0), started("logs", 1)]);

    let strict = ClusterMetadata::new().with_class(class("logs", Some(2)));
    let relaxed = ClusterMetadata::new().with_class(class("logs", Some(3)));

    assert!(d.can_allocate(&incoming("logs"), &n, &strict).is_deny());
    assert!(d.can_allocate(&incoming("logs"), &n, &relaxed).is_allow());
}

#[test]
fn node_scope_defaults_apply_to_classes_without_their_own_limit() {
    let defaults = Settings::new().with(INDEX_TOTAL_SHARDS_PER_NODE.key(), 1);
    let d = ShardsLimitDecider::new(Arc::new(LimitConfig::new(defaults)));
    let md = ClusterMetadata::new().with_class(class("logs", None));
    let n = node(vec![started("logs", 0)]);

    let v = d.can_allocate(&incoming("logs"), &n, &md);
    assert!(v.is_deny());
    assert!(v.explanation.contains("=1]"));
}

#[test]
fn verdict_serializes_for_decision_logs() {
    let d = decider(1);
    let n = node(vec![started("logs", 0)]);
    let v = d.can_allocate(&incoming("logs"), &n, &ClusterMetadata::new());

    let json = serde_json::to_value(&v).unwrap();
    assert_eq!(json["outcome"], "deny");
    assert_eq!(json["label"], "shards_limit");
}

proptest! {
    #[test]
    fn disabled_limits_always_allow(
        cluster_limit in -1i32..=0,
        class_limit in -1i32..=0,
        started_count in 0u32..40,
        relocating_count in 0u32..10,
    ) {
        let d = decider(cluster_limit);
        let md = ClusterMetadata::new().with_class(class("logs", Some(class_limit)));
        let mut shards: Vec<ShardRouting> = (0..started_count).map(|i| started("logs", i)).collect();
        shards.extend((0..relocating_count).map(|i| relocating("logs", 100 + i)));
        let n = node(shards);

        prop_assert!(d.can_allocate(&incoming("logs"), &n, &md).is_allow());
        if let Some(first) = n.iter().next() {
            prop_assert!(d.can_remain(first, &n, &md).is_allow());
        }
        prop_assert!(d.can_allocate_to_node(&n, &md).is_allow());
        prop_assert!(d.can_remain_on_node(&n, &md).is_allow());
    }

    #[test]
    fn relocating_shards_never_change_can_allocate(
        limit in 1i32..20,
        started_count in 0u32..25,
        relocating_count in 0u32..10,
    ) {
        let d = decider(limit);
        let md = ClusterMetadata::new().with_class(class("logs", None));
        let base = node((0..started_count).map(|i| started("logs", i)).collect());
        let mut with_moving: Vec<ShardRouting> = base.copy_shards();
        with_moving.extend((0..relocating_count).map(|i| relocating("logs", 100 + i)));
        let with_moving = node(with_moving);

        let a = d.can_allocate(&incoming("logs"), &base, &md);
        let b = d.can_allocate(&incoming("logs"), &with_moving, &md);
        prop_assert_eq!(a.outcome, b.outcome);
        prop_assert_eq!(a.is_deny(), started_count as i32 >= limit);
    }
}
