use serde::Serialize;
use tracing::info;

use shardgrid_core::{ClusterSettings, Settings, ShardgridConfig};
use shardgrid_placement::{
    AllocationDecider, CLUSTER_TOTAL_SHARDS_PER_NODE, ClusterMetadata, INDEX_TOTAL_SHARDS_PER_NODE,
    LimitConfig, ShardsLimitDecider, Verdict,
};
use shardgrid_routing::{RoutingTable, ShardId, ShardRouting};

/// Verdicts for one node.
#[derive(Debug, Serialize)]
pub struct NodeReport {
    pub node: String,
    pub shards: usize,
    pub owning: usize,
    pub remain: Verdict,
    pub allocate_any: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<Verdict>,
}

pub fn explain(
    config_path: &str,
    routing_path: &str,
    class: Option<&str>,
    cluster_limit: Option<i32>,
    format: &str,
) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let table = super::load_routing(routing_path)?;
    let reports = evaluate(&config, &table, class, cluster_limit)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&reports)?),
        _ => print!("{}", format_reports(&reports, class)),
    }
    Ok(())
}

pub fn evaluate(
    config: &ShardgridConfig,
    table: &RoutingTable,
    class: Option<&str>,
    cluster_limit: Option<i32>,
) -> anyhow::Result<Vec<NodeReport>> {
    let node_settings = config.cluster_settings()?;
    INDEX_TOTAL_SHARDS_PER_NODE.validate(&node_settings)?;
    let cluster_settings = ClusterSettings::new(node_settings, [CLUSTER_TOTAL_SHARDS_PER_NODE])?;
    let limits = LimitConfig::from_cluster_settings(&cluster_settings)?;

    if let Some(limit) = cluster_limit {
        cluster_settings.apply(&Settings::new().with(CLUSTER_TOTAL_SHARDS_PER_NODE.key(), limit))?;
    }

    let metadata = ClusterMetadata::from_config(config)?;
    let decider = ShardsLimitDecider::new(limits);
    let candidate = class.map(|c| ShardRouting::unassigned(ShardId::new(c, u32::MAX), true));

    info!(
        nodes = table.len(),
        classes = metadata.len(),
        cluster_limit = decider.limits().cluster_limit(),
        "evaluating shard limits"
    );

    let mut reports = Vec::new();
    for id in table.node_ids() {
        let report = table.read_node(&id, |node| NodeReport {
            node: id.clone(),
            shards: node.size(),
            owning: node.count_owning_shards(),
            remain: decider.can_remain_on_node(node, &metadata),
            allocate_any: decider.can_allocate_any_shard_to_node(node, &metadata),
            candidate: candidate
                .as_ref()
                .map(|shard| decider.can_allocate(shard, node, &metadata)),
        })?;
        reports.push(report);
    }
    Ok(reports)
}

pub fn format_reports(reports: &[NodeReport], class: Option<&str>) -> String {
    let mut out = String::new();
    for r in reports {
        out.push_str(&format!("{} ({} shards, {} owning)\n", r.node, r.shards, r.owning));
        out.push_str(&format!("  remain:   {}\n", r.remain));
        out.push_str(&format!("  allocate: {}\n", r.allocate_any));
        if let (Some(verdict), Some(class)) = (&r.candidate, class) {
            out.push_str(&format!("  {class}: {verdict}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardgrid_routing::RoutingSnapshot;

    const CONFIG: &str = r#"
[cluster]
"cluster.routing.allocation.total_shards_per_node" = 3

[classes.logs]
"index.routing.allocation.total_shards_per_node" = 1

[classes.metrics]
"#;

    const ROUTING: &str = r#"{ "nodes": {
        "node-1": [
            { "shard_id": { "class": "logs", "ordinal": 0 }, "primary": true,
              "state": "started", "current_node_id": "node-1" },
            { "shard_id": { "class": "metrics", "ordinal": 0 }, "primary": true,
              "state": "started", "current_node_id": "node-1" },
            { "shard_id": { "class": "metrics", "ordinal": 1 }, "primary": true,
              "state": "relocating", "current_node_id": "node-1",
              "relocating_node_id": "node-2" }
        ],
        "node-2": []
    } }"#;

    fn fixtures() -> (ShardgridConfig, RoutingTable) {
        let config = ShardgridConfig::parse(CONFIG).unwrap();
        let table = RoutingSnapshot::from_json(ROUTING).unwrap().into_table().unwrap();
        (config, table)
    }

    #[test]
    fn reports_every_node() {
        let (config, table) = fixtures();
        let reports = evaluate(&config, &table, Some("logs"), None).unwrap();

        assert_eq!(reports.len(), 2);
        let n1 = &reports[0];
        assert_eq!(n1.node, "node-1");
        assert_eq!((n1.shards, n1.owning), (3, 2));
        assert!(n1.remain.is_allow());
        assert!(n1.allocate_any.is_allow());
        assert!(n1.candidate.as_ref().unwrap().is_deny());

        let n2 = &reports[1];
        assert!(n2.candidate.as_ref().unwrap().is_allow());
    }

    #[test]
    fn cluster_limit_override_applies() {
        let (config, table) = fixtures();
        let reports = evaluate(&config, &table, None, Some(2)).unwrap();

        let n1 = &reports[0];
        assert!(n1.allocate_any.is_deny());
        assert!(n1.allocate_any.explanation.contains("total_shards_per_node=2]"));
        assert!(n1.candidate.is_none());
    }

    #[test]
    fn invalid_override_is_rejected() {
        let (config, table) = fixtures();
        assert!(evaluate(&config, &table, None, Some(-7)).is_err());
    }

    #[test]
    fn text_format_lists_candidate() {
        let (config, table) = fixtures();
        let reports = evaluate(&config, &table, Some("metrics"), None).unwrap();
        let text = format_reports(&reports, Some("metrics"));
        assert!(text.starts_with("node-1 (3 shards, 2 owning)\n"));
        assert!(text.contains("  metrics: ALLOW(shards_limit)"));
    }
}
