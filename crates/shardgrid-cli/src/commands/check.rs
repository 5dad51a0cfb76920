use shardgrid_core::ShardgridConfig;
use shardgrid_placement::{
    CLUSTER_TOTAL_SHARDS_PER_NODE, ClusterMetadata, INDEX_TOTAL_SHARDS_PER_NODE, LimitConfig,
};

pub fn check(config_path: &str) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    print!("{}", effective_limits(&config)?);
    Ok(())
}

/// One line per limit, validating every value on the way.
pub fn effective_limits(config: &ShardgridConfig) -> anyhow::Result<String> {
    let node_settings = config.cluster_settings()?;
    CLUSTER_TOTAL_SHARDS_PER_NODE.validate(&node_settings)?;
    INDEX_TOTAL_SHARDS_PER_NODE.validate(&node_settings)?;
    let metadata = ClusterMetadata::from_config(config)?;
    let limits = LimitConfig::new(node_settings);

    let mut out = format!(
        "{}={}\n",
        CLUSTER_TOTAL_SHARDS_PER_NODE.key(),
        limits.cluster_limit()
    );
    for class in metadata.classes() {
        out.push_str(&format!(
            "[{}] {}={}\n",
            class.name(),
            INDEX_TOTAL_SHARDS_PER_NODE.key(),
            limits.class_limit(class.settings())
        ));
    }
    Ok(out)
}
