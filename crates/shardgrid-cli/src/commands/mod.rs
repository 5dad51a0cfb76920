pub mod check;
pub mod explain;
pub mod show;

use std::path::Path;

use anyhow::Context;

use shardgrid_core::ShardgridConfig;
use shardgrid_routing::{RoutingSnapshot, RoutingTable};

pub fn load_config(path: &str) -> anyhow::Result<ShardgridConfig> {
    ShardgridConfig::from_file(Path::new(path)).with_context(|| format!("loading {path}"))
}

pub fn load_routing(path: &str) -> anyhow::Result<RoutingTable> {
    let json = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let table = RoutingSnapshot::from_json(&json)?.into_table()?;
    Ok(table)
}
