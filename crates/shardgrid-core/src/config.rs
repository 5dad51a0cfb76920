//! shardgrid.toml configuration parser.
//!
//! ```toml
//! [cluster]
//! "cluster.routing.allocation.total_shards_per_node" = 10
//!
//! [classes.logs]
//! "index.routing.allocation.total_shards_per_node" = 2
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SettingsError, SettingsResult};
use crate::settings::Settings;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShardgridConfig {
    /// Node-scope settings, also the fallback for per-class lookups.
    #[serde(default)]
    pub cluster: toml::Table,
    /// Per workload class settings, keyed by class name.
    #[serde(default)]
    pub classes: BTreeMap<String, toml::Table>,
}

impl ShardgridConfig {
    pub fn from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::Io(format!("{}: {e}", path.display())))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> SettingsResult<Self> {
        toml::from_str(content).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    pub fn to_toml_string(&self) -> SettingsResult<String> {
        toml::to_string_pretty(self).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    pub fn cluster_settings(&self) -> SettingsResult<Settings> {
        Settings::from_toml_table(&self.cluster)
    }

    pub fn class_settings(&self) -> SettingsResult<BTreeMap<String, Settings>> {
        self.classes
            .iter()
            .map(|(name, table)| Ok((name.clone(), Settings::from_toml_table(table)?)))
            .collect()
    }
}
