//! Cluster metadata as seen by the deciders: the known workload classes and
//! their settings.

use std::collections::BTreeMap;

use shardgrid_core::{SettingsResult, Settings, ShardgridConfig};
use shardgrid_routing::ClassName;

use crate::limits::INDEX_TOTAL_SHARDS_PER_NODE;

/// Settings of one workload class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMetadata {
    name: ClassName,
    settings: Settings,
}

impl ClassMetadata {
    /// Validates the class-scope limit setting before accepting it.
    pub fn new(name: impl Into<ClassName>, settings: Settings) -> SettingsResult<Self> {
        INDEX_TOTAL_SHARDS_PER_NODE.validate(&settings)?;
        Ok(Self {
            name: name.into(),
            settings,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

/// Every workload class known to the cluster, not only those on one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterMetadata {
    classes: BTreeMap<ClassName, ClassMetadata>,
}

impl ClusterMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ShardgridConfig) -> SettingsResult<Self> {
        let mut metadata = Self::new();
        for (name, settings) in config.class_settings()? {
            metadata.put(ClassMetadata::new(name, settings)?);
        }
        Ok(metadata)
    }

    pub fn with_class(mut self, class: ClassMetadata) -> Self {
        self.put(class);
        self
    }

    pub fn put(&mut self, class: ClassMetadata) {
        self.classes.insert(class.name.clone(), class);
    }

    pub fn class(&self, name: &str) -> Option<&ClassMetadata> {
        self.classes.get(name)
    }

    /// Classes ordered by name.
    pub fn classes(&self) -> impl Iterator<Item = &ClassMetadata> + '_ {
        self.classes.values()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
