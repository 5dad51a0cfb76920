//! Shard-count ceilings.
//!
//! [`LimitConfig`] holds the cluster-wide ceiling in an atomic so a settings
//! update replaces it with one store, and resolves per-class ceilings from
//! whatever metadata the caller passes in (nothing is cached).
//!
//! Any value ≤ 0 disables a ceiling.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use shardgrid_core::{ClusterSettings, IntSetting, SettingScope, Settings, SettingsResult};

use crate::metadata::ClusterMetadata;

/// Maximum number of shards of one workload class on a single node.
pub const INDEX_TOTAL_SHARDS_PER_NODE: IntSetting = IntSetting::new(
    "index.routing.allocation.total_shards_per_node",
    -1,
    -1,
    SettingScope::Class,
    true,
);

/// Maximum number of shards on a single node, all classes together.
pub const CLUSTER_TOTAL_SHARDS_PER_NODE: IntSetting = IntSetting::new(
    "cluster.routing.allocation.total_shards_per_node",
    -1,
    -1,
    SettingScope::Cluster,
    true,
);

/// Per-class ceiling from the class's own settings, falling back to the
/// node-scope defaults.
pub fn class_ceiling(class_settings: &Settings, defaults: &Settings) -> i32 {
    INDEX_TOTAL_SHARDS_PER_NODE.get_or(class_settings, Some(defaults))
}

/// The cluster ceiling as read once at the start of a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitSnapshot {
    pub cluster_limit: i32,
}

/// Process-wide shard limits.
#[derive(Debug)]
pub struct LimitConfig {
    cluster_limit: AtomicI32,
    defaults: Settings,
    /// Classes already reported as missing from metadata.
    unknown_classes: Mutex<HashSet<String>>,
}

impl LimitConfig {
    /// Initialise from node-scope settings. `settings` also serves as the
    /// fallback for per-class lookups.
    pub fn new(settings: Settings) -> Self {
        Self {
            cluster_limit: AtomicI32::new(CLUSTER_TOTAL_SHARDS_PER_NODE.get(&settings)),
            defaults: settings,
            unknown_classes: Mutex::new(HashSet::new()),
        }
    }

    /// Build from a dynamic settings registry and subscribe to changes of
    /// the cluster ceiling.
    pub fn from_cluster_settings(cluster_settings: &ClusterSettings) -> SettingsResult<Arc<Self>> {
        let limits = Arc::new(Self::new(cluster_settings.snapshot()));
        cluster_settings.add_weak_update_consumer(
            &CLUSTER_TOTAL_SHARDS_PER_NODE,
            &limits,
            Self::store_cluster_limit,
        )?;
        Ok(limits)
    }

    pub fn cluster_limit(&self) -> i32 {
        self.cluster_limit.load(Ordering::Acquire)
    }

    pub fn set_cluster_limit(&self, limit: i32) {
        self.store_cluster_limit(limit);
    }

    fn store_cluster_limit(&self, limit: i32) {
        let old = self.cluster_limit.swap(limit, Ordering::AcqRel);
        if old == limit {
            return;
        }
        info!(
            setting = CLUSTER_TOTAL_SHARDS_PER_NODE.key(),
            old,
            new = limit,
            "cluster shard limit changed"
        );
    }

    pub fn snapshot(&self) -> LimitSnapshot {
        LimitSnapshot {
            cluster_limit: self.cluster_limit(),
        }
    }

    pub fn defaults(&self) -> &Settings {
        &self.defaults
    }

    /// Per-class ceiling from `class_settings`.
    pub fn class_limit(&self, class_settings: &Settings) -> i32 {
        class_ceiling(class_settings, &self.defaults)
    }

    /// Per-class ceiling for `class` as recorded in `metadata`.
    ///
    /// A class missing from the metadata resolves against the defaults. The
    /// first miss per class is logged at `warn`, later ones at `debug`.
    pub fn class_limit_for(&self, metadata: &ClusterMetadata, class: &str) -> i32 {
        match metadata.class(class) {
            Some(class_md) => self.class_limit(class_md.settings()),
            None => {
                let first = self
                    .unknown_classes
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(class.to_string());
                if first {
                    warn!(class, "no metadata for class, using default shard limit");
                } else {
                    debug!(class, "no metadata for class, using default shard limit");
                }
                self.class_limit(&Settings::new())
            }
        }
    }
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self::new(Settings::new())
    }
}
