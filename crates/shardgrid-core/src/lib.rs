//! shardgrid-core — settings model and configuration for ShardGrid.
//!
//! - **`settings`** — flat dotted-key [`Settings`] and typed [`IntSetting`]
//! - **`cluster_settings`** — dynamic registry with update consumers
//! - **`config`** — `shardgrid.toml` parsing

pub mod cluster_settings;
pub mod config;
pub mod error;
pub mod settings;

pub use cluster_settings::{ClusterSettings, UpdateConsumer};
pub use config::ShardgridConfig;
pub use error::{SettingsError, SettingsResult};
pub use settings::{IntSetting, SettingScope, Settings};
