//! Flat, dotted-key settings and typed integer setting definitions.
//!
//! [`Settings`] is a plain string map such as
//! `cluster.routing.allocation.total_shards_per_node = "10"`. An
//! [`IntSetting`] knows its key, default and lower bound, validates raw
//! values, and resolves a value from one settings map with a fallback map.

use std::collections::BTreeMap;
use std::fmt;

use tracing::warn;

use crate::error::{SettingsError, SettingsResult};

/// Flat key/value settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    values: BTreeMap<String, String>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.put(key, value);
        self
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl ToString) {
        self.values.insert(key.into(), value.to_string());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Overlay `other` on top of `self`; `other` wins on conflicts.
    pub fn merge(&mut self, other: &Settings) {
        for (k, v) in &other.values {
            self.values.insert(k.clone(), v.clone());
        }
    }

    /// Flatten a TOML table into dotted keys.
    ///
    /// `[cluster.routing.allocation] total_shards_per_node = 3` and
    /// `"cluster.routing.allocation.total_shards_per_node" = 3` produce the
    /// same entry.
    pub fn from_toml_table(table: &toml::Table) -> SettingsResult<Self> {
        let mut settings = Settings::new();
        flatten_into(&mut settings, "", table)?;
        Ok(settings)
    }
}

fn flatten_into(settings: &mut Settings, prefix: &str, table: &toml::Table) -> SettingsResult<()> {
    for (key, value) in table {
        let full = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::Table(inner) => flatten_into(settings, &full, inner)?,
            toml::Value::String(s) => settings.put(full, s),
            toml::Value::Integer(i) => settings.put(full, i),
            toml::Value::Boolean(b) => settings.put(full, b),
            toml::Value::Float(f) => settings.put(full, f),
            other => {
                return Err(SettingsError::Parse(format!(
                    "unsupported value for [{full}]: {other}"
                )));
            }
        }
    }
    Ok(())
}

/// Where a setting lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingScope {
    /// Node / cluster-wide settings.
    Cluster,
    /// Per workload class settings.
    Class,
}

/// Definition of an integer setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntSetting {
    key: &'static str,
    default: i32,
    min: i32,
    scope: SettingScope,
    dynamic: bool,
}

impl IntSetting {
    pub const fn new(
        key: &'static str,
        default: i32,
        min: i32,
        scope: SettingScope,
        dynamic: bool,
    ) -> Self {
        Self {
            key,
            default,
            min,
            scope,
            dynamic,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn default_value(&self) -> i32 {
        self.default
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn scope(&self) -> SettingScope {
        self.scope
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Parse and range-check a raw value.
    pub fn parse(&self, raw: &str) -> SettingsResult<i32> {
        let value: i64 = raw
            .trim()
            .parse()
            .map_err(|_| SettingsError::NotAnInteger {
                key: self.key.to_string(),
                value: raw.to_string(),
            })?;
        if value < i64::from(self.min) {
            return Err(SettingsError::BelowMinimum {
                key: self.key.to_string(),
                value,
                min: self.min,
            });
        }
        i32::try_from(value).map_err(|_| SettingsError::NotAnInteger {
            key: self.key.to_string(),
            value: raw.to_string(),
        })
    }

    /// Check the value in `settings`, if any.
    pub fn validate(&self, settings: &Settings) -> SettingsResult<()> {
        match settings.get(self.key) {
            Some(raw) => self.parse(raw).map(|_| ()),
            None => Ok(()),
        }
    }

    /// Value from `settings`, or the default.
    pub fn get(&self, settings: &Settings) -> i32 {
        self.get_or(settings, None)
    }

    /// Value from `primary`, else from `fallback`, else the default.
    ///
    /// Callers are expected to have validated both maps already; an
    /// unparseable value falls back to the default.
    pub fn get_or(&self, primary: &Settings, fallback: Option<&Settings>) -> i32 {
        let raw = primary
            .get(self.key)
            .or_else(|| fallback.and_then(|f| f.get(self.key)));
        match raw {
            Some(raw) => self.parse(raw).unwrap_or_else(|err| {
                warn!(setting = self.key, error = %err, "ignoring invalid setting value");
                self.default
            }),
            None => self.default,
        }
    }
}

impl fmt::Display for IntSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key)
    }
}
