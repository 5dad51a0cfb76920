//! Dynamic cluster settings with update subscriptions.
//!
//! Components register a consumer for a dynamic [`IntSetting`]; every
//! [`ClusterSettings::apply`] that changes that setting's effective value
//! invokes the consumer with the new value. Applies are serialized, so the
//! last consumer call always carries the last applied value.
//!
//! Consumers run while the apply lock is held and must not call
//! [`ClusterSettings::apply`], [`ClusterSettings::reset`] or
//! [`ClusterSettings::add_weak_update_consumer`]. Registering a plain
//! consumer from inside a consumer is fine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, info};

use crate::error::{SettingsError, SettingsResult};
use crate::settings::{IntSetting, Settings};

/// Callback invoked with a setting's new value. Returns `false` once its
/// subscriber is gone, which drops the subscription.
pub type UpdateConsumer = Arc<dyn Fn(i32) -> bool + Send + Sync>;

struct Subscription {
    setting: IntSetting,
    consumer: UpdateConsumer,
}

/// Current node-scope settings plus the registry of dynamic settings.
pub struct ClusterSettings {
    registered: HashMap<&'static str, IntSetting>,
    current: RwLock<Settings>,
    subscriptions: RwLock<Vec<Subscription>>,
    /// Serializes `apply` / `reset` so consumer calls are ordered.
    apply_lock: Mutex<()>,
}

impl ClusterSettings {
    /// Build from initial settings, validating every registered setting.
    pub fn new(
        initial: Settings,
        registered: impl IntoIterator<Item = IntSetting>,
    ) -> SettingsResult<Self> {
        let registered: HashMap<&'static str, IntSetting> =
            registered.into_iter().map(|s| (s.key(), s)).collect();
        for setting in registered.values() {
            setting.validate(&initial)?;
        }
        Ok(Self {
            registered,
            current: RwLock::new(initial),
            subscriptions: RwLock::new(Vec::new()),
            apply_lock: Mutex::new(()),
        })
    }

    /// Effective value of `setting`.
    pub fn get(&self, setting: &IntSetting) -> i32 {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        setting.get(&current)
    }

    /// Copy of the current settings.
    pub fn snapshot(&self) -> Settings {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Subscribe to changes of a registered dynamic setting.
    pub fn add_update_consumer(
        &self,
        setting: &IntSetting,
        consumer: impl Fn(i32) + Send + Sync + 'static,
    ) -> SettingsResult<()> {
        let registered = self.dynamic_setting(setting)?;
        self.subscribe(
            registered,
            Arc::new(move |value: i32| {
                consumer(value);
                true
            }),
        );
        Ok(())
    }

    /// Subscribe `target` to changes of a registered dynamic setting without
    /// keeping it alive. `update` is called once with the current value
    /// before this returns, and the value is returned.
    ///
    /// Registration and the initial call happen under the apply lock, so no
    /// update can land between them. The subscription is dropped on the first
    /// notification after `target` is gone.
    pub fn add_weak_update_consumer<T>(
        &self,
        setting: &IntSetting,
        target: &Arc<T>,
        update: fn(&T, i32),
    ) -> SettingsResult<i32>
    where
        T: Send + Sync + 'static,
    {
        let registered = self.dynamic_setting(setting)?;
        let _serial = self.apply_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let weak = Arc::downgrade(target);
        self.subscribe(
            registered,
            Arc::new(move |value: i32| match weak.upgrade() {
                Some(target) => {
                    update(target.as_ref(), value);
                    true
                }
                None => false,
            }),
        );
        let current = self.get(&registered);
        update(target.as_ref(), current);
        Ok(current)
    }

    /// Number of live subscriptions for `setting`.
    pub fn consumer_count(&self, setting: &IntSetting) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.setting.key() == setting.key())
            .count()
    }

    fn dynamic_setting(&self, setting: &IntSetting) -> SettingsResult<IntSetting> {
        let registered = self
            .registered
            .get(setting.key())
            .ok_or_else(|| SettingsError::Unknown(setting.key().to_string()))?;
        if !registered.is_dynamic() {
            return Err(SettingsError::NotDynamic(setting.key().to_string()));
        }
        Ok(*registered)
    }

    fn subscribe(&self, setting: IntSetting, consumer: UpdateConsumer) {
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscription { setting, consumer });
        debug!(setting = setting.key(), "registered settings update consumer");
    }

    /// Apply an update. Every key must be a registered dynamic setting with a
    /// valid value; otherwise nothing is applied.
    ///
    /// Returns the number of settings whose effective value changed.
    pub fn apply(&self, update: &Settings) -> SettingsResult<usize> {
        for key in update.keys() {
            let setting = self
                .registered
                .get(key)
                .ok_or_else(|| SettingsError::Unknown(key.to_string()))?;
            if !setting.is_dynamic() {
                return Err(SettingsError::NotDynamic(key.to_string()));
            }
            setting.validate(update)?;
        }
        self.commit(|current| current.merge(update))
    }

    /// Drop an explicit value so `setting` reverts to its default.
    pub fn reset(&self, setting: &IntSetting) -> SettingsResult<usize> {
        self.dynamic_setting(setting)?;
        self.commit(|current| {
            current.remove(setting.key());
        })
    }

    fn commit(&self, change: impl FnOnce(&mut Settings)) -> SettingsResult<usize> {
        let _serial = self.apply_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let (before, after) = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            let before = current.clone();
            change(&mut current);
            (before, current.clone())
        };

        let mut changed = 0;
        let mut dead: Vec<UpdateConsumer> = Vec::new();
        for setting in self.registered.values() {
            let old = setting.get(&before);
            let new = setting.get(&after);
            if old == new {
                continue;
            }
            changed += 1;
            info!(setting = setting.key(), old, new, "updating setting");
            // Consumers run without the subscriptions guard.
            let consumers: Vec<UpdateConsumer> = self
                .subscriptions
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .filter(|s| s.setting.key() == setting.key())
                .map(|s| Arc::clone(&s.consumer))
                .collect();
            for consumer in consumers {
                if !consumer(new) {
                    dead.push(consumer);
                }
            }
        }

        if !dead.is_empty() {
            let mut subs = self
                .subscriptions
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            subs.retain(|s| !dead.iter().any(|d| Arc::ptr_eq(d, &s.consumer)));
            debug!(dropped = dead.len(), "dropped settings consumers of released subscribers");
        }
        Ok(changed)
    }
}

impl std::fmt::Debug for ClusterSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterSettings")
            .field("registered", &self.registered.keys().collect::<Vec<_>>())
            .field("current", &self.snapshot())
            .finish()
    }
}
