//! High-level configuration structure for bale.
//!
//! This module provides the root `BaleConfig` struct and profile merging logic.
//! For file discovery, see the `discovery` module.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bundle::BundleOptions;
use crate::error::{ConfigError, Result as ConfigResult};
use crate::watch::WatchOptions;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaleConfig {
    #[serde(default)]
    pub bundle: BundleOptions,

    #[serde(default)]
    pub watch: WatchOptions,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub profiles: HashMap<String, ProfileConfig>,
}

/// Partial overrides applied on top of the base config by `materialize_profile`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default)]
    pub bundle: Value,

    #[serde(default)]
    pub watch: Value,
}

impl BaleConfig {
    /// Create from serde_json::Value (for programmatic config)
    ///
    /// # Example
    ///
    /// ```
    /// use bale_config::BaleConfig;
    /// use serde_json::json;
    ///
    /// let value = json!({
    ///     "bundle": {
    ///         "entry": { "main": "src/main.js" },
    ///         "mode": "production"
    ///     }
    /// });
    ///
    /// let config = BaleConfig::from_value(value).unwrap();
    /// assert!(config.bundle.mode.is_production());
    /// ```
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: Some(e.to_string()),
        })
    }

    /// Convert to serde_json::Value
    pub fn to_value(&self) -> ConfigResult<Value> {
        serde_json::to_value(self).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: Some(e.to_string()),
        })
    }

    /// Apply the named profile's overrides. `None` returns the config unchanged.
    pub fn materialize_profile(mut self, profile: Option<&str>) -> ConfigResult<Self> {
        let Some(name) = profile else {
            return Ok(self);
        };

        let profile_cfg = self
            .profiles
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))?;

        if !profile_cfg.bundle.is_null() {
            self.bundle = merged(&self.bundle, &profile_cfg.bundle)?;
        }
        if !profile_cfg.watch.is_null() {
            self.watch = merged(&self.watch, &profile_cfg.watch)?;
        }

        tracing::debug!(profile = name, "applied config profile");
        Ok(self)
    }

    /// Deep-merge a value shaped like the config file over this config.
    pub fn apply_overrides(mut self, overrides: &Value) -> ConfigResult<Self> {
        if let Some(bundle) = overrides.get("bundle") {
            self.bundle = merged(&self.bundle, bundle)?;
        }
        if let Some(watch) = overrides.get("watch") {
            self.watch = merged(&self.watch, watch)?;
        }
        Ok(self)
    }
}

fn merged<T>(base: &T, update: &Value) -> ConfigResult<T>
where
    T: Serialize + serde::de::DeserializeOwned,
{
    let mut value =
        serde_json::to_value(base).map_err(|err| ConfigError::InvalidProfileOverride {
            message: err.to_string(),
        })?;
    merge_values(&mut value, update);
    serde_json::from_value(value).map_err(|err| ConfigError::InvalidProfileOverride {
        message: err.to_string(),
    })
}

/// Deep-merge `update` into `target`. Objects merge key by key; anything else replaces.
pub fn merge_values(target: &mut Value, update: &Value) {
    match (target, update) {
        (Value::Object(target_map), Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_values(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (target_slot, _) => {
            *target_slot = update.clone();
        }
    }
}
