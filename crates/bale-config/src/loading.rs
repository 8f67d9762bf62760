//! Layered configuration loading.
//!
//! Priority: overrides (CLI) > environment variables > config file > defaults

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Serialized};
use serde_json::Value;

use crate::config::BaleConfig;
use crate::discovery::{ConfigDiscovery, read_config_value};
use crate::error::{ConfigError, Result};

pub const ENV_PREFIX: &str = "BALE_";

/// Builds a [`BaleConfig`] from every configuration source.
///
/// Environment keys use `__` as the nesting separator, e.g.
/// `BALE_BUNDLE__MODE=production` or `BALE_WATCH__DEBOUNCE_MS=250`.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    root: PathBuf,
    config_path: Option<PathBuf>,
    profile: Option<String>,
    overrides: Option<Value>,
    env_prefix: String,
}

impl ConfigLoader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            config_path: None,
            profile: None,
            overrides: None,
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Use this file instead of discovering one under the root.
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    /// Highest-priority layer, shaped like the config file.
    pub fn overrides(mut self, overrides: Value) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn load(&self) -> Result<BaleConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(BaleConfig::default()));
        let mut layers = Vec::new();

        let config_file = match &self.config_path {
            Some(path) => Some(self.root.join(path)),
            None => ConfigDiscovery::new(&self.root).find(),
        };

        if let Some(path) = &config_file {
            tracing::debug!(path = %path.display(), "loading config file");
            let value = read_config_value(path)?;
            figment = figment.merge(Serialized::defaults(&value));
            layers.push(value);
        }

        figment = figment.merge(Env::prefixed(&self.env_prefix).split("__"));

        if let Some(overrides) = &self.overrides {
            figment = figment.merge(Serialized::defaults(overrides));
            layers.push(overrides.clone());
        }

        let mut config: BaleConfig = figment.extract().map_err(|e| ConfigError::InvalidValue {
            field: "configuration".to_string(),
            hint: Some(e.to_string()),
        })?;

        restore_entry_order(&mut config, &layers);

        if config.bundle.root.is_none() {
            let root = config_file
                .as_deref()
                .and_then(Path::parent)
                .unwrap_or(self.root.as_path());
            config.bundle.root = Some(root.to_path_buf());
        }

        let config = config.materialize_profile(self.profile.as_deref())?;
        match (&self.overrides, &self.profile) {
            // Overrides outrank the profile as well.
            (Some(overrides), Some(_)) => config.apply_overrides(overrides),
            _ => Ok(config),
        }
    }
}

/// Figment stores tables sorted by key; entry order decides chunk order, so
/// put entries back in the order the layers declared them.
fn restore_entry_order(config: &mut BaleConfig, layers: &[Value]) {
    let mut order: Vec<&str> = Vec::new();
    for layer in layers {
        if let Some(Value::Object(entries)) = layer.pointer("/bundle/entry") {
            for name in entries.keys() {
                if !order.contains(&name.as_str()) {
                    order.push(name);
                }
            }
        }
    }

    let rank = |name: &str| {
        order
            .iter()
            .position(|known| *known == name)
            .unwrap_or(usize::MAX)
    };
    config
        .bundle
        .entry
        .sort_by(|a, _, b, _| rank(a).cmp(&rank(b)));
}
