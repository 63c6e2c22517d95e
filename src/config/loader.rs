//! Config Loader Module
//! Locates the YAML config, merges it over the defaults and answers dot-path lookups.

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use thiserror::Error;
use tracing::{debug, info};

use super::defaults::{default_config, LabConfig};
use crate::paths::ProjectLayout;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config {} must contain a mapping at the top level", .path.display())]
    NotMapping { path: PathBuf },
}

/// Loads configuration relative to a project layout.
pub struct ConfigLoader {
    layout: ProjectLayout,
}

impl ConfigLoader {
    pub fn new(layout: ProjectLayout) -> Self {
        Self { layout }
    }

    /// Discover the project root from the current directory.
    pub fn discover() -> Self {
        Self::new(ProjectLayout::discover())
    }

    /// First existing config file among the standard locations.
    pub fn locate(&self) -> Option<PathBuf> {
        self.layout
            .config_candidates()
            .into_iter()
            .find(|path| path.exists())
    }

    /// Load the config at `path`, or at the first standard location when `None`.
    ///
    /// Missing files and empty documents yield the defaults unchanged.
    pub fn load(&self, path: Option<&Path>) -> Result<Value, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match self.locate() {
                Some(found) => found,
                None => {
                    debug!(
                        "No config file under {}, using defaults",
                        self.layout.root().display()
                    );
                    return Ok(default_config());
                }
            },
        };

        if !path.exists() {
            debug!("Config {} does not exist, using defaults", path.display());
            return Ok(default_config());
        }

        let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let user: Value = serde_yaml::from_str(&raw)?;

        match user {
            _ if is_blank(&user) => {
                debug!("Config {} is empty, using defaults", path.display());
                Ok(default_config())
            }
            Value::Mapping(_) => {
                info!("Loaded config from {}", path.display());
                Ok(merge_config(&default_config(), &user))
            }
            _ => Err(ConfigError::NotMapping { path }),
        }
    }

    /// Load and deserialize into [`LabConfig`].
    pub fn load_typed(&self, path: Option<&Path>) -> Result<LabConfig, ConfigError> {
        let merged = self.load(path)?;
        Ok(serde_yaml::from_value(merged)?)
    }
}

/// Documents that carry no settings: null, `false`, zero, and empty strings
/// or sequences.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Sequence(seq) => seq.is_empty(),
        _ => false,
    }
}

/// Load configuration from YAML, searching the project root when `config_path` is `None`.
///
/// Probed locations, in order: `config.yaml`, `config/config.yaml`,
/// `config/config.example.yaml`.
///
/// # Example
/// ```no_run
/// let config = trading_lab::load_config(None).unwrap();
/// let symbol = trading_lab::get_config_value(&config, "trading.symbol", "SPY".into());
/// ```
pub fn load_config(config_path: Option<&Path>) -> Result<Value, ConfigError> {
    ConfigLoader::discover().load(config_path)
}

/// Like [`load_config`] but returns the typed settings.
pub fn load_typed_config(config_path: Option<&Path>) -> Result<LabConfig, ConfigError> {
    ConfigLoader::discover().load_typed(config_path)
}

/// Borrow the value at a dot-separated path such as `"trading.symbol"`.
pub fn lookup<'a>(config: &'a Value, key_path: &str) -> Option<&'a Value> {
    key_path
        .split('.')
        .try_fold(config, |value, key| value.as_mapping()?.get(key))
}

/// Value at a dot-separated path, or `default` when any segment is missing.
pub fn get_config_value(config: &Value, key_path: &str, default: Value) -> Value {
    lookup(config, key_path).cloned().unwrap_or(default)
}

/// Recursively merge `user` over `default` and return the result.
///
/// Nested mappings merge key by key; any other user value replaces the
/// default wholesale. Neither input is modified.
pub fn merge_config(default: &Value, user: &Value) -> Value {
    let mut result = default.clone();
    deep_merge(&mut result, user);
    result
}

fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                if let Some(base_val) = base_map.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_map.insert(key.clone(), overlay_val.clone());
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}
