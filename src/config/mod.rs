//! Config module - YAML loading with defaults

mod defaults;
mod loader;

pub use defaults::{
    default_config, BacktestSettings, FeatureSettings, LabConfig, ModelSettings, TradingSettings,
};
pub use loader::{
    get_config_value, load_config, load_typed_config, lookup, merge_config, ConfigError,
    ConfigLoader,
};
