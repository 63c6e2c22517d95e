//! Trading Lab - shared project utilities
//!
//! Project root discovery, YAML configuration with defaults, raw/processed
//! CSV loading and trained model loading.

pub mod config;
pub mod data;
pub mod logger;
pub mod model;
pub mod paths;

pub use config::{get_config_value, load_config, ConfigError, LabConfig};
pub use data::{load_processed_data, load_raw_data, LoaderError, RawDataQuery};
pub use model::{load_trained_model, LoadedModel, ModelError, ModelKind, DEFAULT_MODEL_NAME};
pub use paths::{find_data_file, get_project_root, resolve_data_path, resolve_model_path, DataKind};
