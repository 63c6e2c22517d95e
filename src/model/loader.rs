//! Model Loader Module
//! Finds a trained model on disk and loads it as a boosted-tree or generic model.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use bincode::Options;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

use super::booster::Booster;
use crate::paths::ProjectLayout;

/// Base name of the model loaded when none is given.
pub const DEFAULT_MODEL_NAME: &str = "xgboost_spy_v1";

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("{}", missing_model_message(.model_name, .expected, .models_dir))]
    NotFound {
        model_name: String,
        expected: Vec<PathBuf>,
        models_dir: PathBuf,
    },
    #[error("Failed to open model {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse model JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to deserialize model: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("Invalid boosted-tree model: {0}")]
    InvalidBooster(String),
}

fn missing_model_message(model_name: &str, expected: &[PathBuf], models_dir: &Path) -> String {
    let mut message = format!("Could not find model file '{}'. Tried:\n", model_name);
    for path in expected {
        message.push_str(&format!("  - {}\n", path.display()));
    }
    message.push_str(&format!(
        "Please ensure model file exists in {}",
        models_dir.display()
    ));
    message
}

/// Serialization family of a loaded model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Native boosted-tree JSON (`.json`).
    XgBoost,
    /// Generic serialized estimator (`.pkl`).
    Sklearn,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::XgBoost => "xgboost",
            ModelKind::Sklearn => "sklearn",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The deserialized model. `M` is the caller's generic model type.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainedModel<M> {
    XgBoost(Booster),
    Sklearn(M),
}

impl<M> TrainedModel<M> {
    pub fn kind(&self) -> ModelKind {
        match self {
            TrainedModel::XgBoost(_) => ModelKind::XgBoost,
            TrainedModel::Sklearn(_) => ModelKind::Sklearn,
        }
    }
}

/// A model plus the file it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModel<M> {
    pub model: TrainedModel<M>,
    pub path: PathBuf,
}

impl<M> LoadedModel<M> {
    pub fn kind(&self) -> ModelKind {
        self.model.kind()
    }

    pub fn into_parts(self) -> (TrainedModel<M>, ModelKind) {
        let kind = self.model.kind();
        (self.model, kind)
    }
}

/// Whether native boosted-tree models can be loaded in this build.
pub fn boosting_available() -> bool {
    cfg!(feature = "xgboost")
}

/// Searches candidate locations for a model and loads the first usable one.
pub struct ModelLoader {
    layout: ProjectLayout,
    boosting: bool,
}

impl ModelLoader {
    pub fn new(layout: ProjectLayout) -> Self {
        Self {
            layout,
            boosting: boosting_available(),
        }
    }

    /// Discover the project root from the current directory.
    pub fn discover() -> Self {
        Self::new(ProjectLayout::discover())
    }

    /// Override boosted-tree support; disabled means `.json` files are skipped.
    pub fn with_boosting(mut self, enabled: bool) -> Self {
        self.boosting = enabled;
        self
    }

    /// Paths tried for `model_name`, highest priority first.
    ///
    /// An explicit `model_path` is the only candidate. Otherwise the models
    /// directory under the project root is tried, then `models/` and
    /// `../models/` relative to the working directory.
    pub fn candidates(&self, model_name: &str, model_path: Option<&Path>) -> Vec<PathBuf> {
        if let Some(path) = model_path {
            return vec![path.to_path_buf()];
        }

        let pkl = format!("{}.pkl", model_name);
        let json = format!("{}.json", model_name);
        let models_dir = self.layout.models_dir();
        let relative = PathBuf::from("models");
        let parent_relative = PathBuf::from("..").join("models");

        vec![
            self.layout.resolve_model_path(&pkl),
            self.layout.resolve_model_path(&json),
            models_dir.join(&pkl),
            models_dir.join(&json),
            relative.join(&pkl),
            relative.join(&json),
            parent_relative.join(&pkl),
            parent_relative.join(&json),
        ]
    }

    /// Load `model_name` (or `model_path`), trying every candidate in order.
    pub fn load<M: DeserializeOwned>(
        &self,
        model_name: &str,
        model_path: Option<&Path>,
    ) -> Result<LoadedModel<M>, ModelError> {
        let candidates = self.candidates(model_name, model_path);
        self.load_from_candidates(model_name, &candidates)
    }

    /// Walk `candidates` and return the first that loads.
    ///
    /// Missing files and files that fail to load are skipped; only running
    /// out of candidates is an error.
    pub fn load_from_candidates<M: DeserializeOwned>(
        &self,
        model_name: &str,
        candidates: &[PathBuf],
    ) -> Result<LoadedModel<M>, ModelError> {
        for path in candidates {
            if !path.exists() {
                continue;
            }
            if let Some(model) = self.try_candidate(path) {
                info!("Loaded {} model from {}", model.kind(), path.display());
                return Ok(LoadedModel {
                    model,
                    path: path.clone(),
                });
            }
        }

        let models_dir = self.layout.models_dir();
        Err(ModelError::NotFound {
            model_name: model_name.to_string(),
            expected: vec![
                models_dir.join(format!("{}.pkl", model_name)),
                models_dir.join(format!("{}.json", model_name)),
            ],
            models_dir,
        })
    }

    fn try_candidate<M: DeserializeOwned>(&self, path: &Path) -> Option<TrainedModel<M>> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                if !self.boosting {
                    debug!(
                        "Skipping {}: boosted-tree support unavailable",
                        path.display()
                    );
                    return None;
                }
                match Booster::load(path) {
                    Ok(booster) => Some(TrainedModel::XgBoost(booster)),
                    Err(e) => {
                        debug!("Skipping {}: {}", path.display(), e);
                        None
                    }
                }
            }
            Some("pkl") => match load_generic::<M>(path) {
                Ok(model) => Some(TrainedModel::Sklearn(model)),
                Err(e) => {
                    debug!("Skipping {}: {}", path.display(), e);
                    None
                }
            },
            _ => {
                debug!("Skipping {}: unrecognized extension", path.display());
                None
            }
        }
    }
}

/// Decode a bincode `M`. Reads are capped at the file length, so a bogus
/// length prefix fails instead of allocating.
fn load_generic<M: DeserializeOwned>(path: &Path) -> Result<M, ModelError> {
    let io_error = |source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_error)?;
    let limit = file.metadata().map_err(io_error)?.len();
    Ok(bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(limit)
        .deserialize_from(BufReader::new(file))?)
}

/// Load a trained model, detecting its format from the files present.
///
/// `.json` files are read as boosted-tree models, `.pkl` files as a
/// bincode-serialized `M`.
///
/// # Example
/// ```no_run
/// use trading_lab::{load_trained_model, DEFAULT_MODEL_NAME};
///
/// let loaded = load_trained_model::<Vec<f64>>(DEFAULT_MODEL_NAME, None).unwrap();
/// println!("{} model from {}", loaded.kind(), loaded.path.display());
/// ```
pub fn load_trained_model<M: DeserializeOwned>(
    model_name: &str,
    model_path: Option<&Path>,
) -> Result<LoadedModel<M>, ModelError> {
    ModelLoader::discover().load(model_name, model_path)
}
