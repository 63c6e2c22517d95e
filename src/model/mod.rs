//! Model module - trained model discovery and loading

mod booster;
mod loader;

pub use booster::Booster;
pub use loader::{
    boosting_available, load_trained_model, LoadedModel, ModelError, ModelKind, ModelLoader,
    TrainedModel, DEFAULT_MODEL_NAME,
};
