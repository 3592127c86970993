//! Tabular inference: decode an uploaded table, reconcile it against a fitted
//! classifier's feature contract, and predict one label per row.

pub mod batch;
pub mod config;
pub mod data;
pub mod error;
pub mod inference;
pub mod model;

pub use data::loader::DataFormat;
pub use data::model::{CellValue, TabularDataset};
pub use data::reconcile::FeatureMatrix;
pub use error::{
    DatasetDecodeError, FeatureTypeError, InferenceError, MissingFeatureError,
    ModelInferenceError, ModelLoadError,
};
pub use inference::{InferenceHandler, PredictionResult, Response, SchemaPolicy};
pub use model::{load_model, ForestClassifier, Label, ModelHandle};
