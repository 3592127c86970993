//! Error taxonomy for model loading and the inference pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to bring a model artifact into memory. Fatal at startup.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    /// Artifact file absent or unreadable
    #[error("model artifact {path} could not be read: {source}")]
    Missing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Artifact bytes do not describe a valid model
    #[error("model artifact is corrupted: {0}")]
    Corrupted(String),

    /// Artifact written by an unsupported serializer
    #[error("incompatible model artifact: found {found}, supported {supported}")]
    IncompatibleVersion { found: String, supported: String },
}

/// The uploaded bytes could not be read as a table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatasetDecodeError {
    #[error("dataset is empty")]
    Empty,

    #[error("dataset has no header row")]
    MissingHeader,

    #[error("column {position} has an empty name")]
    EmptyColumnName { position: usize },

    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("row {row} has {found} fields, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row} does not share the column set of the first row (column '{column}')")]
    InconsistentRow { row: usize, column: String },

    #[error("malformed {format} input: {message}")]
    Malformed {
        format: &'static str,
        message: String,
    },
}

/// Required features absent from the upload. Lists every missing name in
/// contract order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required features: {}", .missing.join(", "))]
pub struct MissingFeatureError {
    pub missing: Vec<String>,
}

/// The model refused the reconciled matrix.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelInferenceError {
    #[error("matrix has {found} columns, model expects {expected}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("column {position} is '{found}', model expects '{expected}'")]
    ColumnMismatch {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("row {row}, feature '{feature}': cannot use {found} value '{value}' as a number")]
    TypeMismatch {
        row: usize,
        feature: String,
        found: &'static str,
        value: String,
    },

    #[error("row {row} has {found} values, model expects {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("cannot predict on an empty matrix")]
    EmptyInput,
}

/// A single non-numeric cell found by strict schema validation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidCell {
    pub row: usize,
    pub feature: String,
    pub found: &'static str,
}

/// Strict schema validation rejected one or more cells.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} non-numeric feature value(s): {}", .cells.len(), summarize_cells(.cells))]
pub struct FeatureTypeError {
    pub cells: Vec<InvalidCell>,
}

const MAX_REPORTED_CELLS: usize = 20;

fn summarize_cells(cells: &[InvalidCell]) -> String {
    let mut parts: Vec<String> = cells
        .iter()
        .take(MAX_REPORTED_CELLS)
        .map(|c| format!("row {} '{}' ({})", c.row, c.feature, c.found))
        .collect();
    if cells.len() > MAX_REPORTED_CELLS {
        parts.push(format!("and {} more", cells.len() - MAX_REPORTED_CELLS));
    }
    parts.join(", ")
}

/// Any per-request failure of the inference pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("failed to decode dataset: {0}")]
    DatasetDecode(#[from] DatasetDecodeError),

    #[error(transparent)]
    MissingFeature(#[from] MissingFeatureError),

    #[error(transparent)]
    FeatureType(#[from] FeatureTypeError),

    #[error("model inference failed: {0}")]
    ModelInference(#[from] ModelInferenceError),
}

impl InferenceError {
    /// Machine-readable error kind for the response envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            InferenceError::DatasetDecode(_) => "dataset_decode",
            InferenceError::MissingFeature(_) => "missing_feature",
            InferenceError::FeatureType(_) => "feature_type",
            InferenceError::ModelInference(_) => "model_inference",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_feature_lists_every_name() {
        let err = MissingFeatureError {
            missing: vec!["feature1".into(), "feature2".into()],
        };
        assert_eq!(
            err.to_string(),
            "missing required features: feature1, feature2"
        );
    }

    #[test]
    fn kinds_are_stable() {
        assert_eq!(
            InferenceError::from(DatasetDecodeError::Empty).kind(),
            "dataset_decode"
        );
        assert_eq!(
            InferenceError::from(MissingFeatureError { missing: vec![] }).kind(),
            "missing_feature"
        );
        assert_eq!(
            InferenceError::from(FeatureTypeError { cells: vec![] }).kind(),
            "feature_type"
        );
        assert_eq!(
            InferenceError::from(ModelInferenceError::EmptyInput).kind(),
            "model_inference"
        );
    }

    #[test]
    fn feature_type_message_is_capped() {
        let cells = (0..25)
            .map(|row| InvalidCell {
                row,
                feature: "f".into(),
                found: "text",
            })
            .collect();
        let msg = FeatureTypeError { cells }.to_string();
        assert!(msg.starts_with("25 non-numeric feature value(s): row 0 'f' (text)"));
        assert!(msg.ends_with("and 5 more"));
    }

    #[test]
    fn model_load_error_is_std_error() {
        let error: Box<dyn std::error::Error> =
            Box::new(ModelLoadError::Corrupted("bad json".to_string()));
        assert_eq!(error.to_string(), "model artifact is corrupted: bad json");
    }
}
