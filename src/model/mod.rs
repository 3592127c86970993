//! Model handles: the fitted classifier seam the inference pipeline reads
//! from, plus the shipped tree-ensemble implementation and its artifact
//! format.

pub mod artifact;
pub mod forest;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::reconcile::FeatureMatrix;
use crate::error::ModelInferenceError;

pub use artifact::{load_model, model_from_slice, save_model};
pub use forest::{ForestClassifier, TreeNode};

/// A predicted class label. Serializes as a bare JSON number or string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Int(i64),
    Text(String),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Int(i) => write!(f, "{i}"),
            Label::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Label {
    fn from(v: i64) -> Self {
        Label::Int(v)
    }
}

impl From<&str> for Label {
    fn from(v: &str) -> Self {
        Label::Text(v.to_string())
    }
}

/// A loaded, fitted classifier.
///
/// Implementations are immutable after construction, so one instance can be
/// shared across threads and called concurrently.
pub trait ModelHandle: Send + Sync {
    /// Feature names the model was fitted on, in fit order. Stable for the
    /// lifetime of the instance.
    fn expected_features(&self) -> &[String];

    /// One label per matrix row, in row order.
    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<Label>, ModelInferenceError>;
}

/// Check that `matrix` carries exactly `expected` columns, in order, and
/// that every row holds one value per column.
pub fn check_columns(expected: &[String], matrix: &FeatureMatrix) -> Result<(), ModelInferenceError> {
    let found = matrix.feature_names();
    if found.len() != expected.len() {
        return Err(ModelInferenceError::ShapeMismatch {
            expected: expected.len(),
            found: found.len(),
        });
    }
    if let Some((position, (e, f))) = expected
        .iter()
        .zip(found)
        .enumerate()
        .find(|(_, (e, f))| e != f)
    {
        return Err(ModelInferenceError::ColumnMismatch {
            position,
            expected: e.clone(),
            found: f.clone(),
        });
    }
    if let Some((row, cells)) = matrix
        .rows()
        .iter()
        .enumerate()
        .find(|(_, cells)| cells.len() != expected.len())
    {
        return Err(ModelInferenceError::RaggedRow {
            row,
            expected: expected.len(),
            found: cells.len(),
        });
    }
    Ok(())
}
