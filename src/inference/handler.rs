use std::sync::Arc;

use log::{debug, warn};
use serde::Serialize;

use crate::data::loader::{self, DataFormat};
use crate::data::reconcile::{self, FeatureMatrix};
use crate::error::InferenceError;
use crate::model::{Label, ModelHandle};

use super::response::{respond, Response};

/// Rows shown in the debug dump of each reconciled request.
const HEAD_ROWS: usize = 5;

/// How cell types are checked before prediction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchemaPolicy {
    /// Cells pass through untouched; the model reports type problems.
    #[default]
    Lenient,
    /// Every reconciled cell must be numeric before the model is called.
    Strict,
}

/// Labels for one request, index-aligned with its input rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub predictions: Vec<Label>,
}

/// Runs the decode → reconcile → predict pipeline against one shared model.
///
/// Cheap to clone; clones share the same model.
#[derive(Clone)]
pub struct InferenceHandler {
    model: Arc<dyn ModelHandle>,
    policy: SchemaPolicy,
}

impl InferenceHandler {
    pub fn new(model: Arc<dyn ModelHandle>) -> Self {
        Self {
            model,
            policy: SchemaPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SchemaPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> SchemaPolicy {
        self.policy
    }

    pub fn model(&self) -> &dyn ModelHandle {
        self.model.as_ref()
    }

    /// Predict on an upload whose format is sniffed from its bytes.
    pub fn handle_predict_request(&self, raw: &[u8]) -> Result<PredictionResult, InferenceError> {
        self.handle_predict_request_as(raw, DataFormat::sniff(raw))
    }

    /// Predict on an upload of a known format.
    pub fn handle_predict_request_as(
        &self,
        raw: &[u8],
        format: DataFormat,
    ) -> Result<PredictionResult, InferenceError> {
        let result = self.run(raw, format);
        if let Err(e) = &result {
            warn!("Prediction request failed ({}): {e}", e.kind());
        }
        result
    }

    /// Full request/response cycle: never fails, always yields a response.
    pub fn respond(&self, raw: &[u8], format: Option<DataFormat>) -> Response {
        let format = format.unwrap_or_else(|| DataFormat::sniff(raw));
        respond(self.handle_predict_request_as(raw, format))
    }

    fn run(&self, raw: &[u8], format: DataFormat) -> Result<PredictionResult, InferenceError> {
        let dataset = loader::decode(raw, format)?;
        debug!(
            "Decoded {} rows with columns {:?}",
            dataset.len(),
            dataset.column_names()
        );

        let matrix = reconcile::reconcile(&dataset, self.model.expected_features())?;
        debug!("Reconciled matrix head:\n{}", matrix.head(HEAD_ROWS));

        if self.policy == SchemaPolicy::Strict {
            reconcile::validate_numeric(&matrix)?;
        }

        let predictions = self.predict(&matrix)?;
        Ok(PredictionResult { predictions })
    }

    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<Label>, InferenceError> {
        let predictions = self.model.predict(matrix)?;
        debug_assert_eq!(predictions.len(), matrix.n_rows());
        Ok(predictions)
    }
}
