//! Transport-agnostic response mapping.

use serde::Serialize;
use serde_json::{json, Value};

use super::handler::PredictionResult;
use crate::error::InferenceError;

pub const STATUS_OK: u16 = 200;

/// Every per-request failure shares one status; client and server faults are
/// not distinguished.
pub const STATUS_ERROR: u16 = 500;

/// Body of a failed request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub kind: &'static str,
}

impl From<&InferenceError> for ErrorEnvelope {
    fn from(err: &InferenceError) -> Self {
        ErrorEnvelope {
            error: err.to_string(),
            kind: err.kind(),
        }
    }
}

/// Status code plus JSON body, ready for any transport to send.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Map a pipeline outcome onto the response contract.
pub fn respond(result: Result<PredictionResult, InferenceError>) -> Response {
    match result {
        Ok(result) => Response {
            status: STATUS_OK,
            body: json!({ "predictions": result.predictions }),
        },
        Err(err) => Response {
            status: STATUS_ERROR,
            body: json!(ErrorEnvelope::from(&err)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MissingFeatureError;
    use crate::model::Label;

    #[test]
    fn success_body() {
        let resp = respond(Ok(PredictionResult {
            predictions: vec![Label::Int(1), Label::Int(0)],
        }));
        assert!(resp.is_success());
        assert_eq!(resp.body.to_string(), r#"{"predictions":[1,0]}"#);
    }

    #[test]
    fn error_body() {
        let resp = respond(Err(MissingFeatureError {
            missing: vec!["feature2".into()],
        }
        .into()));
        assert!(!resp.is_success());
        assert_eq!(resp.status, STATUS_ERROR);
        assert_eq!(
            resp.body,
            json!({
                "error": "missing required features: feature2",
                "kind": "missing_feature",
            })
        );
    }
}
