//! Inference request path.
//!
//! ```text
//!   raw bytes ──decode──▶ TabularDataset ──reconcile──▶ FeatureMatrix
//!                                                           │
//!   Response ◀──respond── PredictionResult ◀──predict───────┘
//! ```
//!
//! Each stage returns early on failure; a request yields either a full
//! prediction list or exactly one error.

pub mod handler;
pub mod response;

pub use handler::{InferenceHandler, PredictionResult, SchemaPolicy};
pub use response::{respond, ErrorEnvelope, Response};
