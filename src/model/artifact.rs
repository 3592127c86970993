//! On-disk model artifact.
//!
//! A single JSON document:
//!
//! ```json
//! {
//!   "format": "rusty-forest",
//!   "version": 1,
//!   "feature_names": ["feature1", "feature2"],
//!   "classes": [0, 1],
//!   "trees": [
//!     { "split": { "feature_idx": 0, "threshold": 50.0,
//!                  "left":  { "leaf": { "class_idx": 0 } },
//!                  "right": { "leaf": { "class_idx": 1 } } } }
//!   ]
//! }
//! ```
//!
//! The `format`/`version` pair is checked before the body is decoded, so an
//! artifact from a newer writer is reported as incompatible rather than
//! corrupted.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use super::forest::{ForestClassifier, TreeNode};
use super::{Label, ModelHandle};
use crate::error::ModelLoadError;

/// Format tag written into every artifact.
pub const ARTIFACT_FORMAT: &str = "rusty-forest";

/// Current artifact version.
pub const ARTIFACT_VERSION: u32 = 1;

#[derive(Deserialize)]
struct Header {
    format: String,
    version: u32,
}

#[derive(Serialize, Deserialize)]
struct Artifact {
    format: String,
    version: u32,
    feature_names: Vec<String>,
    classes: Vec<Label>,
    trees: Vec<TreeNode>,
}

/// Decode an artifact from bytes.
pub fn model_from_slice(bytes: &[u8]) -> Result<ForestClassifier, ModelLoadError> {
    let header: Header = serde_json::from_slice(bytes)
        .map_err(|e| ModelLoadError::Corrupted(format!("unreadable header: {e}")))?;
    if header.format != ARTIFACT_FORMAT || header.version != ARTIFACT_VERSION {
        return Err(ModelLoadError::IncompatibleVersion {
            found: format!("{} v{}", header.format, header.version),
            supported: format!("{ARTIFACT_FORMAT} v{ARTIFACT_VERSION}"),
        });
    }

    let artifact: Artifact =
        serde_json::from_slice(bytes).map_err(|e| ModelLoadError::Corrupted(e.to_string()))?;
    ForestClassifier::new(artifact.feature_names, artifact.classes, artifact.trees)
}

/// Load a model artifact from disk.
pub fn load_model(path: &Path) -> Result<ForestClassifier, ModelLoadError> {
    let bytes = std::fs::read(path).map_err(|source| ModelLoadError::Missing {
        path: path.to_path_buf(),
        source,
    })?;
    let model = model_from_slice(&bytes)?;
    info!(
        "Loaded model from {}: {} features {:?}, {} classes, {} trees",
        path.display(),
        model.expected_features().len(),
        model.expected_features(),
        model.classes().len(),
        model.trees().len()
    );
    Ok(model)
}

/// Write a model artifact as pretty-printed JSON.
pub fn save_model(model: &ForestClassifier, path: &Path) -> std::io::Result<()> {
    let artifact = Artifact {
        format: ARTIFACT_FORMAT.to_string(),
        version: ARTIFACT_VERSION,
        feature_names: model.expected_features().to_vec(),
        classes: model.classes().to_vec(),
        trees: model.trees().to_vec(),
    };
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &artifact)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> ForestClassifier {
        ForestClassifier::new(
            vec!["feature1".into(), "feature2".into()],
            vec![Label::Int(0), Label::Int(1)],
            vec![TreeNode::split(0, 50.0, TreeNode::leaf(0), TreeNode::leaf(1))],
        )
        .unwrap()
    }

    #[test]
    fn saved_artifact_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        save_model(&model(), &path).unwrap();
        assert_eq!(load_model(&path).unwrap(), model());
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_model(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ModelLoadError::Missing { .. }));
    }

    #[test]
    fn garbage_is_corrupted() {
        let err = model_from_slice(b"\x80\x04\x95 pickle bytes").unwrap_err();
        assert!(matches!(err, ModelLoadError::Corrupted(_)));
    }

    #[test]
    fn wrong_version_is_incompatible() {
        let err = model_from_slice(
            br#"{"format": "rusty-forest", "version": 7, "feature_names": []}"#,
        )
        .unwrap_err();
        match err {
            ModelLoadError::IncompatibleVersion { found, supported } => {
                assert_eq!(found, "rusty-forest v7");
                assert_eq!(supported, "rusty-forest v1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn foreign_format_is_incompatible() {
        let err = model_from_slice(br#"{"format": "sklearn-pickle", "version": 1}"#).unwrap_err();
        assert!(matches!(err, ModelLoadError::IncompatibleVersion { .. }));
    }

    #[test]
    fn bad_body_is_corrupted() {
        let err = model_from_slice(
            br#"{"format": "rusty-forest", "version": 1, "feature_names": ["a"], "classes": [0], "trees": "oops"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ModelLoadError::Corrupted(_)));
    }
}
