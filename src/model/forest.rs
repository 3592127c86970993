//! Majority-vote ensemble of binary decision trees.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{check_columns, Label, ModelHandle};
use crate::data::model::CellValue;
use crate::data::reconcile::FeatureMatrix;
use crate::error::{ModelInferenceError, ModelLoadError};

/// Internal split: samples with `x[feature_idx] <= threshold` go left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub feature_idx: usize,
    pub threshold: f64,
    pub left: Box<TreeNode>,
    pub right: Box<TreeNode>,
}

/// Leaf voting for `classes[class_idx]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    pub class_idx: usize,
}

/// A node in a decision tree (either internal split or leaf).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    Split(Split),
    Leaf(Leaf),
}

impl TreeNode {
    /// Leaf voting for one class.
    pub fn leaf(class_idx: usize) -> Self {
        TreeNode::Leaf(Leaf { class_idx })
    }

    /// Split on one feature.
    pub fn split(feature_idx: usize, threshold: f64, left: TreeNode, right: TreeNode) -> Self {
        TreeNode::Split(Split {
            feature_idx,
            threshold,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Walk the tree for a single sample and return the leaf's class index.
    fn predict_one(&self, x: &[f64]) -> usize {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf(leaf) => return leaf.class_idx,
                TreeNode::Split(split) => {
                    node = if x[split.feature_idx] <= split.threshold {
                        &split.left
                    } else {
                        &split.right
                    };
                }
            }
        }
    }

    /// Largest feature index and class index referenced anywhere below.
    fn max_indices(&self) -> (Option<usize>, usize) {
        let mut max_feature = None;
        let mut max_class = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                TreeNode::Leaf(leaf) => max_class = max_class.max(leaf.class_idx),
                TreeNode::Split(split) => {
                    max_feature = max_feature.max(Some(split.feature_idx));
                    stack.push(&split.left);
                    stack.push(&split.right);
                }
            }
        }
        (max_feature, max_class)
    }
}

/// A fitted tree-ensemble classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ForestClassifier {
    feature_names: Vec<String>,
    classes: Vec<Label>,
    trees: Vec<TreeNode>,
}

impl ForestClassifier {
    /// Assemble a classifier, applying the same structural checks as
    /// artifact loading.
    pub fn new(
        feature_names: Vec<String>,
        classes: Vec<Label>,
        trees: Vec<TreeNode>,
    ) -> Result<Self, ModelLoadError> {
        if feature_names.is_empty() {
            return Err(ModelLoadError::Corrupted("model has no features".into()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = feature_names.iter().find(|n| !seen.insert(n.as_str())) {
            return Err(ModelLoadError::Corrupted(format!(
                "duplicate feature name '{dup}'"
            )));
        }
        if classes.is_empty() {
            return Err(ModelLoadError::Corrupted("model has no classes".into()));
        }
        if trees.is_empty() {
            return Err(ModelLoadError::Corrupted("model has no trees".into()));
        }
        for (i, tree) in trees.iter().enumerate() {
            let (max_feature, max_class) = tree.max_indices();
            if let Some(f) = max_feature.filter(|&f| f >= feature_names.len()) {
                return Err(ModelLoadError::Corrupted(format!(
                    "tree {i} splits on feature {f} but the model has {} features",
                    feature_names.len()
                )));
            }
            if max_class >= classes.len() {
                return Err(ModelLoadError::Corrupted(format!(
                    "tree {i} votes for class {max_class} but the model has {} classes",
                    classes.len()
                )));
            }
        }
        Ok(ForestClassifier {
            feature_names,
            classes,
            trees,
        })
    }

    pub fn classes(&self) -> &[Label] {
        &self.classes
    }

    pub fn trees(&self) -> &[TreeNode] {
        &self.trees
    }

    /// Convert one row of cells into model inputs.
    fn numeric_row(&self, row_no: usize, row: &[CellValue]) -> Result<Vec<f64>, ModelInferenceError> {
        row.iter()
            .zip(&self.feature_names)
            .map(|(cell, feature)| {
                cell.as_f64().ok_or_else(|| ModelInferenceError::TypeMismatch {
                    row: row_no,
                    feature: feature.clone(),
                    found: cell.type_name(),
                    value: cell.to_string(),
                })
            })
            .collect()
    }

    /// Majority vote across trees; ties go to the lowest class index.
    fn vote(&self, x: &[f64], votes: &mut [usize]) -> usize {
        votes.iter_mut().for_each(|v| *v = 0);
        for tree in &self.trees {
            votes[tree.predict_one(x)] += 1;
        }
        let mut best = 0;
        for (class, &count) in votes.iter().enumerate() {
            if count > votes[best] {
                best = class;
            }
        }
        best
    }
}

impl ModelHandle for ForestClassifier {
    fn expected_features(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<Label>, ModelInferenceError> {
        check_columns(&self.feature_names, matrix)?;
        if matrix.n_rows() == 0 {
            return Err(ModelInferenceError::EmptyInput);
        }

        // Convert everything first so a bad cell fails the whole batch.
        let inputs = matrix
            .rows()
            .iter()
            .enumerate()
            .map(|(row_no, row)| self.numeric_row(row_no, row))
            .collect::<Result<Vec<_>, _>>()?;

        let mut votes = vec![0usize; self.classes.len()];
        Ok(inputs
            .iter()
            .map(|x| self.classes[self.vote(x, &mut votes)].clone())
            .collect())
    }
}
