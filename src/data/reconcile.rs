use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;

use super::model::{CellValue, TabularDataset};
use crate::error::{FeatureTypeError, InvalidCell, MissingFeatureError};

// ---------------------------------------------------------------------------
// FeatureMatrix: a dataset projected onto a model's feature contract
// ---------------------------------------------------------------------------

/// Rows of a [`TabularDataset`] restricted to exactly the contract's features,
/// in the contract's order. Cells are carried over untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    feature_names: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl FeatureMatrix {
    /// Build a matrix directly. Row widths are not checked here;
    /// [`check_columns`](crate::model::check_columns) rejects ragged rows
    /// before a model reads them.
    pub fn new(feature_names: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        FeatureMatrix {
            feature_names,
            rows,
        }
    }

    /// Column names, in contract order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Render the first `n` rows as a text table for diagnostics.
    pub fn head(&self, n: usize) -> String {
        let fields: Vec<Field> = self
            .feature_names
            .iter()
            .map(|name| Field::new(name, DataType::Utf8, false))
            .collect();
        let columns: Vec<ArrayRef> = (0..self.n_features())
            .map(|col| {
                let values: Vec<String> = self
                    .rows
                    .iter()
                    .take(n)
                    .map(|row| row.get(col).map(ToString::to_string).unwrap_or_default())
                    .collect();
                Arc::new(StringArray::from(values)) as ArrayRef
            })
            .collect();

        RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
            .and_then(|batch| pretty_format_batches(&[batch]))
            .map(|table| table.to_string())
            .unwrap_or_else(|e| format!("<unprintable matrix: {e}>"))
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Project `dataset` onto `contract`.
///
/// Columns outside the contract are dropped. Every contract feature absent
/// from the dataset is reported, in contract order. Row count and row order
/// are preserved and no cell is coerced.
pub fn reconcile(
    dataset: &TabularDataset,
    contract: &[String],
) -> Result<FeatureMatrix, MissingFeatureError> {
    let mut positions = Vec::with_capacity(contract.len());
    let mut missing = Vec::new();
    for name in contract {
        match dataset.column_index(name) {
            Some(idx) => positions.push(idx),
            None => missing.push(name.clone()),
        }
    }
    if !missing.is_empty() {
        return Err(MissingFeatureError { missing });
    }

    let rows = dataset
        .rows()
        .iter()
        .map(|row| positions.iter().map(|&idx| row[idx].clone()).collect())
        .collect();

    Ok(FeatureMatrix::new(contract.to_vec(), rows))
}

/// Strict schema check: every cell must have a numeric reading.
/// Collects all offending cells rather than stopping at the first.
pub fn validate_numeric(matrix: &FeatureMatrix) -> Result<(), FeatureTypeError> {
    let cells: Vec<InvalidCell> = matrix
        .rows()
        .iter()
        .enumerate()
        .flat_map(|(row, cells)| {
            cells
                .iter()
                .zip(matrix.feature_names())
                .filter(|(cell, _)| cell.as_f64().is_none())
                .map(move |(cell, feature)| InvalidCell {
                    row,
                    feature: feature.clone(),
                    found: cell.type_name(),
                })
        })
        .collect();

    if cells.is_empty() {
        Ok(())
    } else {
        Err(FeatureTypeError { cells })
    }
}
