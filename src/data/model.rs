use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::DatasetDecodeError;

// ---------------------------------------------------------------------------
// CellValue: a single cell of an uploaded table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common dataframe dtypes.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Interpret the value as an `f64` for numeric models.
    ///
    /// Booleans count as 0/1. Text, nulls and non-finite floats have no
    /// numeric reading.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) if v.is_finite() => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Short dtype name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Text(_) => "text",
            CellValue::Integer(_) => "integer",
            CellValue::Float(_) => "float",
            CellValue::Bool(_) => "bool",
            CellValue::Null => "null",
        }
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Integer(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

// ---------------------------------------------------------------------------
// TabularDataset: the decoded upload
// ---------------------------------------------------------------------------

/// A decoded table. Every row holds one cell per entry of `column_names`,
/// in the same order.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularDataset {
    column_names: Vec<String>,
    rows: Vec<Vec<CellValue>>,
    index: HashMap<String, usize>,
}

impl TabularDataset {
    /// Build a dataset from a header and positional rows.
    ///
    /// Rejects empty or duplicate column names and rows whose width differs
    /// from the header.
    pub fn new(
        column_names: Vec<String>,
        rows: Vec<Vec<CellValue>>,
    ) -> Result<Self, DatasetDecodeError> {
        let mut index = HashMap::with_capacity(column_names.len());
        for (i, name) in column_names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(DatasetDecodeError::EmptyColumnName { position: i });
            }
            if index.insert(name.clone(), i).is_some() {
                return Err(DatasetDecodeError::DuplicateColumn(name.clone()));
            }
        }
        for (row_no, row) in rows.iter().enumerate() {
            if row.len() != column_names.len() {
                return Err(DatasetDecodeError::RaggedRow {
                    row: row_no,
                    expected: column_names.len(),
                    found: row.len(),
                });
            }
        }
        Ok(TabularDataset {
            column_names,
            rows,
            index,
        })
    }

    /// Build a dataset from row mappings. All rows must share one column set;
    /// the first row's key order becomes the header.
    ///
    /// With no records there is no header either, so an empty list is
    /// [`DatasetDecodeError::Empty`], the same as an empty file.
    pub fn from_ordered_records(
        records: Vec<Vec<(String, CellValue)>>,
    ) -> Result<Self, DatasetDecodeError> {
        let Some(first) = records.first() else {
            return Err(DatasetDecodeError::Empty);
        };
        let column_names: Vec<String> = first.iter().map(|(k, _)| k.clone()).collect();

        let mut rows = Vec::with_capacity(records.len());
        for (row_no, record) in records.into_iter().enumerate() {
            let mut cells: BTreeMap<String, CellValue> = record.into_iter().collect();
            let mut row = Vec::with_capacity(column_names.len());
            for name in &column_names {
                match cells.remove(name) {
                    Some(v) => row.push(v),
                    None => {
                        return Err(DatasetDecodeError::InconsistentRow {
                            row: row_no,
                            column: name.clone(),
                        })
                    }
                }
            }
            if let Some((extra, _)) = cells.into_iter().next() {
                return Err(DatasetDecodeError::InconsistentRow {
                    row: row_no,
                    column: extra,
                });
            }
            rows.push(row);
        }
        Self::new(column_names, rows)
    }

    /// Ordered list of column names as they appeared in the upload.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Position of a column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Positional rows.
    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Look up one cell by row number and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&CellValue> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
