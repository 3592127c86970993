use std::sync::Arc;

use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
};
use arrow::datatypes::DataType;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, TabularDataset};
use crate::error::DatasetDecodeError;

const PARQUET_MAGIC: &[u8; 4] = b"PAR1";

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Wire format of an uploaded dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    /// Header row with column names, then one row per record.
    Csv,
    /// `[{ "col": value, ... }, ...]`, the `orient='records'` layout.
    Json,
    /// Flat Parquet file with scalar columns.
    Parquet,
}

impl DataFormat {
    /// Guess the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" | "txt" => Some(DataFormat::Csv),
            "json" => Some(DataFormat::Json),
            "parquet" | "pq" => Some(DataFormat::Parquet),
            _ => None,
        }
    }

    /// Guess the format from the leading bytes. Anything that is neither
    /// Parquet nor a JSON array is read as CSV.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(PARQUET_MAGIC) {
            return DataFormat::Parquet;
        }
        let first = bytes.iter().copied().find(|b| !b.is_ascii_whitespace());
        if first == Some(b'[') {
            DataFormat::Json
        } else {
            DataFormat::Csv
        }
    }

    fn name(self) -> &'static str {
        match self {
            DataFormat::Csv => "CSV",
            DataFormat::Json => "JSON",
            DataFormat::Parquet => "Parquet",
        }
    }
}

/// Decode an uploaded byte stream into a [`TabularDataset`].
pub fn decode(bytes: &[u8], format: DataFormat) -> Result<TabularDataset, DatasetDecodeError> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(DatasetDecodeError::Empty);
    }
    match format {
        DataFormat::Csv => decode_csv(bytes),
        DataFormat::Json => decode_json(bytes),
        DataFormat::Parquet => decode_parquet(bytes),
    }
}

fn malformed(format: DataFormat, err: impl std::fmt::Display) -> DatasetDecodeError {
    DatasetDecodeError::Malformed {
        format: format.name(),
        message: err.to_string(),
    }
}

// ---------------------------------------------------------------------------
// CSV decoder
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, every following row one record.
/// Cell dtypes are guessed per cell.
fn decode_csv(bytes: &[u8]) -> Result<TabularDataset, DatasetDecodeError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(DatasetDecodeError::MissingHeader);
    }

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(csv_error)?;
        if record.len() != headers.len() {
            return Err(DatasetDecodeError::RaggedRow {
                row: row_no,
                expected: headers.len(),
                found: record.len(),
            });
        }
        rows.push(record.iter().map(guess_cell_type).collect());
    }

    TabularDataset::new(headers, rows)
}

fn csv_error(err: csv::Error) -> DatasetDecodeError {
    if let csv::ErrorKind::UnequalLengths {
        pos,
        expected_len,
        len,
    } = err.kind()
    {
        // Record numbers count the header line; rows are zero-based data rows.
        let row = pos
            .as_ref()
            .map(|p| p.record().saturating_sub(1) as usize)
            .unwrap_or(0);
        return DatasetDecodeError::RaggedRow {
            row,
            expected: *expected_len as usize,
            found: *len as usize,
        };
    }
    malformed(DataFormat::Csv, err)
}

fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    match s {
        "true" | "True" | "TRUE" => CellValue::Bool(true),
        "false" | "False" | "FALSE" => CellValue::Bool(false),
        _ => CellValue::Text(s.to_string()),
    }
}

// ---------------------------------------------------------------------------
// JSON decoder
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   { "feature1": 10.0, "feature2": 95.0, "id": "a" },
///   { "feature1": 50.0, "feature2": 10.0, "id": "b" }
/// ]
/// ```
fn decode_json(bytes: &[u8]) -> Result<TabularDataset, DatasetDecodeError> {
    let root: JsonValue =
        serde_json::from_slice(bytes).map_err(|e| malformed(DataFormat::Json, e))?;

    let records = root
        .as_array()
        .ok_or_else(|| malformed(DataFormat::Json, "expected top-level JSON array"))?;

    let mut rows = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| malformed(DataFormat::Json, format!("row {i} is not a JSON object")))?;

        let mut row = Vec::with_capacity(obj.len());
        for (key, val) in obj {
            let cell = json_to_cell(val).ok_or_else(|| {
                malformed(
                    DataFormat::Json,
                    format!("row {i}, column '{key}': nested values are not tabular"),
                )
            })?;
            row.push((key.clone(), cell));
        }
        rows.push(row);
    }

    TabularDataset::from_ordered_records(rows)
}

fn json_to_cell(val: &JsonValue) -> Option<CellValue> {
    let cell = match val {
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        JsonValue::Array(_) | JsonValue::Object(_) => return None,
    };
    Some(cell)
}

// ---------------------------------------------------------------------------
// Parquet decoder
// ---------------------------------------------------------------------------

/// Decode a Parquet file with scalar columns. Works with files written by
/// both Pandas (`df.to_parquet()`) and Polars (`df.write_parquet()`).
fn decode_parquet(bytes: &[u8]) -> Result<TabularDataset, DatasetDecodeError> {
    let data = Bytes::copy_from_slice(bytes);
    let builder = ParquetRecordBatchReaderBuilder::try_new(data)
        .map_err(|e| malformed(DataFormat::Parquet, e))?;
    let column_names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder
        .build()
        .map_err(|e| malformed(DataFormat::Parquet, e))?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.map_err(|e| malformed(DataFormat::Parquet, e))?;
        let columns = batch.columns();
        for row in 0..batch.num_rows() {
            let cells = columns
                .iter()
                .zip(&column_names)
                .map(|(col, name)| extract_cell(col, row, name))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(cells);
        }
    }

    TabularDataset::new(column_names, rows)
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(
    col: &Arc<dyn Array>,
    row: usize,
    name: &str,
) -> Result<CellValue, DatasetDecodeError> {
    if col.is_null(row) {
        return Ok(CellValue::Null);
    }
    let cell = match col.data_type() {
        DataType::Utf8 => CellValue::Text(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => CellValue::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => downcast::<Int32Array>(col, name)
            .map(|arr| CellValue::Integer(arr.value(row) as i64))?,
        DataType::Int64 => {
            downcast::<Int64Array>(col, name).map(|arr| CellValue::Integer(arr.value(row)))?
        }
        DataType::Float32 => downcast::<Float32Array>(col, name)
            .map(|arr| CellValue::Float(arr.value(row) as f64))?,
        DataType::Float64 => {
            downcast::<Float64Array>(col, name).map(|arr| CellValue::Float(arr.value(row)))?
        }
        DataType::Boolean => {
            downcast::<BooleanArray>(col, name).map(|arr| CellValue::Bool(arr.value(row)))?
        }
        other => {
            return Err(malformed(
                DataFormat::Parquet,
                format!("column '{name}' has unsupported type {other:?}"),
            ))
        }
    };
    Ok(cell)
}

fn downcast<'a, T: 'static>(
    col: &'a Arc<dyn Array>,
    name: &str,
) -> Result<&'a T, DatasetDecodeError> {
    col.as_any().downcast_ref::<T>().ok_or_else(|| {
        malformed(
            DataFormat::Parquet,
            format!("column '{name}' does not match its declared type"),
        )
    })
}
