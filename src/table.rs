// 📋 Table Model
// In-memory tables shared by every pipeline stage: cells, source tables, unified table

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

// ============================================================================
// CELL VALUES
// ============================================================================

/// Value - One cell of a table
///
/// CSV fields are typed on load so amounts can be summed and exports can
/// emit numbers as numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Missing,
    Integer(i64),
    Number(f64),
    Text(String),
}

impl Value {
    /// Type a raw CSV field: empty → Missing, then integer, float, text
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Value::Missing;
        }

        let trimmed = raw.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Integer(i);
        }
        // Digit strings past i64 are references, not amounts: keep them exact
        let digits = trimmed.strip_prefix(['-', '+']).unwrap_or(trimmed);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return Value::Text(raw.to_string());
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            // "nan" / "inf" are text in a bank export, not numbers
            if f.is_finite() {
                return Value::Number(f);
            }
        }

        Value::Text(raw.to_string())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric view of the cell (None for Missing and non-numeric text)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Number(f) => Some(*f),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            Value::Missing => None,
        }
    }

    /// JSON view used by the exporter and the store
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Missing => serde_json::Value::Null,
            Value::Integer(i) => serde_json::json!(i),
            Value::Number(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Integer(i) => write!(f, "{}", i),
            // Integral floats keep their ".0" so 500 cents reads back as 5.0, not 5
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e16 => write!(f, "{:.1}", n),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Row - cells positionally aligned with the table's columns
pub type Row = Vec<Value>;

// ============================================================================
// SOURCE TABLE
// ============================================================================

/// SourceTable - One loaded input file
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTable {
    /// Last path segment of the location it was loaded from
    pub source: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// SHA-256 of the raw bytes, hex encoded
    pub fingerprint: String,
}

impl SourceTable {
    pub fn new(source: impl Into<String>, columns: Vec<String>, rows: Vec<Row>) -> Self {
        SourceTable {
            source: source.into(),
            columns,
            rows,
            fingerprint: String::new(),
        }
    }

    /// Builder pattern: attach the fingerprint of the raw input
    pub fn with_fingerprint(mut self, raw: &[u8]) -> Self {
        self.fingerprint = fingerprint(raw);
        self
    }

    /// Build a table from string cells, typing each one with `Value::parse`
    pub fn from_strings(source: &str, columns: &[&str], rows: &[&[&str]]) -> Self {
        SourceTable::new(
            source,
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|cell| Value::parse(cell)).collect())
                .collect(),
        )
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Lookup a cell by row number and column name
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// All values of one column, in row order
    pub fn column_values(&self, column: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(column)?;
        Some(
            self.rows
                .iter()
                .map(|r| r.get(idx).unwrap_or(&Value::Missing))
                .collect(),
        )
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Hex SHA-256 of raw input bytes
pub fn fingerprint(raw: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw);
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// UNIFIED TABLE
// ============================================================================

/// SourceSegment - Where a run of unified rows came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSegment {
    pub source: String,
    pub fingerprint: String,
    pub row_count: usize,
}

/// UnifiedTable - Concatenation of all normalized source tables
///
/// Columns are the union of every source's columns in first-seen order.
/// Rows keep load order, then each source's own row order.
#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedTable {
    columns: Vec<String>,
    rows: Vec<Row>,
    segments: Vec<SourceSegment>,
}

impl UnifiedTable {
    pub(crate) fn new(columns: Vec<String>, rows: Vec<Row>, segments: Vec<SourceSegment>) -> Self {
        UnifiedTable {
            columns,
            rows,
            segments,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn segments(&self) -> &[SourceSegment] {
        &self.segments
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Iterate rows as (column, value) pairs in column order
    pub fn records(&self) -> impl Iterator<Item = Vec<(&str, &Value)>> + '_ {
        self.rows.iter().map(move |row| {
            self.columns
                .iter()
                .map(String::as_str)
                .zip(row.iter())
                .collect()
        })
    }
}
