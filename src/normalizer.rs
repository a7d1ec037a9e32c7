// 🧹 Normalizer
// Canonical column names + currency columns folded into one amount
//
// Per table:
//   1. find currency columns (euro, cents, dollar, rupee, pound)
//   2. convert each to the common unit and sum them per row
//   3. rename columns through the alias table
//   4. write the sum into `amount` and drop the currency columns

use crate::config::{MergeConfig, AMOUNT_COLUMN};
use crate::table::{SourceTable, Value};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ============================================================================
// REPORT TYPES
// ============================================================================

/// MalformedCurrency - A currency cell that was not a number (counted as 0)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MalformedCurrency {
    pub row: usize,
    pub column: String,
    pub raw: String,
}

/// What happened to a table's currency columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CurrencyOutcome {
    /// Nothing to fold, the table was only renamed
    NoCurrencyColumns,
    /// These columns were folded into `amount`
    Folded {
        columns: Vec<String>,
        malformed: Vec<MalformedCurrency>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizeReport {
    pub source: String,
    pub renamed: Vec<(String, String)>,
    pub currency: CurrencyOutcome,
}

impl NormalizeReport {
    pub fn malformed(&self) -> &[MalformedCurrency] {
        match &self.currency {
            CurrencyOutcome::Folded { malformed, .. } => malformed,
            CurrencyOutcome::NoCurrencyColumns => &[],
        }
    }
}

// ============================================================================
// CURRENCY ACCUMULATOR
// ============================================================================

/// CurrencyAccumulator - Running per-row total for ONE table
///
/// Built fresh for every table and consumed by `finish`, so sums never
/// leak from one table into the next.
#[derive(Debug, Default)]
pub struct CurrencyAccumulator {
    sums: Option<Vec<Value>>,
    columns: Vec<String>,
    malformed: Vec<MalformedCurrency>,
}

impl CurrencyAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_none()
    }

    /// Convert one currency column and add it to the running sum
    ///
    /// Missing cells count as 0. Non-numeric cells count as 0 too but are
    /// recorded as malformed.
    pub fn fold(&mut self, column: &str, values: &[&Value], factor: f64) {
        let converted: Vec<Value> = values
            .iter()
            .enumerate()
            .map(|(row, value)| self.convert(row, column, value, factor))
            .collect();

        self.sums = Some(match self.sums.take() {
            None => converted,
            Some(sums) => sums
                .into_iter()
                .zip(converted)
                .map(|(acc, v)| add(acc, v))
                .collect(),
        });
        self.columns.push(column.to_string());
    }

    fn convert(&mut self, row: usize, column: &str, value: &Value, factor: f64) -> Value {
        match value {
            Value::Missing => Value::Integer(0),
            Value::Integer(i) if factor == 1.0 => Value::Integer(*i),
            Value::Integer(i) => Value::Number(scale(*i as f64, factor)),
            Value::Number(f) => Value::Number(scale(*f, factor)),
            Value::Text(raw) => match value.as_f64() {
                Some(f) => Value::Number(scale(f, factor)),
                None => {
                    warn!(row, column, raw = %raw, "Malformed currency value, counting as 0");
                    self.malformed.push(MalformedCurrency {
                        row,
                        column: column.to_string(),
                        raw: raw.clone(),
                    });
                    Value::Integer(0)
                }
            },
        }
    }

    /// Sums (None when no column was folded), folded columns, malformed cells
    pub fn finish(self) -> (Option<Vec<Value>>, Vec<String>, Vec<MalformedCurrency>) {
        (self.sums, self.columns, self.malformed)
    }
}

/// Apply a conversion factor; fractional factors divide by their reciprocal
///
/// 57 cents must come out as 0.57: `57.0 * 0.01` is 0.5700000000000001,
/// while `57.0 / 100.0` is exact to the last digit.
fn scale(value: f64, factor: f64) -> f64 {
    if factor.abs() < 1.0 {
        value / factor.recip()
    } else {
        value * factor
    }
}

fn add(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x
            .checked_add(y)
            .map(Value::Integer)
            .unwrap_or(Value::Number(x as f64 + y as f64)),
        (x, y) => Value::Number(x.as_f64().unwrap_or(0.0) + y.as_f64().unwrap_or(0.0)),
    }
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Normalize one table in place
pub fn normalize_table(table: &mut SourceTable, config: &MergeConfig) -> NormalizeReport {
    let mut accumulator = CurrencyAccumulator::new();

    // 1 + 2: fold currency columns, in column order (by position, headers may repeat)
    let mut currency_idx = Vec::new();
    for (idx, column) in table.columns.iter().enumerate() {
        if let Some(factor) = config.currency_factor(column) {
            let values: Vec<&Value> = table
                .rows
                .iter()
                .map(|r| r.get(idx).unwrap_or(&Value::Missing))
                .collect();
            accumulator.fold(column, &values, factor);
            currency_idx.push(idx);
        }
    }

    // 3: canonical names
    let mut renamed = Vec::new();
    for column in table.columns.iter_mut() {
        let canonical = config.canonical_name(column).to_string();
        if canonical != *column {
            renamed.push((column.clone(), canonical.clone()));
            *column = canonical;
        }
    }

    // 4: amount replaces the currency columns
    let (sums, folded, malformed) = accumulator.finish();
    let currency = match sums {
        None => CurrencyOutcome::NoCurrencyColumns,
        Some(sums) => {
            drop_columns(table, &currency_idx);
            set_column(table, AMOUNT_COLUMN, sums);
            CurrencyOutcome::Folded {
                columns: folded,
                malformed,
            }
        }
    };

    debug!(
        source = %table.source,
        renamed = renamed.len(),
        currency = ?currency,
        "Normalized table"
    );

    NormalizeReport {
        source: table.source.clone(),
        renamed,
        currency,
    }
}

/// Normalize every table, in load order
pub fn normalize_all(tables: &mut [SourceTable], config: &MergeConfig) -> Vec<NormalizeReport> {
    tables
        .iter_mut()
        .map(|table| normalize_table(table, config))
        .collect()
}

fn drop_columns(table: &mut SourceTable, positions: &[usize]) {
    let keep: Vec<bool> = (0..table.columns.len())
        .map(|idx| !positions.contains(&idx))
        .collect();

    let mut idx = 0;
    table.columns.retain(|_| {
        let k = keep[idx];
        idx += 1;
        k
    });

    for row in table.rows.iter_mut() {
        let mut idx = 0;
        row.retain(|_| {
            let k = keep.get(idx).copied().unwrap_or(true);
            idx += 1;
            k
        });
    }
}

/// Overwrite a column's values, appending the column if it is not there yet
fn set_column(table: &mut SourceTable, column: &str, values: Vec<Value>) {
    match table.column_index(column) {
        Some(idx) => {
            for (row, value) in table.rows.iter_mut().zip(values) {
                if let Some(cell) = row.get_mut(idx) {
                    *cell = value;
                }
            }
        }
        None => {
            table.columns.push(column.to_string());
            for (row, value) in table.rows.iter_mut().zip(values) {
                row.push(value);
            }
        }
    }
}
