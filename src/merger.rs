// 🔗 Merger
// Concatenates normalized tables by column NAME and persists the result as CSV

use crate::error::MergeError;
use crate::table::{Row, SourceSegment, SourceTable, UnifiedTable, Value};
use csv::WriterBuilder;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Concatenate tables without touching the filesystem
///
/// Columns are the union of every table's columns in first-seen order;
/// cells a table has no column for are `Value::Missing`.
pub fn concat_tables(tables: &[SourceTable]) -> Result<UnifiedTable, MergeError> {
    if tables.is_empty() {
        return Err(MergeError::NoTables);
    }

    for table in tables {
        check_alignment(table)?;
    }

    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for table in tables {
        for column in &table.columns {
            if !positions.contains_key(column) {
                positions.insert(column.clone(), columns.len());
                columns.push(column.clone());
            }
        }
    }

    let total: usize = tables.iter().map(SourceTable::row_count).sum();
    let mut rows: Vec<Row> = Vec::with_capacity(total);
    let mut segments = Vec::with_capacity(tables.len());

    for table in tables {
        // Where each of this table's columns lands in the unified row
        let targets: Vec<usize> = table.columns.iter().map(|c| positions[c]).collect();

        for row in &table.rows {
            let mut unified = vec![Value::Missing; columns.len()];
            for (value, &target) in row.iter().zip(&targets) {
                unified[target] = value.clone();
            }
            rows.push(unified);
        }

        segments.push(SourceSegment {
            source: table.source.clone(),
            fingerprint: table.fingerprint.clone(),
            row_count: table.row_count(),
        });
    }

    debug!(
        tables = tables.len(),
        columns = columns.len(),
        rows = rows.len(),
        "Concatenated tables"
    );

    Ok(UnifiedTable::new(columns, rows, segments))
}

fn check_alignment(table: &SourceTable) -> Result<(), MergeError> {
    let mut seen = HashSet::new();
    for column in &table.columns {
        if !seen.insert(column.as_str()) {
            return Err(MergeError::DuplicateColumn {
                source: table.source.clone(),
                column: column.clone(),
            });
        }
    }

    for (idx, row) in table.rows.iter().enumerate() {
        if row.len() != table.columns.len() {
            return Err(MergeError::RowWidth {
                source: table.source.clone(),
                row: idx,
                expected: table.columns.len(),
                found: row.len(),
            });
        }
    }

    Ok(())
}

/// Render the unified table as CSV: header row, no index column
pub fn write_csv_to<W: io::Write>(table: &UnifiedTable, writer: W) -> Result<(), csv::Error> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);

    wtr.write_record(table.columns())?;
    for row in table.rows() {
        wtr.write_record(row.iter().map(|v| v.to_string()))?;
    }
    wtr.flush()?;

    Ok(())
}

/// Write the CSV next to its destination, then move it into place
///
/// A failed write leaves no file at `path`.
pub fn write_csv(table: &UnifiedTable, path: &Path) -> Result<(), MergeError> {
    let persist_err = |source: io::Error| MergeError::Persist {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(persist_err)?;
    write_csv_to(table, tmp.as_file_mut()).map_err(|e| persist_err(e.into()))?;
    tmp.persist(path).map_err(|e| persist_err(e.error))?;

    Ok(())
}

/// Concatenate and persist: success means the CSV is on disk
pub fn merge_tables(tables: &[SourceTable], output: &Path) -> Result<UnifiedTable, MergeError> {
    let unified = concat_tables(tables)?;
    write_csv(&unified, output)?;

    info!(
        output = %output.display(),
        rows = unified.row_count(),
        "Merged tables"
    );
    Ok(unified)
}
