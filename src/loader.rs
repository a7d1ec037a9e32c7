// 📂 Loader
// Reads local or remote CSV files into SourceTables, in the order given

use crate::error::LoadError;
use crate::table::{Row, SourceTable, Value};
use csv::ReaderBuilder;
use std::fs;
use tracing::{debug, warn};

/// Source identifier: last segment of a path or URL
///
/// "https://host/raw/abc/bank1.csv" → "bank1.csv"
pub fn source_name(location: &str) -> &str {
    let trimmed = location.trim_end_matches(['/', '\\']);
    trimmed
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(trimmed)
}

pub fn is_remote(location: &str) -> bool {
    let lower = location.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Fetch the raw bytes behind a location
pub fn fetch(location: &str) -> Result<Vec<u8>, LoadError> {
    if is_remote(location) {
        debug!(location, "Fetching remote source");
        let fetch_err = |source| LoadError::Fetch {
            location: location.to_string(),
            source,
        };
        let response = reqwest::blocking::get(location)
            .and_then(|r| r.error_for_status())
            .map_err(fetch_err)?;
        let bytes = response.bytes().map_err(fetch_err)?;
        Ok(bytes.to_vec())
    } else {
        debug!(location, "Reading local source");
        fs::read(location).map_err(|source| LoadError::Read {
            location: location.to_string(),
            source,
        })
    }
}

/// Parse comma-separated bytes with a header row into a SourceTable
pub fn parse_table(source: &str, raw: &[u8]) -> Result<SourceTable, LoadError> {
    let parse_err = |e| LoadError::Parse {
        location: source.to_string(),
        source: e,
    };

    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(raw);

    let columns: Vec<String> = reader
        .headers()
        .map_err(parse_err)?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if columns.is_empty() || (columns.len() == 1 && columns[0].is_empty()) {
        return Err(LoadError::Empty {
            location: source.to_string(),
        });
    }

    let mut rows: Vec<Row> = Vec::new();
    for result in reader.records() {
        // csv rejects ragged rows (flexible is off)
        let record = result.map_err(parse_err)?;
        rows.push(record.iter().map(Value::parse).collect());
    }

    Ok(SourceTable::new(source, columns, rows).with_fingerprint(raw))
}

pub fn load_source(location: &str) -> Result<SourceTable, LoadError> {
    let raw = fetch(location)?;
    let table = parse_table(source_name(location), &raw).map_err(|e| match e {
        // Report the full location, not just the file name
        LoadError::Parse { source, .. } => LoadError::Parse {
            location: location.to_string(),
            source,
        },
        LoadError::Empty { .. } => LoadError::Empty {
            location: location.to_string(),
        },
        other => other,
    })?;

    debug!(
        source = %table.source,
        columns = table.columns.len(),
        rows = table.row_count(),
        "Loaded source"
    );
    Ok(table)
}

/// Load every location, aborting on the first failure
///
/// Tables are keyed by source name: a later location with the same name
/// replaces the earlier table in the earlier table's position.
pub fn load_sources<S: AsRef<str>>(locations: &[S]) -> Result<Vec<SourceTable>, LoadError> {
    let mut tables: Vec<SourceTable> = Vec::with_capacity(locations.len());

    for location in locations {
        let table = load_source(location.as_ref())?;
        insert_keyed(&mut tables, table);
    }

    Ok(tables)
}

/// Insert keeping one table per source name, first position wins
pub(crate) fn insert_keyed(tables: &mut Vec<SourceTable>, table: SourceTable) {
    match tables.iter_mut().find(|t| t.source == table.source) {
        Some(existing) => {
            warn!(source = %table.source, "Duplicate source name, replacing earlier table");
            *existing = table;
        }
        None => tables.push(table),
    }
}
