// 🗄️ Merge Store - SQLite persistence of merge runs
//
// merge_runs     one row per successful merge
// merge_sources  which files fed it, with their fingerprints
// unified_rows   every unified row as a JSON object

use crate::table::UnifiedTable;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRun {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub output_path: String,
    pub row_count: i64,
    pub columns: Vec<String>,
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let store = Store { conn };
        store.setup()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Store {
            conn: Connection::open_in_memory()?,
        };
        store.setup()?;
        Ok(store)
    }

    pub fn setup(&self) -> Result<()> {
        // Enable WAL mode for crash recovery
        self.conn.pragma_update(None, "journal_mode", "WAL")?;

        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS merge_runs (
                run_id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                output_path TEXT NOT NULL,
                row_count INTEGER NOT NULL,
                columns TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS merge_sources (
                run_id TEXT NOT NULL REFERENCES merge_runs(run_id),
                position INTEGER NOT NULL,
                source TEXT NOT NULL,
                fingerprint TEXT NOT NULL,
                row_count INTEGER NOT NULL,
                PRIMARY KEY (run_id, position)
            );

            CREATE TABLE IF NOT EXISTS unified_rows (
                run_id TEXT NOT NULL REFERENCES merge_runs(run_id),
                row_index INTEGER NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (run_id, row_index)
            );

            CREATE INDEX IF NOT EXISTS idx_sources_fingerprint ON merge_sources(fingerprint);",
        )?;

        Ok(())
    }

    /// Save one merge in a single transaction, returns the run id
    pub fn save_run(&mut self, table: &UnifiedTable, output_path: &Path) -> Result<String> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let columns_json = serde_json::to_string(table.columns())?;

        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO merge_runs (run_id, created_at, output_path, row_count, columns)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                run_id,
                created_at.to_rfc3339(),
                output_path.display().to_string(),
                table.row_count() as i64,
                columns_json,
            ],
        )?;

        for (position, segment) in table.segments().iter().enumerate() {
            tx.execute(
                "INSERT INTO merge_sources (run_id, position, source, fingerprint, row_count)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    run_id,
                    position as i64,
                    segment.source,
                    segment.fingerprint,
                    segment.row_count as i64,
                ],
            )?;
        }

        {
            let mut stmt = tx.prepare(
                "INSERT INTO unified_rows (run_id, row_index, data) VALUES (?1, ?2, ?3)",
            )?;
            for (idx, pairs) in table.records().enumerate() {
                let object: serde_json::Map<String, serde_json::Value> = pairs
                    .into_iter()
                    .map(|(column, value)| (column.to_string(), value.to_json()))
                    .collect();
                let data = serde_json::to_string(&object)?;
                stmt.execute(params![run_id, idx as i64, data])?;
            }
        }

        tx.commit().context("Failed to commit merge run")?;

        debug!(run_id = %run_id, rows = table.row_count(), "Saved merge run");
        Ok(run_id)
    }

    pub fn count_rows(&self, run_id: &str) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM unified_rows WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Source names of a run, in load order
    pub fn run_sources(&self, run_id: &str) -> Result<Vec<(String, String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT source, fingerprint, row_count FROM merge_sources
             WHERE run_id = ?1 ORDER BY position",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_runs(&self) -> Result<Vec<MergeRun>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, created_at, output_path, row_count, columns
             FROM merge_runs ORDER BY created_at",
        )?;

        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.into_iter()
            .map(|(run_id, created_at, output_path, row_count, columns)| -> Result<MergeRun> {
                Ok(MergeRun {
                    created_at: DateTime::parse_from_rfc3339(&created_at)
                        .with_context(|| format!("Bad timestamp for run {}", run_id))?
                        .with_timezone(&Utc),
                    columns: serde_json::from_str(&columns)?,
                    run_id,
                    output_path,
                    row_count,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merger::concat_tables;
    use crate::table::SourceTable;

    fn unified() -> UnifiedTable {
        concat_tables(&[
            SourceTable::from_strings("a.csv", &["to", "amount"], &[&["Bob", "10"], &["Eve", "3"]])
                .with_fingerprint(b"a"),
            SourceTable::from_strings("b.csv", &["to", "memo"], &[&["Carol", "rent"]])
                .with_fingerprint(b"b"),
        ])
        .unwrap()
    }

    #[test]
    fn test_save_and_read_back_run() {
        let mut store = Store::open_in_memory().unwrap();
        let table = unified();

        let run_id = store.save_run(&table, Path::new("unified_csv.csv")).unwrap();

        assert_eq!(store.count_rows(&run_id).unwrap(), 3);

        let runs = store.list_runs().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].run_id, run_id);
        assert_eq!(runs[0].row_count, 3);
        assert_eq!(runs[0].columns, vec!["to", "amount", "memo"]);
        assert_eq!(runs[0].output_path, "unified_csv.csv");

        let sources = store.run_sources(&run_id).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].0, "a.csv");
        assert_eq!(sources[0].2, 2);
        assert_eq!(sources[1].0, "b.csv");
    }

    #[test]
    fn test_rows_stored_as_json_objects() {
        let mut store = Store::open_in_memory().unwrap();
        let run_id = store.save_run(&unified(), Path::new("out.csv")).unwrap();

        let data: String = store
            .conn
            .query_row(
                "SELECT data FROM unified_rows WHERE run_id = ?1 AND row_index = 2",
                params![run_id],
                |row| row.get(0),
            )
            .unwrap();

        assert_eq!(data, r#"{"to":"Carol","amount":null,"memo":"rent"}"#);
    }

    #[test]
    fn test_two_runs_are_independent() {
        let mut store = Store::open_in_memory().unwrap();
        let first = store.save_run(&unified(), Path::new("one.csv")).unwrap();
        let second = store.save_run(&unified(), Path::new("two.csv")).unwrap();

        assert_ne!(first, second);
        assert_eq!(store.list_runs().unwrap().len(), 2);
        assert_eq!(store.count_rows(&second).unwrap(), 3);
    }
}
