// 🚦 Pipeline - Loader → Normalizer → Merger → Exporter
// Owns the loaded tables and the last merge result

use crate::config::MergeConfig;
use crate::error::{LoadError, MergeError};
use crate::exporter::export_or_message;
use crate::loader::{insert_keyed, load_sources};
use crate::merger::merge_tables;
use crate::normalizer::{normalize_all, NormalizeReport};
use crate::table::{SourceTable, UnifiedTable};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, error};

/// RunOutcome - What `run` reports back to the driver
#[derive(Debug)]
pub enum RunOutcome {
    Completed { output: PathBuf, rows: usize },
    LoadFailed(LoadError),
    MergeFailed(MergeError),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed { output, .. } => {
                write!(f, "CSV merge completed with result in: {}", output.display())
            }
            RunOutcome::LoadFailed(e) => write!(f, "CSV merge failed with error: {}", e),
            RunOutcome::MergeFailed(e) => write!(f, "CSV merge failed with error: {}", e),
        }
    }
}

pub struct Pipeline {
    config: MergeConfig,
    tables: Vec<SourceTable>,
    result: Option<UnifiedTable>,
}

impl Pipeline {
    pub fn new(config: MergeConfig) -> Self {
        Pipeline {
            config,
            tables: Vec::new(),
            result: None,
        }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    pub fn tables(&self) -> &[SourceTable] {
        &self.tables
    }

    /// Drop every loaded table (the next merge will fail with NoTables)
    pub fn clear_tables(&mut self) {
        self.tables.clear();
    }

    pub fn result(&self) -> Option<&UnifiedTable> {
        self.result.as_ref()
    }

    /// Load locations; any failure aborts and keeps nothing from this call
    pub fn read<S: AsRef<str>>(&mut self, locations: &[S]) -> Result<(), LoadError> {
        let loaded = load_sources(locations)?;
        for table in loaded {
            insert_keyed(&mut self.tables, table);
        }
        debug!(tables = self.tables.len(), "Sources loaded");
        Ok(())
    }

    /// Normalize every loaded table in place, in load order
    pub fn normalize(&mut self) -> Vec<NormalizeReport> {
        normalize_all(&mut self.tables, &self.config)
    }

    /// Merge and persist; a failure leaves no result behind
    pub fn merge(&mut self) -> Result<&UnifiedTable, MergeError> {
        self.result = None;
        let unified = merge_tables(&self.tables, &self.config.output_path)?;
        let unified: &UnifiedTable = self.result.insert(unified);
        Ok(unified)
    }

    /// Render the last result, or explain why there is nothing to render
    pub fn convert_result_to(&self, format: &str) -> String {
        export_or_message(self.result.as_ref(), format)
    }

    /// Full pass: read → normalize → merge, then print one completion line
    pub fn run<S: AsRef<str>>(&mut self, locations: &[S]) -> RunOutcome {
        let outcome = match self.read(locations) {
            Err(e) => RunOutcome::LoadFailed(e),
            Ok(()) => {
                self.normalize();
                match self.merge() {
                    Ok(unified) => {
                        let rows = unified.row_count();
                        RunOutcome::Completed {
                            output: self.config.output_path.clone(),
                            rows,
                        }
                    }
                    Err(e) => RunOutcome::MergeFailed(e),
                }
            }
        };

        if !outcome.is_success() {
            error!(outcome = %outcome, "Merge run failed");
        }
        println!("{}", outcome);
        outcome
    }
}
