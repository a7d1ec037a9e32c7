// ⚠️ Error Taxonomy
// Load errors abort a run, merge errors are a status, export errors are soft

use std::fmt;
use std::path::PathBuf;

// ============================================================================
// LOAD ERROR (fatal)
// ============================================================================

#[derive(Debug)]
pub enum LoadError {
    /// Local file could not be read
    Read {
        location: String,
        source: std::io::Error,
    },
    /// Remote location unreachable or answered with a non-success status
    Fetch {
        location: String,
        source: reqwest::Error,
    },
    /// Content is not delimited tabular data
    Parse {
        location: String,
        source: csv::Error,
    },
    /// No header row
    Empty { location: String },
}

impl LoadError {
    pub fn location(&self) -> &str {
        match self {
            LoadError::Read { location, .. }
            | LoadError::Fetch { location, .. }
            | LoadError::Parse { location, .. }
            | LoadError::Empty { location } => location,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Read { location, source } => {
                write!(f, "failed to read {}: {}", location, source)
            }
            LoadError::Fetch { location, source } => {
                write!(f, "failed to fetch {}: {}", location, source)
            }
            LoadError::Parse { location, source } => {
                write!(f, "failed to parse CSV from {}: {}", location, source)
            }
            LoadError::Empty { location } => write!(f, "no header row in {}", location),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Read { source, .. } => Some(source),
            LoadError::Fetch { source, .. } => Some(source),
            LoadError::Parse { source, .. } => Some(source),
            LoadError::Empty { .. } => None,
        }
    }
}

// ============================================================================
// MERGE ERROR (status, never a panic)
// ============================================================================

#[derive(Debug)]
pub enum MergeError {
    NoTables,
    /// Two columns of one table share a name after canonical renaming
    DuplicateColumn { source: String, column: String },
    /// A row is not aligned with its table's header
    RowWidth {
        source: String,
        row: usize,
        expected: usize,
        found: usize,
    },
    /// The unified CSV could not be written
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeError::NoTables => write!(f, "no tables to merge"),
            MergeError::DuplicateColumn { source, column } => write!(
                f,
                "cannot align {}: column '{}' appears more than once",
                source, column
            ),
            MergeError::RowWidth {
                source,
                row,
                expected,
                found,
            } => write!(
                f,
                "cannot align {}: row {} has {} cells, expected {}",
                source, row, found, expected
            ),
            MergeError::Persist { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for MergeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MergeError::Persist { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ============================================================================
// EXPORT ERROR (soft: rendered as a message for the caller)
// ============================================================================

#[derive(Debug)]
pub enum ExportError {
    NoResult,
    UnsupportedFormat(String),
    Render(serde_json::Error),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::NoResult => write!(
                f,
                "No result generated, first execute run() and complete a merge"
            ),
            ExportError::UnsupportedFormat(format) => write!(
                f,
                "The format '{}' is not supported, use one of: json, xml, db",
                format
            ),
            ExportError::Render(e) => write!(f, "Could not render result: {}", e),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Render(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(e: serde_json::Error) -> Self {
        ExportError::Render(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_location() {
        let err = LoadError::Empty {
            location: "bank3.csv".to_string(),
        };
        assert_eq!(err.location(), "bank3.csv");
        assert_eq!(err.to_string(), "no header row in bank3.csv");
    }

    #[test]
    fn test_merge_error_messages() {
        assert_eq!(MergeError::NoTables.to_string(), "no tables to merge");

        let err = MergeError::DuplicateColumn {
            source: "bank2.csv".to_string(),
            column: "date/timestamp".to_string(),
        };
        assert!(err.to_string().contains("date/timestamp"));
        assert!(err.to_string().contains("bank2.csv"));
    }

    #[test]
    fn test_export_error_messages() {
        assert!(ExportError::NoResult.to_string().starts_with("No result generated"));
        assert!(ExportError::UnsupportedFormat("yaml".to_string())
            .to_string()
            .contains("'yaml'"));
    }
}
