// Statement Merge - Core Library
// Loader → Normalizer → Merger → Exporter, plus optional SQLite run store

pub mod config;
pub mod error;
pub mod exporter;
pub mod loader;
pub mod log;
pub mod merger;
pub mod normalizer;
pub mod pipeline;
pub mod store;
pub mod table;

// Re-export commonly used types
pub use config::{MergeConfig, AMOUNT_COLUMN, DEFAULT_OUTPUT};
pub use error::{ExportError, LoadError, MergeError};
pub use exporter::{export, export_or_message, ExportFormat};
pub use loader::{load_source, load_sources, source_name};
pub use merger::{concat_tables, merge_tables, write_csv};
pub use normalizer::{
    normalize_all, normalize_table, CurrencyAccumulator, CurrencyOutcome, MalformedCurrency,
    NormalizeReport,
};
pub use pipeline::{Pipeline, RunOutcome};
pub use store::{MergeRun, Store};
pub use table::{Row, SourceSegment, SourceTable, UnifiedTable, Value};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
