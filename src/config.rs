// ⚙️ Merge Configuration
// Column aliases, currency vocabulary and output location

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_OUTPUT: &str = "unified_csv.csv";

/// Canonical name the currency columns are folded into
pub const AMOUNT_COLUMN: &str = "amount";

/// The fixed alias table the bank exports are known to use
pub fn default_columns() -> BTreeMap<String, String> {
    [
        ("timestamp", "date/timestamp"),
        ("date", "date/timestamp"),
        ("date_readable", "date/timestamp"),
        ("to", "to"),
        ("from", "from"),
        ("amounts", "amount"),
        ("amount", "amount"),
        ("transaction", "transaction_type"),
        ("type", "transaction_type"),
    ]
    .into_iter()
    .map(|(alias, canonical)| (alias.to_string(), canonical.to_string()))
    .collect()
}

/// Currency units and the factor that brings each one to the common unit
pub fn default_currencies() -> BTreeMap<String, f64> {
    [
        ("euro", 1.0),
        ("cents", 0.01),
        ("dollar", 1.0),
        ("rupee", 1.0),
        ("pound", 1.0),
    ]
    .into_iter()
    .map(|(unit, factor)| (unit.to_string(), factor))
    .collect()
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT)
}

/// MergeConfig - Everything the pipeline needs that is not input data
///
/// Every section is optional in the TOML file:
/// ```toml
/// output_path = "out/unified.csv"
///
/// [columns]
/// booking_date = "date/timestamp"
///
/// [currencies]
/// yen = 1.0
/// ```
/// Tables given in the file replace the defaults entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    #[serde(default = "default_output")]
    pub output_path: PathBuf,

    /// alias → canonical column name
    #[serde(default = "default_columns")]
    pub columns: BTreeMap<String, String>,

    /// currency unit → conversion factor
    #[serde(default = "default_currencies")]
    pub currencies: BTreeMap<String, f64>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        MergeConfig {
            output_path: default_output(),
            columns: default_columns(),
            currencies: default_currencies(),
        }
    }
}

impl MergeConfig {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;

        debug!(path = %path.display(), "Loaded merge config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (alias, canonical) in &self.columns {
            if canonical.trim().is_empty() {
                return Err(anyhow!("Column alias '{}' maps to an empty name", alias));
            }
        }

        // Canonical names must be fixed points, otherwise a second pass renames again
        for (alias, canonical) in &self.columns {
            if let Some(next) = self.columns.get(canonical) {
                if next != canonical {
                    return Err(anyhow!(
                        "Column alias '{}' maps to '{}', which is itself an alias of '{}'",
                        alias,
                        canonical,
                        next
                    ));
                }
            }
        }

        for (unit, factor) in &self.currencies {
            if self.columns.contains_key(unit) || self.columns.values().any(|c| c == unit) {
                return Err(anyhow!(
                    "Currency '{}' is also a column alias or canonical name",
                    unit
                ));
            }
            if !factor.is_finite() || *factor == 0.0 {
                return Err(anyhow!(
                    "Currency '{}' has invalid conversion factor {}",
                    unit,
                    factor
                ));
            }
        }

        Ok(())
    }

    /// Builder pattern: override the output location
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Canonical name for a column (unknown columns pass through)
    pub fn canonical_name<'a>(&'a self, column: &'a str) -> &'a str {
        self.columns
            .get(column)
            .map(String::as_str)
            .unwrap_or(column)
    }

    pub fn currency_factor(&self, column: &str) -> Option<f64> {
        self.currencies.get(column).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = MergeConfig::default();

        assert_eq!(config.output_path, PathBuf::from("unified_csv.csv"));
        assert_eq!(config.canonical_name("timestamp"), "date/timestamp");
        assert_eq!(config.canonical_name("date_readable"), "date/timestamp");
        assert_eq!(config.canonical_name("type"), "transaction_type");
        assert_eq!(config.canonical_name("memo"), "memo");
        assert_eq!(config.currency_factor("cents"), Some(0.01));
        assert_eq!(config.currency_factor("euro"), Some(1.0));
        assert_eq!(config.currency_factor("yen"), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
output_path = "merged.csv"

[currencies]
yen = 1.0
cents = 0.01
"#
        )
        .unwrap();

        let config = MergeConfig::load_from_path(file.path()).unwrap();

        assert_eq!(config.output_path, PathBuf::from("merged.csv"));
        assert_eq!(config.currencies.len(), 2);
        assert_eq!(config.currency_factor("euro"), None);
        // Missing section keeps the defaults
        assert_eq!(config.columns, default_columns());
    }

    #[test]
    fn test_invalid_factor_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[currencies]\nbroken = 0.0").unwrap();

        let result = MergeConfig::load_from_path(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_alias_chain_rejected() {
        let mut config = MergeConfig::default();
        config
            .columns
            .insert("booked".to_string(), "timestamp".to_string());

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("'timestamp'"));
    }

    #[test]
    fn test_currency_that_is_a_column_name_rejected() {
        let mut config = MergeConfig::default();
        config.currencies.insert("amounts".to_string(), 1.0);
        assert!(config.validate().is_err());

        let mut config = MergeConfig::default();
        config.currencies.insert("amount".to_string(), 1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let result = MergeConfig::load_from_path("/definitely/not/here.toml");
        assert!(result.is_err());
    }
}
