// 📤 Exporter
// Alternate renderings of a unified table: json, xml, db

use crate::error::ExportError;
use crate::table::{UnifiedTable, Value};
use serde_json::{json, Map};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// One object per row
    Json,
    /// `<item>` per row, `<field name="...">` per column
    Xml,
    /// Schema + data document
    Db,
}

impl ExportFormat {
    pub fn name(&self) -> &str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Xml => "xml",
            ExportFormat::Db => "db",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ExportFormat::Json),
            "xml" => Ok(ExportFormat::Xml),
            "db" => Ok(ExportFormat::Db),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Render `table` in the named format; the table is never modified
pub fn export(table: &UnifiedTable, format: &str) -> Result<String, ExportError> {
    match format.parse::<ExportFormat>()? {
        ExportFormat::Json => to_json(table),
        ExportFormat::Xml => Ok(to_xml(table)),
        ExportFormat::Db => to_table_json(table),
    }
}

/// Soft-failure variant: errors come back as the explanatory message
pub fn export_or_message(table: Option<&UnifiedTable>, format: &str) -> String {
    match table {
        None => ExportError::NoResult.to_string(),
        Some(t) => export(t, format).unwrap_or_else(|e| e.to_string()),
    }
}

// ============================================================================
// JSON (records)
// ============================================================================

fn row_object<'a>(pairs: impl Iterator<Item = (&'a str, &'a Value)>) -> Map<String, serde_json::Value> {
    pairs
        .map(|(column, value)| (column.to_string(), value.to_json()))
        .collect()
}

pub fn to_json(table: &UnifiedTable) -> Result<String, ExportError> {
    let records: Vec<serde_json::Value> = table
        .records()
        .map(|pairs| serde_json::Value::Object(row_object(pairs.into_iter())))
        .collect();

    Ok(serde_json::to_string(&records)?)
}

// ============================================================================
// XML
// ============================================================================

fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn to_xml(table: &UnifiedTable) -> String {
    table
        .records()
        .map(|pairs| {
            let mut lines = vec!["<item>".to_string()];
            for (column, value) in pairs {
                lines.push(format!(
                    "  <field name=\"{}\">{}</field>",
                    escape_xml(column),
                    escape_xml(&value.to_string())
                ));
            }
            lines.push("</item>".to_string());
            lines.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// DB (table schema + data)
// ============================================================================

/// Column type for the schema section
///
/// integer: only integers; number: any float; string: any text or no values at all
pub fn column_type(table: &UnifiedTable, idx: usize) -> &'static str {
    let mut kind = None;
    for row in table.rows() {
        match row.get(idx) {
            Some(Value::Text(_)) => return "string",
            Some(Value::Number(_)) => kind = Some("number"),
            Some(Value::Integer(_)) if kind.is_none() => kind = Some("integer"),
            _ => {}
        }
    }
    kind.unwrap_or("string")
}

pub fn to_table_json(table: &UnifiedTable) -> Result<String, ExportError> {
    let mut fields = vec![json!({"name": "index", "type": "integer"})];
    for (idx, column) in table.columns().iter().enumerate() {
        fields.push(json!({"name": column, "type": column_type(table, idx)}));
    }

    let data: Vec<serde_json::Value> = table
        .records()
        .enumerate()
        .map(|(i, pairs)| {
            let mut object = Map::new();
            object.insert("index".to_string(), json!(i));
            object.extend(row_object(pairs.into_iter()));
            serde_json::Value::Object(object)
        })
        .collect();

    let document = json!({
        "schema": {
            "fields": fields,
            "primaryKey": ["index"],
        },
        "data": data,
    });

    Ok(serde_json::to_string(&document)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merger::concat_tables;
    use crate::table::SourceTable;

    fn unified() -> UnifiedTable {
        concat_tables(&[
            SourceTable::from_strings(
                "a.csv",
                &["date/timestamp", "to", "amount"],
                &[&["2020-01-01", "Bob", "10"]],
            ),
            SourceTable::from_strings(
                "b.csv",
                &["date/timestamp", "to", "amount", "memo"],
                &[&["2020-01-02", "<Carol & Co>", "5.5", "rent"]],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_format_names() {
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("xml".parse::<ExportFormat>().unwrap(), ExportFormat::Xml);
        assert_eq!("db".parse::<ExportFormat>().unwrap(), ExportFormat::Db);
        assert!("csv".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Db.name(), "db");
    }

    #[test]
    fn test_json_records_in_column_order() {
        let out = export(&unified(), "json").unwrap();

        assert_eq!(
            out,
            r#"[{"date/timestamp":"2020-01-01","to":"Bob","amount":10,"memo":null},{"date/timestamp":"2020-01-02","to":"<Carol & Co>","amount":5.5,"memo":"rent"}]"#
        );
    }

    #[test]
    fn test_xml_items() {
        let out = export(&unified(), "xml").unwrap();
        let expected = [
            "<item>",
            "  <field name=\"date/timestamp\">2020-01-01</field>",
            "  <field name=\"to\">Bob</field>",
            "  <field name=\"amount\">10</field>",
            "  <field name=\"memo\"></field>",
            "</item>",
            "<item>",
            "  <field name=\"date/timestamp\">2020-01-02</field>",
            "  <field name=\"to\">&lt;Carol &amp; Co&gt;</field>",
            "  <field name=\"amount\">5.5</field>",
            "  <field name=\"memo\">rent</field>",
            "</item>",
        ]
        .join("\n");

        assert_eq!(out, expected);
    }

    #[test]
    fn test_db_schema_and_data() {
        let out = export(&unified(), "db").unwrap();
        let doc: serde_json::Value = serde_json::from_str(&out).unwrap();

        let fields = doc["schema"]["fields"].as_array().unwrap();
        let types: Vec<(&str, &str)> = fields
            .iter()
            .map(|f| (f["name"].as_str().unwrap(), f["type"].as_str().unwrap()))
            .collect();
        assert_eq!(
            types,
            vec![
                ("index", "integer"),
                ("date/timestamp", "string"),
                ("to", "string"),
                ("amount", "number"),
                ("memo", "string"),
            ]
        );
        assert_eq!(doc["schema"]["primaryKey"], json!(["index"]));
        assert_eq!(doc["data"][1]["index"], json!(1));
        assert_eq!(doc["data"][1]["memo"], json!("rent"));
        assert_eq!(doc["data"][0]["memo"], serde_json::Value::Null);
    }

    #[test]
    fn test_unsupported_format_is_a_message() {
        let table = unified();
        let message = export_or_message(Some(&table), "yaml");
        assert!(message.contains("not supported"));
    }

    #[test]
    fn test_no_result_message_for_every_format() {
        for format in ["json", "xml", "db", "yaml"] {
            let message = export_or_message(None, format);
            assert!(message.starts_with("No result generated"), "{}", format);
        }
    }

    #[test]
    fn test_export_does_not_mutate_table() {
        let table = unified();
        let before = table.clone();

        for format in ["json", "xml", "db"] {
            export(&table, format).unwrap();
        }

        assert_eq!(table, before);
    }
}
