//! Table and field structures extracted by the analyzers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// A single column of a table description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Attribute name in the description class body.
    pub name: String,
    /// Name of the column constructor (e.g. "Int32Col"), if it was a plain call.
    #[serde(rename = "type")]
    pub declared_type: Option<String>,
    /// Always `None` today; kept in the output shape for consumers.
    pub description: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, declared_type: Option<String>) -> Self {
        Self {
            name: name.into(),
            declared_type,
            description: None,
        }
    }
}

/// A table found in one file, with its fields in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    /// Variable the creating call was assigned to (`t = h5.createTable(...)`).
    pub variable_name: Option<String>,
    #[serde(default)]
    pub is_temporary: bool,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Table {
    pub fn new(name: impl Into<String>, variable_name: Option<String>) -> Self {
        Self {
            name: name.into(),
            variable_name,
            is_temporary: false,
            fields: Vec::new(),
        }
    }

    /// Mark the table as transient. There is no way to unset it.
    pub fn mark_temporary(mut self) -> Self {
        self.is_temporary = true;
        self
    }

    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }
}

/// Result of analyzing one file (or one embedded block).
///
/// `error` and a non-empty `tables` map are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Non-temporary tables keyed by table name, in registration order.
    #[serde(default)]
    pub tables: IndexMap<String, Table>,
}

impl AnalysisReport {
    /// Build a successful report, dropping temporary tables.
    pub fn from_tables<I>(filename: impl Into<String>, tables: I) -> Self
    where
        I: IntoIterator<Item = (String, Table)>,
    {
        Self {
            filename: filename.into(),
            error: None,
            tables: tables
                .into_iter()
                .filter(|(_, table)| !table.is_temporary)
                .collect(),
        }
    }

    /// Build an error report with no tables.
    pub fn failed(filename: impl Into<String>, err: &AnalysisError) -> Self {
        Self {
            filename: filename.into(),
            error: Some(err.to_string()),
            tables: IndexMap::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Total number of fields across all reported tables.
    pub fn field_count(&self) -> usize {
        self.tables.values().map(|t| t.fields.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporary_tables_are_dropped() {
        let mut kept = Table::new("particles", Some("t".to_string()));
        kept.add_field(Field::new("energy", Some("Float64Col".to_string())));
        let scratch = Table::new("scratch", None).mark_temporary();

        let report = AnalysisReport::from_tables(
            "data.py",
            vec![
                ("particles".to_string(), kept),
                ("scratch".to_string(), scratch),
            ],
        );

        assert!(!report.is_error());
        assert_eq!(report.tables.len(), 1);
        assert!(report.tables.contains_key("particles"));
        assert_eq!(report.field_count(), 1);
    }

    #[test]
    fn test_serialized_shape() {
        let mut table = Table::new("readout", None);
        table.add_field(Field::new("adc", Some("UInt16Col".to_string())));
        table.add_field(Field::new("label", None));
        let report = AnalysisReport::from_tables("r.py", vec![("readout".to_string(), table)]);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["filename"], "r.py");
        assert!(value.get("error").is_none());

        let readout = &value["tables"]["readout"];
        assert_eq!(readout["name"], "readout");
        assert!(readout["variable_name"].is_null());
        assert_eq!(readout["is_temporary"], false);
        assert_eq!(readout["fields"][0]["name"], "adc");
        assert_eq!(readout["fields"][0]["type"], "UInt16Col");
        assert!(readout["fields"][0]["description"].is_null());
        assert!(readout["fields"][1]["type"].is_null());
    }

    #[test]
    fn test_failed_report_has_no_tables() {
        let err = AnalysisError::Syntax("invalid syntax at line 1, column 4".to_string());
        let report = AnalysisReport::failed("bad.py", &err);

        assert_eq!(
            report.error.as_deref(),
            Some("Syntax error: invalid syntax at line 1, column 4")
        );
        assert!(report.tables.is_empty());

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["tables"], serde_json::json!({}));
    }
}
