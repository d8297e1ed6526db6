//! Per-file table collection with the registration rules of each detection path.

use indexmap::IndexMap;

use crate::model::{AnalysisReport, Field, Table};

/// Tables found in one analysis pass, keyed by table name.
///
/// Never shared between files; each pass builds its own.
#[derive(Debug, Default)]
pub struct TableSet {
    tables: IndexMap<String, Table>,
}

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a description class. An existing entry is left alone.
    pub fn register_class(&mut self, name: &str) -> bool {
        if self.tables.contains_key(name) {
            return false;
        }
        tracing::debug!(table = name, "registered description class");
        self.tables.insert(name.to_string(), Table::new(name, None));
        true
    }

    /// Register a `createTable` result, replacing whatever was there.
    pub fn register_created(&mut self, name: &str, variable: Option<String>, temporary: bool) {
        let mut table = Table::new(name, variable);
        if temporary {
            table = table.mark_temporary();
        }
        tracing::debug!(table = name, temporary, "registered createTable call");
        // Replacing keeps the original key position.
        self.tables.insert(name.to_string(), table);
    }

    /// Register an `openTable` result. The first registration of a name wins.
    pub fn register_opened(&mut self, name: &str, variable: Option<String>) -> bool {
        if self.tables.contains_key(name) {
            return false;
        }
        tracing::debug!(table = name, "registered openTable call");
        self.tables.insert(name.to_string(), Table::new(name, variable));
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Append a field to a registered table. Unknown names are ignored.
    pub fn attach(&mut self, table: &str, field: Field) {
        if let Some(t) = self.tables.get_mut(table) {
            t.add_field(field);
        }
    }

    /// Finish the pass: temporary tables are dropped from the report.
    pub fn into_report(self, filename: &str) -> AnalysisReport {
        AnalysisReport::from_tables(filename, self.tables)
    }
}
