//! Shell script analyzer: runs the Python analyzer over embedded blocks.

use indexmap::IndexMap;

use crate::analysis::{PythonAnalyzer, SourceAnalyzer};
use crate::dispatch::FileKind;
use crate::embedded::{extract_blocks, script_references};
use crate::model::{AnalysisReport, Table};

pub struct ShellAnalyzer {
    python: PythonAnalyzer,
}

impl ShellAnalyzer {
    pub fn new() -> Self {
        Self {
            python: PythonAnalyzer::new(),
        }
    }
}

impl Default for ShellAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceAnalyzer for ShellAnalyzer {
    fn kind(&self) -> FileKind {
        FileKind::Shell
    }

    /// Each block is analyzed as its own file named `<filename>_block`.
    /// Tables from later blocks replace same-named tables from earlier ones;
    /// a block that fails to parse contributes nothing.
    fn analyze(&self, filename: &str, source: &str) -> AnalysisReport {
        let references = script_references(source);
        let blocks = extract_blocks(source);
        tracing::debug!(
            file = filename,
            blocks = blocks.len(),
            references = references.len(),
            "scanned shell script"
        );

        let block_name = format!("{}_block", filename);
        let mut merged: IndexMap<String, Table> = IndexMap::new();

        for block in &blocks {
            let report = self.python.analyze(&block_name, &block.code);
            if let Some(err) = &report.error {
                tracing::warn!(file = filename, line = block.line, "skipping embedded block: {}", err);
                continue;
            }
            merged.extend(report.tables);
        }

        AnalysisReport::from_tables(filename, merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(script: &str) -> AnalysisReport {
        ShellAnalyzer::new().analyze("load.sh", script)
    }

    #[test]
    fn test_heredoc_table_is_reported_under_script_name() {
        let script = r#"#!/bin/bash
set -e
python <<EOF
from tables import *

class Reading(IsDescription):
    sensor = StringCol(8)
    value = Float64Col()
EOF
"#;
        let report = analyze(script);
        assert_eq!(report.filename, "load.sh");
        assert!(report.error.is_none());
        let reading = &report.tables["Reading"];
        assert_eq!(reading.fields.len(), 2);
        assert_eq!(reading.fields[1].declared_type.as_deref(), Some("Float64Col"));
    }

    #[test]
    fn test_inline_block() {
        let script = "python -c \"t = h5.openTable('events')\"\n";
        let report = analyze(script);
        assert_eq!(report.tables["events"].variable_name.as_deref(), Some("t"));
    }

    #[test]
    fn test_later_blocks_win() {
        let script = r#"
python -c "t = h5.createTable('/', 'runs', D)"
python <<EOF
u = h5.createTable('/', 'runs', D)
v = h5.openTable('other')
EOF
"#;
        let report = analyze(script);
        let names: Vec<_> = report.tables.keys().cloned().collect();
        assert_eq!(names, vec!["runs", "other"]);
        assert_eq!(report.tables["runs"].variable_name.as_deref(), Some("u"));
    }

    #[test]
    fn test_broken_block_does_not_affect_siblings() {
        let script = r#"
python -c "this is (not python"
python <<PYTHON
class Good(IsDescription):
    x = Int32Col()
PYTHON
"#;
        let report = analyze(script);
        assert!(report.error.is_none());
        assert_eq!(report.tables.len(), 1);
        assert!(report.tables.contains_key("Good"));
    }

    #[test]
    fn test_temporary_tables_in_blocks_are_dropped() {
        let script = "python -c \"t = h5.createTable('/', 'tmp', D, expectedrows=5)\"\n";
        assert!(analyze(script).tables.is_empty());
    }

    #[test]
    fn test_script_without_python() {
        let report = analyze("#!/bin/sh\necho hello\npython run.py\n");
        assert!(report.error.is_none());
        assert!(report.tables.is_empty());
    }
}
