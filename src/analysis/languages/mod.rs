//! Analyzer implementations, one per supported file kind.

mod python;
mod shell;

pub use python::{PythonAnalyzer, TableFacts};
pub use shell::ShellAnalyzer;

use super::SourceAnalyzer;
use crate::dispatch::FileKind;
use once_cell::sync::OnceCell;

/// Static storage for the Python analyzer.
static PYTHON_ANALYZER: OnceCell<PythonAnalyzer> = OnceCell::new();

/// Static storage for the shell analyzer.
static SHELL_ANALYZER: OnceCell<ShellAnalyzer> = OnceCell::new();

/// Create all analyzers up front.
///
/// Optional: `get_analyzer` creates them on first use. Idempotent.
pub fn register_analyzers() {
    PYTHON_ANALYZER.get_or_init(PythonAnalyzer::new);
    SHELL_ANALYZER.get_or_init(ShellAnalyzer::new);
}

/// Get the analyzer for a file kind.
///
/// Analyzers are immutable; every `analyze` call builds its own state.
pub fn get_analyzer(kind: FileKind) -> &'static dyn SourceAnalyzer {
    match kind {
        FileKind::Python => PYTHON_ANALYZER.get_or_init(PythonAnalyzer::new),
        FileKind::Shell => SHELL_ANALYZER.get_or_init(ShellAnalyzer::new),
    }
}
