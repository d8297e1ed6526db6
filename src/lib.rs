//! Tablescan - static extraction of PyTables table declarations.
//!
//! Tablescan reads Python sources, and shell scripts that embed Python,
//! without executing them, and reports the tables they declare together
//! with each table's fields.
//!
//! # Architecture
//!
//! - `analysis`: tree-sitter based analyzers, one per file kind
//! - `embedded`: finds Python blocks inside shell scripts
//! - `dispatch`: routes `(filename, content, kind)` to an analyzer
//! - `model`: tables, fields and per-file reports
//! - `batch`: parallel analysis over files and directories
//! - `config`: YAML scan configuration
//! - `report`: output formatting (JSON, pretty)
//!
//! # Example
//!
//! ```
//! let report = tablescan::analyze_file(
//!     "model.py",
//!     "class Particle(IsDescription):\n    energy = Float64Col()\n",
//!     "py",
//! );
//! assert_eq!(report.tables["Particle"].fields[0].name, "energy");
//! ```

pub mod analysis;
pub mod batch;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod embedded;
pub mod error;
pub mod model;
pub mod report;

pub use analysis::{register_analyzers, PythonAnalyzer, ShellAnalyzer, SourceAnalyzer};
pub use batch::{BatchReport, BatchRunner};
pub use config::Config;
pub use dispatch::{analyze_file, FileKind};
pub use error::AnalysisError;
pub use model::{AnalysisReport, Field, Table};

/// Initialize all subsystems.
///
/// Call this once at startup.
pub fn init() {
    register_analyzers();
}
