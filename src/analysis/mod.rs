//! Tree-sitter based table analysis.
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌────────────────┐
//! │ Python file  │────▶│ PythonAnalyzer │────▶│ TableSet       │
//! └──────────────┘     └────────────────┘     │ (per file)     │
//!                              ▲              └────────────────┘
//! ┌──────────────┐     ┌───────┴────────┐             │
//! │ Shell script │────▶│ ShellAnalyzer  │             ▼
//! └──────────────┘     │ (embedded.rs)  │     ┌────────────────┐
//!                      └────────────────┘     │ AnalysisReport │
//!                                             └────────────────┘
//! ```
//!
//! Each analysis owns its parser, tree and table collection. Nothing is
//! shared between files.

mod languages;
mod literal;
mod syntax;
mod tables;
mod traits;

pub use languages::{get_analyzer, register_analyzers, PythonAnalyzer, ShellAnalyzer, TableFacts};
pub use tables::TableSet;
pub use traits::{ParsedFile, SourceAnalyzer};
