//! Core traits for source analysis.

use crate::dispatch::FileKind;
use crate::model::AnalysisReport;

/// Holds a parsed tree-sitter tree and the source it was built from.
pub struct ParsedFile {
    /// The tree-sitter parse tree.
    pub tree: tree_sitter::Tree,
    /// The original source code (kept for node text extraction).
    pub source: Vec<u8>,
    /// The file name, used in logs and reports.
    pub path: String,
}

impl ParsedFile {
    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }

    pub fn root(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }
}

/// Analyzer for one file kind.
///
/// Implementations hold no per-call state: every call to `analyze` builds
/// its own parser and table collection, so one instance can serve many
/// files (and threads) at once.
pub trait SourceAnalyzer: Send + Sync {
    /// The file kind this analyzer handles.
    fn kind(&self) -> FileKind;

    /// Analyze one file. Never fails outward; failures end up in
    /// the report's `error` field.
    fn analyze(&self, filename: &str, source: &str) -> AnalysisReport;
}
