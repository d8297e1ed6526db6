//! Failure taxonomy for a single analysis unit (file or embedded block).

use thiserror::Error;

/// Why a file or block produced no tables.
///
/// The `Display` text is what ends up in a report's `error` field.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The source does not parse for its declared kind.
    #[error("Syntax error: {0}")]
    Syntax(String),
    /// Anything else that went wrong while parsing or walking the tree.
    #[error("Error: {0}")]
    Internal(#[from] anyhow::Error),
    /// The caller asked for a file kind no analyzer handles.
    #[error("Unsupported file type: {0}")]
    UnsupportedKind(String),
}
