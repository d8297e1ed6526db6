//! Entry point that routes a file to the analyzer for its kind.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::analysis::get_analyzer;
use crate::error::AnalysisError;
use crate::model::AnalysisReport;

/// The file kinds the analyzers understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Python source (`py`, `python`).
    Python,
    /// Shell script with embedded Python (`sh`, `bash`).
    Shell,
}

impl FileKind {
    pub const ALL: &'static [FileKind] = &[FileKind::Python, FileKind::Shell];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Python => "python",
            FileKind::Shell => "shell",
        }
    }

    /// Kind names accepted by `analyze_file`. Matching is exact.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            FileKind::Python => &["py", "python"],
            FileKind::Shell => &["sh", "bash"],
        }
    }

    pub fn parse(kind: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.aliases().contains(&kind))
    }

    /// Kind for a path, from its (case-insensitive) extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        Self::parse(&ext)
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FileKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| AnalysisError::UnsupportedKind(s.to_string()))
    }
}

/// The kind string a caller would derive from a file name: the text after
/// the last dot, or `py` when there is none.
pub fn kind_for_filename(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => "py",
    }
}

/// Analyze one file of the given kind.
///
/// Never panics on bad input and never fails outward: unsupported kinds,
/// syntax errors and internal failures all come back as a report whose
/// `error` is set.
pub fn analyze_file(filename: &str, content: &str, file_kind: &str) -> AnalysisReport {
    match file_kind.parse::<FileKind>() {
        Ok(kind) => get_analyzer(kind).analyze(filename, content),
        Err(err) => {
            tracing::debug!(file = filename, kind = file_kind, "unsupported file kind");
            AnalysisReport::failed(filename, &err)
        }
    }
}
