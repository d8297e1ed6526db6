//! Batch analysis over files and directories.
//!
//! Every file is analyzed independently, so the work is spread over rayon's
//! pool and the results are gathered into a map keyed by filename. The
//! output does not depend on scheduling.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use rayon::prelude::*;
use walkdir::{DirEntry, WalkDir};

use crate::config::Config;
use crate::dispatch::{analyze_file, kind_for_filename};
use crate::error::AnalysisError;
use crate::model::AnalysisReport;

/// Reports for a batch, keyed by filename.
pub type BatchReport = BTreeMap<String, AnalysisReport>;

/// Runs the analyzers over a set of paths.
pub struct BatchRunner {
    config: Config,
    excluded: GlobSet,
}

impl BatchRunner {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let excluded = config.excluded_matcher()?;
        Ok(Self { config, excluded })
    }

    /// Expand `roots` into the files to analyze.
    ///
    /// Explicit file arguments are always kept; directories are walked and
    /// filtered by extension, exclusion globs and hidden-entry rules.
    pub fn collect_files(&self, roots: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for root in roots {
            let metadata = fs::metadata(root)
                .map_err(|e| anyhow::anyhow!("cannot access path {}: {}", root.display(), e))?;

            if !metadata.is_dir() {
                files.push(root.clone());
                continue;
            }

            let walker = WalkDir::new(root)
                .follow_links(self.config.follow_links)
                .into_iter()
                .filter_entry(|e| self.should_descend(e));

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::warn!("skipping unreadable entry: {}", e);
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }

                let path = entry.path();
                let allowed = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|ext| self.config.is_allowed_extension(ext))
                    .unwrap_or(false);
                if allowed {
                    files.push(path.to_path_buf());
                }
            }
        }

        files.sort();
        files.dedup();
        tracing::debug!(files = files.len(), "collected files");
        Ok(files)
    }

    fn should_descend(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return true;
        }
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden && !self.config.include_hidden {
            return false;
        }
        !self.excluded.is_match(entry.path())
    }

    /// Collect and analyze everything under `roots`.
    pub fn run(&self, roots: &[PathBuf]) -> anyhow::Result<BatchReport> {
        let files = self.collect_files(roots)?;
        Ok(self.run_files(&files))
    }

    /// Analyze already-collected files in parallel.
    pub fn run_files(&self, files: &[PathBuf]) -> BatchReport {
        files
            .par_iter()
            .map(|path| {
                let report = self.analyze_path(path);
                (report.filename.clone(), report)
            })
            .collect()
    }

    /// Analyze one file on disk. Read failures become error reports.
    pub fn analyze_path(&self, path: &Path) -> AnalysisReport {
        let filename = path.to_string_lossy().to_string();

        let content = match self.read_source(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(file = %filename, "cannot read file: {}", e);
                return AnalysisReport::failed(filename, &AnalysisError::Internal(e));
            }
        };

        let base = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let kind = kind_for_filename(&base).to_lowercase();

        analyze_file(&filename, &content, &kind)
    }

    fn read_source(&self, path: &Path) -> anyhow::Result<String> {
        let size = fs::metadata(path)?.len();
        if size > self.config.max_file_size {
            anyhow::bail!(
                "file is {} bytes, larger than max_file_size ({} bytes)",
                size,
                self.config.max_file_size
            );
        }
        let bytes = fs::read(path)?;
        String::from_utf8(bytes).map_err(|_| anyhow::anyhow!("file is not valid UTF-8"))
    }
}

/// Analyze in-memory sources given as `(filename, content, kind)` triples.
pub fn run_sources<'a, I>(sources: I) -> BatchReport
where
    I: IntoIterator<Item = (&'a str, &'a str, &'a str)>,
{
    let sources: Vec<_> = sources.into_iter().collect();
    sources
        .par_iter()
        .map(|(filename, content, kind)| {
            (filename.to_string(), analyze_file(filename, content, kind))
        })
        .collect()
}

/// Whether any report in the batch carries an error.
pub fn has_errors(batch: &BatchReport) -> bool {
    batch.values().any(AnalysisReport::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const DESCRIPTION: &str = "class Particle(IsDescription):\n    energy = Float64Col()\n";

    fn runner(config: Config) -> BatchRunner {
        BatchRunner::new(config).unwrap()
    }

    #[test]
    fn test_collect_filters_by_extension() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), DESCRIPTION).unwrap();
        fs::write(dir.path().join("b.SH"), "echo hi\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "nothing").unwrap();

        let files = runner(Config::default())
            .collect_files(&[dir.path().to_path_buf()])
            .unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.py", "b.SH"]);
    }

    #[test]
    fn test_collect_skips_hidden_and_excluded() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".venv")).unwrap();
        fs::create_dir_all(dir.path().join("build")).unwrap();
        fs::write(dir.path().join(".venv/x.py"), DESCRIPTION).unwrap();
        fs::write(dir.path().join("build/y.py"), DESCRIPTION).unwrap();
        fs::write(dir.path().join("z.py"), DESCRIPTION).unwrap();

        let config = Config {
            excluded_paths: vec!["**/build".to_string()],
            ..Config::default()
        };
        let files = runner(config).collect_files(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("z.py"));

        let config = Config {
            include_hidden: true,
            ..Config::default()
        };
        let files = runner(config).collect_files(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn test_explicit_file_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "x").unwrap();

        let batch = runner(Config::default()).run(&[path.clone()]).unwrap();
        let report = &batch[&path.to_string_lossy().to_string()];
        assert_eq!(report.error.as_deref(), Some("Unsupported file type: txt"));
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = runner(Config::default()).run(&[dir.path().join("missing")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_oversized_file_reports_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.py");
        fs::write(&path, DESCRIPTION).unwrap();

        let config = Config {
            max_file_size: 8,
            ..Config::default()
        };
        let report = runner(config).analyze_path(&path);
        let err = report.error.unwrap();
        assert!(err.starts_with("Error: "), "{}", err);
        assert!(err.contains("max_file_size"));
    }

    #[test]
    fn test_non_utf8_file_reports_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bin.py");
        fs::write(&path, [0xffu8, 0xfe, 0x00]).unwrap();

        let report = runner(Config::default()).analyze_path(&path);
        assert_eq!(report.error.as_deref(), Some("Error: file is not valid UTF-8"));
    }

    #[test]
    fn test_uppercase_extension_is_analyzed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("MODEL.PY");
        fs::write(&path, DESCRIPTION).unwrap();

        let report = runner(Config::default()).analyze_path(&path);
        assert!(report.error.is_none());
        assert!(report.tables.contains_key("Particle"));
    }

    #[test]
    fn test_run_sources_matches_sequential() {
        let inputs = vec![
            ("a.py", DESCRIPTION, "py"),
            ("b.py", "def broken(:\n", "py"),
            ("c.txt", "", "txt"),
        ];
        let batch = run_sources(inputs.clone());
        assert_eq!(batch.len(), 3);
        for (name, content, kind) in inputs {
            assert_eq!(batch[name], analyze_file(name, content, kind));
        }
        assert!(has_errors(&batch));
    }
}
