//! Scan configuration for tablescan.
//!
//! Read from `tablescan.yaml` (or `.tablescan.yaml`) in the working
//! directory, or from an explicit `--config` path. Every key is optional.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

/// Config file names to search for.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["tablescan.yaml", ".tablescan.yaml"];

/// Files larger than this are reported as errors instead of being read.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Extensions (without dot, case-insensitive) that are picked up when walking directories.
    #[serde(default = "default_extensions")]
    pub allowed_extensions: Vec<String>,
    /// Glob patterns for paths to skip (e.g. "**/build/**").
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    /// Maximum size in bytes of a file to analyze.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Whether to follow symlinks while walking directories (default: true)
    #[serde(default = "default_true")]
    pub follow_links: bool,
    /// Whether to descend into hidden directories (default: false)
    #[serde(default)]
    pub include_hidden: bool,
}

fn default_extensions() -> Vec<String> {
    vec!["py".to_string(), "sh".to_string(), "bash".to_string()]
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allowed_extensions: default_extensions(),
            excluded_paths: Vec::new(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            follow_links: true,
            include_hidden: false,
        }
    }
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        // An empty file is a valid, all-defaults config.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load the explicit config if given, else a discovered one, else defaults.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => discover(dir),
        };

        let config = match path {
            Some(p) => {
                tracing::debug!(path = %p.display(), "loading config");
                Self::parse_file(&p)
                    .map_err(|e| anyhow::anyhow!("parsing config {}: {}", p.display(), e))?
            }
            None => Self::default(),
        };

        validate(&config)?;
        Ok(config)
    }

    /// Whether files with this extension are scanned.
    pub fn is_allowed_extension(&self, ext: &str) -> bool {
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }

    /// Compile `excluded_paths` into one matcher.
    pub fn excluded_matcher(&self) -> anyhow::Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.excluded_paths {
            let glob = Glob::new(pattern)
                .map_err(|e| anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e))?;
            builder.add(glob);
        }
        Ok(builder.build()?)
    }
}

/// Find a config file in `dir`.
pub fn discover(dir: &Path) -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Validate a config.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    if config.allowed_extensions.is_empty() {
        anyhow::bail!("allowed_extensions must not be empty");
    }

    for ext in &config.allowed_extensions {
        if ext.is_empty() || ext.starts_with('.') {
            anyhow::bail!("invalid extension {:?}, expected e.g. \"py\"", ext);
        }
    }

    if config.max_file_size == 0 {
        anyhow::bail!("max_file_size must be greater than zero");
    }

    config.excluded_matcher()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.is_allowed_extension("py"));
        assert!(config.is_allowed_extension("SH"));
        assert!(config.is_allowed_extension("bash"));
        assert!(!config.is_allowed_extension("txt"));
        assert_eq!(config.max_file_size, 16 * 1024 * 1024);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_parse_partial_config() {
        let yaml = r#"
excluded_paths:
  - "**/build/**"
max_file_size: 1024
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.allowed_extensions, vec!["py", "sh", "bash"]);
        assert_eq!(config.max_file_size, 1024);
        assert!(config.follow_links);
        assert!(!config.include_hidden);

        let matcher = config.excluded_matcher().unwrap();
        assert!(matcher.is_match("src/build/gen.py"));
        assert!(!matcher.is_match("src/gen.py"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config {
            allowed_extensions: vec![],
            ..Config::default()
        };
        assert!(validate(&config).is_err());

        config.allowed_extensions = vec![".py".to_string()];
        assert!(validate(&config).is_err());

        config.allowed_extensions = vec!["py".to_string()];
        config.max_file_size = 0;
        assert!(validate(&config).is_err());

        config.max_file_size = 10;
        config.excluded_paths = vec!["a/[".to_string()];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_load_discovers_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("tablescan.yaml"), "allowed_extensions: [py]\n").unwrap();

        let config = Config::load(None, dir.path()).unwrap();
        assert_eq!(config.allowed_extensions, vec!["py"]);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(None, dir.path()).unwrap();
        assert_eq!(config.allowed_extensions.len(), 3);
    }

    #[test]
    fn test_load_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.yaml");
        std::fs::write(&path, "\n").unwrap();
        let config = Config::load(Some(&path), dir.path()).unwrap();
        assert!(config.follow_links);
    }

    #[test]
    fn test_load_reports_invalid_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "max_file_size: [not a number]\n").unwrap();
        let err = Config::load(Some(&path), dir.path()).unwrap_err();
        assert!(err.to_string().contains("parsing config"));
    }
}
