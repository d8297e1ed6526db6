//! Command-line interface for tablescan.

use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::batch::{self, BatchReport, BatchRunner};
use crate::config::Config;
use crate::dispatch::{analyze_file, kind_for_filename};
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Extract PyTables table declarations from Python and shell sources.
///
/// Tablescan parses Python files (and Python embedded in shell scripts via
/// `python -c` or EOF/PYTHON here-documents) without running them, and
/// reports every table declared through IsDescription/Table subclasses or
/// createTable/openTable calls, together with its fields.
#[derive(Parser)]
#[command(name = "tablescan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan files and directories
    Scan(ScanArgs),
    /// Analyze a single source read from stdin
    Analyze(AnalyzeArgs),
}

/// Arguments for the scan command.
#[derive(Args)]
pub struct ScanArgs {
    /// Files or directories to scan
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: json or pretty
    #[arg(short, long, default_value = "json")]
    pub format: String,

    /// Write output to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the analyze command.
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Name reported for the source
    #[arg(long, default_value = "stdin.py")]
    pub filename: String,

    /// File kind (py, python, sh, bash); derived from the filename if omitted
    #[arg(long)]
    pub kind: Option<String>,
}

/// Run the scan command.
pub fn run_scan(args: &ScanArgs) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'json' or 'pretty'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let config = match Config::load(args.config.as_deref(), Path::new(".")) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: invalid config: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let runner = BatchRunner::new(config)?;
    let files = match runner.collect_files(&args.paths) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    if files.is_empty() {
        tracing::warn!("no files to scan");
    }

    let batch = runner.run_files(&files);
    write_batch(args, &batch)?;

    if batch::has_errors(&batch) {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

fn write_batch(args: &ScanArgs, batch: &BatchReport) -> anyhow::Result<()> {
    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| anyhow::anyhow!("cannot create {}: {}", path.display(), e))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout().lock()),
    };

    match args.format.as_str() {
        "pretty" => report::write_pretty(&mut out, batch)?,
        _ => report::write_json(&mut out, batch)?,
    }
    out.flush()?;
    Ok(())
}

/// Run the analyze command.
pub fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<i32> {
    let mut content = String::new();
    io::stdin().read_to_string(&mut content)?;

    let kind = args
        .kind
        .clone()
        .unwrap_or_else(|| kind_for_filename(&args.filename).to_lowercase());

    let result = analyze_file(&args.filename, &content, &kind);
    let json = serde_json::to_string_pretty(&result)?;
    println!("{}", json);

    if result.is_error() {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_scan_args() {
        let cli = Cli::try_parse_from([
            "tablescan", "-vv", "scan", "a.py", "dir", "--format", "pretty", "-o", "out.json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.paths, vec![PathBuf::from("a.py"), PathBuf::from("dir")]);
                assert_eq!(args.format, "pretty");
                assert_eq!(args.output, Some(PathBuf::from("out.json")));
                assert!(args.config.is_none());
            }
            _ => panic!("expected scan"),
        }
    }

    #[test]
    fn test_scan_requires_paths() {
        assert!(Cli::try_parse_from(["tablescan", "scan"]).is_err());
    }

    #[test]
    fn test_parse_analyze_defaults() {
        let cli = Cli::try_parse_from(["tablescan", "analyze"]).unwrap();
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.filename, "stdin.py");
                assert!(args.kind.is_none());
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_invalid_format() {
        let args = ScanArgs {
            paths: vec![PathBuf::from(".")],
            config: None,
            format: "sarif".to_string(),
            output: None,
        };
        assert_eq!(run_scan(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_scan_writes_output_file() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("model.py");
        fs::write(&src, "class Run(IsDescription):\n    id = Int64Col()\n").unwrap();
        let out = dir.path().join("out.json");

        let args = ScanArgs {
            paths: vec![src.clone()],
            config: None,
            format: "json".to_string(),
            output: Some(out.clone()),
        };
        assert_eq!(run_scan(&args).unwrap(), EXIT_SUCCESS);

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        let key = src.to_string_lossy().to_string();
        assert_eq!(value[&key]["tables"]["Run"]["fields"][0]["type"], "Int64Col");
    }

    #[test]
    fn test_scan_exit_code_on_syntax_error() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("broken.py");
        fs::write(&src, "def f(:\n").unwrap();

        let args = ScanArgs {
            paths: vec![src],
            config: None,
            format: "json".to_string(),
            output: Some(dir.path().join("out.json")),
        };
        assert_eq!(run_scan(&args).unwrap(), EXIT_FAILED);
    }

    #[test]
    fn test_scan_missing_path() {
        let dir = TempDir::new().unwrap();
        let args = ScanArgs {
            paths: vec![dir.path().join("nope")],
            config: None,
            format: "json".to_string(),
            output: Some(dir.path().join("out.json")),
        };
        assert_eq!(run_scan(&args).unwrap(), EXIT_ERROR);
    }
}
