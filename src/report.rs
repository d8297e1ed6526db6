//! Output formatting for batch results.
//!
//! Supports two output formats:
//! - JSON: an object keyed by filename, values are analysis reports
//! - Pretty: colored terminal output for human readability

use colored::*;
use std::io::Write;

use crate::batch::BatchReport;
use crate::model::{AnalysisReport, Table};

// =============================================================================
// JSON Format
// =============================================================================

/// Write the batch as pretty-printed JSON followed by a newline.
pub fn write_json<W: Write>(out: &mut W, batch: &BatchReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(batch)?;
    writeln!(out, "{}", json)?;
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write the batch in human-readable form.
pub fn write_pretty<W: Write>(out: &mut W, batch: &BatchReport) -> anyhow::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "  {} v{}",
        "tablescan".cyan().bold(),
        env!("CARGO_PKG_VERSION")
    )?;
    writeln!(out)?;

    for report in batch.values() {
        write_report(out, report)?;
    }

    write_summary(out, batch)?;
    Ok(())
}

fn write_report<W: Write>(out: &mut W, report: &AnalysisReport) -> anyhow::Result<()> {
    if let Some(err) = &report.error {
        writeln!(out, "  {} {}", "✗".red(), report.filename.blue())?;
        writeln!(out, "            {}", err.red())?;
        writeln!(out)?;
        return Ok(());
    }

    let count = report.tables.len();
    writeln!(
        out,
        "  {} {} {}",
        "✓".green(),
        report.filename.blue(),
        format!("({} table{})", count, plural(count)).dimmed()
    )?;

    for table in report.tables.values() {
        write_table(out, table)?;
    }
    writeln!(out)?;
    Ok(())
}

fn write_table<W: Write>(out: &mut W, table: &Table) -> anyhow::Result<()> {
    write!(out, "    {}", table.name.bold())?;
    if let Some(var) = &table.variable_name {
        write!(out, " {}", format!("= {}", var).dimmed())?;
    }
    writeln!(out)?;

    for field in &table.fields {
        let declared = field.declared_type.as_deref().unwrap_or("?");
        writeln!(out, "      {:<20} {}", field.name, declared.yellow())?;
    }
    Ok(())
}

fn write_summary<W: Write>(out: &mut W, batch: &BatchReport) -> anyhow::Result<()> {
    let files = batch.len();
    let failed = batch.values().filter(|r| r.is_error()).count();
    let tables: usize = batch.values().map(|r| r.tables.len()).sum();
    let fields: usize = batch.values().map(AnalysisReport::field_count).sum();

    write!(
        out,
        "  {}",
        format!(
            "{} file{}, {} table{}, {} field{}",
            files,
            plural(files),
            tables,
            plural(tables),
            fields,
            plural(fields)
        )
        .dimmed()
    )?;

    if failed > 0 {
        write!(out, "  {}", format!("{} failed", failed).red())?;
    } else {
        write!(out, "  {}", "OK".green())?;
    }
    writeln!(out)?;
    Ok(())
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
