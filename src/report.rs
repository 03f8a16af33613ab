//! Conflict report output
//!
//! Non-identical duplicates are written either to standard output or
//! appended to a report file, as text blocks or one JSON object per line.

use crate::cleaning::ConflictRecord;
use crate::errors::{CleanError, Result};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Where conflict reports go
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReportSink {
    #[default]
    Stdout,
    /// Appended to, created if missing
    File(PathBuf),
}

#[derive(Serialize)]
struct JsonLine<'a> {
    file: &'a str,
    #[serde(flatten)]
    conflict: &'a ConflictRecord,
}

impl ReportSink {
    /// Write the conflicts found in `source`. Nothing is written when there are none.
    pub fn write_conflicts(
        &self,
        source: &Path,
        conflicts: &[ConflictRecord],
        format: ReportFormat,
    ) -> Result<()> {
        if conflicts.is_empty() {
            return Ok(());
        }
        match self {
            ReportSink::Stdout => {
                let stdout = io::stdout();
                let mut out = stdout.lock();
                render(&mut out, source, conflicts, format)
                    .map_err(|e| CleanError::Report(e.to_string()))
            }
            ReportSink::File(path) => {
                let mut file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| CleanError::io(path, e))?;
                render(&mut file, source, conflicts, format).map_err(|e| CleanError::io(path, e))?;
                log::info!(
                    "Non-identical duplicates checked and raised in {}",
                    path.display()
                );
                Ok(())
            }
        }
    }
}

/// Render conflicts for one file into `out`
pub fn render<W: Write>(
    out: &mut W,
    source: &Path,
    conflicts: &[ConflictRecord],
    format: ReportFormat,
) -> io::Result<()> {
    let file = source.display().to_string();
    match format {
        ReportFormat::Text => {
            writeln!(out, "CLEANING MEI FILE: {}", file)?;
            for conflict in conflicts {
                writeln!(out)?;
                write!(out, "{}", conflict)?;
            }
            writeln!(out)?;
        }
        ReportFormat::Json => {
            for conflict in conflicts {
                let line = JsonLine {
                    file: &file,
                    conflict,
                };
                serde_json::to_writer(&mut *out, &line)?;
                writeln!(out)?;
            }
        }
    }
    Ok(())
}
