//! File and directory processing
//!
//! Each file is read whole, cleaned in memory and written whole. Files are
//! processed one after another; the first error stops the batch.

use crate::cleaning::{CleaningReport, MeiCleaner};
use crate::errors::{CleanError, Result};
use crate::report::{ReportFormat, ReportSink};
use std::fs;
use std::path::{Path, PathBuf};

pub const MEI_EXTENSION: &str = "mei";

/// Result of cleaning one file
#[derive(Debug, Clone)]
pub struct FileSummary {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub report: CleaningReport,
}

/// Clean a single file or every `.mei` file directly inside a directory.
///
/// `destination` mirrors the shape of `path` (a file for a file, a
/// directory for a directory); without it files are overwritten in place.
pub fn clean_mei_files(
    path: &Path,
    destination: Option<&Path>,
    cleaner: &MeiCleaner,
    sink: &ReportSink,
    format: ReportFormat,
) -> Result<Vec<FileSummary>> {
    if path.is_dir() {
        if let Some(dest) = destination {
            fs::create_dir_all(dest).map_err(|e| CleanError::io(dest, e))?;
        }
        let files = list_mei_files(path)?;
        log::debug!("{} MEI file(s) in {}", files.len(), path.display());

        let mut summaries = Vec::with_capacity(files.len());
        for file in files {
            let target = match (destination, file.file_name()) {
                (Some(dest), Some(name)) => dest.join(name),
                _ => file.clone(),
            };
            summaries.push(clean_mei_file(&file, &target, cleaner, sink, format)?);
        }
        Ok(summaries)
    } else {
        let target = destination.unwrap_or(path);
        Ok(vec![clean_mei_file(path, target, cleaner, sink, format)?])
    }
}

/// Clean `source` and write the result to `destination`
pub fn clean_mei_file(
    source: &Path,
    destination: &Path,
    cleaner: &MeiCleaner,
    sink: &ReportSink,
    format: ReportFormat,
) -> Result<FileSummary> {
    log::info!("CLEANING MEI FILE: {}", source.display());

    let text = read_mei_file(source)?;
    let (cleaned, report) = cleaner.clean_str(&text)?;
    sink.write_conflicts(source, &report.conflicts, format)?;
    save_mei_file(destination, &cleaned)?;

    log::debug!(
        "{}: {} unreferenced, {} duplicate(s) removed, {} conflict(s)",
        source.display(),
        report.unreferenced_removed.len(),
        report.duplicates_removed.len(),
        report.conflicts.len()
    );

    Ok(FileSummary {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        report,
    })
}

pub fn read_mei_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| CleanError::io(path, e))
}

pub fn save_mei_file(path: &Path, xml: &str) -> Result<()> {
    fs::write(path, xml).map_err(|e| CleanError::io(path, e))
}

/// `.mei` files directly inside `dir`, sorted by name
pub fn list_mei_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| CleanError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| CleanError::io(dir, e))?.path();
        if path.is_file() && has_mei_extension(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub(crate) fn has_mei_extension(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(MEI_EXTENSION)
}
