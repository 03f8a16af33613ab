//! Post-cleaning check: every declared zone is referenced after `<body>`
//!
//! Works on raw file text with a regular expression, independent of the
//! tree code, so it can audit files produced by any tool.

use crate::batch::has_mei_extension;
use crate::errors::{CleanError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

static ZONE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r#"zone.*xml:id="([a-z0-9-]*)""#).unwrap());
static BODY_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(?:[A-Za-z_][\w.-]*:)?body[\s>]").unwrap());

/// Zone ids declared in `text` that do not occur after the opening body tag.
///
/// Without a body tag every declared zone is unreferenced.
pub fn unreferenced_zone_ids(text: &str) -> Vec<String> {
    let body = BODY_OPEN
        .find(text)
        .map(|m| &text[m.end()..])
        .unwrap_or("");
    ZONE_ID
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|id| !body.contains(id))
        .map(str::to_string)
        .collect()
}

/// Files that failed the check, with their unreferenced zones
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckFailure {
    pub path: PathBuf,
    pub unreferenced: Vec<String>,
}

/// Check a file, or every `.mei` file under a directory (recursively)
pub fn check_mei_files(path: &Path) -> Result<Vec<CheckFailure>> {
    let mut files = Vec::new();
    if path.is_dir() {
        collect_recursive(path, &mut files)?;
        files.sort();
    } else {
        files.push(path.to_path_buf());
    }

    let mut failures = Vec::new();
    for file in files {
        let text = fs::read_to_string(&file).map_err(|e| CleanError::io(&file, e))?;
        let unreferenced = unreferenced_zone_ids(&text);
        if !unreferenced.is_empty() {
            log::warn!(
                "{} unreferenced zones detected in {}",
                unreferenced.len(),
                file.display()
            );
            failures.push(CheckFailure {
                path: file,
                unreferenced,
            });
        }
    }
    Ok(failures)
}

fn collect_recursive(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| CleanError::io(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| CleanError::io(dir, e))?.path();
        if path.is_dir() {
            collect_recursive(&path, out)?;
        } else if has_mei_extension(&path) {
            out.push(path);
        }
    }
    Ok(())
}
