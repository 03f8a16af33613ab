//! Error types for MEI cleaning
//!
//! Defines the error hierarchy for cleaning failures, with fatal document
//! errors (ParseError) and the I/O and reporting errors raised at the
//! file boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level cleaning error type
#[derive(Debug, Error)]
pub enum CleanError {
    /// Fatal document error
    #[error("MEI document error: {0}")]
    Parse(#[from] ParseError),

    /// Reading or writing a file failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A conflict report could not be written
    #[error("Report error: {0}")]
    Report(String),
}

/// Fatal document errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// XML is malformed (not well-formed)
    #[error("Invalid XML: {0}")]
    InvalidXml(String),

    /// Required structural element is missing
    #[error("Missing required element: {0}")]
    MissingRequiredElement(String),

    /// An attribute is present but its value cannot be interpreted
    #[error("Invalid value {value:?} for attribute '{attribute}' on {element}")]
    InvalidAttribute {
        element: String,
        attribute: String,
        value: String,
    },

    /// Removal was asked for a node that is not a child of the given parent
    #[error("Node {child} is not a child of node {parent}")]
    NotAChild { parent: usize, child: usize },
}

pub type Result<T> = std::result::Result<T, CleanError>;

impl CleanError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CleanError::Io {
            path: path.into(),
            source,
        }
    }
}
