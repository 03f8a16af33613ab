//! MEI Zone Cleaner
//!
//! Cleans MEI documents whose facsimile section defines zones (bounding
//! boxes) that score elements point at through `facs` attributes. Zones no
//! element references are removed, and zones with identical geometry whose
//! referencing elements are also identical are collapsed onto the first one.
//! Duplicates with differing elements are reported, never merged.

pub mod batch;
pub mod cleaning;
pub mod document;
pub mod errors;
pub mod harness;
pub mod report;

// Re-export commonly used types
pub use cleaning::{CleaningReport, CleaningSettings, ConflictRecord, MeiCleaner};
pub use document::{MeiDocument, NodeId};
pub use errors::{CleanError, ParseError};
