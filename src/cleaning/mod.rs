//! MEI zone cleaning
//!
//! # Overview
//!
//! A cleaning pass runs in a fixed order on one parsed document:
//! 1. **Unreferenced zones**: zones whose id never appears in the body are dropped
//! 2. **Duplicates**: zones with equal geometry are grouped, identical
//!    referencing elements collapsed onto the first zone, and the rest
//!    reported as conflicts
//!
//! The pass has no rollback. An error part way through leaves the tree
//! partially modified; nothing is written to disk by this module.
//!
//! # Basic Usage
//!
//! ```ignore
//! use mei_cleaner::cleaning::{CleaningSettings, MeiCleaner};
//!
//! let cleaner = MeiCleaner::new(CleaningSettings::default());
//! let (cleaned, report) = cleaner.clean_str(&mei_text)?;
//! for conflict in &report.conflicts {
//!     println!("{}", conflict);
//! }
//! ```

pub mod duplicates;
pub mod references;
pub mod unreferenced;
pub mod zones;

pub use duplicates::{ConflictRecord, ConflictSide, ElementSnapshot, RemovedDuplicate};
pub use references::{Reference, ReferenceIndex};
pub use unreferenced::remove_unreferenced_zones;
pub use zones::{
    find_duplicate_zones, group_duplicate_zones, DuplicateGroup, DuplicatePair, Zone, ZoneTable,
};

use crate::document::{normalize_self_closing, split_prolog, MeiDocument};
use crate::errors::{ParseError, Result};
use serde::{Deserialize, Serialize};

pub(crate) const MUSIC: &str = "music";

/// Which cleaning steps run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningSettings {
    /// Drop zones with no reference in the body
    pub remove_unreferenced: bool,
    /// Collapse identical duplicate pairs
    pub remove_identical_duplicates: bool,
    /// Record duplicates whose referencing elements differ
    pub raise_nonidentical_duplicates: bool,
}

impl Default for CleaningSettings {
    fn default() -> Self {
        CleaningSettings {
            remove_unreferenced: true,
            remove_identical_duplicates: true,
            raise_nonidentical_duplicates: true,
        }
    }
}

/// What a cleaning pass did to one document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleaningReport {
    /// Bare ids of zones removed as unreferenced
    pub unreferenced_removed: Vec<String>,
    pub duplicates_removed: Vec<RemovedDuplicate>,
    pub conflicts: Vec<ConflictRecord>,
}

impl CleaningReport {
    pub fn is_unchanged(&self) -> bool {
        self.unreferenced_removed.is_empty() && self.duplicates_removed.is_empty()
    }
}

/// Runs the cleaning steps selected in its settings
#[derive(Debug, Clone, Default)]
pub struct MeiCleaner {
    settings: CleaningSettings,
}

impl MeiCleaner {
    pub fn new(settings: CleaningSettings) -> Self {
        MeiCleaner { settings }
    }

    pub fn settings(&self) -> &CleaningSettings {
        &self.settings
    }

    /// Clean a parsed document in place
    pub fn clean_document(&self, doc: &mut MeiDocument) -> Result<CleaningReport> {
        let mut report = CleaningReport::default();

        if self.settings.remove_unreferenced {
            report.unreferenced_removed = remove_unreferenced_zones(doc)?;
        }

        let settings = &self.settings;
        if settings.remove_identical_duplicates || settings.raise_nonidentical_duplicates {
            let mei = doc
                .root_element()
                .ok_or_else(|| ParseError::MissingRequiredElement("mei".to_string()))?;
            let body = doc.require_path(mei, &[MUSIC, "body"])?;

            let zones = ZoneTable::build(doc)?;
            let groups = group_duplicate_zones(&zones);
            log::debug!("{} duplicate zone group(s)", groups.len());

            let index = ReferenceIndex::build(doc, body);
            let outcome = duplicates::handle_referenced_duplicates(
                doc,
                &zones,
                &groups,
                &index,
                settings.remove_identical_duplicates,
                settings.raise_nonidentical_duplicates,
            )?;
            report.duplicates_removed = outcome.removed;
            report.conflicts = outcome.conflicts;
        }

        Ok(report)
    }

    /// Clean MEI text: keep the prolog lines, clean the tree, write it back
    /// with `" />"` collapsed to `"/>"`.
    pub fn clean_str(&self, text: &str) -> Result<(String, CleaningReport)> {
        let (prolog, markup) = split_prolog(text);
        let mut doc = MeiDocument::parse(markup)?;
        let report = self.clean_document(&mut doc)?;
        let xml = normalize_self_closing(&doc.to_xml()?);
        Ok((format!("{}{}", prolog, xml), report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<?xml-model href="https://music-encoding.org/schema/5.0/mei-all.rng" type="application/xml"?>
<mei xmlns="http://www.music-encoding.org/ns/mei" meiversion="5.0">
  <music>
    <facsimile>
      <surface>
        <zone xml:id="z1" ulx="0" uly="0" lrx="10" lry="10" />
        <zone xml:id="z2" ulx="0" uly="0" lrx="10" lry="10" />
        <zone xml:id="z3" ulx="5" uly="5" lrx="20" lry="20" />
      </surface>
    </facsimile>
    <body>
      <mdiv>
        <score>
          <section>
            <staff>
              <layer>
                <syllable xml:id="e1" facs="#z1">ka</syllable>
                <syllable xml:id="e2" facs="#z2">ka</syllable>
              </layer>
            </staff>
          </section>
        </score>
      </mdiv>
    </body>
  </music>
</mei>
"##;

    #[test]
    fn test_full_pass_removes_unreferenced_and_duplicate() {
        let cleaner = MeiCleaner::default();
        let (out, report) = cleaner.clean_str(SCENARIO).unwrap();

        assert_eq!(report.unreferenced_removed, vec!["z3".to_string()]);
        assert_eq!(report.duplicates_removed.len(), 1);
        assert_eq!(report.duplicates_removed[0].zone, "#z2");
        assert_eq!(report.duplicates_removed[0].element, "e2");
        assert!(report.conflicts.is_empty());

        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<?xml-model"));
        assert!(out.contains(r#"<zone xml:id="z1" ulx="0" uly="0" lrx="10" lry="10"/>"#));
        assert!(out.contains(r##"<syllable xml:id="e1" facs="#z1">ka</syllable>"##));
        assert!(!out.contains("z2"));
        assert!(!out.contains("e2"));
        assert!(!out.contains("z3"));
    }

    #[test]
    fn test_clean_document_without_steps_is_noop() {
        let cleaner = MeiCleaner::new(CleaningSettings {
            remove_unreferenced: false,
            remove_identical_duplicates: false,
            raise_nonidentical_duplicates: false,
        });
        assert!(!cleaner.settings().remove_unreferenced);
        let (out, report) = cleaner.clean_str(SCENARIO).unwrap();
        assert!(report.is_unchanged());
        assert_eq!(out, SCENARIO.replace(" />", "/>"));
    }

    #[test]
    fn test_clean_input_round_trips() {
        let clean = r##"<?xml version="1.0" encoding="UTF-8"?>
<mei xmlns="http://www.music-encoding.org/ns/mei">
  <music>
    <facsimile>
      <surface>
        <zone xml:id="z1" ulx="0" uly="0" lrx="10" lry="10" />
      </surface>
    </facsimile>
    <body>
      <syl xml:id="s1" facs="#z1">do</syl>
    </body>
  </music>
</mei>
"##;
        let (out, report) = MeiCleaner::default().clean_str(clean).unwrap();
        assert!(report.is_unchanged());
        assert_eq!(out, clean.replace(" />", "/>"));
    }

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: CleaningSettings =
            serde_json::from_str(r#"{"remove_unreferenced": false}"#).unwrap();
        assert!(!settings.remove_unreferenced);
        assert!(settings.remove_identical_duplicates);
        assert!(settings.raise_nonidentical_duplicates);
    }

    #[test]
    fn test_missing_body_fails() {
        let err = MeiCleaner::default()
            .clean_str("<mei><music><facsimile><surface/></facsimile></music></mei>")
            .unwrap_err();
        assert!(matches!(
            err,
            crate::errors::CleanError::Parse(ParseError::MissingRequiredElement(_))
        ));
    }
}
