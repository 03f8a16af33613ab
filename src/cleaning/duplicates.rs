//! Identical duplicate removal
//!
//! For every group of zones with equal geometry the first zone is kept. Each
//! other zone is compared through the elements that reference it: if both
//! elements carry the same content (attributes other than `xml:id`/`facs`,
//! plus leading text) the redundant element and its zone are removed.
//! Anything else is a non-identical conflict and is left alone. A pair whose
//! elements are nested (one inside the other) is never collapsed, since
//! removing the outer element would take the kept one with it.

use super::references::{Reference, ReferenceIndex, FACS};
use super::zones::{DuplicateGroup, ZoneTable};
use crate::document::{MeiDocument, XML_ID};
use crate::errors::ParseError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// What identifies an element apart from its id and zone reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentIdentity {
    attributes: BTreeMap<String, String>,
    text: Option<String>,
}

impl ContentIdentity {
    pub fn of(doc: &MeiDocument, reference: &Reference) -> Option<Self> {
        let element = doc.element(reference.element)?;
        let attributes = element
            .attributes()
            .iter()
            .filter(|(key, _)| key != XML_ID && key != FACS)
            .cloned()
            .collect();
        Some(ContentIdentity {
            attributes,
            text: doc.leading_text(reference.element),
        })
    }
}

/// One side of a conflicting duplicate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictSide {
    pub zone: String,
    /// `None` when no single element references the zone
    pub element: Option<ElementSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementSnapshot {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
}

/// Duplicate geometry referenced by elements that differ
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictRecord {
    pub kept: ConflictSide,
    pub duplicate: ConflictSide,
}

impl fmt::Display for ConflictSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} >", self.zone)?;
        match &self.element {
            Some(element) => {
                let attributes: Vec<String> = element
                    .attributes
                    .iter()
                    .map(|(k, v)| format!("{}=\"{}\"", k, v))
                    .collect();
                writeln!(
                    f,
                    "\t<{}> {} {}",
                    element.name,
                    attributes.join(" "),
                    element.text.as_deref().unwrap_or("")
                )
            }
            None => writeln!(f, "\t(no unique referencing element)"),
        }
    }
}

impl fmt::Display for ConflictRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "###### NON-IDENTICAL DUPLICATE FOUND ######")?;
        write!(f, "{}", self.kept)?;
        write!(f, "{}", self.duplicate)
    }
}

/// A removed duplicate: its zone reference and the removed element's id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovedDuplicate {
    pub zone: String,
    pub element: String,
}

#[derive(Debug, Default)]
pub struct DuplicateOutcome {
    pub removed: Vec<RemovedDuplicate>,
    pub conflicts: Vec<ConflictRecord>,
}

/// Resolve every duplicate group.
///
/// `remove_identical` controls whether identical duplicates are removed,
/// `raise_nonidentical` whether conflicts are recorded.
pub fn handle_referenced_duplicates(
    doc: &mut MeiDocument,
    zones: &ZoneTable,
    groups: &[DuplicateGroup],
    references: &ReferenceIndex,
    remove_identical: bool,
    raise_nonidentical: bool,
) -> Result<DuplicateOutcome, ParseError> {
    let mut outcome = DuplicateOutcome::default();

    for group in groups {
        let keeper = group.keeper();
        let kept_ref = resolve_attached(doc, references, keeper);
        let kept_identity = kept_ref.and_then(|r| ContentIdentity::of(doc, &r));

        for other in group.redundant() {
            let other_ref = resolve_attached(doc, references, other);
            let other_identity = other_ref.and_then(|r| ContentIdentity::of(doc, &r));

            let nested = match (kept_ref, other_ref) {
                (Some(a), Some(b)) => {
                    doc.is_ancestor(a.element, b.element) || doc.is_ancestor(b.element, a.element)
                }
                _ => false,
            };
            if nested {
                log::warn!(
                    "duplicate zones {} and {} are referenced by nested elements; not collapsing",
                    keeper,
                    other
                );
            }

            let identical = !nested
                && matches!(
                    (&kept_identity, &other_identity),
                    (Some(a), Some(b)) if a == b
                );

            match (identical, other_ref) {
                (true, Some(reference)) => {
                    if remove_identical {
                        outcome
                            .removed
                            .push(remove_duplicate(doc, zones, other, reference)?);
                    }
                }
                _ => {
                    if raise_nonidentical {
                        outcome.conflicts.push(ConflictRecord {
                            kept: side(doc, keeper, kept_ref),
                            duplicate: side(doc, other, other_ref),
                        });
                    }
                }
            }
        }
    }

    Ok(outcome)
}

/// Like [`ReferenceIndex::resolve`], but ignores elements an earlier removal
/// has already cut out of the tree
fn resolve_attached(
    doc: &MeiDocument,
    references: &ReferenceIndex,
    zone_ref: &str,
) -> Option<Reference> {
    references
        .resolve(zone_ref)
        .filter(|r| doc.is_attached(r.element))
}

fn remove_duplicate(
    doc: &mut MeiDocument,
    zones: &ZoneTable,
    zone_ref: &str,
    reference: Reference,
) -> Result<RemovedDuplicate, ParseError> {
    let element_id = doc
        .element(reference.element)
        .and_then(|e| e.id())
        .unwrap_or_default()
        .to_string();

    doc.remove_child(reference.parent, reference.element)?;

    let zone = zones
        .get(zone_ref)
        .ok_or_else(|| ParseError::MissingRequiredElement(format!("zone {}", zone_ref)))?;
    let surface = doc
        .parent(zone.node)
        .ok_or_else(|| ParseError::MissingRequiredElement(format!("parent of zone {}", zone_ref)))?;
    doc.remove_child(surface, zone.node)?;

    log::info!(
        "Identical zone and referencing element removed: {} & {}",
        zone_ref,
        element_id
    );
    Ok(RemovedDuplicate {
        zone: zone_ref.to_string(),
        element: element_id,
    })
}

fn side(doc: &MeiDocument, zone: &str, reference: Option<Reference>) -> ConflictSide {
    let element = reference.and_then(|r| {
        let element = doc.element(r.element)?;
        Some(ElementSnapshot {
            name: element.name().to_string(),
            attributes: element.attributes().to_vec(),
            text: doc.leading_text(r.element),
        })
    });
    ConflictSide {
        zone: zone.to_string(),
        element,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::zones::group_duplicate_zones;

    fn run(xml: &str, remove: bool, raise: bool) -> (MeiDocument, DuplicateOutcome) {
        let mut doc = MeiDocument::parse(xml).unwrap();
        let mei = doc.root_element().unwrap();
        let body = doc.find_path(mei, &["music", "body"]).unwrap();
        let zones = ZoneTable::build(&doc).unwrap();
        let groups = group_duplicate_zones(&zones);
        let index = ReferenceIndex::build(&doc, body);
        let outcome =
            handle_referenced_duplicates(&mut doc, &zones, &groups, &index, remove, raise).unwrap();
        (doc, outcome)
    }

    const IDENTICAL: &str = r##"<mei><music><facsimile><surface>
<zone xml:id="z1" ulx="0" uly="0" lrx="10" lry="10"/>
<zone xml:id="z2" ulx="0" uly="0" lrx="10" lry="10"/>
</surface></facsimile><body><layer>
<syl xml:id="e1" facs="#z1" wordpos="i">la</syl>
<syl xml:id="e2" wordpos="i" facs="#z2">la</syl>
</layer></body></music></mei>"##;

    #[test]
    fn test_identical_duplicate_removes_second() {
        let (doc, outcome) = run(IDENTICAL, true, true);
        assert_eq!(
            outcome.removed,
            vec![RemovedDuplicate {
                zone: "#z2".to_string(),
                element: "e2".to_string()
            }]
        );
        assert!(outcome.conflicts.is_empty());

        let xml = doc.to_xml().unwrap();
        assert!(xml.contains(r#"xml:id="z1""#));
        assert!(xml.contains(r#"xml:id="e1""#));
        assert!(!xml.contains(r#"xml:id="z2""#));
        assert!(!xml.contains(r#"xml:id="e2""#));
    }

    #[test]
    fn test_identical_duplicate_kept_when_removal_disabled() {
        let (doc, outcome) = run(IDENTICAL, false, true);
        assert!(outcome.removed.is_empty());
        assert!(outcome.conflicts.is_empty());
        assert!(doc.to_xml().unwrap().contains(r#"xml:id="e2""#));
    }

    #[test]
    fn test_nonidentical_duplicate_is_raised_and_untouched() {
        let xml = IDENTICAL.replace("facs=\"#z2\">la", "facs=\"#z2\">ma");
        let (doc, outcome) = run(&xml, true, true);
        assert!(outcome.removed.is_empty());
        assert_eq!(outcome.conflicts.len(), 1);

        let conflict = &outcome.conflicts[0];
        assert_eq!(conflict.kept.zone, "#z1");
        assert_eq!(conflict.duplicate.zone, "#z2");
        assert_eq!(
            conflict.duplicate.element.as_ref().unwrap().text.as_deref(),
            Some("ma")
        );
        assert!(conflict.to_string().contains("NON-IDENTICAL DUPLICATE FOUND"));

        let out = doc.to_xml().unwrap();
        for id in ["z1", "z2", "e1", "e2"] {
            assert!(out.contains(&format!("xml:id=\"{}\"", id)));
        }
    }

    #[test]
    fn test_nonidentical_duplicate_ignored_when_not_raised() {
        let xml = IDENTICAL.replace("facs=\"#z2\">la", "facs=\"#z2\">ma");
        let (doc, outcome) = run(&xml, true, false);
        assert!(outcome.removed.is_empty());
        assert!(outcome.conflicts.is_empty());

        let out = doc.to_xml().unwrap();
        assert_eq!(out, MeiDocument::parse(&xml).unwrap().to_xml().unwrap());
        for id in ["z1", "z2", "e1", "e2"] {
            assert!(out.contains(&format!("xml:id=\"{}\"", id)));
        }
    }

    #[test]
    fn test_nested_referencing_elements_are_never_collapsed() {
        // n and c carry the same content; removing n would also remove c
        let xml = r##"<mei><music><facsimile><surface>
<zone xml:id="z1" ulx="0" uly="0" lrx="10" lry="10"/>
<zone xml:id="z2" ulx="0" uly="0" lrx="10" lry="10"/>
</surface></facsimile><body><layer>
<neume xml:id="n" facs="#z2"><nc xml:id="c" facs="#z1"/></neume>
</layer></body></music></mei>"##;

        let (doc, outcome) = run(xml, true, false);
        assert!(outcome.removed.is_empty());
        assert!(outcome.conflicts.is_empty());
        let out = doc.to_xml().unwrap();
        for id in ["z1", "z2", "n", "c"] {
            assert!(out.contains(&format!("xml:id=\"{}\"", id)));
        }

        let (_, outcome) = run(xml, true, true);
        assert!(outcome.removed.is_empty());
        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(outcome.conflicts[0].kept.zone, "#z1");
        assert_eq!(outcome.conflicts[0].duplicate.zone, "#z2");
    }

    #[test]
    fn test_unreferenced_duplicate_is_a_conflict_not_a_crash() {
        let xml = IDENTICAL.replace(r##"<syl xml:id="e2" wordpos="i" facs="#z2">la</syl>"##, "");
        let (_, outcome) = run(&xml, true, true);
        assert!(outcome.removed.is_empty());
        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(outcome.conflicts[0].duplicate.element, None);
    }

    #[test]
    fn test_members_compare_only_with_first() {
        // b and c match each other but not a, so neither is collapsed
        let xml = r##"<mei><music><facsimile><surface>
<zone xml:id="a" ulx="0" uly="0" lrx="1" lry="1"/>
<zone xml:id="b" ulx="0" uly="0" lrx="1" lry="1"/>
<zone xml:id="c" ulx="0" uly="0" lrx="1" lry="1"/>
</surface></facsimile><body>
<nc xml:id="n1" facs="#a" pname="d"/>
<nc xml:id="n2" facs="#b" pname="e"/>
<nc xml:id="n3" facs="#c" pname="e"/>
</body></music></mei>"##;
        let (doc, outcome) = run(xml, true, true);
        assert!(outcome.removed.is_empty());
        let pairs: Vec<(&str, &str)> = outcome
            .conflicts
            .iter()
            .map(|c| (c.kept.zone.as_str(), c.duplicate.zone.as_str()))
            .collect();
        assert_eq!(pairs, vec![("#a", "#b"), ("#a", "#c")]);
        assert!(doc.to_xml().unwrap().contains(r#"xml:id="n3""#));
    }

    #[test]
    fn test_three_identical_zones_keep_only_first() {
        let xml = r##"<mei><music><facsimile><surface>
<zone xml:id="a" ulx="0" uly="0" lrx="1" lry="1"/>
<zone xml:id="b" ulx="0" uly="0" lrx="1" lry="1"/>
<zone xml:id="c" ulx="0" uly="0" lrx="1" lry="1"/>
</surface></facsimile><body>
<nc xml:id="n1" facs="#a"/>
<nc xml:id="n2" facs="#b"/>
<nc xml:id="n3" facs="#c"/>
</body></music></mei>"##;
        let (doc, outcome) = run(xml, true, false);
        assert_eq!(outcome.removed.len(), 2);
        let out = doc.to_xml().unwrap();
        assert!(out.contains(r#"xml:id="n1""#));
        assert!(!out.contains(r#"xml:id="n2""#));
        assert!(!out.contains(r#"xml:id="n3""#));
        assert!(!out.contains(r#"xml:id="c""#));
    }
}
