//! Removal of zones nothing in the body points at
//!
//! A zone counts as referenced when its bare id occurs anywhere in the
//! serialized body text. This is looser than matching `facs` values: an id
//! that appears incidentally (in another attribute, in text) keeps the zone.

use super::MUSIC;
use crate::document::MeiDocument;
use crate::errors::ParseError;

/// Remove unreferenced zones from every facsimile surface.
///
/// Returns the bare ids of the removed zones, in document order.
pub fn remove_unreferenced_zones(doc: &mut MeiDocument) -> Result<Vec<String>, ParseError> {
    let mei = doc
        .root_element()
        .ok_or_else(|| ParseError::MissingRequiredElement("mei".to_string()))?;
    let music = doc.require_path(mei, &[MUSIC])?;
    let body = doc.require_path(music, &["body"])?;
    // Fails on a document without any facsimile surface
    doc.require_path(music, &["facsimile", "surface"])?;

    let body_text = doc.subtree_to_xml(body)?;

    // Snapshot the targets before touching the tree
    let mut targets = Vec::new();
    for facsimile in doc.child_elements(music).collect::<Vec<_>>() {
        if doc.element(facsimile).map(|e| e.local_name()) != Some("facsimile") {
            continue;
        }
        for surface in doc.child_elements(facsimile).collect::<Vec<_>>() {
            if doc.element(surface).map(|e| e.local_name()) != Some("surface") {
                continue;
            }
            for zone in doc.child_elements(surface) {
                let Some(element) = doc.element(zone) else {
                    continue;
                };
                if element.local_name() != "zone" {
                    continue;
                }
                let id = element.id().unwrap_or_default();
                if !body_text.contains(id) {
                    targets.push((surface, zone, id.to_string()));
                }
            }
        }
    }

    let mut removed = Vec::with_capacity(targets.len());
    for (surface, zone, id) in targets {
        doc.remove_child(surface, zone)?;
        log::info!("Unreferenced zone removed: {}", id);
        removed.push(id);
    }

    log::debug!("{} unreferenced zone(s) removed", removed.len());
    Ok(removed)
}
