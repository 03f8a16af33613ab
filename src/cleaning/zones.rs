//! Zone table and duplicate detection
//!
//! Zones are the facsimile bounding boxes (`<zone ulx uly lrx lry rotate>`).
//! Two zones are duplicates when their coordinates and rotation are exactly
//! equal; no tolerance is applied and box orientation is not validated.

use crate::document::{MeiDocument, NodeId};
use crate::errors::ParseError;
use serde::Serialize;
use std::collections::HashMap;

const COORDINATE_NAMES: [&str; 4] = ["ulx", "uly", "lrx", "lry"];
const MISSING_COORDINATE: i64 = -1;

/// Geometry of a zone
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Zone {
    /// ulx, uly, lrx, lry
    pub coordinates: [i64; 4],
    pub rotate: f64,
}

impl Zone {
    pub fn new(ulx: i64, uly: i64, lrx: i64, lry: i64) -> Self {
        Zone {
            coordinates: [ulx, uly, lrx, lry],
            rotate: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ZoneEntry {
    /// `#`-prefixed id, as written in `facs` attributes
    pub reference: String,
    pub node: NodeId,
    pub zone: Zone,
}

impl ZoneEntry {
    /// The id without its `#`
    pub fn bare_id(&self) -> &str {
        bare_id(&self.reference)
    }
}

/// Zones of a document keyed by reference, in document order
#[derive(Debug, Clone, Default)]
pub struct ZoneTable {
    entries: Vec<ZoneEntry>,
    by_reference: HashMap<String, usize>,
}

impl ZoneTable {
    /// Read every `zone` element in the document
    pub fn build(doc: &MeiDocument) -> Result<Self, ParseError> {
        let mut table = ZoneTable::default();
        let zones = doc.descendants_named(doc.root(), "zone");

        for node in zones {
            let Some(element) = doc.element(node) else {
                continue;
            };
            let id = element.id().unwrap_or_default();
            let describe = || format!("zone '{}'", id);

            let mut coordinates = [MISSING_COORDINATE; 4];
            for (slot, name) in coordinates.iter_mut().zip(COORDINATE_NAMES) {
                if let Some(raw) = element.attribute(name) {
                    *slot = raw.trim().parse().map_err(|_| ParseError::InvalidAttribute {
                        element: describe(),
                        attribute: name.to_string(),
                        value: raw.to_string(),
                    })?;
                }
            }

            let rotate = match element.attribute("rotate") {
                Some(raw) => raw.trim().parse::<f64>().map_err(|_| ParseError::InvalidAttribute {
                    element: describe(),
                    attribute: "rotate".to_string(),
                    value: raw.to_string(),
                })?,
                None => 0.0,
            };

            table.insert(ZoneEntry {
                reference: format!("#{}", id),
                node,
                zone: Zone { coordinates, rotate },
            });
        }

        log::debug!("zone table built with {} zones", table.len());
        Ok(table)
    }

    /// Later entries with an existing reference replace the earlier one in place
    pub fn insert(&mut self, entry: ZoneEntry) {
        match self.by_reference.get(&entry.reference) {
            Some(&index) => self.entries[index] = entry,
            None => {
                self.by_reference
                    .insert(entry.reference.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn get(&self, reference: &str) -> Option<&ZoneEntry> {
        self.by_reference
            .get(reference)
            .map(|&index| &self.entries[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ZoneEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Two zone references with equal geometry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicatePair {
    pub first: String,
    pub second: String,
}

impl DuplicatePair {
    /// Pair membership regardless of order
    pub fn contains_pair(&self, a: &str, b: &str) -> bool {
        (self.first == a && self.second == b) || (self.first == b && self.second == a)
    }
}

/// Zones sharing one geometry, in table order; the first is kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub references: Vec<String>,
}

impl DuplicateGroup {
    pub fn keeper(&self) -> &str {
        &self.references[0]
    }

    pub fn redundant(&self) -> &[String] {
        &self.references[1..]
    }
}

/// Every pair of zones with equal geometry, in table order.
///
/// Three identical zones give three pairs.
pub fn find_duplicate_zones(table: &ZoneTable) -> Vec<DuplicatePair> {
    let entries: Vec<&ZoneEntry> = table.iter().collect();
    let mut pairs = Vec::new();
    for (i, a) in entries.iter().enumerate() {
        for b in &entries[i + 1..] {
            if a.zone == b.zone {
                pairs.push(DuplicatePair {
                    first: a.reference.clone(),
                    second: b.reference.clone(),
                });
            }
        }
    }
    pairs
}

/// Equality classes of two or more zones, ordered by first occurrence
pub fn group_duplicate_zones(table: &ZoneTable) -> Vec<DuplicateGroup> {
    let mut classes: Vec<(Zone, Vec<String>)> = Vec::new();
    for entry in table.iter() {
        match classes.iter_mut().find(|(zone, _)| *zone == entry.zone) {
            Some((_, members)) => members.push(entry.reference.clone()),
            None => classes.push((entry.zone, vec![entry.reference.clone()])),
        }
    }

    classes
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(_, references)| DuplicateGroup { references })
        .collect()
}

pub(crate) fn bare_id(reference: &str) -> &str {
    reference.strip_prefix('#').unwrap_or(reference)
}
