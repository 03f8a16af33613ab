//! `facs` reference lookup
//!
//! The index is built once per pass over the body, instead of searching the
//! tree for every zone.

use crate::document::{MeiDocument, NodeId};
use std::collections::HashMap;

/// Reference attribute on body elements
pub const FACS: &str = "facs";

/// A body element pointing at a zone, with the parent needed to remove it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub element: NodeId,
    pub parent: NodeId,
}

/// `facs` value → every element carrying it
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    by_target: HashMap<String, Vec<Reference>>,
}

impl ReferenceIndex {
    /// Index every element under `scope` that has a `facs` attribute
    pub fn build(doc: &MeiDocument, scope: NodeId) -> Self {
        let mut by_target: HashMap<String, Vec<Reference>> = HashMap::new();
        for node in doc.descendants(scope) {
            let Some(target) = doc.element(node).and_then(|e| e.attribute(FACS)) else {
                continue;
            };
            let Some(parent) = doc.parent(node) else {
                continue;
            };
            by_target.entry(target.to_string()).or_default().push(Reference {
                element: node,
                parent,
            });
        }
        ReferenceIndex { by_target }
    }

    /// The element referencing `reference` (`#`-prefixed), if exactly one does
    pub fn resolve(&self, reference: &str) -> Option<Reference> {
        match self.by_target.get(reference).map(Vec::as_slice) {
            Some([only]) => Some(*only),
            Some(many) => {
                log::warn!(
                    "zone {} is referenced by {} elements; treating as unresolved",
                    reference,
                    many.len()
                );
                None
            }
            None => None,
        }
    }
}
