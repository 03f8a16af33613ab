//! Mutable MEI document tree
//!
//! An arena-backed tree built from quick-xml events. Elements keep their raw
//! start and end tags, and everything else (text, comments, processing
//! instructions, CDATA) is kept as the original event, so writing the tree
//! back reproduces the input byte for byte until something is removed.
//!
//! Nodes are addressed by [`NodeId`]. Removal always goes through the parent
//! (`remove_child`), which keeps the parent relation explicit at call sites.

mod parser;
mod writer;
pub mod prolog;

use crate::errors::ParseError;
use quick_xml::events::{BytesEnd, BytesStart, Event};

pub use prolog::{normalize_self_closing, split_prolog};

/// `xml:id` attribute name as written in MEI files
pub const XML_ID: &str = "xml:id";

/// Index of a node inside a [`MeiDocument`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// An element with its tags and decoded attributes
#[derive(Debug, Clone)]
pub struct Element {
    pub(crate) start: BytesStart<'static>,
    /// `None` for self-closing elements
    pub(crate) end: Option<BytesEnd<'static>>,
    name: String,
    attributes: Vec<(String, String)>,
}

impl Element {
    /// Qualified name as written (`mei:zone`, `zone`, ...)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without namespace prefix
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Unescaped value of an attribute, matched on its qualified name
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All attributes in document order
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn id(&self) -> Option<&str> {
        self.attribute(XML_ID)
    }

    pub fn is_self_closing(&self) -> bool {
        self.end.is_none()
    }
}

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Root,
    Element(Element),
    /// Text, comments, PIs, CDATA, declarations
    Markup(Event<'static>),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

/// Parsed MEI document
#[derive(Debug, Clone)]
pub struct MeiDocument {
    nodes: Vec<Node>,
}

impl MeiDocument {
    /// Parse XML text into a document tree
    pub fn parse(xml: &str) -> Result<Self, ParseError> {
        parser::build(xml)
    }

    /// Serialize the whole document exactly as stored
    pub fn to_xml(&self) -> Result<String, ParseError> {
        writer::write_nodes(self, self.children(self.root()))
    }

    /// Serialize one node and its descendants
    pub fn subtree_to_xml(&self, node: NodeId) -> Result<String, ParseError> {
        writer::write_nodes(self, &[node])
    }

    /// The document node that holds the top-level events
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The single top-level element (`<mei>`)
    pub fn root_element(&self) -> Option<NodeId> {
        self.child_elements(self.root()).next()
    }

    pub fn element(&self, node: NodeId) -> Option<&Element> {
        match self.nodes.get(node.0).map(|n| &n.kind) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn child_elements(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(node)
            .iter()
            .copied()
            .filter(move |&c| self.element(c).is_some())
    }

    /// First child element with the given local name
    pub fn find_child(&self, node: NodeId, local_name: &str) -> Option<NodeId> {
        self.child_elements(node)
            .find(|&c| self.element(c).map(|e| e.local_name()) == Some(local_name))
    }

    /// Follow a path of local names from `node`, taking the first match at each step
    pub fn find_path(&self, node: NodeId, path: &[&str]) -> Option<NodeId> {
        path.iter()
            .try_fold(node, |current, step| self.find_child(current, step))
    }

    /// Like [`find_path`](Self::find_path), failing with the missing path
    pub fn require_path(&self, node: NodeId, path: &[&str]) -> Result<NodeId, ParseError> {
        self.find_path(node, path)
            .ok_or_else(|| ParseError::MissingRequiredElement(path.join("/")))
    }

    /// All descendants of `node` in document order, `node` excluded
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Descendant elements of `node` with the given local name
    pub fn descendants_named(&self, node: NodeId, local_name: &str) -> Vec<NodeId> {
        self.descendants(node)
            .into_iter()
            .filter(|&d| self.element(d).map(|e| e.local_name()) == Some(local_name))
            .collect()
    }

    /// Unescaped text before the first child element, `None` when empty
    pub fn leading_text(&self, node: NodeId) -> Option<String> {
        let mut text = String::new();
        for &child in self.children(node) {
            match self.nodes.get(child.0).map(|n| &n.kind) {
                Some(NodeKind::Element(_)) => break,
                Some(NodeKind::Markup(Event::Text(t))) => match t.unescape() {
                    Ok(s) => text.push_str(&s),
                    Err(_) => text.push_str(&String::from_utf8_lossy(t)),
                },
                Some(NodeKind::Markup(Event::CData(c))) => {
                    text.push_str(&String::from_utf8_lossy(c));
                }
                _ => {}
            }
        }
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Whether `node` is still reachable from the document root
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root() {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Whether `ancestor` lies on the parent chain of `node` (a node is not its own ancestor)
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    /// Detach `child` from `parent`.
    ///
    /// A whitespace-only text node directly before `child` goes with it, so
    /// the remaining siblings keep their indentation.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), ParseError> {
        let not_a_child = ParseError::NotAChild {
            parent: parent.0,
            child: child.0,
        };
        let pos = self
            .children(parent)
            .iter()
            .position(|&c| c == child)
            .ok_or(not_a_child)?;

        let start = match pos.checked_sub(1) {
            Some(prev) if self.is_whitespace_text(self.children(parent)[prev]) => prev,
            _ => pos,
        };

        let removed: Vec<NodeId> = self.nodes[parent.0].children.drain(start..=pos).collect();
        for id in removed {
            self.nodes[id.0].parent = None;
        }
        Ok(())
    }

    fn is_whitespace_text(&self, node: NodeId) -> bool {
        match self.nodes.get(node.0).map(|n| &n.kind) {
            Some(NodeKind::Markup(Event::Text(t))) => t.iter().all(|b| b.is_ascii_whitespace()),
            _ => false,
        }
    }

    pub(crate) fn node(&self, node: NodeId) -> &Node {
        &self.nodes[node.0]
    }

    pub(crate) fn from_nodes(nodes: Vec<Node>) -> Self {
        MeiDocument { nodes }
    }
}

pub(crate) fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, local)| local).unwrap_or(name)
}
