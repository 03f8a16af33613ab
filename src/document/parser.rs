//! Builds the document arena from quick-xml events

use super::{local_part, Element, MeiDocument, Node, NodeId, NodeKind};
use crate::errors::ParseError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

pub(super) fn build(xml: &str) -> Result<MeiDocument, ParseError> {
    let mut reader = Reader::from_str(xml);
    // Whitespace is content here: the writer has to reproduce it
    reader.trim_text(false);

    let mut nodes = vec![Node {
        kind: NodeKind::Root,
        parent: None,
        children: Vec::new(),
    }];
    let mut open: Vec<NodeId> = vec![NodeId(0)];

    loop {
        let event = reader.read_event().map_err(|e| {
            ParseError::InvalidXml(format!(
                "XML error at position {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(start) => {
                let element = decode_element(start.into_owned())?;
                let id = attach(&mut nodes, &open, NodeKind::Element(element));
                open.push(id);
            }
            Event::Empty(start) => {
                let element = decode_element(start.into_owned())?;
                attach(&mut nodes, &open, NodeKind::Element(element));
            }
            Event::End(end) => {
                if open.len() < 2 {
                    return Err(ParseError::InvalidXml(format!(
                        "Unexpected closing tag at position {}",
                        reader.buffer_position()
                    )));
                }
                if let Some(id) = open.pop() {
                    if let NodeKind::Element(element) = &mut nodes[id.0].kind {
                        element.end = Some(end.into_owned());
                    }
                }
            }
            Event::Eof => break,
            other => {
                attach(&mut nodes, &open, NodeKind::Markup(other.into_owned()));
            }
        }
    }

    if open.len() > 1 {
        return Err(ParseError::InvalidXml(format!(
            "{} element(s) left unclosed at end of input",
            open.len() - 1
        )));
    }

    Ok(MeiDocument::from_nodes(nodes))
}

fn attach(nodes: &mut Vec<Node>, open: &[NodeId], kind: NodeKind) -> NodeId {
    let parent = open.last().copied().unwrap_or(NodeId(0));
    let id = NodeId(nodes.len());
    nodes.push(Node {
        kind,
        parent: Some(parent),
        children: Vec::new(),
    });
    nodes[parent.0].children.push(id);
    id
}

fn decode_element(start: BytesStart<'static>) -> Result<Element, ParseError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr
            .map_err(|e| ParseError::InvalidXml(format!("Bad attribute on <{}>: {}", name, e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| {
                ParseError::InvalidXml(format!("Bad value for '{}' on <{}>: {}", key, name, e))
            })?
            .into_owned();
        attributes.push((key, value));
    }

    log::trace!("parsed <{}> ({} attributes)", local_part(&name), attributes.len());

    Ok(Element {
        start,
        end: None,
        name,
        attributes,
    })
}
