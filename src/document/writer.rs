//! Writes the stored events back out

use super::{MeiDocument, NodeId, NodeKind};
use crate::errors::ParseError;
use quick_xml::events::Event;
use quick_xml::Writer;

pub(super) fn write_nodes(doc: &MeiDocument, nodes: &[NodeId]) -> Result<String, ParseError> {
    let mut writer = Writer::new(Vec::new());
    for &node in nodes {
        write_node(doc, &mut writer, node)?;
    }
    String::from_utf8(writer.into_inner())
        .map_err(|e| ParseError::InvalidXml(format!("Serialized output is not UTF-8: {}", e)))
}

fn write_node(
    doc: &MeiDocument,
    writer: &mut Writer<Vec<u8>>,
    node: NodeId,
) -> Result<(), ParseError> {
    let entry = doc.node(node);
    match &entry.kind {
        NodeKind::Root => {
            for &child in &entry.children {
                write_node(doc, writer, child)?;
            }
        }
        NodeKind::Element(element) => match &element.end {
            None => emit(writer, Event::Empty(element.start.borrow()))?,
            Some(end) => {
                emit(writer, Event::Start(element.start.borrow()))?;
                for &child in &entry.children {
                    write_node(doc, writer, child)?;
                }
                emit(writer, Event::End(end.borrow()))?;
            }
        },
        NodeKind::Markup(event) => emit(writer, event.borrow())?,
    }
    Ok(())
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), ParseError> {
    writer
        .write_event(event)
        .map_err(|e| ParseError::InvalidXml(format!("Failed to write XML: {}", e)))
}
