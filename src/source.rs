//! Bridge from a `quick-xml` pull parser to the structural event contract.
//!
//! Tokenizing markup is the job of the external parser; this module only
//! adapts its pull events into the push sequence a [`MarkupHandler`]
//! expects, splitting element tags into start/end sub-events and attaching
//! line/column provenance.

use crate::engine::EngineError;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event as XmlEvent};
use trellis_event::{Attribute, EventCollector, Location, MarkupEvent, MarkupHandler};

/// Reads `markup` and pushes the resulting event sequence into `handler`,
/// bracketed by document-start/document-end.
pub fn emit_events<H: MarkupHandler>(markup: &str, handler: &mut H) -> Result<(), EngineError> {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();

    handler.handle(MarkupEvent::DocumentStart);

    loop {
        let pos = reader.buffer_position() as usize;
        let location = line_col_at(markup, pos);
        match reader.read_event_into(&mut buf)? {
            XmlEvent::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let attributes = collect_attributes(&e)?;
                handler.handle(MarkupEvent::OpenElementStart {
                    name: name.clone(),
                    attributes,
                    location,
                });
                handler.handle(MarkupEvent::OpenElementEnd { name, location });
            }
            XmlEvent::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let attributes = collect_attributes(&e)?;
                handler.handle(MarkupEvent::StandaloneElementStart {
                    name: name.clone(),
                    attributes,
                    location,
                });
                handler.handle(MarkupEvent::StandaloneElementEnd { name, location });
            }
            XmlEvent::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                handler.handle(MarkupEvent::CloseElementStart {
                    name: name.clone(),
                    location,
                });
                handler.handle(MarkupEvent::CloseElementEnd { name, location });
            }
            XmlEvent::Text(e) => {
                handler.handle(MarkupEvent::Text {
                    content: String::from_utf8_lossy(&e).to_string(),
                    location,
                });
            }
            XmlEvent::CData(e) => {
                handler.handle(MarkupEvent::CData {
                    content: String::from_utf8_lossy(&e.into_inner()).to_string(),
                    location,
                });
            }
            XmlEvent::Comment(e) => {
                handler.handle(MarkupEvent::Comment {
                    content: String::from_utf8_lossy(&e).to_string(),
                    location,
                });
            }
            XmlEvent::PI(e) => {
                let content = String::from_utf8_lossy(&e).to_string();
                let (target, data) = match content.split_once(' ') {
                    Some((target, data)) => (target.to_string(), Some(data.to_string())),
                    None => (content, None),
                };
                handler.handle(MarkupEvent::ProcessingInstruction {
                    target,
                    content: data,
                    location,
                });
            }
            XmlEvent::Decl(e) => {
                let version = String::from_utf8_lossy(e.version()?.as_ref()).to_string();
                let encoding = match e.encoding() {
                    Some(encoding) => {
                        Some(String::from_utf8_lossy(encoding?.as_ref()).to_string())
                    }
                    None => None,
                };
                let standalone = match e.standalone() {
                    Some(standalone) => {
                        Some(String::from_utf8_lossy(standalone?.as_ref()).to_string())
                    }
                    None => None,
                };
                handler.handle(MarkupEvent::XmlDeclaration {
                    version,
                    encoding,
                    standalone,
                    location,
                });
            }
            XmlEvent::DocType(e) => {
                handler.handle(MarkupEvent::DocType {
                    content: String::from_utf8_lossy(&e).to_string(),
                    location,
                });
            }
            XmlEvent::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    handler.handle(MarkupEvent::DocumentEnd);
    Ok(())
}

/// Parses `markup` into its full event sequence.
pub fn collect_events(markup: &str) -> Result<Vec<MarkupEvent>, EngineError> {
    let mut collector = EventCollector::new();
    emit_events(markup, &mut collector)?;
    Ok(collector.into_events())
}

/// Parses `markup` and keeps only the events inside blocks matched by
/// `selector`.
pub fn select_blocks(
    markup: &str,
    selector: &str,
    case_sensitive: bool,
) -> Result<Vec<MarkupEvent>, EngineError> {
    let mut handler =
        trellis_selector::BlockSelector::new(selector, case_sensitive, EventCollector::new())?;
    emit_events(markup, &mut handler)?;
    Ok(handler.into_downstream().into_events())
}

fn collect_attributes(e: &BytesStart) -> Result<Vec<Attribute>, EngineError> {
    let mut attributes = Vec::new();
    for attribute in e.attributes() {
        let attribute = attribute?;
        attributes.push(Attribute {
            name: String::from_utf8_lossy(attribute.key.as_ref()).to_string(),
            value: String::from_utf8_lossy(&attribute.value).to_string(),
        });
    }
    Ok(attributes)
}

fn line_col_at(source: &str, pos: usize) -> Location {
    let upto = &source[..pos.min(source.len())];
    let line = upto.matches('\n').count() + 1;
    let col = upto.len() - upto.rfind('\n').map(|i| i + 1).unwrap_or(0) + 1;
    Location { line, col }
}
