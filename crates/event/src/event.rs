use crate::location::Location;
use crate::mode::NodeKind;
use std::fmt;

/// A parsed attribute attached to an element start event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Attribute {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A structural markup event as delivered by the external parser.
///
/// Element open and close tags are split into start/end sub-events: depth
/// accounting in the selector layer happens between the two, and getting
/// that interleaving wrong causes off-by-one inclusion at block boundaries.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupEvent {
    DocumentStart,
    DocumentEnd,
    XmlDeclaration {
        version: String,
        encoding: Option<String>,
        standalone: Option<String>,
        location: Location,
    },
    DocType {
        content: String,
        location: Location,
    },
    OpenElementStart {
        name: String,
        attributes: Vec<Attribute>,
        location: Location,
    },
    OpenElementEnd {
        name: String,
        location: Location,
    },
    CloseElementStart {
        name: String,
        location: Location,
    },
    CloseElementEnd {
        name: String,
        location: Location,
    },
    StandaloneElementStart {
        name: String,
        attributes: Vec<Attribute>,
        location: Location,
    },
    StandaloneElementEnd {
        name: String,
        location: Location,
    },
    Text {
        content: String,
        location: Location,
    },
    Comment {
        content: String,
        location: Location,
    },
    CData {
        content: String,
        location: Location,
    },
    ProcessingInstruction {
        target: String,
        content: Option<String>,
        location: Location,
    },
}

impl MarkupEvent {
    /// The registry classification of this event, if processors can be
    /// registered against it.
    pub fn node_kind(&self) -> Option<NodeKind> {
        match self {
            MarkupEvent::OpenElementStart { .. }
            | MarkupEvent::OpenElementEnd { .. }
            | MarkupEvent::CloseElementStart { .. }
            | MarkupEvent::CloseElementEnd { .. }
            | MarkupEvent::StandaloneElementStart { .. }
            | MarkupEvent::StandaloneElementEnd { .. } => Some(NodeKind::Element),
            MarkupEvent::Text { .. } => Some(NodeKind::Text),
            MarkupEvent::Comment { .. } => Some(NodeKind::Comment),
            MarkupEvent::CData { .. } => Some(NodeKind::CData),
            MarkupEvent::DocType { .. } => Some(NodeKind::DocType),
            MarkupEvent::ProcessingInstruction { .. } => Some(NodeKind::ProcessingInstruction),
            MarkupEvent::XmlDeclaration { .. } => Some(NodeKind::XmlDeclaration),
            MarkupEvent::DocumentStart | MarkupEvent::DocumentEnd => None,
        }
    }

    pub fn element_name(&self) -> Option<&str> {
        match self {
            MarkupEvent::OpenElementStart { name, .. }
            | MarkupEvent::OpenElementEnd { name, .. }
            | MarkupEvent::CloseElementStart { name, .. }
            | MarkupEvent::CloseElementEnd { name, .. }
            | MarkupEvent::StandaloneElementStart { name, .. }
            | MarkupEvent::StandaloneElementEnd { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        self.node_kind() == Some(NodeKind::Element)
    }
}

impl fmt::Display for MarkupEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkupEvent::DocumentStart => write!(f, "document-start"),
            MarkupEvent::DocumentEnd => write!(f, "document-end"),
            MarkupEvent::XmlDeclaration { version, .. } => write!(f, "xml-decl({version})"),
            MarkupEvent::DocType { .. } => write!(f, "doctype"),
            MarkupEvent::OpenElementStart { name, .. } => write!(f, "open-start({name})"),
            MarkupEvent::OpenElementEnd { name, .. } => write!(f, "open-end({name})"),
            MarkupEvent::CloseElementStart { name, .. } => write!(f, "close-start({name})"),
            MarkupEvent::CloseElementEnd { name, .. } => write!(f, "close-end({name})"),
            MarkupEvent::StandaloneElementStart { name, .. } => {
                write!(f, "standalone-start({name})")
            }
            MarkupEvent::StandaloneElementEnd { name, .. } => write!(f, "standalone-end({name})"),
            MarkupEvent::Text { content, .. } => write!(f, "text({content})"),
            MarkupEvent::Comment { .. } => write!(f, "comment"),
            MarkupEvent::CData { .. } => write!(f, "cdata"),
            MarkupEvent::ProcessingInstruction { target, .. } => write!(f, "pi({target})"),
        }
    }
}

/// Consumer of a structural event stream. Implementations must tolerate
/// being re-entered with further events after an arbitrary pause: the
/// external parser may deliver the document in buffers.
pub trait MarkupHandler {
    fn handle(&mut self, event: MarkupEvent);
}

/// A handler that records every event it receives. Used as the terminal
/// sink in tests and as a buffering collector.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<MarkupEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        EventCollector::default()
    }

    pub fn events(&self) -> &[MarkupEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<MarkupEvent> {
        self.events
    }

    /// Compact one-line-per-event rendering, convenient for assertions.
    pub fn summary(&self) -> Vec<String> {
        self.events.iter().map(|e| e.to_string()).collect()
    }
}

impl MarkupHandler for EventCollector {
    fn handle(&mut self, event: MarkupEvent) {
        self.events.push(event);
    }
}
