use std::fmt;

/// The document grammar context a template is processed under. Governs which
/// processors are eligible and whether element/attribute names are matched
/// case-sensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateMode {
    Html,
    Xml,
    Text,
    Raw,
}

impl TemplateMode {
    /// Markup-shaped modes produce element structure; `Text` and `Raw` do not.
    pub fn is_markup(self) -> bool {
        matches!(self, TemplateMode::Html | TemplateMode::Xml)
    }

    /// XML is the only mode in which names are compared case-sensitively.
    pub fn is_case_sensitive(self) -> bool {
        matches!(self, TemplateMode::Xml)
    }

    pub const ALL: [TemplateMode; 4] = [
        TemplateMode::Html,
        TemplateMode::Xml,
        TemplateMode::Text,
        TemplateMode::Raw,
    ];
}

impl fmt::Display for TemplateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TemplateMode::Html => "HTML",
            TemplateMode::Xml => "XML",
            TemplateMode::Text => "TEXT",
            TemplateMode::Raw => "RAW",
        };
        f.write_str(name)
    }
}

/// Structural node kinds a processor can be registered against. Fixed at
/// registration time; dispatch is a match on this enum, never re-derived
/// from the processor instance per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Element,
    Text,
    Comment,
    CData,
    DocType,
    ProcessingInstruction,
    XmlDeclaration,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Element => "element",
            NodeKind::Text => "text",
            NodeKind::Comment => "comment",
            NodeKind::CData => "cdata",
            NodeKind::DocType => "doctype",
            NodeKind::ProcessingInstruction => "processing-instruction",
            NodeKind::XmlDeclaration => "xml-declaration",
        };
        f.write_str(name)
    }
}
