use std::fmt;
use std::sync::Arc;
use trellis_event::{NodeKind, TemplateMode};

/// A transformation rule contributed by a dialect.
///
/// The structural node kind a processor applies to is declared once, here,
/// and dispatch is a match on [`NodeKind`] — never re-derived per event.
/// Lower precedence values execute earlier; ties keep registration order.
pub trait Processor: Send + Sync {
    fn template_mode(&self) -> TemplateMode;

    fn node_kind(&self) -> NodeKind;

    fn precedence(&self) -> i32;

    /// For element processors: the element name this processor targets, to
    /// be qualified with the owning dialect's prefix. `None` matches any
    /// element.
    fn element_name(&self) -> Option<&str> {
        None
    }

    /// For element processors triggered by an attribute: the attribute name
    /// this processor targets, qualified with the owning dialect's prefix.
    fn attribute_name(&self) -> Option<&str> {
        None
    }
}

/// A processor tagged with its owning dialect and resolved prefix, as stored
/// in the built registry.
#[derive(Clone)]
pub struct BoundProcessor {
    dialect: String,
    prefix: Option<String>,
    processor: Arc<dyn Processor>,
}

impl BoundProcessor {
    pub(crate) fn new(
        dialect: impl Into<String>,
        prefix: Option<String>,
        processor: Arc<dyn Processor>,
    ) -> Self {
        BoundProcessor {
            dialect: dialect.into(),
            prefix,
            processor,
        }
    }

    pub fn dialect(&self) -> &str {
        &self.dialect
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn processor(&self) -> &Arc<dyn Processor> {
        &self.processor
    }

    pub fn template_mode(&self) -> TemplateMode {
        self.processor.template_mode()
    }

    pub fn node_kind(&self) -> NodeKind {
        self.processor.node_kind()
    }

    pub fn precedence(&self) -> i32 {
        self.processor.precedence()
    }

    /// The element name this processor targets, qualified with the dialect
    /// prefix (`prefix:name`) when one is in force.
    pub fn qualified_element_name(&self) -> Option<String> {
        self.processor.element_name().map(|name| self.qualify(name))
    }

    /// The attribute name this processor targets, qualified with the dialect
    /// prefix when one is in force.
    pub fn qualified_attribute_name(&self) -> Option<String> {
        self.processor
            .attribute_name()
            .map(|name| self.qualify(name))
    }

    fn qualify(&self, name: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{name}"),
            None => name.to_string(),
        }
    }

    /// Identity of the underlying processor allocation; used for the
    /// cross-dialect uniqueness check.
    pub(crate) fn identity(processor: &Arc<dyn Processor>) -> usize {
        Arc::as_ptr(processor) as *const () as usize
    }
}

impl fmt::Debug for BoundProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundProcessor")
            .field("dialect", &self.dialect)
            .field("prefix", &self.prefix)
            .field("template_mode", &self.template_mode())
            .field("node_kind", &self.node_kind())
            .field("precedence", &self.precedence())
            .finish()
    }
}
