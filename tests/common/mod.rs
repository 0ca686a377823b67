//! Shared dialect fixtures for the integration tests.

use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use trellis::{Dialect, ExpressionObjectFactory, NodeKind, Processor, TemplateMode};

pub struct FixtureProcessor {
    kind: NodeKind,
    precedence: i32,
    element: Option<&'static str>,
    attribute: Option<&'static str>,
}

impl FixtureProcessor {
    pub fn element(precedence: i32, element: &'static str) -> Arc<dyn Processor> {
        Arc::new(FixtureProcessor {
            kind: NodeKind::Element,
            precedence,
            element: Some(element),
            attribute: None,
        })
    }

    pub fn attribute(precedence: i32, attribute: &'static str) -> Arc<dyn Processor> {
        Arc::new(FixtureProcessor {
            kind: NodeKind::Element,
            precedence,
            element: None,
            attribute: Some(attribute),
        })
    }

    pub fn of_kind(kind: NodeKind, precedence: i32) -> Arc<dyn Processor> {
        Arc::new(FixtureProcessor {
            kind,
            precedence,
            element: None,
            attribute: None,
        })
    }
}

impl Processor for FixtureProcessor {
    fn template_mode(&self) -> TemplateMode {
        TemplateMode::Html
    }
    fn node_kind(&self) -> NodeKind {
        self.kind
    }
    fn precedence(&self) -> i32 {
        self.precedence
    }
    fn element_name(&self) -> Option<&str> {
        self.element
    }
    fn attribute_name(&self) -> Option<&str> {
        self.attribute
    }
}

pub struct FixtureFactory {
    pub names: Vec<&'static str>,
}

impl ExpressionObjectFactory for FixtureFactory {
    fn object_names(&self) -> Vec<String> {
        self.names.iter().map(|n| n.to_string()).collect()
    }
    fn build_object(&self, name: &str) -> Option<Value> {
        self.names
            .iter()
            .find(|n| **n == name)
            .map(|n| json!({ "object": n }))
    }
}

/// A dialect shaped like a real standard dialect: prefixed attribute and
/// element processors, a text processor, execution attributes and
/// expression objects.
pub struct StandardFixtureDialect {
    pub processors: Vec<Arc<dyn Processor>>,
}

impl StandardFixtureDialect {
    pub fn new() -> Self {
        StandardFixtureDialect {
            processors: vec![
                FixtureProcessor::attribute(300, "if"),
                FixtureProcessor::attribute(1000, "text"),
                FixtureProcessor::element(500, "block"),
                FixtureProcessor::of_kind(NodeKind::Text, 100),
                FixtureProcessor::of_kind(NodeKind::Comment, 1100),
            ],
        }
    }
}

impl Dialect for StandardFixtureDialect {
    fn name(&self) -> &str {
        "standard"
    }
    fn prefix(&self) -> Option<&str> {
        Some("tl")
    }
    fn processors(&self) -> Vec<Arc<dyn Processor>> {
        self.processors.clone()
    }
    fn execution_attributes(&self) -> HashMap<String, Value> {
        HashMap::from([("expression-evaluator".to_string(), json!("standard"))])
    }
    fn expression_object_factory(&self) -> Option<Arc<dyn ExpressionObjectFactory>> {
        Some(Arc::new(FixtureFactory {
            names: vec!["strings", "dates"],
        }))
    }
}
