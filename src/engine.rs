//! The engine composition root: one immutable configuration per engine, one
//! processing context per document.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use trellis_context::VariableScopes;
use trellis_dialect::{BoundProcessor, ConfigurationError, DialectConfig, Registry};
use trellis_event::{MarkupEvent, MarkupHandler, NodeKind, TemplateMode};
use trellis_selector::{BlockSelector, SelectorError};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error("markup source error: {0}")]
    MarkupSource(#[from] quick_xml::Error),
}

impl From<quick_xml::events::attributes::AttrError> for EngineError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        EngineError::MarkupSource(quick_xml::Error::InvalidAttr(e))
    }
}

/// Immutable engine configuration: the merged dialect registry plus the
/// template mode it was built for.
///
/// Built once at startup, then shared: cloning an `EngineConfig` is cheap
/// and every clone reads the same frozen registry. Concurrent documents each
/// take their own [`ProcessingContext`]; nothing here is ever mutated after
/// `build` returns.
#[derive(Clone)]
pub struct EngineConfig {
    template_mode: TemplateMode,
    registry: Arc<Registry>,
}

impl EngineConfig {
    /// Builds the registry from the configured dialects. Any configuration
    /// collision aborts initialization; there is no partially built engine.
    pub fn build(
        template_mode: TemplateMode,
        dialects: Vec<DialectConfig>,
    ) -> Result<Self, EngineError> {
        let registry = Registry::build(dialects)?;
        log::debug!("engine configuration built for {template_mode} mode");
        Ok(EngineConfig {
            template_mode,
            registry: Arc::new(registry),
        })
    }

    pub fn template_mode(&self) -> TemplateMode {
        self.template_mode
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Whether names are matched case-sensitively under this configuration.
    pub fn case_sensitive(&self) -> bool {
        self.template_mode.is_case_sensitive()
    }

    /// A fresh per-document processing context.
    pub fn processing_context(&self) -> ProcessingContext {
        ProcessingContext {
            config: self.clone(),
            variables: VariableScopes::new(),
        }
    }

    /// A fresh processing context with initial root-level variables.
    pub fn processing_context_with(
        &self,
        variables: HashMap<String, Value>,
    ) -> ProcessingContext {
        ProcessingContext {
            config: self.clone(),
            variables: VariableScopes::with_variables(variables),
        }
    }
}

/// Per-document processing state: the variable stack plus a handle on the
/// shared configuration. Owned by exactly one document walk; never shared.
pub struct ProcessingContext {
    config: EngineConfig,
    variables: VariableScopes,
}

impl ProcessingContext {
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        self.config.registry()
    }

    pub fn variables(&self) -> &VariableScopes {
        &self.variables
    }

    pub fn variables_mut(&mut self) -> &mut VariableScopes {
        &mut self.variables
    }

    /// The processors applicable to an event, in precedence order. Element
    /// events resolve through the pre-built element definitions so no
    /// per-event matching happens; other kinds go straight to their
    /// (mode, kind) bucket.
    pub fn processors_for_event(&self, event: &MarkupEvent) -> &[BoundProcessor] {
        let mode = self.config.template_mode;
        match event.node_kind() {
            Some(NodeKind::Element) => match event.element_name() {
                Some(name) => self
                    .registry()
                    .element_definitions()
                    .processors_for(mode, name),
                None => self.registry().processors(mode, NodeKind::Element),
            },
            Some(kind) => self.registry().processors(mode, kind),
            None => &[],
        }
    }

    /// Builds a block-selector handler bound to this configuration's case
    /// sensitivity.
    pub fn block_selector<H: MarkupHandler>(
        &self,
        selector: &str,
        downstream: H,
    ) -> Result<BlockSelector<H>, SelectorError> {
        BlockSelector::new(selector, self.config.case_sensitive(), downstream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_engine_builds() {
        let config = EngineConfig::build(TemplateMode::Html, Vec::new()).unwrap();
        assert_eq!(config.template_mode(), TemplateMode::Html);
        assert!(!config.case_sensitive());
        assert!(EngineConfig::build(TemplateMode::Xml, Vec::new())
            .unwrap()
            .case_sensitive());
    }

    #[test]
    fn test_contexts_are_independent() {
        let config = EngineConfig::build(TemplateMode::Html, Vec::new()).unwrap();
        let mut first = config.processing_context();
        let second = config.processing_context();
        first.variables_mut().put("x", serde_json::json!(1));
        assert!(first.variables().contains("x"));
        assert!(!second.variables().contains("x"));
    }
}
