use crate::processor::Processor;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A pluggable extension bundle: processors plus auxiliary contributions.
///
/// Implementations are cheap descriptors; the expensive merging work happens
/// once, in [`Registry::build`](crate::registry::Registry::build).
pub trait Dialect: Send + Sync {
    /// Unique name of the dialect, used in diagnostics and collision errors.
    fn name(&self) -> &str;

    /// Default prefix qualifying the dialect's element/attribute names.
    /// `None` means the dialect's names are used unprefixed.
    fn prefix(&self) -> Option<&str> {
        None
    }

    fn processors(&self) -> Vec<Arc<dyn Processor>> {
        Vec::new()
    }

    /// Named values made available to every processing run of an engine
    /// configured with this dialect. Names must be unique across dialects.
    fn execution_attributes(&self) -> HashMap<String, Value> {
        HashMap::new()
    }

    /// Factory for the dialect's expression objects (utility objects exposed
    /// to the expression layer). Object names must be unique across
    /// dialects.
    fn expression_object_factory(&self) -> Option<Arc<dyn ExpressionObjectFactory>> {
        None
    }
}

/// Builds the expression objects a dialect contributes, by name.
pub trait ExpressionObjectFactory: Send + Sync {
    /// The names this factory can build. Declared up front so collisions are
    /// detected at registry-build time, not at first use.
    fn object_names(&self) -> Vec<String>;

    fn build_object(&self, name: &str) -> Option<Value>;
}

/// One entry of the registry-build input: a dialect plus an optional prefix
/// override taking precedence over the dialect's own default.
#[derive(Clone)]
pub struct DialectConfig {
    dialect: Arc<dyn Dialect>,
    prefix_override: Option<String>,
}

impl DialectConfig {
    pub fn new(dialect: Arc<dyn Dialect>) -> Self {
        DialectConfig {
            dialect,
            prefix_override: None,
        }
    }

    pub fn with_prefix(dialect: Arc<dyn Dialect>, prefix: impl Into<String>) -> Self {
        DialectConfig {
            dialect,
            prefix_override: Some(prefix.into()),
        }
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    /// The prefix in force for this dialect: the override if specified,
    /// otherwise the dialect's own default.
    pub fn effective_prefix(&self) -> Option<&str> {
        match &self.prefix_override {
            Some(prefix) => Some(prefix.as_str()),
            None => self.dialect.prefix(),
        }
    }
}
