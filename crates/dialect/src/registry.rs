//! Registry construction: merging a set of configured dialects into one
//! immutable, precedence-ordered processor registry.

use crate::dialect::{DialectConfig, ExpressionObjectFactory};
use crate::error::ConfigurationError;
use crate::processor::BoundProcessor;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use trellis_event::{NodeKind, TemplateMode};

/// The merged, frozen result of [`Registry::build`]. Immutable after
/// construction; share it behind an `Arc` across concurrent readers.
pub struct Registry {
    dialect_prefixes: HashMap<String, Option<String>>,
    execution_attributes: HashMap<String, Value>,
    expression_objects: AggregateExpressionObjectFactory,
    buckets: HashMap<(TemplateMode, NodeKind), Vec<BoundProcessor>>,
    element_definitions: ElementDefinitions,
    attribute_definitions: AttributeDefinitions,
}

impl Registry {
    /// Merges the configured dialects. Fails fast on the first collision:
    /// a processor instance registered twice, an execution attribute name
    /// declared by two dialects, or an expression object name registered by
    /// two dialects. No partial registry escapes on failure.
    pub fn build(configs: Vec<DialectConfig>) -> Result<Registry, ConfigurationError> {
        let mut seen_processors: HashMap<usize, String> = HashMap::new();
        let mut buckets: HashMap<(TemplateMode, NodeKind), Vec<BoundProcessor>> = HashMap::new();
        let mut execution_attributes: HashMap<String, Value> = HashMap::new();
        let mut attribute_owners: HashMap<String, String> = HashMap::new();
        let mut expression_objects = AggregateExpressionObjectFactory::new();
        let mut dialect_prefixes: HashMap<String, Option<String>> = HashMap::new();
        let mut processor_count = 0usize;

        for config in &configs {
            let dialect = config.dialect();
            let dialect_name = dialect.name().to_string();
            let prefix = config.effective_prefix().map(str::to_string);
            dialect_prefixes.insert(dialect_name.clone(), prefix.clone());

            for processor in dialect.processors() {
                let identity = BoundProcessor::identity(&processor);
                if let Some(first) = seen_processors.get(&identity) {
                    return Err(ConfigurationError::DuplicateProcessor {
                        first: first.clone(),
                        second: dialect_name,
                    });
                }
                seen_processors.insert(identity, dialect_name.clone());

                let bound = BoundProcessor::new(&dialect_name, prefix.clone(), processor);
                let bucket = buckets
                    .entry((bound.template_mode(), bound.node_kind()))
                    .or_default();
                bucket.push(bound);
                // Stable: equal precedences keep their registration order.
                bucket.sort_by_key(BoundProcessor::precedence);
                processor_count += 1;
            }

            for (name, value) in dialect.execution_attributes() {
                if let Some(first) = attribute_owners.get(&name) {
                    return Err(ConfigurationError::ConflictingExecutionAttribute {
                        name,
                        first: first.clone(),
                        second: dialect_name.clone(),
                    });
                }
                attribute_owners.insert(name.clone(), dialect_name.clone());
                execution_attributes.insert(name, value);
            }

            if let Some(factory) = dialect.expression_object_factory() {
                expression_objects.add(&dialect_name, factory)?;
            }
        }

        let element_definitions = ElementDefinitions::from_buckets(&buckets);
        let attribute_definitions = AttributeDefinitions::from_buckets(&buckets);

        log::debug!(
            "built processor registry: {} dialect(s), {} processor(s), {} execution attribute(s)",
            dialect_prefixes.len(),
            processor_count,
            execution_attributes.len()
        );

        Ok(Registry {
            dialect_prefixes,
            execution_attributes,
            expression_objects,
            buckets,
            element_definitions,
            attribute_definitions,
        })
    }

    /// All processors registered for the given template mode and node kind,
    /// in ascending precedence order.
    pub fn processors(&self, mode: TemplateMode, kind: NodeKind) -> &[BoundProcessor] {
        self.buckets
            .get(&(mode, kind))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn element_definitions(&self) -> &ElementDefinitions {
        &self.element_definitions
    }

    pub fn attribute_definitions(&self) -> &AttributeDefinitions {
        &self.attribute_definitions
    }

    pub fn execution_attributes(&self) -> &HashMap<String, Value> {
        &self.execution_attributes
    }

    pub fn execution_attribute(&self, name: &str) -> Option<&Value> {
        self.execution_attributes.get(name)
    }

    pub fn has_execution_attribute(&self, name: &str) -> bool {
        self.execution_attributes.contains_key(name)
    }

    pub fn expression_objects(&self) -> &AggregateExpressionObjectFactory {
        &self.expression_objects
    }

    pub fn dialect_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.dialect_prefixes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The prefix in force for a configured dialect, if the dialect exists
    /// and declared one.
    pub fn dialect_prefix(&self, dialect_name: &str) -> Option<&str> {
        self.dialect_prefixes.get(dialect_name)?.as_deref()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("dialect_prefixes", &self.dialect_prefixes)
            .field("execution_attributes", &self.execution_attributes)
            .field("buckets", &self.buckets.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Element-processor lookup table, pre-resolved by qualified element name so
/// the structural layer never matches processors at event time.
pub struct ElementDefinitions {
    by_name: HashMap<(TemplateMode, String), Vec<BoundProcessor>>,
    wildcard: HashMap<TemplateMode, Vec<BoundProcessor>>,
}

impl ElementDefinitions {
    fn from_buckets(buckets: &HashMap<(TemplateMode, NodeKind), Vec<BoundProcessor>>) -> Self {
        let mut by_name: HashMap<(TemplateMode, String), Vec<BoundProcessor>> = HashMap::new();
        let mut wildcard: HashMap<TemplateMode, Vec<BoundProcessor>> = HashMap::new();

        for ((mode, kind), bucket) in buckets {
            if *kind != NodeKind::Element {
                continue;
            }
            // Wildcards first, so named merges below see them.
            let generic: Vec<BoundProcessor> = bucket
                .iter()
                .filter(|p| {
                    p.qualified_element_name().is_none() && p.qualified_attribute_name().is_none()
                })
                .cloned()
                .collect();

            for processor in bucket {
                let Some(name) = processor.qualified_element_name() else {
                    continue;
                };
                let key = (*mode, normalize_name(*mode, &name));
                by_name.entry(key).or_default();
            }

            // One pass per known name over the precedence-ordered bucket
            // keeps the merged lists in global precedence order.
            let known: Vec<String> = by_name
                .keys()
                .filter(|(m, _)| m == mode)
                .map(|(_, n)| n.clone())
                .collect();
            for name in known {
                let merged: Vec<BoundProcessor> = bucket
                    .iter()
                    .filter(|p| match p.qualified_element_name() {
                        Some(target) => normalize_name(*mode, &target) == name,
                        None => p.qualified_attribute_name().is_none(),
                    })
                    .cloned()
                    .collect();
                by_name.insert((*mode, name), merged);
            }

            wildcard.insert(*mode, generic);
        }

        ElementDefinitions { by_name, wildcard }
    }

    /// Processors applicable to an element of the given name, in precedence
    /// order. Unknown names get the wildcard processors only.
    pub fn processors_for(&self, mode: TemplateMode, element_name: &str) -> &[BoundProcessor] {
        let key = (mode, normalize_name(mode, element_name));
        if let Some(defined) = self.by_name.get(&key) {
            return defined;
        }
        self.wildcard
            .get(&mode)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn known_names(&self, mode: TemplateMode) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .by_name
            .keys()
            .filter(|(m, _)| *m == mode)
            .map(|(_, n)| n.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

/// Attribute-processor lookup table, keyed by qualified attribute name.
pub struct AttributeDefinitions {
    by_name: HashMap<(TemplateMode, String), Vec<BoundProcessor>>,
}

impl AttributeDefinitions {
    fn from_buckets(buckets: &HashMap<(TemplateMode, NodeKind), Vec<BoundProcessor>>) -> Self {
        let mut by_name: HashMap<(TemplateMode, String), Vec<BoundProcessor>> = HashMap::new();
        for ((mode, kind), bucket) in buckets {
            if *kind != NodeKind::Element {
                continue;
            }
            for processor in bucket {
                let Some(name) = processor.qualified_attribute_name() else {
                    continue;
                };
                by_name
                    .entry((*mode, normalize_name(*mode, &name)))
                    .or_default()
                    .push(processor.clone());
            }
        }
        AttributeDefinitions { by_name }
    }

    /// Processors triggered by the given attribute name, in precedence
    /// order.
    pub fn processors_for(&self, mode: TemplateMode, attribute_name: &str) -> &[BoundProcessor] {
        self.by_name
            .get(&(mode, normalize_name(mode, attribute_name)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn known_names(&self, mode: TemplateMode) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .by_name
            .keys()
            .filter(|(m, _)| *m == mode)
            .map(|(_, n)| n.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

fn normalize_name(mode: TemplateMode, name: &str) -> String {
    if mode.is_case_sensitive() {
        name.to_string()
    } else {
        name.to_ascii_lowercase()
    }
}

/// All expression-object factories of the configured dialects behind one
/// factory interface. Name collisions are rejected while dialects are added,
/// so a built registry can always construct its full object set.
pub struct AggregateExpressionObjectFactory {
    factories: Vec<Arc<dyn ExpressionObjectFactory>>,
    owners: HashMap<String, String>,
}

impl AggregateExpressionObjectFactory {
    fn new() -> Self {
        AggregateExpressionObjectFactory {
            factories: Vec::new(),
            owners: HashMap::new(),
        }
    }

    fn add(
        &mut self,
        dialect_name: &str,
        factory: Arc<dyn ExpressionObjectFactory>,
    ) -> Result<(), ConfigurationError> {
        for object_name in factory.object_names() {
            if let Some(first) = self.owners.get(&object_name) {
                return Err(ConfigurationError::DuplicateExpressionObject {
                    name: object_name,
                    first: first.clone(),
                    second: dialect_name.to_string(),
                });
            }
            self.owners.insert(object_name, dialect_name.to_string());
        }
        self.factories.push(factory);
        Ok(())
    }

    /// Builds every registered expression object.
    pub fn build_all(&self) -> HashMap<String, Value> {
        let mut objects = HashMap::with_capacity(self.owners.len());
        for factory in &self.factories {
            for name in factory.object_names() {
                if let Some(value) = factory.build_object(&name) {
                    objects.insert(name, value);
                }
            }
        }
        objects
    }
}

impl ExpressionObjectFactory for AggregateExpressionObjectFactory {
    fn object_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.owners.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    fn build_object(&self, name: &str) -> Option<Value> {
        self.factories
            .iter()
            .find_map(|factory| factory.build_object(name))
    }
}
