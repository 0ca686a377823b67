//! Trellis: a streaming markup-transformation engine core.
//!
//! The engine consumes a stream of structural events describing a document
//! and selectively rewrites it through transformation rules ("processors")
//! contributed by pluggable extension bundles ("dialects"). Three subsystems
//! cooperate:
//!
//! - **Block selectors** ([`trellis_selector`]): path-like expressions such
//!   as `//div/p` or `/h2[2]`, evaluated against the event stream without
//!   buffering the document.
//! - **Scoped variables** ([`trellis_context`]): a level-indexed stack of
//!   sparse maps with shadowing, a selection-target slot and a text-inlining
//!   flag.
//! - **The dialect registry** ([`trellis_dialect`]): processors merged from
//!   all configured dialects, precedence-ordered per template mode and node
//!   kind, with collision detection on auxiliary contributions.
//!
//! This crate is the composition root: [`EngineConfig`] builds the immutable
//! registry once, [`ProcessingContext`] carries the per-document mutable
//! state, and [`source`] bridges a `quick-xml` reader into the event
//! contract for callers that start from markup text.
//!
//! Markup tokenization and output serialization are external collaborators:
//! events come in through [`MarkupHandler`], and filtered events leave
//! through the downstream handler the caller supplies.

pub mod engine;
pub mod source;

pub use engine::{EngineConfig, EngineError, ProcessingContext};
pub use source::{collect_events, emit_events, select_blocks};

pub use trellis_context::{Value, VariableScopes};
pub use trellis_dialect::{
    BoundProcessor, ConfigurationError, Dialect, DialectConfig, ExpressionObjectFactory,
    Processor, Registry,
};
pub use trellis_event::{
    Attribute, EventCollector, Location, MarkupEvent, MarkupHandler, NodeKind, TemplateMode,
};
pub use trellis_selector::{BlockSelector, SelectorError, parse_selector};
