//! Structural markup event model.
//!
//! This crate defines the contract between the external markup parser, the
//! selector/handler layer and the processor dispatch layer: a closed set of
//! structural events ([`MarkupEvent`]), the consumer trait they are pushed
//! through ([`MarkupHandler`]), and the classification enums used by the
//! registry ([`NodeKind`], [`TemplateMode`]).

pub mod event;
pub mod location;
pub mod mode;

pub use event::{Attribute, EventCollector, MarkupEvent, MarkupHandler};
pub use location::Location;
pub use mode::{NodeKind, TemplateMode};
