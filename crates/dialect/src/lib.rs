//! Dialects and the processor registry.
//!
//! A dialect is a named bundle of processors plus auxiliary contributions:
//! execution attributes and expression-object factories. [`Registry::build`]
//! merges a set of configured dialects into one immutable registry, with
//! identity-uniqueness checks, deterministic per-(template mode, node kind)
//! precedence ordering, and collision detection on the auxiliary
//! contributions. Registry construction is a one-time single-threaded build
//! step; the result is read-only and safe to share across concurrent
//! document-processing runs.

pub mod dialect;
pub mod error;
pub mod processor;
pub mod registry;

pub use dialect::{Dialect, DialectConfig, ExpressionObjectFactory};
pub use error::ConfigurationError;
pub use processor::{BoundProcessor, Processor};
pub use registry::{AttributeDefinitions, ElementDefinitions, Registry};
