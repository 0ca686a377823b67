//! Streaming block-selector matching.
//!
//! A block selector is a path-like expression (`//div/p`, `/h2[2]`,
//! `table.data/tr`) identifying a subset of a document's structural events.
//! This crate parses selectors into path items, evaluates them through a
//! per-document filter chain without buffering the document, and exposes
//! [`BlockSelector`], a [`MarkupHandler`](trellis_event::MarkupHandler)
//! wrapper that forwards only the events inside matched blocks.

pub mod error;
pub mod filter;
pub mod handler;
pub mod item;

pub use error::SelectorError;
pub use filter::FilterChain;
pub use handler::BlockSelector;
pub use item::{
    AttributeCondition, AttributeOperator, IndexCondition, SelectorItem, parse_selector,
};
