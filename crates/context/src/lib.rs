//! Scoped variable resolution for template processing.
//!
//! [`VariableScopes`] tracks the variables in force at each point of a
//! template walk. One level is opened per nested evaluation context (element
//! body, iteration body); local bindings live only for the levels they were
//! written at, and reads resolve through the level stack with shadowing.

pub mod scopes;

pub use scopes::{Value, VariableScopes};
