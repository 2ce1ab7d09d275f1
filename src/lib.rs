//! treeguard: a self-verifying binary tree engine.
//!
//! Nodes live in an arena and carry bidirectional parent/child linkage plus
//! an incrementally maintained subtree count. Every whole-subtree operation
//! (verify, count, copy, delete, dump) is guarded against cycles and aliased
//! slots, so a corrupted structure fails closed instead of looping. Trees
//! round-trip through a parenthesized prefix text format and can be rendered
//! with Graphviz for debugging.

pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod text;
pub mod util;

pub use config::Settings;
pub use domain::{DomainError, Index, Operator, Tree, TreeRenderer, TreeResult, Value};
pub use infrastructure::DotRenderer;
pub use text::{SortOrder, Text};
