//! Domain-level errors (no external dependencies)

use generational_arena::Index;
use thiserror::Error;

/// Structural errors raised by tree operations.
///
/// Every fallible tree operation returns one of these instead of panicking;
/// precondition violations that indicate programmer error (re-initializing a
/// live tree) are asserts, not variants.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("no live node at {0:?}")]
    NodeNotFound(Index),

    #[error("tree size {size} exceeds configured maximum {max}")]
    SizeExceeded { size: u64, max: u64 },

    #[error("tree has no root")]
    NoRoot,

    #[error("cycle detected at node {id}")]
    CycleDetected { id: u64 },

    #[error("cached count {cached} does not match recomputed count {actual} at node {id}")]
    CountMismatch { id: u64, cached: u64, actual: u64 },

    #[error("parent back-reference of node {id} does not point at its owner")]
    BackrefMismatch { id: u64 },

    #[error("node {id} is already owned by another slot")]
    ChildAlreadyOwned { id: u64 },

    #[error("syntax error at token {pos}: found {found:?}, expected {expected}")]
    Syntax {
        pos: usize,
        found: String,
        expected: &'static str,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("dump renderer failed: {0}")]
    RenderFailed(String),
}

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, DomainError>;
