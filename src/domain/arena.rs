//! Arena-backed node storage.
//!
//! Nodes live in a generational arena and refer to each other by `Index`,
//! never by pointer: ownership is "this index is reachable from exactly one
//! child slot (or the root slot)", which makes the back-reference a plain
//! field with no aliasing hazard. Each node additionally carries a
//! process-unique display id from an allocator owned by the arena.

use std::collections::HashSet;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::error::{DomainError, TreeResult};
use crate::domain::value::Value;

/// One tree node.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    /// Payload.
    pub value: Value,
    /// Owned child slots. Exclusive: an index may occupy at most one slot.
    pub left: Option<Index>,
    pub right: Option<Index>,
    /// Non-owning back-reference to the current owner, `None` for a root.
    pub parent: Option<Index>,
    /// Monotonically assigned display identity, unique per arena.
    pub id: u64,
    /// 1 + count(left) + count(right); maintained incrementally.
    pub subtree_count: u64,
}

/// Storage for all nodes of one tree, plus the id allocator and size bound.
#[derive(Debug)]
pub struct NodeArena {
    arena: Arena<NodeRecord>,
    next_id: u64,
    max_nodes: u64,
}

impl NodeArena {
    pub fn new(max_nodes: u64) -> Self {
        Self {
            arena: Arena::new(),
            next_id: 0,
            max_nodes,
        }
    }

    /// Allocates a detached leaf record (no children, no parent, count 1).
    ///
    /// Fails with `SizeExceeded` when the arena already holds the configured
    /// maximum; this is the only allocation failure mode.
    #[instrument(level = "trace", skip(self))]
    pub fn alloc(&mut self, value: Value) -> TreeResult<Index> {
        if self.arena.len() as u64 >= self.max_nodes {
            return Err(DomainError::SizeExceeded {
                size: self.arena.len() as u64 + 1,
                max: self.max_nodes,
            });
        }
        let id = self.next_id;
        self.next_id += 1;
        Ok(self.arena.insert(NodeRecord {
            value,
            left: None,
            right: None,
            parent: None,
            id,
            subtree_count: 1,
        }))
    }

    pub fn get(&self, idx: Index) -> TreeResult<&NodeRecord> {
        self.arena.get(idx).ok_or(DomainError::NodeNotFound(idx))
    }

    pub fn get_mut(&mut self, idx: Index) -> TreeResult<&mut NodeRecord> {
        self.arena
            .get_mut(idx)
            .ok_or(DomainError::NodeNotFound(idx))
    }

    pub fn try_get(&self, idx: Index) -> Option<&NodeRecord> {
        self.arena.get(idx)
    }

    pub fn remove(&mut self, idx: Index) -> Option<NodeRecord> {
        self.arena.remove(idx)
    }

    pub fn contains(&self, idx: Index) -> bool {
        self.arena.contains(idx)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn max_nodes(&self) -> u64 {
        self.max_nodes
    }
}

/// Per-traversal revisit guard.
///
/// Replaces the classic id-poisoning trick: instead of overwriting a node's
/// id with a sentinel, each whole-subtree operation carries a transient
/// seen-set. The set is held for the entire traversal, so both true back
/// edges and aliased child slots (two slots naming one node) trip it.
#[derive(Debug, Default)]
pub struct VisitGuard {
    seen: HashSet<Index>,
}

impl VisitGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `idx` visited; `CycleDetected` if it was already seen in this
    /// traversal.
    pub fn enter(&mut self, idx: Index, id: u64) -> TreeResult<()> {
        if !self.seen.insert(idx) {
            return Err(DomainError::CycleDetected { id });
        }
        Ok(())
    }

    pub fn visited(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_assigns_monotonic_ids() {
        let mut arena = NodeArena::new(16);
        let a = arena.alloc(Value::Number(1.0)).unwrap();
        let b = arena.alloc(Value::Number(2.0)).unwrap();
        assert!(arena.get(a).unwrap().id < arena.get(b).unwrap().id);
    }

    #[test]
    fn test_alloc_respects_size_bound() {
        let mut arena = NodeArena::new(2);
        arena.alloc(Value::Number(1.0)).unwrap();
        arena.alloc(Value::Number(2.0)).unwrap();
        let err = arena.alloc(Value::Number(3.0)).unwrap_err();
        assert!(matches!(err, DomainError::SizeExceeded { max: 2, .. }));
    }

    #[test]
    fn test_removed_index_is_not_found() {
        let mut arena = NodeArena::new(4);
        let a = arena.alloc(Value::Number(1.0)).unwrap();
        arena.remove(a);
        assert!(matches!(
            arena.get(a),
            Err(DomainError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_guard_reports_revisit() {
        let mut arena = NodeArena::new(4);
        let a = arena.alloc(Value::Number(1.0)).unwrap();
        let mut guard = VisitGuard::new();
        guard.enter(a, 0).unwrap();
        assert!(matches!(
            guard.enter(a, 0),
            Err(DomainError::CycleDetected { id: 0 })
        ));
    }
}
