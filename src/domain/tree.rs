//! The tree handle: checked linkage, integrity verification, incremental
//! subtree counts, cycle-safe deep copy, and diagnostic dump records.
//!
//! Every whole-subtree operation runs under a [`VisitGuard`], so a structure
//! that has already been corrupted (a back edge, or one node wired into two
//! slots) makes the operation fail closed with `CycleDetected` instead of
//! recursing forever or double-counting.

use generational_arena::Index;
use std::collections::HashSet;
use tracing::{debug, instrument};

use crate::domain::arena::{NodeArena, NodeRecord, VisitGuard};
use crate::domain::error::{DomainError, TreeResult};
use crate::domain::value::Value;

/// One record of a diagnostic dump: identity, payload rendering, cached
/// count, and child edges by identity.
#[derive(Debug, Clone, PartialEq)]
pub struct DumpNode {
    pub id: u64,
    pub label: String,
    pub count: u64,
    pub left: Option<u64>,
    pub right: Option<u64>,
}

/// Everything a renderer needs for one dump: a human-readable status label,
/// the dump iteration counter, and the flat node records.
#[derive(Debug, Clone)]
pub struct TreeDump {
    pub status: String,
    pub iteration: u64,
    pub nodes: Vec<DumpNode>,
}

/// Visualization collaborator consumed by [`Tree::dump`].
///
/// The tree's obligation ends at producing a complete, self-consistent
/// description of current identities and edges; rendering failures come back
/// as `RenderFailed` and are never swallowed.
pub trait TreeRenderer {
    fn render(&mut self, dump: &TreeDump) -> TreeResult<()>;
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Left,
    Right,
}

/// Handle over one owned root node and the arena its nodes live in.
#[derive(Debug)]
pub struct Tree {
    pub(crate) arena: NodeArena,
    pub(crate) root: Option<Index>,
    dump_iteration: u64,
}

impl Tree {
    /// Empty tree bound to a size limit. Nodes are created through
    /// [`Tree::new_node`] and attached with the checked linkage operations.
    pub fn new(max_size: u64) -> Self {
        Self {
            arena: NodeArena::new(max_size),
            root: None,
            dump_iteration: 0,
        }
    }

    /// Synthesizes a root node holding `value`.
    ///
    /// Re-initializing a live tree is a programmer error, not a recoverable
    /// condition.
    pub fn init(&mut self, value: Value) -> TreeResult<Index> {
        assert!(self.root.is_none(), "init on a live tree");
        let idx = self.new_node(value, None, None)?;
        self.root = Some(idx);
        Ok(idx)
    }

    /// Binds an existing parentless node as the root.
    pub fn bind_root(&mut self, node: Index) -> TreeResult<()> {
        assert!(self.root.is_none(), "bind_root on a live tree");
        let rec = self.arena.get(node)?;
        if rec.parent.is_some() {
            return Err(DomainError::ChildAlreadyOwned { id: rec.id });
        }
        self.root = Some(node);
        Ok(())
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    pub fn node(&self, idx: Index) -> TreeResult<&NodeRecord> {
        self.arena.get(idx)
    }

    pub fn contains(&self, idx: Index) -> bool {
        self.arena.contains(idx)
    }

    /// Number of live nodes in the arena, detached subtrees included.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn max_size(&self) -> u64 {
        self.arena.max_nodes()
    }

    /// Replaces a node's payload. Structure and counts are unaffected.
    pub fn set_value(&mut self, node: Index, value: Value) -> TreeResult<()> {
        self.arena.get_mut(node)?.value = value;
        Ok(())
    }

    // ============================================================
    // Construction and linkage
    // ============================================================

    /// Node factory: allocates a node, takes ownership of any supplied
    /// children (re-parenting them), and seeds the cached count from the
    /// children's cached counts.
    ///
    /// A child that is already owned elsewhere, or aliased into both slots,
    /// is rejected with `ChildAlreadyOwned` before anything is mutated.
    #[instrument(level = "trace", skip(self, value))]
    pub fn new_node(
        &mut self,
        value: Value,
        left: Option<Index>,
        right: Option<Index>,
    ) -> TreeResult<Index> {
        if let (Some(l), Some(r)) = (left, right) {
            if l == r {
                let id = self.arena.get(l)?.id;
                return Err(DomainError::ChildAlreadyOwned { id });
            }
        }
        let mut count = 1u64;
        for child in [left, right].into_iter().flatten() {
            let rec = self.arena.get(child)?;
            if rec.parent.is_some() || self.root == Some(child) {
                return Err(DomainError::ChildAlreadyOwned { id: rec.id });
            }
            count += rec.subtree_count;
        }

        let idx = self.arena.alloc(value)?;
        {
            let rec = self.arena.get_mut(idx)?;
            rec.left = left;
            rec.right = right;
            rec.subtree_count = count;
        }
        for child in [left, right].into_iter().flatten() {
            self.arena.get_mut(child)?.parent = Some(idx);
        }
        Ok(idx)
    }

    /// Replaces the left child slot of `node`, returning the displaced
    /// occupant (now detached; disposal is the caller's responsibility).
    #[instrument(level = "debug", skip(self))]
    pub fn set_left(&mut self, node: Index, child: Index) -> TreeResult<Option<Index>> {
        self.set_child(node, child, Slot::Left)
    }

    /// Replaces the right child slot of `node`; see [`Tree::set_left`].
    #[instrument(level = "debug", skip(self))]
    pub fn set_right(&mut self, node: Index, child: Index) -> TreeResult<Option<Index>> {
        self.set_child(node, child, Slot::Right)
    }

    fn set_child(&mut self, node: Index, child: Index, slot: Slot) -> TreeResult<Option<Index>> {
        let (child_id, child_parent, gain) = {
            let rec = self.arena.get(child)?;
            (rec.id, rec.parent, rec.subtree_count)
        };
        if child_parent.is_some() || self.root == Some(child) {
            return Err(DomainError::ChildAlreadyOwned { id: child_id });
        }

        let displaced = {
            let rec = self.arena.get(node)?;
            match slot {
                Slot::Left => rec.left,
                Slot::Right => rec.right,
            }
        };
        let loss = displaced
            .and_then(|d| self.arena.try_get(d))
            .map(|r| r.subtree_count)
            .unwrap_or(0);

        // Validate the whole ancestor chain before mutating anything, so a
        // corrupt parent chain reports CycleDetected with no partial counts.
        let chain = self.ancestor_chain(node)?;

        {
            let rec = self.arena.get_mut(node)?;
            match slot {
                Slot::Left => rec.left = Some(child),
                Slot::Right => rec.right = Some(child),
            }
        }
        if let Some(d) = displaced {
            if let Ok(rec) = self.arena.get_mut(d) {
                rec.parent = None;
            }
        }
        self.arena.get_mut(child)?.parent = Some(node);

        for ancestor in chain {
            let rec = self.arena.get_mut(ancestor)?;
            rec.subtree_count = (rec.subtree_count + gain).saturating_sub(loss);
        }
        debug!(gain, loss, "child slot replaced");
        Ok(displaced)
    }

    /// Detaches `node` from its parent slot (or unbinds the root) without
    /// deleting it. The subtree keeps living in the arena, parentless.
    #[instrument(level = "debug", skip(self))]
    pub fn detach(&mut self, node: Index) -> TreeResult<()> {
        let (node_id, parent, cached) = {
            let rec = self.arena.get(node)?;
            (rec.id, rec.parent, rec.subtree_count)
        };
        if self.root == Some(node) {
            self.root = None;
            return Ok(());
        }
        let parent = match parent {
            Some(p) => p,
            None => return Ok(()), // already detached
        };
        let chain = self.ancestor_chain(parent)?;
        {
            let rec = self.arena.get_mut(parent)?;
            if rec.left == Some(node) {
                rec.left = None;
            } else if rec.right == Some(node) {
                rec.right = None;
            } else {
                return Err(DomainError::BackrefMismatch { id: node_id });
            }
        }
        self.arena.get_mut(node)?.parent = None;
        for ancestor in chain {
            let rec = self.arena.get_mut(ancestor)?;
            rec.subtree_count = rec.subtree_count.saturating_sub(cached);
        }
        Ok(())
    }

    /// Walks `start` and its ancestors to the root, guarded: a parent chain
    /// that revisits a node is structural corruption and reports
    /// `CycleDetected` before any count is touched.
    fn ancestor_chain(&self, start: Index) -> TreeResult<Vec<Index>> {
        let mut chain = Vec::new();
        let mut guard = VisitGuard::new();
        let mut cur = Some(start);
        while let Some(idx) = cur {
            let rec = self.arena.get(idx)?;
            guard.enter(idx, rec.id)?;
            chain.push(idx);
            cur = rec.parent;
        }
        Ok(chain)
    }

    // ============================================================
    // Deletion
    // ============================================================

    /// Recursively deletes the subtree rooted at `node`: detaches it from
    /// its parent, propagates the count delta to all ancestors, and removes
    /// every node post-order. Returns the number of nodes removed.
    ///
    /// The subtree is fully walked before anything is mutated, so a cycle
    /// anywhere below `node` aborts the delete with the arena untouched.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_subtree(&mut self, node: Index) -> TreeResult<u64> {
        let (node_id, parent, cached) = {
            let rec = self.arena.get(node)?;
            (rec.id, rec.parent, rec.subtree_count)
        };

        let mut guard = VisitGuard::new();
        let mut doomed = Vec::new();
        self.collect_postorder(node, &mut guard, &mut doomed)?;

        if self.root == Some(node) {
            self.root = None;
        } else if let Some(p) = parent {
            let chain = self.ancestor_chain(p)?;
            {
                let rec = self.arena.get_mut(p)?;
                if rec.left == Some(node) {
                    rec.left = None;
                } else if rec.right == Some(node) {
                    rec.right = None;
                } else {
                    return Err(DomainError::BackrefMismatch { id: node_id });
                }
            }
            for ancestor in chain {
                let rec = self.arena.get_mut(ancestor)?;
                rec.subtree_count = rec.subtree_count.saturating_sub(cached);
            }
        }

        let removed = doomed.len() as u64;
        for idx in doomed {
            self.arena.remove(idx);
        }
        debug!(removed, "subtree deleted");
        Ok(removed)
    }

    fn collect_postorder(
        &self,
        idx: Index,
        guard: &mut VisitGuard,
        out: &mut Vec<Index>,
    ) -> TreeResult<()> {
        let rec = self.arena.get(idx)?;
        guard.enter(idx, rec.id)?;
        let (left, right) = (rec.left, rec.right);
        if let Some(l) = left {
            self.collect_postorder(l, guard, out)?;
        }
        if let Some(r) = right {
            self.collect_postorder(r, guard, out)?;
        }
        out.push(idx);
        Ok(())
    }

    /// Verified destruction: verify first, dump best-effort on failure, and
    /// only delete the root subtree once the structure checks out. On
    /// failure the tree is left intact for debugging.
    #[instrument(level = "debug", skip(self, renderer))]
    pub fn destroy(&mut self, renderer: Option<&mut dyn TreeRenderer>) -> TreeResult<()> {
        if let Err(err) = self.verify() {
            if let Some(r) = renderer {
                if let Err(dump_err) = self.dump(r) {
                    debug!("diagnostic dump failed: {}", dump_err);
                }
            }
            return Err(err);
        }
        let root = self.root.ok_or(DomainError::NoRoot)?;
        self.delete_subtree(root)?;
        Ok(())
    }

    // ============================================================
    // Verification and counting
    // ============================================================

    /// Strict integrity check: root exists and is parentless, the size bound
    /// holds, every back-reference points at its owner, and every cached
    /// count equals the freshly recomputed one.
    pub fn verify(&self) -> TreeResult<()> {
        self.verify_inner().map(|_| ())
    }

    /// Verifies, then returns the recomputed node count.
    pub fn count_nodes(&self) -> TreeResult<u64> {
        self.verify_inner()
    }

    fn verify_inner(&self) -> TreeResult<u64> {
        let root = self.root.ok_or(DomainError::NoRoot)?;
        let rec = self.arena.get(root)?;
        if rec.parent.is_some() {
            return Err(DomainError::BackrefMismatch { id: rec.id });
        }
        // Cached bound first (cheap), recomputed bound after the walk.
        if rec.subtree_count > self.arena.max_nodes() {
            return Err(DomainError::SizeExceeded {
                size: rec.subtree_count,
                max: self.arena.max_nodes(),
            });
        }
        let mut guard = VisitGuard::new();
        let total = self.check_subtree(root, &mut guard)?;
        if total > self.arena.max_nodes() {
            return Err(DomainError::SizeExceeded {
                size: total,
                max: self.arena.max_nodes(),
            });
        }
        Ok(total)
    }

    fn check_subtree(&self, idx: Index, guard: &mut VisitGuard) -> TreeResult<u64> {
        let rec = self.arena.get(idx)?;
        guard.enter(idx, rec.id)?;
        let mut actual = 1u64;
        for child in [rec.left, rec.right].into_iter().flatten() {
            let child_rec = self.arena.get(child)?;
            if child_rec.parent != Some(idx) {
                return Err(DomainError::BackrefMismatch { id: child_rec.id });
            }
            actual += self.check_subtree(child, guard)?;
        }
        if rec.subtree_count != actual {
            return Err(DomainError::CountMismatch {
                id: rec.id,
                cached: rec.subtree_count,
                actual,
            });
        }
        Ok(actual)
    }

    /// Like [`Tree::verify`], but count damage is repaired instead of
    /// reported: cached counts are rewritten bottom-up from the recomputed
    /// values. Cycles and back-reference damage still fail closed. Returns
    /// the number of nodes whose counts were rewritten.
    #[instrument(level = "debug", skip(self))]
    pub fn verify_and_repair(&mut self) -> TreeResult<u64> {
        let root = self.root.ok_or(DomainError::NoRoot)?;
        let (root_id, root_parent) = {
            let rec = self.arena.get(root)?;
            (rec.id, rec.parent)
        };
        if root_parent.is_some() {
            return Err(DomainError::BackrefMismatch { id: root_id });
        }
        let mut guard = VisitGuard::new();
        let mut repaired = 0u64;
        let total = self.repair_subtree(root, &mut guard, &mut repaired, true)?;
        if total > self.arena.max_nodes() {
            return Err(DomainError::SizeExceeded {
                size: total,
                max: self.arena.max_nodes(),
            });
        }
        debug!(repaired, "counts repaired");
        Ok(repaired)
    }

    /// Re-derives every cached count bottom-up. Repair entry point for
    /// structural edits that bypassed the checked linkage operations
    /// (see the raw `wire_*` methods). Returns the recomputed total.
    #[instrument(level = "debug", skip(self))]
    pub fn recalculate_counts(&mut self) -> TreeResult<u64> {
        let root = self.root.ok_or(DomainError::NoRoot)?;
        let mut guard = VisitGuard::new();
        let mut repaired = 0u64;
        self.repair_subtree(root, &mut guard, &mut repaired, false)
    }

    fn repair_subtree(
        &mut self,
        idx: Index,
        guard: &mut VisitGuard,
        repaired: &mut u64,
        check_backrefs: bool,
    ) -> TreeResult<u64> {
        let (id, left, right, cached) = {
            let rec = self.arena.get(idx)?;
            (rec.id, rec.left, rec.right, rec.subtree_count)
        };
        guard.enter(idx, id)?;
        let mut actual = 1u64;
        for child in [left, right].into_iter().flatten() {
            if check_backrefs {
                let child_rec = self.arena.get(child)?;
                if child_rec.parent != Some(idx) {
                    return Err(DomainError::BackrefMismatch { id: child_rec.id });
                }
            }
            actual += self.repair_subtree(child, guard, repaired, check_backrefs)?;
        }
        if cached != actual {
            self.arena.get_mut(idx)?.subtree_count = actual;
            *repaired += 1;
        }
        Ok(actual)
    }

    // ============================================================
    // Deep copy
    // ============================================================

    /// Post-order clone of the subtree rooted at `src`, into the same arena.
    /// The clone is fully independent (fresh ids, fresh records) and comes
    /// back parentless, ready to attach or bind.
    ///
    /// Any failure partway (size exhaustion, cycle, back-reference mismatch
    /// found while descending) removes every clone already produced before
    /// the error propagates: a failed copy never leaks a partial subtree and
    /// never mutates the source.
    #[instrument(level = "debug", skip(self))]
    pub fn copy_subtree(&mut self, src: Index) -> TreeResult<Index> {
        let mut guard = VisitGuard::new();
        let mut clones = Vec::new();
        match self.copy_rec(src, &mut guard, &mut clones) {
            Ok(idx) => Ok(idx),
            Err(err) => {
                for clone in clones {
                    self.arena.remove(clone);
                }
                Err(err)
            }
        }
    }

    fn copy_rec(
        &mut self,
        src: Index,
        guard: &mut VisitGuard,
        clones: &mut Vec<Index>,
    ) -> TreeResult<Index> {
        let (id, value, left, right) = {
            let rec = self.arena.get(src)?;
            (rec.id, rec.value.clone(), rec.left, rec.right)
        };
        guard.enter(src, id)?;
        for child in [left, right].into_iter().flatten() {
            let child_rec = self.arena.get(child)?;
            if child_rec.parent != Some(src) {
                return Err(DomainError::BackrefMismatch { id: child_rec.id });
            }
        }
        let left_clone = match left {
            Some(l) => Some(self.copy_rec(l, guard, clones)?),
            None => None,
        };
        let right_clone = match right {
            Some(r) => Some(self.copy_rec(r, guard, clones)?),
            None => None,
        };
        let clone = self.new_node(value, left_clone, right_clone)?;
        clones.push(clone);
        Ok(clone)
    }

    // ============================================================
    // Structural comparison
    // ============================================================

    /// Same shape and payload values; identities need not match. Bounded by
    /// the size limit so corrupted structures cannot loop it.
    pub fn same_structure(&self, other: &Tree) -> bool {
        let mut fuel = self.max_size().max(other.max_size()).saturating_add(1);
        self.same_rec(self.root, other, other.root, &mut fuel)
    }

    fn same_rec(
        &self,
        a: Option<Index>,
        other: &Tree,
        b: Option<Index>,
        fuel: &mut u64,
    ) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(x), Some(y)) => {
                if *fuel == 0 {
                    return false;
                }
                *fuel -= 1;
                let ra = match self.arena.try_get(x) {
                    Some(r) => r,
                    None => return false,
                };
                let rb = match other.arena.try_get(y) {
                    Some(r) => r,
                    None => return false,
                };
                ra.value == rb.value
                    && self.same_rec(ra.left, other, rb.left, fuel)
                    && self.same_rec(ra.right, other, rb.right, fuel)
            }
            _ => false,
        }
    }

    // ============================================================
    // Diagnostic dump
    // ============================================================

    /// Emits the current structure to the renderer: a verify-status label
    /// (dumping a broken tree must work, so the status is informational, not
    /// a precondition), the iteration counter, and one record per node.
    /// Bounded to the size limit and guarded, so a corrupted tree yields a
    /// truncated but self-consistent record list.
    #[instrument(level = "debug", skip(self, renderer))]
    pub fn dump(&mut self, renderer: &mut dyn TreeRenderer) -> TreeResult<()> {
        let status = match self.verify() {
            Ok(()) => "ok".to_string(),
            Err(err) => err.to_string(),
        };
        let dump = TreeDump {
            status,
            iteration: self.dump_iteration,
            nodes: self.collect_dump_nodes(),
        };
        self.dump_iteration += 1;
        renderer.render(&dump)
    }

    fn collect_dump_nodes(&self) -> Vec<DumpNode> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut stack = Vec::new();
        if let Some(root) = self.root {
            stack.push(root);
        }
        while let Some(idx) = stack.pop() {
            if out.len() as u64 >= self.arena.max_nodes() {
                break;
            }
            if !seen.insert(idx) {
                continue;
            }
            let rec = match self.arena.try_get(idx) {
                Some(r) => r,
                None => continue,
            };
            out.push(DumpNode {
                id: rec.id,
                label: rec.value.to_string(),
                count: rec.subtree_count,
                left: rec.left.and_then(|i| self.arena.try_get(i)).map(|r| r.id),
                right: rec.right.and_then(|i| self.arena.try_get(i)).map(|r| r.id),
            });
            // right first so the left subtree pops first
            if let Some(r) = rec.right {
                stack.push(r);
            }
            if let Some(l) = rec.left {
                stack.push(l);
            }
        }
        out
    }

    // ============================================================
    // Raw slot access
    // ============================================================
    //
    // Bypasses ownership checks, back-reference upkeep, and count
    // maintenance. For external structural surgery; pair with
    // `recalculate_counts` or `verify_and_repair`.

    pub fn wire_left(&mut self, node: Index, child: Option<Index>) -> TreeResult<()> {
        self.arena.get_mut(node)?.left = child;
        Ok(())
    }

    pub fn wire_right(&mut self, node: Index, child: Option<Index>) -> TreeResult<()> {
        self.arena.get_mut(node)?.right = child;
        Ok(())
    }

    pub fn wire_parent(&mut self, node: Index, parent: Option<Index>) -> TreeResult<()> {
        self.arena.get_mut(node)?.parent = parent;
        Ok(())
    }

    pub fn wire_count(&mut self, node: Index, count: u64) -> TreeResult<()> {
        self.arena.get_mut(node)?.subtree_count = count;
        Ok(())
    }
}
