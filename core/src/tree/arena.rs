//! The tree store.
//!
//! All expression nodes live in one [`TreeArena`]: a flat vector of
//! [`Node`] records in prefix order. A node's children immediately follow
//! it, so a subtree is a contiguous range whose extent is found by skipping
//! children recursively ([`TreeArena::tree_size`]).
//!
//! Positions (`usize`) are structural references: they stay meaningful
//! until the next mutation at or before them. [`TreeRef`] wraps a position
//! with the generation it was taken at, so a reference that outlived a
//! relevant mutation is detected by [`TreeArena::resolve`] instead of being
//! dereferenced blindly.
//!
//! Pushing never moves existing nodes. Moving, removing and rolling back
//! do, and each records the lowest position it disturbed.
//!
//! # Example
//!
//! ```ignore
//! let mut arena = TreeArena::default();
//! let add = arena.push(Node::nary(NodeKind::Add, 2))?;
//! arena.push(Node::integer(2))?;
//! arena.push(Node::integer(3))?;
//! let handle = arena.handle(add);
//! assert_eq!(arena.tree_size(add), 3);
//! ```

use core::fmt;

use tracing::warn;

use super::kind::{Arity, NodeKind};
use super::node::{Node, Payload};
use super::owned::Tree;
use crate::Vec;

/// Default number of node records an arena may hold.
pub const DEFAULT_CAPACITY: usize = 16 * 1024;

/// Longest invalidation log kept before older references are all retired.
const MAX_INVALIDATION_LOG: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArenaError {
    /// The configured capacity was reached.
    Exhausted { capacity: usize },
    /// A [`TreeRef`] was used after a mutation that may have moved its node.
    StaleHandle,
    /// A tree was moved over one of its own descendants.
    InvalidMove { dst: usize, src: usize },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArenaError::Exhausted { capacity } => {
                write!(f, "Tree arena exhausted (capacity: {} nodes)", capacity)
            }
            ArenaError::StaleHandle => write!(f, "Tree handle used after invalidation"),
            ArenaError::InvalidMove { dst, src } => {
                write!(f, "Cannot move tree at {} over its descendant at {}", src, dst)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ArenaError {}

/// A position in the arena, tagged with the generation it was taken at.
#[must_use]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeRef {
    index: u32,
    generation: u32,
}

impl TreeRef {
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Debug for TreeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tree(#{}@{})", self.index, self.generation)
    }
}

impl fmt::Display for TreeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// Saved top-of-arena marker; see [`TreeArena::rollback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaCheckpoint {
    len: usize,
}

#[derive(Debug, Clone)]
pub struct TreeArena {
    nodes: Vec<Node>,
    capacity: usize,
    /// Lowest position disturbed by each mutation, oldest first.
    invalidations: Vec<u32>,
    /// Generation number of `invalidations[0]`.
    log_base: u32,
}

impl Default for TreeArena {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl TreeArena {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::new(),
            capacity,
            invalidations: Vec::new(),
            log_base: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current generation; bumped by every moving mutation.
    pub fn generation(&self) -> u32 {
        self.log_base + self.invalidations.len() as u32
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn kind(&self, index: usize) -> NodeKind {
        self.nodes[index].kind
    }

    /// Nodes of the subtree rooted at `index`, in prefix order.
    pub fn tree_nodes(&self, index: usize) -> &[Node] {
        &self.nodes[index..self.next_tree(index)]
    }

    // ========================================================================
    // Handles
    // ========================================================================

    pub fn handle(&self, index: usize) -> TreeRef {
        debug_assert!(index < self.nodes.len());
        TreeRef {
            index: index as u32,
            generation: self.generation(),
        }
    }

    /// Position of a handle, or `StaleHandle` if a mutation at or before it
    /// happened since it was taken.
    pub fn resolve(&self, handle: TreeRef) -> Result<usize, ArenaError> {
        let index = handle.index();
        if handle.generation < self.log_base || index >= self.nodes.len() {
            return Err(ArenaError::StaleHandle);
        }
        let since = (handle.generation - self.log_base) as usize;
        let disturbed = self.invalidations[since..]
            .iter()
            .any(|&position| position as usize <= index);
        if disturbed {
            Err(ArenaError::StaleHandle)
        } else {
            Ok(index)
        }
    }

    pub fn is_valid(&self, handle: TreeRef) -> bool {
        self.resolve(handle).is_ok()
    }

    fn invalidate_from(&mut self, position: usize) {
        if self.invalidations.len() >= MAX_INVALIDATION_LOG {
            // Retire every outstanding handle rather than grow without bound.
            self.log_base += self.invalidations.len() as u32 + 1;
            self.invalidations.clear();
        }
        self.invalidations.push(position.min(u32::MAX as usize) as u32);
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn child_count(&self, index: usize) -> usize {
        self.nodes[index].child_count()
    }

    /// Number of nodes in the subtree rooted at `index`.
    pub fn tree_size(&self, index: usize) -> usize {
        let mut remaining = 1usize;
        let mut cursor = index;
        while remaining > 0 {
            remaining = remaining - 1 + self.nodes[cursor].child_count();
            cursor += 1;
        }
        cursor - index
    }

    /// Position right after the subtree rooted at `index`.
    pub fn next_tree(&self, index: usize) -> usize {
        index + self.tree_size(index)
    }

    pub fn child(&self, index: usize, n: usize) -> usize {
        debug_assert!(n < self.child_count(index));
        let mut cursor = index + 1;
        for _ in 0..n {
            cursor = self.next_tree(cursor);
        }
        cursor
    }

    pub fn children(&self, index: usize) -> Children<'_> {
        Children {
            arena: self,
            next: index + 1,
            remaining: self.child_count(index),
        }
    }

    /// Positions of all children, collected before any mutation.
    pub fn child_positions(&self, index: usize) -> smallvec::SmallVec<[usize; 4]> {
        self.children(index).collect()
    }

    /// Position of the parent of `index` within the tree rooted at `root`.
    pub fn parent_of(&self, root: usize, index: usize) -> Option<usize> {
        if index <= root || index >= self.next_tree(root) {
            return None;
        }
        let mut parent = root;
        loop {
            let mut found = None;
            for child in self.children(parent) {
                if child == index {
                    return Some(parent);
                }
                if child < index && index < self.next_tree(child) {
                    found = Some(child);
                    break;
                }
            }
            parent = found?;
        }
    }

    /// Whether any node of the subtree satisfies `predicate`.
    pub fn any_descendant(&self, index: usize, predicate: impl Fn(&Node) -> bool) -> bool {
        self.tree_nodes(index).iter().any(predicate)
    }

    /// Structural equality of two subtrees.
    pub fn tree_eq(&self, a: usize, b: usize) -> bool {
        self.tree_nodes(a) == self.tree_nodes(b)
    }

    // ========================================================================
    // Pushing
    // ========================================================================

    fn reserve(&self, additional: usize) -> Result<(), ArenaError> {
        if self.nodes.len() + additional > self.capacity {
            warn!(capacity = self.capacity, "tree arena exhausted");
            return Err(ArenaError::Exhausted {
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Append a node at the top. Its children are the trees pushed next.
    pub fn push(&mut self, node: Node) -> Result<usize, ArenaError> {
        self.reserve(1)?;
        self.nodes.push(node);
        Ok(self.nodes.len() - 1)
    }

    pub fn push_kind(&mut self, kind: NodeKind) -> Result<usize, ArenaError> {
        self.push(Node::new(kind))
    }

    pub fn push_nary(&mut self, kind: NodeKind, count: usize) -> Result<usize, ArenaError> {
        self.push(Node::nary(kind, count_to_u8(count)))
    }

    pub fn push_integer(&mut self, value: i64) -> Result<usize, ArenaError> {
        self.push(Node::integer(value))
    }

    pub fn push_float(&mut self, value: f64) -> Result<usize, ArenaError> {
        self.push(Node::float(value))
    }

    /// Push `p/q`, falling back to a float if it cannot be normalized.
    pub fn push_rational(&mut self, p: i64, q: i64) -> Result<usize, ArenaError> {
        match Node::rational(p, q) {
            Some(node) => self.push(node),
            None if q == 0 => self.push_kind(NodeKind::Undefined),
            None => self.push_float(p as f64 / q as f64),
        }
    }

    /// Copy of the subtree at `index`, appended at the top.
    ///
    /// Existing positions are unaffected.
    pub fn clone_tree(&mut self, index: usize) -> Result<usize, ArenaError> {
        let end = self.next_tree(index);
        self.reserve(end - index)?;
        let top = self.nodes.len();
        self.nodes.extend_from_within(index..end);
        Ok(top)
    }

    /// Append a detached tree at the top.
    pub fn push_tree(&mut self, tree: &Tree) -> Result<usize, ArenaError> {
        self.reserve(tree.len())?;
        let top = self.nodes.len();
        self.nodes.extend_from_slice(tree.nodes());
        Ok(top)
    }

    /// Detached copy of the subtree at `index`.
    pub fn extract(&self, index: usize) -> Tree {
        Tree::from_nodes(self.tree_nodes(index).to_vec())
    }

    // ========================================================================
    // Moving mutations
    // ========================================================================

    /// Replace the subtree at `dst` with the subtree at `src`, removing
    /// `src` from where it was.
    ///
    /// `src` may live anywhere, including inside `dst` (replace a node with
    /// one of its descendants) or at the top (replace with a freshly built
    /// tree). Returns the new position of the moved tree.
    pub fn move_tree_over_tree(&mut self, dst: usize, src: usize) -> Result<usize, ArenaError> {
        if dst == src {
            return Ok(dst);
        }
        let src_len = self.tree_size(src);
        if src < dst && dst < src + src_len {
            return Err(ArenaError::InvalidMove { dst, src });
        }
        let dst_len = self.tree_size(dst);
        let moved: Vec<Node> = self.nodes.drain(src..src + src_len).collect();
        let (dst, dst_len) = if src < dst {
            (dst - src_len, dst_len)
        } else if src < dst + dst_len {
            (dst, dst_len - src_len)
        } else {
            (dst, dst_len)
        };
        self.nodes.splice(dst..dst + dst_len, moved);
        self.invalidate_from(dst.min(src));
        Ok(dst)
    }

    /// Replace the subtree at `dst` with a copy of the subtree at `src`.
    pub fn clone_tree_over_tree(&mut self, dst: usize, src: usize) -> Result<usize, ArenaError> {
        let copy = self.clone_tree(src)?;
        self.move_tree_over_tree(dst, copy)
    }

    /// Replace the subtree at `dst` with a detached tree.
    pub fn replace_with_tree(&mut self, dst: usize, tree: &Tree) -> Result<usize, ArenaError> {
        let top = self.push_tree(tree)?;
        self.move_tree_over_tree(dst, top)
    }

    /// Replace the subtree at `dst` with a single leaf node.
    pub fn replace_with_node(&mut self, dst: usize, node: Node) -> Result<usize, ArenaError> {
        debug_assert_eq!(node.child_count(), 0);
        let top = self.push(node)?;
        self.move_tree_over_tree(dst, top)
    }

    pub fn remove_tree(&mut self, index: usize) {
        let end = self.next_tree(index);
        self.nodes.drain(index..end);
        self.invalidate_from(index);
    }

    /// Remove only the node at `index`; its children take its place in the
    /// parent. The parent's child count is the caller's business.
    pub fn remove_node(&mut self, index: usize) {
        self.nodes.remove(index);
        self.invalidate_from(index);
    }

    /// Insert `node` right before position `index`, so the tree at `index`
    /// becomes its first child (and following trees its next ones).
    pub fn insert_node(&mut self, index: usize, node: Node) -> Result<(), ArenaError> {
        self.reserve(1)?;
        self.nodes.insert(index, node);
        self.invalidate_from(index);
        Ok(())
    }

    /// Remove child `n` of the n-ary node at `index`.
    pub fn remove_child(&mut self, index: usize, n: usize) {
        let child = self.child(index, n);
        let count = self.child_count(index);
        self.remove_tree(child);
        self.set_child_count(index, count - 1);
    }

    /// Drop every node from `index` to the top.
    pub fn truncate(&mut self, index: usize) {
        if index < self.nodes.len() {
            self.nodes.truncate(index);
            self.invalidate_from(index);
        }
    }

    // ========================================================================
    // In-place edits (no node moves)
    // ========================================================================

    pub fn set_payload(&mut self, index: usize, payload: Payload) {
        self.nodes[index].payload = payload;
    }

    /// Replace the kind and payload of a node, keeping its children.
    pub fn set_node(&mut self, index: usize, node: Node) {
        debug_assert_eq!(node.child_count(), self.nodes[index].child_count());
        self.nodes[index] = node;
    }

    pub fn set_child_count(&mut self, index: usize, count: usize) {
        debug_assert!(matches!(self.nodes[index].kind.arity(), Arity::NAry));
        self.nodes[index].payload = Payload::Count(count_to_u8(count));
    }

    // ========================================================================
    // Checkpoints
    // ========================================================================

    pub fn checkpoint(&self) -> ArenaCheckpoint {
        ArenaCheckpoint {
            len: self.nodes.len(),
        }
    }

    /// Reset the top of the arena to a saved checkpoint, in O(1) with
    /// respect to the work done since.
    ///
    /// Trees below the checkpoint that were mutated in place since are not
    /// restored; callers that need that work on a clone above the
    /// checkpoint.
    pub fn rollback(&mut self, checkpoint: ArenaCheckpoint) {
        self.truncate(checkpoint.len);
    }

    /// Drop everything.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.log_base += self.invalidations.len() as u32 + 1;
        self.invalidations.clear();
    }
}

fn count_to_u8(count: usize) -> u8 {
    debug_assert!(count <= u8::MAX as usize, "too many children: {count}");
    count.min(u8::MAX as usize) as u8
}

/// Iterator over the positions of a node's children.
pub struct Children<'a> {
    arena: &'a TreeArena,
    next: usize,
    remaining: usize,
}

impl Iterator for Children<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.next;
        self.remaining -= 1;
        if self.remaining > 0 {
            self.next = self.arena.next_tree(current);
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Children<'_> {}

#[cfg(test)]
#[path = "arena_test.rs"]
mod arena_test;
