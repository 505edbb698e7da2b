//! Systematic reduction of projected trees.
//!
//! A bottom-up pass that:
//! - flattens nested `Add` and `Mult`,
//! - folds exact rational constants with overflow-checked `i64` arithmetic,
//! - drops neutral elements (`+0`, `·1`, `^1`),
//! - collapses `0·A` to `0` when `A` cannot be undefined.
//!
//! Projected units are `ratio · 10^prefix` products of rationals, so the
//! folding collapses them to a single exact ratio.
//!
//! Reduction never fails hard. On overflow, an exhausted budget or a full
//! arena it stops where it is and reports a [`ReductionFailure`] next to
//! the best-effort tree.

use core::fmt;

use tracing::{debug, warn};

use crate::interrupt::{AbortReason, Aborted, Budget};
use crate::tree::{ArenaError, Node, NodeKind, TreeArena, normalize_rational};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReductionFailure {
    /// A constant did not fit in `i64`; that node was left unfolded.
    Overflow,
    Aborted(AbortReason),
    Arena(ArenaError),
}

impl fmt::Display for ReductionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReductionFailure::Overflow => write!(f, "integer overflow while folding constants"),
            ReductionFailure::Aborted(reason) => write!(f, "reduction aborted: {}", reason),
            ReductionFailure::Arena(error) => write!(f, "{}", error),
        }
    }
}

impl From<Aborted> for ReductionFailure {
    fn from(aborted: Aborted) -> Self {
        ReductionFailure::Aborted(aborted.reason)
    }
}

impl From<ArenaError> for ReductionFailure {
    fn from(error: ArenaError) -> Self {
        ReductionFailure::Arena(error)
    }
}

/// What a reduction pass did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reduction {
    pub changed: bool,
    /// First failure met; the tree is still valid but may be partly reduced.
    pub failure: Option<ReductionFailure>,
}

impl Reduction {
    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Reduce the tree at `index` in place. Polls `budget` once per node.
pub fn deep_systematic_reduce(
    arena: &mut TreeArena,
    index: usize,
    budget: &mut Budget,
) -> Reduction {
    let mut reducer = Reducer {
        budget,
        changed: false,
        failure: None,
    };
    if let Err(failure) = reducer.reduce(arena, index) {
        reducer.fail(failure);
    }
    if let Some(failure) = &reducer.failure {
        warn!(%failure, "reduction stopped early");
    } else if reducer.changed {
        debug!(index, size = arena.tree_size(index), "reduced");
    }
    Reduction {
        changed: reducer.changed,
        failure: reducer.failure,
    }
}

struct Reducer<'b> {
    budget: &'b mut Budget,
    changed: bool,
    failure: Option<ReductionFailure>,
}

impl Reducer<'_> {
    fn fail(&mut self, failure: ReductionFailure) {
        self.failure.get_or_insert(failure);
    }

    fn reduce(&mut self, arena: &mut TreeArena, index: usize) -> Result<(), ReductionFailure> {
        self.budget.poll()?;
        self.budget.enter()?;
        let result = self.reduce_entered(arena, index);
        self.budget.leave();
        result
    }

    fn reduce_entered(
        &mut self,
        arena: &mut TreeArena,
        index: usize,
    ) -> Result<(), ReductionFailure> {
        let kind = arena.kind(index);
        let mut child = index + 1;
        for n in 0..arena.child_count(index) {
            // The target of a conversion stays a unit for display.
            if !(kind == NodeKind::UnitConversion && n == 1) {
                self.reduce(arena, child)?;
            }
            child = arena.next_tree(child);
        }
        match kind {
            NodeKind::Add | NodeKind::Mult => self.reduce_nary(arena, index, kind),
            NodeKind::Pow | NodeKind::PowReal => self.reduce_power(arena, index),
            _ => Ok(()),
        }
    }

    fn reduce_nary(
        &mut self,
        arena: &mut TreeArena,
        index: usize,
        kind: NodeKind,
    ) -> Result<(), ReductionFailure> {
        self.flatten(arena, index, kind);

        let neutral = if kind == NodeKind::Add { 0 } else { 1 };
        let mut value = (neutral, 1);
        let mut constants = 0;
        for child in arena.children(index) {
            let Some(rational) = arena.node(child).as_rational() else {
                continue;
            };
            let combined = if kind == NodeKind::Add {
                add_rationals(value, rational)
            } else {
                mul_rationals(value, rational)
            };
            match combined {
                Some(combined) => value = combined,
                None => {
                    self.fail(ReductionFailure::Overflow);
                    return Ok(());
                }
            }
            constants += 1;
        }

        let absorbing = kind == NodeKind::Mult && value.0 == 0;
        if constants >= 2 || (constants == 1 && (value == (neutral, 1) || absorbing)) {
            for position in arena.child_positions(index).into_iter().rev() {
                if arena.node(position).as_rational().is_some() {
                    let count = arena.child_count(index);
                    arena.remove_tree(position);
                    arena.set_child_count(index, count - 1);
                }
            }
            if absorbing && !may_be_undefined(arena, index) {
                arena.replace_with_node(index, Node::integer(0))?;
                self.changed = true;
                return Ok(());
            }
            if value != (neutral, 1) || arena.child_count(index) == 0 {
                let Some(node) = Node::rational(value.0, value.1) else {
                    self.fail(ReductionFailure::Overflow);
                    return Ok(());
                };
                arena.insert_node(index + 1, node)?;
                let count = arena.child_count(index);
                arena.set_child_count(index, count + 1);
            }
            self.changed = true;
        }

        match arena.child_count(index) {
            0 => {
                arena.replace_with_node(index, Node::integer(neutral))?;
                self.changed = true;
            }
            1 => {
                arena.move_tree_over_tree(index, index + 1)?;
                self.changed = true;
            }
            _ => {}
        }
        Ok(())
    }

    /// Splice children of the same n-ary kind into their parent.
    fn flatten(&mut self, arena: &mut TreeArena, index: usize, kind: NodeKind) {
        let mut n = 0;
        while n < arena.child_count(index) {
            let child = arena.child(index, n);
            if arena.kind(child) == kind {
                let count = arena.child_count(index) - 1 + arena.child_count(child);
                if count <= u8::MAX as usize {
                    arena.remove_node(child);
                    arena.set_child_count(index, count);
                    self.changed = true;
                    continue;
                }
            }
            n += 1;
        }
    }

    fn reduce_power(
        &mut self,
        arena: &mut TreeArena,
        index: usize,
    ) -> Result<(), ReductionFailure> {
        let base = index + 1;
        let exponent = arena.next_tree(base);
        let Some(n) = arena.node(exponent).as_integer() else {
            return Ok(());
        };
        if n == 1 {
            arena.move_tree_over_tree(index, base)?;
            self.changed = true;
            return Ok(());
        }
        let Some((p, q)) = arena.node(base).as_rational() else {
            return Ok(());
        };
        // 0^0 and 0^-n stay for approximation to report as undefined.
        if p == 0 && n <= 0 {
            return Ok(());
        }
        let (p, q) = if n < 0 { (q, p) } else { (p, q) };
        let Ok(magnitude) = u32::try_from(n.unsigned_abs()) else {
            self.fail(ReductionFailure::Overflow);
            return Ok(());
        };
        let power = p
            .checked_pow(magnitude)
            .zip(q.checked_pow(magnitude))
            .and_then(|(p, q)| Node::rational(p, q));
        match power {
            Some(node) => {
                arena.replace_with_node(index, node)?;
                self.changed = true;
            }
            None => self.fail(ReductionFailure::Overflow),
        }
        Ok(())
    }
}

fn add_rationals((p1, q1): (i64, i64), (p2, q2): (i64, i64)) -> Option<(i64, i64)> {
    let p = p1.checked_mul(q2)?.checked_add(p2.checked_mul(q1)?)?;
    normalize_rational(p, q1.checked_mul(q2)?)
}

fn mul_rationals((p1, q1): (i64, i64), (p2, q2): (i64, i64)) -> Option<(i64, i64)> {
    normalize_rational(p1.checked_mul(p2)?, q1.checked_mul(q2)?)
}

/// Whether approximating the children of `index` could give `Undefined`
/// (or a non-scalar), which `0·A` must not hide.
fn may_be_undefined(arena: &TreeArena, index: usize) -> bool {
    arena.children(index).any(|child| {
        arena.any_descendant(child, |node| {
            use NodeKind::*;
            !(node.kind.is_rational()
                || matches!(
                    node.kind,
                    Pi | ImaginaryUnit | Add | Mult | Trig | Abs | Floor | Re | Im | Sign | Variable
                ))
        })
    })
}

#[cfg(test)]
#[path = "reduction_test.rs"]
mod reduction_test;
