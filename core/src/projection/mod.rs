//! Projection: rewriting user syntax into canonical system primitives.
//!
//! [`deep_system_project`] visits a tree top-down. At each node it applies
//! the shallow rules of [`rules`] until none fires, then moves on to the
//! children. Rules are purely syntactic pattern-and-replace; there is no
//! unification.
//!
//! Projection also enforces the exam-mode [`ProjectionPolicy`]: blocked
//! constructs become `Forbidden` markers, which approximation reports as
//! the `Forbidden` outcome.
//!
//! # Example
//!
//! ```ignore
//! let root = parse_into_arena(&mut arena, "sqrt(2)/2")?;
//! deep_system_project(&mut arena, root, &ProjectionContext::default())?;
//! // Mult(2)[Pow[2, 1/2], Pow[2, -1]]
//! ```

mod error;
mod rules;
mod seeds;
mod symbols;

pub use error::ProjectionError;
pub use rules::shallow_system_project;
pub use seeds::deep_assign_seeds;
pub use symbols::{
    SymbolContext, SymbolTable, SymbolicComputation, deep_replace_user_named, parameterize,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::approximation::{self, ComplexFormat, Context, Outcome};
use crate::interrupt::Budget;
use crate::tree::{ArenaError, Node, NodeKind, TreeArena};
use crate::units::AngleUnit;

/// Most times rules may fire on a single node before moving on.
const MAX_RULES_PER_NODE: usize = 32;

/// Exam-mode switches. Each one blocks a family of constructs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectionPolicy {
    pub forbid_units: bool,
    pub forbid_logarithm_with_base: bool,
    pub forbid_sum: bool,
    /// Vector norms and products.
    pub forbid_vectors: bool,
    pub forbid_inequalities: bool,
    /// Results are shown as approximations only.
    pub forbid_exact_results: bool,
}

impl ProjectionPolicy {
    /// Whether a node of this kind must become `Forbidden`.
    pub fn forbids(&self, kind: NodeKind) -> bool {
        use NodeKind::*;
        match kind {
            Unit | UnitConversion => self.forbid_units,
            LogBase => self.forbid_logarithm_with_base,
            Sum => self.forbid_sum,
            Norm | Dot | Cross => self.forbid_vectors,
            Less | LessOrEqual | Greater | GreaterOrEqual => self.forbid_inequalities,
            _ => false,
        }
    }

    pub fn is_exam_mode(&self) -> bool {
        *self != ProjectionPolicy::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProjectionStrategy {
    #[default]
    Default,
    /// Also replace every constant scalar subtree by its `Float` value.
    ApproximateToFloat,
}

/// Settings projection reads. Built from the user preferences for each
/// evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProjectionContext {
    pub complex_format: ComplexFormat,
    pub angle_unit: AngleUnit,
    pub strategy: ProjectionStrategy,
    pub policy: ProjectionPolicy,
}

impl ProjectionContext {
    pub fn is_real_mode(&self) -> bool {
        self.complex_format == ComplexFormat::Real
    }
}

/// Rewrite the tree at `index` in place into canonical form.
///
/// Seeds are assigned first, so copies made by the rules share the draws
/// of their originals. Returns whether anything changed.
pub fn deep_system_project(
    arena: &mut TreeArena,
    index: usize,
    context: &ProjectionContext,
) -> Result<bool, ArenaError> {
    let mut changed = deep_assign_seeds(arena, index);
    changed |= project_node(arena, index, context)?;
    if context.strategy == ProjectionStrategy::ApproximateToFloat {
        changed |= approximate_constants(arena, index, context)?;
    }
    if changed {
        debug!(index, size = arena.tree_size(index), "projected");
    }
    Ok(changed)
}

fn project_node(
    arena: &mut TreeArena,
    index: usize,
    context: &ProjectionContext,
) -> Result<bool, ArenaError> {
    let mut changed = false;
    for _ in 0..MAX_RULES_PER_NODE {
        if !shallow_system_project(arena, index, context)? {
            break;
        }
        changed = true;
    }
    let kind = arena.kind(index);
    let count = arena.child_count(index);
    let mut child = index + 1;
    for n in 0..count {
        // The target of a conversion stays a unit for display.
        if !(kind == NodeKind::UnitConversion && n == 1) {
            changed |= project_node(arena, child, context)?;
        }
        child = arena.next_tree(child);
    }
    Ok(changed)
}

/// Whether the subtree is a constant with a reproducible value.
fn is_constant(arena: &TreeArena, index: usize) -> bool {
    !arena.any_descendant(index, |node| {
        use NodeKind::*;
        matches!(
            node.kind,
            UserSymbol
                | UserFunction
                | UserSequence
                | Variable
                | Parameter
                | Random
                | RandInt
                | RandIntNoRep
                | Forbidden
                | Unit
        )
    })
}

fn approximate_constants(
    arena: &mut TreeArena,
    index: usize,
    context: &ProjectionContext,
) -> Result<bool, ArenaError> {
    let node = arena.node(index);
    if node.kind == NodeKind::Float || node.as_rational().is_some() {
        return Ok(false);
    }
    let dimension = crate::dimension::get_dimension(arena, index);
    let is_scalar = dimension.is_scalar()
        && crate::dimension::list_length(arena, index).is_none()
        && node.child_count() > 0;
    if is_scalar && is_constant(arena, index) {
        let mut approximation = Context::<f64>::new(
            context.angle_unit,
            context.complex_format,
            0,
            Budget::unlimited(),
        );
        let outcome = match approximation::to_complex(arena, index, &mut approximation) {
            Ok(outcome) => outcome,
            Err(aborted) => {
                trace!(%aborted, "constant left exact");
                return Ok(false);
            }
        };
        let top = match outcome {
            Outcome::Value(v) if v.im == 0.0 => arena.push(Node::float(v.re))?,
            Outcome::Value(v) => {
                let add = arena.push_nary(NodeKind::Add, 2)?;
                arena.push(Node::float(v.re))?;
                arena.push_nary(NodeKind::Mult, 2)?;
                arena.push(Node::float(v.im))?;
                arena.push_kind(NodeKind::ImaginaryUnit)?;
                add
            }
            Outcome::Undefined => arena.push_kind(NodeKind::Undefined)?,
            Outcome::NonReal => arena.push_kind(NodeKind::NonReal)?,
            Outcome::Forbidden => arena.push_kind(NodeKind::Forbidden)?,
        };
        arena.move_tree_over_tree(index, top)?;
        return Ok(true);
    }
    let kind = node.kind;
    let count = node.child_count();
    let mut changed = false;
    let mut child = index + 1;
    for n in 0..count {
        // Exact exponents keep real roots of negative numbers real.
        let exact_exponent = matches!(kind, NodeKind::Pow | NodeKind::PowReal) && n == 1;
        if !exact_exponent {
            changed |= approximate_constants(arena, child, context)?;
        }
        child = arena.next_tree(child);
    }
    Ok(changed)
}

#[cfg(test)]
#[path = "projection_test.rs"]
mod projection_test;
