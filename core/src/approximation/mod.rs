//! Numeric approximation of projected trees.
//!
//! The approximator walks a tree under an evaluation [`Context`] and
//! produces a number, boolean, point, matrix or list. Domain failures are
//! not errors: they are the [`Outcome::Undefined`], [`Outcome::NonReal`]
//! and [`Outcome::Forbidden`] values, which propagate like NaN. The only
//! hard failure is [`Aborted`], raised when the evaluation budget trips.
//!
//! # Design
//!
//! - **Complex throughout**: scalars are `Complex<T>` for a [`Precision`]
//!   `T`. Real mode is enforced at the root, where a value with a non-zero
//!   imaginary part becomes `NonReal`.
//! - **Elementwise structures**: lists and points are evaluated one element
//!   at a time, with the element index kept in the context.
//! - **Root guard**: the public entry points refuse trees that fail
//!   [`deep_check`] or still hold a `Forbidden` marker.
//!
//! # Example
//!
//! ```ignore
//! let mut context = Context::<f64>::default();
//! match to_real(&arena, root, &mut context)? {
//!     Outcome::Value(v) => println!("{v}"),
//!     other => println!("{other}"),
//! }
//! ```

mod complex;
mod context;
mod evaluator;
mod integral;
mod lists;
mod matrix;
mod random;

use core::fmt;

pub use complex::C as Complex;
pub use context::{ComplexFormat, Context, MAX_LOCAL_VARIABLES};
pub use matrix::Matrix;
pub use random::RandomContext;

use evaluator::Approximator;
use tracing::trace;

use crate::Vec;
use crate::dimension::{deep_check, get_dimension, list_length};
use crate::interrupt::Aborted;
use crate::precision::Precision;
use crate::tree::{NodeKind, TreeArena};

/// Result of approximating a tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<V> {
    Value(V),
    /// Domain or arithmetic failure.
    Undefined,
    /// A complex value where real mode only accepts reals.
    NonReal,
    /// The tree contains a construct blocked by the active policy.
    Forbidden,
}

impl<V> Outcome<V> {
    pub fn is_value(&self) -> bool {
        matches!(self, Outcome::Value(_))
    }

    pub fn value(self) -> Option<V> {
        match self {
            Outcome::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> Outcome<U> {
        match self {
            Outcome::Value(v) => Outcome::Value(f(v)),
            Outcome::Undefined => Outcome::Undefined,
            Outcome::NonReal => Outcome::NonReal,
            Outcome::Forbidden => Outcome::Forbidden,
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(V) -> Outcome<U>) -> Outcome<U> {
        match self {
            Outcome::Value(v) => f(v),
            Outcome::Undefined => Outcome::Undefined,
            Outcome::NonReal => Outcome::NonReal,
            Outcome::Forbidden => Outcome::Forbidden,
        }
    }

    /// Retype a non-value outcome. A value becomes `Undefined`.
    pub(crate) fn discard<U>(self) -> Outcome<U> {
        debug_assert!(!self.is_value());
        self.and_then(|_| Outcome::Undefined)
    }
}

impl<V> fmt::Display for Outcome<V>
where
    V: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Value(v) => write!(f, "{}", v),
            Outcome::Undefined => write!(f, "undef"),
            Outcome::NonReal => write!(f, "nonreal"),
            Outcome::Forbidden => write!(f, "forbidden"),
        }
    }
}

pub(crate) type Approx<V> = Result<Outcome<V>, Aborted>;

/// Unwrap the value of an [`Approx`], returning early with any other
/// outcome (or abort).
macro_rules! value {
    ($e:expr) => {
        match $e? {
            $crate::approximation::Outcome::Value(v) => v,
            other => return Ok(other.discard()),
        }
    };
}
pub(crate) use value;

/// One element of an approximated list.
#[derive(Debug, Clone, PartialEq)]
pub enum Element<T: Precision> {
    Number(Complex<T>),
    Boolean(bool),
    Point(T, T),
}

/// Any approximation result, shaped by the tree's dimension.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<T: Precision> {
    Number(Complex<T>),
    Boolean(bool),
    Point(T, T),
    Matrix(Matrix<T>),
    List(Vec<Outcome<Element<T>>>),
}

// ============================================================================
// Root entry points
// ============================================================================

/// Trees that must not be approximated at all.
///
/// Once projected, the target of a unit conversion is a plain ratio, so only
/// the converted quantity is checked.
fn root_guard<V>(arena: &TreeArena, index: usize) -> Option<Outcome<V>> {
    if arena.any_descendant(index, |node| node.kind == NodeKind::Forbidden) {
        return Some(Outcome::Forbidden);
    }
    let checked = match arena.kind(index) {
        NodeKind::UnitConversion => index + 1,
        _ => index,
    };
    if !deep_check(arena, checked) {
        trace!(index, "approximation refused by deep check");
        return Some(Outcome::Undefined);
    }
    None
}

/// Apply the complex-format policy to a root number.
fn finish_number<T: Precision>(value: Complex<T>, real_mode: bool) -> Outcome<Complex<T>> {
    if real_mode && !complex::is_real(value) {
        return Outcome::NonReal;
    }
    Outcome::Value(value)
}

pub fn to_complex<T: Precision>(
    arena: &TreeArena,
    index: usize,
    context: &mut Context<T>,
) -> Result<Outcome<Complex<T>>, Aborted> {
    if let Some(refused) = root_guard(arena, index) {
        return Ok(refused);
    }
    let real_mode = context.is_real_mode();
    let outcome = Approximator::new(arena, context).scalar(index)?;
    Ok(outcome.and_then(|v| finish_number(v, real_mode)))
}

/// A real number; a value with an imaginary part is `NonReal`.
pub fn to_real<T: Precision>(
    arena: &TreeArena,
    index: usize,
    context: &mut Context<T>,
) -> Result<Outcome<T>, Aborted> {
    Ok(to_complex(arena, index, context)?.and_then(|v| {
        if complex::is_real(v) {
            Outcome::Value(v.re)
        } else {
            Outcome::NonReal
        }
    }))
}

pub fn to_boolean<T: Precision>(
    arena: &TreeArena,
    index: usize,
    context: &mut Context<T>,
) -> Result<Outcome<bool>, Aborted> {
    if let Some(refused) = root_guard(arena, index) {
        return Ok(refused);
    }
    Approximator::new(arena, context).boolean(index)
}

pub fn to_point<T: Precision>(
    arena: &TreeArena,
    index: usize,
    context: &mut Context<T>,
) -> Result<Outcome<(T, T)>, Aborted> {
    if let Some(refused) = root_guard(arena, index) {
        return Ok(refused);
    }
    Approximator::new(arena, context).point(index)
}

pub fn to_matrix<T: Precision>(
    arena: &TreeArena,
    index: usize,
    context: &mut Context<T>,
) -> Result<Outcome<Matrix<T>>, Aborted> {
    if let Some(refused) = root_guard(arena, index) {
        return Ok(refused);
    }
    let outcome = Approximator::new(arena, context).matrix(index)?;
    if context.is_real_mode() {
        if let Outcome::Value(m) = &outcome {
            if m.entries.iter().any(|entry| !complex::is_real(*entry)) {
                return Ok(Outcome::NonReal);
            }
        }
    }
    Ok(outcome)
}

/// Every element of a list; one undefined element leaves the others intact.
pub fn to_list<T: Precision>(
    arena: &TreeArena,
    index: usize,
    context: &mut Context<T>,
) -> Result<Outcome<Vec<Outcome<Element<T>>>>, Aborted> {
    if let Some(refused) = root_guard(arena, index) {
        return Ok(refused);
    }
    let Some(length) = list_length(arena, index) else {
        return Ok(Outcome::Undefined);
    };
    let element_dimension = get_dimension(arena, index);
    let real_mode = context.is_real_mode();
    let mut elements = Vec::with_capacity(context.reserve(length)?);
    for element in 0..length {
        context.poll()?;
        let previous = context.replace_list_index(Some(element));
        let mut approximator = Approximator::new(arena, context);
        let result = if element_dimension.is_boolean() {
            approximator.boolean(index).map(|o| o.map(Element::Boolean))
        } else if element_dimension.is_point() {
            approximator
                .point(index)
                .map(|o| o.map(|(x, y)| Element::Point(x, y)))
        } else {
            approximator.scalar(index).map(|o| {
                o.and_then(|v| finish_number(v, real_mode))
                    .map(Element::Number)
            })
        };
        context.replace_list_index(previous);
        elements.push(result?);
    }
    Ok(Outcome::Value(elements))
}

/// Approximate a tree to whatever shape its dimension has.
pub fn approximate<T: Precision>(
    arena: &TreeArena,
    index: usize,
    context: &mut Context<T>,
) -> Result<Outcome<Value<T>>, Aborted> {
    if list_length(arena, index).is_some() {
        return Ok(to_list(arena, index, context)?.map(Value::List));
    }
    let dimension = get_dimension(arena, index);
    if dimension.is_boolean() {
        Ok(to_boolean(arena, index, context)?.map(Value::Boolean))
    } else if dimension.is_point() {
        Ok(to_point(arena, index, context)?.map(|(x, y)| Value::Point(x, y)))
    } else if dimension.is_matrix() {
        Ok(to_matrix(arena, index, context)?.map(Value::Matrix))
    } else {
        Ok(to_complex(arena, index, context)?.map(Value::Number))
    }
}

/// Integer value of a constant subtree, for structural questions such as
/// list lengths and identity sizes.
///
/// This skips the root guard and runs with a default context, so it never
/// aborts and never recurses into dimension checking.
pub fn approximate_integer(arena: &TreeArena, index: usize) -> Option<i64> {
    let mut context = Context::<f64>::default();
    match Approximator::new(arena, &mut context).scalar(index) {
        Ok(Outcome::Value(v)) => complex::as_integer(v),
        _ => None,
    }
}

/// Exact `p/q` of a rational exponent, seen through the shapes projection
/// and reduction leave it in: a rational literal, `p · q^-1`, `p/q` or a
/// negation of one of those.
pub(crate) fn exact_rational(arena: &TreeArena, index: usize) -> Option<(i64, i64)> {
    let node = arena.node(index);
    if let Some(rational) = node.as_rational() {
        return Some(rational);
    }
    let (p, q) = match node.kind {
        NodeKind::Parenthesis => return exact_rational(arena, index + 1),
        NodeKind::Opposite => {
            let (p, q) = exact_rational(arena, index + 1)?;
            (p.checked_neg()?, q)
        }
        NodeKind::Div => {
            let p = arena.node(index + 1).as_integer()?;
            let q = arena.node(arena.child(index, 1)).as_integer()?;
            (p, q)
        }
        NodeKind::Pow => {
            let q = arena.node(index + 1).as_integer()?;
            if arena.node(arena.child(index, 1)).as_integer()? != -1 {
                return None;
            }
            (1, q)
        }
        NodeKind::Mult => {
            let mut p = 1i64;
            let mut q = 1i64;
            for child in arena.children(index) {
                let (cp, cq) = exact_rational(arena, child)?;
                p = p.checked_mul(cp)?;
                q = q.checked_mul(cq)?;
            }
            (p, q)
        }
        _ => return None,
    };
    crate::tree::normalize_rational(p, q)
}

#[cfg(test)]
#[path = "approximation_test.rs"]
mod approximation_test;
