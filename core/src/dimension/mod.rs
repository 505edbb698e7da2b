//! Evaluation shapes.
//!
//! [`get_dimension`] classifies a subtree as scalar, matrix, unit, boolean or
//! point. Whether it is a list is orthogonal and answered by
//! [`list_length`]: `{1, 2}` is a scalar-dimensioned list of length 2 and
//! `{(1, 2)}` a point-dimensioned one. [`deep_check`] validates both.

mod check;
mod list_length;

use core::fmt;

pub use check::deep_check;
pub use list_length::list_length;

use crate::tree::{NodeKind, TreeArena};
use crate::units::{Family, SIVector, rational_exponent, representative};

#[derive(Debug, Clone, Copy)]
pub enum Dimension {
    Scalar,
    Matrix {
        rows: u8,
        cols: u8,
    },
    /// `representative` is the last unit seen; only temperatures use it.
    Unit {
        vector: SIVector,
        representative: Option<u8>,
    },
    Boolean,
    Point,
}

impl Dimension {
    pub fn unit(representative_id: u8) -> Dimension {
        Dimension::Unit {
            vector: representative(representative_id).si_vector(),
            representative: Some(representative_id),
        }
    }

    fn from_vector(vector: SIVector, representative: Option<u8>) -> Dimension {
        if vector.is_empty() {
            Dimension::Scalar
        } else {
            Dimension::Unit {
                vector,
                representative,
            }
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Dimension::Scalar)
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, Dimension::Matrix { .. })
    }

    pub fn is_square_matrix(&self) -> bool {
        matches!(self, Dimension::Matrix { rows, cols } if rows == cols)
    }

    /// A matrix with a single row or column.
    pub fn is_vector(&self) -> bool {
        matches!(self, Dimension::Matrix { rows, cols } if *rows == 1 || *cols == 1)
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Dimension::Unit { .. })
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Dimension::Boolean)
    }

    pub fn is_point(&self) -> bool {
        matches!(self, Dimension::Point)
    }

    pub fn unit_vector(&self) -> Option<SIVector> {
        match self {
            Dimension::Unit { vector, .. } => Some(*vector),
            _ => None,
        }
    }

    /// A plain angle: `rad`, `°`, but not `rad²`.
    pub fn is_simple_angle_unit(&self) -> bool {
        self.unit_vector() == Some(Family::Angle.si_vector())
    }

    pub fn has_non_kelvin_temperature(&self) -> bool {
        matches!(
            self,
            Dimension::Unit { representative: Some(rep), .. }
                if crate::units::is_non_kelvin_temperature(*rep)
        )
    }
}

impl PartialEq for Dimension {
    /// Units compare by SI vector, temperatures also by representative.
    fn eq(&self, other: &Dimension) -> bool {
        match (self, other) {
            (Dimension::Scalar, Dimension::Scalar)
            | (Dimension::Boolean, Dimension::Boolean)
            | (Dimension::Point, Dimension::Point) => true,
            (
                Dimension::Matrix { rows, cols },
                Dimension::Matrix {
                    rows: other_rows,
                    cols: other_cols,
                },
            ) => rows == other_rows && cols == other_cols,
            (
                Dimension::Unit {
                    vector,
                    representative,
                },
                Dimension::Unit {
                    vector: other_vector,
                    representative: other_representative,
                },
            ) => {
                vector == other_vector
                    && (*vector != Family::Temperature.si_vector()
                        || representative == other_representative)
            }
            _ => false,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Scalar => write!(f, "scalar"),
            Dimension::Matrix { rows, cols } => write!(f, "matrix {}x{}", rows, cols),
            Dimension::Unit { vector, .. } => write!(f, "unit {}", vector),
            Dimension::Boolean => write!(f, "boolean"),
            Dimension::Point => write!(f, "point"),
        }
    }
}

/// Integer exponent of a power, if it is a literal small enough to scale
/// an SI vector.
pub(crate) fn integer_exponent(arena: &TreeArena, index: usize) -> Option<i8> {
    match rational_exponent(arena, index)? {
        (p, 1) => i8::try_from(p).ok(),
        _ => None,
    }
}

/// Dimension of the subtree at `index`.
///
/// Defined for any tree; on trees that fail [`deep_check`] the answer is
/// not meaningful.
pub fn get_dimension(arena: &TreeArena, index: usize) -> Dimension {
    use NodeKind::*;
    let kind = arena.kind(index);
    match kind {
        Mult | Div | Opposite => {
            let mut rows = 0u8;
            let mut cols = 0u8;
            let mut vector = SIVector::EMPTY;
            let mut unit_representative = None;
            for (i, child) in arena.children(index).enumerate() {
                match get_dimension(arena, child) {
                    Dimension::Matrix {
                        rows: child_rows,
                        cols: child_cols,
                    } => {
                        if rows == 0 {
                            rows = child_rows;
                        }
                        cols = child_cols;
                    }
                    Dimension::Unit {
                        vector: child_vector,
                        representative,
                    } => {
                        let factor = if kind == Div && i == 1 { -1 } else { 1 };
                        vector = vector
                            .checked_add_scaled(&child_vector, factor)
                            .unwrap_or(vector);
                        unit_representative = representative;
                    }
                    _ => {}
                }
            }
            if rows > 0 {
                Dimension::Matrix { rows, cols }
            } else {
                Dimension::from_vector(vector, unit_representative)
            }
        }
        Sum | Product => get_dimension(arena, arena.child(index, 2)),
        ListSequence => get_dimension(arena, arena.child(index, 0)),
        Pow | PowReal | PowMatrix => {
            let base = get_dimension(arena, arena.child(index, 0));
            match base {
                Dimension::Unit {
                    vector,
                    representative,
                } => {
                    let exponent = integer_exponent(arena, arena.child(index, 1)).unwrap_or(0);
                    let scaled = vector.checked_scale(exponent).unwrap_or(SIVector::EMPTY);
                    Dimension::from_vector(scaled, representative)
                }
                other => other,
            }
        }
        Abs | Sqrt | Floor | Ceil | Round | Add | Sub | Cross | Inverse | Ref | Rref
        | Piecewise | Parenthesis | ListElement | ListSort | Dependency | UnitConversion
        | Decimal => get_dimension(arena, index + 1),
        UserFunction => get_dimension(arena, index + 1),
        Matrix => match arena.node(index).matrix_size() {
            Some((rows, cols)) => Dimension::Matrix { rows, cols },
            None => Dimension::Scalar,
        },
        Dim => {
            if get_dimension(arena, index + 1).is_matrix() {
                Dimension::Matrix { rows: 1, cols: 2 }
            } else {
                Dimension::Scalar
            }
        }
        Transpose => match get_dimension(arena, index + 1) {
            Dimension::Matrix { rows, cols } => Dimension::Matrix {
                rows: cols,
                cols: rows,
            },
            other => other,
        },
        Identity => {
            let n = crate::approximation::approximate_integer(arena, index + 1)
                .and_then(|n| u8::try_from(n).ok())
                .unwrap_or(0);
            Dimension::Matrix { rows: n, cols: n }
        }
        Unit => match arena.node(index).unit_ids() {
            Some((rep, _)) => Dimension::unit(rep),
            None => Dimension::Scalar,
        },
        Point => Dimension::Point,
        List if arena.child_count(index) > 0 => get_dimension(arena, index + 1),
        ListSlice => get_dimension(arena, index + 1),
        True | False => Dimension::Boolean,
        _ if kind.is_logical_operator() || kind.is_comparison() => Dimension::Boolean,
        _ => Dimension::Scalar,
    }
}

#[cfg(test)]
#[path = "dimension_test.rs"]
mod dimension_test;
