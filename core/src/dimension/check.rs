use smallvec::SmallVec;
use tracing::trace;

use super::{Dimension, get_dimension, integer_exponent, list_length};
use crate::tree::{NodeKind, TreeArena};
use crate::units::{is_combination_of_units, si_vector};

/// Whether the subtree is structurally sound: dimensions agree, list
/// lengths agree, and argument constraints hold. Trees failing this must
/// not be approximated.
pub fn deep_check(arena: &TreeArena, index: usize) -> bool {
    let ok = check_dimensions(arena, index) && check_list_lengths(arena, index);
    if !ok {
        trace!(index, "deep check failed");
    }
    ok
}

/// Kinds under which a boolean child is accepted without being required.
fn tolerates_booleans(kind: NodeKind) -> bool {
    use NodeKind::*;
    matches!(
        kind,
        Piecewise | Parenthesis | Dependency | DependencyList | List | Equal | NotEqual
    )
}

fn requires_booleans(kind: NodeKind) -> bool {
    kind.is_logical_operator()
}

fn accepts_point_child(kind: NodeKind, position: usize) -> bool {
    use NodeKind::*;
    match kind {
        Piecewise => position % 2 == 0,
        ListSequence => position == 0,
        ListElement | ListSlice => position == 0,
        Dim | Dependency | DependencyList | List | ListSort | Parenthesis => true,
        _ => false,
    }
}

fn is_trigonometric(kind: NodeKind) -> bool {
    kind.is_direct_trigonometry() || matches!(kind, NodeKind::Trig | NodeKind::TanRad)
}

fn check_dimensions(arena: &TreeArena, index: usize) -> bool {
    use NodeKind::*;
    let kind = arena.kind(index);
    let children = arena.child_positions(index);
    let mut dims: SmallVec<[Dimension; 4]> = SmallVec::with_capacity(children.len());
    let mut has_unit_child = false;
    let mut has_non_kelvin_child = false;
    for (position, &child) in children.iter().enumerate() {
        if !check_dimensions(arena, child) {
            return false;
        }
        let dim = get_dimension(arena, child);
        if dim.is_unit() && kind != UnitConversion {
            // A non-Kelvin temperature cannot be mixed with any other unit.
            if has_non_kelvin_child {
                return false;
            }
            if dim.has_non_kelvin_temperature() {
                if has_unit_child {
                    return false;
                }
                has_non_kelvin_child = true;
            }
            has_unit_child = true;
        }
        if dim.is_boolean() != requires_booleans(kind) && !tolerates_booleans(kind) {
            return false;
        }
        if dim.is_point() && !accepts_point_child(kind, position) {
            return false;
        }
        dims.push(dim);
    }

    let mut units_allowed = false;
    let mut angle_units_allowed = false;
    match kind {
        Add | Sub => return dims.iter().all(|dim| *dim == dims[0]),
        Opposite | Div | Mult => {
            let mut cols = 0u8;
            let mut vector = crate::units::SIVector::EMPTY;
            for (i, dim) in dims.iter().enumerate() {
                let denominator = i == 1 && kind == Div;
                match *dim {
                    Dimension::Matrix { rows, cols: next_cols } => {
                        if (cols != 0 && cols != rows) || denominator {
                            return false;
                        }
                        cols = next_cols;
                    }
                    Dimension::Unit { vector: child, .. } => {
                        if has_non_kelvin_child && denominator {
                            return false;
                        }
                        let factor = if denominator { -1 } else { 1 };
                        match vector.checked_add_scaled(&child, factor) {
                            Some(sum) => vector = sum,
                            None => return false,
                        }
                    }
                    _ => {}
                }
            }
            return vector.is_empty() || cols == 0;
        }
        Pow | PowReal | PowMatrix => {
            if !dims[1].is_scalar() {
                return false;
            }
            let exponent = arena.child(index, 1);
            if dims[0].is_matrix() {
                let integral = !matches!(
                    crate::units::rational_exponent(arena, exponent),
                    Some((_, q)) if q != 1
                );
                return dims[0].is_square_matrix() && integral;
            }
            if !dims[0].is_unit() {
                return true;
            }
            if has_non_kelvin_child {
                return false;
            }
            return integer_exponent(arena, exponent).is_some();
        }
        Sum | Product => {
            return dims[0].is_scalar()
                && dims[1].is_scalar()
                && (kind == Sum || dims[2].is_scalar() || dims[2].is_square_matrix());
        }
        Integral => return dims.iter().all(Dimension::is_scalar),
        Dim => return dims[0].is_matrix() || list_length(arena, children[0]).is_some(),
        Ref | Rref | Transpose => return dims[0].is_matrix(),
        Det | Trace | Inverse => return dims[0].is_square_matrix(),
        Identity => {
            return dims[0].is_scalar()
                && matches!(integer_exponent(arena, children[0]), Some(n) if n > 0);
        }
        Norm => return dims[0].is_vector(),
        Dot => return dims[0].is_vector() && dims[0] == dims[1],
        Cross => {
            return dims[0].is_vector()
                && dims[0] == dims[1]
                && matches!(dims[0], Dimension::Matrix { rows, cols } if rows == 3 || cols == 3);
        }
        Round => return (dims[0].is_scalar() || dims[0].is_unit()) && dims[1].is_scalar(),
        Piecewise => {
            return !dims.is_empty()
                && dims.iter().enumerate().all(|(i, dim)| {
                    if i % 2 == 1 {
                        dim.is_boolean()
                    } else {
                        *dim == dims[0]
                    }
                });
        }
        UnitConversion => {
            let target = children[1];
            if !is_combination_of_units(arena, target) {
                return false;
            }
            if dims[1].is_simple_angle_unit() && dims[0].is_scalar() {
                return true;
            }
            return dims[0].unit_vector() == Some(si_vector(arena, target));
        }
        Dependency | DependencyList | Parenthesis => return true,
        List => {
            return dims.iter().all(|dim| {
                (dim.is_scalar() || dim.is_point() || dim.is_boolean()) && *dim == dims[0]
            });
        }
        ListElement => return dims[1].is_scalar(),
        ListSlice => return dims[1].is_scalar() && dims[2].is_scalar(),
        RandIntNoRep => return dims.iter().all(Dimension::is_scalar),
        Gcd | Lcm if children.len() < 2 => return false,
        Matrix => {
            let size = arena.node(index).matrix_size();
            if !matches!(size, Some((rows, cols)) if rows > 0 && cols > 0) {
                return false;
            }
        }
        Abs | Floor | Ceil | Sign | UserFunction => units_allowed = true,
        _ if is_trigonometric(kind) => angle_units_allowed = true,
        UserSymbol | Variable | Parameter => return true,
        _ if kind.is_logical_operator() || kind.is_boolean_literal() => return true,
        _ => {}
    }
    if has_non_kelvin_child || (has_unit_child && !(units_allowed || angle_units_allowed)) {
        return false;
    }
    dims.iter().all(|dim| {
        dim.is_scalar()
            || dim.is_point()
            || (dim.is_boolean() && kind.is_comparison())
            || (dim.is_unit()
                && (units_allowed || (angle_units_allowed && dim.is_simple_angle_unit())))
    })
}

fn check_list_lengths(arena: &TreeArena, index: usize) -> bool {
    use NodeKind::*;
    let kind = arena.kind(index);
    let children = arena.child_positions(index);
    let mut lengths: SmallVec<[Option<usize>; 4]> = SmallVec::with_capacity(children.len());
    for &child in &children {
        if !check_list_lengths(arena, child) {
            return false;
        }
        lengths.push(list_length(arena, child));
    }
    match kind {
        SampleStdDev => matches!(lengths[0], Some(n) if n >= 2),
        Mean | StdDev | Median | Variance | Min | Max => matches!(lengths[0], Some(n) if n >= 1),
        ListSum | ListProduct | ListSort => lengths[0].is_some(),
        ListElement => lengths[0].is_some() && lengths[1].is_none(),
        ListSlice => lengths[0].is_some() && lengths[1].is_none() && lengths[2].is_none(),
        // Lists of lists are forbidden.
        List => lengths.iter().all(Option::is_none),
        // Bounds must be plain values; the body may be a list.
        Sum | Product | Integral => lengths[0].is_none() && lengths[1].is_none(),
        _ => {
            let mut common: Option<usize> = None;
            for length in lengths.iter().flatten() {
                match common {
                    Some(existing) if existing != *length => return false,
                    _ => common = Some(*length),
                }
            }
            if common.is_some() {
                if matches!(kind, ListSequence | RandIntNoRep | Point | Matrix) {
                    return false;
                }
                let dim = get_dimension(arena, index);
                if dim.is_matrix() || dim.is_unit() {
                    return false;
                }
            }
            true
        }
    }
}
