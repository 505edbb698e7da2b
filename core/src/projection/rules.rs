//! The shallow projection rules.
//!
//! Each rule looks at one node and its immediate shape, and replaces the
//! node with a template built from copies of its children. Templates are
//! plain data ([`Build`]), so most rules are a single table entry.

use tracing::trace;

use super::ProjectionContext;
use crate::dimension::get_dimension;
use crate::tree::{ArenaError, Node, NodeKind, TreeArena};
use crate::units::{self, AngleUnit, RatioExpr};

use Build::*;
use NodeKind::*;

/// Template of a replacement tree.
#[derive(Debug, Clone, Copy)]
enum Build<'b> {
    /// Copy of child `n` of the node being replaced.
    Child(usize),
    Int(i64),
    Leaf(NodeKind),
    Ratio(&'static RatioExpr),
    Op(NodeKind, &'b [Build<'b>]),
}

const SQRT: Build = Op(Pow, &[Child(0), Leaf(Half)]);
const ROOT: Build = Op(Pow, &[Child(0), Op(Pow, &[Child(1), Int(-1)])]);
const SUB: Build = Op(Add, &[Child(0), Op(Mult, &[Int(-1), Child(1)])]);
const DIV: Build = Op(Mult, &[Child(0), Op(Pow, &[Child(1), Int(-1)])]);
const OPPOSITE: Build = Op(Mult, &[Int(-1), Child(0)]);
const HUNDREDTH: Build = Op(Pow, &[Int(100), Int(-1)]);
const PERCENT: Build = Op(Mult, &[Child(0), HUNDREDTH]);
const PERCENT_ADDITION: Build = Op(
    Mult,
    &[Child(0), Op(Add, &[Int(1), Op(Mult, &[Child(1), HUNDREDTH])])],
);
const MIXED_FRACTION: Build = Op(Add, &[Child(0), Child(1)]);
const EULER_E: Build = Op(Exp, &[Int(1)]);
const EXP_OF_EXPONENT: Build = Op(Exp, &[Child(1)]);
const LN: Build = Op(Ln, &[Child(0)]);
const LOG: Build = Op(Mult, &[LN, Op(Pow, &[Op(Ln, &[Int(10)]), Int(-1)])]);
const LOG_BASE: Build = Op(Mult, &[LN, Op(Pow, &[Op(Ln, &[Child(1)]), Int(-1)])]);
const SEC: Build = Op(Pow, &[Op(Cos, &[Child(0)]), Int(-1)]);
const CSC: Build = Op(Pow, &[Op(Sin, &[Child(0)]), Int(-1)]);
const COT: Build = Op(Mult, &[Op(Cos, &[Child(0)]), CSC]);
const INVERSE: Build = Op(Pow, &[Child(0), Int(-1)]);
const ASEC: Build = Op(ACos, &[INVERSE]);
const ACSC: Build = Op(ASin, &[INVERSE]);
const ACOT: Build = Op(
    Add,
    &[Op(ACos, &[Int(0)]), Op(Mult, &[Int(-1), Op(ATan, &[Child(0)])])],
);
const EXP: Build = Op(Exp, &[Child(0)]);
const EXP_OPPOSITE: Build = Op(Exp, &[OPPOSITE]);
const COSH: Build = Op(Mult, &[Leaf(Half), Op(Add, &[EXP, EXP_OPPOSITE])]);
const SINH: Build = Op(
    Mult,
    &[Leaf(Half), Op(Add, &[EXP, Op(Mult, &[Int(-1), EXP_OPPOSITE])])],
);
const EXP_DOUBLE: Build = Op(Exp, &[Op(Mult, &[Int(2), Child(0)])]);
const TANH: Build = Op(
    Mult,
    &[
        Op(Add, &[EXP_DOUBLE, Int(-1)]),
        Op(Pow, &[Op(Add, &[EXP_DOUBLE, Int(1)]), Int(-1)]),
    ],
);
const ARCOSH: Build = Op(
    Ln,
    &[Op(
        Add,
        &[
            Child(0),
            Op(
                Mult,
                &[
                    Op(Sqrt, &[Op(Add, &[Child(0), Int(-1)])]),
                    Op(Sqrt, &[Op(Add, &[Child(0), Int(1)])]),
                ],
            ),
        ],
    )],
);
const ARSINH: Build = Op(
    Ln,
    &[Op(
        Add,
        &[
            Child(0),
            Op(Sqrt, &[Op(Add, &[Op(Pow, &[Child(0), Int(2)]), Int(1)])]),
        ],
    )],
);
const ARTANH: Build = Op(
    Mult,
    &[
        Leaf(Half),
        Op(
            Add,
            &[
                Op(Ln, &[Op(Add, &[Int(1), Child(0)])]),
                Op(Mult, &[Int(-1), Op(Ln, &[Op(Add, &[Int(1), OPPOSITE])])]),
            ],
        ),
    ],
);
const CEIL: Build = Op(Mult, &[Int(-1), Op(Floor, &[OPPOSITE])]);
const FRAC: Build = Op(Add, &[Child(0), Op(Mult, &[Int(-1), Op(Floor, &[Child(0)])])]);
const CONJ: Build = Op(
    Add,
    &[
        Op(Re, &[Child(0)]),
        Op(Mult, &[Int(-1), Leaf(ImaginaryUnit), Op(Im, &[Child(0)])]),
    ],
);
const NOR: Build = Op(LogicalNot, &[Op(LogicalOr, &[Child(0), Child(1)])]);
const NAND: Build = Op(LogicalNot, &[Op(LogicalAnd, &[Child(0), Child(1)])]);

fn push_build(
    arena: &mut TreeArena,
    children: &[usize],
    build: &Build<'_>,
) -> Result<usize, ArenaError> {
    match build {
        Child(n) => arena.clone_tree(children[*n]),
        Int(value) => arena.push_integer(*value),
        Leaf(kind) => arena.push_kind(*kind),
        Ratio(ratio) => ratio.push(arena),
        Op(kind, items) => {
            let top = if kind.is_nary() {
                arena.push_nary(*kind, items.len())?
            } else {
                arena.push_kind(*kind)?
            };
            for item in items.iter() {
                push_build(arena, children, item)?;
            }
            Ok(top)
        }
    }
}

/// Replace the tree at `index` with `build`. Children are copied from
/// below the top, so their positions stay valid while building.
fn rewrite(arena: &mut TreeArena, index: usize, build: &Build<'_>) -> Result<usize, ArenaError> {
    let children = arena.child_positions(index);
    let top = push_build(arena, &children, build)?;
    arena.move_tree_over_tree(index, top)
}

/// Apply the first matching rule at `index`. Returns whether one fired.
pub fn shallow_system_project(
    arena: &mut TreeArena,
    index: usize,
    context: &ProjectionContext,
) -> Result<bool, ArenaError> {
    let kind = arena.kind(index);
    if context.policy.forbids(kind) {
        trace!(?kind, index, "forbidden by policy");
        arena.replace_with_node(index, Node::leaf(Forbidden))?;
        return Ok(true);
    }
    let build = match kind {
        Parenthesis => {
            arena.move_tree_over_tree(index, index + 1)?;
            return fired(kind, index);
        }
        Unit => {
            units::project_unit(arena, index)?;
            return fired(kind, index);
        }
        Decimal => return project_decimal(arena, index),
        Pow => return project_power(arena, index, context),
        Ln if context.is_real_mode() => {
            arena.set_node(index, Node::new(LnReal));
            return fired(kind, index);
        }
        LogBase if arena.kind(arena.child(index, 1)) == EulerE => &LN,
        Cos | Sin | Tan => return project_direct_trig(arena, index, context),
        ACos | ASin | ATan => return project_inverse_trig(arena, index, context),
        Percent => &PERCENT,
        PercentAddition => &PERCENT_ADDITION,
        MixedFraction => &MIXED_FRACTION,
        Sqrt => &SQRT,
        Root => &ROOT,
        Log => &LOG,
        LogBase => &LOG_BASE,
        Sec => &SEC,
        Csc => &CSC,
        Cot => &COT,
        ASec => &ASEC,
        ACsc => &ACSC,
        ACot => &ACOT,
        ArCosH => &ARCOSH,
        ArSinH => &ARSINH,
        ArTanH => &ARTANH,
        CosH => &COSH,
        SinH => &SINH,
        TanH => &TANH,
        Ceil => &CEIL,
        Frac => &FRAC,
        EulerE => &EULER_E,
        Conj => &CONJ,
        Opposite => &OPPOSITE,
        Sub => &SUB,
        Div => &DIV,
        LogicalNor => &NOR,
        LogicalNand => &NAND,
        _ => return Ok(false),
    };
    rewrite(arena, index, build)?;
    fired(kind, index)
}

fn fired(kind: NodeKind, index: usize) -> Result<bool, ArenaError> {
    trace!(?kind, index, "projection rule fired");
    Ok(true)
}

/// `Decimal(e)[m]` is `m · 10^-e`.
fn project_decimal(arena: &mut TreeArena, index: usize) -> Result<bool, ArenaError> {
    let exponent = match arena.node(index).payload {
        crate::tree::Payload::Exponent(e) => e as i64,
        _ => 0,
    };
    let scale = [Int(10), Int(-exponent)];
    let factors = [Child(0), Op(Pow, &scale)];
    rewrite(arena, index, &Op(Mult, &factors))?;
    fired(Decimal, index)
}

fn project_power(
    arena: &mut TreeArena,
    index: usize,
    context: &ProjectionContext,
) -> Result<bool, ArenaError> {
    let base = index + 1;
    if arena.kind(base) == EulerE {
        rewrite(arena, index, &EXP_OF_EXPONENT)?;
    } else if get_dimension(arena, base).is_matrix() {
        arena.set_node(index, Node::new(PowMatrix));
    } else if context.is_real_mode() {
        arena.set_node(index, Node::new(PowReal));
    } else {
        return Ok(false);
    }
    fired(Pow, index)
}

/// `cos`, `sin` and `tan` of an angle in the configured unit. An argument
/// that carries its own angle unit is already in radians once the unit is
/// projected.
fn project_direct_trig(
    arena: &mut TreeArena,
    index: usize,
    context: &ProjectionContext,
) -> Result<bool, ArenaError> {
    let kind = arena.kind(index);
    let convert = context.angle_unit != AngleUnit::Radian
        && !get_dimension(arena, index + 1).is_simple_angle_unit();
    let scaled = [Child(0), Ratio(context.angle_unit.ratio())];
    let angle = if convert { Op(Mult, &scaled) } else { Child(0) };
    let trig = [angle, Int(if kind == Sin { 1 } else { 0 })];
    let tan = [angle];
    let build = match kind {
        Tan => Op(TanRad, &tan),
        _ => Op(Trig, &trig),
    };
    rewrite(arena, index, &build)?;
    fired(kind, index)
}

/// `acos`, `asin` and `atan`, converted back to the configured unit. In
/// real mode `acos` and `asin` depend on `|x| ≤ 1`.
fn project_inverse_trig(
    arena: &mut TreeArena,
    index: usize,
    context: &ProjectionContext,
) -> Result<bool, ArenaError> {
    let kind = arena.kind(index);
    let argument = [Child(0)];
    let atrig = [Child(0), Int(if kind == ASin { 1 } else { 0 })];
    let radians = match kind {
        ATan => Op(ATanRad, &argument),
        _ => Op(ATrig, &atrig),
    };
    let back = [Ratio(context.angle_unit.ratio()), Int(-1)];
    let converted = [radians, Op(Pow, &back)];
    let value = if context.angle_unit == AngleUnit::Radian {
        radians
    } else {
        Op(Mult, &converted)
    };
    let bound = [Op(Abs, &argument), Int(1)];
    let guards = [Op(LessOrEqual, &bound)];
    let dependency = [value, Op(DependencyList, &guards)];
    let build = if context.is_real_mode() && kind != ATan {
        Op(Dependency, &dependency)
    } else {
        value
    };
    rewrite(arena, index, &build)?;
    fired(kind, index)
}
