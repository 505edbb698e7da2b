//! Physical units and dimensional analysis.
//!
//! A unit node stores a (representative, prefix) id pair. Representatives
//! carry an exact ratio to SI; prefixes are fixed powers of ten. This module
//! converts unit trees to SI vectors, recognizes derived units, and picks
//! display representatives and prefixes for a value.

pub mod display;
mod prefix;
mod representative;
mod si_vector;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::trace;

pub use prefix::{EMPTY_PREFIX, KILO_PREFIX, PREFIXES, Prefix, Prefixable, prefix, prefix_exponent};
pub use representative::{Family, REPRESENTATIVES, RatioExpr, Representative, id, representative};
pub use si_vector::{BASE_DIMENSIONS, SIVector};

use crate::precision::Precision;
use crate::tree::{ArenaError, Node, NodeKind, TreeArena};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AngleUnit {
    Radian,
    #[default]
    Degree,
    Gradian,
}

impl AngleUnit {
    pub fn representative(self) -> u8 {
        match self {
            AngleUnit::Radian => id::RADIAN,
            AngleUnit::Degree => id::DEGREE,
            AngleUnit::Gradian => id::GRADIAN,
        }
    }

    /// Exact ratio of this unit to radians.
    pub fn ratio(self) -> &'static RatioExpr {
        &representative(self.representative()).ratio
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnitFormat {
    #[default]
    Metric,
    Imperial,
}

/// One factor of a product of units: `(prefix representative)^exponent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitFactor {
    pub representative: u8,
    pub prefix: u8,
    pub exponent: i8,
}

impl UnitFactor {
    pub fn new(representative: u8, prefix: u8, exponent: i8) -> UnitFactor {
        UnitFactor {
            representative,
            prefix,
            exponent,
        }
    }

    pub fn base(representative: u8, exponent: i8) -> UnitFactor {
        UnitFactor::new(representative, EMPTY_PREFIX, exponent)
    }

    pub fn family(&self) -> Family {
        representative(self.representative).family
    }

    /// SI value of one such factor.
    pub fn value(&self) -> f64 {
        libm::pow(unit_value(self.representative, self.prefix), self.exponent as f64)
    }
}

pub type UnitProduct = SmallVec<[UnitFactor; 4]>;

pub fn product_value(product: &[UnitFactor]) -> f64 {
    product.iter().map(UnitFactor::value).product()
}

pub fn product_vector(product: &[UnitFactor]) -> SIVector {
    product.iter().fold(SIVector::EMPTY, |acc, factor| {
        acc.checked_add_scaled(&factor.family().si_vector(), factor.exponent)
            .unwrap_or(acc)
    })
}

pub fn is_valid_unit(representative: u8, prefix: u8) -> bool {
    (representative as usize) < REPRESENTATIVES.len() && (prefix as usize) < PREFIXES.len()
}

/// SI value of `prefix representative`.
pub fn unit_value(representative_id: u8, prefix_id: u8) -> f64 {
    representative(representative_id).ratio() * libm::pow(10.0, prefix_exponent(prefix_id) as f64)
}

/// Name of a unit as written, e.g. `km`.
pub fn unit_symbol(representative_id: u8, prefix_id: u8) -> (&'static str, &'static str) {
    (prefix(prefix_id).symbol, representative(representative_id).symbol())
}

/// Resolve a unit name such as `km` or `_km` to its ids.
///
/// The first representative (in table order) with a matching symbol and an
/// allowed input prefix wins.
pub fn parse_unit(name: &str) -> Option<(u8, u8)> {
    let name = name.strip_prefix('_').unwrap_or(name);
    if name.is_empty() {
        return None;
    }
    for (rep_id, rep) in REPRESENTATIVES.iter().enumerate() {
        for symbol in rep.symbols {
            let Some(prefix_part) = name.strip_suffix(symbol) else {
                continue;
            };
            if let Some(prefix_id) = parse_prefix(rep, prefix_part) {
                return Some((rep_id as u8, prefix_id));
            }
        }
    }
    None
}

fn parse_prefix(rep: &Representative, symbol: &str) -> Option<u8> {
    if rep.input_prefixable == Prefixable::None {
        return symbol.is_empty().then_some(EMPTY_PREFIX);
    }
    PREFIXES
        .iter()
        .position(|p| p.symbol == symbol && rep.input_prefixable.allows(p))
        .map(|position| position as u8)
}

// ============================================================================
// Temperature
// ============================================================================

pub fn is_non_kelvin_temperature(representative_id: u8) -> bool {
    representative_id == id::CELSIUS || representative_id == id::FAHRENHEIT
}

/// Additive origin of a temperature scale, in its own unit.
pub fn temperature_origin(representative_id: u8) -> f64 {
    match representative_id {
        id::CELSIUS => 273.15,
        id::FAHRENHEIT => 459.67,
        _ => 0.0,
    }
}

fn exact_temperature_origin(representative_id: u8) -> (i64, i64) {
    match representative_id {
        id::CELSIUS => (27315, 100),
        id::FAHRENHEIT => (45967, 100),
        _ => (0, 1),
    }
}

/// `K = (v + origin) · ratio`
pub fn temperature_to_kelvin(value: f64, representative_id: u8) -> f64 {
    (value + temperature_origin(representative_id)) * representative(representative_id).ratio()
}

/// `v = K / ratio − origin`
pub fn kelvin_to_temperature(kelvin: f64, representative_id: u8) -> f64 {
    kelvin / representative(representative_id).ratio() - temperature_origin(representative_id)
}

/// Rewrite the lone non-Kelvin temperature unit under `root` into a Kelvin
/// value: the unit becomes 1 and the whole tree `A` becomes
/// `(A + origin) · ratio`.
///
/// Returns the removed representative, if there was one.
pub fn remove_temperature_unit(
    arena: &mut TreeArena,
    root: usize,
) -> Result<Option<u8>, ArenaError> {
    let end = arena.next_tree(root);
    let Some((position, rep)) = (root..end).find_map(|i| match arena.node(i).unit_ids() {
        Some((rep, _)) if is_non_kelvin_temperature(rep) => Some((i, rep)),
        _ => None,
    }) else {
        return Ok(None);
    };
    arena.set_node(position, Node::integer(1));
    let mult = arena.push_nary(NodeKind::Mult, 2)?;
    arena.push_nary(NodeKind::Add, 2)?;
    arena.clone_tree(root)?;
    let (p, q) = exact_temperature_origin(rep);
    arena.push_rational(p, q)?;
    representative(rep).ratio.push(arena)?;
    arena.move_tree_over_tree(root, mult)?;
    Ok(Some(rep))
}

// ============================================================================
// Unit trees
// ============================================================================

/// Replace a unit node by its exact SI value `ratio · 10^prefix`.
pub fn project_unit(arena: &mut TreeArena, index: usize) -> Result<usize, ArenaError> {
    let Some((rep, prefix_id)) = arena.node(index).unit_ids() else {
        return Ok(index);
    };
    let mult = arena.push_nary(NodeKind::Mult, 2)?;
    representative(rep).ratio.push(arena)?;
    arena.push_kind(NodeKind::Pow)?;
    arena.push_integer(10)?;
    arena.push_integer(prefix_exponent(prefix_id) as i64)?;
    arena.move_tree_over_tree(index, mult)
}

pub fn has_unit(arena: &TreeArena, index: usize) -> bool {
    arena.any_descendant(index, |node| node.kind == NodeKind::Unit)
}

pub fn is_pure_angle_unit(arena: &TreeArena, index: usize) -> bool {
    matches!(
        arena.node(index).unit_ids(),
        Some((rep, _)) if representative(rep).family == Family::Angle
    )
}

/// A product or quotient of (powers of) units, with nothing else.
pub fn is_combination_of_units(arena: &TreeArena, index: usize) -> bool {
    match arena.kind(index) {
        NodeKind::Unit => true,
        NodeKind::Mult | NodeKind::Div => arena
            .children(index)
            .all(|child| is_combination_of_units(arena, child)),
        NodeKind::Pow => is_combination_of_units(arena, arena.child(index, 0)),
        NodeKind::Parenthesis => is_combination_of_units(arena, arena.child(index, 0)),
        _ => false,
    }
}

/// Exact rational value of a small exponent tree: a rational literal, the
/// opposite of one, or a quotient of two integer literals.
pub fn rational_exponent(arena: &TreeArena, index: usize) -> Option<(i64, i64)> {
    let node = arena.node(index);
    if let Some(value) = node.as_rational() {
        return Some(value);
    }
    match node.kind {
        NodeKind::Parenthesis => rational_exponent(arena, index + 1),
        NodeKind::Opposite => {
            let (p, q) = rational_exponent(arena, index + 1)?;
            Some((p.checked_neg()?, q))
        }
        NodeKind::Div => {
            let (a, b) = (arena.child(index, 0), arena.child(index, 1));
            let (p, q) = (arena.node(a).as_integer()?, arena.node(b).as_integer()?);
            crate::tree::normalize_rational(p, q)
        }
        NodeKind::Mult if arena.child_count(index) == 2 => {
            let (a, b) = (arena.child(index, 0), arena.child(index, 1));
            match (arena.node(a).as_integer(), rational_exponent(arena, b)) {
                (Some(-1), Some((p, q))) => Some((p.checked_neg()?, q)),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Collect a combination of units into factors. `None` if the tree holds
/// anything other than units, or an exponent that is not an integer.
pub fn unit_factors(arena: &TreeArena, index: usize) -> Option<UnitProduct> {
    let mut product = UnitProduct::new();
    collect_factors(arena, index, 1, &mut product)?;
    Some(product)
}

fn collect_factors(
    arena: &TreeArena,
    index: usize,
    exponent: i8,
    product: &mut UnitProduct,
) -> Option<()> {
    match arena.kind(index) {
        NodeKind::Unit => {
            let (rep, prefix_id) = arena.node(index).unit_ids()?;
            product.push(UnitFactor::new(rep, prefix_id, exponent));
        }
        NodeKind::Mult => {
            for child in arena.children(index) {
                collect_factors(arena, child, exponent, product)?;
            }
        }
        NodeKind::Div => {
            collect_factors(arena, arena.child(index, 0), exponent, product)?;
            collect_factors(arena, arena.child(index, 1), exponent.checked_neg()?, product)?;
        }
        NodeKind::Parenthesis => collect_factors(arena, index + 1, exponent, product)?,
        NodeKind::Pow | NodeKind::PowReal => {
            let (p, q) = rational_exponent(arena, arena.child(index, 1))?;
            if q != 1 {
                return None;
            }
            let scaled = i8::try_from(p).ok()?.checked_mul(exponent)?;
            collect_factors(arena, arena.child(index, 0), scaled, product)?;
        }
        _ => return None,
    }
    Some(())
}

/// SI vector of a product of (powers of) units.
///
/// A non-integer exponent anywhere collapses the result to the empty
/// vector; an exponent of magnitude `127/3` or more contributes nothing.
pub fn si_vector(arena: &TreeArena, index: usize) -> SIVector {
    let factors: SmallVec<[usize; 4]> = if arena.kind(index) == NodeKind::Mult {
        arena.children(index).collect()
    } else {
        smallvec::smallvec![index]
    };
    let mut vector = SIVector::EMPTY;
    for mut factor in factors {
        let mut exponent = 1i8;
        if matches!(arena.kind(factor), NodeKind::Pow | NodeKind::PowReal) {
            let Some((p, q)) = rational_exponent(arena, arena.child(factor, 1)) else {
                return SIVector::EMPTY;
            };
            if q != 1 {
                return SIVector::EMPTY;
            }
            exponent = if p.unsigned_abs() < (i8::MAX / 3) as u64 {
                p as i8
            } else {
                0
            };
            factor = arena.child(factor, 0);
        }
        let Some((rep, _)) = arena.node(factor).unit_ids() else {
            continue;
        };
        if let Some(sum) = vector.checked_add_scaled(&representative(rep).si_vector(), exponent) {
            vector = sum;
        }
    }
    vector
}

/// Base SI units matching `vector`, in base-dimension order.
pub fn base_units(vector: &SIVector) -> UnitProduct {
    Family::ALL[..BASE_DIMENSIONS]
        .iter()
        .zip(vector.exponents())
        .filter(|(_, exponent)| *exponent != 0)
        .filter_map(|(family, exponent)| {
            family
                .base_representative()
                .map(|rep| UnitFactor::base(rep, exponent))
        })
        .collect()
}

/// Push a product of unit factors as a tree: a lone unit, a power, or a
/// `Mult` of those. An empty product is pushed as `1`.
pub fn push_product(arena: &mut TreeArena, product: &[UnitFactor]) -> Result<usize, ArenaError> {
    let top = match product.len() {
        0 => return arena.push_integer(1),
        1 => arena.len(),
        n => arena.push_nary(NodeKind::Mult, n)?,
    };
    for factor in product {
        if factor.exponent != 1 {
            arena.push_kind(NodeKind::Pow)?;
        }
        arena.push(Node::unit(factor.representative, factor.prefix))?;
        if factor.exponent != 1 {
            arena.push_integer(factor.exponent as i64)?;
        }
    }
    Ok(top)
}

// ============================================================================
// Derived units
// ============================================================================

/// Greedily factor derived units out of `vector`.
///
/// Each pass scans the derived families in table order, trying each one
/// and its reciprocal, and keeps the last candidate that lowered the
/// support size (a candidate must beat the running best). The chosen unit
/// is removed from `vector` and the scan repeats until nothing improves.
/// The outcome depends on table order and is not globally optimal.
pub fn choose_best_derived_units(vector: &mut SIVector) -> UnitProduct {
    let mut derived = UnitProduct::new();
    let mut support = vector.support_size();
    while support > 1 {
        let mut best: Option<(Family, i8, SIVector)> = None;
        for &family in Family::derived() {
            let entry = family.si_vector();
            for exponent in [1i8, -1] {
                let Some(remainder) = vector.checked_add_scaled(&entry, -exponent) else {
                    continue;
                };
                let remainder_support = remainder.support_size();
                if 1 + remainder_support < support {
                    support = 1 + remainder_support;
                    best = Some((family, exponent, remainder));
                    break;
                }
            }
        }
        let Some((family, exponent, remainder)) = best else {
            break;
        };
        let Some(rep) = family.base_representative() else {
            break;
        };
        trace!(?family, exponent, "derived unit chosen");
        derived.push(UnitFactor::base(rep, exponent));
        *vector = remainder;
        support = remainder.support_size();
    }
    derived
}

// ============================================================================
// Best representative and prefix
// ============================================================================

fn lax_to_zero(value: f64) -> f64 {
    if value.abs() <= <f32 as Precision>::EPSILON_LAX as f64 {
        0.0
    } else {
        value
    }
}

/// Whether magnitude order `order` reads better than `other`.
///
/// Orders within three decades of opposite signs prefer the positive one;
/// otherwise the one closer to zero wins.
fn better_order(order: f64, other: f64) -> bool {
    let order = lax_to_zero(order);
    let other = lax_to_zero(other);
    let epsilon = <f32 as Precision>::EPSILON_LAX as f64;
    if (order.abs() - other.abs()).abs() <= 3.0 + epsilon && order * other < 0.0 {
        return order >= 0.0;
    }
    order.abs() < other.abs()
}

/// Output prefix for `representative` that best displays `value`.
pub fn find_best_prefix(representative_id: u8, value: f64, exponent: f64) -> u8 {
    let rep = representative(representative_id);
    if rep.output_prefixable == Prefixable::None
        || value < <f64 as Precision>::EPSILON_LAX
    {
        return EMPTY_PREFIX;
    }
    let magnitude = libm::log10(value.abs());
    let mut best_order = magnitude;
    let mut best = EMPTY_PREFIX;
    for (i, candidate) in PREFIXES.iter().enumerate() {
        if !rep.output_prefixable.allows(candidate) {
            continue;
        }
        let order = magnitude - candidate.exponent as f64 * exponent;
        if better_order(order, best_order) {
            best_order = order;
            best = i as u8;
        }
    }
    best
}

/// Among `candidates`, the representative (and prefix, if optimizing) whose
/// displayed value has the order of magnitude closest to zero.
fn find_best_representative(
    fallback: u8,
    value: f64,
    exponent: f64,
    candidates: core::ops::Range<u8>,
    optimize_prefix: bool,
) -> (u8, u8) {
    let mut best = (fallback, EMPTY_PREFIX);
    let mut best_order = f64::NEG_INFINITY;
    for candidate in candidates {
        let accuracy = (value / libm::pow(representative(candidate).ratio(), exponent)).abs();
        let prefix_id = if optimize_prefix {
            find_best_prefix(candidate, accuracy, exponent)
        } else {
            EMPTY_PREFIX
        };
        let order = libm::log10(accuracy) - prefix_exponent(prefix_id) as f64 * exponent;
        if better_order(order, best_order) {
            best_order = order;
            best = (candidate, prefix_id);
        }
    }
    best
}

/// Family-specific choice of display representative for an SI value.
fn standard_representative(
    current: u8,
    value: f64,
    exponent: f64,
    format: UnitFormat,
    optimize_prefix: bool,
) -> (u8, u8) {
    let family = representative(current).family;
    let metric = format == UnitFormat::Metric;
    let find = |range| find_best_representative(current, value, exponent, range, optimize_prefix);
    match family {
        Family::Distance if metric => find(id::METER..id::INCH),
        Family::Distance => find(id::INCH..id::MILE + 1),
        Family::Mass if !metric => find(id::OUNCE..id::LONG_TON),
        Family::Mass if exponent == 1.0 && value >= representative(id::TON).ratio() => {
            find(id::TON..id::TON + 1)
        }
        Family::Mass => find(id::KILOGRAM..id::TON),
        Family::Surface if metric => (id::HECTARE, EMPTY_PREFIX),
        Family::Surface => (id::ACRE, EMPTY_PREFIX),
        Family::Volume if metric => {
            let prefix_id = if optimize_prefix {
                find_best_prefix(id::LITER, value, exponent)
            } else {
                EMPTY_PREFIX
            };
            (id::LITER, prefix_id)
        }
        Family::Volume => find(id::CUP..id::FLUID_OUNCE + 1),
        Family::Temperature => (current, EMPTY_PREFIX),
        _ => find(family.members()),
    }
}

/// Pick the representative and prefix displaying `value · factor` best, and
/// rescale `value` so the product is unchanged.
///
/// With `optimize_representative` off only the prefix moves (grams and
/// kilograms count as one representative).
pub fn choose_best_representative_and_prefix(
    factor: &mut UnitFactor,
    value: &mut f64,
    format: UnitFormat,
    optimize_prefix: bool,
    optimize_representative: bool,
) {
    let exponent = factor.exponent as f64;
    if exponent == 0.0 {
        return;
    }
    let family = factor.family();
    if value.is_infinite() || (*value == 0.0 && family != Family::Temperature) {
        if let Some(base) = family.base_representative() {
            factor.representative = base;
        }
        factor.prefix = EMPTY_PREFIX;
        return;
    }
    let base_value = *value * libm::pow(unit_value(factor.representative, factor.prefix), exponent);
    let (best_rep, best_prefix) = if optimize_representative {
        standard_representative(
            factor.representative,
            base_value,
            exponent,
            format,
            optimize_prefix,
        )
    } else if family == Family::Mass
        && (factor.representative == id::GRAM || factor.representative == id::KILOGRAM)
    {
        find_best_representative(
            factor.representative,
            base_value,
            exponent,
            id::KILOGRAM..id::GRAM + 1,
            optimize_prefix,
        )
    } else {
        let rep = factor.representative;
        find_best_representative(rep, base_value, exponent, rep..rep + 1, optimize_prefix)
    };
    let best_prefix = if optimize_prefix { best_prefix } else { EMPTY_PREFIX };
    if best_rep != factor.representative {
        let ratio =
            representative(factor.representative).ratio() / representative(best_rep).ratio();
        *value *= libm::pow(ratio, exponent);
        factor.representative = best_rep;
    }
    if best_prefix != factor.prefix {
        let shift = prefix_exponent(factor.prefix) as f64 - prefix_exponent(best_prefix) as f64;
        *value *= libm::pow(10.0, exponent * shift);
        factor.prefix = best_prefix;
    }
}

/// Apply [`choose_best_representative_and_prefix`] to every factor; only
/// the first factor gets its prefix optimized.
pub fn choose_best_units_for_value(
    product: &mut [UnitFactor],
    value: &mut f64,
    format: UnitFormat,
) {
    let mut prefix_done = false;
    for factor in product.iter_mut() {
        if factor.exponent == 0 {
            continue;
        }
        choose_best_representative_and_prefix(factor, value, format, !prefix_done, true);
        prefix_done = true;
    }
}
