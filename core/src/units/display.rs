//! Choosing the units a result is displayed in.
//!
//! The value reaching this module is already in SI. A strategy
//! ([`UnitDisplay`]) turns it into one or more `value · units` terms; more
//! than one term means a decomposition such as `1 h + 30 min`.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use super::{
    AngleUnit, Family, SIVector, UnitFactor, UnitFormat, UnitProduct, base_units,
    choose_best_derived_units, choose_best_representative_and_prefix,
    choose_best_units_for_value, id, is_non_kelvin_temperature, kelvin_to_temperature,
    product_value, rational_exponent, representative,
};
use crate::tree::{NodeKind, TreeArena};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnitDisplay {
    /// Keep a single input unit and optimize its prefix; otherwise automatic.
    #[default]
    MainOutput,
    AutomaticMetric,
    AutomaticImperial,
    /// Convert to the units the user typed.
    AutomaticInput,
    /// L ⇄ m³, ha ⇄ m², gal ⇄ ft³, acre ⇄ ft².
    Equivalent,
    /// Split across several units, e.g. `1 h + 30 min`.
    Decomposition,
    BasicSI,
    /// Units are not allowed; the result is undefined.
    Forbidden,
}

/// One `value · units` term of a displayed result.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayTerm {
    pub value: f64,
    pub units: UnitProduct,
}

pub type DisplayTerms = SmallVec<[DisplayTerm; 2]>;

fn single(value: f64, units: UnitProduct) -> DisplayTerms {
    smallvec::smallvec![DisplayTerm { value, units }]
}

/// The units a user typed, as the alternatives of a sum: `_m + _yd` gives
/// `[[m], [yd]]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedUnits {
    pub alternatives: SmallVec<[UnitProduct; 2]>,
}

const MAX_ALTERNATIVES: usize = 8;

impl ExtractedUnits {
    /// Gather the unit structure of a value tree, ignoring everything that
    /// is not a unit.
    pub fn from_tree(arena: &TreeArena, index: usize) -> ExtractedUnits {
        ExtractedUnits {
            alternatives: extract(arena, index),
        }
    }

    pub fn from_product(product: UnitProduct) -> ExtractedUnits {
        ExtractedUnits {
            alternatives: smallvec::smallvec![product],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.alternatives.iter().all(|alt| alt.is_empty())
    }

    fn factors(&self) -> impl Iterator<Item = &UnitFactor> {
        self.alternatives.iter().flat_map(|alt| alt.iter())
    }

    /// First alternative: `_m + _km` keeps `_m`.
    fn first(&self) -> UnitProduct {
        self.alternatives.first().cloned().unwrap_or_default()
    }

    /// Imperial output is used when some imperial unit was typed and no
    /// metric one other than the liter.
    fn prefers_imperial(&self) -> bool {
        let mut imperial = false;
        for factor in self.factors() {
            if representative(factor.representative).imperial {
                imperial = true;
            } else if factor.representative != id::LITER {
                return false;
            }
        }
        imperial
    }
}

fn extract(arena: &TreeArena, index: usize) -> SmallVec<[UnitProduct; 2]> {
    let node = arena.node(index);
    match node.kind {
        NodeKind::Unit => {
            let Some((rep, prefix_id)) = node.unit_ids() else {
                return SmallVec::new();
            };
            smallvec::smallvec![smallvec::smallvec![UnitFactor::new(rep, prefix_id, 1)]]
        }
        NodeKind::Add | NodeKind::Sub => {
            let mut alternatives = SmallVec::new();
            for child in arena.children(index) {
                for alternative in extract(arena, child) {
                    if alternatives.len() < MAX_ALTERNATIVES {
                        alternatives.push(alternative);
                    }
                }
            }
            alternatives
        }
        NodeKind::Mult | NodeKind::Div => {
            let mut acc: SmallVec<[UnitProduct; 2]> = SmallVec::new();
            for (i, child) in arena.children(index).enumerate() {
                let invert = i == 1 && node.kind == NodeKind::Div;
                let child_alternatives = extract(arena, child);
                if child_alternatives.is_empty() {
                    continue;
                }
                acc = combine(acc, child_alternatives, invert);
            }
            acc
        }
        NodeKind::Pow | NodeKind::PowReal => {
            let exponent = match rational_exponent(arena, arena.child(index, 1)) {
                Some((p, 1)) => i8::try_from(p).ok(),
                _ => None,
            };
            let Some(exponent) = exponent else {
                return SmallVec::new();
            };
            extract(arena, arena.child(index, 0))
                .into_iter()
                .map(|alt| {
                    alt.into_iter()
                        .map(|f| UnitFactor {
                            exponent: f.exponent.saturating_mul(exponent),
                            ..f
                        })
                        .collect()
                })
                .collect()
        }
        NodeKind::Sum | NodeKind::Product => extract(arena, arena.child(index, 2)),
        NodeKind::Abs
        | NodeKind::Opposite
        | NodeKind::Parenthesis
        | NodeKind::Floor
        | NodeKind::Ceil
        | NodeKind::Round
        | NodeKind::Sign
        | NodeKind::UnitConversion
        | NodeKind::Dependency
        | NodeKind::Piecewise
        | NodeKind::Decimal
        | NodeKind::MixedFraction => extract(arena, index + 1),
        _ => SmallVec::new(),
    }
}

fn combine(
    acc: SmallVec<[UnitProduct; 2]>,
    next: SmallVec<[UnitProduct; 2]>,
    invert: bool,
) -> SmallVec<[UnitProduct; 2]> {
    let next = next.into_iter().map(|alt| {
        if invert {
            alt.into_iter()
                .map(|f| UnitFactor {
                    exponent: -f.exponent,
                    ..f
                })
                .collect()
        } else {
            alt
        }
    });
    if acc.is_empty() {
        return next.collect();
    }
    let mut combined = SmallVec::new();
    for right in next {
        for left in &acc {
            if combined.len() >= MAX_ALTERNATIVES {
                return combined;
            }
            let mut product: UnitProduct = left.clone();
            product.extend(right.iter().copied());
            combined.push(product);
        }
    }
    combined
}

/// Everything a strategy needs to know about the result.
#[derive(Debug, Clone)]
pub struct DisplayRequest<'a> {
    /// The value, in SI units (Kelvin for temperatures).
    pub si_value: f64,
    pub vector: SIVector,
    /// Representative of the result's dimension, for temperatures.
    pub representative: Option<u8>,
    pub extracted: &'a ExtractedUnits,
    pub angle_unit: AngleUnit,
}

/// Apply a display strategy. `None` means the result is undefined.
pub fn display(request: &DisplayRequest<'_>, strategy: UnitDisplay) -> Option<DisplayTerms> {
    debug!(?strategy, vector = %request.vector, "choosing display units");
    let terms = match strategy {
        UnitDisplay::Forbidden => return None,
        UnitDisplay::MainOutput => main_output(request),
        UnitDisplay::AutomaticMetric => automatic(request, UnitFormat::Metric),
        UnitDisplay::AutomaticImperial => automatic(request, UnitFormat::Imperial),
        UnitDisplay::AutomaticInput => {
            automatic_input(request.si_value, &request.extracted.first())
        }
        UnitDisplay::Equivalent => equivalent(request)
            .or_else(|| decomposition(request))
            .unwrap_or_else(|| basic_si(request)),
        UnitDisplay::Decomposition => decomposition(request).unwrap_or_else(|| basic_si(request)),
        UnitDisplay::BasicSI => basic_si(request),
    };
    Some(terms)
}

fn is_angle_vector(vector: &SIVector) -> bool {
    vector[SIVector::ANGLE] != 0 && vector.support_size() == 1
}

fn basic_si(request: &DisplayRequest<'_>) -> DisplayTerms {
    single(request.si_value, base_units(&request.vector))
}

fn automatic(request: &DisplayRequest<'_>, format: UnitFormat) -> DisplayTerms {
    if is_angle_vector(&request.vector) {
        return basic_si(request);
    }
    let mut vector = request.vector;
    let mut units = choose_best_derived_units(&mut vector);
    units.extend(base_units(&vector));
    let mut value = request.si_value;
    choose_best_units_for_value(&mut units, &mut value, format);
    single(value, units)
}

fn automatic_input(si_value: f64, target: &[UnitFactor]) -> DisplayTerms {
    if let [factor] = target {
        if factor.exponent == 1 && is_non_kelvin_temperature(factor.representative) {
            let value = kelvin_to_temperature(si_value, factor.representative);
            return single(value, target.iter().copied().collect());
        }
    }
    single(si_value / product_value(target), target.iter().copied().collect())
}

fn main_output(request: &DisplayRequest<'_>) -> DisplayTerms {
    if is_angle_vector(&request.vector) {
        let target = UnitFactor::base(
            request.angle_unit.representative(),
            request.vector[SIVector::ANGLE],
        );
        return automatic_input(request.si_value, &[target]);
    }
    let factors: SmallVec<[UnitFactor; 4]> = request.extracted.factors().copied().collect();
    let speed = Family::Speed.si_vector();
    let keep = match factors.as_slice() {
        [unit] => Some((*unit, None)),
        [a, b] if request.vector == speed => {
            if b.family() == Family::Distance {
                Some((*b, Some(*a)))
            } else {
                Some((*a, Some(*b)))
            }
        }
        _ => None,
    };
    let Some((mut optimized, other)) = keep else {
        let format = if request.extracted.prefers_imperial() {
            UnitFormat::Imperial
        } else {
            UnitFormat::Metric
        };
        return automatic(request, format);
    };
    if other.is_none() && is_non_kelvin_temperature(optimized.representative) {
        let value = kelvin_to_temperature(request.si_value, optimized.representative);
        return single(value, smallvec::smallvec![optimized]);
    }
    let units_value = optimized.value() * other.map_or(1.0, |f| f.value());
    let mut value = request.si_value / units_value;
    choose_best_representative_and_prefix(
        &mut optimized,
        &mut value,
        UnitFormat::Metric,
        true,
        false,
    );
    let mut units: UnitProduct = smallvec::smallvec![optimized];
    units.extend(other);
    single(value, units)
}

fn equivalent(request: &DisplayRequest<'_>) -> Option<DisplayTerms> {
    let vector = request.vector;
    let distance = vector[SIVector::DISTANCE];
    if vector.support_size() != 1 || !(2..=3).contains(&distance) {
        return None;
    }
    let volume = distance == 3;
    let has_distance_unit = request
        .extracted
        .factors()
        .any(|f| f.family() == Family::Distance);
    let imperial = request.extracted.prefers_imperial();
    let mut target = match (has_distance_unit, volume, imperial) {
        (true, true, true) => UnitFactor::base(id::GALLON, 1),
        (true, true, false) => UnitFactor::base(id::LITER, 1),
        (true, false, true) => UnitFactor::base(id::ACRE, 1),
        (true, false, false) => UnitFactor::base(id::HECTARE, 1),
        (false, _, true) => UnitFactor::base(id::FOOT, distance),
        (false, _, false) => UnitFactor::base(id::METER, distance),
    };
    let mut value = request.si_value / target.value();
    choose_best_representative_and_prefix(&mut target, &mut value, UnitFormat::Metric, true, false);
    Some(single(value, smallvec::smallvec![target]))
}

const TIME_DECOMPOSITION: &[u8] = &[id::YEAR, id::MONTH, id::DAY, id::HOUR, id::MINUTE, id::SECOND];
const ANGLE_DECOMPOSITION: &[u8] = &[id::DEGREE, id::ARC_MINUTE, id::ARC_SECOND];
const MASS_DECOMPOSITION: &[u8] = &[id::SHORT_TON, id::POUND, id::OUNCE];
const DISTANCE_DECOMPOSITION: &[u8] = &[id::MILE, id::YARD, id::FOOT, id::INCH];
const VOLUME_DECOMPOSITION: &[u8] = &[id::GALLON, id::QUART, id::PINT, id::CUP];

/// Significant digits a displayed float can hold.
const MAX_SIGNIFICANT_DIGITS: i32 = 14;

/// Round to the displayable precision: `10.0000000000001` becomes `10`.
fn round_to_max_precision(value: f64) -> f64 {
    if value == 0.0 {
        return value;
    }
    let magnitude = libm::floor(libm::log10(value.abs())) as i32 + 1;
    let scale = libm::pow(10.0, (MAX_SIGNIFICANT_DIGITS - magnitude) as f64);
    libm::round(value * scale) / scale
}

fn decomposition(request: &DisplayRequest<'_>) -> Option<DisplayTerms> {
    let vector = request.vector;
    let list = if vector == Family::Time.si_vector() {
        TIME_DECOMPOSITION
    } else if vector == Family::Angle.si_vector() {
        ANGLE_DECOMPOSITION
    } else if request.extracted.prefers_imperial() {
        match Family::for_vector(&vector)? {
            Family::Mass => MASS_DECOMPOSITION,
            Family::Distance => DISTANCE_DECOMPOSITION,
            Family::Volume => VOLUME_DECOMPOSITION,
            _ => return None,
        }
    } else {
        return None;
    };
    let value = request.si_value;
    let second_smallest = representative(list[list.len() - 2]).ratio();
    if !value.is_finite() || value.abs() <= second_smallest {
        return None;
    }
    Some(build_decomposition(value, list))
}

/// Split an SI value over `list`, ordered from biggest to smallest unit.
fn build_decomposition(value: f64, list: &[u8]) -> DisplayTerms {
    let epsilon = <f64 as crate::precision::Precision>::EPSILON_LAX;
    let smallest_ratio = representative(list[list.len() - 1]).ratio();
    let mut remaining = round_to_max_precision(value / smallest_ratio);
    let mut terms = DisplayTerms::new();
    for (i, &rep) in list.iter().enumerate() {
        let last = i == list.len() - 1;
        let ratio = libm::round(representative(rep).ratio() / smallest_ratio);
        let lax = epsilon / ratio;
        let mut amount = remaining / ratio;
        if !last {
            amount = if amount > 0.0 {
                libm::floor(amount + lax)
            } else {
                libm::ceil(amount - lax)
            };
        }
        if amount.abs() > lax {
            terms.push(DisplayTerm {
                value: amount,
                units: smallvec::smallvec![UnitFactor::base(rep, 1)],
            });
        }
        remaining = round_to_max_precision(remaining - ratio * amount);
    }
    terms
}
