//! The table of unit representatives.
//!
//! Representatives are grouped by physical-dimension [`Family`]; a unit node
//! stores a representative id, which is the index into [`REPRESENTATIVES`].
//! Ids are sequential in family order, so a family's members are a
//! contiguous range.

use core::ops::Range;

use super::prefix::Prefixable;
use super::si_vector::SIVector;
use crate::tree::{ArenaError, Node, NodeKind, TreeArena};

/// Exact conversion ratio of a representative to SI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RatioExpr {
    Int(i64),
    /// `mantissa · 10^exponent`
    Decimal(i64, i16),
    Pi,
    Mul(&'static [RatioExpr]),
    Div(&'static RatioExpr, &'static RatioExpr),
}

impl RatioExpr {
    pub fn value(&self) -> f64 {
        match self {
            RatioExpr::Int(n) => *n as f64,
            RatioExpr::Decimal(mantissa, exponent) if *exponent < 0 => {
                *mantissa as f64 / libm::pow(10.0, -(*exponent as f64))
            }
            RatioExpr::Decimal(mantissa, exponent) => {
                *mantissa as f64 * libm::pow(10.0, *exponent as f64)
            }
            RatioExpr::Pi => core::f64::consts::PI,
            RatioExpr::Mul(factors) => factors.iter().map(RatioExpr::value).product(),
            RatioExpr::Div(a, b) => a.value() / b.value(),
        }
    }

    /// Push the ratio as an exact tree.
    pub fn push(&self, arena: &mut TreeArena) -> Result<usize, ArenaError> {
        match self {
            RatioExpr::Int(n) => arena.push_integer(*n),
            RatioExpr::Decimal(mantissa, exponent) => push_decimal(arena, *mantissa, *exponent),
            RatioExpr::Pi => arena.push_kind(NodeKind::Pi),
            RatioExpr::Mul(factors) => {
                let mult = arena.push_nary(NodeKind::Mult, factors.len())?;
                for factor in factors.iter() {
                    factor.push(arena)?;
                }
                Ok(mult)
            }
            RatioExpr::Div(a, b) => {
                let mult = arena.push_nary(NodeKind::Mult, 2)?;
                a.push(arena)?;
                arena.push_kind(NodeKind::Pow)?;
                b.push(arena)?;
                arena.push_integer(-1)?;
                Ok(mult)
            }
        }
    }
}

/// `mantissa · 10^exponent`, as a rational when it fits.
fn push_decimal(arena: &mut TreeArena, mantissa: i64, exponent: i16) -> Result<usize, ArenaError> {
    let power = 10i64.checked_pow(exponent.unsigned_abs() as u32);
    let node = match power {
        Some(power) if exponent >= 0 => mantissa.checked_mul(power).map(Node::integer),
        Some(power) => Node::rational(mantissa, power),
        None => None,
    };
    if let Some(node) = node {
        return arena.push(node);
    }
    let mult = arena.push_nary(NodeKind::Mult, 2)?;
    arena.push_integer(mantissa)?;
    arena.push_kind(NodeKind::Pow)?;
    arena.push_integer(10)?;
    arena.push_integer(exponent as i64)?;
    Ok(mult)
}

/// Physical-dimension family of a representative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Time,
    Distance,
    Angle,
    Mass,
    Current,
    Temperature,
    AmountOfSubstance,
    LuminousIntensity,
    Frequency,
    Force,
    Pressure,
    Energy,
    Power,
    ElectricCharge,
    ElectricPotential,
    ElectricCapacitance,
    ElectricResistance,
    ElectricConductance,
    MagneticFlux,
    MagneticField,
    Inductance,
    CatalyticActivity,
    Surface,
    Volume,
    Speed,
}

const fn v(exponents: [i8; 8]) -> SIVector {
    SIVector::new(exponents)
}

impl Family {
    /// All families; the base ones first, `Speed` last.
    pub const ALL: [Family; 25] = [
        Family::Time,
        Family::Distance,
        Family::Angle,
        Family::Mass,
        Family::Current,
        Family::Temperature,
        Family::AmountOfSubstance,
        Family::LuminousIntensity,
        Family::Frequency,
        Family::Force,
        Family::Pressure,
        Family::Energy,
        Family::Power,
        Family::ElectricCharge,
        Family::ElectricPotential,
        Family::ElectricCapacitance,
        Family::ElectricResistance,
        Family::ElectricConductance,
        Family::MagneticFlux,
        Family::MagneticField,
        Family::Inductance,
        Family::CatalyticActivity,
        Family::Surface,
        Family::Volume,
        Family::Speed,
    ];

    /// Families whose vectors may be factored out of a product of units.
    pub fn derived() -> &'static [Family] {
        &Family::ALL[8..24]
    }

    //                 s   m rad kg   A   K mol cd
    pub const fn si_vector(self) -> SIVector {
        match self {
            Family::Time => SIVector::base(SIVector::TIME),
            Family::Distance => SIVector::base(SIVector::DISTANCE),
            Family::Angle => SIVector::base(SIVector::ANGLE),
            Family::Mass => SIVector::base(SIVector::MASS),
            Family::Current => SIVector::base(SIVector::CURRENT),
            Family::Temperature => SIVector::base(SIVector::TEMPERATURE),
            Family::AmountOfSubstance => SIVector::base(SIVector::AMOUNT),
            Family::LuminousIntensity => SIVector::base(SIVector::LUMINOUS),
            Family::Frequency => v([-1, 0, 0, 0, 0, 0, 0, 0]),
            Family::Force => v([-2, 1, 0, 1, 0, 0, 0, 0]),
            Family::Pressure => v([-2, -1, 0, 1, 0, 0, 0, 0]),
            Family::Energy => v([-2, 2, 0, 1, 0, 0, 0, 0]),
            Family::Power => v([-3, 2, 0, 1, 0, 0, 0, 0]),
            Family::ElectricCharge => v([1, 0, 0, 0, 1, 0, 0, 0]),
            Family::ElectricPotential => v([-3, 2, 0, 1, -1, 0, 0, 0]),
            Family::ElectricCapacitance => v([4, -2, 0, -1, 2, 0, 0, 0]),
            Family::ElectricResistance => v([-3, 2, 0, 1, -2, 0, 0, 0]),
            Family::ElectricConductance => v([3, -2, 0, -1, 2, 0, 0, 0]),
            Family::MagneticFlux => v([-2, 2, 0, 1, -1, 0, 0, 0]),
            Family::MagneticField => v([-2, 0, 0, 1, -1, 0, 0, 0]),
            Family::Inductance => v([-2, 2, 0, 1, -2, 0, 0, 0]),
            Family::CatalyticActivity => v([-1, 0, 0, 0, 0, 0, 1, 0]),
            Family::Surface => v([0, 2, 0, 0, 0, 0, 0, 0]),
            Family::Volume => v([0, 3, 0, 0, 0, 0, 0, 0]),
            Family::Speed => v([-1, 1, 0, 0, 0, 0, 0, 0]),
        }
    }

    /// Representative ids of this family.
    pub fn members(self) -> Range<u8> {
        let start = REPRESENTATIVES
            .iter()
            .position(|r| r.family == self)
            .unwrap_or(REPRESENTATIVES.len());
        let len = REPRESENTATIVES[start..]
            .iter()
            .take_while(|r| r.family == self)
            .count();
        start as u8..(start + len) as u8
    }

    /// The family's first representative, which has ratio 1.
    pub fn base_representative(self) -> Option<u8> {
        let members = self.members();
        (!members.is_empty()).then_some(members.start)
    }

    pub fn for_vector(vector: &SIVector) -> Option<Family> {
        Family::ALL
            .iter()
            .copied()
            .find(|family| family.si_vector() == *vector)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Representative {
    /// Main symbol, then accepted spellings.
    pub symbols: &'static [&'static str],
    pub ratio: RatioExpr,
    pub input_prefixable: Prefixable,
    pub output_prefixable: Prefixable,
    pub imperial: bool,
    pub family: Family,
}

impl Representative {
    pub fn symbol(&self) -> &'static str {
        self.symbols[0]
    }

    pub fn ratio(&self) -> f64 {
        self.ratio.value()
    }

    pub fn si_vector(&self) -> SIVector {
        self.family.si_vector()
    }
}

macro_rules! representatives {
    ($(
        $id:ident: $family:ident [$($symbol:literal),+]
        $ratio:expr, $input:ident, $output:ident $(, $imperial:ident)?;
    )*) => {
        /// Representative ids, by name.
        pub mod id {
            representatives!(@ids 0u8; $($id)*);
        }

        pub const REPRESENTATIVES: &[Representative] = &[
            $(Representative {
                symbols: &[$($symbol),+],
                ratio: $ratio,
                input_prefixable: Prefixable::$input,
                output_prefixable: Prefixable::$output,
                imperial: representatives!(@imperial $($imperial)?),
                family: Family::$family,
            }),*
        ];
    };
    (@ids $n:expr; $head:ident $($tail:ident)*) => {
        pub const $head: u8 = $n;
        representatives!(@ids $n + 1; $($tail)*);
    };
    (@ids $n:expr;) => {};
    (@imperial imperial) => { true };
    (@imperial) => { false };
}

use RatioExpr::{Decimal, Div, Int, Mul, Pi};

const INCH: RatioExpr = Decimal(254, -4);
const OUNCE: RatioExpr = Decimal(28349523125, -12);
const FLUID_OUNCE: RatioExpr = Decimal(295735295625, -16);
const TEASPOON: RatioExpr = Decimal(492892159375, -17);

representatives! {
    SECOND: Time ["s"] Int(1), All, NegativeLongScale;
    MINUTE: Time ["min"] Int(60), None, None;
    HOUR: Time ["h"] Int(3600), None, None;
    DAY: Time ["day"] Int(86400), None, None;
    WEEK: Time ["week"] Int(604800), None, None;
    MONTH: Time ["month"] Int(2629800), None, None;
    YEAR: Time ["year"] Int(31557600), None, None;
    METER: Distance ["m"] Int(1), All, NegativeAndKilo;
    ASTRONOMICAL_UNIT: Distance ["au"] Int(149597870700), None, None;
    LIGHT_YEAR: Distance ["ly"] Mul(&[Int(299792458), Int(31557600)]), None, None;
    PARSEC: Distance ["pc"] Mul(&[Int(180), Div(&Int(3600), &Pi), Int(149587870700)]), None, None;
    INCH: Distance ["in"] INCH, None, None, imperial;
    FOOT: Distance ["ft"] Mul(&[Int(12), INCH]), None, None, imperial;
    YARD: Distance ["yd"] Mul(&[Int(36), INCH]), None, None, imperial;
    MILE: Distance ["mi"] Mul(&[Int(63360), INCH]), None, None, imperial;
    RADIAN: Angle ["rad"] Int(1), None, None;
    ARC_SECOND: Angle ["\"", "″"] Div(&Pi, &Int(648000)), None, None;
    ARC_MINUTE: Angle ["'", "′"] Div(&Pi, &Int(10800)), None, None;
    DEGREE: Angle ["°"] Div(&Pi, &Int(180)), None, None;
    GRADIAN: Angle ["gon"] Div(&Pi, &Int(200)), None, None;
    KILOGRAM: Mass ["kg"] Int(1), None, None;
    GRAM: Mass ["g"] Decimal(1, -3), All, Negative;
    TON: Mass ["t"] Int(1000), PositiveLongScale, PositiveLongScale;
    OUNCE: Mass ["oz"] OUNCE, None, None, imperial;
    POUND: Mass ["lb"] Mul(&[Int(16), OUNCE]), None, None, imperial;
    SHORT_TON: Mass ["shtn"] Mul(&[Int(2000), Int(16), OUNCE]), None, None, imperial;
    LONG_TON: Mass ["lgtn"] Mul(&[Int(2240), Int(16), OUNCE]), None, None, imperial;
    DALTON: Mass ["Da"] Div(&Decimal(1, -26), &Decimal(602214076, -8)), All, All;
    AMPERE: Current ["A"] Int(1), All, LongScale;
    KELVIN: Temperature ["K"] Int(1), All, None;
    CELSIUS: Temperature ["°C"] Int(1), None, None;
    FAHRENHEIT: Temperature ["°F"] Div(&Int(5), &Int(9)), None, None, imperial;
    MOLE: AmountOfSubstance ["mol"] Int(1), All, LongScale;
    CANDELA: LuminousIntensity ["cd"] Int(1), All, LongScale;
    HERTZ: Frequency ["Hz"] Int(1), All, LongScale;
    NEWTON: Force ["N"] Int(1), All, LongScale;
    PASCAL: Pressure ["Pa"] Int(1), All, LongScale;
    BAR: Pressure ["bar"] Int(100000), All, LongScale;
    ATMOSPHERE: Pressure ["atm"] Int(101325), None, None;
    JOULE: Energy ["J"] Int(1), All, LongScale;
    ELECTRON_VOLT: Energy ["eV"] Decimal(1602176634, -28), All, LongScale;
    WATT: Power ["W"] Int(1), All, LongScale;
    HORSE_POWER: Power ["hp"] Decimal(745699872, -6), None, None;
    COULOMB: ElectricCharge ["C"] Int(1), All, LongScale;
    VOLT: ElectricPotential ["V"] Int(1), All, LongScale;
    FARAD: ElectricCapacitance ["F"] Int(1), All, LongScale;
    OHM: ElectricResistance ["Ω"] Int(1), All, LongScale;
    SIEMENS: ElectricConductance ["S"] Int(1), All, LongScale;
    WEBER: MagneticFlux ["Wb"] Int(1), All, LongScale;
    TESLA: MagneticField ["T"] Int(1), All, LongScale;
    HENRY: Inductance ["H"] Int(1), All, LongScale;
    KATAL: CatalyticActivity ["kat"] Int(1), All, LongScale;
    HECTARE: Surface ["ha"] Int(10000), None, None;
    ACRE: Surface ["acre"] Decimal(40468564224, -7), None, None, imperial;
    LITER: Volume ["L", "l"] Decimal(1, -3), All, Negative;
    CUP: Volume ["cup"] Mul(&[Int(8), FLUID_OUNCE]), None, None, imperial;
    PINT: Volume ["pt"] Mul(&[Int(16), FLUID_OUNCE]), None, None, imperial;
    QUART: Volume ["qt"] Mul(&[Int(32), FLUID_OUNCE]), None, None, imperial;
    GALLON: Volume ["gal"] Mul(&[Int(128), FLUID_OUNCE]), None, None, imperial;
    TEASPOON: Volume ["tsp"] TEASPOON, None, None, imperial;
    TABLESPOON: Volume ["tbsp"] Mul(&[Int(3), TEASPOON]), None, None, imperial;
    FLUID_OUNCE: Volume ["floz"] FLUID_OUNCE, None, None, imperial;
}

static_assertions::const_assert!(REPRESENTATIVES.len() <= u8::MAX as usize);

pub fn representative(id: u8) -> &'static Representative {
    &REPRESENTATIVES[id as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ids_follow_table_order() {
        assert_eq!(representative(id::SECOND).symbol(), "s");
        assert_eq!(representative(id::METER).symbol(), "m");
        assert_eq!(representative(id::DEGREE).symbol(), "°");
        assert_eq!(representative(id::KELVIN).symbol(), "K");
        assert_eq!(representative(id::LITER).symbol(), "L");
        assert_eq!(representative(id::FLUID_OUNCE).symbol(), "floz");
        assert_eq!(REPRESENTATIVES.len(), 62);
    }

    #[test]
    fn test_families_are_contiguous() {
        assert_eq!(Family::Time.members(), id::SECOND..id::METER);
        assert_eq!(Family::Volume.members(), id::LITER..id::FLUID_OUNCE + 1);
        assert!(Family::Speed.members().is_empty());
        for family in Family::ALL {
            for rep in family.members() {
                assert_eq!(representative(rep).family, family);
            }
        }
    }

    #[test]
    fn test_ratios() {
        assert!((representative(id::YARD).ratio() - 0.9144).abs() < 1e-15);
        assert_eq!(representative(id::HOUR).ratio(), 3600.0);
        let degree = representative(id::DEGREE).ratio();
        assert!((degree - core::f64::consts::PI / 180.0).abs() < 1e-18);
    }

    #[test]
    fn test_base_representatives_have_unit_ratio() {
        for family in &Family::ALL[..8] {
            let base = family.base_representative().unwrap();
            assert_eq!(representative(base).ratio(), 1.0);
        }
    }
}
