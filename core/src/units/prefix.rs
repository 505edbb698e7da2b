/// A power-of-ten scale factor written before a unit symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prefix {
    pub symbol: &'static str,
    pub exponent: i8,
}

pub const PREFIXES: [Prefix; 13] = [
    Prefix { symbol: "p", exponent: -12 },
    Prefix { symbol: "n", exponent: -9 },
    Prefix { symbol: "μ", exponent: -6 },
    Prefix { symbol: "m", exponent: -3 },
    Prefix { symbol: "c", exponent: -2 },
    Prefix { symbol: "d", exponent: -1 },
    Prefix { symbol: "", exponent: 0 },
    Prefix { symbol: "da", exponent: 1 },
    Prefix { symbol: "h", exponent: 2 },
    Prefix { symbol: "k", exponent: 3 },
    Prefix { symbol: "M", exponent: 6 },
    Prefix { symbol: "G", exponent: 9 },
    Prefix { symbol: "T", exponent: 12 },
];

pub const EMPTY_PREFIX: u8 = 6;
pub const KILO_PREFIX: u8 = 9;

static_assertions::const_assert_eq!(PREFIXES[EMPTY_PREFIX as usize].exponent, 0);
static_assertions::const_assert_eq!(PREFIXES[KILO_PREFIX as usize].exponent, 3);

pub fn prefix(id: u8) -> &'static Prefix {
    &PREFIXES[id as usize]
}

pub fn prefix_exponent(id: u8) -> i8 {
    PREFIXES[id as usize].exponent
}

/// Which prefixes a representative accepts, on input or on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefixable {
    None,
    PositiveLongScale,
    NegativeLongScale,
    Positive,
    Negative,
    NegativeAndKilo,
    LongScale,
    All,
}

impl Prefixable {
    /// The empty prefix is always allowed.
    pub fn allows(self, prefix: &Prefix) -> bool {
        let e = prefix.exponent;
        if e == 0 {
            return true;
        }
        match self {
            Prefixable::None => false,
            Prefixable::All => true,
            Prefixable::LongScale => e % 3 == 0,
            Prefixable::NegativeAndKilo => e < 0 || e == 3,
            Prefixable::NegativeLongScale => e < 0 && e % 3 == 0,
            Prefixable::PositiveLongScale => e > 0 && e % 3 == 0,
            Prefixable::Negative => e < 0,
            Prefixable::Positive => e > 0,
        }
    }
}
