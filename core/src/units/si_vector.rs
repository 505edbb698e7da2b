use core::fmt;
use core::ops::Index;

/// Number of SI base dimensions.
pub const BASE_DIMENSIONS: usize = 8;

const SYMBOLS: [&str; BASE_DIMENSIONS] = ["s", "m", "rad", "kg", "A", "K", "mol", "cd"];

/// Exponents of the SI base dimensions, in the order time, distance, angle,
/// mass, current, temperature, amount of substance, luminous intensity.
///
/// Combining vectors is component-wise addition: commutative, associative,
/// with [`SIVector::EMPTY`] as identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SIVector([i8; BASE_DIMENSIONS]);

impl SIVector {
    pub const EMPTY: SIVector = SIVector([0; BASE_DIMENSIONS]);

    pub const TIME: usize = 0;
    pub const DISTANCE: usize = 1;
    pub const ANGLE: usize = 2;
    pub const MASS: usize = 3;
    pub const CURRENT: usize = 4;
    pub const TEMPERATURE: usize = 5;
    pub const AMOUNT: usize = 6;
    pub const LUMINOUS: usize = 7;

    pub const fn new(exponents: [i8; BASE_DIMENSIONS]) -> SIVector {
        SIVector(exponents)
    }

    /// The vector of one base dimension.
    pub const fn base(index: usize) -> SIVector {
        let mut exponents = [0; BASE_DIMENSIONS];
        exponents[index] = 1;
        SIVector(exponents)
    }

    pub fn exponents(&self) -> [i8; BASE_DIMENSIONS] {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&e| e == 0)
    }

    /// Number of non-zero components.
    pub fn support_size(&self) -> usize {
        self.0.iter().filter(|&&e| e != 0).count()
    }

    /// `self + factor · other`, or `None` on exponent overflow.
    pub fn checked_add_scaled(&self, other: &SIVector, factor: i8) -> Option<SIVector> {
        let mut result = [0i8; BASE_DIMENSIONS];
        for (i, slot) in result.iter_mut().enumerate() {
            *slot = other.0[i]
                .checked_mul(factor)
                .and_then(|scaled| self.0[i].checked_add(scaled))?;
        }
        Some(SIVector(result))
    }

    /// `factor · self`, or `None` on overflow.
    pub fn checked_scale(&self, factor: i8) -> Option<SIVector> {
        SIVector::EMPTY.checked_add_scaled(self, factor)
    }
}

impl Index<usize> for SIVector {
    type Output = i8;

    fn index(&self, index: usize) -> &i8 {
        &self.0[index]
    }
}

impl fmt::Display for SIVector {
    /// Base-unit product such as `m·s^-2`, or `1` for the empty vector.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "1");
        }
        let mut first = true;
        for (symbol, &exponent) in SYMBOLS.iter().zip(self.0.iter()) {
            if exponent == 0 {
                continue;
            }
            if !first {
                write!(f, "·")?;
            }
            first = false;
            write!(f, "{}", symbol)?;
            if exponent != 1 {
                write!(f, "^{}", exponent)?;
            }
        }
        Ok(())
    }
}
