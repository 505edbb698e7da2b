//! Floating-point precision the approximation engine is generic over.

use core::fmt::{Debug, Display};

use num_traits::{Float, FloatConst};

/// `f32` or `f64`.
pub trait Precision: Float + FloatConst + Debug + Display + Default + 'static {
    /// Relative tolerance of a single operation.
    const EPSILON: Self;
    /// Tolerance used when snapping residual components to zero.
    const EPSILON_LAX: Self;
    /// Significant digits worth displaying at this precision.
    const DIGITS: usize;

    fn from_f64(value: f64) -> Self;
    fn into_f64(self) -> f64;
    fn from_i64(value: i64) -> Self {
        Self::from_f64(value as f64)
    }
    /// Gamma function, for factorials of large arguments.
    fn gamma(self) -> Self;
}

impl Precision for f32 {
    const EPSILON: f32 = 1e-7;
    const EPSILON_LAX: f32 = 1e-6;
    const DIGITS: usize = 7;

    fn from_f64(value: f64) -> f32 {
        value as f32
    }

    fn into_f64(self) -> f64 {
        self as f64
    }

    fn gamma(self) -> f32 {
        libm::tgammaf(self)
    }
}

impl Precision for f64 {
    const EPSILON: f64 = 1e-15;
    const EPSILON_LAX: f64 = 1e-13;
    const DIGITS: usize = 14;

    fn from_f64(value: f64) -> f64 {
        value
    }

    fn into_f64(self) -> f64 {
        self
    }

    fn gamma(self) -> f64 {
        libm::tgamma(self)
    }
}

/// Whether `value` is within `EPSILON` (relative) of an integer.
pub fn is_integer<T: Precision>(value: T) -> bool {
    value.is_finite() && (value - value.round()).abs() <= T::EPSILON * value.abs().max(T::one())
}
