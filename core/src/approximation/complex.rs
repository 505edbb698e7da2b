//! Complex arithmetic with residual snapping.
//!
//! Library trigonometry and `powc` are only accurate to a few ulps, so a
//! result like `exp(iπ) = -1 + 1.2e-16i` would leak a fake imaginary part.
//! [`neglect`] snaps such residues to exact zero when they are negligible
//! both absolutely and relative to the operands.

use num_complex::Complex;
use num_traits::{One, Zero};

use crate::precision::{Precision, is_integer};

pub type C<T> = Complex<T>;

pub fn real<T: Precision>(value: T) -> C<T> {
    Complex::new(value, T::zero())
}

pub fn nan<T: Precision>() -> C<T> {
    Complex::new(T::nan(), T::nan())
}

pub fn is_nan<T: Precision>(value: C<T>) -> bool {
    value.re.is_nan() || value.im.is_nan()
}

pub fn is_real<T: Precision>(value: C<T>) -> bool {
    value.im == T::zero()
}

/// Replace a `-0.0` part by `+0.0`. A signed zero imaginary part would put
/// a real negative base on the wrong side of the `powc` branch cut.
pub fn unsigned_zeros<T: Precision>(mut value: C<T>) -> C<T> {
    if value.re == T::zero() {
        value.re = T::zero();
    }
    if value.im == T::zero() {
        value.im = T::zero();
    }
    value
}

pub fn neg<T: Precision>(value: C<T>) -> C<T> {
    unsigned_zeros(-value)
}

/// Smallest non-zero magnitude among the two parts, or zero.
fn smallest_part<T: Precision>(value: C<T>) -> T {
    let re = value.re.abs();
    let im = value.im.abs();
    match (re == T::zero(), im == T::zero()) {
        (true, true) => T::zero(),
        (true, false) => im,
        (false, true) => re,
        (false, false) => re.min(im),
    }
}

fn is_negligible<T: Precision>(x: T, norm1: T, norm2: T) -> bool {
    let x = x.abs();
    let precision = T::EPSILON_LAX;
    x <= T::from_f64(10.0) * precision && x / norm1 <= precision && x / norm2 <= precision
}

/// Snap a residual real or imaginary part of `result` to zero, measured
/// against the operands `a` and `b`.
pub fn neglect<T: Precision>(mut result: C<T>, a: C<T>, b: C<T>) -> C<T> {
    let norm1 = smallest_part(a);
    let norm2 = smallest_part(b);
    if result.re != T::zero() && is_negligible(result.re, norm1, norm2) {
        result.re = T::zero();
    }
    if result.im != T::zero() && is_negligible(result.im, norm1, norm2) {
        result.im = T::zero();
    }
    result
}

// ============================================================================
// Powers
// ============================================================================

/// `c^d`, NaN where the power is undefined.
pub fn power<T: Precision>(c: C<T>, d: C<T>, real_mode: bool) -> C<T> {
    let (c, d) = (unsigned_zeros(c), unsigned_zeros(d));
    let zero = T::zero();
    let one = T::one();
    if is_real(c) && c.re < zero {
        let pos_inf = d.re == T::infinity() && c.re <= -one;
        let neg_inf = d.re == T::neg_infinity() && c.re >= -one;
        if pos_inf || neg_inf {
            return nan();
        }
    }
    if c.is_zero() {
        // 0^0 and 0^negative have no value.
        return if is_real(d) && d.re > zero {
            C::zero()
        } else {
            nan()
        };
    }
    if c.re.is_infinite() && d.is_zero() {
        return nan();
    }
    let result = if is_real(c) && is_real(d) && (c.re > zero || d.re == d.re.round()) {
        if c.re.abs() == one && d.re.is_infinite() {
            return nan();
        }
        real(c.re.powf(d.re))
    } else {
        c.powc(d)
    };
    let reference = if d.re < zero { c.inv() } else { c };
    neglect(result, reference, d)
}

/// A real root of `c^(p/q)` that is not the principal one, if it exists.
///
/// Only odd `q` guarantees a real root: `c^(p/q) = sign(c)^p · |c|^(p/q)`.
pub fn real_rational_root<T: Precision>(c: C<T>, p: i64, q: i64) -> Option<C<T>> {
    if !is_real(c) || q % 2 == 0 {
        return None;
    }
    let magnitude = c.re.abs().powf(T::from_i64(p) / T::from_i64(q));
    if c.re < T::zero() && p % 2 != 0 {
        Some(real(-magnitude))
    } else {
        Some(real(magnitude))
    }
}

pub fn sqrt<T: Precision>(c: C<T>, real_mode: bool) -> C<T> {
    if is_real(c) && c.re >= T::zero() {
        return real(c.re.sqrt());
    }
    power(c, real(T::from_f64(0.5)), real_mode)
}

// ============================================================================
// Elementary functions
// ============================================================================

pub fn exp<T: Precision>(c: C<T>) -> C<T> {
    if is_real(c) {
        return real(c.re.exp());
    }
    neglect(c.exp(), c, c)
}

/// Principal natural logarithm; NaN at zero.
pub fn ln<T: Precision>(c: C<T>) -> C<T> {
    if c.is_zero() {
        return nan();
    }
    if is_real(c) && c.re > T::zero() {
        return real(c.re.ln());
    }
    neglect(c.ln(), c, c)
}

pub fn log10<T: Precision>(c: C<T>) -> C<T> {
    let ten = real(T::from_f64(10.0));
    let result = ln(c) / ln(ten);
    neglect(result, c, c)
}

/// `cos` (`k == 0`) or `sin` (`k == 1`) of an angle in radians.
pub fn trig<T: Precision>(angle: C<T>, k: u8) -> C<T> {
    let result = if is_real(angle) {
        real(if k == 0 { angle.re.cos() } else { angle.re.sin() })
    } else if k == 0 {
        angle.cos()
    } else {
        angle.sin()
    };
    neglect(result, angle, angle)
}

/// `tan` as `sin/cos`; a snapped-to-zero cosine is a pole.
pub fn tan<T: Precision>(angle: C<T>) -> C<T> {
    let cos = trig(angle, 0);
    if cos.is_zero() {
        return nan();
    }
    neglect(trig(angle, 1) / cos, angle, angle)
}

/// `acos` (`k == 0`) or `asin` (`k == 1`), in radians.
pub fn atrig<T: Precision>(value: C<T>, k: u8) -> C<T> {
    if is_real(value) && value.re.abs() <= T::one() {
        return real(if k == 0 {
            value.re.acos()
        } else {
            value.re.asin()
        });
    }
    let mut result = if k == 0 { value.acos() } else { value.asin() };
    // The branch cut along the real axis is taken from above for x > 1.
    if is_real(value) && value.re > T::one() {
        result = result.conj();
    }
    neglect(result, value, value)
}

/// `atan` in radians; undefined at the poles `±i`.
pub fn atan<T: Precision>(value: C<T>) -> C<T> {
    if value.re == T::zero() && value.im.abs() == T::one() {
        return nan();
    }
    if is_real(value) {
        return real(value.re.atan());
    }
    neglect(value.atan(), value, value)
}

pub fn hyperbolic<T: Precision>(value: C<T>, kind: Hyperbolic) -> C<T> {
    let result = match kind {
        Hyperbolic::Cos => value.cosh(),
        Hyperbolic::Sin => value.sinh(),
        Hyperbolic::Tan => value.tanh(),
        Hyperbolic::ArCos => value.acosh(),
        Hyperbolic::ArSin => value.asinh(),
        Hyperbolic::ArTan => {
            if is_real(value) && value.re.abs() == T::one() {
                return nan();
            }
            value.atanh()
        }
    };
    neglect(result, value, value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hyperbolic {
    Cos,
    Sin,
    Tan,
    ArCos,
    ArSin,
    ArTan,
}

/// Sum with the residue snapped relative to the operands.
pub fn add<T: Precision>(a: C<T>, b: C<T>) -> C<T> {
    neglect(a + b, a, b)
}

pub fn mul<T: Precision>(a: C<T>, b: C<T>) -> C<T> {
    if is_real(a) && is_real(b) {
        return real(a.re * b.re);
    }
    unsigned_zeros(neglect(a * b, a, b))
}

/// Real value of `c` if it is a real integer.
pub fn as_integer<T: Precision>(c: C<T>) -> Option<i64> {
    if !is_real(c) || !is_integer(c.re) {
        return None;
    }
    let rounded = c.re.round().into_f64();
    if rounded.abs() > 9.0e15 {
        return None;
    }
    Some(rounded as i64)
}

pub fn one<T: Precision>() -> C<T> {
    C::one()
}

pub fn zero<T: Precision>() -> C<T> {
    C::zero()
}

pub fn is_zero<T: Precision>(value: C<T>) -> bool {
    value.is_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn c(re: f64, im: f64) -> C<f64> {
        Complex::new(re, im)
    }

    #[test]
    fn test_euler_identity_is_snapped() {
        let result = exp(c(0.0, core::f64::consts::PI));
        assert_eq!(result, c(-1.0, 0.0));
    }

    #[test]
    fn test_power_special_cases() {
        assert!(is_nan(power(c(0.0, 0.0), c(0.0, 0.0), false)));
        assert!(is_nan(power(c(0.0, 0.0), c(-1.0, 0.0), false)));
        assert!(is_nan(power(c(1.0, 0.0), c(f64::INFINITY, 0.0), false)));
        assert!(is_nan(power(c(-2.0, 0.0), c(f64::INFINITY, 0.0), false)));
        assert_eq!(power(c(2.0, 0.0), c(3.0, 0.0), false), c(8.0, 0.0));
        assert_eq!(power(c(-2.0, 0.0), c(3.0, 0.0), false), c(-8.0, 0.0));
        assert_eq!(power(c(0.0, 0.0), c(2.0, 0.0), false), c(0.0, 0.0));
    }

    #[test]
    fn test_principal_root_of_negative_is_complex() {
        let root = power(c(-4.0, 0.0), c(0.5, 0.0), false);
        assert_eq!(root.re, 0.0);
        assert!((root.im - 2.0).abs() < 1e-15);
    }

    #[test]
    fn test_principal_root_ignores_sign_of_zero() {
        let root = power(c(-4.0, -0.0), c(0.5, 0.0), false);
        assert_eq!(root.re, 0.0);
        assert!((root.im - 2.0).abs() < 1e-15);
        assert_eq!(neg(c(4.0, 0.0)).im.to_bits(), 0.0f64.to_bits());

        let cube_root = power(neg(c(8.0, 0.0)), c(1.0 / 3.0, 0.0), false);
        assert!((cube_root.re - 1.0).abs() < 1e-12);
        assert!((cube_root.im - 3.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_real_rational_root() {
        assert_eq!(real_rational_root(c(-8.0, 0.0), 1, 3), Some(c(-2.0, 0.0)));
        let square = real_rational_root(c(-8.0, 0.0), 2, 3).unwrap();
        assert!((square.re - 4.0).abs() < 1e-12);
        assert_eq!(square.im, 0.0);
        assert_eq!(real_rational_root(c(-4.0, 0.0), 1, 2), None);
    }

    #[test]
    fn test_trig_snaps_zero() {
        assert_eq!(trig(c(core::f64::consts::FRAC_PI_2, 0.0), 0), c(0.0, 0.0));
        assert!(is_nan(tan(c(core::f64::consts::FRAC_PI_2, 0.0))));
        assert!(is_nan(atan(c(0.0, 1.0))));
        assert_eq!(atrig(c(1.0, 0.0), 0), c(0.0, 0.0));
    }

    #[test]
    fn test_ln_of_zero_is_undefined() {
        assert!(is_nan(ln(c(0.0, 0.0))));
        assert_eq!(ln(c(1.0, 0.0)), c(0.0, 0.0));
    }
}
