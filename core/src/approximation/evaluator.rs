//! The recursive approximator.
//!
//! One [`Approximator`] walks a tree under a [`Context`]. Scalars are
//! complex throughout; real-only functions reject complex arguments, and
//! the real-mode check happens once at the root. Lists and points are
//! evaluated elementwise: the caller sets the current list or point index
//! in the context and every `List`/`Point` node picks its element.

use super::complex::{self, C, Hyperbolic};
use super::context::Context;
use super::{Approx, Outcome, exact_rational, value};
use crate::dimension::{get_dimension, list_length};
use crate::precision::{Precision, is_integer};
use crate::tree::{NodeKind, TreeArena};
use crate::units::{self, AngleUnit};

pub(crate) struct Approximator<'a, 'c, T: Precision> {
    pub(crate) arena: &'a TreeArena,
    pub(crate) context: &'c mut Context<T>,
}

impl<'a, 'c, T: Precision> Approximator<'a, 'c, T> {
    pub(crate) fn new(arena: &'a TreeArena, context: &'c mut Context<T>) -> Self {
        Self { arena, context }
    }

    pub(crate) fn child(&self, index: usize, n: usize) -> usize {
        self.arena.child(index, n)
    }

    /// Approximate a scalar subtree. NaN results become `Undefined`.
    pub(crate) fn scalar(&mut self, index: usize) -> Approx<C<T>> {
        self.context.budget.enter()?;
        let result = self.scalar_inner(index);
        self.context.budget.leave();
        Ok(match result? {
            Outcome::Value(v) if complex::is_nan(v) => Outcome::Undefined,
            other => other,
        })
    }

    /// A real scalar; complex values are undefined for real-only functions.
    pub(crate) fn real(&mut self, index: usize) -> Approx<T> {
        let v = value!(self.scalar(index));
        if !complex::is_real(v) {
            return Ok(Outcome::Undefined);
        }
        Ok(Outcome::Value(v.re))
    }

    pub(crate) fn integer(&mut self, index: usize) -> Approx<i64> {
        let v = value!(self.scalar(index));
        Ok(match complex::as_integer(v) {
            Some(n) => Outcome::Value(n),
            None => Outcome::Undefined,
        })
    }

    fn real_mode(&self) -> bool {
        self.context.is_real_mode()
    }

    fn to_radians(&self, value: C<T>) -> C<T> {
        match self.context.angle_unit {
            AngleUnit::Radian => value,
            unit => complex::mul(value, complex::real(T::from_f64(unit.ratio().value()))),
        }
    }

    fn from_radians(&self, value: C<T>) -> C<T> {
        match self.context.angle_unit {
            AngleUnit::Radian => value,
            unit => value / complex::real(T::from_f64(unit.ratio().value())),
        }
    }

    /// Argument of a direct trigonometric function, in radians. An argument
    /// carrying an angle unit is already in radians once approximated.
    fn angle_argument(&mut self, index: usize) -> Approx<C<T>> {
        let child = index + 1;
        let v = value!(self.scalar(child));
        if units::has_unit(self.arena, child) {
            return Ok(Outcome::Value(v));
        }
        Ok(Outcome::Value(self.to_radians(v)))
    }

    fn scalar_inner(&mut self, index: usize) -> Approx<C<T>> {
        use NodeKind::*;
        let arena = self.arena;
        let node = arena.node(index);
        let real = |v: f64| Ok(Outcome::Value(complex::real(T::from_f64(v))));
        let done = |v: C<T>| Ok(Outcome::Value(v));
        match node.kind {
            Zero | One | Two | MinusOne | Half | IntegerLiteral | Rational => {
                let (p, q) = node.as_rational().unwrap_or((0, 1));
                done(complex::real(T::from_i64(p) / T::from_i64(q)))
            }
            Float => match node.payload {
                crate::tree::Payload::Float(v) => real(v),
                _ => Ok(Outcome::Undefined),
            },
            Decimal => {
                let mantissa = value!(self.scalar(index + 1));
                let exponent = match node.payload {
                    crate::tree::Payload::Exponent(e) => e,
                    _ => 0,
                };
                let scale = T::from_f64(libm::pow(10.0, -(exponent as f64)));
                done(mantissa * scale)
            }
            Pi => done(complex::real(T::PI())),
            EulerE => done(complex::real(T::E())),
            ImaginaryUnit => done(C::i()),
            Infinity => done(complex::real(T::infinity())),
            Undefined => Ok(Outcome::Undefined),
            NonReal => Ok(Outcome::NonReal),
            Forbidden => Ok(Outcome::Forbidden),
            True | False => Ok(Outcome::Undefined),
            UserSymbol | UserFunction | UserSequence | Parameter => Ok(Outcome::Undefined),
            Variable => match node.variable_id().and_then(|id| self.context.variable(id)) {
                Some(v) => done(v),
                None => Ok(Outcome::Undefined),
            },

            Add => {
                let mut sum = complex::zero();
                for child in arena.children(index) {
                    sum = complex::add(sum, value!(self.scalar(child)));
                }
                done(sum)
            }
            Mult => {
                let mut product = complex::one();
                for child in arena.children(index) {
                    product = complex::mul(product, value!(self.scalar(child)));
                }
                done(product)
            }
            Sub => {
                let a = value!(self.scalar(index + 1));
                let b = value!(self.scalar(self.child(index, 1)));
                done(complex::add(a, complex::neg(b)))
            }
            Div => {
                let a = value!(self.scalar(index + 1));
                let b = value!(self.scalar(self.child(index, 1)));
                if complex::is_zero(b) {
                    return Ok(Outcome::Undefined);
                }
                done(complex::neglect(a / b, a, b))
            }
            Opposite => done(complex::neg(value!(self.scalar(index + 1)))),
            Parenthesis => self.scalar(index + 1),
            MixedFraction => {
                let a = value!(self.scalar(index + 1));
                let b = value!(self.scalar(self.child(index, 1)));
                done(a + b)
            }
            Pow | PowReal => self.power(index, node.kind == PowReal || self.real_mode()),
            PowMatrix => Ok(Outcome::Undefined),
            Sqrt => {
                let v = value!(self.scalar(index + 1));
                done(complex::sqrt(v, self.real_mode()))
            }
            Root => {
                let v = value!(self.scalar(index + 1));
                let n = value!(self.scalar(self.child(index, 1)));
                if self.real_mode() {
                    if let Some(root) = complex::as_integer(n)
                        .and_then(|n| complex::real_rational_root(v, 1, n))
                    {
                        return done(root);
                    }
                }
                if complex::is_zero(n) {
                    return Ok(Outcome::Undefined);
                }
                done(complex::power(v, n.inv(), self.real_mode()))
            }
            Exp => done(complex::exp(value!(self.scalar(index + 1)))),
            Ln => done(complex::ln(value!(self.scalar(index + 1)))),
            LnReal => {
                let v = value!(self.scalar(index + 1));
                if complex::is_zero(v) {
                    return Ok(Outcome::Undefined);
                }
                if !complex::is_real(v) || v.re < T::zero() {
                    return Ok(Outcome::NonReal);
                }
                done(complex::ln(v))
            }
            Log => done(complex::log10(value!(self.scalar(index + 1)))),
            LogBase => {
                let v = value!(self.scalar(index + 1));
                let base = value!(self.scalar(self.child(index, 1)));
                let denominator = complex::ln(base);
                if complex::is_zero(denominator) {
                    return Ok(Outcome::Undefined);
                }
                done(complex::neglect(complex::ln(v) / denominator, v, base))
            }
            Abs => done(complex::real(value!(self.scalar(index + 1)).norm())),
            Floor | Ceil | Frac => {
                let x = value!(self.real(index + 1));
                let floor = floor_within_epsilon(x, node.kind == Ceil);
                done(complex::real(if node.kind == Frac { x - floor } else { floor }))
            }
            Round => {
                let x = value!(self.real(index + 1));
                let digits = value!(self.integer(self.child(index, 1)));
                let scale = T::from_f64(libm::pow(10.0, digits as f64));
                done(complex::real((x * scale).round() / scale))
            }
            Sign => {
                let x = value!(self.real(index + 1));
                let sign = if x > T::zero() {
                    T::one()
                } else if x < T::zero() {
                    -T::one()
                } else {
                    T::zero()
                };
                done(complex::real(sign))
            }
            Re => done(complex::real(value!(self.scalar(index + 1)).re)),
            Im => done(complex::real(value!(self.scalar(index + 1)).im)),
            Arg => {
                let v = value!(self.scalar(index + 1));
                if complex::is_zero(v) {
                    return Ok(Outcome::Undefined);
                }
                done(complex::real(v.arg()))
            }
            Conj => done(value!(self.scalar(index + 1)).conj()),
            Fact => {
                let n = value!(self.real(index + 1));
                if !is_integer(n) || n < T::zero() {
                    return Ok(Outcome::Undefined);
                }
                done(complex::real((n.round() + T::one()).gamma().round()))
            }
            Binomial => {
                let n = value!(self.real(index + 1));
                let k = value!(self.integer(self.child(index, 1)));
                done(complex::real(binomial(n, k)))
            }
            Permute => {
                let n = value!(self.integer(index + 1));
                let k = value!(self.integer(self.child(index, 1)));
                if n < 0 || k < 0 {
                    return Ok(Outcome::Undefined);
                }
                if k > n {
                    return done(complex::zero());
                }
                let result = (0..k).fold(T::one(), |acc, i| acc * T::from_i64(n - i));
                done(complex::real(result))
            }
            Quo | Rem => {
                let a = value!(self.integer(index + 1));
                let b = value!(self.integer(self.child(index, 1)));
                if b == 0 {
                    return Ok(Outcome::Undefined);
                }
                let quotient = a.div_euclid(b);
                let result = if node.kind == Quo {
                    quotient
                } else {
                    a.rem_euclid(b)
                };
                done(complex::real(T::from_i64(result)))
            }
            Gcd | Lcm => {
                let mut accumulator: Option<u64> = None;
                for child in arena.children(index) {
                    let n = value!(self.integer(child)).unsigned_abs();
                    accumulator = Some(match accumulator {
                        None => n,
                        Some(acc) if node.kind == Gcd => crate::tree::gcd(acc, n),
                        Some(acc) => {
                            let g = crate::tree::gcd(acc, n);
                            if g == 0 {
                                0
                            } else {
                                match (acc / g).checked_mul(n) {
                                    Some(l) => l,
                                    None => return Ok(Outcome::Undefined),
                                }
                            }
                        }
                    });
                }
                match accumulator {
                    Some(n) => done(complex::real(T::from_f64(n as f64))),
                    None => Ok(Outcome::Undefined),
                }
            }
            Percent => {
                let v = value!(self.scalar(index + 1));
                done(v / complex::real(T::from_f64(100.0)))
            }
            PercentAddition => {
                let a = value!(self.scalar(index + 1));
                let b = value!(self.scalar(self.child(index, 1)));
                let factor = complex::one::<T>() + b / complex::real(T::from_f64(100.0));
                done(complex::mul(a, factor))
            }

            // Trigonometry
            Cos | Sin | Sec | Csc => {
                let angle = value!(self.angle_argument(index));
                let k = if matches!(node.kind, Cos | Sec) { 0 } else { 1 };
                let v = complex::trig(angle, k);
                if matches!(node.kind, Sec | Csc) {
                    if complex::is_zero(v) {
                        return Ok(Outcome::Undefined);
                    }
                    return done(v.inv());
                }
                done(v)
            }
            Tan => done(complex::tan(value!(self.angle_argument(index)))),
            Cot => {
                let angle = value!(self.angle_argument(index));
                let sin = complex::trig(angle, 1);
                if complex::is_zero(sin) {
                    return Ok(Outcome::Undefined);
                }
                done(complex::trig(angle, 0) / sin)
            }
            ACos | ASin | ASec | ACsc => {
                let mut v = value!(self.scalar(index + 1));
                if matches!(node.kind, ASec | ACsc) {
                    if complex::is_zero(v) {
                        return Ok(Outcome::Undefined);
                    }
                    v = v.inv();
                }
                let k = if matches!(node.kind, ACos | ASec) { 0 } else { 1 };
                done(self.from_radians(complex::atrig(v, k)))
            }
            ATan => {
                let v = value!(self.scalar(index + 1));
                done(self.from_radians(complex::atan(v)))
            }
            ACot => {
                let v = value!(self.scalar(index + 1));
                let radians = if complex::is_zero(v) {
                    complex::real(T::FRAC_PI_2())
                } else {
                    complex::atan(v.inv())
                };
                done(self.from_radians(radians))
            }
            CosH | SinH | TanH | ArCosH | ArSinH | ArTanH => {
                let v = value!(self.scalar(index + 1));
                let kind = match node.kind {
                    CosH => Hyperbolic::Cos,
                    SinH => Hyperbolic::Sin,
                    TanH => Hyperbolic::Tan,
                    ArCosH => Hyperbolic::ArCos,
                    ArSinH => Hyperbolic::ArSin,
                    _ => Hyperbolic::ArTan,
                };
                done(complex::hyperbolic(v, kind))
            }
            Trig | ATrig => {
                let v = value!(self.scalar(index + 1));
                let k = value!(self.integer(self.child(index, 1)));
                let k = if k == 0 { 0 } else { 1 };
                done(if node.kind == Trig {
                    complex::trig(v, k)
                } else {
                    complex::atrig(v, k)
                })
            }
            TanRad => done(complex::tan(value!(self.scalar(index + 1)))),
            ATanRad => done(complex::atan(value!(self.scalar(index + 1)))),

            // Units approximate to their SI value.
            Unit => match node.unit_ids() {
                Some((rep, prefix)) => real(units::unit_value(rep, prefix)),
                None => Ok(Outcome::Undefined),
            },
            UnitConversion => self.scalar(index + 1),

            // Structures
            List | ListSequence | ListSlice | ListSort | RandIntNoRep => self.list_element(index),
            ListElement => self.indexed_element(index),
            ListSum | ListProduct | Min | Max | Mean | Median | Variance | StdDev
            | SampleStdDev => self.statistic(index),
            Dim => match list_length(arena, index + 1) {
                Some(length) => real(length as f64),
                None => Ok(Outcome::Undefined),
            },
            Point => match self.context.point_index() {
                Some(k) if k < 2 => {
                    let previous = self.context.replace_point_index(None);
                    let result = self.scalar(self.child(index, k));
                    self.context.replace_point_index(previous);
                    result
                }
                _ => Ok(Outcome::Undefined),
            },
            Det => {
                let m = value!(self.matrix(index + 1));
                match m.determinant() {
                    Some(d) => done(d),
                    None => Ok(Outcome::Undefined),
                }
            }
            Trace => {
                let m = value!(self.matrix(index + 1));
                match m.trace() {
                    Some(t) => done(t),
                    None => Ok(Outcome::Undefined),
                }
            }
            Norm => {
                let m = value!(self.matrix(index + 1));
                match m.norm() {
                    Some(n) => done(complex::real(n)),
                    None => Ok(Outcome::Undefined),
                }
            }
            Dot => {
                let a = value!(self.matrix(index + 1));
                let b = value!(self.matrix(self.child(index, 1)));
                match a.dot(&b) {
                    Some(d) => done(d),
                    None => Ok(Outcome::Undefined),
                }
            }
            Matrix | Identity | Inverse | Transpose | Cross | Ref | Rref => {
                Ok(Outcome::Undefined)
            }

            Sum | Product => self.sum_or_product(index),
            Integral => self.integral(index),

            Equal | NotEqual | Less | LessOrEqual | Greater | GreaterOrEqual | LogicalAnd
            | LogicalOr | LogicalXor | LogicalNot | LogicalNand | LogicalNor => {
                Ok(Outcome::Undefined)
            }
            Piecewise => {
                let branch = value!(self.piecewise_branch(index));
                self.scalar(branch)
            }

            Random => {
                let seed = node.seed().unwrap_or(0);
                real(self.context.random.random(seed, index))
            }
            RandInt => {
                let a = value!(self.real(index + 1)).into_f64();
                let b = value!(self.real(self.child(index, 1))).into_f64();
                let seed = node.seed().unwrap_or(0);
                match self.context.random.rand_int(seed, index, a, b) {
                    Some(v) => real(v),
                    None => Ok(Outcome::Undefined),
                }
            }

            Dependency => {
                value!(self.dependencies_hold(self.child(index, 1)));
                self.scalar(index + 1)
            }
            DependencyList => Ok(Outcome::Undefined),
        }
    }

    fn power(&mut self, index: usize, real_mode: bool) -> Approx<C<T>> {
        let base = value!(self.scalar(index + 1));
        let exponent_index = self.child(index, 1);
        if real_mode && complex::is_real(base) && base.re < T::zero() {
            if let Some((p, q)) = exact_rational(self.arena, exponent_index) {
                if let Some(root) = complex::real_rational_root(base, p, q) {
                    return Ok(Outcome::Value(root));
                }
            }
        }
        let exponent = value!(self.scalar(exponent_index));
        let result = complex::power(base, exponent, real_mode);
        if real_mode && !complex::is_nan(result) && !complex::is_real(result) {
            return Ok(Outcome::NonReal);
        }
        Ok(Outcome::Value(result))
    }

    /// Evaluate every guard of a dependency list; any false or undefined
    /// guard makes the dependent expression undefined.
    pub(crate) fn dependencies_hold(&mut self, list: usize) -> Approx<()> {
        for guard in self.arena.children(list) {
            if get_dimension(self.arena, guard).is_boolean() {
                if !value!(self.boolean(guard)) {
                    return Ok(Outcome::Undefined);
                }
            } else if list_length(self.arena, guard).is_none() {
                value!(self.scalar(guard));
            }
        }
        Ok(Outcome::Value(()))
    }

    /// Child index of the winning branch of a piecewise node.
    pub(crate) fn piecewise_branch(&mut self, index: usize) -> Approx<usize> {
        let count = self.arena.child_count(index);
        let children = self.arena.child_positions(index);
        for pair in 0..count / 2 {
            if value!(self.boolean(children[2 * pair + 1])) {
                return Ok(Outcome::Value(children[2 * pair]));
            }
        }
        if count % 2 == 1 {
            return Ok(Outcome::Value(children[count - 1]));
        }
        Ok(Outcome::Undefined)
    }

    fn sum_or_product(&mut self, index: usize) -> Approx<C<T>> {
        let is_sum = self.arena.kind(index) == NodeKind::Sum;
        let lower = value!(self.integer(index + 1));
        let upper = value!(self.integer(self.child(index, 1)));
        let body = self.child(index, 2);
        let mut accumulator = if is_sum { complex::zero() } else { complex::one() };
        if !self.context.push_variable(complex::zero()) {
            return Ok(Outcome::Undefined);
        }
        let mut k = lower;
        let mut result = Ok(Outcome::Value(()));
        while k <= upper {
            if let Err(aborted) = self.context.poll() {
                result = Err(aborted);
                break;
            }
            self.context.set_innermost(complex::real(T::from_i64(k)));
            match self.scalar(body) {
                Ok(Outcome::Value(term)) => {
                    accumulator = if is_sum {
                        complex::add(accumulator, term)
                    } else {
                        complex::mul(accumulator, term)
                    };
                }
                // Stop early on the first undefined term.
                Ok(other) => {
                    result = Ok(other.discard());
                    break;
                }
                Err(aborted) => {
                    result = Err(aborted);
                    break;
                }
            }
            k += 1;
        }
        self.context.pop_variable();
        value!(result);
        Ok(Outcome::Value(accumulator))
    }

    /// Approximate a boolean subtree.
    pub(crate) fn boolean(&mut self, index: usize) -> Approx<bool> {
        self.context.budget.enter()?;
        let result = self.boolean_inner(index);
        self.context.budget.leave();
        result
    }

    fn boolean_inner(&mut self, index: usize) -> Approx<bool> {
        use NodeKind::*;
        let arena = self.arena;
        let kind = arena.kind(index);
        let done = |b: bool| Ok(Outcome::Value(b));
        match kind {
            True => done(true),
            False => done(false),
            Equal | NotEqual => {
                let a = index + 1;
                let b = self.child(index, 1);
                let equal = if get_dimension(arena, a).is_boolean() {
                    value!(self.boolean(a)) == value!(self.boolean(b))
                } else if get_dimension(arena, a).is_point() {
                    value!(self.point(a)) == value!(self.point(b))
                } else {
                    let x = value!(self.scalar(a));
                    let y = value!(self.scalar(b));
                    approximately_equal(x, y)
                };
                done(equal == (kind == Equal))
            }
            Less | LessOrEqual | Greater | GreaterOrEqual => {
                let a = value!(self.real(index + 1));
                let b = value!(self.real(self.child(index, 1)));
                done(match kind {
                    Less => a < b,
                    LessOrEqual => a <= b,
                    Greater => a > b,
                    _ => a >= b,
                })
            }
            LogicalNot => done(!value!(self.boolean(index + 1))),
            LogicalAnd | LogicalOr | LogicalXor | LogicalNand | LogicalNor => {
                let a = value!(self.boolean(index + 1));
                let b = value!(self.boolean(self.child(index, 1)));
                done(match kind {
                    LogicalAnd => a && b,
                    LogicalOr => a || b,
                    LogicalXor => a != b,
                    LogicalNand => !(a && b),
                    _ => !(a || b),
                })
            }
            Parenthesis => self.boolean(index + 1),
            Piecewise => {
                let branch = value!(self.piecewise_branch(index));
                self.boolean(branch)
            }
            Dependency => {
                value!(self.dependencies_hold(self.child(index, 1)));
                self.boolean(index + 1)
            }
            List => match self.context.list_index() {
                Some(i) if i < arena.child_count(index) => {
                    let previous = self.context.replace_list_index(None);
                    let result = self.boolean(self.child(index, i));
                    self.context.replace_list_index(previous);
                    result
                }
                _ => Ok(Outcome::Undefined),
            },
            ListElement => {
                let position = value!(self.element_position(index));
                let previous = self.context.replace_list_index(Some(position));
                let result = self.boolean(index + 1);
                self.context.replace_list_index(previous);
                result
            }
            Undefined => Ok(Outcome::Undefined),
            NonReal => Ok(Outcome::NonReal),
            Forbidden => Ok(Outcome::Forbidden),
            _ => Ok(Outcome::Undefined),
        }
    }

    /// The current point of a point-valued subtree, as real coordinates.
    pub(crate) fn point(&mut self, index: usize) -> Approx<(T, T)> {
        let mut coordinates = [T::zero(); 2];
        for (k, coordinate) in coordinates.iter_mut().enumerate() {
            let previous = self.context.replace_point_index(Some(k));
            let result = self.real(index);
            self.context.replace_point_index(previous);
            *coordinate = value!(result);
        }
        Ok(Outcome::Value((coordinates[0], coordinates[1])))
    }
}

/// Floor after rounding values within `ε` of an integer; `ceil` through
/// `-floor(-x)`.
fn floor_within_epsilon<T: Precision>(x: T, ceil: bool) -> T {
    let x = if ceil { -x } else { x };
    let rounded = x.round();
    let floor = if (x - rounded).abs() <= T::EPSILON * x.abs().max(T::one()) {
        rounded
    } else {
        x.floor()
    };
    if ceil { -floor } else { floor }
}

/// Generalized binomial coefficient with integer `k`.
fn binomial<T: Precision>(n: T, k: i64) -> T {
    if k < 0 {
        return T::nan();
    }
    if is_integer(n) && n >= T::zero() && T::from_i64(k) > n {
        return T::zero();
    }
    let mut result = T::one();
    for i in 0..k {
        result = result * (n - T::from_i64(i)) / T::from_i64(k - i);
        if !result.is_finite() {
            break;
        }
    }
    if is_integer(n) { result.round() } else { result }
}

fn approximately_equal<T: Precision>(a: C<T>, b: C<T>) -> bool {
    let difference = (a - b).norm();
    difference <= T::EPSILON_LAX * a.norm().max(b.norm())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_floor_within_epsilon() {
        assert_eq!(floor_within_epsilon(2.9999999999999996f64, false), 3.0);
        assert_eq!(floor_within_epsilon(2.5f64, false), 2.0);
        assert_eq!(floor_within_epsilon(2.5f64, true), 3.0);
        assert_eq!(floor_within_epsilon(-2.5f64, false), -3.0);
    }

    #[test]
    fn test_binomial() {
        assert_eq!(binomial(5.0f64, 2), 10.0);
        assert_eq!(binomial(3.0f64, 5), 0.0);
        assert_eq!(binomial(0.5f64, 2), -0.125);
        assert!(binomial(5.0f64, -1).is_nan());
    }
}
