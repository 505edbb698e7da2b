//! Definite integrals by adaptive Simpson quadrature.

use super::complex::{self, C};
use super::evaluator::Approximator;
use super::{Approx, Outcome, value};
use crate::precision::Precision;

/// Deepest bisection of a panel.
const MAX_DEPTH: u32 = 14;

/// One Simpson panel: bounds, midpoint and the three samples.
#[derive(Clone, Copy)]
struct Panel<T: Precision> {
    a: T,
    b: T,
    fa: C<T>,
    fm: C<T>,
    fb: C<T>,
    estimate: C<T>,
}

fn simpson<T: Precision>(a: T, b: T, fa: C<T>, fm: C<T>, fb: C<T>) -> C<T> {
    let four = complex::real(T::from_f64(4.0));
    (fa + four * fm + fb) * ((b - a) / T::from_f64(6.0))
}

impl<T: Precision> Approximator<'_, '_, T> {
    /// `int(body, x, a, b)`: the body binds `Variable(0)`.
    pub(crate) fn integral(&mut self, index: usize) -> Approx<C<T>> {
        let a = value!(self.real(index + 1));
        let b = value!(self.real(self.child(index, 1)));
        if !a.is_finite() || !b.is_finite() {
            return Ok(Outcome::Undefined);
        }
        if a == b {
            return Ok(Outcome::Value(complex::zero()));
        }
        if !self.context.push_variable(complex::zero()) {
            return Ok(Outcome::Undefined);
        }
        let result = self.integrate(self.child(index, 2), a, b);
        self.context.pop_variable();
        result
    }

    fn sample(&mut self, body: usize, x: T) -> Approx<C<T>> {
        self.context.set_innermost(complex::real(x));
        self.scalar(body)
    }

    fn integrate(&mut self, body: usize, a: T, b: T) -> Approx<C<T>> {
        let fa = value!(self.sample(body, a));
        let fb = value!(self.sample(body, b));
        let m = (a + b) / T::from_f64(2.0);
        let fm = value!(self.sample(body, m));
        let panel = Panel {
            a,
            b,
            fa,
            fm,
            fb,
            estimate: simpson(a, b, fa, fm, fb),
        };
        let tolerance = T::from_f64(1e-10).max(T::EPSILON_LAX);
        self.refine(body, panel, tolerance, MAX_DEPTH)
    }

    fn refine(&mut self, body: usize, panel: Panel<T>, tolerance: T, depth: u32) -> Approx<C<T>> {
        self.context.poll()?;
        let two = T::from_f64(2.0);
        let m = (panel.a + panel.b) / two;
        let left_m = (panel.a + m) / two;
        let right_m = (m + panel.b) / two;
        let f_left = value!(self.sample(body, left_m));
        let f_right = value!(self.sample(body, right_m));
        let left = Panel {
            a: panel.a,
            b: m,
            fa: panel.fa,
            fm: f_left,
            fb: panel.fm,
            estimate: simpson(panel.a, m, panel.fa, f_left, panel.fm),
        };
        let right = Panel {
            a: m,
            b: panel.b,
            fa: panel.fm,
            fm: f_right,
            fb: panel.fb,
            estimate: simpson(m, panel.b, panel.fm, f_right, panel.fb),
        };
        let refined = left.estimate + right.estimate;
        let error = (refined - panel.estimate).norm();
        if depth == 0 || error <= T::from_f64(15.0) * tolerance {
            // Richardson extrapolation of the two estimates.
            return Ok(Outcome::Value(
                refined + (refined - panel.estimate) / T::from_f64(15.0),
            ));
        }
        let half = tolerance / two;
        let left = value!(self.refine(body, left, half, depth - 1));
        let right = value!(self.refine(body, right, half, depth - 1));
        Ok(Outcome::Value(complex::add(left, right)))
    }
}
