//! Elementwise list evaluation and list statistics.

use super::complex::{self, C};
use super::evaluator::Approximator;
use super::{Approx, Outcome, value};
use crate::Vec;
use crate::dimension::list_length;
use crate::precision::Precision;
use crate::tree::NodeKind;

impl<T: Precision> Approximator<'_, '_, T> {
    /// Evaluate `index` with the list index set to `element`, restoring the
    /// previous index afterwards.
    fn at_element<V>(
        &mut self,
        element: Option<usize>,
        evaluate: impl FnOnce(&mut Self) -> Approx<V>,
    ) -> Approx<V> {
        let previous = self.context.replace_list_index(element);
        let result = evaluate(self);
        self.context.replace_list_index(previous);
        result
    }

    /// Every element of a numeric list subtree. Any undefined element makes
    /// the whole list undefined, which is what statistics need.
    pub(crate) fn list_values(&mut self, index: usize) -> Approx<Vec<C<T>>> {
        let Some(length) = list_length(self.arena, index) else {
            return Ok(Outcome::Undefined);
        };
        let mut values = Vec::with_capacity(self.context.reserve(length)?);
        for element in 0..length {
            self.context.poll()?;
            let v = value!(self.at_element(Some(element), |this| this.scalar(index)));
            values.push(v);
        }
        Ok(Outcome::Value(values))
    }

    fn real_values(&mut self, index: usize) -> Approx<Vec<T>> {
        let values = value!(self.list_values(index));
        if values.iter().any(|v| !complex::is_real(*v)) {
            return Ok(Outcome::Undefined);
        }
        Ok(Outcome::Value(values.into_iter().map(|v| v.re).collect()))
    }

    /// The current element of a list-producing node, per the list index.
    pub(crate) fn list_element(&mut self, index: usize) -> Approx<C<T>> {
        use NodeKind::*;
        let Some(element) = self.context.list_index() else {
            return Ok(Outcome::Undefined);
        };
        let arena = self.arena;
        match arena.kind(index) {
            List => {
                if element >= arena.child_count(index) {
                    return Ok(Outcome::Undefined);
                }
                let child = self.child(index, element);
                self.at_element(None, |this| this.scalar(child))
            }
            ListSequence => {
                let body = index + 1;
                let length = value!(self.integer(self.child(index, 1)));
                if element as i64 >= length {
                    return Ok(Outcome::Undefined);
                }
                let k = complex::real(T::from_i64(element as i64 + 1));
                if !self.context.push_variable(k) {
                    return Ok(Outcome::Undefined);
                }
                let result = self.at_element(None, |this| this.scalar(body));
                self.context.pop_variable();
                result
            }
            ListSlice => {
                let start_index = self.child(index, 1);
                let start = value!(self.at_element(None, |this| this.integer(start_index)));
                let source_length = list_length(arena, index + 1).unwrap_or(0);
                let position = (start.max(1) - 1) as usize + element;
                match list_length(arena, index) {
                    Some(length) if element < length && position < source_length => {
                        self.at_element(Some(position), |this| this.scalar(index + 1))
                    }
                    _ => Ok(Outcome::Undefined),
                }
            }
            ListSort => {
                let mut values = value!(self.at_element(None, |this| this.real_values(index + 1)));
                if element >= values.len() {
                    return Ok(Outcome::Undefined);
                }
                values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(core::cmp::Ordering::Equal));
                Ok(Outcome::Value(complex::real(values[element])))
            }
            RandIntNoRep => {
                let node = arena.node(index);
                let a = value!(self.at_element(None, |this| this.real(index + 1))).into_f64();
                let b = value!(self.at_element(None, |this| this.real(arena.child(index, 1))));
                let n = value!(self.at_element(None, |this| this.integer(arena.child(index, 2))));
                let Ok(count) = usize::try_from(n) else {
                    return Ok(Outcome::Undefined);
                };
                let seed = node.seed().unwrap_or(0);
                let context = &mut *self.context;
                let draw = context.random.rand_int_no_rep(
                    &mut context.budget,
                    seed,
                    index,
                    a,
                    b.into_f64(),
                    count,
                    element,
                )?;
                match draw {
                    Some(v) => Ok(Outcome::Value(complex::real(T::from_f64(v)))),
                    None => Ok(Outcome::Undefined),
                }
            }
            _ => Ok(Outcome::Undefined),
        }
    }

    /// 0-based position designated by the 1-based index of a `ListElement`.
    pub(crate) fn element_position(&mut self, index: usize) -> Approx<usize> {
        let list = index + 1;
        let k = value!(self.at_element(None, |this| this.integer(this.child(index, 1))));
        let length = list_length(self.arena, list).unwrap_or(0);
        if k < 1 || k as usize > length {
            return Ok(Outcome::Undefined);
        }
        Ok(Outcome::Value(k as usize - 1))
    }

    /// `list(k)`, 1-based.
    pub(crate) fn indexed_element(&mut self, index: usize) -> Approx<C<T>> {
        let position = value!(self.element_position(index));
        self.at_element(Some(position), |this| this.scalar(index + 1))
    }

    pub(crate) fn statistic(&mut self, index: usize) -> Approx<C<T>> {
        use NodeKind::*;
        let kind = self.arena.kind(index);
        let list = index + 1;
        let done = |v: C<T>| Ok(Outcome::Value(v));
        match kind {
            ListSum | ListProduct => {
                let values = value!(self.at_element(None, |this| this.list_values(list)));
                let result = if kind == ListSum {
                    values.iter().fold(complex::zero(), |acc, v| complex::add(acc, *v))
                } else {
                    values.iter().fold(complex::one(), |acc, v| complex::mul(acc, *v))
                };
                done(result)
            }
            Min | Max | Median => {
                let mut values = value!(self.at_element(None, |this| this.real_values(list)));
                if values.is_empty() {
                    return Ok(Outcome::Undefined);
                }
                values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(core::cmp::Ordering::Equal));
                let n = values.len();
                let result = match kind {
                    Min => values[0],
                    Max => values[n - 1],
                    _ if n % 2 == 1 => values[n / 2],
                    _ => (values[n / 2 - 1] + values[n / 2]) / T::from_f64(2.0),
                };
                done(complex::real(result))
            }
            Mean | Variance | StdDev | SampleStdDev => {
                let values = value!(self.at_element(None, |this| this.real_values(list)));
                let moments = Moments::of(&values);
                let result = match kind {
                    Mean => moments.mean(),
                    Variance => moments.variance(),
                    StdDev => moments.variance().map(|v| v.sqrt()),
                    _ => moments.sample_variance().map(|v| v.sqrt()),
                };
                match result {
                    Some(v) => done(complex::real(v)),
                    None => Ok(Outcome::Undefined),
                }
            }
            _ => Ok(Outcome::Undefined),
        }
    }
}

/// Running sums for mean and variance.
struct Moments<T> {
    count: usize,
    sum: T,
    sum_of_squares: T,
}

impl<T: Precision> Moments<T> {
    fn of(values: &[T]) -> Self {
        let mut moments = Moments {
            count: 0,
            sum: T::zero(),
            sum_of_squares: T::zero(),
        };
        for v in values {
            moments.count += 1;
            moments.sum = moments.sum + *v;
            moments.sum_of_squares = moments.sum_of_squares + *v * *v;
        }
        moments
    }

    fn mean(&self) -> Option<T> {
        (self.count > 0).then(|| self.sum / T::from_i64(self.count as i64))
    }

    /// Population variance `E[x²] - E[x]²`, clamped at zero.
    fn variance(&self) -> Option<T> {
        let mean = self.mean()?;
        let n = T::from_i64(self.count as i64);
        Some((self.sum_of_squares / n - mean * mean).max(T::zero()))
    }

    fn sample_variance(&self) -> Option<T> {
        if self.count < 2 {
            return None;
        }
        let n = T::from_i64(self.count as i64);
        Some(self.variance()? * n / (n - T::one()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_moments() {
        let moments = Moments::of(&[2.0f64, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(moments.mean(), Some(5.0));
        assert_eq!(moments.variance(), Some(4.0));
        assert_eq!(Moments::<f64>::of(&[1.0]).sample_variance(), None);
        assert_eq!(Moments::<f64>::of(&[]).mean(), None);
    }
}
