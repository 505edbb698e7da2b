//! Dense complex matrices and the linear algebra behind `det`, `inverse`,
//! `ref` and `rref`.

use num_traits::{One, Zero};

use super::complex::{self, C};
use super::evaluator::Approximator;
use super::{Approx, Outcome, value};
use crate::Vec;
use crate::dimension::get_dimension;
use crate::precision::Precision;
use crate::tree::NodeKind;

/// Row-major matrix of complex entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T: Precision> {
    pub rows: usize,
    pub cols: usize,
    pub entries: Vec<C<T>>,
}

impl<T: Precision> Matrix<T> {
    pub fn new(rows: usize, cols: usize, entries: Vec<C<T>>) -> Self {
        debug_assert_eq!(entries.len(), rows * cols);
        Self {
            rows,
            cols,
            entries,
        }
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::new(rows, cols, vec![C::zero(); rows * cols])
    }

    pub fn identity(n: usize) -> Self {
        let mut matrix = Self::zeros(n, n);
        for i in 0..n {
            *matrix.at_mut(i, i) = C::one();
        }
        matrix
    }

    pub fn at(&self, row: usize, col: usize) -> C<T> {
        self.entries[row * self.cols + col]
    }

    pub fn at_mut(&mut self, row: usize, col: usize) -> &mut C<T> {
        &mut self.entries[row * self.cols + col]
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    pub fn is_vector(&self) -> bool {
        self.rows == 1 || self.cols == 1
    }

    pub fn has_undefined(&self) -> bool {
        self.entries.iter().any(|entry| complex::is_nan(*entry))
    }

    pub fn add(&self, other: &Self) -> Option<Self> {
        if self.rows != other.rows || self.cols != other.cols {
            return None;
        }
        let entries = self
            .entries
            .iter()
            .zip(&other.entries)
            .map(|(a, b)| complex::add(*a, *b))
            .collect();
        Some(Self::new(self.rows, self.cols, entries))
    }

    pub fn scale(&self, factor: C<T>) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|entry| complex::mul(*entry, factor))
            .collect();
        Self::new(self.rows, self.cols, entries)
    }

    pub fn multiply(&self, other: &Self) -> Option<Self> {
        if self.cols != other.rows {
            return None;
        }
        let mut result = Self::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            for j in 0..other.cols {
                let mut sum = C::zero();
                for k in 0..self.cols {
                    sum = complex::add(sum, complex::mul(self.at(i, k), other.at(k, j)));
                }
                *result.at_mut(i, j) = sum;
            }
        }
        Some(result)
    }

    pub fn transpose(&self) -> Self {
        let mut result = Self::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                *result.at_mut(j, i) = self.at(i, j);
            }
        }
        result
    }

    pub fn trace(&self) -> Option<C<T>> {
        if !self.is_square() {
            return None;
        }
        Some((0..self.rows).fold(C::zero(), |sum, i| complex::add(sum, self.at(i, i))))
    }

    /// Euclidean norm of a row or column vector.
    pub fn norm(&self) -> Option<T> {
        if !self.is_vector() {
            return None;
        }
        let sum = self
            .entries
            .iter()
            .fold(T::zero(), |sum, entry| sum + entry.norm_sqr());
        Some(sum.sqrt())
    }

    pub fn dot(&self, other: &Self) -> Option<C<T>> {
        if !self.is_vector() || self.entries.len() != other.entries.len() {
            return None;
        }
        Some(
            self.entries
                .iter()
                .zip(&other.entries)
                .fold(C::zero(), |sum, (a, b)| complex::add(sum, complex::mul(*a, *b))),
        )
    }

    /// Cross product of two 3-vectors, shaped like `self`.
    pub fn cross(&self, other: &Self) -> Option<Self> {
        if self.entries.len() != 3 || other.entries.len() != 3 || !self.is_vector() {
            return None;
        }
        let a = &self.entries;
        let b = &other.entries;
        let entries = vec![
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ];
        Some(Self::new(self.rows, self.cols, entries))
    }

    /// Gaussian elimination with partial pivoting.
    ///
    /// Pivot rows are normalized to a leading 1. With `reduced`, entries
    /// above each pivot are eliminated too. Returns the echelon form and
    /// the determinant of the leading square block (meaningful for square
    /// matrices only).
    pub fn echelon(&self, reduced: bool) -> (Self, C<T>) {
        let mut m = self.clone();
        let mut determinant = C::one();
        let mut pivot_row = 0;
        for col in 0..m.cols {
            if pivot_row >= m.rows {
                break;
            }
            let best = (pivot_row..m.rows).max_by(|&a, &b| {
                m.at(a, col)
                    .norm()
                    .partial_cmp(&m.at(b, col).norm())
                    .unwrap_or(core::cmp::Ordering::Equal)
            });
            let Some(best) = best else { break };
            let pivot = m.at(best, col);
            if pivot.norm() <= T::EPSILON {
                if col < m.rows {
                    determinant = C::zero();
                }
                continue;
            }
            if best != pivot_row {
                m.swap_rows(best, pivot_row);
                determinant = -determinant;
            }
            determinant = determinant * pivot;
            for j in 0..m.cols {
                let value = m.at(pivot_row, j) / pivot;
                *m.at_mut(pivot_row, j) = value;
            }
            let first = if reduced { 0 } else { pivot_row + 1 };
            for i in first..m.rows {
                if i == pivot_row {
                    continue;
                }
                let factor = m.at(i, col);
                if factor.is_zero() {
                    continue;
                }
                for j in 0..m.cols {
                    let value = m.at(i, j) - factor * m.at(pivot_row, j);
                    *m.at_mut(i, j) = snap(value);
                }
            }
            pivot_row += 1;
        }
        if pivot_row < m.rows.min(m.cols) {
            determinant = C::zero();
        }
        (m, determinant)
    }

    pub fn determinant(&self) -> Option<C<T>> {
        if !self.is_square() {
            return None;
        }
        Some(self.echelon(false).1)
    }

    /// Inverse through Gauss-Jordan on `[A | I]`; `None` when singular.
    pub fn inverse(&self) -> Option<Self> {
        if !self.is_square() {
            return None;
        }
        let n = self.rows;
        let mut augmented = Self::zeros(n, 2 * n);
        for i in 0..n {
            for j in 0..n {
                *augmented.at_mut(i, j) = self.at(i, j);
            }
            *augmented.at_mut(i, n + i) = C::one();
        }
        let (reduced, determinant) = augmented.echelon(true);
        if determinant.is_zero() {
            return None;
        }
        let mut result = Self::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                *result.at_mut(i, j) = reduced.at(i, n + j);
            }
        }
        Some(result)
    }

    /// `self^n`, negative exponents through the inverse.
    pub fn power(&self, n: i64) -> Option<Self> {
        if !self.is_square() {
            return None;
        }
        let mut base = if n < 0 { self.inverse()? } else { self.clone() };
        let mut exponent = n.unsigned_abs();
        let mut result = Self::identity(self.rows);
        while exponent > 0 {
            if exponent & 1 == 1 {
                result = result.multiply(&base)?;
            }
            exponent >>= 1;
            if exponent > 0 {
                base = base.multiply(&base)?;
            }
        }
        Some(result)
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        for j in 0..self.cols {
            self.entries.swap(a * self.cols + j, b * self.cols + j);
        }
    }
}

fn snap<T: Precision>(mut value: C<T>) -> C<T> {
    if value.re.abs() <= T::EPSILON {
        value.re = T::zero();
    }
    if value.im.abs() <= T::EPSILON {
        value.im = T::zero();
    }
    value
}


impl<T: Precision> Approximator<'_, '_, T> {
    /// Approximate a matrix-valued subtree.
    pub(crate) fn matrix(&mut self, index: usize) -> Approx<Matrix<T>> {
        self.context.budget.enter()?;
        let result = self.matrix_inner(index);
        self.context.budget.leave();
        Ok(match result? {
            Outcome::Value(m) if m.has_undefined() => Outcome::Undefined,
            other => other,
        })
    }

    fn is_matrix(&self, index: usize) -> bool {
        get_dimension(self.arena, index).is_matrix()
    }

    fn matrix_inner(&mut self, index: usize) -> Approx<Matrix<T>> {
        let arena = self.arena;
        let node = arena.node(index);
        let done = |m: Option<Matrix<T>>| {
            Ok(match m {
                Some(m) => Outcome::Value(m),
                None => Outcome::Undefined,
            })
        };
        match node.kind {
            NodeKind::Matrix => {
                let (rows, cols) = node.matrix_size().unwrap_or((0, 0));
                let mut entries = Vec::with_capacity(rows as usize * cols as usize);
                for child in arena.children(index) {
                    entries.push(value!(self.scalar(child)));
                }
                done(Some(Matrix::new(rows as usize, cols as usize, entries)))
            }
            NodeKind::Add => {
                let mut sum: Option<Matrix<T>> = None;
                for child in arena.children(index) {
                    let term = value!(self.matrix(child));
                    sum = Some(match sum {
                        None => term,
                        Some(sum) => match sum.add(&term) {
                            Some(m) => m,
                            None => return Ok(Outcome::Undefined),
                        },
                    });
                }
                done(sum)
            }
            NodeKind::Sub => {
                let a = value!(self.matrix(index + 1));
                let b = value!(self.matrix(self.child(index, 1)));
                done(a.add(&b.scale(complex::real(-T::one()))))
            }
            NodeKind::Mult => {
                let mut scalar = complex::one();
                let mut product: Option<Matrix<T>> = None;
                for child in arena.children(index) {
                    if self.is_matrix(child) {
                        let factor = value!(self.matrix(child));
                        product = Some(match product {
                            None => factor,
                            Some(product) => match product.multiply(&factor) {
                                Some(m) => m,
                                None => return Ok(Outcome::Undefined),
                            },
                        });
                    } else {
                        scalar = complex::mul(scalar, value!(self.scalar(child)));
                    }
                }
                done(product.map(|m| m.scale(scalar)))
            }
            NodeKind::Div => {
                let m = value!(self.matrix(index + 1));
                let d = value!(self.scalar(self.child(index, 1)));
                if complex::is_zero(d) {
                    return Ok(Outcome::Undefined);
                }
                done(Some(m.scale(complex::one::<T>() / d)))
            }
            NodeKind::Opposite => {
                let m = value!(self.matrix(index + 1));
                done(Some(m.scale(complex::real(-T::one()))))
            }
            NodeKind::Parenthesis => self.matrix(index + 1),
            NodeKind::Pow | NodeKind::PowMatrix => {
                let m = value!(self.matrix(index + 1));
                let n = value!(self.integer(self.child(index, 1)));
                done(m.power(n))
            }
            NodeKind::Inverse => done(value!(self.matrix(index + 1)).inverse()),
            NodeKind::Transpose => done(Some(value!(self.matrix(index + 1)).transpose())),
            NodeKind::Identity => {
                let n = value!(self.integer(index + 1));
                if !(1..=u8::MAX as i64).contains(&n) {
                    return Ok(Outcome::Undefined);
                }
                done(Some(Matrix::identity(n as usize)))
            }
            NodeKind::Ref | NodeKind::Rref => {
                let m = value!(self.matrix(index + 1));
                done(Some(m.echelon(node.kind == NodeKind::Rref).0))
            }
            NodeKind::Cross => {
                let a = value!(self.matrix(index + 1));
                let b = value!(self.matrix(self.child(index, 1)));
                done(a.cross(&b))
            }
            NodeKind::Dim => {
                let m = value!(self.matrix(index + 1));
                let entries = vec![
                    complex::real(T::from_i64(m.rows as i64)),
                    complex::real(T::from_i64(m.cols as i64)),
                ];
                done(Some(Matrix::new(1, 2, entries)))
            }
            NodeKind::Piecewise => {
                let branch = value!(self.piecewise_branch(index));
                self.matrix(branch)
            }
            NodeKind::Dependency => {
                value!(self.dependencies_hold(self.child(index, 1)));
                self.matrix(index + 1)
            }
            NodeKind::Undefined => Ok(Outcome::Undefined),
            NodeKind::Forbidden => Ok(Outcome::Forbidden),
            _ => Ok(Outcome::Undefined),
        }
    }
}
