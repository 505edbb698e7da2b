use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::complex::C;
use super::random::RandomContext;
use crate::interrupt::{Aborted, Budget};
use crate::precision::Precision;
use crate::units::AngleUnit;

/// How complex results are accepted and displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ComplexFormat {
    /// Results with an imaginary part are `NonReal`.
    #[default]
    Real,
    Cartesian,
    Polar,
}

/// Most locally bound variables alive at once (nested sums, sequences...).
pub const MAX_LOCAL_VARIABLES: usize = 16;

/// Evaluation-time state of one top-level approximation.
///
/// Created per evaluation and discarded at its end; random draws cached in
/// it are only consistent within that evaluation.
#[derive(Debug, Clone)]
pub struct Context<T: Precision> {
    pub angle_unit: AngleUnit,
    pub complex_format: ComplexFormat,
    /// Innermost binding last; `Variable(0)` is the innermost.
    variables: SmallVec<[C<T>; 4]>,
    list_index: Option<usize>,
    point_index: Option<usize>,
    pub(crate) random: RandomContext,
    pub(crate) budget: Budget,
}

impl<T: Precision> Context<T> {
    pub fn new(
        angle_unit: AngleUnit,
        complex_format: ComplexFormat,
        random_seed: u64,
        budget: Budget,
    ) -> Self {
        Self {
            angle_unit,
            complex_format,
            variables: SmallVec::new(),
            list_index: None,
            point_index: None,
            random: RandomContext::new(random_seed),
            budget,
        }
    }

    pub fn is_real_mode(&self) -> bool {
        self.complex_format == ComplexFormat::Real
    }

    pub fn variable(&self, id: u8) -> Option<C<T>> {
        let depth = self.variables.len();
        let id = id as usize;
        (id < depth).then(|| self.variables[depth - 1 - id])
    }

    /// Bind a new innermost variable. Returns `false` past the depth limit.
    pub(crate) fn push_variable(&mut self, value: C<T>) -> bool {
        if self.variables.len() >= MAX_LOCAL_VARIABLES {
            return false;
        }
        self.variables.push(value);
        true
    }

    pub(crate) fn set_innermost(&mut self, value: C<T>) {
        if let Some(last) = self.variables.last_mut() {
            *last = value;
        }
    }

    pub(crate) fn pop_variable(&mut self) {
        self.variables.pop();
    }

    pub fn list_index(&self) -> Option<usize> {
        self.list_index
    }

    pub fn point_index(&self) -> Option<usize> {
        self.point_index
    }

    /// Swap the current list index, returning the previous one.
    pub(crate) fn replace_list_index(&mut self, index: Option<usize>) -> Option<usize> {
        core::mem::replace(&mut self.list_index, index)
    }

    pub(crate) fn replace_point_index(&mut self, index: Option<usize>) -> Option<usize> {
        core::mem::replace(&mut self.point_index, index)
    }

    pub(crate) fn poll(&mut self) -> Result<(), Aborted> {
        self.budget.poll()
    }

    pub(crate) fn reserve(&self, count: usize) -> Result<usize, Aborted> {
        self.budget.reserve(count)
    }

    pub fn iterations(&self) -> u64 {
        self.budget.iterations()
    }
}

impl<T: Precision> Default for Context<T> {
    /// Degrees, real mode, seed 0 and an unlimited budget.
    fn default() -> Self {
        Self::new(
            AngleUnit::default(),
            ComplexFormat::default(),
            0,
            Budget::unlimited(),
        )
    }
}
