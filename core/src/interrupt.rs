//! Cooperative interruption.
//!
//! Long computations poll a [`Budget`] at loop boundaries: once per
//! sum/product/list-element iteration, once per reduction-pass node and
//! once per integral panel. The budget trips on host cancellation, on an
//! exhausted iteration count, or on excessive recursion depth.

use alloc::rc::Rc;
use core::cell::Cell;
use core::fmt;

use tracing::warn;

/// Host-side cancellation flag, shared by cloning.
///
/// # Example
///
/// ```
/// use abacus_core::interrupt::CancellationToken;
///
/// let token = CancellationToken::new();
/// let host_side = token.clone();
/// host_side.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Rc<Cell<bool>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.get()
    }

    /// Clear a previous cancellation so the next computation can run.
    pub fn reset(&self) {
        self.flag.set(false);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    Cancelled,
    IterationLimit { limit: u64 },
    DepthLimit { depth: usize, max_depth: usize },
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Cancelled => write!(f, "cancelled"),
            AbortReason::IterationLimit { limit } => {
                write!(f, "iteration limit of {} exceeded", limit)
            }
            AbortReason::DepthLimit { depth, max_depth } => {
                write!(f, "depth {} exceeds maximum of {}", depth, max_depth)
            }
        }
    }
}

/// A computation stopped at a polled checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aborted {
    pub reason: AbortReason,
}

impl fmt::Display for Aborted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Computation aborted: {}", self.reason)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Aborted {}

/// Upper bound on elements allocated ahead of their evaluation.
const MAX_PREALLOCATION: usize = 1 << 12;

/// Iteration and depth allowance of one top-level computation.
#[derive(Debug, Clone)]
pub struct Budget {
    token: CancellationToken,
    max_iterations: u64,
    iterations: u64,
    max_depth: usize,
    depth: usize,
}

impl Budget {
    pub fn new(token: CancellationToken, max_iterations: u64, max_depth: usize) -> Self {
        Self {
            token,
            max_iterations,
            iterations: 0,
            max_depth,
            depth: 0,
        }
    }

    /// A budget that never trips, for standalone helpers and tests.
    pub fn unlimited() -> Self {
        Self::new(CancellationToken::new(), u64::MAX, usize::MAX)
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Count one iteration and check for cancellation.
    pub fn poll(&mut self) -> Result<(), Aborted> {
        self.iterations += 1;
        if self.token.is_cancelled() {
            warn!(iterations = self.iterations, "computation cancelled");
            return Err(Aborted {
                reason: AbortReason::Cancelled,
            });
        }
        if self.iterations > self.max_iterations {
            warn!(limit = self.max_iterations, "iteration limit reached");
            return Err(Aborted {
                reason: AbortReason::IterationLimit {
                    limit: self.max_iterations,
                },
            });
        }
        Ok(())
    }

    /// Check that `count` more iterations fit in the remaining allowance
    /// and return a capacity that is safe to preallocate for them.
    pub fn reserve(&self, count: usize) -> Result<usize, Aborted> {
        let remaining = self.max_iterations.saturating_sub(self.iterations);
        if count as u64 > remaining {
            warn!(count, limit = self.max_iterations, "iteration limit reached");
            return Err(Aborted {
                reason: AbortReason::IterationLimit {
                    limit: self.max_iterations,
                },
            });
        }
        Ok(count.min(MAX_PREALLOCATION))
    }

    /// Enter one recursion level. Pair with [`Budget::leave`].
    pub fn enter(&mut self) -> Result<(), Aborted> {
        self.depth += 1;
        if self.depth > self.max_depth {
            warn!(depth = self.depth, max_depth = self.max_depth, "depth limit reached");
            let reason = AbortReason::DepthLimit {
                depth: self.depth,
                max_depth: self.max_depth,
            };
            self.depth -= 1;
            return Err(Aborted { reason });
        }
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cancellation_is_shared() {
        let token = CancellationToken::new();
        let mut budget = Budget::new(token.clone(), 100, 10);
        assert_eq!(budget.poll(), Ok(()));
        token.cancel();
        assert_eq!(
            budget.poll(),
            Err(Aborted {
                reason: AbortReason::Cancelled
            })
        );
    }

    #[test]
    fn test_iteration_limit() {
        let mut budget = Budget::new(CancellationToken::new(), 2, 10);
        assert!(budget.poll().is_ok());
        assert!(budget.poll().is_ok());
        assert_eq!(
            budget.poll().map_err(|e| e.reason),
            Err(AbortReason::IterationLimit { limit: 2 })
        );
    }

    #[test]
    fn test_reserve_rejects_counts_beyond_the_allowance() {
        let mut budget = Budget::new(CancellationToken::new(), 10, 10);
        assert_eq!(budget.reserve(10), Ok(10));
        budget.poll().unwrap();
        assert_eq!(
            budget.reserve(10).map_err(|e| e.reason),
            Err(AbortReason::IterationLimit { limit: 10 })
        );
        assert_eq!(Budget::unlimited().reserve(usize::MAX), Ok(MAX_PREALLOCATION));
    }

    #[test]
    fn test_depth_limit() {
        let mut budget = Budget::new(CancellationToken::new(), 100, 1);
        assert!(budget.enter().is_ok());
        assert_eq!(
            budget.enter().map_err(|e| e.reason),
            Err(AbortReason::DepthLimit {
                depth: 2,
                max_depth: 1
            })
        );
        budget.leave();
        assert!(budget.enter().is_ok());
    }
}
