//! Public error type of the engine.
//!
//! Only conditions that stop an operation are errors. `Undefined`,
//! `NonReal` and `Forbidden` results are ordinary
//! [`Outcome`](crate::approximation::Outcome) values, and a failed
//! reduction is reported next to its best-effort result.

use ecow::EcoString;

use crate::interrupt::{AbortReason, Aborted};
use crate::parser::{ParseError, ParseErrorKind};
use crate::projection::ProjectionError;
use crate::reduction::ReductionFailure;
use crate::tree::{ArenaError, DecodeError};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Malformed input, reported before any evaluation.
    #[error("{0}")]
    Syntax(ParseError),

    #[error("Circular definition of '{name}'")]
    CircularDefinition { name: EcoString },

    /// The arena filled up. The engine rolled it back.
    #[error("Tree arena exhausted (capacity: {capacity} nodes)")]
    ArenaExhausted { capacity: usize },

    /// Cancelled by the host or out of budget. The engine rolled the arena back.
    #[error("Computation aborted: {0}")]
    ComputationAborted(AbortReason),

    #[error("Invalid stored tree: {0}")]
    Decode(DecodeError),

    #[error("Tree handle used after invalidation")]
    InvalidHandle,
}

impl From<ParseError> for Error {
    fn from(error: ParseError) -> Self {
        match error.kind {
            ParseErrorKind::Arena(error) => error.into(),
            _ => Error::Syntax(error),
        }
    }
}

impl From<ArenaError> for Error {
    fn from(error: ArenaError) -> Self {
        match error {
            ArenaError::Exhausted { capacity } => Error::ArenaExhausted { capacity },
            ArenaError::StaleHandle | ArenaError::InvalidMove { .. } => Error::InvalidHandle,
        }
    }
}

impl From<Aborted> for Error {
    fn from(aborted: Aborted) -> Self {
        Error::ComputationAborted(aborted.reason)
    }
}

impl From<ProjectionError> for Error {
    fn from(error: ProjectionError) -> Self {
        match error {
            ProjectionError::Arena(error) => error.into(),
            ProjectionError::CircularDefinition { name } => Error::CircularDefinition { name },
        }
    }
}

impl From<DecodeError> for Error {
    fn from(error: DecodeError) -> Self {
        Error::Decode(error)
    }
}

impl Error {
    /// The fatal part of a reduction failure. Overflow is not fatal: the
    /// unreduced tree is still evaluated.
    pub(crate) fn from_reduction(failure: &ReductionFailure) -> Option<Error> {
        match failure {
            ReductionFailure::Overflow => None,
            ReductionFailure::Aborted(reason) => Some(Error::ComputationAborted(*reason)),
            ReductionFailure::Arena(error) => Some(error.clone().into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToString;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_arena_errors_map_to_public_errors() {
        assert_eq!(
            Error::from(ArenaError::Exhausted { capacity: 8 }),
            Error::ArenaExhausted { capacity: 8 }
        );
        assert_eq!(Error::from(ArenaError::StaleHandle), Error::InvalidHandle);
    }

    #[test]
    fn test_overflow_is_not_fatal() {
        assert_eq!(Error::from_reduction(&ReductionFailure::Overflow), None);
        assert_eq!(
            Error::from_reduction(&ReductionFailure::Aborted(AbortReason::Cancelled)),
            Some(Error::ComputationAborted(AbortReason::Cancelled))
        );
    }

    #[test]
    fn test_messages() {
        let error = Error::CircularDefinition { name: "a".into() };
        assert_eq!(error.to_string(), "Circular definition of 'a'");
        let error = Error::ComputationAborted(AbortReason::IterationLimit { limit: 5 });
        assert_eq!(error.to_string(), "Computation aborted: iteration limit of 5 exceeded");
    }
}
