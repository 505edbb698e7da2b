use core::fmt;

use ecow::EcoString;

use crate::tree::ArenaError;

/// Why symbol substitution or projection stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    Arena(ArenaError),
    /// `name` resolves back to itself through its own definitions.
    CircularDefinition { name: EcoString },
}

impl fmt::Display for ProjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionError::Arena(error) => write!(f, "{}", error),
            ProjectionError::CircularDefinition { name } => {
                write!(f, "Circular definition of '{}'", name)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ProjectionError {}

impl From<ArenaError> for ProjectionError {
    fn from(error: ArenaError) -> Self {
        ProjectionError::Arena(error)
    }
}
