//! Configuration options for the engine.

use serde::{Deserialize, Serialize};

use crate::Vec;
use crate::approximation::ComplexFormat;
use crate::projection::{
    ProjectionContext, ProjectionPolicy, ProjectionStrategy, SymbolicComputation,
};
use crate::render::{FloatMode, RenderOptions};
use crate::tree::DEFAULT_CAPACITY;
use crate::units::display::UnitDisplay;
use crate::units::{AngleUnit, UnitFormat};

/// User-facing calculator settings.
///
/// These are the settings a host persists between sessions, so they
/// serialize to a compact byte form with [`Preferences::to_bytes`].
///
/// # Example
///
/// ```
/// use abacus_core::api::Preferences;
/// use abacus_core::units::AngleUnit;
///
/// let preferences = Preferences {
///     angle_unit: AngleUnit::Radian,
///     ..Preferences::default()
/// };
/// let bytes = preferences.to_bytes().unwrap();
/// assert_eq!(Preferences::from_bytes(&bytes).unwrap(), preferences);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub angle_unit: AngleUnit,
    pub complex_format: ComplexFormat,
    /// Metric or imperial, for automatic unit display.
    pub unit_format: UnitFormat,
    pub unit_display: UnitDisplay,
    pub float_mode: FloatMode,
    /// Between 1 and 14; values outside are clamped when rendering.
    pub significant_digits: u8,
    /// Longest rendered result, in characters.
    pub max_length: usize,
    /// How user symbols and functions are substituted before evaluation.
    pub symbolic_computation: SymbolicComputation,
    /// Exam-mode restrictions.
    pub policy: ProjectionPolicy,
}

impl Default for Preferences {
    fn default() -> Self {
        let render = RenderOptions::default();
        Self {
            angle_unit: AngleUnit::default(),
            complex_format: ComplexFormat::default(),
            unit_format: UnitFormat::default(),
            unit_display: UnitDisplay::default(),
            float_mode: render.float_mode,
            significant_digits: render.significant_digits,
            max_length: render.max_length,
            symbolic_computation: SymbolicComputation::default(),
            policy: ProjectionPolicy::default(),
        }
    }
}

impl Preferences {
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            float_mode: self.float_mode,
            significant_digits: self.significant_digits,
            max_length: self.max_length,
        }
    }

    pub fn projection_context(&self) -> ProjectionContext {
        ProjectionContext {
            complex_format: self.complex_format,
            angle_unit: self.angle_unit,
            strategy: ProjectionStrategy::Default,
            policy: self.policy,
        }
    }

    /// Display strategy for unit results. Automatic display follows
    /// `unit_format`, and exam mode without units forbids them outright.
    pub fn unit_display_strategy(&self) -> UnitDisplay {
        if self.policy.forbid_units {
            return UnitDisplay::Forbidden;
        }
        match (self.unit_display, self.unit_format) {
            (UnitDisplay::AutomaticMetric | UnitDisplay::AutomaticImperial, UnitFormat::Metric) => {
                UnitDisplay::AutomaticMetric
            }
            (
                UnitDisplay::AutomaticMetric | UnitDisplay::AutomaticImperial,
                UnitFormat::Imperial,
            ) => UnitDisplay::AutomaticImperial,
            (display, _) => display,
        }
    }
}

/// Resource limits and randomness for evaluations.
///
/// # Example
///
/// ```
/// use abacus_core::api::EvaluationOptions;
///
/// let options = EvaluationOptions {
///     max_iterations: 10_000,
///     ..EvaluationOptions::default()
/// };
/// assert_eq!(options.max_depth, 1000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationOptions {
    /// Maximum recursion depth of reduction and approximation.
    ///
    /// Default: 1000
    pub max_depth: usize,

    /// Maximum number of polled iterations (sum terms, list elements,
    /// reduced nodes, integral panels) per evaluation.
    ///
    /// Default: 1_000_000
    pub max_iterations: u64,

    /// Seed of the first evaluation. Each evaluation advances it by one,
    /// so repeated evaluations of `random()` differ but a session replays
    /// identically.
    ///
    /// Default: 0
    pub random_seed: u64,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            max_depth: 1000,
            max_iterations: 1_000_000,
            random_seed: 0,
        }
    }
}

/// Configuration of an [`Engine`](super::Engine).
///
/// # Example
///
/// ```
/// use abacus_core::api::{EngineOptions, EvaluationOptions, Preferences};
///
/// let options = EngineOptions {
///     arena_capacity: 4096,
///     default_preferences: Preferences::default(),
///     evaluation: EvaluationOptions {
///         max_depth: 200,
///         ..EvaluationOptions::default()
///     },
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Node records the engine's arena may hold.
    ///
    /// Default: 16384
    pub arena_capacity: usize,

    /// Preferences the engine starts with; see
    /// [`Engine::set_preferences`](super::Engine::set_preferences).
    pub default_preferences: Preferences,

    pub evaluation: EvaluationOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            arena_capacity: DEFAULT_CAPACITY,
            default_preferences: Preferences::default(),
            evaluation: EvaluationOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_preferences_round_trip_through_bytes() {
        let preferences = Preferences {
            angle_unit: AngleUnit::Gradian,
            complex_format: ComplexFormat::Polar,
            float_mode: FloatMode::Engineering,
            significant_digits: 4,
            policy: ProjectionPolicy {
                forbid_units: true,
                ..ProjectionPolicy::default()
            },
            ..Preferences::default()
        };
        let bytes = preferences.to_bytes().unwrap();
        assert_eq!(Preferences::from_bytes(&bytes).unwrap(), preferences);
        assert!(Preferences::from_bytes(&bytes[..2]).is_err());
    }

    #[test]
    fn test_unit_display_strategy() {
        let mut preferences = Preferences {
            unit_display: UnitDisplay::AutomaticMetric,
            unit_format: UnitFormat::Imperial,
            ..Preferences::default()
        };
        assert_eq!(preferences.unit_display_strategy(), UnitDisplay::AutomaticImperial);
        preferences.unit_display = UnitDisplay::Decomposition;
        assert_eq!(preferences.unit_display_strategy(), UnitDisplay::Decomposition);
        preferences.policy.forbid_units = true;
        assert_eq!(preferences.unit_display_strategy(), UnitDisplay::Forbidden);
    }
}
