//! Public API of the calculator engine.
//!
//! [`Engine`] owns the tree arena, the user symbols and the preferences,
//! and runs the whole pipeline: parsing, symbol substitution, dimension
//! checking, projection, reduction, approximation, unit display and
//! rendering.
//!
//! # Example
//!
//! ```
//! use abacus_core::api::{Engine, EngineOptions};
//!
//! let mut engine = Engine::new(EngineOptions::default());
//! engine.define_function("f", "x", "x^2+1").unwrap();
//!
//! let evaluation = engine.evaluate("f(3)").unwrap();
//! assert_eq!(evaluation.approximate.unwrap(), "10");
//!
//! let evaluation = engine.evaluate("1_m + 1_yd").unwrap();
//! assert_eq!(evaluation.approximate.unwrap(), "1.9144_m");
//! ```

pub mod engine;
pub mod error;
pub mod options;

pub use engine::{Engine, Evaluation};
pub use error::Error;
pub use options::{EngineOptions, EvaluationOptions, Preferences};
