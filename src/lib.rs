//! Abacus - a scientific calculator engine
//!
//! # Overview
//!
//! Abacus evaluates calculator input the way a graphing calculator does:
//! exact arithmetic on integers and rationals where possible, floating
//! point approximation otherwise, physical units with automatic display,
//! complex numbers, lists, matrices and user-defined symbols and functions.
//!
//! Computation runs in a bounded tree arena, with an iteration budget and a
//! cancellation token, so a host can evaluate untrusted input safely.
//!
//! # Quick Start
//!
//! ```
//! use abacus::{Engine, EngineOptions};
//!
//! let mut engine = Engine::new(EngineOptions::default());
//!
//! let evaluation = engine.evaluate("2+3*4").unwrap();
//! assert_eq!(evaluation.approximate.unwrap(), "14");
//!
//! let evaluation = engine.evaluate("(12_km)/(6_mm)").unwrap();
//! assert_eq!(evaluation.approximate.unwrap(), "2000000");
//! ```
//!
//! # Errors
//!
//! Syntax errors carry the span of the offending input. Render them with
//! [`render_error`] or [`render_error_to_string`]:
//!
//! ```
//! use abacus::{Engine, EngineOptions, render_error_to_string_no_color};
//!
//! let mut engine = Engine::new(EngineOptions::default());
//! let source = "1 + * 2";
//! let error = engine.evaluate(source).unwrap_err();
//! assert!(render_error_to_string_no_color(&error, source).contains("1 + * 2"));
//! ```

pub use abacus_core::api::{
    Engine, EngineOptions, Error, Evaluation, EvaluationOptions, Preferences,
};
pub use abacus_core::approximation::{ComplexFormat, Outcome, Value};
pub use abacus_core::interrupt::{AbortReason, CancellationToken};
pub use abacus_core::projection::{ProjectionPolicy, SymbolicComputation};
pub use abacus_core::render::FloatMode;
pub use abacus_core::units::display::UnitDisplay;
pub use abacus_core::units::{AngleUnit, UnitFormat};

mod error_renderer;
pub use error_renderer::{
    render_error, render_error_to, render_error_to_string, render_error_to_string_no_color,
};
