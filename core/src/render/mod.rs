//! Textual serialization of trees and approximated values.
//!
//! Output is written in the input language, so rendered text parses back.
//! Every entry point takes [`RenderOptions`]. When the text would exceed
//! `max_length` characters, floats are shortened deterministically: first
//! fewer significant digits in the requested mode, then scientific notation
//! from the requested digit count down. If nothing fits, the result is
//! [`LengthExceeded`] with the length the full rendering needs.
//!
//! # Example
//!
//! ```
//! use abacus_core::render::{FloatMode, RenderOptions, render_number};
//! use abacus_core::approximation::{Complex, ComplexFormat};
//!
//! let options = RenderOptions {
//!     float_mode: FloatMode::Scientific,
//!     significant_digits: 3,
//!     ..RenderOptions::default()
//! };
//! let text = render_number(Complex::new(1234.5, 0.0), ComplexFormat::Real, &options);
//! assert_eq!(text.unwrap(), "1.23ᴇ3");
//! ```

mod float;
mod tree;
mod value;

use core::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::String;
use crate::tree::{NodeKind, TreeArena};

pub use float::{EXPONENT_MARKER, render_float};
pub use value::{render_number, render_unit_terms, render_value};

/// Most significant digits a float is written with.
pub const MAX_SIGNIFICANT_DIGITS: u8 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FloatMode {
    /// Positional notation where reasonable, scientific otherwise.
    #[default]
    Decimal,
    Scientific,
    /// Scientific with exponents that are multiples of 3.
    Engineering,
}

/// Float notation and precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatFormat {
    pub mode: FloatMode,
    pub digits: u8,
}

impl FloatFormat {
    pub fn new(mode: FloatMode, digits: u8) -> Self {
        Self { mode, digits }
    }

    /// `digits` clamped to 1..=14.
    pub fn significant_digits(&self) -> usize {
        self.digits.clamp(1, MAX_SIGNIFICANT_DIGITS) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub float_mode: FloatMode,
    pub significant_digits: u8,
    /// Longest acceptable output, in characters.
    pub max_length: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            float_mode: FloatMode::Decimal,
            significant_digits: 10,
            max_length: 256,
        }
    }
}

impl RenderOptions {
    fn format(&self) -> FloatFormat {
        FloatFormat::new(self.float_mode, self.significant_digits)
    }
}

/// The output did not fit in `max_length` characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthExceeded {
    /// Length of the rendering at the requested precision.
    pub needed: usize,
}

impl fmt::Display for LengthExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rendering needs {} characters", self.needed)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LengthExceeded {}

/// Character count, which is what the budget limits.
pub fn text_length(text: &str) -> usize {
    text.chars().count()
}

/// Run `render` with progressively shorter float formats until the text
/// fits. Without floats there is nothing to shorten.
pub(crate) fn fit(
    options: &RenderOptions,
    has_floats: bool,
    mut render: impl FnMut(FloatFormat) -> String,
) -> Result<String, LengthExceeded> {
    let requested = options.format();
    let text = render(requested);
    let needed = text_length(&text);
    if needed <= options.max_length {
        return Ok(text);
    }
    if has_floats {
        let digits = requested.significant_digits() as u8;
        let shorter = (1..digits).rev().map(|d| FloatFormat::new(requested.mode, d));
        let scientific = (1..=digits)
            .rev()
            .filter(|_| requested.mode != FloatMode::Scientific)
            .map(|d| FloatFormat::new(FloatMode::Scientific, d));
        for format in shorter.chain(scientific) {
            let text = render(format);
            if text_length(&text) <= options.max_length {
                trace!(?format, "rendering shortened");
                return Ok(text);
            }
        }
    }
    Err(LengthExceeded { needed })
}

/// Infix text of the tree at `index`, with minimal parentheses.
pub fn render_tree(
    arena: &TreeArena,
    index: usize,
    options: &RenderOptions,
) -> Result<String, LengthExceeded> {
    let has_floats = arena.any_descendant(index, |node| node.kind == NodeKind::Float);
    fit(options, has_floats, |format| tree::render(arena, index, format))
}
