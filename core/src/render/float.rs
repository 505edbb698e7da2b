//! Floats in decimal, scientific and engineering notation.

use super::{FloatFormat, FloatMode};
use crate::{String, ToString, format};

/// The `ᴇ` of scientific notation. The parser accepts it back.
pub const EXPONENT_MARKER: char = 'ᴇ';

/// Smallest magnitude decimal mode still writes without an exponent.
const DECIMAL_MIN_EXPONENT: i32 = -3;

/// A finite non-zero value rounded to a number of significant digits:
/// `0.digits × 10^(exponent + 1)`, i.e. `exponent` is the power of ten of
/// the first digit.
struct Rounded {
    negative: bool,
    /// Significant digits, no trailing zeros, at least one digit.
    digits: String,
    exponent: i32,
}

fn round(value: f64, significant_digits: usize) -> Rounded {
    // `{:e}` rounds correctly, half to even on the binary value.
    let text = format!("{:.*e}", significant_digits.saturating_sub(1), value.abs());
    let (mantissa, exponent) = text.split_once('e').unwrap_or((text.as_str(), "0"));
    let mut digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    while digits.len() > 1 && digits.ends_with('0') {
        digits.pop();
    }
    Rounded {
        negative: value.is_sign_negative(),
        digits,
        exponent: exponent.parse().unwrap_or(0),
    }
}

/// Digits with the decimal point after `integer_digits` of them, padding
/// with zeros on either side as needed.
fn place_point(digits: &str, integer_digits: i32, out: &mut String) {
    if integer_digits <= 0 {
        out.push_str("0.");
        out.extend(core::iter::repeat('0').take(integer_digits.unsigned_abs() as usize));
        out.push_str(digits);
        return;
    }
    let integer_digits = integer_digits as usize;
    if digits.len() <= integer_digits {
        out.push_str(digits);
        out.extend(core::iter::repeat('0').take(integer_digits - digits.len()));
    } else {
        out.push_str(&digits[..integer_digits]);
        out.push('.');
        out.push_str(&digits[integer_digits..]);
    }
}

fn push_exponent(exponent: i32, out: &mut String) {
    if exponent != 0 {
        out.push(EXPONENT_MARKER);
        out.push_str(&exponent.to_string());
    }
}

/// Render a float. Non-finite values are `∞`, `-∞` and `undef`.
///
/// Decimal mode falls back to scientific notation when the value needs
/// more integer digits than `significant_digits`, or is below `10^-3`.
pub fn render_float(value: f64, format: FloatFormat) -> String {
    if value.is_nan() {
        return "undef".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "∞" } else { "-∞" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let digits = format.significant_digits();
    let rounded = round(value, digits);
    let mut out = String::new();
    if rounded.negative {
        out.push('-');
    }
    let exponent = rounded.exponent;
    match format.mode {
        FloatMode::Decimal if (DECIMAL_MIN_EXPONENT..digits as i32).contains(&exponent) => {
            place_point(&rounded.digits, exponent + 1, &mut out);
        }
        FloatMode::Decimal | FloatMode::Scientific => {
            place_point(&rounded.digits, 1, &mut out);
            push_exponent(exponent, &mut out);
        }
        FloatMode::Engineering => {
            let engineering = exponent.div_euclid(3) * 3;
            place_point(&rounded.digits, exponent - engineering + 1, &mut out);
            push_exponent(engineering, &mut out);
        }
    }
    out
}

/// Exact decimal `mantissa · 10^-exponent`, as written by the user.
pub fn render_decimal(mantissa: i64, exponent: i16, out: &mut String) {
    if mantissa == 0 {
        out.push('0');
        return;
    }
    if mantissa < 0 {
        out.push('-');
    }
    let digits = mantissa.unsigned_abs().to_string();
    if exponent < 0 {
        out.push_str(&digits);
        out.extend(core::iter::repeat('0').take(exponent.unsigned_abs() as usize));
        return;
    }
    let integer_digits = digits.len() as i32 - exponent as i32;
    place_point(digits.trim_end_matches('0'), integer_digits, out);
}
