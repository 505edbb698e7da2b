//! Approximated values and unit display terms.

use super::float::render_float;
use super::{FloatFormat, LengthExceeded, RenderOptions, fit};
use crate::{String, ToString};
use crate::approximation::{Complex, ComplexFormat, Element, Outcome, Value};
use crate::units::{UnitFactor, unit_symbol};
use crate::units::display::DisplayTerm;

fn push_float(value: f64, format: FloatFormat, out: &mut String) {
    out.push_str(&render_float(value, format));
}

/// `b*i` with the coefficient dropped when it is `±1`.
fn push_imaginary(im: f64, format: FloatFormat, out: &mut String) {
    let text = render_float(im, format);
    match text.as_str() {
        "1" => {}
        "-1" => out.push('-'),
        _ => {
            out.push_str(&text);
            out.push('*');
        }
    }
    out.push('i');
}

fn push_cartesian(value: Complex<f64>, format: FloatFormat, out: &mut String) {
    if value.im == 0.0 || (value.im.is_nan() && value.re.is_nan()) {
        return push_float(value.re, format, out);
    }
    if value.re != 0.0 {
        push_float(value.re, format, out);
        if value.im > 0.0 {
            out.push('+');
        }
    }
    push_imaginary(value.im, format, out);
}

/// `r*e^(θ*i)` with `θ` in radians.
fn push_polar(value: Complex<f64>, format: FloatFormat, out: &mut String) {
    let (modulus, argument) = value.to_polar();
    if modulus == 0.0 || argument == 0.0 || modulus.is_nan() {
        return push_float(modulus, format, out);
    }
    if render_float(modulus, format) != "1" {
        push_float(modulus, format, out);
        out.push('*');
    }
    out.push_str("e^(");
    push_imaginary(argument, format, out);
    out.push(')');
}

fn push_number(
    value: Complex<f64>,
    complex_format: ComplexFormat,
    format: FloatFormat,
    out: &mut String,
) {
    match complex_format {
        ComplexFormat::Polar => push_polar(value, format, out),
        ComplexFormat::Real | ComplexFormat::Cartesian => push_cartesian(value, format, out),
    }
}

fn push_element(
    element: &Outcome<Element<f64>>,
    complex_format: ComplexFormat,
    format: FloatFormat,
    out: &mut String,
) {
    match element {
        Outcome::Value(Element::Number(value)) => push_number(*value, complex_format, format, out),
        Outcome::Value(Element::Boolean(value)) => {
            out.push_str(if *value { "true" } else { "false" })
        }
        Outcome::Value(Element::Point(x, y)) => push_point(*x, *y, format, out),
        Outcome::Undefined => out.push_str("undef"),
        Outcome::NonReal => out.push_str("nonreal"),
        Outcome::Forbidden => out.push_str("forbidden"),
    }
}

fn push_point(x: f64, y: f64, format: FloatFormat, out: &mut String) {
    out.push('(');
    push_float(x, format, out);
    out.push_str(", ");
    push_float(y, format, out);
    out.push(')');
}

/// A complex number in the requested format.
pub fn render_number(
    value: Complex<f64>,
    complex_format: ComplexFormat,
    options: &RenderOptions,
) -> Result<String, LengthExceeded> {
    fit(options, true, |format| {
        let mut out = String::new();
        push_number(value, complex_format, format, &mut out);
        out
    })
}

pub fn render_value(
    value: &Value<f64>,
    complex_format: ComplexFormat,
    options: &RenderOptions,
) -> Result<String, LengthExceeded> {
    let has_floats = !matches!(value, Value::Boolean(_));
    fit(options, has_floats, |format| {
        let mut out = String::new();
        match value {
            Value::Number(number) => push_number(*number, complex_format, format, &mut out),
            Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Point(x, y) => push_point(*x, *y, format, &mut out),
            Value::List(elements) => {
                out.push('{');
                for (n, element) in elements.iter().enumerate() {
                    if n > 0 {
                        out.push_str(", ");
                    }
                    push_element(element, complex_format, format, &mut out);
                }
                out.push('}');
            }
            Value::Matrix(matrix) => {
                out.push('[');
                for row in matrix.entries.chunks(matrix.cols.max(1)) {
                    out.push('[');
                    for (n, entry) in row.iter().enumerate() {
                        if n > 0 {
                            out.push_str(", ");
                        }
                        push_number(*entry, complex_format, format, &mut out);
                    }
                    out.push(']');
                }
                out.push(']');
            }
        }
        out
    })
}

fn push_unit(factor: &UnitFactor, exponent: i8, out: &mut String) {
    let (prefix, symbol) = unit_symbol(factor.representative, factor.prefix);
    out.push('_');
    out.push_str(prefix);
    out.push_str(symbol);
    if exponent != 1 {
        out.push('^');
        out.push_str(&exponent.to_string());
    }
}

fn push_term(term: &DisplayTerm, format: FloatFormat, out: &mut String) {
    push_float(term.value, format, out);
    let numerator = term.units.iter().filter(|f| f.exponent > 0);
    for (n, factor) in numerator.enumerate() {
        if n > 0 {
            out.push('·');
        }
        push_unit(factor, factor.exponent, out);
    }
    for factor in term.units.iter().filter(|f| f.exponent < 0) {
        out.push('/');
        push_unit(factor, -factor.exponent, out);
    }
}

/// Unit display terms: `1.9144_m`, `9.81_m/_s^2`, or a decomposition
/// such as `1_h+30_min`.
pub fn render_unit_terms(
    terms: &[DisplayTerm],
    options: &RenderOptions,
) -> Result<String, LengthExceeded> {
    fit(options, true, |format| {
        let mut out = String::new();
        for (n, term) in terms.iter().enumerate() {
            if n > 0 && term.value >= 0.0 {
                out.push('+');
            }
            push_term(term, format, &mut out);
        }
        out
    })
}
