//! Error rendering using ariadne
//!
//! Syntax errors are drawn against the source text with the offending span
//! underlined. Other errors have no location and render as a single line.

use crate::Error;
use abacus_core::parser::ParseError;
use ariadne::{Color, Config, IndexType, Label, Report, ReportKind, Source};
use std::io::Write;

const SOURCE_ID: &str = "<input>";

/// Render an error for `source` to stderr.
///
/// # Example
/// ```no_run
/// use abacus::{Engine, EngineOptions, render_error};
///
/// let mut engine = Engine::new(EngineOptions::default());
/// let source = "sqrt(";
/// if let Err(e) = engine.evaluate(source) {
///     render_error(&e, source);
/// }
/// ```
pub fn render_error(error: &Error, source: &str) {
    render_error_to_writer(error, source, &mut std::io::stderr(), true).ok();
}

/// Render an error to a specific writer, such as a log file or a buffer.
pub fn render_error_to(error: &Error, source: &str, writer: &mut dyn Write) -> std::io::Result<()> {
    render_error_to_writer(error, source, writer, true)
}

/// Render an error to a String, with color codes.
pub fn render_error_to_string(error: &Error, source: &str) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, source, &mut buf, true).ok();
    String::from_utf8_lossy(&buf).to_string()
}

/// Same as [`render_error_to_string`] without ANSI color codes.
pub fn render_error_to_string_no_color(error: &Error, source: &str) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, source, &mut buf, false).ok();
    String::from_utf8_lossy(&buf).to_string()
}

fn render_error_to_writer(
    error: &Error,
    source: &str,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    match error {
        Error::Syntax(parse_error) => render_parse_error(parse_error, source, writer, use_color),
        Error::ComputationAborted(_) | Error::ArenaExhausted { .. } => {
            writeln!(writer, "Resource limit exceeded: {}", error)
        }
        _ => writeln!(writer, "Error: {}", error),
    }
}

fn render_parse_error(
    error: &ParseError,
    source: &str,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    // Spans are byte offsets; clamp them so a stale span cannot panic.
    let end = error.span.0.end.min(source.len());
    let start = error.span.0.start.min(end);
    let message = error.message();

    let mut report = Report::build(ReportKind::Error, (SOURCE_ID, start..end))
        .with_code(error.code())
        .with_message(&message)
        .with_config(
            Config::default()
                .with_color(use_color)
                .with_index_type(IndexType::Byte),
        )
        .with_label(
            Label::new((SOURCE_ID, start..end))
                .with_message(&message)
                .with_color(Color::Red),
        );
    if let Some(help) = error.help() {
        report = report.with_help(help);
    }

    report.finish().write((SOURCE_ID, Source::from(source)), &mut *writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Engine, EngineOptions};

    fn rendered(source: &str) -> String {
        let mut engine = Engine::new(EngineOptions::default());
        let error = engine.evaluate(source).unwrap_err();
        render_error_to_string_no_color(&error, source)
    }

    #[test]
    fn test_render_parse_error() {
        let output = rendered("1 + + 2");
        assert!(output.contains("Error"));
        assert!(output.contains("1 + + 2"));
        assert!(output.lines().count() > 1);
    }

    #[test]
    fn test_render_unknown_unit() {
        let output = rendered("3_parsec→_km");
        assert!(output.contains("P005"), "{output}");
        assert!(output.contains("Units are written like"), "{output}");
    }

    #[test]
    fn test_render_non_ascii_source() {
        let output = rendered("π→");
        assert!(output.contains("π→"), "{output}");
    }

    #[test]
    fn test_render_without_location() {
        let error = Error::CircularDefinition { name: "a".into() };
        assert_eq!(
            render_error_to_string_no_color(&error, "a"),
            "Error: Circular definition of 'a'\n"
        );
    }
}
