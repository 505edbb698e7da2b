use alloc::string::ToString;

use crate::parser::{Rule, Span};
use crate::tree::ArenaError;
use crate::{String, Vec, format};

/// Parser error with the byte span it refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

/// Specific kinds of parse errors
#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// Unexpected token
    UnexpectedToken { expected: String, found: String },
    /// Invalid number literal
    InvalidNumber { text: String },
    /// `_name` that is not a unit with an allowed prefix
    UnknownUnit { name: String },
    /// A built-in function called with the wrong number of arguments
    WrongArgumentCount {
        function: String,
        expected: &'static str,
        found: usize,
    },
    /// The variable slot of `sum`, `product`, `int` or `sequence` is not a name
    ExpectedVariable { function: String },
    /// Matrix rows of different lengths
    RaggedMatrix { expected: usize, found: usize },
    /// More children than a node can count
    TooManyElements { found: usize, max: usize },
    /// Maximum nesting depth exceeded
    MaxDepthExceeded { depth: usize, max_depth: usize },
    /// The tree did not fit in the arena
    Arena(ArenaError),
    /// Other parse errors (catch-all for Pest errors we don't specifically handle)
    Other { message: String },
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Short stable code, shown next to the message.
    pub fn code(&self) -> &'static str {
        match self.kind {
            ParseErrorKind::UnexpectedToken { .. } => "P001",
            ParseErrorKind::InvalidNumber { .. } => "P003",
            ParseErrorKind::MaxDepthExceeded { .. } => "P004",
            ParseErrorKind::UnknownUnit { .. } => "P005",
            ParseErrorKind::WrongArgumentCount { .. } => "P006",
            ParseErrorKind::ExpectedVariable { .. } => "P007",
            ParseErrorKind::RaggedMatrix { .. } => "P008",
            ParseErrorKind::TooManyElements { .. } => "P009",
            ParseErrorKind::Arena(_) => "P010",
            ParseErrorKind::Other { .. } => "P999",
        }
    }

    pub fn message(&self) -> String {
        match &self.kind {
            ParseErrorKind::UnexpectedToken { expected, found } => {
                format!("Expected {}, found {}", expected, found)
            }
            ParseErrorKind::InvalidNumber { text } => format!("Invalid number literal '{}'", text),
            ParseErrorKind::UnknownUnit { name } => format!("Unknown unit '_{}'", name),
            ParseErrorKind::WrongArgumentCount {
                function,
                expected,
                found,
            } => format!(
                "Function '{}' takes {} argument(s), found {}",
                function, expected, found
            ),
            ParseErrorKind::ExpectedVariable { function } => {
                format!("Function '{}' expects a variable name", function)
            }
            ParseErrorKind::RaggedMatrix { expected, found } => format!(
                "Matrix row has {} entries, expected {}",
                found, expected
            ),
            ParseErrorKind::TooManyElements { found, max } => {
                format!("{} elements exceed the maximum of {}", found, max)
            }
            ParseErrorKind::MaxDepthExceeded { max_depth, .. } => format!(
                "Expression nesting depth exceeds maximum of {} levels",
                max_depth
            ),
            ParseErrorKind::Arena(error) => error.to_string(),
            ParseErrorKind::Other { message } => message.clone(),
        }
    }

    /// Suggestions shown under the message.
    pub fn help(&self) -> Option<&'static str> {
        match self.kind {
            ParseErrorKind::InvalidNumber { .. } => Some("Check the number format"),
            ParseErrorKind::UnknownUnit { .. } => Some("Units are written like _m, _km or _°C"),
            ParseErrorKind::MaxDepthExceeded { .. } => {
                Some("Reduce nesting or simplify the expression")
            }
            ParseErrorKind::RaggedMatrix { .. } => {
                Some("Every row needs the same number of entries")
            }
            _ => None,
        }
    }
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "error: {} [{}]", self.message(), self.code())?;
        if let Some(help) = self.help() {
            write!(f, "\nhelp: {}", help)?;
        }
        Ok(())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseError {}

impl From<ArenaError> for ParseError {
    fn from(error: ArenaError) -> Self {
        ParseError::new(ParseErrorKind::Arena(error), Span::new(0, 0))
    }
}

/// Convert Pest error to human-readable ParseError
pub fn convert_pest_error(err: pest::error::Error<Rule>, source: &str) -> ParseError {
    use pest::error::ErrorVariant;

    let span = match err.location {
        pest::error::InputLocation::Pos(pos) => Span(pos..pos),
        pest::error::InputLocation::Span((start, end)) => Span(start..end),
    };

    let kind = match err.variant {
        ErrorVariant::ParsingError {
            positives,
            negatives,
        } => {
            let expected = format_expected_rules(&positives);
            let found = if negatives.is_empty() {
                describe_found(source, span.0.start)
            } else {
                format_found_rules(&negatives)
            };
            ParseErrorKind::UnexpectedToken { expected, found }
        }
        ErrorVariant::CustomError { message } => ParseErrorKind::Other { message },
    };

    ParseError::new(kind, span)
}

/// What sits at `position`: the offending character, or the end of input.
fn describe_found(source: &str, position: usize) -> String {
    match source.get(position..).and_then(|rest| rest.chars().next()) {
        Some(c) => format!("'{}'", c),
        None => "end of input".to_string(),
    }
}

/// Format expected rules in a human-readable way
fn format_expected_rules(rules: &[Rule]) -> String {
    if rules.is_empty() {
        return "something else".to_string();
    }

    // Group related rules into higher-level concepts
    let mut concepts = Vec::new();

    for rule in rules {
        let concept = match rule {
            Rule::integer | Rule::decimal | Rule::boolean | Rule::infinity => "number",
            Rule::unit => "unit",
            Rule::ident => "identifier",
            Rule::EOI => "end of input",
            Rule::add
            | Rule::sub
            | Rule::mul
            | Rule::div
            | Rule::pow
            | Rule::implicit_mul
            | Rule::convert
            | Rule::eq
            | Rule::ne
            | Rule::lt
            | Rule::gt
            | Rule::le
            | Rule::ge
            | Rule::and
            | Rule::or
            | Rule::xor
            | Rule::nand
            | Rule::nor
            | Rule::factorial
            | Rule::percent
            | Rule::call_op => "operator",
            _ => "expression",
        };
        if !concepts.contains(&concept) {
            concepts.push(concept);
        }
    }

    match concepts.split_last() {
        Some((last, [])) => last.to_string(),
        Some((last, rest)) => format!("{} or {}", rest.join(", "), last),
        None => "something else".to_string(),
    }
}

/// Format found rules in a human-readable way
fn format_found_rules(rules: &[Rule]) -> String {
    match rules[0] {
        Rule::ident => "identifier".to_string(),
        Rule::integer | Rule::decimal => "number".to_string(),
        Rule::boolean => "boolean".to_string(),
        Rule::unit => "unit".to_string(),
        Rule::EOI => "end of input".to_string(),
        Rule::grouped => "grouped expression".to_string(),
        Rule::neg => "negation".to_string(),
        Rule::not => "logical not".to_string(),
        _ => format!("{:?}", rules[0]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_includes_code_and_help() {
        let error = ParseError::new(
            ParseErrorKind::InvalidNumber {
                text: "1.2.3".to_string(),
            },
            Span(0..5),
        );
        assert_eq!(
            error.to_string(),
            "error: Invalid number literal '1.2.3' [P003]\nhelp: Check the number format"
        );
    }

    #[test]
    fn test_format_expected_rules() {
        let rules = vec![Rule::integer, Rule::decimal];
        assert_eq!(format_expected_rules(&rules), "number");
        let rules = vec![Rule::integer, Rule::ident, Rule::EOI];
        assert_eq!(
            format_expected_rules(&rules),
            "number, identifier or end of input"
        );
    }

    #[test]
    fn test_pest_error_conversion() {
        let source = "1 + ";
        let error = crate::parser::parse(&bumpalo::Bump::new(), source).unwrap_err();
        assert!(matches!(
            error.kind,
            ParseErrorKind::UnexpectedToken { .. }
        ));
        assert!(error.span.0.start >= 3);
        assert!(error.to_string().starts_with("error: Expected "));
    }
}
