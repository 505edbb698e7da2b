mod lower;
mod parsed_expr;
pub mod parser;
mod syntax;
pub mod error;

use bumpalo::Bump;

use crate::tree::TreeArena;

// Re-export the parser and rule enum for external use
pub use parser::ExpressionParser;
pub use parser::Rule;
pub use parser::parse;
pub use parser::parse_with_max_depth;

pub use parsed_expr::{Expr, Literal, ParsedExpr};
pub use syntax::AnnotatedSource;
pub use syntax::{BinaryOp, BoolOp, ComparisonOp, PostfixOp, Span, UnaryOp};
pub use error::{ParseError, ParseErrorKind};

/// Lowers an already parsed expression into `arena`, returning the index
/// of its root.
pub fn lower<'a>(arena: &mut TreeArena, parsed: &ParsedExpr<'a>) -> Result<usize, ParseError> {
    lower::Lowering::new(arena, parsed).lower(parsed.expr)
}

/// Parses `source` and appends its tree to `arena`.
///
/// On error the arena may hold a partial tree; callers roll back to a
/// checkpoint taken before the call.
pub fn parse_into_arena(arena: &mut TreeArena, source: &str) -> Result<usize, ParseError> {
    let bump = Bump::new();
    let parsed = parse(&bump, source)?;
    lower(arena, &parsed)
}

#[cfg(test)]
mod lower_test;

#[cfg(test)]
mod rule_valid_test;
