use core::cell::Cell;

use bumpalo::Bump;
use lazy_static::lazy_static;
use pest::Parser;
use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser;

use crate::parser::error::{ParseError, ParseErrorKind, convert_pest_error};
use crate::parser::parsed_expr::{Expr, Literal, ParsedExpr};
use crate::parser::syntax::AnnotatedSource;
use crate::parser::{BinaryOp, BoolOp, ComparisonOp, PostfixOp, Span, UnaryOp};
use crate::{String, ToString, Vec};

/// Deepest expression nesting accepted by [`parse`].
pub const DEFAULT_MAX_DEPTH: usize = 500;

lazy_static! {
    // Note: precedence is defined lowest to highest.
    static ref PRATT_PARSER: PrattParser<Rule> = PrattParser::new()
        // (lowest precedence)
        .op(Op::infix(Rule::convert, Assoc::Left))       // `→`

        // Logical operators.
        .op(
            Op::infix(Rule::or, Assoc::Left) |
            Op::infix(Rule::xor, Assoc::Left) |
            Op::infix(Rule::nor, Assoc::Left)
        )                                                // `or`, `xor`, `nor`
        .op(
            Op::infix(Rule::and, Assoc::Left) |
            Op::infix(Rule::nand, Assoc::Left)
        )                                                // `and`, `nand`
        .op(Op::prefix(Rule::not))                       // `not`

        // Comparisons.
        .op(
            Op::infix(Rule::eq, Assoc::Left) |
            Op::infix(Rule::ne, Assoc::Left) |
            Op::infix(Rule::lt, Assoc::Left) |
            Op::infix(Rule::gt, Assoc::Left) |
            Op::infix(Rule::le, Assoc::Left) |
            Op::infix(Rule::ge, Assoc::Left)
        )                                                // `=`, `≠`, `<`, `>`, `≤`, `≥`

        // Arithmetic operators.
        .op(
            Op::infix(Rule::add, Assoc::Left) |
            Op::infix(Rule::sub, Assoc::Left)
        )                                                // `+`, `-`
        .op(
            Op::infix(Rule::mul, Assoc::Left) |
            Op::infix(Rule::div, Assoc::Left)
        )                                                // `*`, `/`
        .op(Op::infix(Rule::implicit_mul, Assoc::Left))  // `3_m`
        .op(Op::prefix(Rule::neg))                       // `-`
        .op(Op::infix(Rule::pow, Assoc::Right))          // `^` (right-assoc)

        // Postfix operators.
        .op(
            Op::postfix(Rule::factorial) |
            Op::postfix(Rule::percent)
        )                                                // `!`, `%`
        .op(Op::postfix(Rule::call_op))                  // `()`
        // (highest precedence)
        ;
}

#[derive(Parser)]
#[grammar = "parser/expression.pest"]
pub struct ExpressionParser;

/// Builds the bump-allocated AST from pest pairs.
struct Builder<'a> {
    arena: &'a Bump,
    ann: &'a AnnotatedSource<'a, Expr<'a>>,
    depth: Cell<usize>,
    max_depth: usize,
}

impl<'a> Builder<'a> {
    fn alloc(&self, expr: Expr<'a>, span: Span) -> &'a Expr<'a> {
        let expr = self.arena.alloc(expr);
        self.ann.add_span(expr, span);
        expr
    }

    fn alloc_args(
        &self,
        pairs: pest::iterators::Pairs<'a, Rule>,
    ) -> Result<&'a [&'a Expr<'a>], ParseError> {
        let items = pairs
            .map(|pair| self.parse_expr(pair))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.arena.alloc_slice_copy(&items))
    }

    fn parse_expr(&self, pair: Pair<'a, Rule>) -> Result<&'a Expr<'a>, ParseError> {
        let span = Span::from(pair.as_span());
        match pair.as_rule() {
            Rule::main => {
                let inner = pair.into_inner().next().ok_or_else(|| {
                    ParseError::new(
                        ParseErrorKind::Other {
                            message: "missing expected pair in rule".to_string(),
                        },
                        span,
                    )
                })?;
                self.parse_expr(inner)
            }

            Rule::expression => {
                let depth = self.depth.get() + 1;
                if depth > self.max_depth {
                    return Err(ParseError::new(
                        ParseErrorKind::MaxDepthExceeded {
                            depth,
                            max_depth: self.max_depth,
                        },
                        span,
                    ));
                }
                self.depth.set(depth);
                let result = self.parse_operators(pair);
                self.depth.set(depth - 1);
                result
            }

            Rule::integer => {
                let text = pair.as_str();
                let literal = match text.parse::<i64>() {
                    Ok(value) => Literal::Int(value),
                    Err(_) => Literal::Float(parse_float(text, &span)?),
                };
                Ok(self.alloc(Expr::Literal(literal), span))
            }

            Rule::decimal => {
                let literal = parse_decimal(pair.as_str(), &span)?;
                Ok(self.alloc(Expr::Literal(literal), span))
            }

            Rule::boolean => {
                let value = pair.as_str() == "true";
                Ok(self.alloc(Expr::Literal(Literal::Bool(value)), span))
            }

            Rule::infinity => Ok(self.alloc(Expr::Literal(Literal::Infinity), span)),

            Rule::unit => {
                // The leading `_` is one byte.
                let name = &pair.as_str()[1..];
                Ok(self.alloc(Expr::Unit(name), span))
            }

            Rule::ident => Ok(self.alloc(Expr::Ident(pair.as_str()), span)),

            Rule::grouped => {
                let mut inner = pair.into_inner();
                let first = self.parse_expr(inner.next().ok_or_else(|| missing(&span))?)?;
                match inner.next() {
                    Some(second) => {
                        let y = self.parse_expr(second)?;
                        Ok(self.alloc(Expr::Point { x: first, y }, span))
                    }
                    None => Ok(self.alloc(Expr::Grouped(first), span)),
                }
            }

            Rule::list => {
                let items = self.alloc_args(pair.into_inner())?;
                Ok(self.alloc(Expr::List(items), span))
            }

            Rule::matrix => {
                let mut rows: Vec<&'a [&'a Expr<'a>]> = Vec::new();
                for row in pair.into_inner() {
                    let row_span = Span::from(row.as_span());
                    let entries = self.alloc_args(row.into_inner())?;
                    if let Some(first) = rows.first() {
                        if first.len() != entries.len() {
                            return Err(ParseError::new(
                                ParseErrorKind::RaggedMatrix {
                                    expected: first.len(),
                                    found: entries.len(),
                                },
                                row_span,
                            ));
                        }
                    }
                    rows.push(entries);
                }
                let rows = self.arena.alloc_slice_copy(&rows);
                Ok(self.alloc(Expr::Matrix(rows), span))
            }

            _ => Err(ParseError::new(
                ParseErrorKind::Other {
                    message: crate::format!("Unhandled rule: {:?}", pair.as_rule()),
                },
                span,
            )),
        }
    }

    fn parse_operators(&self, pair: Pair<'a, Rule>) -> Result<&'a Expr<'a>, ParseError> {
        PRATT_PARSER
            .map_primary(|primary| self.parse_expr(primary))
            .map_prefix(|op, rhs| {
                let rhs = rhs?;
                let op_span = Span::from(op.as_span());
                let op = match op.as_rule() {
                    Rule::neg => UnaryOp::Neg,
                    Rule::not => UnaryOp::Not,
                    rule => return Err(unexpected_operator(rule, op_span)),
                };
                let span = Span::combine(&op_span, &self.span_of(rhs, &op_span));
                Ok(self.alloc(Expr::Unary { op, expr: rhs }, span))
            })
            .map_infix(|lhs, op, rhs| {
                let (lhs, rhs) = (lhs?, rhs?);
                let op_span = Span::from(op.as_span());
                let span =
                    Span::combine(&self.span_of(lhs, &op_span), &self.span_of(rhs, &op_span));
                let expr = match op.as_rule() {
                    Rule::add => binary(BinaryOp::Add, lhs, rhs),
                    Rule::sub => binary(BinaryOp::Sub, lhs, rhs),
                    Rule::mul => binary(BinaryOp::Mul, lhs, rhs),
                    Rule::div => binary(BinaryOp::Div, lhs, rhs),
                    Rule::pow => binary(BinaryOp::Pow, lhs, rhs),
                    Rule::implicit_mul => binary(BinaryOp::ImplicitMul, lhs, rhs),
                    Rule::convert => binary(BinaryOp::Convert, lhs, rhs),
                    Rule::and => boolean(BoolOp::And, lhs, rhs),
                    Rule::or => boolean(BoolOp::Or, lhs, rhs),
                    Rule::xor => boolean(BoolOp::Xor, lhs, rhs),
                    Rule::nand => boolean(BoolOp::Nand, lhs, rhs),
                    Rule::nor => boolean(BoolOp::Nor, lhs, rhs),
                    Rule::eq => comparison(ComparisonOp::Eq, lhs, rhs),
                    Rule::ne => comparison(ComparisonOp::Neq, lhs, rhs),
                    Rule::lt => comparison(ComparisonOp::Lt, lhs, rhs),
                    Rule::gt => comparison(ComparisonOp::Gt, lhs, rhs),
                    Rule::le => comparison(ComparisonOp::Le, lhs, rhs),
                    Rule::ge => comparison(ComparisonOp::Ge, lhs, rhs),
                    rule => return Err(unexpected_operator(rule, op_span)),
                };
                Ok(self.alloc(expr, span))
            })
            .map_postfix(|lhs, op| {
                let lhs = lhs?;
                let op_span = Span::from(op.as_span());
                let span = Span::combine(&self.span_of(lhs, &op_span), &op_span);
                let expr = match op.as_rule() {
                    Rule::factorial => Expr::Postfix {
                        op: PostfixOp::Factorial,
                        expr: lhs,
                    },
                    Rule::percent => Expr::Postfix {
                        op: PostfixOp::Percent,
                        expr: lhs,
                    },
                    Rule::call_op => Expr::Call {
                        callable: lhs,
                        args: self.alloc_args(op.into_inner())?,
                    },
                    rule => return Err(unexpected_operator(rule, op_span)),
                };
                Ok(self.alloc(expr, span))
            })
            .parse(pair.into_inner())
    }

    fn span_of(&self, expr: &Expr<'a>, fallback: &Span) -> Span {
        self.ann.span_of(expr).unwrap_or_else(|| fallback.clone())
    }
}

fn binary<'a>(op: BinaryOp, left: &'a Expr<'a>, right: &'a Expr<'a>) -> Expr<'a> {
    Expr::Binary { op, left, right }
}

fn boolean<'a>(op: BoolOp, left: &'a Expr<'a>, right: &'a Expr<'a>) -> Expr<'a> {
    Expr::Boolean { op, left, right }
}

fn comparison<'a>(op: ComparisonOp, left: &'a Expr<'a>, right: &'a Expr<'a>) -> Expr<'a> {
    Expr::Comparison { op, left, right }
}

fn missing(span: &Span) -> ParseError {
    ParseError::new(
        ParseErrorKind::Other {
            message: "missing expected pair in rule".to_string(),
        },
        span.clone(),
    )
}

fn unexpected_operator(rule: Rule, span: Span) -> ParseError {
    ParseError::new(
        ParseErrorKind::Other {
            message: crate::format!("Unknown operator: {:?}", rule),
        },
        span,
    )
}

fn parse_float(text: &str, span: &Span) -> Result<f64, ParseError> {
    let normalized: String = text
        .chars()
        .map(|c| match c {
            'ᴇ' => 'e',
            '−' => '-',
            c => c,
        })
        .collect();
    normalized.parse::<f64>().map_err(|_| {
        ParseError::new(
            ParseErrorKind::InvalidNumber {
                text: text.to_string(),
            },
            span.clone(),
        )
    })
}

/// An exact `mantissa · 10^(-exponent)` for literals such as `3.14` or
/// `6.022E23`, or a float when the digits do not fit.
fn parse_decimal(text: &str, span: &Span) -> Result<Literal, ParseError> {
    let (digits_part, exponent_part) = match text.find(['e', 'E', 'ᴇ']) {
        Some(position) => {
            let marker_len = text[position..].chars().next().map_or(1, char::len_utf8);
            (&text[..position], Some(&text[position + marker_len..]))
        }
        None => (text, None),
    };
    let fraction_len = match digits_part.find('.') {
        Some(dot) => digits_part.len() - dot - 1,
        None => 0,
    };
    let digits: String = digits_part.chars().filter(|c| *c != '.').collect();
    let exponent = match exponent_part {
        Some(e) => {
            let e = e.replace('−', "-");
            e.parse::<i64>().map_err(|_| {
                ParseError::new(
                    ParseErrorKind::InvalidNumber {
                        text: text.to_string(),
                    },
                    span.clone(),
                )
            })?
        }
        None => 0,
    };
    let mantissa = digits.trim_start_matches('0').parse::<i64>().or_else(|e| {
        if digits.trim_start_matches('0').is_empty() {
            Ok(0)
        } else {
            Err(e)
        }
    });
    let shift = fraction_len as i64 - exponent;
    match (mantissa, i16::try_from(shift)) {
        (Ok(mantissa), Ok(exponent)) => Ok(Literal::Decimal { mantissa, exponent }),
        _ => Ok(Literal::Float(parse_float(text, span)?)),
    }
}

pub fn parse<'a>(arena: &'a Bump, source: &'a str) -> Result<ParsedExpr<'a>, ParseError> {
    parse_with_max_depth(arena, source, DEFAULT_MAX_DEPTH)
}

pub fn parse_with_max_depth<'a>(
    arena: &'a Bump,
    source: &'a str,
    max_depth: usize,
) -> Result<ParsedExpr<'a>, ParseError> {
    let mut pairs = ExpressionParser::parse(Rule::main, source)
        .map_err(|e| convert_pest_error(e, source))?;
    let pair = pairs.next().ok_or_else(|| missing(&Span::new(0, source.len())))?;
    let ann = arena.alloc(AnnotatedSource::new(arena, source));
    let builder = Builder {
        arena,
        ann,
        depth: Cell::new(0),
        max_depth,
    };
    let expr = builder.parse_expr(pair)?;
    Ok(ParsedExpr { expr, ann })
}
