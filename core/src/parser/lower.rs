//! Lowering of the surface AST into arena trees.
//!
//! Nodes are pushed in prefix order, so every parent is pushed before its
//! children. Names bound by `sum`, `product`, `int` and `sequence` become
//! `Variable` nodes (de Bruijn indices, innermost binding is 0) while their
//! body is lowered; every other free name becomes a user symbol.

use smallvec::SmallVec;
use tracing::trace;

use crate::parser::parsed_expr::{Expr, Literal, ParsedExpr};
use crate::parser::syntax::AnnotatedSource;
use crate::parser::{
    BinaryOp, BoolOp, ComparisonOp, ParseError, ParseErrorKind, PostfixOp, Span, UnaryOp,
};
use crate::tree::{Node, NodeKind, TreeArena};
use crate::units;
use crate::{ToString, Vec};

/// Largest child count a node can record.
const MAX_CHILDREN: usize = u8::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Args {
    Exactly(usize),
    Between(usize, usize),
    AtLeast(usize),
}

impl Args {
    fn accepts(self, count: usize) -> bool {
        match self {
            Args::Exactly(n) => count == n,
            Args::Between(lo, hi) => (lo..=hi).contains(&count),
            Args::AtLeast(n) => count >= n,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Args::Exactly(0) => "no",
            Args::Exactly(1) => "1",
            Args::Exactly(2) => "2",
            Args::Exactly(3) => "3",
            Args::Exactly(4) => "4",
            Args::Between(1, 2) => "1 or 2",
            Args::AtLeast(1) => "at least 1",
            Args::AtLeast(2) => "at least 2",
            _ => "a different number of",
        }
    }
}

/// What a built-in function name lowers to.
#[derive(Debug, Clone, Copy)]
enum Builtin {
    /// A node of this kind with the arguments as children.
    Kind(NodeKind, Args),
    /// `name(body, var, lower, upper)`.
    Parametric(NodeKind),
    /// `sequence(body, var, length)`.
    Sequence,
    /// `sum(list)` or `sum(body, var, lower, upper)`.
    ListOrParametric(NodeKind, NodeKind),
    /// `log(x)` or `log(x, base)`.
    Log,
    /// `round(x)` or `round(x, digits)`.
    Round,
}

const FUNCTIONS: &[(&str, Builtin)] = {
    use Args::*;
    use Builtin::*;
    use NodeKind as K;
    &[
        ("abs", Kind(K::Abs, Exactly(1))),
        ("acos", Kind(K::ACos, Exactly(1))),
        ("acot", Kind(K::ACot, Exactly(1))),
        ("acsc", Kind(K::ACsc, Exactly(1))),
        ("arccos", Kind(K::ACos, Exactly(1))),
        ("arccosh", Kind(K::ArCosH, Exactly(1))),
        ("arcosh", Kind(K::ArCosH, Exactly(1))),
        ("arcsin", Kind(K::ASin, Exactly(1))),
        ("arcsinh", Kind(K::ArSinH, Exactly(1))),
        ("arctan", Kind(K::ATan, Exactly(1))),
        ("arctanh", Kind(K::ArTanH, Exactly(1))),
        ("arg", Kind(K::Arg, Exactly(1))),
        ("arsinh", Kind(K::ArSinH, Exactly(1))),
        ("artanh", Kind(K::ArTanH, Exactly(1))),
        ("asec", Kind(K::ASec, Exactly(1))),
        ("asin", Kind(K::ASin, Exactly(1))),
        ("atan", Kind(K::ATan, Exactly(1))),
        ("binomial", Kind(K::Binomial, Exactly(2))),
        ("ceil", Kind(K::Ceil, Exactly(1))),
        ("conj", Kind(K::Conj, Exactly(1))),
        ("cos", Kind(K::Cos, Exactly(1))),
        ("cosh", Kind(K::CosH, Exactly(1))),
        ("cot", Kind(K::Cot, Exactly(1))),
        ("cross", Kind(K::Cross, Exactly(2))),
        ("csc", Kind(K::Csc, Exactly(1))),
        ("det", Kind(K::Det, Exactly(1))),
        ("dim", Kind(K::Dim, Exactly(1))),
        ("dot", Kind(K::Dot, Exactly(2))),
        ("exp", Kind(K::Exp, Exactly(1))),
        ("floor", Kind(K::Floor, Exactly(1))),
        ("frac", Kind(K::Frac, Exactly(1))),
        ("gcd", Kind(K::Gcd, AtLeast(2))),
        ("identity", Kind(K::Identity, Exactly(1))),
        ("im", Kind(K::Im, Exactly(1))),
        ("int", Parametric(K::Integral)),
        ("inverse", Kind(K::Inverse, Exactly(1))),
        ("lcm", Kind(K::Lcm, AtLeast(2))),
        ("ln", Kind(K::Ln, Exactly(1))),
        ("log", Log),
        ("max", Kind(K::Max, Exactly(1))),
        ("mean", Kind(K::Mean, Exactly(1))),
        ("med", Kind(K::Median, Exactly(1))),
        ("median", Kind(K::Median, Exactly(1))),
        ("min", Kind(K::Min, Exactly(1))),
        ("mixed", Kind(K::MixedFraction, Exactly(2))),
        ("norm", Kind(K::Norm, Exactly(1))),
        ("permute", Kind(K::Permute, Exactly(2))),
        ("piecewise", Kind(K::Piecewise, AtLeast(1))),
        ("prod", ListOrParametric(K::ListProduct, K::Product)),
        ("product", ListOrParametric(K::ListProduct, K::Product)),
        ("quo", Kind(K::Quo, Exactly(2))),
        ("randint", Kind(K::RandInt, Exactly(2))),
        ("randintnorep", Kind(K::RandIntNoRep, Exactly(3))),
        ("random", Kind(K::Random, Exactly(0))),
        ("re", Kind(K::Re, Exactly(1))),
        ("ref", Kind(K::Ref, Exactly(1))),
        ("rem", Kind(K::Rem, Exactly(2))),
        ("root", Kind(K::Root, Exactly(2))),
        ("round", Round),
        ("rref", Kind(K::Rref, Exactly(1))),
        ("samplestddev", Kind(K::SampleStdDev, Exactly(1))),
        ("sampstddev", Kind(K::SampleStdDev, Exactly(1))),
        ("sec", Kind(K::Sec, Exactly(1))),
        ("sequence", Sequence),
        ("sign", Kind(K::Sign, Exactly(1))),
        ("sin", Kind(K::Sin, Exactly(1))),
        ("sinh", Kind(K::SinH, Exactly(1))),
        ("sort", Kind(K::ListSort, Exactly(1))),
        ("sqrt", Kind(K::Sqrt, Exactly(1))),
        ("stddev", Kind(K::StdDev, Exactly(1))),
        ("sum", ListOrParametric(K::ListSum, K::Sum)),
        ("tan", Kind(K::Tan, Exactly(1))),
        ("tanh", Kind(K::TanH, Exactly(1))),
        ("trace", Kind(K::Trace, Exactly(1))),
        ("transpose", Kind(K::Transpose, Exactly(1))),
        ("var", Kind(K::Variance, Exactly(1))),
    ]
};

fn builtin(name: &str) -> Option<Builtin> {
    FUNCTIONS
        .binary_search_by(|(candidate, _)| candidate.cmp(&name))
        .ok()
        .map(|position| FUNCTIONS[position].1)
}

/// Names called with one argument that denote sequences rather than
/// functions.
const SEQUENCE_NAMES: &[&str] = &["u", "v", "w"];

fn constant(name: &str) -> Option<NodeKind> {
    Some(match name {
        "pi" | "π" => NodeKind::Pi,
        "e" => NodeKind::EulerE,
        "i" => NodeKind::ImaginaryUnit,
        "inf" => NodeKind::Infinity,
        "undef" => NodeKind::Undefined,
        _ => return None,
    })
}

pub(crate) struct Lowering<'t, 'a> {
    tree: &'t mut TreeArena,
    ann: &'a AnnotatedSource<'a, Expr<'a>>,
    /// Names bound by enclosing parametric constructs, innermost last.
    bound: SmallVec<[&'a str; 4]>,
}

impl<'t, 'a> Lowering<'t, 'a> {
    pub(crate) fn new(tree: &'t mut TreeArena, parsed: &ParsedExpr<'a>) -> Self {
        Self {
            tree,
            ann: parsed.ann,
            bound: SmallVec::new(),
        }
    }

    fn span(&self, expr: &Expr<'a>) -> Span {
        self.ann.span_of(expr).unwrap_or_else(|| Span::new(0, 0))
    }

    fn error(&self, expr: &Expr<'a>, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, self.span(expr))
    }

    fn push(&mut self, node: Node) -> Result<usize, ParseError> {
        Ok(self.tree.push(node)?)
    }

    fn push_nary(
        &mut self,
        expr: &Expr<'a>,
        kind: NodeKind,
        count: usize,
    ) -> Result<usize, ParseError> {
        if count > MAX_CHILDREN {
            return Err(self.error(
                expr,
                ParseErrorKind::TooManyElements {
                    found: count,
                    max: MAX_CHILDREN,
                },
            ));
        }
        Ok(self.tree.push_nary(kind, count)?)
    }

    fn lower_all(&mut self, exprs: &[&'a Expr<'a>]) -> Result<(), ParseError> {
        for expr in exprs {
            self.lower(expr)?;
        }
        Ok(())
    }

    /// Lower `expr` with `name` bound to `Variable(0)`.
    fn lower_bound(&mut self, name: &'a str, expr: &'a Expr<'a>) -> Result<usize, ParseError> {
        self.bound.push(name);
        let result = self.lower(expr);
        self.bound.pop();
        result
    }

    pub(crate) fn lower(&mut self, expr: &'a Expr<'a>) -> Result<usize, ParseError> {
        match expr {
            Expr::Literal(literal) => self.lower_literal(*literal),

            Expr::Ident(name) => {
                if let Some(depth) = self.bound.iter().rev().position(|bound| bound == name) {
                    return self.push(Node::variable(depth as u8));
                }
                match constant(name) {
                    Some(kind) => self.push(Node::leaf(kind)),
                    None => self.push(Node::named(NodeKind::UserSymbol, *name)),
                }
            }

            Expr::Unit(name) => match units::parse_unit(name) {
                Some((representative, prefix)) => self.push(Node::unit(representative, prefix)),
                None => Err(self.error(
                    expr,
                    ParseErrorKind::UnknownUnit {
                        name: name.to_string(),
                    },
                )),
            },

            Expr::Unary { op, expr: operand } => {
                let kind = match op {
                    UnaryOp::Neg => NodeKind::Opposite,
                    UnaryOp::Not => NodeKind::LogicalNot,
                };
                let index = self.push(Node::new(kind))?;
                self.lower(operand)?;
                Ok(index)
            }

            Expr::Postfix { op, expr: operand } => {
                let kind = match op {
                    PostfixOp::Factorial => NodeKind::Fact,
                    PostfixOp::Percent => NodeKind::Percent,
                };
                let index = self.push(Node::new(kind))?;
                self.lower(operand)?;
                Ok(index)
            }

            Expr::Binary { op, left, right } => self.lower_binary(expr, *op, left, right),

            Expr::Boolean { op, left, right } => {
                let kind = match op {
                    BoolOp::And => NodeKind::LogicalAnd,
                    BoolOp::Or => NodeKind::LogicalOr,
                    BoolOp::Xor => NodeKind::LogicalXor,
                    BoolOp::Nand => NodeKind::LogicalNand,
                    BoolOp::Nor => NodeKind::LogicalNor,
                };
                self.lower_node(kind, &[*left, *right])
            }

            Expr::Comparison { op, left, right } => {
                let kind = match op {
                    ComparisonOp::Eq => NodeKind::Equal,
                    ComparisonOp::Neq => NodeKind::NotEqual,
                    ComparisonOp::Lt => NodeKind::Less,
                    ComparisonOp::Gt => NodeKind::Greater,
                    ComparisonOp::Le => NodeKind::LessOrEqual,
                    ComparisonOp::Ge => NodeKind::GreaterOrEqual,
                };
                self.lower_node(kind, &[*left, *right])
            }

            Expr::Grouped(inner) => self.lower_node(NodeKind::Parenthesis, &[*inner]),

            Expr::Point { x, y } => self.lower_node(NodeKind::Point, &[*x, *y]),

            Expr::List(items) => {
                let index = self.push_nary(expr, NodeKind::List, items.len())?;
                self.lower_all(items)?;
                Ok(index)
            }

            Expr::Matrix(rows) => {
                let cols = rows.first().map_or(0, |row| row.len());
                if rows.len() > MAX_CHILDREN || cols > MAX_CHILDREN {
                    return Err(self.error(
                        expr,
                        ParseErrorKind::TooManyElements {
                            found: rows.len().max(cols),
                            max: MAX_CHILDREN,
                        },
                    ));
                }
                let index = self.push(Node::matrix(rows.len() as u8, cols as u8))?;
                for row in rows.iter() {
                    self.lower_all(row)?;
                }
                Ok(index)
            }

            Expr::Call { callable, args } => self.lower_call(expr, callable, args),
        }
    }

    fn lower_literal(&mut self, literal: Literal) -> Result<usize, ParseError> {
        match literal {
            Literal::Int(value) => self.push(Node::integer(value)),
            Literal::Decimal {
                mantissa,
                exponent: 0,
            } => self.push(Node::integer(mantissa)),
            Literal::Decimal { mantissa, exponent } => {
                let index = self.push(Node::decimal(exponent))?;
                self.push(Node::integer(mantissa))?;
                Ok(index)
            }
            Literal::Float(value) => self.push(Node::float(value)),
            Literal::Bool(value) => self.push(Node::boolean(value)),
            Literal::Infinity => self.push(Node::leaf(NodeKind::Infinity)),
        }
    }

    /// A fixed-arity node with `children` lowered in order.
    fn lower_node(
        &mut self,
        kind: NodeKind,
        children: &[&'a Expr<'a>],
    ) -> Result<usize, ParseError> {
        let index = self.push(Node::new(kind))?;
        self.lower_all(children)?;
        Ok(index)
    }

    fn lower_binary(
        &mut self,
        expr: &'a Expr<'a>,
        op: BinaryOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    ) -> Result<usize, ParseError> {
        match op {
            // `a + b%` and `a - b%` scale `a` by a percentage.
            BinaryOp::Add | BinaryOp::Sub if percent_operand(right).is_some() => {
                let index = self.push(Node::new(NodeKind::PercentAddition))?;
                self.lower(left)?;
                let percentage = percent_operand(right).unwrap_or(right);
                if op == BinaryOp::Sub {
                    self.push(Node::new(NodeKind::Opposite))?;
                }
                self.lower(percentage)?;
                Ok(index)
            }
            BinaryOp::Add => {
                let mut terms = Vec::new();
                collect_operands(expr, &mut terms, &|op| op == BinaryOp::Add);
                let index = self.push_nary(expr, NodeKind::Add, terms.len())?;
                self.lower_all(&terms)?;
                Ok(index)
            }
            BinaryOp::Mul | BinaryOp::ImplicitMul => {
                let mut factors = Vec::new();
                collect_operands(expr, &mut factors, &|op| {
                    matches!(op, BinaryOp::Mul | BinaryOp::ImplicitMul)
                });
                let index = self.push_nary(expr, NodeKind::Mult, factors.len())?;
                self.lower_all(&factors)?;
                Ok(index)
            }
            BinaryOp::Sub => self.lower_node(NodeKind::Sub, &[left, right]),
            BinaryOp::Div => self.lower_node(NodeKind::Div, &[left, right]),
            BinaryOp::Pow => self.lower_node(NodeKind::Pow, &[left, right]),
            BinaryOp::Convert => self.lower_node(NodeKind::UnitConversion, &[left, right]),
        }
    }

    fn lower_call(
        &mut self,
        expr: &'a Expr<'a>,
        callable: &'a Expr<'a>,
        args: &'a [&'a Expr<'a>],
    ) -> Result<usize, ParseError> {
        let name = match callable {
            Expr::Ident(name) if !self.bound.contains(name) => Some(*name),
            _ => None,
        };
        let Some(name) = name else {
            return self.lower_list_access(expr, callable, args);
        };
        let wrong_count = |this: &Self, expected: Args| {
            this.error(
                expr,
                ParseErrorKind::WrongArgumentCount {
                    function: name.to_string(),
                    expected: expected.describe(),
                    found: args.len(),
                },
            )
        };
        let Some(function) = builtin(name) else {
            if args.len() != 1 {
                return Err(wrong_count(self, Args::Exactly(1)));
            }
            let kind = if SEQUENCE_NAMES.contains(&name) {
                NodeKind::UserSequence
            } else {
                NodeKind::UserFunction
            };
            trace!(name, ?kind, "user call");
            let index = self.push(Node::named(kind, name))?;
            self.lower(args[0])?;
            return Ok(index);
        };
        match function {
            Builtin::Kind(kind, expected) => {
                if !expected.accepts(args.len()) {
                    return Err(wrong_count(self, expected));
                }
                let index = if kind.is_nary() {
                    self.push_nary(expr, kind, args.len())?
                } else {
                    self.push(Node::new(kind))?
                };
                self.lower_all(args)?;
                Ok(index)
            }
            Builtin::ListOrParametric(list_kind, _) if args.len() == 1 => {
                self.lower_node(list_kind, args)
            }
            Builtin::ListOrParametric(_, kind) | Builtin::Parametric(kind) => {
                if args.len() != 4 {
                    return Err(wrong_count(self, Args::Exactly(4)));
                }
                let variable = self.variable_name(name, args[1])?;
                let index = self.push(Node::new(kind))?;
                self.lower(args[2])?;
                self.lower(args[3])?;
                self.lower_bound(variable, args[0])?;
                Ok(index)
            }
            Builtin::Sequence => {
                if args.len() != 3 {
                    return Err(wrong_count(self, Args::Exactly(3)));
                }
                let variable = self.variable_name(name, args[1])?;
                let index = self.push(Node::new(NodeKind::ListSequence))?;
                self.lower_bound(variable, args[0])?;
                self.lower(args[2])?;
                Ok(index)
            }
            Builtin::Log => match args {
                [x] => self.lower_node(NodeKind::Log, &[*x]),
                [x, base] => self.lower_node(NodeKind::LogBase, &[*x, *base]),
                _ => Err(wrong_count(self, Args::Between(1, 2))),
            },
            Builtin::Round => match args {
                [x] => {
                    let index = self.push(Node::new(NodeKind::Round))?;
                    self.lower(*x)?;
                    self.push(Node::integer(0))?;
                    Ok(index)
                }
                [x, digits] => self.lower_node(NodeKind::Round, &[*x, *digits]),
                _ => Err(wrong_count(self, Args::Between(1, 2))),
            },
        }
    }

    /// `l(k)` is the k-th element, `l(a, b)` the slice from a to b.
    fn lower_list_access(
        &mut self,
        expr: &'a Expr<'a>,
        list: &'a Expr<'a>,
        args: &'a [&'a Expr<'a>],
    ) -> Result<usize, ParseError> {
        match args {
            [k] => self.lower_node(NodeKind::ListElement, &[list, *k]),
            [a, b] => self.lower_node(NodeKind::ListSlice, &[list, *a, *b]),
            _ => Err(self.error(
                expr,
                ParseErrorKind::WrongArgumentCount {
                    function: "list access".to_string(),
                    expected: Args::Between(1, 2).describe(),
                    found: args.len(),
                },
            )),
        }
    }

    fn variable_name(&self, function: &str, expr: &'a Expr<'a>) -> Result<&'a str, ParseError> {
        match expr {
            Expr::Ident(name) if constant(name).is_none() => Ok(*name),
            _ => Err(self.error(
                expr,
                ParseErrorKind::ExpectedVariable {
                    function: function.to_string(),
                },
            )),
        }
    }
}

/// The operand of `b%`, looking through nothing else.
fn percent_operand<'a>(expr: &'a Expr<'a>) -> Option<&'a Expr<'a>> {
    match expr {
        Expr::Postfix {
            op: PostfixOp::Percent,
            expr,
        } => Some(*expr),
        _ => None,
    }
}

/// Operands of a chain of the same associative operator, left to right.
/// Parentheses stop the flattening.
fn collect_operands<'a>(
    expr: &'a Expr<'a>,
    operands: &mut Vec<&'a Expr<'a>>,
    same_op: &dyn Fn(BinaryOp) -> bool,
) {
    match expr {
        Expr::Binary { op, left, right } if same_op(*op) && percent_operand(right).is_none() => {
            collect_operands(left, operands, same_op);
            collect_operands(right, operands, same_op);
        }
        _ => operands.push(expr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_table_is_sorted() {
        assert!(FUNCTIONS.windows(2).all(|pair| pair[0].0 < pair[1].0));
        assert!(matches!(builtin("cos"), Some(Builtin::Kind(NodeKind::Cos, Args::Exactly(1)))));
        assert!(builtin("cosine").is_none());
    }

    #[test]
    fn test_argument_counts() {
        assert!(Args::AtLeast(2).accepts(5));
        assert!(!Args::Between(1, 2).accepts(3));
        assert_eq!(Args::Between(1, 2).describe(), "1 or 2");
    }
}
