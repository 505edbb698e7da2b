use crate::parser::{BinaryOp, BoolOp, ComparisonOp, PostfixOp, UnaryOp, syntax::AnnotatedSource};

/// A parsed expression with the spans of its nodes.
#[derive(Debug)]
pub struct ParsedExpr<'a> {
    pub expr: &'a Expr<'a>,
    pub ann: &'a AnnotatedSource<'a, Expr<'a>>,
}

/// Surface syntax, allocated in a bump arena and lowered into a
/// [`TreeArena`](crate::tree::TreeArena) right after parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr<'a> {
    Binary {
        op: BinaryOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    },
    Boolean {
        op: BoolOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    },
    Comparison {
        op: ComparisonOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    },
    Unary {
        op: UnaryOp,
        expr: &'a Expr<'a>,
    },
    Postfix {
        op: PostfixOp,
        expr: &'a Expr<'a>,
    },
    /// `f(a, b)` for a named function, or `l(k)` / `l(a, b)` indexing a list.
    Call {
        callable: &'a Expr<'a>,
        args: &'a [&'a Expr<'a>],
    },
    Grouped(&'a Expr<'a>),
    Point {
        x: &'a Expr<'a>,
        y: &'a Expr<'a>,
    },
    List(&'a [&'a Expr<'a>]),
    /// Rows of equal length.
    Matrix(&'a [&'a [&'a Expr<'a>]]),
    Literal(Literal),
    /// Unit symbol without its leading underscore.
    Unit(&'a str),
    Ident(&'a str),
}

impl<'a> Expr<'a> {
    pub fn as_ptr(&self) -> *const Self {
        self as *const _
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Int(i64),
    /// `mantissa · 10^(-exponent)`, exact.
    Decimal { mantissa: i64, exponent: i16 },
    /// A literal too long for an exact decimal.
    Float(f64),
    Bool(bool),
    Infinity,
}
