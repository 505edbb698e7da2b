// Source positions shared by the AST and parse errors.

use core::{cell::RefCell, ops::Range};

use bumpalo::Bump;
use hashbrown::{DefaultHashBuilder, HashMap};

/// Spans of AST nodes, keyed by node address.
#[derive(Debug)]
pub struct AnnotatedSource<'a, T> {
    pub source: &'a str,
    spans: RefCell<HashMap<*const T, Span, DefaultHashBuilder, &'a Bump>>,
}

impl<'a, T> AnnotatedSource<'a, T> {
    pub fn new(arena: &'a Bump, source: &'a str) -> Self {
        Self {
            source,
            spans: RefCell::new(HashMap::new_in(arena)),
        }
    }
    pub fn add_span(&self, expr: &T, span: Span) {
        let p = expr as *const _;
        self.spans.borrow_mut().insert(p, span);
    }
    pub fn span_of(&self, expr: &T) -> Option<Span> {
        let p = expr as *const _;
        self.spans.borrow().get(&p).cloned()
    }
}

/// Byte range in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span(pub Range<usize>);

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self(start..end)
    }
    pub fn combine(a: &Span, b: &Span) -> Span {
        Span::new(a.0.start, b.0.end)
    }
}

impl From<pest::Span<'_>> for Span {
    fn from(s: pest::Span<'_>) -> Self {
        Self(s.start()..s.end())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    /// Juxtaposition of a value and a unit, as in `3_m`.
    ImplicitMul,
    /// `→`, conversion into a target unit.
    Convert,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
    Xor,
    Nand,
    Nor,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PostfixOp {
    Factorial,
    Percent,
}
