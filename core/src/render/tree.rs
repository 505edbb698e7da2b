//! Infix writer for trees.
//!
//! Both user-form trees (`Sub`, `Div`, `Sqrt`...) and projected ones are
//! accepted. Projected forms are written back in user syntax where one
//! exists: `A + (-1)·B` prints as `A-B` and `A·B^-1` as `A/B`.

use smallvec::SmallVec;

use super::FloatFormat;
use super::float::{render_decimal, render_float};
use crate::tree::{Node, NodeKind, Payload, TreeArena};
use crate::units::unit_symbol;
use crate::{String, ToString};

use NodeKind::*;

// Binding strength, loosest first.
const CONVERSION: u8 = 1;
const OR: u8 = 2;
const AND: u8 = 3;
const NOT: u8 = 4;
const COMPARISON: u8 = 5;
const ADD: u8 = 6;
const MULT: u8 = 7;
const NEG: u8 = 8;
const POW: u8 = 9;
const POSTFIX: u8 = 10;
const ATOM: u8 = 11;

pub(super) fn render(arena: &TreeArena, index: usize, format: FloatFormat) -> String {
    let mut writer = TreeWriter {
        arena,
        format,
        out: String::new(),
        binders: SmallVec::new(),
    };
    writer.write(index);
    writer.out
}

/// Name of a kind written as a plain call `name(args...)`.
fn function_name(kind: NodeKind) -> Option<&'static str> {
    Some(match kind {
        Abs => "abs",
        Floor => "floor",
        Ceil => "ceil",
        Frac => "frac",
        Round => "round",
        Sign => "sign",
        Re => "re",
        Im => "im",
        Arg => "arg",
        Conj => "conj",
        Binomial => "binomial",
        Permute => "permute",
        Quo => "quo",
        Rem => "rem",
        Gcd => "gcd",
        Lcm => "lcm",
        Root => "root",
        Sqrt => "sqrt",
        Exp => "exp",
        Ln | LnReal => "ln",
        Log | LogBase => "log",
        MixedFraction => "mixed",
        Cos => "cos",
        Sin => "sin",
        Tan | TanRad => "tan",
        Sec => "sec",
        Csc => "csc",
        Cot => "cot",
        ACos => "acos",
        ASin => "asin",
        ATan | ATanRad => "atan",
        ASec => "asec",
        ACsc => "acsc",
        ACot => "acot",
        CosH => "cosh",
        SinH => "sinh",
        TanH => "tanh",
        ArCosH => "arcosh",
        ArSinH => "arsinh",
        ArTanH => "artanh",
        ListSum => "sum",
        ListProduct => "product",
        Min => "min",
        Max => "max",
        Mean => "mean",
        Median => "median",
        Variance => "var",
        StdDev => "stddev",
        SampleStdDev => "samplestddev",
        ListSort => "sort",
        Identity => "identity",
        Det => "det",
        Trace => "trace",
        Inverse => "inverse",
        Transpose => "transpose",
        Dim => "dim",
        Norm => "norm",
        Dot => "dot",
        Cross => "cross",
        Ref => "ref",
        Rref => "rref",
        Piecewise => "piecewise",
        Random => "random",
        RandInt => "randint",
        RandIntNoRep => "randintnorep",
        _ => return None,
    })
}

fn infix_operator(kind: NodeKind) -> Option<(&'static str, u8)> {
    Some(match kind {
        UnitConversion => ("→", CONVERSION),
        LogicalOr => (" or ", OR),
        LogicalXor => (" xor ", OR),
        LogicalNor => (" nor ", OR),
        LogicalAnd => (" and ", AND),
        LogicalNand => (" nand ", AND),
        Equal => ("=", COMPARISON),
        NotEqual => ("≠", COMPARISON),
        Less => ("<", COMPARISON),
        LessOrEqual => ("≤", COMPARISON),
        Greater => (">", COMPARISON),
        GreaterOrEqual => ("≥", COMPARISON),
        _ => return None,
    })
}

/// One factor of a product, split into numerator and denominator.
#[derive(Debug, Clone, Copy)]
enum Factor {
    Tree(usize),
    Integer(u64),
    /// `base^n` for the positive `n` of a negative exponent.
    Power(usize, i64),
}

#[derive(Default)]
struct Fraction {
    negative: bool,
    numerator: SmallVec<[Factor; 4]>,
    denominator: SmallVec<[Factor; 2]>,
}

struct TreeWriter<'a> {
    arena: &'a TreeArena,
    format: FloatFormat,
    out: String,
    /// Names of the bound variables in scope, innermost last.
    binders: SmallVec<[String; 4]>,
}

impl<'a> TreeWriter<'a> {
    fn node(&self, index: usize) -> &'a Node {
        self.arena.node(index)
    }

    fn negative_integer_exponent(&self, pow: usize) -> Option<i64> {
        let exponent = self.arena.child(pow, 1);
        self.node(exponent).as_integer().filter(|n| *n < 0)
    }

    fn is_pow(&self, index: usize) -> bool {
        matches!(self.node(index).kind, Pow | PowReal | PowMatrix)
    }

    fn precedence(&self, index: usize) -> u8 {
        let node = self.node(index);
        if let Some((p, q)) = node.as_rational() {
            return match (p < 0, q == 1) {
                (_, false) => MULT,
                (true, true) => NEG,
                (false, true) => ATOM,
            };
        }
        if let Some((_, precedence)) = infix_operator(node.kind) {
            return precedence;
        }
        match node.kind {
            Float => match node.payload {
                Payload::Float(v) if v.is_sign_negative() && v != 0.0 => NEG,
                _ => ATOM,
            },
            LogicalNot => NOT,
            Add | Sub | PercentAddition => ADD,
            Mult | Div => MULT,
            Pow | PowReal | PowMatrix => {
                let exponent = self.arena.child(index, 1);
                if self.node(exponent).kind == Half {
                    ATOM
                } else if self.negative_integer_exponent(index).is_some() {
                    MULT
                } else {
                    POW
                }
            }
            Exp if self.node(index + 1).kind == One => ATOM,
            Exp => POW,
            Opposite => NEG,
            Fact | Percent => POSTFIX,
            Dependency => self.precedence(index + 1),
            _ => ATOM,
        }
    }

    fn write_at(&mut self, index: usize, min_precedence: u8) {
        if self.precedence(index) < min_precedence {
            self.out.push('(');
            self.write(index);
            self.out.push(')');
        } else {
            self.write(index);
        }
    }

    fn write_list(&mut self, children: impl IntoIterator<Item = usize>) {
        for (n, child) in children.into_iter().enumerate() {
            if n > 0 {
                self.out.push_str(", ");
            }
            self.write(child);
        }
    }

    fn write_call(&mut self, name: &str, children: impl IntoIterator<Item = usize>) {
        self.out.push_str(name);
        self.out.push('(');
        self.write_list(children);
        self.out.push(')');
    }

    fn write_infix(&mut self, index: usize, operator: &str, precedence: u8) {
        let left = index + 1;
        let right = self.arena.next_tree(left);
        self.write_at(left, precedence);
        self.out.push_str(operator);
        self.write_at(right, precedence + 1);
    }

    fn write(&mut self, index: usize) {
        let arena = self.arena;
        let node = self.node(index);
        let kind = node.kind;
        if let Some((p, q)) = node.as_rational() {
            self.out.push_str(&p.to_string());
            if q != 1 {
                self.out.push('/');
                self.out.push_str(&q.to_string());
            }
            return;
        }
        if let Some((operator, precedence)) = infix_operator(kind) {
            return self.write_infix(index, operator, precedence);
        }
        match &node.payload {
            Payload::Float(v) => return self.out.push_str(&render_float(*v, self.format)),
            Payload::Name(name) => {
                self.out.push_str(name);
                if kind != UserSymbol {
                    self.out.push('(');
                    self.write(index + 1);
                    self.out.push(')');
                }
                return;
            }
            Payload::Unit {
                representative,
                prefix,
            } => {
                let (prefix, symbol) = unit_symbol(*representative, *prefix);
                self.out.push('_');
                self.out.push_str(prefix);
                self.out.push_str(symbol);
                return;
            }
            Payload::Variable(id) => {
                let depth = self.binders.len();
                let name = match depth.checked_sub(*id as usize + 1) {
                    Some(slot) => self.binders[slot].clone(),
                    None => "?".to_string(),
                };
                return self.out.push_str(&name);
            }
            _ => {}
        }
        match kind {
            Pi => self.out.push('π'),
            EulerE => self.out.push('e'),
            ImaginaryUnit => self.out.push('i'),
            Infinity => self.out.push('∞'),
            Undefined => self.out.push_str("undef"),
            NonReal => self.out.push_str("nonreal"),
            Forbidden => self.out.push_str("forbidden"),
            True => self.out.push_str("true"),
            False => self.out.push_str("false"),
            Parameter => self.out.push('x'),
            Decimal => {
                let exponent = match node.payload {
                    Payload::Exponent(e) => e,
                    _ => 0,
                };
                match self.node(index + 1).as_integer() {
                    Some(mantissa) => render_decimal(mantissa, exponent, &mut self.out),
                    None => self.write(index + 1),
                }
            }
            Parenthesis => {
                self.out.push('(');
                self.write(index + 1);
                self.out.push(')');
            }
            Add => self.write_sum(index),
            Sub => self.write_infix(index, "-", ADD),
            Div => self.write_infix(index, "/", MULT),
            Mult => {
                let product = self.product(arena.children(index));
                self.write_product(&product, false);
            }
            Pow | PowReal | PowMatrix => self.write_power(index),
            Exp => {
                self.out.push('e');
                if self.node(index + 1).kind != One {
                    self.out.push('^');
                    self.write_at(index + 1, POW);
                }
            }
            Opposite => {
                self.out.push('-');
                self.write_at(index + 1, NEG);
            }
            LogicalNot => {
                self.out.push_str("not ");
                self.write_at(index + 1, NOT);
            }
            Fact | Percent => {
                self.write_at(index + 1, POSTFIX);
                self.out.push(if kind == Fact { '!' } else { '%' });
            }
            PercentAddition => self.write_percent_addition(index),
            Trig | ATrig => {
                let k = self.node(self.arena.child(index, 1)).as_integer();
                let name = match (kind, k) {
                    (Trig, Some(0)) => "cos",
                    (Trig, _) => "sin",
                    (_, Some(0)) => "acos",
                    _ => "asin",
                };
                self.write_call(name, [index + 1]);
            }
            List | DependencyList => {
                self.out.push('{');
                self.write_list(arena.children(index));
                self.out.push('}');
            }
            Point => {
                self.out.push('(');
                self.write_list(arena.children(index));
                self.out.push(')');
            }
            Matrix => self.write_matrix(index),
            ListElement | ListSlice => {
                self.write_at(index + 1, ATOM);
                self.out.push('(');
                self.write_list(arena.children(index).skip(1));
                self.out.push(')');
            }
            Sum | Product | Integral => {
                let (name, variable) = match kind {
                    Sum => ("sum", "k"),
                    Product => ("product", "k"),
                    _ => ("int", "x"),
                };
                let children = self.arena.child_positions(index);
                self.write_bound(name, variable, children[2], &[children[0], children[1]]);
            }
            ListSequence => {
                let children = self.arena.child_positions(index);
                self.write_bound("sequence", "k", children[0], &[children[1]]);
            }
            Dependency => self.write(index + 1),
            _ => match function_name(kind) {
                Some(name) => self.write_call(name, arena.children(index)),
                None => self.write_call(&kind.name().to_lowercase(), arena.children(index)),
            },
        }
    }

    /// Whether a term of a sum prints with a leading minus.
    fn is_negative_term(&self, index: usize) -> bool {
        let node = self.node(index);
        match node.kind {
            Opposite => true,
            Float => matches!(node.payload, Payload::Float(v) if v < 0.0),
            Mult => self
                .node(index + 1)
                .as_rational()
                .is_some_and(|(p, _)| p < 0),
            _ => node.as_rational().is_some_and(|(p, _)| p < 0),
        }
    }

    /// A term of a sum without its leading minus.
    fn write_negated(&mut self, index: usize) {
        let arena = self.arena;
        let node = self.node(index);
        match node.kind {
            Opposite => self.write_at(index + 1, MULT),
            Float => {
                if let Payload::Float(v) = node.payload {
                    self.out.push_str(&render_float(-v, self.format));
                }
            }
            Mult => {
                let product = self.product(arena.children(index));
                self.write_product(&product, true);
            }
            _ => {
                if let Some((p, q)) = node.as_rational() {
                    self.out.push_str(&p.unsigned_abs().to_string());
                    if q != 1 {
                        self.out.push('/');
                        self.out.push_str(&q.to_string());
                    }
                }
            }
        }
    }

    fn write_sum(&mut self, index: usize) {
        let arena = self.arena;
        for (n, term) in arena.children(index).enumerate() {
            if n == 0 {
                self.write_at(term, ADD);
            } else if self.is_negative_term(term) {
                self.out.push('-');
                self.write_negated(term);
            } else {
                self.out.push('+');
                self.write_at(term, ADD + 1);
            }
        }
    }

    fn write_percent_addition(&mut self, index: usize) {
        let base = index + 1;
        let percent = self.arena.next_tree(base);
        self.write_at(base, ADD);
        if self.node(percent).kind == Opposite {
            self.out.push('-');
            self.write_at(percent + 1, POSTFIX);
        } else {
            self.out.push('+');
            self.write_at(percent, POSTFIX);
        }
        self.out.push('%');
    }

    fn product(&self, factors: impl Iterator<Item = usize>) -> Fraction {
        let mut product = Fraction::default();
        for factor in factors {
            if let Some((p, q)) = self.node(factor).as_rational() {
                product.negative ^= p < 0;
                if p.unsigned_abs() != 1 {
                    product.numerator.push(Factor::Integer(p.unsigned_abs()));
                }
                if q != 1 {
                    product.denominator.push(Factor::Integer(q as u64));
                }
            } else if let Some(n) = self
                .is_pow(factor)
                .then(|| self.negative_integer_exponent(factor))
                .flatten()
            {
                product.denominator.push(Factor::Power(factor + 1, -n));
            } else {
                product.numerator.push(Factor::Tree(factor));
            }
        }
        product
    }

    fn write_factor(&mut self, factor: Factor) {
        match factor {
            Factor::Integer(n) => self.out.push_str(&n.to_string()),
            Factor::Tree(index) => self.write_at(index, POW),
            Factor::Power(base, n) => {
                self.write_at(base, POW + 1);
                if n != 1 {
                    self.out.push('^');
                    self.out.push_str(&n.to_string());
                }
            }
        }
    }

    fn write_factors(&mut self, factors: &[Factor]) {
        for (n, factor) in factors.iter().enumerate() {
            // `3_km`: a unit multiplies without an operator.
            let implicit = matches!(factor, Factor::Tree(i) if self.node(*i).kind == Unit);
            if n > 0 && !implicit {
                self.out.push('*');
            }
            self.write_factor(*factor);
        }
    }

    /// `negated`: the sign was already written by the enclosing sum.
    fn write_product(&mut self, product: &Fraction, negated: bool) {
        if product.negative && !negated {
            self.out.push('-');
        }
        if product.numerator.is_empty() {
            self.out.push('1');
        } else {
            self.write_factors(&product.numerator);
        }
        match product.denominator.as_slice() {
            [] => {}
            [single] => {
                self.out.push('/');
                self.write_factor(*single);
            }
            several => {
                self.out.push_str("/(");
                self.write_factors(several);
                self.out.push(')');
            }
        }
    }

    fn write_power(&mut self, index: usize) {
        let base = index + 1;
        let exponent = self.arena.next_tree(base);
        if self.node(exponent).kind == Half {
            return self.write_call("sqrt", [base]);
        }
        if self.negative_integer_exponent(index).is_some() {
            let product = self.product(core::iter::once(index));
            return self.write_product(&product, false);
        }
        self.write_at(base, POW + 1);
        self.out.push('^');
        self.write_at(exponent, POW);
    }

    fn write_matrix(&mut self, index: usize) {
        let Some((_, cols)) = self.node(index).matrix_size() else {
            return;
        };
        let children = self.arena.child_positions(index);
        self.out.push('[');
        for row in children.chunks(cols.max(1) as usize) {
            self.out.push('[');
            self.write_list(row.iter().copied());
            self.out.push(']');
        }
        self.out.push(']');
    }

    /// `name(body, variable, bounds...)` with `variable` bound in `body`.
    fn write_bound(&mut self, name: &str, variable: &str, body: usize, bounds: &[usize]) {
        let mut bound = variable.to_string();
        if self.binders.iter().any(|b| *b == bound) {
            bound.push_str(&self.binders.len().to_string());
        }
        self.out.push_str(name);
        self.out.push('(');
        self.binders.push(bound.clone());
        self.write(body);
        self.binders.pop();
        self.out.push_str(", ");
        self.out.push_str(&bound);
        for position in bounds {
            self.out.push_str(", ");
            self.write(*position);
        }
        self.out.push(')');
    }
}
