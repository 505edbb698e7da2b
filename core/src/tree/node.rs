use core::fmt;

use ecow::EcoString;

use super::kind::{Arity, NodeKind};

/// Inline parameters carried by a node record.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    None,
    /// Child count of an n-ary node.
    Count(u8),
    Matrix { rows: u8, cols: u8 },
    Integer(i64),
    Rational(i64, i64),
    Float(f64),
    /// Power-of-ten exponent of a `Decimal`.
    Exponent(i16),
    Unit { representative: u8, prefix: u8 },
    /// De Bruijn index of a bound variable.
    Variable(u8),
    /// Random seed slot; 0 means "not assigned yet".
    Seed(u8),
    Name(EcoString),
}

/// One record of the arena: a kind tag and its inline parameters.
///
/// Children are not referenced from here; they follow the node in the
/// arena in prefix order.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub payload: Payload,
}

static_assertions::const_assert!(core::mem::size_of::<Node>() <= 32);

impl Node {
    pub const fn leaf(kind: NodeKind) -> Node {
        Node {
            kind,
            payload: Payload::None,
        }
    }

    /// A node with the payload its kind needs by default.
    pub fn new(kind: NodeKind) -> Node {
        let payload = match kind {
            _ if kind.is_nary() => Payload::Count(0),
            NodeKind::Matrix => Payload::Matrix { rows: 0, cols: 0 },
            NodeKind::IntegerLiteral => Payload::Integer(0),
            NodeKind::Rational => Payload::Rational(0, 1),
            NodeKind::Float => Payload::Float(0.0),
            NodeKind::Decimal => Payload::Exponent(0),
            NodeKind::Unit => Payload::Unit {
                representative: 0,
                prefix: 0,
            },
            NodeKind::Variable => Payload::Variable(0),
            NodeKind::Random | NodeKind::RandInt | NodeKind::RandIntNoRep => Payload::Seed(0),
            NodeKind::UserSymbol | NodeKind::UserFunction | NodeKind::UserSequence => {
                Payload::Name(EcoString::new())
            }
            _ => Payload::None,
        };
        Node { kind, payload }
    }

    pub fn nary(kind: NodeKind, count: u8) -> Node {
        debug_assert!(kind.is_nary());
        Node {
            kind,
            payload: Payload::Count(count),
        }
    }

    pub fn integer(value: i64) -> Node {
        match value {
            0 => Node::leaf(NodeKind::Zero),
            1 => Node::leaf(NodeKind::One),
            2 => Node::leaf(NodeKind::Two),
            -1 => Node::leaf(NodeKind::MinusOne),
            _ => Node {
                kind: NodeKind::IntegerLiteral,
                payload: Payload::Integer(value),
            },
        }
    }

    /// A normalized rational `p/q` (sign on the numerator, lowest terms).
    ///
    /// Returns `None` when `q` is zero or normalization overflows.
    pub fn rational(p: i64, q: i64) -> Option<Node> {
        let (p, q) = normalize_rational(p, q)?;
        Some(match (p, q) {
            (_, 1) => Node::integer(p),
            (1, 2) => Node::leaf(NodeKind::Half),
            _ => Node {
                kind: NodeKind::Rational,
                payload: Payload::Rational(p, q),
            },
        })
    }

    pub fn float(value: f64) -> Node {
        Node {
            kind: NodeKind::Float,
            payload: Payload::Float(value),
        }
    }

    pub fn named(kind: NodeKind, name: impl Into<EcoString>) -> Node {
        debug_assert!(kind.is_user_named());
        Node {
            kind,
            payload: Payload::Name(name.into()),
        }
    }

    pub fn unit(representative: u8, prefix: u8) -> Node {
        Node {
            kind: NodeKind::Unit,
            payload: Payload::Unit {
                representative,
                prefix,
            },
        }
    }

    pub fn variable(id: u8) -> Node {
        Node {
            kind: NodeKind::Variable,
            payload: Payload::Variable(id),
        }
    }

    pub fn matrix(rows: u8, cols: u8) -> Node {
        Node {
            kind: NodeKind::Matrix,
            payload: Payload::Matrix { rows, cols },
        }
    }

    pub fn decimal(exponent: i16) -> Node {
        Node {
            kind: NodeKind::Decimal,
            payload: Payload::Exponent(exponent),
        }
    }

    pub fn boolean(value: bool) -> Node {
        Node::leaf(if value { NodeKind::True } else { NodeKind::False })
    }

    pub fn child_count(&self) -> usize {
        match self.kind.arity() {
            Arity::Fixed(n) => n as usize,
            Arity::NAry => match self.payload {
                Payload::Count(n) => n as usize,
                _ => 0,
            },
            Arity::Matrix => match self.payload {
                Payload::Matrix { rows, cols } => rows as usize * cols as usize,
                _ => 0,
            },
        }
    }

    /// Exact value of a rational number node as `(p, q)`.
    pub fn as_rational(&self) -> Option<(i64, i64)> {
        match (self.kind, &self.payload) {
            (NodeKind::Zero, _) => Some((0, 1)),
            (NodeKind::One, _) => Some((1, 1)),
            (NodeKind::Two, _) => Some((2, 1)),
            (NodeKind::MinusOne, _) => Some((-1, 1)),
            (NodeKind::Half, _) => Some((1, 2)),
            (NodeKind::IntegerLiteral, Payload::Integer(v)) => Some((*v, 1)),
            (NodeKind::Rational, Payload::Rational(p, q)) => Some((*p, *q)),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self.as_rational()? {
            (p, 1) => Some(p),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match &self.payload {
            Payload::Name(name) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn seed(&self) -> Option<u8> {
        match self.payload {
            Payload::Seed(seed) => Some(seed),
            _ => None,
        }
    }

    pub fn matrix_size(&self) -> Option<(u8, u8)> {
        match self.payload {
            Payload::Matrix { rows, cols } => Some((rows, cols)),
            _ => None,
        }
    }

    pub fn unit_ids(&self) -> Option<(u8, u8)> {
        match self.payload {
            Payload::Unit {
                representative,
                prefix,
            } => Some((representative, prefix)),
            _ => None,
        }
    }

    pub fn variable_id(&self) -> Option<u8> {
        match self.payload {
            Payload::Variable(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_rational() {
            Some((p, 1)) => return write!(f, "{}", p),
            Some((p, q)) => return write!(f, "{}/{}", p, q),
            None => {}
        }
        match &self.payload {
            Payload::None => write!(f, "{}", self.kind.name()),
            Payload::Count(n) => write!(f, "{}({})", self.kind.name(), n),
            Payload::Matrix { rows, cols } => write!(f, "Matrix({}x{})", rows, cols),
            Payload::Integer(_) | Payload::Rational(..) => write!(f, "{}", self.kind.name()),
            Payload::Float(v) => write!(f, "{:?}", v),
            Payload::Exponent(e) => write!(f, "Decimal(e{})", e),
            Payload::Unit {
                representative,
                prefix,
            } => write!(f, "Unit({}, {})", representative, prefix),
            Payload::Variable(id) => write!(f, "Var({})", id),
            Payload::Seed(seed) => write!(f, "{}[{}]", self.kind.name(), seed),
            Payload::Name(name) => write!(f, "{}({:?})", self.kind.name(), name),
        }
    }
}

/// Lowest terms with a positive denominator.
pub fn normalize_rational(p: i64, q: i64) -> Option<(i64, i64)> {
    if q == 0 {
        return None;
    }
    let g = gcd(p.unsigned_abs(), q.unsigned_abs()).max(1);
    let g = i64::try_from(g).ok()?;
    let (mut p, mut q) = (p / g, q / g);
    if q < 0 {
        p = p.checked_neg()?;
        q = q.checked_neg()?;
    }
    Some((p, q))
}

pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_integer_uses_compact_kinds() {
        assert_eq!(Node::integer(0).kind, NodeKind::Zero);
        assert_eq!(Node::integer(-1).kind, NodeKind::MinusOne);
        assert_eq!(Node::integer(12).payload, Payload::Integer(12));
    }

    #[test]
    fn test_rational_normalization() {
        assert_eq!(Node::rational(2, 4), Some(Node::leaf(NodeKind::Half)));
        assert_eq!(Node::rational(6, -3), Some(Node::integer(-2)));
        assert_eq!(
            Node::rational(-3, -9),
            Some(Node {
                kind: NodeKind::Rational,
                payload: Payload::Rational(1, 3)
            })
        );
        assert_eq!(Node::rational(1, 0), None);
    }

    #[test]
    fn test_child_count() {
        assert_eq!(Node::nary(NodeKind::Add, 3).child_count(), 3);
        assert_eq!(Node::matrix(2, 3).child_count(), 6);
        assert_eq!(Node::leaf(NodeKind::Cos).child_count(), 1);
    }
}
