//! # Tree byte layout
//!
//! The storage collaborator persists projected trees as raw byte buffers.
//! The layout is a depth-first dump of the node records with no padding:
//!
//! ```text
//! [tag: u8][inline parameters...][child 1]...[child n]
//! ```
//!
//! All multi-byte values are little-endian. Inline parameters depend on the
//! kind:
//!
//! - n-ary kinds: `u8` child count
//! - `Matrix`: `u8` rows, `u8` cols
//! - `IntegerLiteral`: `i64`
//! - `Rational`: `i64` numerator, `i64` denominator
//! - `Float`: `f64` bit pattern
//! - `Decimal`: `i16` exponent
//! - `Unit`: `u8` representative, `u8` prefix
//! - `Variable`: `u8` id
//! - random kinds: `u8` seed slot
//! - user-named kinds: `u8` length, then that many UTF-8 bytes
//!
//! Tags are the [`NodeKind`] discriminants, so the layout is stable as long
//! as kinds are only ever appended.

use core::fmt;

use super::kind::{Arity, NodeKind};
use super::node::{Node, Payload, normalize_rational};
use super::owned::Tree;
use crate::{String, Vec};

/// Longest name that fits the `u8` length prefix.
pub const MAX_NAME_LEN: usize = u8::MAX as usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    Truncated { needed: usize },
    InvalidWireTag { tag: u8 },
    InvalidUtf8 { offset: usize },
    /// A parameter that no encoder produces, e.g. a zero denominator.
    InvalidPayload { offset: usize },
    TrailingBytes { offset: usize, remaining: usize },
    Empty,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated { needed } => {
                write!(f, "Buffer truncated: {} more bytes needed", needed)
            }
            DecodeError::InvalidWireTag { tag } => write!(f, "Invalid node tag {}", tag),
            DecodeError::InvalidUtf8 { offset } => {
                write!(f, "Invalid UTF-8 in name at offset {}", offset)
            }
            DecodeError::InvalidPayload { offset } => {
                write!(f, "Invalid node parameters at offset {}", offset)
            }
            DecodeError::TrailingBytes { offset, remaining } => write!(
                f,
                "Trailing bytes after tree: {} bytes at offset {}",
                remaining, offset
            ),
            DecodeError::Empty => write!(f, "Empty buffer"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

// ============================================================================
// Encoding
// ============================================================================

/// Serialize a tree given as its prefix-ordered nodes.
pub fn encode_nodes(nodes: &[Node], out: &mut Vec<u8>) {
    for node in nodes {
        out.push(node.kind.tag());
        match &node.payload {
            Payload::None => {}
            Payload::Count(n) => out.push(*n),
            Payload::Matrix { rows, cols } => out.extend_from_slice(&[*rows, *cols]),
            Payload::Integer(v) => out.extend_from_slice(&v.to_le_bytes()),
            Payload::Rational(p, q) => {
                out.extend_from_slice(&p.to_le_bytes());
                out.extend_from_slice(&q.to_le_bytes());
            }
            Payload::Float(v) => out.extend_from_slice(&v.to_bits().to_le_bytes()),
            Payload::Exponent(e) => out.extend_from_slice(&e.to_le_bytes()),
            Payload::Unit {
                representative,
                prefix,
            } => out.extend_from_slice(&[*representative, *prefix]),
            Payload::Variable(id) => out.push(*id),
            Payload::Seed(seed) => out.push(*seed),
            Payload::Name(name) => {
                // Names are capped at parse time; truncate on a char boundary
                // if one slipped through.
                let mut len = name.len().min(MAX_NAME_LEN);
                while !name.is_char_boundary(len) {
                    len -= 1;
                }
                out.push(len as u8);
                out.extend_from_slice(&name.as_bytes()[..len]);
            }
        }
    }
}

pub fn encode(tree: &Tree) -> Vec<u8> {
    let mut out = Vec::with_capacity(tree.len() * 2);
    encode_nodes(tree.nodes(), &mut out);
    out
}

// ============================================================================
// Decoding
// ============================================================================

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let available = self.bytes.len() - self.offset;
        if available < n {
            return Err(DecodeError::Truncated {
                needed: n - available,
            });
        }
        let slice = &self.bytes[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_le_bytes(self.array()?))
    }
}

fn decode_node(reader: &mut Reader<'_>) -> Result<Node, DecodeError> {
    let offset = reader.offset;
    let tag = reader.u8()?;
    let kind = NodeKind::from_tag(tag).ok_or(DecodeError::InvalidWireTag { tag })?;
    let payload = match kind {
        _ if kind.arity() == Arity::NAry => Payload::Count(reader.u8()?),
        NodeKind::Matrix => {
            let [rows, cols] = reader.array()?;
            Payload::Matrix { rows, cols }
        }
        NodeKind::IntegerLiteral => Payload::Integer(reader.i64()?),
        NodeKind::Rational => {
            let p = reader.i64()?;
            let q = reader.i64()?;
            if normalize_rational(p, q) != Some((p, q)) {
                return Err(DecodeError::InvalidPayload { offset });
            }
            Payload::Rational(p, q)
        }
        NodeKind::Float => Payload::Float(f64::from_bits(u64::from_le_bytes(reader.array()?))),
        NodeKind::Decimal => Payload::Exponent(i16::from_le_bytes(reader.array()?)),
        NodeKind::Unit => {
            let [representative, prefix] = reader.array()?;
            if !crate::units::is_valid_unit(representative, prefix) {
                return Err(DecodeError::InvalidPayload { offset });
            }
            Payload::Unit {
                representative,
                prefix,
            }
        }
        NodeKind::Variable => Payload::Variable(reader.u8()?),
        _ if kind.is_random() => Payload::Seed(reader.u8()?),
        _ if kind.is_user_named() => {
            let len = reader.u8()? as usize;
            let start = reader.offset;
            let bytes = reader.take(len)?;
            let name = core::str::from_utf8(bytes)
                .map_err(|e| DecodeError::InvalidUtf8 {
                    offset: start + e.valid_up_to(),
                })?;
            Payload::Name(name.into())
        }
        _ => Payload::None,
    };
    Ok(Node { kind, payload })
}

/// Deserialize exactly one tree from `bytes`.
pub fn decode(bytes: &[u8]) -> Result<Tree, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    let mut reader = Reader { bytes, offset: 0 };
    let mut nodes = Vec::new();
    let mut remaining = 1usize;
    while remaining > 0 {
        let node = decode_node(&mut reader)?;
        remaining = remaining - 1 + node.child_count();
        nodes.push(node);
    }
    if reader.offset != bytes.len() {
        return Err(DecodeError::TrailingBytes {
            offset: reader.offset,
            remaining: bytes.len() - reader.offset,
        });
    }
    Ok(Tree::from_nodes(nodes))
}

/// Hex dump, handy in test failure messages.
pub fn to_hex(bytes: &[u8]) -> String {
    use core::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Tree {
        // 2.5_km * x + f(y)
        Tree::from_nodes(vec![
            Node::nary(NodeKind::Add, 2),
            Node::nary(NodeKind::Mult, 3),
            Node::float(2.5),
            Node::unit(7, 9),
            Node::named(NodeKind::UserSymbol, "x"),
            Node::named(NodeKind::UserFunction, "f"),
            Node::named(NodeKind::UserSymbol, "y"),
        ])
    }

    #[test]
    fn test_layout_is_fixed() {
        let tree = Tree::from_nodes(vec![
            Node::nary(NodeKind::Mult, 2),
            Node::integer(300),
            Node::unit(7, 9),
        ]);
        let bytes = encode(&tree);
        let mut expected = vec![NodeKind::Mult.tag(), 2, NodeKind::IntegerLiteral.tag()];
        expected.extend_from_slice(&300i64.to_le_bytes());
        expected.extend_from_slice(&[NodeKind::Unit.tag(), 7, 9]);
        assert_eq!(to_hex(&bytes), to_hex(&expected));
    }

    #[test]
    fn test_decode_restores_tree() {
        let tree = sample();
        assert_eq!(decode(&encode(&tree)), Ok(tree));
    }

    #[test]
    fn test_truncated() {
        let bytes = encode(&sample());
        let result = decode(&bytes[..bytes.len() - 1]);
        assert!(matches!(result, Err(DecodeError::Truncated { .. })));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = encode(&Tree::leaf(Node::leaf(NodeKind::Pi)));
        bytes.push(0);
        assert_eq!(
            decode(&bytes),
            Err(DecodeError::TrailingBytes {
                offset: 1,
                remaining: 1
            })
        );
    }

    #[test]
    fn test_invalid_tag_and_utf8() {
        assert_eq!(
            decode(&[0xff]),
            Err(DecodeError::InvalidWireTag { tag: 0xff })
        );
        let bytes = [NodeKind::UserSymbol.tag(), 2, b'a', 0xc3];
        assert_eq!(decode(&bytes), Err(DecodeError::InvalidUtf8 { offset: 3 }));
    }

    #[test]
    fn test_rejects_unnormalized_rational() {
        let mut bytes = vec![NodeKind::Rational.tag()];
        bytes.extend_from_slice(&2i64.to_le_bytes());
        bytes.extend_from_slice(&4i64.to_le_bytes());
        assert_eq!(decode(&bytes), Err(DecodeError::InvalidPayload { offset: 0 }));
        assert_eq!(decode(&[]), Err(DecodeError::Empty));
    }
}
