//! Expression trees: node records, the arena they live in, detached trees
//! and their byte layout.

mod arena;
pub mod encoding;
mod kind;
mod node;
mod owned;

pub use arena::{ArenaCheckpoint, ArenaError, Children, DEFAULT_CAPACITY, TreeArena, TreeRef};
pub use encoding::{DecodeError, decode, encode};
pub use kind::{Arity, NodeKind};
pub use node::{Node, Payload, gcd, normalize_rational};
pub use owned::Tree;
