use core::fmt;

use super::kind::NodeKind;
use super::node::Node;
use crate::Vec;

/// A tree detached from any arena: its nodes in prefix order.
///
/// Used wherever a tree must outlive arena mutations, e.g. stored symbol
/// definitions and decoded buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Wrap nodes already laid out in prefix order.
    pub fn from_nodes(nodes: Vec<Node>) -> Tree {
        debug_assert!(is_well_formed(&nodes), "nodes do not form exactly one tree");
        Tree { nodes }
    }

    pub fn leaf(node: Node) -> Tree {
        Tree { nodes: vec![node] }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn contains_kind(&self, kind: NodeKind) -> bool {
        self.nodes.iter().any(|node| node.kind == kind)
    }
}

/// Whether `nodes` is exactly one complete tree.
pub(crate) fn is_well_formed(nodes: &[Node]) -> bool {
    let mut remaining = 1usize;
    for node in nodes {
        if remaining == 0 {
            return false;
        }
        remaining = remaining - 1 + node.child_count();
    }
    remaining == 0
}

impl fmt::Display for Tree {
    /// Prefix dump, e.g. `Add(2)[2, 3]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pending: Vec<usize> = Vec::new();
        for node in &self.nodes {
            if let Some(top) = pending.last_mut() {
                *top -= 1;
            }
            write!(f, "{}", node)?;
            let count = node.child_count();
            if count > 0 {
                write!(f, "[")?;
                pending.push(count);
                continue;
            }
            while let Some(&0) = pending.last() {
                pending.pop();
                write!(f, "]")?;
            }
            if !pending.is_empty() {
                write!(f, ", ")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToString;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_prefix_dump() {
        let tree = Tree::from_nodes(vec![
            Node::nary(NodeKind::Add, 2),
            Node::integer(2),
            Node::leaf(NodeKind::Cos),
            Node::integer(3),
        ]);
        assert_eq!(tree.to_string(), "Add(2)[2, Cos[3]]");
    }

    #[test]
    fn test_well_formed() {
        assert!(is_well_formed(&[Node::integer(1)]));
        assert!(!is_well_formed(&[Node::leaf(NodeKind::Cos)]));
        assert!(!is_well_formed(&[Node::integer(1), Node::integer(2)]));
    }
}
