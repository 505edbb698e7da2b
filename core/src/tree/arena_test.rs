use super::*;
use crate::tree::{Node, NodeKind, Tree};
use pretty_assertions::assert_eq;

/// Push `Add(2)[1, Mult(2)[2, 3]]` and return the root position.
fn push_sample(arena: &mut TreeArena) -> usize {
    let add = arena.push_nary(NodeKind::Add, 2).unwrap();
    arena.push_integer(1).unwrap();
    arena.push_nary(NodeKind::Mult, 2).unwrap();
    arena.push_integer(2).unwrap();
    arena.push_integer(3).unwrap();
    add
}

fn dump(arena: &TreeArena, index: usize) -> String {
    arena.extract(index).to_string()
}

#[test]
fn test_navigation() {
    let mut arena = TreeArena::default();
    let add = push_sample(&mut arena);
    assert_eq!(arena.tree_size(add), 5);
    assert_eq!(arena.next_tree(add), 5);
    assert_eq!(arena.child(add, 1), 2);
    assert_eq!(arena.children(2).collect::<Vec<_>>(), vec![3, 4]);
    assert_eq!(arena.parent_of(add, 4), Some(2));
    assert_eq!(arena.parent_of(add, 1), Some(add));
    assert_eq!(arena.parent_of(add, add), None);
}

#[test]
fn test_clone_tree_keeps_handles() {
    let mut arena = TreeArena::default();
    let add = push_sample(&mut arena);
    let handle = arena.handle(2);
    let copy = arena.clone_tree(2).unwrap();
    assert_eq!(copy, 5);
    assert!(arena.tree_eq(2, copy));
    assert_eq!(arena.resolve(handle), Ok(2));
    assert_eq!(dump(&arena, add), "Add(2)[1, Mult(2)[2, 3]]");
}

#[test]
fn test_move_descendant_over_ancestor() {
    let mut arena = TreeArena::default();
    let add = push_sample(&mut arena);
    let position = arena.move_tree_over_tree(add, 2).unwrap();
    assert_eq!(position, add);
    assert_eq!(dump(&arena, add), "Mult(2)[2, 3]");
    assert_eq!(arena.len(), 3);
}

#[test]
fn test_move_top_tree_over_child() {
    let mut arena = TreeArena::default();
    let add = push_sample(&mut arena);
    let top = arena.push(Node::leaf(NodeKind::Pi)).unwrap();
    arena.move_tree_over_tree(2, top).unwrap();
    assert_eq!(dump(&arena, add), "Add(2)[1, Pi]");
    assert_eq!(arena.len(), 3);
}

#[test]
fn test_move_ancestor_into_descendant_is_rejected() {
    let mut arena = TreeArena::default();
    let add = push_sample(&mut arena);
    assert_eq!(
        arena.move_tree_over_tree(3, add),
        Err(ArenaError::InvalidMove { dst: 3, src: add })
    );
}

#[test]
fn test_stale_handles_are_detected() {
    let mut arena = TreeArena::default();
    let add = push_sample(&mut arena);
    let root = arena.handle(add);
    let inner = arena.handle(3);
    arena.remove_child(2, 1);
    assert_eq!(dump(&arena, add), "Add(2)[1, Mult(1)[2]]");
    // Mutation at position 4 leaves earlier handles valid.
    assert_eq!(arena.resolve(root), Ok(add));
    assert_eq!(arena.resolve(inner), Ok(3));
    arena.remove_tree(1);
    assert_eq!(arena.resolve(inner), Err(ArenaError::StaleHandle));
    assert!(arena.is_valid(root));
}

#[test]
fn test_insert_node_wraps_subtree() {
    let mut arena = TreeArena::default();
    let add = push_sample(&mut arena);
    arena.insert_node(2, Node::leaf(NodeKind::Cos)).unwrap();
    assert_eq!(dump(&arena, add), "Add(2)[1, Cos[Mult(2)[2, 3]]]");
}

#[test]
fn test_exhaustion_and_rollback() {
    let mut arena = TreeArena::with_capacity(6);
    let add = push_sample(&mut arena);
    let checkpoint = arena.checkpoint();
    arena.push_integer(7).unwrap();
    assert_eq!(
        arena.push_integer(8),
        Err(ArenaError::Exhausted { capacity: 6 })
    );
    arena.rollback(checkpoint);
    assert_eq!(arena.len(), 5);
    assert_eq!(dump(&arena, add), "Add(2)[1, Mult(2)[2, 3]]");
}

#[test]
fn test_push_tree_and_extract() {
    let mut arena = TreeArena::default();
    let tree = Tree::from_nodes(vec![Node::leaf(NodeKind::Sqrt), Node::integer(2)]);
    let position = arena.push_tree(&tree).unwrap();
    assert_eq!(arena.extract(position), tree);
    arena.replace_with_node(position, Node::leaf(NodeKind::Pi)).unwrap();
    assert_eq!(dump(&arena, position), "Pi");
}
