use tracing::trace;

use crate::approximation::approximate_integer;
use crate::tree::{NodeKind, Payload, TreeArena};

/// Slots a random node uses: one, or one per element of `randintnorep`.
fn slot_count(arena: &TreeArena, position: usize) -> u16 {
    match arena.kind(position) {
        NodeKind::RandIntNoRep => approximate_integer(arena, arena.child(position, 2))
            .and_then(|n| u16::try_from(n).ok())
            .unwrap_or(1)
            .max(1),
        _ => 1,
    }
}

/// Number random nodes 1, 2, ... in depth-first order.
///
/// `randintnorep(a, b, n)` reserves `n` consecutive slots, one per drawn
/// element. Nodes that already carry a seed keep it, and new slots start
/// after theirs. Once the `u8` slots run out, remaining nodes stay at 0
/// and are cached by position instead. Returns whether any seed was
/// assigned.
pub fn deep_assign_seeds(arena: &mut TreeArena, index: usize) -> bool {
    let end = arena.next_tree(index);
    let mut next: u16 = (index..end)
        .filter_map(|position| match arena.node(position).seed() {
            Some(seed) if seed != 0 => Some(seed as u16 + slot_count(arena, position)),
            _ => None,
        })
        .max()
        .unwrap_or(1);
    let mut assigned = false;
    for position in index..end {
        if arena.node(position).seed() != Some(0) {
            continue;
        }
        let slots = slot_count(arena, position);
        let Some(last) = next
            .checked_add(slots - 1)
            .filter(|last| *last <= u8::MAX as u16)
        else {
            trace!(position, "out of seed slots");
            break;
        };
        trace!(position, seed = next, slots, "seed assigned");
        arena.set_payload(position, Payload::Seed(next as u8));
        assigned = true;
        next = last + 1;
    }
    assigned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::parse_into;
    use pretty_assertions::assert_eq;

    fn seeds(source: &str) -> Vec<u8> {
        let (mut arena, root) = parse_into(source);
        deep_assign_seeds(&mut arena, root);
        arena
            .tree_nodes(root)
            .iter()
            .filter_map(|node| node.seed())
            .collect()
    }

    #[test]
    fn test_depth_first_numbering() {
        assert_eq!(seeds("randint(1, 6) + random()"), vec![1, 2]);
    }

    #[test]
    fn test_no_repetition_reserves_one_slot_per_element() {
        assert_eq!(seeds("{randintnorep(1, 10, 3), random()}"), vec![1, 4]);
    }

    #[test]
    fn test_existing_seeds_are_kept() {
        let (mut arena, root) = parse_into("random() + random()");
        let second = arena.child(root, 1);
        arena.set_payload(second, Payload::Seed(5));
        assert!(deep_assign_seeds(&mut arena, root));
        let first = arena.child(root, 0);
        assert_eq!(arena.node(first).seed(), Some(6));
        assert!(!deep_assign_seeds(&mut arena, root));
    }
}
