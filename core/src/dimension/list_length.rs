use crate::approximation::approximate_integer;
use crate::tree::{NodeKind, TreeArena};

/// Length of the list the subtree evaluates to, or `None` if it is not a
/// list.
///
/// `ListSequence`, `RandIntNoRep` and `ListSlice` lengths depend on child
/// values, which are approximated here. An undefined length counts as 0.
pub fn list_length(arena: &TreeArena, index: usize) -> Option<usize> {
    use NodeKind::*;
    match arena.kind(index) {
        ListSum | ListProduct | Min | Max | Mean | Median | Variance | StdDev | SampleStdDev
        | Dim | ListElement => None,
        ListSort => list_length(arena, index + 1),
        List => Some(arena.child_count(index)),
        ListSequence => Some(evaluated_length(arena, arena.child(index, 1))),
        RandIntNoRep => Some(evaluated_length(arena, arena.child(index, 2))),
        ListSlice => {
            let source = list_length(arena, index + 1).unwrap_or(0) as i64;
            let start = approximate_integer(arena, arena.child(index, 1)).unwrap_or(1).max(1);
            let end = approximate_integer(arena, arena.child(index, 2))
                .unwrap_or(0)
                .min(source);
            Some((end - start + 1).max(0) as usize)
        }
        // Bounds of a parametric construct never make it a list.
        Sum | Product | Integral => list_length(arena, arena.child(index, 2)),
        Dependency => list_length(arena, index + 1),
        _ => arena
            .children(index)
            .find_map(|child| list_length(arena, child)),
    }
}

fn evaluated_length(arena: &TreeArena, index: usize) -> usize {
    approximate_integer(arena, index)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0)
}
