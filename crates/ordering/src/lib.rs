//! Position planning for ordered collections (cards in a list, lists in a
//! board, boards in a workspace).
//!
//! Every collection keeps a dense zero-based ordering: read back ascending,
//! positions are exactly `0..n-1`. Moves restore that invariant by
//! renumbering the whole affected collection rather than patching the few
//! rows that numerically changed. Every sibling gets one update, so a
//! concurrent reader can never observe a half-shifted ordering once the
//! surrounding transaction commits.
//!
//! The planners here are pure: callers load current orderings, plan, then
//! write the resulting [`Reposition`] batches atomically. The client-side
//! store replays the exact same functions on its in-memory mirror, which is
//! what makes optimistic updates and their remote echoes converge.

use uuid::Uuid;

/// Position for an appended entity: one past the current maximum, `0` for
/// an empty parent.
pub fn next_position(max_existing: Option<i32>) -> i32 {
    max_existing.map_or(0, |p| p + 1)
}

/// One position assignment produced by a move plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reposition {
    pub id: Uuid,
    pub position: i32,
}

/// Update batches for a cross-parent move. `source` renumbers what remains
/// behind; `dest` renumbers the destination including the moved entity,
/// whose parent key the caller rewrites alongside the position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlan {
    pub source: Vec<Reposition>,
    pub dest: Vec<Reposition>,
}

/// Removes `moving` from `order` if present, then reinserts it at `target`
/// clamped to `0..=len`. Out-of-range targets append.
pub fn splice(order: &mut Vec<Uuid>, moving: Uuid, target: usize) {
    order.retain(|id| *id != moving);
    let index = target.min(order.len());
    order.insert(index, moving);
}

fn renumber(order: &[Uuid]) -> Vec<Reposition> {
    order
        .iter()
        .enumerate()
        .map(|(index, id)| Reposition {
            id: *id,
            position: index as i32,
        })
        .collect()
}

/// Plans a move within one parent. `siblings` is the current ordering,
/// ascending by position and containing `moving`. Every sibling appears in
/// the result, including those whose position is unchanged.
pub fn plan_same_parent(siblings: &[Uuid], moving: Uuid, target: usize) -> Vec<Reposition> {
    let mut order = siblings.to_vec();
    splice(&mut order, moving, target);
    renumber(&order)
}

/// Plans a move between two parents. `source` is the source ordering with
/// `moving` already excluded (it is filtered out again here so replays stay
/// harmless); `dest` is the current destination ordering.
pub fn plan_cross_parent(
    source: &[Uuid],
    dest: &[Uuid],
    moving: Uuid,
    target: usize,
) -> MovePlan {
    let remaining: Vec<Uuid> = source.iter().copied().filter(|id| *id != moving).collect();
    let mut dest_order: Vec<Uuid> = dest.iter().copied().filter(|id| *id != moving).collect();
    let index = target.min(dest_order.len());
    dest_order.insert(index, moving);
    MovePlan {
        source: renumber(&remaining),
        dest: renumber(&dest_order),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    fn positions(plan: &[Reposition]) -> Vec<i32> {
        plan.iter().map(|r| r.position).collect()
    }

    fn assert_dense(plan: &[Reposition]) {
        let mut seen: Vec<i32> = positions(plan);
        seen.sort_unstable();
        let expected: Vec<i32> = (0..plan.len() as i32).collect();
        assert_eq!(seen, expected, "positions must be exactly 0..n-1");
    }

    #[test]
    fn next_position_appends() {
        assert_eq!(next_position(None), 0);
        assert_eq!(next_position(Some(0)), 1);
        assert_eq!(next_position(Some(41)), 42);
    }

    #[test]
    fn same_parent_move_to_front() {
        // [A, B, C, D], move C to index 0 => [C, A, B, D] with positions 0..3.
        let abcd = ids(4);
        let plan = plan_same_parent(&abcd, abcd[2], 0);
        let order: Vec<Uuid> = plan.iter().map(|r| r.id).collect();
        assert_eq!(order, vec![abcd[2], abcd[0], abcd[1], abcd[3]]);
        assert_eq!(positions(&plan), vec![0, 1, 2, 3]);
    }

    #[test]
    fn same_parent_move_to_same_index_is_full_renumber() {
        let abc = ids(3);
        let plan = plan_same_parent(&abc, abc[1], 1);
        // Unchanged order, but still one update per sibling.
        assert_eq!(plan.len(), 3);
        let order: Vec<Uuid> = plan.iter().map(|r| r.id).collect();
        assert_eq!(order, abc);
        assert_dense(&plan);
    }

    #[test]
    fn same_parent_out_of_range_clamps_to_append() {
        let abc = ids(3);
        let plan = plan_same_parent(&abc, abc[0], 999);
        let order: Vec<Uuid> = plan.iter().map(|r| r.id).collect();
        assert_eq!(order, vec![abc[1], abc[2], abc[0]]);
        assert_eq!(positions(&plan), vec![0, 1, 2]);
    }

    #[test]
    fn cross_parent_move_renumbers_both_sides() {
        // source [A, B, C], dest [X, Y], move B to dest index 1
        // => source [A, C] (0, 1), dest [X, B, Y] (0, 1, 2).
        let abc = ids(3);
        let xy = ids(2);
        let source_without_b: Vec<Uuid> = vec![abc[0], abc[2]];
        let plan = plan_cross_parent(&source_without_b, &xy, abc[1], 1);

        let source_order: Vec<Uuid> = plan.source.iter().map(|r| r.id).collect();
        assert_eq!(source_order, vec![abc[0], abc[2]]);
        assert_eq!(positions(&plan.source), vec![0, 1]);

        let dest_order: Vec<Uuid> = plan.dest.iter().map(|r| r.id).collect();
        assert_eq!(dest_order, vec![xy[0], abc[1], xy[1]]);
        assert_eq!(positions(&plan.dest), vec![0, 1, 2]);
    }

    #[test]
    fn cross_parent_tolerates_unfiltered_source() {
        // Callers normally exclude the moving id from the source read; a
        // replay that forgets to must not leave it counted twice.
        let abc = ids(3);
        let plan = plan_cross_parent(&abc, &[], abc[1], 0);
        assert_eq!(plan.source.len(), 2);
        assert_eq!(plan.dest.len(), 1);
        assert_eq!(plan.dest[0].id, abc[1]);
        assert_dense(&plan.source);
    }

    #[test]
    fn cross_parent_into_empty_dest_clamps() {
        let ab = ids(2);
        let plan = plan_cross_parent(&[ab[1]], &[], ab[0], 7);
        assert_eq!(plan.dest, vec![Reposition { id: ab[0], position: 0 }]);
        assert_eq!(plan.source, vec![Reposition { id: ab[1], position: 0 }]);
    }

    #[test]
    fn density_holds_under_arbitrary_move_sequences() {
        // Apply a deterministic pseudo-random walk of same-parent moves and
        // check the dense invariant after each step.
        let mut order = ids(8);
        let mut seed = 0x9e3779b97f4a7c15u64;
        for _ in 0..200 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let from = (seed >> 33) as usize % order.len();
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let target = (seed >> 33) as usize % (order.len() + 2); // occasionally out of range
            let plan = plan_same_parent(&order, order[from], target);
            assert_dense(&plan);
            assert_eq!(plan.len(), order.len());
            order = plan.iter().map(|r| r.id).collect();
        }
    }

    #[test]
    fn splice_is_idempotent_at_same_target() {
        let mut order = ids(5);
        let moving = order[3];
        splice(&mut order, moving, 1);
        let once = order.clone();
        splice(&mut order, moving, 1);
        assert_eq!(order, once);
    }
}
