//! Distributed blocktree construction and weighted repartitioning: turn a
//! sorted-but-incomplete, possibly-overlapping run of local octants into
//! a gap-free distributed "blocktree" (algorithms 3/4/7 of the seminal
//! parallel octree construction literature), then repartition leaves
//! across ranks so each carries a comparable amount of work.

use memoffset::offset_of;
use mpi::{
    collective::SystemOperation,
    datatype::{Equivalence, UncommittedUserDatatype, UserDatatype},
    topology::{Rank, SystemCommunicator},
    traits::*,
    Address,
};

use crate::morton::{finest_common_ancestor, Octant, QMAXLEVEL};

/// Null process marker, matching the MPI convention used for ring
/// exchanges at the ends of the rank range.
pub const MPI_PROC_NULL: Rank = -1;

/// Number of local leaves "owned" by a block, used as the load metric
/// for partitioning.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Weight(pub u64);

unsafe impl Equivalence for Weight {
    type Out = UserDatatype;
    fn equivalent_datatype() -> Self::Out {
        UserDatatype::structured(
            &[1],
            &[offset_of!(Weight, 0) as Address],
            &[UncommittedUserDatatype::contiguous(1, &u64::equivalent_datatype()).as_ref()],
        )
    }
}

/// Fill the Morton gap strictly between `a` and `b` (algorithm 3):
/// returns the minimal sorted set of octants whose union with `{a, b}`
/// covers `[a, b]` with no gaps and no overlaps, excluding `a` and `b`
/// themselves.
pub fn complete_region(a: &Octant, b: &Octant) -> Vec<Octant> {
    debug_assert!(a < b);
    let fca = finest_common_ancestor(a, b);
    let mut out = Vec::new();
    let mut work: Vec<Octant> = fca.children().to_vec();
    while let Some(w) = work.pop() {
        let first = crate::morton::deepest_first_descendant(&w);
        let last = crate::morton::deepest_last_descendant(&w);
        if last < *a || first > *b {
            continue;
        }
        if first >= *a && last <= *b && w != *a && w != *b {
            out.push(w);
            continue;
        }
        if w.level < QMAXLEVEL {
            work.extend(w.children());
        }
    }
    out.sort();
    out
}

/// Drop any octant that is a strict ancestor of the one following it in
/// `leaves` (which must already be Morton-sorted) — the minimal
/// deduplication pass "linearise" runs before completion.
pub fn linearise(leaves: &[Octant]) -> Vec<Octant> {
    let mut out = Vec::with_capacity(leaves.len());
    for (i, &q) in leaves.iter().enumerate() {
        if i + 1 < leaves.len() && q.is_ancestor_of(&leaves[i + 1]) {
            continue;
        }
        out.push(q);
    }
    out
}

/// Remove exact duplicates from an already Morton-sorted run.
///
/// Panics if two entries are neither equal nor in strict Morton order —
/// that signals the input was not sorted, which every caller here
/// guarantees via [`crate::sort::sample_sort`] plus [`linearise`].
pub fn unique_leaves(leaves: &[Octant]) -> Vec<Octant> {
    let mut out: Vec<Octant> = Vec::with_capacity(leaves.len());
    for &q in leaves {
        match out.last() {
            Some(prev) => {
                assert!(*prev <= q, "unique_leaves requires sorted input");
                if *prev != q {
                    out.push(q);
                }
            }
            None => out.push(q),
        }
    }
    out
}

/// The coarsest octants that bound each rank's share of the global
/// leaf set: the first and last local leaf's common ancestors with
/// their cross-rank neighbors, exchanged in a ring so every rank knows
/// where its neighbors' shares begin and end.
pub fn find_seeds(local_leaves: &[Octant]) -> Vec<Octant> {
    if local_leaves.is_empty() {
        return Vec::new();
    }
    let first = local_leaves[0];
    let last = *local_leaves.last().unwrap();
    if first == last {
        return vec![first];
    }
    let mut seeds = vec![first];
    seeds.extend(complete_region(&first, &last));
    seeds.push(last);
    seeds
}

/// Complete the distributed blocktree spanning every rank's seeds
/// (algorithm 4): exchange boundary seeds with neighbors, splice in the
/// global first/last descendants, and fill every inter-rank gap.
pub fn complete_blocktree(
    mut seeds: Vec<Octant>,
    rank: Rank,
    size: Rank,
    world: SystemCommunicator,
) -> Vec<Octant> {
    if rank == 0 {
        let dfd_root = crate::morton::deepest_first_descendant(&Octant::root());
        if let Some(min) = seeds.iter().min().cloned() {
            let na = finest_common_ancestor(&dfd_root, &min);
            let first_child = *na.children().iter().min().unwrap();
            seeds.push(first_child);
        }
        seeds.sort();
    }
    if rank == size - 1 {
        let dld_root = crate::morton::deepest_last_descendant(&Octant::root());
        if let Some(max) = seeds.iter().max().cloned() {
            let na = finest_common_ancestor(&dld_root, &max);
            let last_child = *na.children().iter().max().unwrap();
            seeds.push(last_child);
        }
    }

    let next_rank = if rank + 1 < size { rank + 1 } else { MPI_PROC_NULL };
    let previous_rank = if rank > 0 { rank - 1 } else { MPI_PROC_NULL };

    if previous_rank != MPI_PROC_NULL {
        if let Some(min) = seeds.iter().min().cloned() {
            world.process_at_rank(previous_rank).send(&min);
        }
    }
    if next_rank != MPI_PROC_NULL {
        let mut received = Octant::default();
        world.process_at_rank(next_rank).receive_into(&mut received);
        seeds.push(received);
    }

    seeds.sort();
    let mut blocktree = Vec::new();
    for w in seeds.windows(2) {
        blocktree.push(w[0]);
        blocktree.extend(complete_region(&w[0], &w[1]));
    }
    if rank == size - 1 {
        if let Some(&last) = seeds.last() {
            blocktree.push(last);
        }
    }
    blocktree.sort();
    blocktree
}

/// For each local leaf, find the block (from the global blocktree) that
/// contains it — its finest ancestor among `blocks`.
pub fn assign_blocks_to_leaves(leaves: &[Octant], blocks: &[Octant]) -> Vec<usize> {
    leaves
        .iter()
        .map(|leaf| {
            blocks
                .iter()
                .enumerate()
                .filter(|(_, b)| b.is_ancestor_of(leaf) || **b == *leaf)
                .max_by_key(|(_, b)| b.level)
                .map(|(i, _)| i)
                .expect("every leaf must be covered by some block")
        })
        .collect()
}

/// Weight (leaf count) each local block carries.
pub fn find_block_weights(blocks: &[Octant], assignment: &[usize]) -> Vec<Weight> {
    let mut weights = vec![Weight(0); blocks.len()];
    for &idx in assignment {
        weights[idx].0 += 1;
    }
    weights
}

/// Redistribute blocks across ranks so cumulative weight is balanced,
/// using an MPI scan to find each rank's running total and the same
/// "send a (possibly empty) message to every other rank, then receive
/// exactly `size - 1` times" idiom [`crate::sort::sample_sort`] uses for
/// its bucket exchange, rather than an unbounded probe-drain loop.
/// Returns both this rank's new block set and, aligned with
/// `local_blocks`, the rank each of this rank's *original* blocks was
/// routed to — the latter is what [`transfer_leaves_to_final_blocktree`]
/// needs to move the fine leaves underneath each block.
pub fn block_partition(
    local_blocks: &[Octant],
    local_weights: &[Weight],
    rank: Rank,
    size: Rank,
    world: SystemCommunicator,
) -> (Vec<Octant>, Vec<Rank>) {
    let local_total: u64 = local_weights.iter().map(|w| w.0).sum();
    let mut prefix = 0u64;
    world.scan_into(&local_total, &mut prefix, SystemOperation::sum());
    let mut global_total = 0u64;
    world.all_reduce_into(&local_total, &mut global_total, SystemOperation::sum());

    let share = if size > 0 { (global_total / size as u64).max(1) } else { 1 };
    let mut running = prefix - local_total;
    let mut owner_of_block = Vec::with_capacity(local_blocks.len());
    let mut by_rank: Vec<Vec<Octant>> = vec![Vec::new(); size.max(1) as usize];
    for (block, weight) in local_blocks.iter().zip(local_weights.iter()) {
        let target_rank = ((running / share) as Rank).min(size - 1);
        owner_of_block.push(target_rank);
        running += weight.0;
        by_rank[target_rank as usize].push(*block);
    }

    let mut out = std::mem::take(&mut by_rank[rank as usize]);
    for r in 0..size {
        if r != rank {
            world.process_at_rank(r).send(&by_rank[r as usize][..]);
        }
    }
    for r in 0..size {
        if r != rank {
            let (mut received, _) = world.any_process().receive_vec::<Octant>();
            out.append(&mut received);
        }
    }
    out.sort();
    (out, owner_of_block)
}

/// Move each local leaf to the rank that now owns its containing block
/// after [`block_partition`] has redistributed the blocks themselves.
pub fn transfer_leaves_to_final_blocktree(
    local_leaves: &[Octant],
    local_blocks_before: &[Octant],
    owner_of_block: &[Rank],
    rank: Rank,
    world: SystemCommunicator,
) -> Vec<Octant> {
    let mut by_rank: Vec<Vec<Octant>> = vec![Vec::new(); world.size() as usize];
    for leaf in local_leaves {
        let block_idx = local_blocks_before
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_ancestor_of(leaf) || **b == *leaf)
            .max_by_key(|(_, b)| b.level)
            .map(|(i, _)| i)
            .expect("leaf must belong to a known block");
        by_rank[owner_of_block[block_idx] as usize].push(*leaf);
    }

    let size = world.size();
    let mut out = std::mem::take(&mut by_rank[rank as usize]);
    for r in 0..size {
        if r != rank {
            world.process_at_rank(r).send(&by_rank[r as usize][..]);
        }
    }
    for r in 0..size {
        if r != rank {
            let (mut received, _) = world.any_process().receive_vec::<Octant>();
            out.append(&mut received);
        }
    }
    out.sort();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morton::qlen;

    #[test]
    fn complete_region_fills_sibling_gap() {
        let root = Octant::root();
        let kids = root.children();
        let filled = complete_region(&kids[0], &kids[7]);
        let mut all: Vec<Octant> = filled;
        all.push(kids[0]);
        all.push(kids[7]);
        all.sort();
        assert_eq!(all.len(), 8);
        assert_eq!(all, kids.to_vec());
    }

    #[test]
    fn linearise_drops_ancestor_before_descendant() {
        let root = Octant::root();
        let child = root.children()[0];
        let leaves = vec![root, child];
        assert_eq!(linearise(&leaves), vec![child]);
    }

    #[test]
    fn unique_leaves_removes_duplicates() {
        let a = Octant::new(0, 0, 0, 1);
        let b = Octant::new(qlen(1), 0, 0, 1);
        let leaves = vec![a, a, b];
        assert_eq!(unique_leaves(&leaves), vec![a, b]);
    }

    #[test]
    #[should_panic]
    fn unique_leaves_panics_on_unsorted_input() {
        let a = Octant::new(0, 0, 0, 1);
        let b = Octant::new(qlen(1), 0, 0, 1);
        let leaves = vec![b, a];
        let _ = unique_leaves(&leaves);
    }

    #[test]
    fn assign_blocks_to_leaves_picks_finest_covering_block() {
        let root = Octant::root();
        let kids = root.children();
        let leaves = vec![kids[0], kids[3]];
        let blocks = vec![root, kids[0]];
        let assignment = assign_blocks_to_leaves(&leaves, &blocks);
        assert_eq!(assignment, vec![1, 0]);
    }
}
