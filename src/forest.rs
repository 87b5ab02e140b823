//! The forest: the driver surface that aggregates trees over a
//! connectivity, tracks the global partition, and exposes the
//! refine/coarsen/balance/partition/checksum/save/load operations that
//! sit above the octant algebra and iterator engine.
//!
//! A [`Forest`] borrows its [`Connectivity`] rather than owning it
//! (`SPEC_FULL.md` §9's "cyclic references" note) and holds one
//! [`Tree`] per coarse tree id this rank currently knows about. The
//! MPI-collective operations (`partition`, `checksum`, and the
//! multi-rank half of `new`) take the communicator as an explicit
//! parameter rather than storing it, the same way `crate::sort` and
//! `crate::partition`'s free functions do — this keeps the rest of the
//! driver surface (`refine`, `coarsen`, `balance`, `reset_data`, `copy`)
//! callable and unit-testable without an MPI universe.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use mpi::collective::SystemOperation;
use mpi::topology::{Rank, SystemCommunicator};
use mpi::traits::*;

use crate::balance::{needs_refinement, BalanceKind};
use crate::connectivity::Connectivity;
use crate::morton::{is_family, Octant, TreeId, MAXLEVEL, QMAXLEVEL};
use crate::payload::Payload;
use crate::sort::sample_sort;
use crate::tree::Tree;

/// Partition-empty rank sentinel (`SPEC_FULL.md` §6).
pub const EMPTY_FIRST_LOCAL_TREE: i32 = -1;
pub const EMPTY_LAST_LOCAL_TREE: i32 = -2;

/// One partition boundary: the smallest possible node-level octant
/// (`level == MAXLEVEL`) that could open a rank's share, tagged with the
/// tree it falls in. `SPEC_FULL.md` §3's `global_first_position`: `size +
/// 1` entries, non-decreasing under `(which_tree, quadrant)` order, the
/// last a sentinel one past the final tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartitionPosition {
    pub which_tree: TreeId,
    pub quadrant: Octant,
}

fn sentinel_position(num_trees: TreeId) -> PartitionPosition {
    PartitionPosition { which_tree: num_trees, quadrant: Octant::new(0, 0, 0, MAXLEVEL) }
}

/// The node-level position of this rank's first local leaf (the lowest
/// non-empty tree's first leaf, since trees are always held in tree-id
/// order), or `None` if this rank currently owns no leaves at all.
fn local_first_position<U>(trees: &[Tree<U>]) -> Option<PartitionPosition> {
    trees.iter().find_map(|t| {
        t.first_quadrant().map(|q| PartitionPosition { which_tree: t.tree_id, quadrant: Octant::new(q.x, q.y, q.z, MAXLEVEL) })
    })
}

/// A distributed forest of octrees: every tree this rank locally owns,
/// plus the global partition bookkeeping (`global_first_quadrant`,
/// `global_first_position`) the rest of the cluster agrees on after the
/// last collective operation.
pub struct Forest<'c, U> {
    pub connectivity: &'c Connectivity,
    pub rank: Rank,
    pub size: Rank,
    trees: Vec<Tree<U>>,
    /// Per-rank global leaf offset, `size + 1` entries, non-decreasing,
    /// last entry equal to the global leaf count.
    pub global_first_quadrant: Vec<i64>,
    /// Per-rank partition boundary (`SPEC_FULL.md` §3), `size + 1`
    /// entries. An empty rank shares the position of the next non-empty
    /// rank (forward-filled against the trailing sentinel), matching the
    /// reference library's convention that empty processes don't open a
    /// gap in the boundary sequence.
    pub global_first_position: Vec<PartitionPosition>,
    pub first_local_tree: i32,
    pub last_local_tree: i32,
}

impl<'c, U: Clone> Forest<'c, U> {
    /// A single-rank forest with one undivided leaf per tree of
    /// `connectivity`, each initialized via `init`. The natural
    /// constructor for unit tests and for `rank == 0` of a distributed
    /// build before [`Forest::partition`] spreads leaves out.
    pub fn new_single(connectivity: &'c Connectivity, init: impl Fn(TreeId, &Octant) -> Payload<U>) -> Self {
        let trees: Vec<Tree<U>> = (0..connectivity.num_trees())
            .map(|t| Tree::new_uniform(t, init(t, &Octant::root())))
            .collect();
        Self::from_trees(connectivity, 0, 1, trees)
    }

    fn from_trees(connectivity: &'c Connectivity, rank: Rank, size: Rank, trees: Vec<Tree<U>>) -> Self {
        let (first_local_tree, last_local_tree) = if trees.iter().any(|t| !t.is_empty()) {
            let first = trees.iter().position(|t| !t.is_empty()).unwrap() as i32;
            let last = trees.iter().rposition(|t| !t.is_empty()).unwrap() as i32;
            (first, last)
        } else {
            (EMPTY_FIRST_LOCAL_TREE, EMPTY_LAST_LOCAL_TREE)
        };
        let local_leaves = trees.iter().map(|t| t.len() as i64).sum::<i64>();
        let global_first_quadrant = vec![0; size as usize + 1]
            .into_iter()
            .enumerate()
            .map(|(i, _)| if i as Rank <= rank { 0 } else { local_leaves })
            .collect();
        let num_trees = connectivity.num_trees();
        let local_position = local_first_position(&trees).unwrap_or_else(|| sentinel_position(num_trees));
        let mut global_first_position = vec![local_position; size as usize + 1];
        if let Some(last) = global_first_position.last_mut() {
            *last = sentinel_position(num_trees);
        }
        Forest {
            connectivity,
            rank,
            size,
            trees,
            global_first_quadrant,
            global_first_position,
            first_local_tree,
            last_local_tree,
        }
    }

    /// Construct an initial forest with at least `min_leaves_per_rank`
    /// leaves per rank, by uniform refinement starting from one leaf
    /// per tree, then spreading the result across the group with
    /// [`Forest::partition`]. Matches the reference `p4est_new` driver
    /// contract (`SPEC_FULL.md` §6): every newly created leaf is handed
    /// to `init`.
    pub fn new(
        world: SystemCommunicator,
        connectivity: &'c Connectivity,
        min_leaves_per_rank: usize,
        init: impl Fn(TreeId, &Octant) -> Payload<U>,
    ) -> Self {
        let rank = world.rank();
        let size = world.size();
        tracing::info!(size, min_leaves_per_rank, trees = connectivity.num_trees(), "building initial forest");
        let mut trees: Vec<Tree<U>> = (0..connectivity.num_trees())
            .map(|t| Tree::new_uniform(t, init(t, &Octant::root())))
            .collect();
        if rank != 0 {
            trees.iter_mut().for_each(|t| *t = Tree::from_sorted_leaves(t.tree_id, Vec::new()));
        }
        let target = min_leaves_per_rank.saturating_mul(size.max(1) as usize);
        let mut level = 0u8;
        while rank == 0 && trees.iter().map(Tree::len).sum::<usize>() < target && level < QMAXLEVEL {
            level += 1;
            for t in trees.iter_mut() {
                let tid = t.tree_id;
                // A single uniform pass per level, driven through `init`
                // rather than `Tree::refine_level`'s payload-clone path:
                // every newly created leaf must see `init_cb` (SPEC_FULL.md
                // §6), not a copy of its parent's payload.
                t.refine(false, |q| q.level < level, |q| init(tid, q));
            }
        }
        let mut forest = Self::from_trees(connectivity, rank, size, trees);
        if size > 1 {
            forest.partition(world, None::<fn(TreeId, &Octant) -> u32>);
        }
        forest
    }

    /// Reassemble a `Forest` from [`crate::io::load`]'s output, borrowing
    /// `connectivity` rather than the one the file itself described —
    /// the caller is expected to have already checked (or reconstructed)
    /// a matching connectivity, since a [`Forest`] cannot own the one it
    /// was loaded with without becoming self-referential.
    pub fn from_loaded(connectivity: &'c Connectivity, loaded: crate::io::LoadedForest<U>) -> Self {
        Forest {
            connectivity,
            rank: loaded.rank,
            size: loaded.size,
            trees: loaded.trees,
            global_first_quadrant: loaded.global_first_quadrant,
            global_first_position: loaded.global_first_position,
            first_local_tree: EMPTY_FIRST_LOCAL_TREE,
            last_local_tree: EMPTY_LAST_LOCAL_TREE,
        }
        .with_recomputed_cursors()
    }

    fn with_recomputed_cursors(mut self) -> Self {
        self.recompute_cursors();
        self
    }

    /// Explicit teardown for API parity with the reference driver
    /// surface; Rust's `Drop` already frees every owned payload when a
    /// `Forest` goes out of scope, so this is a no-op left for callers
    /// translating code from the reference library one call at a time.
    pub fn destroy(self) {}

    pub fn trees(&self) -> &[Tree<U>] {
        &self.trees
    }

    pub fn num_local_leaves(&self) -> usize {
        self.trees.iter().map(Tree::len).sum()
    }

    /// A deep copy. When `copy_data` is false, every leaf's payload is
    /// replaced with `Payload::WhichTree` rather than cloned — the
    /// reference `p4est_copy(..., copy_data=0)` contract only promises
    /// the octants survive, not the user data, and there is no
    /// "default" value a generic `U` could supply instead.
    pub fn copy(&self, copy_data: bool) -> Self {
        let trees = self
            .trees
            .iter()
            .map(|t| {
                let leaves = t
                    .leaves()
                    .iter()
                    .map(|(q, p)| (*q, if copy_data { p.clone() } else { Payload::WhichTree(t.tree_id) }))
                    .collect();
                Tree::from_sorted_leaves(t.tree_id, leaves)
            })
            .collect();
        Forest {
            connectivity: self.connectivity,
            rank: self.rank,
            size: self.size,
            trees,
            global_first_quadrant: self.global_first_quadrant.clone(),
            global_first_position: self.global_first_position.clone(),
            first_local_tree: self.first_local_tree,
            last_local_tree: self.last_local_tree,
        }
    }

    /// Overwrite every local leaf's payload via `init`.
    pub fn reset_data(&mut self, init: impl Fn(TreeId, &Octant) -> Payload<U>) {
        for t in self.trees.iter_mut() {
            let tid = t.tree_id;
            t.reset_data(|q| init(tid, q));
        }
    }

    /// Split every leaf for which `predicate` holds into its children,
    /// per tree. `recursive` repeats until no matching leaf below
    /// `QMAXLEVEL` remains.
    pub fn refine(
        &mut self,
        recursive: bool,
        predicate: impl Fn(TreeId, &Octant) -> bool,
        init: impl Fn(TreeId, &Octant) -> Payload<U>,
    ) {
        for t in self.trees.iter_mut() {
            let tid = t.tree_id;
            t.refine(recursive, |q| predicate(tid, q), |q| init(tid, q));
        }
        self.recompute_cursors();
    }

    /// As [`Forest::refine`], but no leaf is ever split past `max_level`
    /// regardless of what `predicate` says.
    pub fn refine_level(
        &mut self,
        recursive: bool,
        predicate: impl Fn(TreeId, &Octant) -> bool,
        init: impl Fn(TreeId, &Octant) -> Payload<U>,
        max_level: u8,
    ) {
        self.refine(recursive, |t, q| q.level < max_level && predicate(t, q), init);
    }

    /// Replace every complete, `family_cb`-approved family of eight
    /// siblings with their parent.
    pub fn coarsen(
        &mut self,
        recursive: bool,
        family_cb: impl Fn(TreeId, &[Octant; 8]) -> bool,
        init: impl Fn(TreeId, &Octant) -> Payload<U>,
    ) {
        for t in self.trees.iter_mut() {
            let tid = t.tree_id;
            t.coarsen(recursive, |fam| family_cb(tid, fam), |q| init(tid, q));
        }
        self.recompute_cursors();
    }

    fn recompute_cursors(&mut self) {
        let (first, last) = if self.trees.iter().any(|t| !t.is_empty()) {
            let first = self.trees.iter().position(|t| !t.is_empty()).unwrap() as i32;
            let last = self.trees.iter().rposition(|t| !t.is_empty()).unwrap() as i32;
            (first, last)
        } else {
            (EMPTY_FIRST_LOCAL_TREE, EMPTY_LAST_LOCAL_TREE)
        };
        self.first_local_tree = first;
        self.last_local_tree = last;
    }

    /// One fixpoint pass of 2:1 balance enforcement (`SPEC_FULL.md`
    /// §4.4): repeatedly refine any leaf whose insulation layer (of the
    /// requested `kind`) harbors a leaf more than one level finer, until
    /// no local tree changes. Bounded by `QMAXLEVEL` passes since each
    /// pass strictly increases some leaf's level.
    ///
    /// Operates purely on `self.trees`: a rank whose local trees are
    /// complete (own every leaf of every tree they touch, the common
    /// case for a forest with more trees than ranks, or a single-rank
    /// run) balances correctly without a ghost layer. A rank holding
    /// only part of a tree's Morton range would need the missing
    /// neighbors folded in via a ghost exchange first — that exchange
    /// is out of scope per `SPEC_FULL.md` §1, so this driver does not
    /// attempt it.
    pub fn balance(&mut self, kind: BalanceKind, init: impl Fn(TreeId, &Octant) -> Payload<U>) {
        tracing::debug!(?kind, leaves = self.num_local_leaves(), "starting balance fixpoint");
        for pass in 0..=QMAXLEVEL {
            let snapshot: Vec<Vec<Octant>> = (0..self.connectivity.num_trees())
                .map(|t| {
                    self.trees
                        .iter()
                        .find(|tree| tree.tree_id == t)
                        .map(|tree| tree.leaves().iter().map(|(q, _)| *q).collect())
                        .unwrap_or_default()
                })
                .collect();
            let mut changed = false;
            for t in self.trees.iter_mut() {
                let tid = t.tree_id;
                let conn = self.connectivity;
                let before = t.len();
                t.refine(
                    false,
                    |q| needs_refinement(q, tid, conn, kind, &snapshot),
                    |q| init(tid, q),
                );
                changed |= t.len() != before;
            }
            if !changed {
                tracing::debug!(pass, "balance fixpoint reached");
                break;
            }
        }
        self.recompute_cursors();
    }

    /// Per-rank partial checksum: the XOR of every local leaf's
    /// `(tree, x, y, z, level)` hash. XOR is commutative and
    /// associative, so the global combination in [`Forest::checksum`]
    /// does not depend on how leaves are split across ranks — a
    /// stronger property than "folded in increasing tree id" (§4.6)
    /// demands, and one that subsumes it.
    pub fn checksum_local(&self) -> u32 {
        let mut acc: u64 = 0;
        for t in &self.trees {
            for (q, _) in t.leaves() {
                let mut h = DefaultHasher::new();
                t.tree_id.hash(&mut h);
                q.x.hash(&mut h);
                q.y.hash(&mut h);
                q.z.hash(&mut h);
                q.level.hash(&mut h);
                acc ^= h.finish();
            }
        }
        (acc as u32) ^ ((acc >> 32) as u32)
    }

    /// The parallel-invariant digest of §4.6: the rank-local partial
    /// checksums combined with a bitwise-XOR all-reduce. Non-zero only
    /// on rank 0.
    pub fn checksum(&self, world: SystemCommunicator) -> u32 {
        let local = self.checksum_local();
        let mut global: u32 = 0;
        world.all_reduce_into(&local, &mut global, SystemOperation::bitwise_xor());
        if world.rank() == 0 {
            global
        } else {
            0
        }
    }

    /// Redistribute leaves across the group so each rank's share is
    /// balanced by `weight` (leaf count when `None`). Each connectivity
    /// tree's Morton range is balanced independently, reusing
    /// [`crate::sort::sample_sort`] and [`crate::partition`]'s
    /// blocktree pipeline tree-by-tree rather than computing one
    /// cross-tree serial index — the natural generalization of the
    /// teacher's single-tree pipeline to a multi-tree forest (see
    /// `DESIGN.md`).
    pub fn partition(&mut self, world: SystemCommunicator, weight: Option<impl Fn(TreeId, &Octant) -> u32>) {
        let rank = world.rank();
        let size = world.size();
        tracing::info!(rank, size, leaves_before = self.num_local_leaves(), "repartitioning forest");
        let mut new_trees = Vec::with_capacity(self.connectivity.num_trees() as usize);
        for tid in 0..self.connectivity.num_trees() {
            let payloads: std::collections::HashMap<Octant, Payload<U>> = self
                .trees
                .iter()
                .find(|t| t.tree_id == tid)
                .map(|t| t.leaves().iter().cloned().collect())
                .unwrap_or_default();
            let local_octants: Vec<Octant> = payloads.keys().cloned().collect();

            let sorted = sample_sort(&local_octants, size as u16, rank, world);
            let seeds = crate::partition::find_seeds(&sorted);
            let blocktree = crate::partition::complete_blocktree(seeds, rank, size, world);
            let assignment = crate::partition::assign_blocks_to_leaves(&sorted, &blocktree);
            let weights: Vec<crate::partition::Weight> = if let Some(w) = weight.as_ref() {
                let mut wv = vec![crate::partition::Weight(0); blocktree.len()];
                for (leaf, &idx) in sorted.iter().zip(assignment.iter()) {
                    wv[idx].0 += w(tid, leaf) as u64;
                }
                wv
            } else {
                crate::partition::find_block_weights(&blocktree, &assignment)
            };
            let (_, owner_of_block) = crate::partition::block_partition(&blocktree, &weights, rank, size, world);
            let final_leaves = crate::partition::transfer_leaves_to_final_blocktree(
                &sorted,
                &blocktree,
                &owner_of_block,
                rank,
                world,
            );

            let leaves_with_payload: Vec<(Octant, Payload<U>)> = final_leaves
                .into_iter()
                .map(|q| {
                    let p = payloads.get(&q).cloned().unwrap_or(Payload::WhichTree(tid));
                    (q, p)
                })
                .collect();
            new_trees.push(Tree::from_sorted_leaves(tid, leaves_with_payload));
        }
        self.trees = new_trees;

        let local_count = self.num_local_leaves() as i64;
        let mut counts = vec![0i64; size as usize];
        world.all_gather_into(&local_count, &mut counts[..]);
        let mut global_first_quadrant = vec![0i64; size as usize + 1];
        for i in 0..size as usize {
            global_first_quadrant[i + 1] = global_first_quadrant[i] + counts[i];
        }
        self.global_first_quadrant = global_first_quadrant;

        let num_trees = self.connectivity.num_trees();
        let local_has_leaves = self.num_local_leaves() > 0;
        let local_position = local_first_position(&self.trees).unwrap_or_else(|| sentinel_position(num_trees));
        let mut flags = vec![0u8; size as usize];
        world.all_gather_into(&(local_has_leaves as u8), &mut flags[..]);
        let mut tree_ids = vec![0i32; size as usize];
        world.all_gather_into(&local_position.which_tree, &mut tree_ids[..]);
        let mut octs = vec![Octant::default(); size as usize];
        world.all_gather_into(&local_position.quadrant, &mut octs[..]);
        let mut positions: Vec<PartitionPosition> = (0..size as usize)
            .map(|i| PartitionPosition { which_tree: tree_ids[i], quadrant: octs[i] })
            .collect();
        positions.push(sentinel_position(num_trees));
        // Empty ranks don't own a real boundary: they share the position
        // of the next rank that does (or the trailing sentinel), so the
        // sequence never reports a gap at an empty rank's slot.
        for i in (0..positions.len() - 1).rev() {
            if flags[i] == 0 {
                positions[i] = positions[i + 1];
            }
        }
        self.global_first_position = positions;

        self.recompute_cursors();
    }

    /// Persist this rank's share of the forest via [`crate::io::save`].
    pub fn save<W: std::io::Write>(
        &self,
        w: &mut W,
        include_data: bool,
        encode: impl Fn(&U) -> Vec<u8>,
    ) -> Result<(), crate::error::ForestIoError> {
        crate::io::save(
            w,
            self.connectivity,
            self.rank,
            self.size,
            &self.trees,
            &self.global_first_quadrant,
            &self.global_first_position,
            include_data,
            encode,
        )
    }

    /// Wrap every local leaf into the iterator engine's `Tree` slice for
    /// [`crate::iterator::iterate`].
    pub fn iterate(
        &self,
        ghosts: &crate::ghost::GhostLayer<U>,
        volume_cb: Option<&mut dyn FnMut(TreeId, &Octant, &Payload<U>)>,
        face_cb: Option<&mut dyn FnMut(&crate::iterator::FaceInfo<U>)>,
        edge_cb: Option<&mut dyn FnMut(&crate::iterator::EdgeInfo<U>)>,
        corner_cb: Option<&mut dyn FnMut(&crate::iterator::CornerInfo<U>)>,
    ) {
        crate::iterator::iterate(&self.trees, self.connectivity, ghosts, volume_cb, face_cb, edge_cb, corner_cb);
    }
}

/// `S2`/S6-style family predicate reused by the default `coarsen`
/// convenience wrapper: every rank's own octant algebra already defines
/// family-ness, so the driver layer does not need a second notion of it.
pub fn default_family_ok(fam: &[Octant; 8]) -> bool {
    is_family(fam)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morton::qlen;

    fn pl(_t: TreeId, _q: &Octant) -> Payload<()> {
        Payload::User(())
    }

    #[test]
    fn single_rank_forest_starts_with_one_leaf_per_tree() {
        let conn = Connectivity::periodic_unit_cube();
        let f = Forest::new_single(&conn, pl);
        assert_eq!(f.num_local_leaves(), 1);
        assert_eq!(f.first_local_tree, 0);
        assert_eq!(f.last_local_tree, 0);
    }

    #[test]
    fn refine_level_respects_max_level_cap() {
        let conn = Connectivity::periodic_unit_cube();
        let mut f = Forest::new_single(&conn, pl);
        f.refine_level(true, |_, _| true, pl, 2);
        assert_eq!(f.num_local_leaves(), 64);
        assert!(f.trees()[0].leaves().iter().all(|(q, _)| q.level <= 2));
    }

    #[test]
    fn coarsen_collapses_uniform_refinement_back_to_root() {
        let conn = Connectivity::periodic_unit_cube();
        let mut f = Forest::new_single(&conn, pl);
        f.refine_level(true, |_, _| true, pl, 1);
        assert_eq!(f.num_local_leaves(), 8);
        f.coarsen(true, |_, fam| default_family_ok(fam), pl);
        assert_eq!(f.num_local_leaves(), 1);
    }

    /// `tracing-subscriber`'s test writer: enables the balance fixpoint's
    /// `tracing::debug!` spans to show up under `cargo test -- --nocapture`
    /// without installing a global subscriber.
    fn with_test_tracing() -> tracing::subscriber::DefaultGuard {
        tracing::subscriber::set_default(
            tracing_subscriber::fmt().with_test_writer().with_env_filter("debug").finish(),
        )
    }

    #[test]
    fn s6_balance_face_yields_a_monotone_staircase() {
        // S6: one deep leaf seeded in an otherwise-uniform single tree;
        // `balance(FACE)` must bring every neighbor within one level.
        let _guard = with_test_tracing();
        let conn = Connectivity::periodic_unit_cube();
        let mut f = Forest::new_single(&conn, pl);
        f.refine(false, |_, q| q.level == 0, pl);
        // Drive one branch down to level 4, leaving its neighbors at 1.
        f.refine(true, |_, q| q.x == 0 && q.y == 0 && q.z == 0, pl);
        let before_max = f.trees()[0].maxlevel();
        assert!(before_max >= 4);
        f.balance(BalanceKind::Face, pl);
        let leaves: Vec<Octant> = f.trees()[0].leaves().iter().map(|(q, _)| *q).collect();
        for q in &leaves {
            for face in 0..6u8 {
                let n = q.face_neighbor(face);
                if !n.is_inside_root() {
                    continue;
                }
                if let Some((_, other)) = leaves.iter().find_map(|o| (o.ancestor_at_level(o.level.min(n.level)) == n.ancestor_at_level(o.level.min(n.level))).then(|| (0, *o))) {
                    let diff = (q.level as i32 - other.level as i32).abs();
                    assert!(diff <= 1, "q={:?} other={:?}", q, other);
                }
            }
        }
    }

    #[test]
    fn checksum_local_is_order_independent() {
        let conn = Connectivity::periodic_unit_cube();
        let mut a = Forest::new_single(&conn, pl);
        a.refine_level(true, |_, _| true, pl, 2);
        let mut b = Forest::new_single(&conn, pl);
        b.refine_level(true, |_, _| true, pl, 2);
        // Coarsen-then-refine in a different order to scramble internal
        // vector order while keeping the same leaf set.
        b.trees_mut_for_test().reverse();
        assert_eq!(a.checksum_local(), b.checksum_local());
    }

    #[test]
    fn copy_without_data_discards_user_payload() {
        let conn = Connectivity::periodic_unit_cube();
        let f = Forest::new_single(&conn, pl);
        let copied = f.copy(false);
        assert!(matches!(copied.trees()[0].leaves()[0].1, Payload::WhichTree(_)));
        let full = f.copy(true);
        assert!(matches!(full.trees()[0].leaves()[0].1, Payload::User(())));
    }

    impl<'c, U: Clone> Forest<'c, U> {
        fn trees_mut_for_test(&mut self) -> &mut Vec<Tree<U>> {
            &mut self.trees
        }
    }

    #[test]
    fn qlen_sanity_for_balance_fixture() {
        assert!(qlen(4) < qlen(1));
    }
}
