//! A single tree: one root cell's worth of leaf octants, kept sorted in
//! Morton order with a per-leaf payload slot.

use crate::morton::{deepest_first_descendant, deepest_last_descendant, Octant, TreeId, QMAXLEVEL};
use crate::payload::Payload;

/// The sorted leaf octants belonging to one tree of a [`crate::forest::Forest`].
#[derive(Clone, Debug)]
pub struct Tree<U> {
    pub tree_id: TreeId,
    leaves: Vec<(Octant, Payload<U>)>,
    maxlevel: u8,
    /// Count of local leaves at each level `0..=QMAXLEVEL`.
    per_level_counts: [u64; (QMAXLEVEL as usize) + 1],
}

impl<U: Clone> Tree<U> {
    /// A single root-cell leaf, undivided.
    pub fn new_uniform(tree_id: TreeId, payload: Payload<U>) -> Self {
        let mut t = Tree {
            tree_id,
            leaves: vec![(Octant::root(), payload)],
            maxlevel: 0,
            per_level_counts: [0; (QMAXLEVEL as usize) + 1],
        };
        t.recount();
        t
    }

    /// Build from an already-complete, already-sorted set of leaves.
    /// `debug_assert`s that the invariant (sorted, no gaps, no overlaps)
    /// holds rather than repairing it — callers (refine/coarsen/balance)
    /// are responsible for producing a complete set.
    pub fn from_sorted_leaves(tree_id: TreeId, leaves: Vec<(Octant, Payload<U>)>) -> Self {
        debug_assert!(leaves.windows(2).all(|w| w[0].0 < w[1].0));
        let mut t = Tree { tree_id, leaves, maxlevel: 0, per_level_counts: [0; (QMAXLEVEL as usize) + 1] };
        t.recount();
        t
    }

    fn recount(&mut self) {
        self.maxlevel = self.leaves.iter().map(|(q, _)| q.level).max().unwrap_or(0);
        self.per_level_counts = [0; (QMAXLEVEL as usize) + 1];
        for (q, _) in &self.leaves {
            self.per_level_counts[q.level as usize] += 1;
        }
    }

    pub fn leaves(&self) -> &[(Octant, Payload<U>)] {
        &self.leaves
    }

    pub fn leaves_mut(&mut self) -> &mut Vec<(Octant, Payload<U>)> {
        &mut self.leaves
    }

    pub fn into_leaves(self) -> Vec<(Octant, Payload<U>)> {
        self.leaves
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn maxlevel(&self) -> u8 {
        self.maxlevel
    }

    /// Count of local leaves at `level`.
    pub fn level_count(&self, level: u8) -> u64 {
        self.per_level_counts[level as usize]
    }

    pub fn first_quadrant(&self) -> Option<&Octant> {
        self.leaves.first().map(|(q, _)| q)
    }

    pub fn last_quadrant(&self) -> Option<&Octant> {
        self.leaves.last().map(|(q, _)| q)
    }

    /// First descendant cursor: the finest (`QMAXLEVEL`) descendant of
    /// the first local leaf, i.e. the Morton lower bound this process
    /// owns of this tree.
    pub fn first_descendant(&self) -> Option<Octant> {
        self.first_quadrant().map(deepest_first_descendant)
    }

    /// Last descendant cursor: the finest descendant of the last local
    /// leaf, the Morton upper bound this process owns of this tree.
    pub fn last_descendant(&self) -> Option<Octant> {
        self.last_quadrant().map(deepest_last_descendant)
    }

    /// Split every leaf for which `predicate` holds into its eight
    /// children, via `init` rather than cloning the parent's payload.
    /// When `recursive`, repeats until no remaining leaf below
    /// `QMAXLEVEL` still matches; otherwise applies a single pass.
    pub fn refine(
        &mut self,
        recursive: bool,
        predicate: impl Fn(&Octant) -> bool,
        init: impl Fn(&Octant) -> Payload<U>,
    ) {
        loop {
            let changed = self.refine_once(&predicate, &init);
            if !changed || !recursive {
                break;
            }
        }
        self.recount();
    }

    fn refine_once(&mut self, predicate: &impl Fn(&Octant) -> bool, init: &impl Fn(&Octant) -> Payload<U>) -> bool {
        let mut next = Vec::with_capacity(self.leaves.len());
        let mut changed = false;
        for (q, payload) in self.leaves.drain(..) {
            if q.level < QMAXLEVEL && predicate(&q) {
                changed = true;
                for c in q.children() {
                    next.push((c, init(&c)));
                }
            } else {
                next.push((q, payload));
            }
        }
        next.sort_by(|a, b| a.0.cmp(&b.0));
        self.leaves = next;
        changed
    }

    /// Refine every leaf below `level` uniformly until all leaves reach
    /// `level` (or `QMAXLEVEL`, whichever is smaller), each new child
    /// inheriting a clone of its parent's payload.
    pub fn refine_level(&mut self, level: u8) {
        let target = level.min(QMAXLEVEL);
        loop {
            let mut next = Vec::with_capacity(self.leaves.len());
            let mut changed = false;
            for (q, payload) in self.leaves.drain(..) {
                if q.level < target {
                    changed = true;
                    for c in q.children() {
                        next.push((c, payload.clone()));
                    }
                } else {
                    next.push((q, payload));
                }
            }
            next.sort_by(|a, b| a.0.cmp(&b.0));
            self.leaves = next;
            if !changed {
                break;
            }
        }
        self.recount();
    }

    /// Replace every complete family of eight siblings for which
    /// `family_ok` holds with their parent, whose payload is produced by
    /// `init`. Families are detected by scanning the sorted leaf list in
    /// runs of matching parents. When `recursive`, repeats so a newly
    /// coarsened parent can itself join a coarser family.
    pub fn coarsen(
        &mut self,
        recursive: bool,
        family_ok: impl Fn(&[Octant; 8]) -> bool,
        init: impl Fn(&Octant) -> Payload<U>,
    ) {
        loop {
            let changed = self.coarsen_once(&family_ok, &init);
            if !changed || !recursive {
                break;
            }
        }
        self.recount();
    }

    fn coarsen_once(
        &mut self,
        family_ok: &impl Fn(&[Octant; 8]) -> bool,
        init: &impl Fn(&Octant) -> Payload<U>,
    ) -> bool {
        let mut next = Vec::with_capacity(self.leaves.len());
        let mut i = 0;
        let mut changed = false;
        while i < self.leaves.len() {
            if i + 8 <= self.leaves.len() && self.leaves[i].0.level > 0 {
                let mut fam = [Octant::root(); 8];
                for (j, f) in fam.iter_mut().enumerate() {
                    *f = self.leaves[i + j].0;
                }
                if crate::morton::is_family(&fam) && family_ok(&fam) {
                    let parent = fam[0].parent();
                    next.push((parent, init(&parent)));
                    i += 8;
                    changed = true;
                    continue;
                }
            }
            next.push(self.leaves[i].clone());
            i += 1;
        }
        self.leaves = next;
        changed
    }

    /// Overwrite every leaf's payload via `f`, e.g. after a load where
    /// user data must be reinitialized (`reset_data`).
    pub fn reset_data(&mut self, f: impl Fn(&Octant) -> Payload<U>) {
        for (q, payload) in self.leaves.iter_mut() {
            *payload = f(q);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morton::qlen;

    fn pl() -> Payload<()> {
        Payload::User(())
    }

    #[test]
    fn uniform_refine_to_level_two_yields_64_leaves() {
        let mut t = Tree::new_uniform(0, pl());
        t.refine_level(2);
        assert_eq!(t.len(), 64);
        assert_eq!(t.maxlevel(), 2);
        assert_eq!(t.level_count(2), 64);
        assert_eq!(t.level_count(0), 0);
    }

    #[test]
    fn refine_predicate_only_splits_matching_leaves() {
        let mut t = Tree::new_uniform(0, pl());
        t.refine_level(1);
        let half = qlen(1);
        t.refine(true, |q| q.level == 1 && q.x == 0 && q.y == 0 && q.z == 0, |_| pl());
        assert_eq!(t.len(), 7 + 8);
        assert!(t.leaves().iter().any(|(q, _)| q.level == 2 && q.x == 0 && q.y == 0));
        assert!(t.leaves().iter().any(|(q, _)| q.level == 1 && q.x == half));
    }

    #[test]
    fn non_recursive_refine_only_applies_one_pass() {
        // Matches both levels 0 and 1; recursive=false must not let a
        // freshly split level-1 child be re-tested within the same call.
        let mut t = Tree::new_uniform(0, pl());
        t.refine(false, |q| q.level < 2, |_| pl());
        assert_eq!(t.len(), 8);
        assert_eq!(t.maxlevel(), 1);
        t.refine(false, |q| q.level < 2, |_| pl());
        assert_eq!(t.len(), 64);
    }

    #[test]
    fn coarsen_collapses_a_full_family() {
        let mut t = Tree::new_uniform(0, pl());
        t.refine_level(1);
        t.coarsen(true, |_| true, |_| pl());
        assert_eq!(t.len(), 1);
        assert_eq!(t.leaves()[0].0, Octant::root());
    }

    #[test]
    fn descendant_cursors_span_the_local_leaf_range() {
        let mut t = Tree::new_uniform(0, pl());
        t.refine_level(2);
        let first = t.first_descendant().unwrap();
        let last = t.last_descendant().unwrap();
        assert_eq!(first, crate::morton::deepest_first_descendant(&t.leaves()[0].0));
        assert_eq!(last, crate::morton::deepest_last_descendant(&t.leaves().last().unwrap().0));
        assert!(first <= last);
    }
}
