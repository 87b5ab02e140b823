//! The ghost layer: a caller-supplied, Morton-sorted sequence of
//! non-local leaves that touch the local section across a face, edge,
//! or corner. Construction (the collective all-to-all that discovers
//! which remote leaves actually touch this rank) is outside this
//! crate's scope per `SPEC_FULL.md` §1 — this module only models the
//! shape the iterator consumes.

use crate::morton::{Octant, TreeId};
use crate::payload::Payload;

/// One non-local leaf, tagged with the rank that owns it — the
/// `Piggy1 { which_tree, owner_rank }` payload shape from `SPEC_FULL.md`
/// §9's tagged-payload note.
#[derive(Clone, Debug)]
pub struct GhostLeaf<U> {
    pub tree: TreeId,
    pub quadrant: Octant,
    pub data: Payload<U>,
    pub owner_rank: i32,
}

/// Sorted sequence of ghosts, grouped by tree for the iterator's
/// per-tree neighbor lookups.
#[derive(Clone, Debug, Default)]
pub struct GhostLayer<U> {
    leaves: Vec<GhostLeaf<U>>,
}

impl<U> GhostLayer<U> {
    /// An empty ghost layer, e.g. for a single-rank forest where every
    /// neighbor is necessarily local.
    pub fn empty() -> Self {
        GhostLayer { leaves: Vec::new() }
    }

    /// Build from an already Morton-sorted-within-tree sequence.
    /// `debug_assert`s the per-tree ordering rather than repairing it —
    /// ghost construction is the caller's responsibility.
    pub fn from_sorted(leaves: Vec<GhostLeaf<U>>) -> Self {
        debug_assert!(leaves.windows(2).all(|w| {
            w[0].tree < w[1].tree || (w[0].tree == w[1].tree && w[0].quadrant < w[1].quadrant)
        }));
        GhostLayer { leaves }
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// The ghost octants belonging to `tree`, Morton-sorted.
    pub fn octants_of(&self, tree: TreeId) -> Vec<Octant> {
        let start = self.leaves.partition_point(|g| g.tree < tree);
        self.leaves[start..]
            .iter()
            .take_while(|g| g.tree == tree)
            .map(|g| g.quadrant)
            .collect()
    }

    pub fn leaves(&self) -> &[GhostLeaf<U>] {
        &self.leaves
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn octants_of_filters_by_tree_and_preserves_order() {
        let g = GhostLayer::from_sorted(vec![
            GhostLeaf { tree: 0, quadrant: Octant::new(0, 0, 0, 1), data: Payload::<()>::WhichTree(0), owner_rank: 1 },
            GhostLeaf { tree: 0, quadrant: Octant::new(crate::morton::qlen(1), 0, 0, 1), data: Payload::WhichTree(0), owner_rank: 1 },
            GhostLeaf { tree: 1, quadrant: Octant::new(0, 0, 0, 0), data: Payload::WhichTree(1), owner_rank: 2 },
        ]);
        assert_eq!(g.octants_of(0).len(), 2);
        assert_eq!(g.octants_of(1).len(), 1);
        assert_eq!(g.octants_of(2).len(), 0);
    }
}
