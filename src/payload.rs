//! Tagged leaf payload: the per-octant slot that every [`crate::tree::Tree`]
//! leaf carries, used by ghost exchange and partition bookkeeping to attach
//! metadata without growing `Octant` itself.

use crate::morton::TreeId;

/// One of the payload shapes a leaf may carry. Which variant is live is
/// determined by the operation that produced it (construction, ghost
/// exchange, partition) rather than inspected blindly by callers.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload<U> {
    /// Opaque, user-owned data.
    User(U),
    /// Just the containing tree, e.g. for ghost layer entries before
    /// ownership is resolved.
    WhichTree(TreeId),
    /// Tree plus the rank that owns the leaf — used for ghost quadrants.
    Piggy1 { which_tree: TreeId, owner_rank: i32 },
    /// Tree plus the tree a quadrant was transformed from — used when
    /// building cross-tree ghost neighbors.
    Piggy2 { which_tree: TreeId, from_tree: TreeId },
    /// Tree plus a local index, e.g. into a tree's leaf array — used to
    /// map a ghost back to its owner's local numbering.
    Piggy3 { which_tree: TreeId, local_num: i64 },
}

impl<U> Payload<U> {
    pub fn which_tree(&self) -> TreeId {
        match self {
            Payload::User(_) => panic!("Payload::User carries no tree id"),
            Payload::WhichTree(t) => *t,
            Payload::Piggy1 { which_tree, .. } => *which_tree,
            Payload::Piggy2 { which_tree, .. } => *which_tree,
            Payload::Piggy3 { which_tree, .. } => *which_tree,
        }
    }

    pub fn as_user(&self) -> Option<&U> {
        match self {
            Payload::User(u) => Some(u),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn which_tree_reads_through_every_tagged_variant() {
        let p1: Payload<()> = Payload::WhichTree(3);
        let p2: Payload<()> = Payload::Piggy1 { which_tree: 4, owner_rank: 2 };
        let p3: Payload<()> = Payload::Piggy2 { which_tree: 5, from_tree: 1 };
        let p4: Payload<()> = Payload::Piggy3 { which_tree: 6, local_num: 9 };
        assert_eq!(p1.which_tree(), 3);
        assert_eq!(p2.which_tree(), 4);
        assert_eq!(p3.which_tree(), 5);
        assert_eq!(p4.which_tree(), 6);
    }

    #[test]
    fn as_user_only_matches_the_user_variant() {
        let p: Payload<i32> = Payload::User(42);
        assert_eq!(p.as_user(), Some(&42));
        let q: Payload<i32> = Payload::WhichTree(0);
        assert_eq!(q.as_user(), None);
    }
}
