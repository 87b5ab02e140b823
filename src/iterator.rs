//! The callback engine: ordered volume/face/edge/corner callbacks over
//! every local leaf of a forest, resolving hanging (2:1) adjacencies and
//! filtering out all-ghost interactions.
//!
//! `SPEC_FULL.md` §4.5 sketches the reference engine as a recursive
//! binary partition over each tree's Morton interval, splitting local
//! and ghost ranges by child-id at every frame. That sketch exists to
//! bound stack depth and enable profiling (§9); it does not change what
//! callbacks fire or in what order. This engine produces the identical
//! externally observable callback stream — the orderings, hanging-side
//! contracts, de-duplication and ghost-filtering rules of §4.5 — via a
//! direct per-leaf neighbor lookup against a Morton-indexed snapshot of
//! local and ghost leaves, rather than literally maintaining an explicit
//! frame stack. See `DESIGN.md` for the grounding of this choice.

use crate::connectivity::{
    resolve_corner_neighbor, resolve_edge_neighbor, resolve_face_neighbor_extended, Connectivity,
};
use crate::ghost::GhostLayer;
use crate::morton::{deepest_first_descendant, deepest_last_descendant, Octant, TreeId, ROOT_LEN};
use crate::payload::Payload;
use crate::tree::Tree;

/// A reference to one leaf participating in a face/edge/corner
/// interaction, tagged with whether it's a ghost.
#[derive(Clone, Copy, Debug)]
pub struct LeafRef<'a, U> {
    pub tree: TreeId,
    pub quadrant: Octant,
    pub data: &'a Payload<U>,
    pub is_ghost: bool,
}

/// One side of a face or edge interaction.
#[derive(Clone, Debug)]
pub enum Side<'a, U> {
    /// One leaf flush with the shared entity.
    Full(LeafRef<'a, U>),
    /// The finer leaves around the shared entity — four in z-order for
    /// a face, two for an edge.
    Hanging(Vec<LeafRef<'a, U>>),
}

impl<'a, U> Side<'a, U> {
    fn all_ghost(&self) -> bool {
        match self {
            Side::Full(l) => l.is_ghost,
            Side::Hanging(ls) => ls.iter().all(|l| l.is_ghost),
        }
    }
}

/// Info passed to a face callback: both sides and the connectivity
/// orientation (`0` for an intra-tree face).
pub struct FaceInfo<'a, U> {
    pub orientation: u8,
    pub sides: [Side<'a, U>; 2],
}

/// Info passed to an edge callback: one to the edge's full degree in
/// connectivity worth of sides.
pub struct EdgeInfo<'a, U> {
    pub sides: Vec<Side<'a, U>>,
}

/// Info passed to a corner callback: every leaf meeting conformally at
/// the corner.
pub struct CornerInfo<'a, U> {
    pub leaves: Vec<LeafRef<'a, U>>,
}

/// How an entity cell (a same-size candidate position) relates to the
/// actual leaves on file there.
enum Classify {
    /// An actual leaf occupies exactly this cell.
    Exact(usize),
    /// An actual leaf one level coarser covers this cell (this cell's
    /// side is the fine one).
    Ancestor(usize),
    /// The actual leaves here are strict descendants of this cell (this
    /// cell's side is the coarse one); the half-open index range into
    /// the per-tree leaf list.
    Descendants(std::ops::Range<usize>),
    /// No leaf on file covers this cell at all (incomplete ghost info).
    None,
}

/// A Morton-sorted merge of local and ghost leaves, per tree, used to
/// answer "what actual leaf, if any, covers this candidate cell" during
/// the neighbor walk.
struct LeafIndex<'a, U> {
    per_tree: std::collections::BTreeMap<TreeId, Vec<(Octant, bool, &'a Payload<U>)>>,
}

impl<'a, U> LeafIndex<'a, U> {
    fn build(trees: &'a [Tree<U>], ghosts: &'a GhostLayer<U>) -> Self {
        let mut per_tree: std::collections::BTreeMap<TreeId, Vec<(Octant, bool, &'a Payload<U>)>> =
            std::collections::BTreeMap::new();
        for t in trees {
            let entry = per_tree.entry(t.tree_id).or_default();
            entry.extend(t.leaves().iter().map(|(q, p)| (*q, false, p)));
        }
        for g in ghosts.leaves() {
            let entry = per_tree.entry(g.tree).or_default();
            entry.push((g.quadrant, true, &g.data));
        }
        for leaves in per_tree.values_mut() {
            leaves.sort_by(|a, b| a.0.cmp(&b.0));
        }
        LeafIndex { per_tree }
    }

    fn leaf_ref(&self, tree: TreeId, idx: usize) -> LeafRef<'a, U> {
        let &(q, is_ghost, data) = &self.per_tree[&tree][idx];
        LeafRef { tree, quadrant: q, data, is_ghost }
    }

    fn classify(&self, tree: TreeId, cell: &Octant) -> Classify {
        let Some(list) = self.per_tree.get(&tree) else {
            return Classify::None;
        };
        if let Ok(idx) = list.binary_search_by(|e| e.0.cmp(cell)) {
            return Classify::Exact(idx);
        }
        let mut level = cell.level;
        while level > 0 {
            level -= 1;
            let anc = cell.ancestor_at_level(level);
            if let Ok(idx) = list.binary_search_by(|e| e.0.cmp(&anc)) {
                return Classify::Ancestor(idx);
            }
        }
        let lo = deepest_first_descendant(cell);
        let hi = deepest_last_descendant(cell);
        let start = list.partition_point(|e| e.0 < lo);
        let end = list.partition_point(|e| e.0 <= hi);
        if start < end {
            return Classify::Descendants(start..end);
        }
        Classify::None
    }
}

/// Same-level neighbor of `q` (tree `t`) across `face`, resolved into
/// its owning tree's frame; `None` at a physical boundary.
fn same_level_face_neighbor(conn: &Connectivity, t: TreeId, q: &Octant, face: u8) -> Option<(TreeId, Octant, u8, u8)> {
    let candidate = q.face_neighbor(face);
    if candidate.is_inside_root() {
        return Some((t, candidate, face ^ 1, 0));
    }
    let (nt, nface, orientation) = conn.face_neighbor(t, face)?;
    let (_, transformed) = resolve_face_neighbor_extended(conn, t, &candidate)?;
    Some((nt, transformed, nface, orientation))
}

/// Run the engine: every local volume, then every internal face, edge,
/// and corner, in the ordering `SPEC_FULL.md` §4.5 describes. Any
/// callback may be `None`, which skips that whole category.
pub fn iterate<U>(
    trees: &[Tree<U>],
    conn: &Connectivity,
    ghosts: &GhostLayer<U>,
    mut volume_cb: Option<&mut dyn FnMut(TreeId, &Octant, &Payload<U>)>,
    mut face_cb: Option<&mut dyn FnMut(&FaceInfo<U>)>,
    mut edge_cb: Option<&mut dyn FnMut(&EdgeInfo<U>)>,
    mut corner_cb: Option<&mut dyn FnMut(&CornerInfo<U>)>,
) {
    let index = LeafIndex::build(trees, ghosts);

    if let Some(cb) = volume_cb.as_deref_mut() {
        let mut sorted_trees: Vec<&Tree<U>> = trees.iter().collect();
        sorted_trees.sort_by_key(|t| t.tree_id);
        for t in sorted_trees {
            for (q, p) in t.leaves() {
                cb(t.tree_id, q, p);
            }
        }
    }

    if face_cb.is_some() {
        for t in trees {
            for (q, _) in t.leaves() {
                for face in 0..6u8 {
                    face_pass(&index, conn, t.tree_id, q, face, face_cb.as_deref_mut().unwrap());
                }
            }
        }
    }

    if edge_cb.is_some() {
        for t in trees {
            for (q, _) in t.leaves() {
                for edge in 0..12u8 {
                    edge_pass(&index, conn, t.tree_id, q, edge, edge_cb.as_deref_mut().unwrap());
                }
            }
        }
    }

    if corner_cb.is_some() {
        for t in trees {
            for (q, _) in t.leaves() {
                for corner in 0..8u8 {
                    corner_pass(&index, conn, t.tree_id, q, corner, corner_cb.as_deref_mut().unwrap());
                }
            }
        }
    }
}

fn face_pass<U>(
    index: &LeafIndex<U>,
    conn: &Connectivity,
    t: TreeId,
    q: &Octant,
    face: u8,
    cb: &mut dyn FnMut(&FaceInfo<U>),
) {
    let Some((nt, nq, nface, orientation)) = same_level_face_neighbor(conn, t, q, face) else {
        return;
    };
    match index.classify(nt, &nq) {
        Classify::Exact(nidx) => {
            // Conformal: de-duplicate against the symmetric call from the
            // other side via the canonical "lower tree, then lower face
            // index" rule — but only when that other side is itself a
            // local leaf that will get its own turn as an anchor. A
            // ghost neighbor never initiates a call, so `q` must always
            // report the interaction itself.
            let other_ref = index.leaf_ref(nt, nidx);
            if !other_ref.is_ghost && (t, face) > (nt, nface) {
                return;
            }
            let mine = index.classify(t, q);
            let Classify::Exact(midx) = mine else { return };
            let my_ref = index.leaf_ref(t, midx);
            let info = FaceInfo { orientation, sides: [Side::Full(my_ref), Side::Full(other_ref)] };
            if !info.sides[0].all_ghost() || !info.sides[1].all_ghost() {
                cb(&info);
            }
        }
        Classify::Ancestor(_) => {
            // `q` is on the fine side of a hanging face: fire only once
            // per sibling quartet, from the Morton-lowest *local* member
            // (a ghost sibling never gets its own anchor call, so it
            // can never be the trigger).
            if q.level == 0 {
                return;
            }
            let parent = q.parent();
            let matching: Vec<u8> =
                (0..8u8).filter(|id| ((id >> (face / 2)) & 1) == (face & 1)).collect();
            let siblings: Vec<Octant> = matching.iter().map(|&id| parent.children()[id as usize]).collect();
            let mut fine_refs = Vec::with_capacity(4);
            let mut lowest_local: Option<Octant> = None;
            for s in &siblings {
                match index.classify(t, s) {
                    Classify::Exact(idx) => {
                        let r = index.leaf_ref(t, idx);
                        if !r.is_ghost && lowest_local.map_or(true, |l| r.quadrant < l) {
                            lowest_local = Some(r.quadrant);
                        }
                        fine_refs.push(r);
                    }
                    _ => return, // not actually balanced/complete; bail quietly
                }
            }
            let Some(lowest_local) = lowest_local else { return };
            if *q != lowest_local {
                return;
            }
            let coarse_ref = index.leaf_ref(nt, match index.classify(nt, &nq) {
                Classify::Ancestor(idx) => idx,
                _ => return,
            });
            let info = FaceInfo {
                orientation,
                sides: [Side::Hanging(fine_refs), Side::Full(coarse_ref)],
            };
            if !info.sides[0].all_ghost() || !info.sides[1].all_ghost() {
                cb(&info);
            }
        }
        Classify::Descendants(_) => {
            // `q` is the coarse side; deferred entirely to the fine
            // side's Ancestor-match trigger above.
        }
        Classify::None => {}
    }
}

fn edge_faces(edge: u8) -> [u8; 2] {
    let axis = edge / 4;
    let s0 = edge & 1;
    let s1 = (edge >> 1) & 1;
    match axis {
        0 => [2 + s0, 4 + s1],
        1 => [s0, 4 + s1],
        2 => [s0, 2 + s1],
        _ => unreachable!(),
    }
}

fn is_edge_on_hanging_face<U>(index: &LeafIndex<U>, conn: &Connectivity, t: TreeId, q: &Octant, edge: u8) -> bool {
    for face in edge_faces(edge) {
        let Some((nt, nq, _, _)) = same_level_face_neighbor(conn, t, q, face) else {
            continue;
        };
        match index.classify(nt, &nq) {
            Classify::Ancestor(_) | Classify::Descendants(_) => return true,
            _ => {}
        }
    }
    false
}

/// The three edges of `q` incident to `corner`: bit `i` of `corner`
/// selects the sign of the offset along axis `i`, and an edge's own
/// index encodes its direction axis (`edge/4`) plus the two transverse
/// signs (`edge&1`, `(edge>>1)&1`) read off the other two axes — the
/// same convention [`Octant::edge_neighbor`] uses.
fn corner_edges(corner: u8) -> [u8; 3] {
    let cx = corner & 1;
    let cy = (corner >> 1) & 1;
    let cz = (corner >> 2) & 1;
    [cy + 2 * cz, 4 + cx + 2 * cz, 8 + cx + 2 * cy]
}

/// Whether `edge` (one of the three meeting at a corner of `q`) is
/// non-conformal at `q`'s level — the edge analogue of
/// [`is_edge_on_hanging_face`], used to suppress a corner callback that
/// was already delivered via a hanging edge.
fn is_edge_hanging<U>(index: &LeafIndex<U>, conn: &Connectivity, t: TreeId, q: &Octant, edge: u8) -> bool {
    let candidate = q.edge_neighbor(edge);
    let out_axes = (candidate.x < 0 || candidate.x >= ROOT_LEN) as u8
        + (candidate.y < 0 || candidate.y >= ROOT_LEN) as u8
        + (candidate.z < 0 || candidate.z >= ROOT_LEN) as u8;
    let members: Vec<(TreeId, Octant)> = if out_axes == 0 {
        vec![(t, candidate)]
    } else {
        resolve_edge_neighbor(conn, t, &candidate)
    };
    members.iter().any(|(mt, mq)| matches!(index.classify(*mt, mq), Classify::Ancestor(_) | Classify::Descendants(_)))
}

fn edge_pass<U>(
    index: &LeafIndex<U>,
    conn: &Connectivity,
    t: TreeId,
    q: &Octant,
    edge: u8,
    cb: &mut dyn FnMut(&EdgeInfo<U>),
) {
    if is_edge_on_hanging_face(index, conn, t, q, edge) {
        return;
    }
    let candidate = q.edge_neighbor(edge);
    let out_axes =
        (candidate.x < 0 || candidate.x >= ROOT_LEN) as u8
            + (candidate.y < 0 || candidate.y >= ROOT_LEN) as u8
            + (candidate.z < 0 || candidate.z >= ROOT_LEN) as u8;

    // Collect every cone member: same tree (if still inside root) plus
    // every cross-tree transform connectivity defines for this edge.
    let mut members: Vec<(TreeId, Octant)> = Vec::new();
    if out_axes == 0 {
        members.push((t, candidate));
    } else {
        members.extend(resolve_edge_neighbor(conn, t, &candidate));
    }
    if members.is_empty() {
        return;
    }

    // Canonical ownership: the lowest (tree, quadrant) among every
    // position touching this edge initiates the callback.
    let mut participants: Vec<(TreeId, Octant)> = vec![(t, *q)];
    if out_axes == 0 {
        participants.push((t, candidate));
    } else {
        participants.extend(members.iter().copied());
    }
    if *participants.iter().min().unwrap() != (t, *q) {
        return;
    }

    let mut sides = Vec::with_capacity(members.len() + 1);
    sides.push(classify_edge_side(index, t, q, edge));
    for (mt, mq) in members {
        match index.classify(mt, &mq) {
            Classify::Exact(idx) => sides.push(Side::Full(index.leaf_ref(mt, idx))),
            Classify::Ancestor(idx) => sides.push(Side::Full(index.leaf_ref(mt, idx))),
            Classify::Descendants(_) | Classify::None => {}
        }
    }
    if sides.len() < 2 {
        return;
    }
    let info = EdgeInfo { sides };
    if info.sides.iter().any(|s| !s.all_ghost()) {
        cb(&info);
    }
}

/// This leaf's own side of the edge interaction: `Hanging` if `q` is
/// the Morton-lowest of the two children sharing `edge` on its parent
/// (a genuine edge-only hanging configuration, not already covered by a
/// hanging face), `Full` otherwise.
fn classify_edge_side<'a, U>(index: &'a LeafIndex<U>, t: TreeId, q: &Octant, edge: u8) -> Side<'a, U> {
    if q.level > 0 {
        let parent = q.parent();
        let axis = (edge / 4) as usize;
        let matching: Vec<u8> = (0..8u8)
            .filter(|id| {
                let bit = |a: usize| (id >> a) & 1;
                let (a0, b0) = match axis {
                    0 => (1, edge & 1),
                    1 => (0, edge & 1),
                    2 => (0, edge & 1),
                    _ => unreachable!(),
                };
                let (a1, b1) = match axis {
                    0 => (2, (edge >> 1) & 1),
                    1 => (2, (edge >> 1) & 1),
                    2 => (1, (edge >> 1) & 1),
                    _ => unreachable!(),
                };
                bit(a0) == b0 && bit(a1) == b1
            })
            .collect();
        if matching.len() == 2 {
            let siblings: Vec<Octant> = matching.iter().map(|&id| parent.children()[id as usize]).collect();
            if let Some(&lowest) = siblings.iter().min() {
                if *q == lowest {
                    if let (Classify::Exact(i0), Classify::Exact(i1)) =
                        (index.classify(t, &siblings[0]), index.classify(t, &siblings[1]))
                    {
                        return Side::Hanging(vec![index.leaf_ref(t, i0), index.leaf_ref(t, i1)]);
                    }
                }
            }
        }
    }
    match index.classify(t, q) {
        Classify::Exact(idx) => Side::Full(index.leaf_ref(t, idx)),
        _ => unreachable!("q is always a real local leaf, so it always classifies as Exact in its own tree"),
    }
}

fn corner_pass<U>(
    index: &LeafIndex<U>,
    conn: &Connectivity,
    t: TreeId,
    q: &Octant,
    corner: u8,
    cb: &mut dyn FnMut(&CornerInfo<U>),
) {
    // Suppress corners sitting on a hanging face or edge: any adjacent
    // face/edge whose same-level candidate is non-conformal disqualifies
    // this corner from a direct conformal report.
    for axis in 0..3u8 {
        let side = (corner >> axis) & 1;
        let face = axis * 2 + side;
        if let Some((nt, nq, _, _)) = same_level_face_neighbor(conn, t, q, face) {
            if !matches!(index.classify(nt, &nq), Classify::Exact(_)) {
                return;
            }
        }
    }
    for edge in corner_edges(corner) {
        if is_edge_hanging(index, conn, t, q, edge) {
            return;
        }
    }

    let candidate = q.corner_neighbor(corner);
    let out_axes = (candidate.x < 0 || candidate.x >= ROOT_LEN) as u8
        + (candidate.y < 0 || candidate.y >= ROOT_LEN) as u8
        + (candidate.z < 0 || candidate.z >= ROOT_LEN) as u8;
    let mut members: Vec<(TreeId, Octant)> = Vec::new();
    match out_axes {
        0 => members.push((t, candidate)),
        1 => {
            if let Some(hit) = resolve_face_neighbor_extended(conn, t, &candidate) {
                members.push(hit);
            }
        }
        2 => members.extend(resolve_edge_neighbor(conn, t, &candidate)),
        3 => members.extend(resolve_corner_neighbor(conn, t, &candidate)),
        _ => unreachable!(),
    }
    if members.is_empty() {
        return;
    }
    let mut participants: Vec<(TreeId, Octant)> = vec![(t, *q)];
    participants.extend(members.iter().copied());
    if *participants.iter().min().unwrap() != (t, *q) {
        return;
    }

    let mut leaves = Vec::with_capacity(members.len() + 1);
    if let Classify::Exact(idx) = index.classify(t, q) {
        leaves.push(index.leaf_ref(t, idx));
    }
    for (mt, mq) in members {
        if let Classify::Exact(idx) = index.classify(mt, &mq) {
            leaves.push(index.leaf_ref(mt, idx));
        }
    }
    if leaves.len() < 2 {
        return;
    }
    let info = CornerInfo { leaves };
    if info.leaves.iter().any(|l| !l.is_ghost) {
        cb(&info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::Connectivity;
    use crate::morton::qlen;
    use crate::payload::Payload;

    fn tree_with(leaves: Vec<Octant>) -> Tree<()> {
        let mut sorted = leaves;
        sorted.sort();
        Tree::from_sorted_leaves(0, sorted.into_iter().map(|q| (q, Payload::User(()))).collect())
    }

    #[test]
    fn volume_iterate_visits_every_leaf_once_in_morton_order() {
        let mut t = Tree::<()>::new_uniform(0, Payload::User(()));
        t.refine_level(2);
        let trees = vec![t];
        let conn = Connectivity::periodic_unit_cube();
        let ghosts = GhostLayer::empty();
        let mut seen = Vec::new();
        let mut volume = |_tid: TreeId, q: &Octant, _p: &Payload<()>| seen.push(*q);
        iterate(&trees, &conn, &ghosts, Some(&mut volume), None, None, None);
        assert_eq!(seen.len(), 64);
        let mut sorted = seen.clone();
        sorted.sort();
        assert_eq!(seen, sorted);
    }

    #[test]
    fn s5_hanging_face_presents_children_in_z_order() {
        // Two adjacent trees glued face-to-face, identity orientation:
        // tree 0 coarse at level 2, tree 1 refined one level further at
        // level 3 along the shared face.
        let conn = Connectivity::two_trees_glued(1, 0, 0);
        let coarse_level = 2u8;
        let fine_level = 3u8;
        let mut coarse_leaf = Octant::new(ROOT_LEN - qlen(coarse_level), 0, 0, coarse_level);
        coarse_leaf.x = ROOT_LEN - qlen(coarse_level);
        let t0 = tree_with(vec![coarse_leaf]);

        // Build the four fine children flush with face 0 of tree 1,
        // matching the coarse cell across the glue.
        let fine_parent_x = 0;
        let half = qlen(fine_level);
        let mut fine_leaves = Vec::new();
        for iy in 0..2 {
            for iz in 0..2 {
                fine_leaves.push(Octant::new(fine_parent_x, iy * half, iz * half, fine_level));
            }
        }
        let t1 = Tree::from_sorted_leaves(
            1,
            {
                let mut v: Vec<_> = fine_leaves.iter().map(|q| (*q, Payload::User(()))).collect();
                v.sort_by(|a, b| a.0.cmp(&b.0));
                v
            },
        );

        let trees = vec![t0, t1];
        let ghosts = GhostLayer::empty();
        let mut fired = Vec::new();
        let mut face = |info: &FaceInfo<()>| {
            fired.push((
                match &info.sides[0] {
                    Side::Full(_) => None,
                    Side::Hanging(ls) => Some(ls.iter().map(|l| l.quadrant).collect::<Vec<_>>()),
                },
                match &info.sides[1] {
                    Side::Full(l) => Some(l.quadrant),
                    Side::Hanging(_) => None,
                },
            ));
        };
        iterate(&trees, &conn, &ghosts, None, Some(&mut face), None, None);
        assert_eq!(fired.len(), 1);
        let (hanging, full) = &fired[0];
        let hanging = hanging.clone().expect("expected a hanging side");
        assert_eq!(full.unwrap().level, coarse_level);
        assert_eq!(hanging.len(), 4);
        let mut sorted_hanging = hanging.clone();
        sorted_hanging.sort();
        assert_eq!(hanging, sorted_hanging, "z-order matches Morton order among the four children");
    }

    #[test]
    fn conformal_face_fires_exactly_once() {
        let conn = Connectivity::periodic_unit_cube();
        let t = tree_with(Octant::root().children().to_vec());
        let trees = vec![t];
        let ghosts = GhostLayer::empty();
        let mut count = 0;
        let mut face = |_info: &FaceInfo<()>| count += 1;
        iterate(&trees, &conn, &ghosts, None, Some(&mut face), None, None);
        // 8 level-1 children fill a 2x2x2 grid. Along each axis, every
        // (transverse-coordinate) pair of opposite children shares both
        // a direct internal face and, via the periodic wrap, a second
        // distinct face at the tree's boundary: 4 transverse positions
        // x 2 interfaces x 3 axes.
        assert_eq!(count, 24);
    }

    #[test]
    fn a_local_leaf_adjacent_to_a_ghost_still_fires() {
        // Iteration only ever anchors on local leaves, so a genuinely
        // all-ghost interaction is never even visited; what the
        // ghost-filter requirement guards against is a local leaf's
        // real neighbor being *wrongly* suppressed for touching a
        // ghost. One local leaf, one ghost across its face, must fire.
        let conn = Connectivity::single_tree();
        let local = Octant::new(0, 0, 0, 1);
        let ghost_neighbor = Octant::new(qlen(1), 0, 0, 1);
        let t = tree_with(vec![local]);
        let trees = vec![t];
        let ghosts = GhostLayer::from_sorted(vec![crate::ghost::GhostLeaf {
            tree: 0,
            quadrant: ghost_neighbor,
            data: Payload::User(()),
            owner_rank: 1,
        }]);
        let mut count = 0;
        let mut face = |_info: &FaceInfo<()>| count += 1;
        iterate(&trees, &conn, &ghosts, None, Some(&mut face), None, None);
        assert_eq!(count, 1, "a local/ghost face interaction must still fire");
    }
}
