//! Read-only forest topology: how the root cells of each tree glue to
//! their neighbors across faces, edges and corners, and the coordinate
//! transforms needed to carry an [`Octant`] from one tree's frame into
//! another's.
//!
//! This is a reduced model of the reference connectivity: it covers the
//! identity, axis-swap/flip and periodic-wrap orientations that brick and
//! single-tree-periodic meshes need. The full sixteen-entry face
//! permutation group used by multi-tree unstructured connectivities lives
//! in a source file the retrieval pack did not carry
//! (`p8est_connectivity.c`); rather than invent those tables outright,
//! `orientation` here is the two-bit code described in
//! [`build_face_transform`], which is exact for the connectivities this
//! crate constructs and tests but does not claim the generality of sixteen
//! possible twists.

use crate::morton::{Coord, Octant, TreeId, ROOT_LEN};

/// A tree-to-tree face transform: how to map a coordinate triple expressed
/// against `my_face`'s tree into the frame of the tree across `my_face`.
#[derive(Clone, Copy, Debug)]
pub struct FaceTransform {
    pub my_axis: [usize; 3],
    pub target_axis: [usize; 3],
    pub edge_reverse: [i32; 3],
}

impl FaceTransform {
    /// The 9-tuple [`Octant::transform_face`] consumes.
    pub fn as_ftransform(&self) -> [i32; 9] {
        [
            self.my_axis[0] as i32,
            self.my_axis[1] as i32,
            self.my_axis[2] as i32,
            self.target_axis[0] as i32,
            self.target_axis[1] as i32,
            self.target_axis[2] as i32,
            self.edge_reverse[0],
            self.edge_reverse[1],
            self.edge_reverse[2],
        ]
    }
}

fn in_plane_axes(skip: usize) -> [usize; 2] {
    let mut v = [0usize; 2];
    let mut j = 0;
    for a in 0..3 {
        if a != skip {
            v[j] = a;
            j += 1;
        }
    }
    v
}

/// Build the coordinate transform for crossing from `my_face` to
/// `n_face`. `orientation` bit 0 swaps the two in-plane axes, bit 1 flips
/// the second. The perpendicular-axis case follows from the two faces'
/// sides: opposite sides (0,1) is a plain abutment; matching sides (0,0)
/// or (1,1) is a periodic fold-back.
pub fn build_face_transform(my_face: u8, n_face: u8, orientation: u8) -> FaceTransform {
    let fa = (my_face / 2) as usize;
    let fb = (n_face / 2) as usize;
    let my_side = my_face & 1;
    let n_side = n_face & 1;

    let src = in_plane_axes(fa);
    let dst = in_plane_axes(fb);
    let (d0, d1) = if orientation & 1 == 0 { (dst[0], dst[1]) } else { (dst[1], dst[0]) };
    let flip1 = ((orientation >> 1) & 1) as i32;

    let edge_reverse = [
        0,
        flip1,
        match (my_side, n_side) {
            (0, 1) => 0,
            (1, 0) => 0,
            (0, 0) => 2,
            (1, 1) => 1,
            _ => unreachable!(),
        },
    ];

    FaceTransform {
        my_axis: [src[0], src[1], fa],
        target_axis: [d0, d1, fb],
        edge_reverse,
    }
}

/// A tree-to-tree edge transform: which axis of the target tree the edge
/// runs along, whether the running coordinate is reversed, and which edge
/// index it lands on there. The transverse placement (`corners` in
/// [`Octant::transform_edge`]) depends on which endpoint of the edge the
/// octant sits at and is supplied by the caller, not stored here.
#[derive(Clone, Copy, Debug)]
pub struct EdgeTransform {
    pub target_tree: TreeId,
    pub naxis: [usize; 3],
    pub nflip: bool,
    pub nedge: u8,
}

fn build_edge_transform(target_tree: TreeId, n_edge: u8, flip: bool) -> EdgeTransform {
    let eb = (n_edge / 4) as usize;
    let rest = in_plane_axes(eb);
    EdgeTransform { target_tree, naxis: [eb, rest[0], rest[1]], nflip: flip, nedge: n_edge }
}

/// Forest topology: a fixed number of trees, each a unit cube, glued
/// along shared faces/edges/corners.
#[derive(Clone, Debug)]
pub struct Connectivity {
    num_trees: i32,
    tree_to_face: Vec<[Option<(TreeId, u8, u8)>; 6]>,
    tree_to_edge: Vec<[Option<usize>; 12]>,
    edges: Vec<Vec<(TreeId, u8, bool)>>,
    tree_to_corner: Vec<[Option<usize>; 8]>,
    corners: Vec<Vec<(TreeId, u8)>>,
}

impl Connectivity {
    pub fn num_trees(&self) -> i32 {
        self.num_trees
    }

    /// A single tree with every face/edge/corner on the outer boundary.
    pub fn single_tree() -> Self {
        Connectivity {
            num_trees: 1,
            tree_to_face: vec![[None; 6]],
            tree_to_edge: vec![[None; 12]],
            edges: Vec::new(),
            tree_to_corner: vec![[None; 8]],
            corners: Vec::new(),
        }
    }

    /// A single tree periodic in all three directions: each face connects
    /// to its own opposite face, each edge to its own opposite edge, each
    /// corner to its own antipodal corner. The standard sanity fixture
    /// for balance/iterate tests that need neighbors without a second
    /// tree's bookkeeping.
    pub fn periodic_unit_cube() -> Self {
        let mut c = Self::single_tree();
        for face in 0..6u8 {
            let opposite = face ^ 1;
            c.tree_to_face[0][face as usize] = Some((0, opposite, 0));
        }
        let mut edges = Vec::new();
        for edge in 0..12u8 {
            let opposite = edge ^ 3;
            if edge < opposite {
                let idx = edges.len();
                edges.push(vec![(0, edge, false), (0, opposite, false)]);
                c.tree_to_edge[0][edge as usize] = Some(idx);
                c.tree_to_edge[0][opposite as usize] = Some(idx);
            }
        }
        c.edges = edges;
        let mut corners = Vec::new();
        for corner in 0..8u8 {
            let opposite = corner ^ 7;
            if corner < opposite {
                let idx = corners.len();
                corners.push(vec![(0, corner), (0, opposite)]);
                c.tree_to_corner[0][corner as usize] = Some(idx);
                c.tree_to_corner[0][opposite as usize] = Some(idx);
            }
        }
        c.corners = corners;
        c
    }

    /// Two trees glued face-to-face along `(my_face, n_face)` with the
    /// given orientation; all other faces/edges/corners stay boundary.
    pub fn two_trees_glued(my_face: u8, n_face: u8, orientation: u8) -> Self {
        let mut c = Connectivity {
            num_trees: 2,
            tree_to_face: vec![[None; 6]; 2],
            tree_to_edge: vec![[None; 12]; 2],
            edges: Vec::new(),
            tree_to_corner: vec![[None; 8]; 2],
            corners: Vec::new(),
        };
        c.tree_to_face[0][my_face as usize] = Some((1, n_face, orientation));
        c.tree_to_face[1][n_face as usize] = Some((0, my_face, orientation));
        c
    }

    pub fn face_neighbor(&self, tree: TreeId, face: u8) -> Option<(TreeId, u8, u8)> {
        self.tree_to_face[tree as usize][face as usize]
    }

    /// If `face` is shared with another tree, the neighbor tree and the
    /// transform carrying this tree's coordinates into its frame.
    pub fn find_face_transform(&self, tree: TreeId, face: u8) -> Option<(TreeId, [i32; 9])> {
        let (ntree, nface, orientation) = self.face_neighbor(tree, face)?;
        let ft = build_face_transform(face, nface, orientation);
        Some((ntree, ft.as_ftransform()))
    }

    /// All trees (other than `tree` itself, unless periodic) sharing
    /// `edge`, with the transform needed to cross into each.
    pub fn find_edge_transform(&self, tree: TreeId, edge: u8) -> Vec<EdgeTransform> {
        let Some(idx) = self.tree_to_edge[tree as usize][edge as usize] else {
            return Vec::new();
        };
        self.edges[idx]
            .iter()
            .filter(|(t, e, _)| !(*t == tree && *e == edge))
            .map(|(t, e, flip)| build_edge_transform(*t, *e, *flip))
            .collect()
    }

    /// All trees (other than `tree` itself, unless periodic) sharing
    /// `corner`, paired with the corner index in that tree's frame.
    pub fn find_corner_transform(&self, tree: TreeId, corner: u8) -> Vec<(TreeId, u8)> {
        let Some(idx) = self.tree_to_corner[tree as usize][corner as usize] else {
            return Vec::new();
        };
        self.corners[idx]
            .iter()
            .filter(|(t, c)| !(*t == tree && *c == corner))
            .cloned()
            .collect()
    }

    /// Whether `face` of `tree` is on the outer boundary of the forest.
    pub fn is_boundary_face(&self, tree: TreeId, face: u8) -> bool {
        self.face_neighbor(tree, face).is_none()
    }

    /// Serialize the connectivity block of the persisted layout
    /// (`SPEC_FULL.md` §6/§10.4): face table, edge cones, corner cones,
    /// all as fixed-width little-endian fields.
    pub fn write_to<W: std::io::Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_all(&self.num_trees.to_le_bytes())?;
        for faces in &self.tree_to_face {
            for f in faces {
                write_face_slot(w, f)?;
            }
        }
        for edges in &self.tree_to_edge {
            for e in edges {
                write_opt_index(w, e)?;
            }
        }
        w.write_all(&(self.edges.len() as i32).to_le_bytes())?;
        for group in &self.edges {
            w.write_all(&(group.len() as i32).to_le_bytes())?;
            for (t, e, flip) in group {
                w.write_all(&t.to_le_bytes())?;
                w.write_all(&[*e, *flip as u8])?;
            }
        }
        for corners in &self.tree_to_corner {
            for c in corners {
                write_opt_index(w, c)?;
            }
        }
        w.write_all(&(self.corners.len() as i32).to_le_bytes())?;
        for group in &self.corners {
            w.write_all(&(group.len() as i32).to_le_bytes())?;
            for (t, c) in group {
                w.write_all(&t.to_le_bytes())?;
                w.write_all(&[*c])?;
            }
        }
        Ok(())
    }

    /// Inverse of [`Connectivity::write_to`].
    pub fn read_from<R: std::io::Read>(r: &mut R) -> std::io::Result<Self> {
        let num_trees = read_i32(r)?;
        let n = num_trees as usize;
        let mut tree_to_face = Vec::with_capacity(n);
        for _ in 0..n {
            let mut faces: [Option<(TreeId, u8, u8)>; 6] = [None; 6];
            for f in faces.iter_mut() {
                *f = read_face_slot(r)?;
            }
            tree_to_face.push(faces);
        }
        let mut tree_to_edge = Vec::with_capacity(n);
        for _ in 0..n {
            let mut edges: [Option<usize>; 12] = [None; 12];
            for e in edges.iter_mut() {
                *e = read_opt_index(r)?;
            }
            tree_to_edge.push(edges);
        }
        let n_edge_groups = read_i32(r)? as usize;
        let mut edges = Vec::with_capacity(n_edge_groups);
        for _ in 0..n_edge_groups {
            let len = read_i32(r)? as usize;
            let mut group = Vec::with_capacity(len);
            for _ in 0..len {
                let t = read_i32(r)?;
                let mut buf = [0u8; 2];
                r.read_exact(&mut buf)?;
                group.push((t, buf[0], buf[1] != 0));
            }
            edges.push(group);
        }
        let mut tree_to_corner = Vec::with_capacity(n);
        for _ in 0..n {
            let mut corners: [Option<usize>; 8] = [None; 8];
            for c in corners.iter_mut() {
                *c = read_opt_index(r)?;
            }
            tree_to_corner.push(corners);
        }
        let n_corner_groups = read_i32(r)? as usize;
        let mut corners = Vec::with_capacity(n_corner_groups);
        for _ in 0..n_corner_groups {
            let len = read_i32(r)? as usize;
            let mut group = Vec::with_capacity(len);
            for _ in 0..len {
                let t = read_i32(r)?;
                let mut buf = [0u8; 1];
                r.read_exact(&mut buf)?;
                group.push((t, buf[0]));
            }
            corners.push(group);
        }
        Ok(Connectivity { num_trees, tree_to_face, tree_to_edge, edges, tree_to_corner, corners })
    }
}

fn write_face_slot<W: std::io::Write>(w: &mut W, f: &Option<(TreeId, u8, u8)>) -> std::io::Result<()> {
    match f {
        None => w.write_all(&[0])?,
        Some((t, face, orientation)) => {
            w.write_all(&[1])?;
            w.write_all(&t.to_le_bytes())?;
            w.write_all(&[*face, *orientation])?;
        }
    }
    Ok(())
}

fn read_face_slot<R: std::io::Read>(r: &mut R) -> std::io::Result<Option<(TreeId, u8, u8)>> {
    let mut tag = [0u8; 1];
    r.read_exact(&mut tag)?;
    if tag[0] == 0 {
        return Ok(None);
    }
    let t = read_i32(r)?;
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(Some((t, buf[0], buf[1])))
}

fn write_opt_index<W: std::io::Write>(w: &mut W, v: &Option<usize>) -> std::io::Result<()> {
    match v {
        None => w.write_all(&(-1i32).to_le_bytes()),
        Some(i) => w.write_all(&(*i as i32).to_le_bytes()),
    }
}

fn read_opt_index<R: std::io::Read>(r: &mut R) -> std::io::Result<Option<usize>> {
    let v = read_i32(r)?;
    Ok(if v < 0 { None } else { Some(v as usize) })
}

fn read_i32<R: std::io::Read>(r: &mut R) -> std::io::Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

/// Carry `q` (belonging to `tree`) across `face` into the neighboring
/// tree's frame, if one exists. `q` is assumed already translated to
/// `face_neighbor`'s extended position (see [`Octant::face_neighbor`]).
pub fn resolve_face_neighbor(
    conn: &Connectivity,
    tree: TreeId,
    face: u8,
    q: &Octant,
) -> Option<(TreeId, Octant)> {
    let (ntree, ftransform) = conn.find_face_transform(tree, face)?;
    Some((ntree, q.transform_face(&ftransform)))
}

/// Carry an extended (possibly off-root) octant `r` across whichever
/// single face it exited into the neighboring tree's frame. Used by the
/// insulation-layer walk, which builds `r` directly from an offset
/// rather than via [`Octant::face_neighbor`].
pub fn resolve_face_neighbor_extended(
    conn: &Connectivity,
    tree: TreeId,
    r: &Octant,
) -> Option<(TreeId, Octant)> {
    let face = if r.x < 0 {
        0
    } else if r.x >= ROOT_LEN {
        1
    } else if r.y < 0 {
        2
    } else if r.y >= ROOT_LEN {
        3
    } else if r.z < 0 {
        4
    } else {
        5
    };
    let (ntree, ftransform) = conn.find_face_transform(tree, face)?;
    Some((ntree, r.transform_face(&ftransform)))
}

/// Carry an extended octant `r` that exited the root through exactly two
/// axes across every tree glued along that edge.
pub fn resolve_edge_neighbor(conn: &Connectivity, tree: TreeId, r: &Octant) -> Vec<(TreeId, Octant)> {
    let Some(edge) = r.outside_edge_index() else {
        return Vec::new();
    };
    conn.find_edge_transform(tree, edge)
        .into_iter()
        .map(|et| {
            let corners = et.nedge & 0b11;
            let q = r.transform_edge(edge, et.naxis, et.nflip, corners, et.nedge, false);
            (et.target_tree, q)
        })
        .collect()
}

/// Carry an extended octant `r` that exited the root through all three
/// axes across every tree glued at that corner.
pub fn resolve_corner_neighbor(conn: &Connectivity, tree: TreeId, r: &Octant) -> Vec<(TreeId, Octant)> {
    let Some(corner) = r.outside_corner_index() else {
        return Vec::new();
    };
    conn.find_corner_transform(tree, corner)
        .into_iter()
        .map(|(ntree, ncorner)| (ntree, r.transform_corner(ncorner)))
        .collect()
}

/// The finest-grained extended octant location: clamp a coordinate that
/// has run off the root into the `[0, ROOT_LEN)` range of its own tree,
/// used when a face neighbor computation stays within the same tree
/// (periodic wrap represented by a self-referential connectivity entry).
pub fn wrap_into_root(mut v: Coord) -> Coord {
    if v < 0 {
        v += ROOT_LEN;
    } else if v >= ROOT_LEN {
        v -= ROOT_LEN;
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morton::qlen;

    #[test]
    fn single_tree_has_no_neighbors_anywhere() {
        let c = Connectivity::single_tree();
        for f in 0..6 {
            assert!(c.is_boundary_face(0, f));
        }
        for e in 0..12 {
            assert!(c.find_edge_transform(0, e).is_empty());
        }
        for k in 0..8 {
            assert!(c.find_corner_transform(0, k).is_empty());
        }
    }

    #[test]
    fn periodic_cube_wraps_every_face() {
        let c = Connectivity::periodic_unit_cube();
        for f in 0..6u8 {
            let (nt, _) = c.find_face_transform(0, f).unwrap();
            assert_eq!(nt, 0);
        }
    }

    #[test]
    fn two_glued_trees_transform_face_coordinates() {
        let level = 5;
        let c = Connectivity::two_trees_glued(1, 0, 0);
        let q = crate::morton::Octant::new(ROOT_LEN - qlen(level), 3 * qlen(level), 0, level);
        let neighbor = q.face_neighbor(1);
        let (ntree, transformed) = resolve_face_neighbor(&c, 0, 1, &neighbor).unwrap();
        assert_eq!(ntree, 1);
        assert_eq!(transformed.x, 0);
        assert_eq!(transformed.y, q.y);
    }

    #[test]
    fn periodic_cube_edges_pair_opposite_indices() {
        let c = Connectivity::periodic_unit_cube();
        for e in 0..12u8 {
            let transforms = c.find_edge_transform(0, e);
            assert_eq!(transforms.len(), 1);
            assert_eq!(transforms[0].nedge, e ^ 3);
        }
    }

    #[test]
    fn connectivity_round_trips_through_the_binary_codec() {
        let c = Connectivity::periodic_unit_cube();
        let mut buf = Vec::new();
        c.write_to(&mut buf).unwrap();
        let back = Connectivity::read_from(&mut &buf[..]).unwrap();
        assert_eq!(back.num_trees(), c.num_trees());
        for f in 0..6u8 {
            assert_eq!(back.find_face_transform(0, f).map(|(t, _)| t), c.find_face_transform(0, f).map(|(t, _)| t));
        }
        for e in 0..12u8 {
            let a = c.find_edge_transform(0, e);
            let b = back.find_edge_transform(0, e);
            assert_eq!(a.len(), b.len());
        }
    }

    #[test]
    fn two_trees_glued_round_trips() {
        let c = Connectivity::two_trees_glued(1, 0, 2);
        let mut buf = Vec::new();
        c.write_to(&mut buf).unwrap();
        let back = Connectivity::read_from(&mut &buf[..]).unwrap();
        assert_eq!(back.face_neighbor(0, 1), c.face_neighbor(0, 1));
        assert_eq!(back.face_neighbor(1, 0), c.face_neighbor(1, 0));
    }
}
