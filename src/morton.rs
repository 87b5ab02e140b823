//! Octant algebra: the integer-coordinate cell representation and the pure
//! operators (child/parent/sibling, neighbor construction, cross-tree
//! transforms) that the rest of the crate is built on.
//!
//! Coordinates are always expressed in units of the finest grid (multiples
//! of [`qlen`] at a cell's own level), not relative to the cell's parent —
//! an octant and one of its descendants can share the same `(x, y, z)`.
//! This is what lets Morton order fall out of a single coordinate compare
//! instead of needing a separate bit-interleaving pass.

use std::cmp::Ordering;

use memoffset::offset_of;
use mpi::{
    datatype::{Equivalence, UncommittedUserDatatype, UserDatatype},
    Address,
};

/// A coordinate component. Must carry `MAXLEVEL + 2` bits of signed range
/// to survive the one-ring-of-off-root excursions that cross-tree
/// transforms produce; a 32 bit signed integer has ample headroom.
pub type Coord = i32;

/// An octree depth. `0` is the root.
pub type Level = u8;

/// Index of a coarse root cell into the connectivity's tree table.
pub type TreeId = i32;

/// Finest level at which a *node* (corner point) may lie.
pub const MAXLEVEL: Level = 19;
/// Finest level at which an *octant* (a cell of positive volume) may lie.
pub const QMAXLEVEL: Level = MAXLEVEL - 1;
/// Side length of the root cell, in finest-grid units.
pub const ROOT_LEN: Coord = 1 << MAXLEVEL;
/// Size of the insulation layer (3x3x3 block) used by balance.
pub const INSUL: usize = 27;

/// Side length of a cell at `level`.
#[inline]
pub const fn qlen(level: Level) -> Coord {
    1 << (MAXLEVEL - level)
}

/// Offset of the highest-coordinate cell at `level` within the root.
#[inline]
pub const fn last_offset(level: Level) -> Coord {
    ROOT_LEN - qlen(level)
}

/// Integer-coordinate cell: a cube `(x, y, z)` of side [`qlen`]`(level)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Octant {
    pub x: Coord,
    pub y: Coord,
    pub z: Coord,
    pub level: Level,
}

impl Octant {
    pub const fn new(x: Coord, y: Coord, z: Coord, level: Level) -> Self {
        Octant { x, y, z, level }
    }

    pub const fn root() -> Self {
        Octant::new(0, 0, 0, 0)
    }

    /// Coordinates and level are all within the legal, aligned range.
    pub fn is_valid(&self) -> bool {
        self.level <= QMAXLEVEL
            && self.is_aligned()
            && (0..ROOT_LEN).contains(&self.x)
            && (0..ROOT_LEN).contains(&self.y)
            && (0..ROOT_LEN).contains(&self.z)
    }

    /// One ring of off-root cells is admitted, for cross-tree arithmetic.
    pub fn is_extended(&self) -> bool {
        self.level <= QMAXLEVEL && self.is_aligned() && self.in_extended_bounds()
    }

    fn in_extended_bounds(&self) -> bool {
        let lo = -qlen(self.level);
        let hi = 2 * ROOT_LEN;
        (lo..hi).contains(&self.x) && (lo..hi).contains(&self.y) && (lo..hi).contains(&self.z)
    }

    /// `level == MAXLEVEL`, aligned to the node grid, optionally confined
    /// to `[0, ROOT_LEN]` ("inside-root").
    pub fn is_node(&self, inside_root: bool) -> bool {
        if self.level != MAXLEVEL {
            return false;
        }
        let hi = ROOT_LEN + if inside_root { 0 } else { qlen(MAXLEVEL) };
        let lo = if inside_root { 0 } else { -qlen(MAXLEVEL) };
        (lo..=hi).contains(&self.x) && (lo..=hi).contains(&self.y) && (lo..=hi).contains(&self.z)
    }

    fn is_aligned(&self) -> bool {
        let m = qlen(self.level) - 1;
        self.x & m == 0 && self.y & m == 0 && self.z & m == 0
    }

    /// Whether every coordinate lies in `[0, ROOT_LEN)`.
    pub fn is_inside_root(&self) -> bool {
        (0..ROOT_LEN).contains(&self.x)
            && (0..ROOT_LEN).contains(&self.y)
            && (0..ROOT_LEN).contains(&self.z)
    }

    /// Bit-packed Morton child index in `[0, 8)`, valid for `level > 0`.
    pub fn child_id(&self) -> u8 {
        debug_assert!(self.level > 0);
        let shift = MAXLEVEL - self.level;
        let bit0 = ((self.x >> shift) & 1) as u8;
        let bit1 = ((self.y >> shift) & 1) as u8;
        let bit2 = ((self.z >> shift) & 1) as u8;
        bit0 | (bit1 << 1) | (bit2 << 2)
    }

    /// The eight children, in Morton (z-order) numbering.
    pub fn children(&self) -> [Octant; 8] {
        debug_assert!(self.level < QMAXLEVEL);
        let level = self.level + 1;
        let inc = qlen(level);
        let mut out = [Octant::new(0, 0, 0, level); 8];
        for (i, c) in out.iter_mut().enumerate() {
            c.x = self.x | if i & 1 != 0 { inc } else { 0 };
            c.y = self.y | if i & 2 != 0 { inc } else { 0 };
            c.z = self.z | if i & 4 != 0 { inc } else { 0 };
        }
        out
    }

    /// Parent: clears this level's coordinate bit, decrements the level.
    pub fn parent(&self) -> Octant {
        debug_assert!(self.level > 0);
        self.ancestor_at_level(self.level - 1)
    }

    /// Ancestor at an arbitrary coarser `level`.
    pub fn ancestor_at_level(&self, level: Level) -> Octant {
        debug_assert!(level <= self.level);
        let mask = !(qlen(level) - 1);
        Octant::new(self.x & mask, self.y & mask, self.z & mask, level)
    }

    /// Sibling replacing this octant's child-id bit pattern with `id`.
    pub fn sibling(&self, id: u8) -> Octant {
        debug_assert!(self.level > 0 && id < 8);
        self.parent().children()[id as usize]
    }

    /// Whether `self` is a (strict) ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &Octant) -> bool {
        self.level < other.level && other.ancestor_at_level(self.level) == *self
    }

    // -- faces --------------------------------------------------------

    /// Same-level neighbor across `face` (axis = face/2, side = face&1).
    /// May land outside the root; resolve across trees with the
    /// connectivity's face transform.
    pub fn face_neighbor(&self, face: u8) -> Octant {
        debug_assert!(face < 6);
        let qh = qlen(self.level);
        let mut r = *self;
        let delta = if face & 1 == 0 { -qh } else { qh };
        match face / 2 {
            0 => r.x += delta,
            1 => r.y += delta,
            2 => r.z += delta,
            _ => unreachable!(),
        }
        r
    }

    /// Four child-sized neighbors filling `face` from the neighbor side.
    pub fn half_face_neighbors(&self, face: u8) -> [Octant; 4] {
        debug_assert!(self.level < QMAXLEVEL);
        debug_assert!(face < 6);
        let qh = qlen(self.level);
        let qh2 = qlen(self.level + 1);
        let mut n0 = *self;
        match face {
            0 => n0.x -= qh2,
            1 => n0.x += qh,
            2 => n0.y -= qh2,
            3 => n0.y += qh,
            4 => n0.z -= qh2,
            5 => n0.z += qh,
            _ => unreachable!(),
        }
        n0.level = self.level + 1;
        let mut out = [n0; 4];
        match face / 2 {
            0 => {
                for (i, n) in out.iter_mut().enumerate().skip(1) {
                    n.y = n0.y + (i as Coord & 1) * qh2;
                    n.z = n0.z + ((i as Coord & 2) / 2) * qh2;
                }
            }
            1 => {
                for (i, n) in out.iter_mut().enumerate().skip(1) {
                    n.x = n0.x + (i as Coord & 1) * qh2;
                    n.z = n0.z + ((i as Coord & 2) / 2) * qh2;
                }
            }
            2 => {
                for (i, n) in out.iter_mut().enumerate().skip(1) {
                    n.x = n0.x + (i as Coord & 1) * qh2;
                    n.y = n0.y + ((i as Coord & 2) / 2) * qh2;
                }
            }
            _ => unreachable!(),
        }
        out
    }

    /// All six face-neighbor slots: `[0..4)` half-sized (`None` if `self`
    /// is already at `QMAXLEVEL`), `[4]` same-sized, `[5]` parent-sized
    /// (`None` unless `self`'s position admits a larger neighbor there).
    pub fn all_face_neighbors(&self, face: u8) -> [Option<Octant>; 6] {
        debug_assert!(self.is_valid());
        let mut out: [Option<Octant>; 6] = [None; 6];
        if self.level < QMAXLEVEL {
            let halves = self.half_face_neighbors(face);
            for (o, h) in out[0..4].iter_mut().zip(halves.iter()) {
                *o = Some(*h);
            }
        }
        out[4] = Some(self.face_neighbor(face));
        if self.level > 0 {
            let qcid = self.child_id();
            let larger_exists = ((qcid >> (face / 2)) & 1) as u8 == (face & 1);
            if larger_exists {
                out[5] = Some(self.parent().face_neighbor(face));
            }
        }
        out
    }

    // -- edges ----------------------------------------------------------

    /// Same-level neighbor across `edge` (axis = edge/4, the two sign
    /// bits select the transverse offsets).
    pub fn edge_neighbor(&self, edge: u8) -> Octant {
        debug_assert!(edge < 12);
        let qh = qlen(self.level);
        let mut r = *self;
        let s0 = 2 * (edge as Coord & 1) - 1;
        let s1 = (edge as Coord & 2) - 1;
        match edge / 4 {
            0 => {
                r.y += s0 * qh;
                r.z += s1 * qh;
            }
            1 => {
                r.x += s0 * qh;
                r.z += s1 * qh;
            }
            2 => {
                r.x += s0 * qh;
                r.y += s1 * qh;
            }
            _ => unreachable!(),
        }
        r
    }

    /// `self` is off the root in exactly two coordinate axes.
    pub fn is_outside_edge(&self) -> bool {
        let out_x = self.x < 0 || self.x >= ROOT_LEN;
        let out_y = self.y < 0 || self.y >= ROOT_LEN;
        let out_z = self.z < 0 || self.z >= ROOT_LEN;
        (out_x as u8 + out_y as u8 + out_z as u8) == 2
    }

    /// If [`Octant::is_outside_edge`], the root edge index touched;
    /// `None` otherwise.
    ///
    /// Open question (a) from the design notes: the reference implementation
    /// asserts `level < MAXLEVEL` here, excluding node-level octants from
    /// edge classification. Reproduced verbatim rather than generalized.
    pub fn outside_edge_index(&self) -> Option<u8> {
        debug_assert!(self.level < MAXLEVEL);
        let lo_x = (self.x < 0) as u8;
        let hi_x = (self.x >= ROOT_LEN) as u8;
        let lo_y = (self.y < 0) as u8;
        let hi_y = (self.y >= ROOT_LEN) as u8;
        let lo_z = (self.z < 0) as u8;
        let hi_z = (self.z >= ROOT_LEN) as u8;
        let out_x = lo_x | hi_x;
        let out_y = lo_y | hi_y;
        let out_z = lo_z | hi_z;
        if out_x + out_y + out_z != 2 {
            return None;
        }
        let edge = if out_x == 0 {
            2 * hi_z + hi_y
        } else if out_y == 0 {
            4 + 2 * hi_z + hi_x
        } else {
            8 + 2 * hi_y + hi_x
        };
        debug_assert!(self.touches_edge(edge, false));
        Some(edge)
    }

    /// Whether `self` touches `edge` from inside (`inside=true`, bounds
    /// `[0, ROOT_LEN - QLEN]`) or outside (`inside=false`, bounds
    /// `[-QLEN, ROOT_LEN]`); the `MAXLEVEL` node case uses bounds
    /// `[0, ROOT_LEN]` with the upper bound excluded when `inside`.
    pub fn touches_edge(&self, edge: u8, inside: bool) -> bool {
        debug_assert!(edge < 12);
        let axis = edge / 4;
        let (lower, upper) = if self.level == MAXLEVEL {
            (0, ROOT_LEN - inside as Coord)
        } else if !inside {
            (-qlen(self.level), ROOT_LEN)
        } else {
            (0, last_offset(self.level))
        };
        let hits = |v: Coord, side: u8| if side == 0 { v == lower } else { v == upper };
        let mut incount = 0u8;
        if axis != 0 {
            incount += hits(self.x, edge & 1) as u8;
        }
        if axis != 1 {
            let side = if axis == 0 { edge & 1 } else { (edge / 2) & 1 };
            incount += hits(self.y, side) as u8;
        }
        if axis != 2 {
            incount += hits(self.z, (edge / 2) & 1) as u8;
        }
        incount == 2
    }

    /// Rewrite `self` into the smallest ancestor whose sibling in the
    /// edge direction is outside the root in the pattern `edge` demands,
    /// then clamp the transverse coordinates to `{0, LAST_OFFSET(level)}`.
    pub fn shift_edge(&self, edge: u8) -> Octant {
        debug_assert!(self.is_valid());
        debug_assert!(edge < 12);
        // contact[edge]: outface bit pattern (lo_x,hi_x,lo_y,hi_y,lo_z,hi_z)
        // that terminates the ancestor search for each of the 12 edges.
        const CONTACT: [u8; 12] = [
            0x14, 0x18, 0x24, 0x28, 0x11, 0x12, 0x21, 0x22, 0x05, 0x06, 0x09, 0x0a,
        ];
        let mut quad = *self;
        let mut r;
        let mut step = [0i32; 3];
        loop {
            let th = last_offset(quad.level);
            let cid = quad.child_id();
            let sid;
            match edge / 4 {
                0 => {
                    sid = 2 * edge + (cid & 1);
                    step = [0, 2 * (edge as i32 & 1) - 1, (edge as i32 & 2) - 1];
                }
                1 => {
                    sid = 2 * (edge & 2) + (edge & 1) + (cid & 2);
                    step = [2 * (edge as i32 & 1) - 1, 0, (edge as i32 & 2) - 1];
                }
                2 => {
                    sid = edge - 8 + (cid & 4);
                    step = [2 * (edge as i32 & 1) - 1, (edge as i32 & 2) - 1, 0];
                }
                _ => unreachable!(),
            }
            r = quad.sibling(sid);
            let mut outface = 0u8;
            if step[0] != 0 {
                outface |= if r.x <= 0 { 0x01 } else { 0 };
                outface |= if r.x >= th { 0x02 } else { 0 };
            }
            if step[1] != 0 {
                outface |= if r.y <= 0 { 0x04 } else { 0 };
                outface |= if r.y >= th { 0x08 } else { 0 };
            }
            if step[2] != 0 {
                outface |= if r.z <= 0 { 0x10 } else { 0 };
                outface |= if r.z >= th { 0x20 } else { 0 };
            }
            if outface == CONTACT[edge as usize] || quad.level == 0 {
                break;
            }
            let plevel = quad.level - 1;
            quad = quad.parent();
            quad.x += step[0] * qlen(plevel);
            quad.y += step[1] * qlen(plevel);
            quad.z += step[2] * qlen(plevel);
        }
        if step[0] != 0 {
            if r.x < 0 {
                r.x = 0;
            } else if r.x >= ROOT_LEN {
                r.x = last_offset(r.level);
            }
        }
        if step[1] != 0 {
            if r.y < 0 {
                r.y = 0;
            } else if r.y >= ROOT_LEN {
                r.y = last_offset(r.level);
            }
        }
        if step[2] != 0 {
            if r.z < 0 {
                r.z = 0;
            } else if r.z >= ROOT_LEN {
                r.z = last_offset(r.level);
            }
        }
        r
    }

    // -- corners (supplemented, see SPEC_FULL §4.1/§10.7) ----------------

    /// `self` is off the root in all three coordinate axes at once — the
    /// corner analogue of [`Octant::is_outside_edge`].
    pub fn is_outside_corner(&self) -> bool {
        let out_x = self.x < 0 || self.x >= ROOT_LEN;
        let out_y = self.y < 0 || self.y >= ROOT_LEN;
        let out_z = self.z < 0 || self.z >= ROOT_LEN;
        out_x && out_y && out_z
    }

    /// If [`Octant::is_outside_corner`], the root corner index touched
    /// (bit `i` set when axis `i` exited on its high side); `None`
    /// otherwise.
    pub fn outside_corner_index(&self) -> Option<u8> {
        if !self.is_outside_corner() {
            return None;
        }
        let hi_x = (self.x >= ROOT_LEN) as u8;
        let hi_y = (self.y >= ROOT_LEN) as u8;
        let hi_z = (self.z >= ROOT_LEN) as u8;
        Some(hi_x | (hi_y << 1) | (hi_z << 2))
    }

    /// Same-level neighbor diagonally across `corner` (bit `i` of
    /// `corner` selects the sign of the offset along axis `i`).
    pub fn corner_neighbor(&self, corner: u8) -> Octant {
        debug_assert!(corner < 8);
        let qh = qlen(self.level);
        let sx = 2 * (corner as Coord & 1) - 1;
        let sy = 2 * ((corner as Coord >> 1) & 1) - 1;
        let sz = 2 * ((corner as Coord >> 2) & 1) - 1;
        Octant::new(self.x + sx * qh, self.y + sy * qh, self.z + sz * qh, self.level)
    }

    // -- transforms -------------------------------------------------------

    /// Map `self`'s coordinates into a neighboring tree's frame, given a
    /// 9-tuple `(my_axis[3], target_axis[3], edge_reverse[3])` describing
    /// the axis permutation and optional reversals between the two trees.
    pub fn transform_face(&self, ftransform: &[i32; 9]) -> Octant {
        let my_axis = [ftransform[0] as usize, ftransform[1] as usize, ftransform[2] as usize];
        let target_axis = [ftransform[3] as usize, ftransform[4] as usize, ftransform[5] as usize];
        let edge_reverse = [ftransform[6], ftransform[7], ftransform[8]];

        let mh: Coord = if self.level == MAXLEVEL { 0 } else { -qlen(self.level) };
        let rmh = ROOT_LEN + mh;
        let trmh = ROOT_LEN + rmh;

        let my = [self.x, self.y, self.z];
        let mut target = [0 as Coord; 3];

        target[target_axis[0]] =
            if edge_reverse[0] == 0 { my[my_axis[0]] } else { rmh - my[my_axis[0]] };
        target[target_axis[1]] =
            if edge_reverse[1] == 0 { my[my_axis[1]] } else { rmh - my[my_axis[1]] };
        target[target_axis[2]] = match edge_reverse[2] {
            0 => mh - my[my_axis[2]],
            1 => my[my_axis[2]] + ROOT_LEN,
            2 => my[my_axis[2]] - ROOT_LEN,
            3 => trmh - my[my_axis[2]],
            _ => unreachable!(),
        };

        Octant::new(target[0], target[1], target[2], self.level)
    }

    /// Map `self`'s coordinates across an edge, given the edge this
    /// octant is indexed against (`iedge`) and the target edge's
    /// transform `(naxis[3], nflip, corners, nedge)`. `inside`
    /// distinguishes whether the result should land inside its own root.
    #[allow(clippy::too_many_arguments)]
    pub fn transform_edge(
        &self,
        iedge: u8,
        naxis: [usize; 3],
        nflip: bool,
        corners: u8,
        nedge: u8,
        inside: bool,
    ) -> Octant {
        let iaxis = (iedge / 4) as usize;
        let mh = if self.level == MAXLEVEL { 0 } else { -qlen(self.level) };
        let rmh = ROOT_LEN + mh;
        let (lshift, rshift) = if inside { (0, rmh) } else { (mh, ROOT_LEN) };

        let my_xyz = match iaxis {
            0 => self.x,
            1 => self.y,
            2 => self.z,
            _ => unreachable!(),
        };

        let mut target = [0 as Coord; 3];
        target[naxis[0]] = if !nflip { my_xyz } else { rmh - my_xyz };
        match corners {
            0 => {
                target[naxis[1]] = lshift;
                target[naxis[2]] = lshift;
            }
            1 => {
                target[naxis[1]] = rshift;
                target[naxis[2]] = lshift;
            }
            2 => {
                target[naxis[1]] = lshift;
                target[naxis[2]] = rshift;
            }
            3 => {
                target[naxis[1]] = rshift;
                target[naxis[2]] = rshift;
            }
            _ => unreachable!(),
        }

        let r = Octant::new(target[0], target[1], target[2], self.level);
        debug_assert!(r.touches_edge(nedge, inside));
        r
    }

    /// Map the single defining point of `self` across a corner (no
    /// transverse extent to mirror, unlike faces/edges).
    pub fn transform_corner(&self, target_corner: u8) -> Octant {
        debug_assert!(target_corner < 8);
        let qh = qlen(self.level);
        let x = if target_corner & 1 != 0 { ROOT_LEN - qh } else { 0 };
        let y = if target_corner & 2 != 0 { ROOT_LEN - qh } else { 0 };
        let z = if target_corner & 4 != 0 { ROOT_LEN - qh } else { 0 };
        Octant::new(x, y, z, self.level)
    }
}

// SAFETY: `Octant` is four plain integer fields with no padding-sensitive
// invariants; describing it to MPI as a structured datatype mirrors the
// `Weight` datatype the reference partition code registers the same way.
unsafe impl Equivalence for Octant {
    type Out = UserDatatype;
    fn equivalent_datatype() -> Self::Out {
        UserDatatype::structured(
            &[1, 1, 1, 1],
            &[
                offset_of!(Octant, x) as Address,
                offset_of!(Octant, y) as Address,
                offset_of!(Octant, z) as Address,
                offset_of!(Octant, level) as Address,
            ],
            &[
                UncommittedUserDatatype::contiguous(1, &Coord::equivalent_datatype()).as_ref(),
                UncommittedUserDatatype::contiguous(1, &Coord::equivalent_datatype()).as_ref(),
                UncommittedUserDatatype::contiguous(1, &Coord::equivalent_datatype()).as_ref(),
                UncommittedUserDatatype::contiguous(1, &Level::equivalent_datatype()).as_ref(),
            ],
        )
    }
}

/// Eight octants form a family iff they share a level `> 0` and their
/// coordinates match the child pattern about a common parent, in Morton
/// (z-order) slot order. Order-sensitive.
pub fn is_family(q: &[Octant; 8]) -> bool {
    let level = q[0].level;
    if level == 0 || q.iter().any(|o| o.level != level) {
        return false;
    }
    let inc = qlen(level);
    // The cube pattern below only checks relative offsets; without this,
    // an `inc`-aligned but parent-unaligned `q[0]` would still pass.
    debug_assert!(
        q[0].x % (2 * inc) == 0 && q[0].y % (2 * inc) == 0 && q[0].z % (2 * inc) == 0,
        "is_family's first octant must be aligned to a common parent's grid"
    );
    q[0].x + inc == q[1].x
        && q[0].y == q[1].y
        && q[0].z == q[1].z
        && q[0].x == q[2].x
        && q[0].y + inc == q[2].y
        && q[0].z == q[2].z
        && q[1].x == q[3].x
        && q[2].y == q[3].y
        && q[0].z == q[3].z
        && q[0].x == q[4].x
        && q[0].y == q[4].y
        && q[0].z + inc == q[4].z
        && q[1].x == q[5].x
        && q[1].y == q[5].y
        && q[4].z == q[5].z
        && q[2].x == q[6].x
        && q[2].y == q[6].y
        && q[4].z == q[6].z
        && q[3].x == q[7].x
        && q[3].y == q[7].y
        && q[4].z == q[7].z
}

/// Position of the most significant set bit, or `-1` if zero.
fn msb_pos(v: u32) -> i32 {
    if v == 0 {
        -1
    } else {
        31 - v.leading_zeros() as i32
    }
}

/// Morton order: ancestors precede descendants, siblings are contiguous
/// in child-id order. Ties among axes at the same differing bit are
/// broken `z > y > x`, matching the `bit2 = z` convention used by
/// [`Octant::child_id`].
pub fn cmp_morton(a: &Octant, b: &Octant) -> Ordering {
    let xor_x = (a.x ^ b.x) as u32;
    let xor_y = (a.y ^ b.y) as u32;
    let xor_z = (a.z ^ b.z) as u32;
    if xor_x == 0 && xor_y == 0 && xor_z == 0 {
        return a.level.cmp(&b.level);
    }
    let (mx, my, mz) = (msb_pos(xor_x), msb_pos(xor_y), msb_pos(xor_z));
    let max_msb = mx.max(my).max(mz);
    if mz == max_msb {
        a.z.cmp(&b.z)
    } else if my == max_msb {
        a.y.cmp(&b.y)
    } else {
        a.x.cmp(&b.x)
    }
}

impl PartialOrd for Octant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Octant {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_morton(self, other)
    }
}

/// All strict ancestors of `q`, from the root down to (not including) `q`.
pub fn find_ancestors(q: &Octant) -> Vec<Octant> {
    (0..q.level).map(|l| q.ancestor_at_level(l)).collect()
}

/// The deepest (finest) first descendant of `q`, at [`QMAXLEVEL`].
pub fn deepest_first_descendant(q: &Octant) -> Octant {
    Octant::new(q.x, q.y, q.z, QMAXLEVEL)
}

/// The deepest (finest) last descendant of `q`, at [`QMAXLEVEL`].
pub fn deepest_last_descendant(q: &Octant) -> Octant {
    let inc = qlen(q.level) - qlen(QMAXLEVEL);
    Octant::new(q.x + inc, q.y + inc, q.z + inc, QMAXLEVEL)
}

/// The finest octant that is an ancestor of (or equal to) both `a` and `b`.
pub fn finest_common_ancestor(a: &Octant, b: &Octant) -> Octant {
    let maxlevel = a.level.min(b.level);
    let mut level = maxlevel;
    loop {
        let aa = a.ancestor_at_level(level);
        let bb = b.ancestor_at_level(level);
        if aa == bb {
            return aa;
        }
        if level == 0 {
            return Octant::root();
        }
        level -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_id_matches_bit_packing() {
        let q = Octant::new(qlen(1), qlen(1), 0, 1);
        assert_eq!(q.child_id(), 0b011);
    }

    #[test]
    fn children_form_a_family_in_morton_order() {
        // S2: level-1 octant at the root of a tree of root length L.
        let parent = Octant::new(0, 0, 0, 0);
        let kids = parent.children();
        let half = qlen(1);
        let expected = [
            (0, 0, 0),
            (half, 0, 0),
            (0, half, 0),
            (half, half, 0),
            (0, 0, half),
            (half, 0, half),
            (0, half, half),
            (half, half, half),
        ];
        for (k, (ex, ey, ez)) in kids.iter().zip(expected.iter()) {
            assert_eq!((k.x, k.y, k.z), (*ex, *ey, *ez));
            assert_eq!(k.level, 1);
        }
        assert!(is_family(&kids));

        let mut swapped = kids;
        swapped.swap(0, 1);
        assert!(!is_family(&swapped));
    }

    #[test]
    fn parent_and_child_id_round_trip() {
        let parent = Octant::new(3 * qlen(2), 0, 0, 2);
        assert!(parent.level < QMAXLEVEL);
        for (i, c) in parent.children().iter().enumerate() {
            assert_eq!(c.parent(), parent);
            assert_eq!(c.child_id(), i as u8);
        }
    }

    #[test]
    fn sibling_is_involutive_through_child_id() {
        let q = Octant::new(0, 0, 0, 0).children()[3];
        let cid = q.child_id();
        for i in 0..8u8 {
            assert_eq!(q.sibling(i).sibling(cid), q);
        }
    }

    #[test]
    fn uniform_refinement_to_level_two_has_64_leaves() {
        // S1
        let root = Octant::new(0, 0, 0, 0);
        let mut leaves = vec![root];
        for _ in 0..2 {
            let mut next = Vec::new();
            for l in &leaves {
                next.extend(l.children());
            }
            leaves = next;
        }
        assert_eq!(leaves.len(), 64);
        let mut sorted = leaves.clone();
        sorted.sort();
        assert_eq!(sorted, leaves);
    }

    #[test]
    fn face_transform_example() {
        // S3: ftransform = ([0,1,2],[1,0,2],[0,0,1]), q=(1,2,3,l).
        let ftransform = [0, 1, 2, 1, 0, 2, 0, 0, 1];
        let level = 10;
        let q = Octant::new(1, 2, 3, level);
        let r = q.transform_face(&ftransform);
        assert_eq!(r, Octant::new(2, 1, 3 + ROOT_LEN, level));
    }

    #[test]
    fn edge_shift_lands_on_edge_zero() {
        // S4
        let level = 3;
        let q = Octant::new(0, 0, 0, level);
        assert!(q.touches_edge(0, true));
        let r = q.shift_edge(0);
        let last = last_offset(r.level);
        // edge 0: axis x, both transverse coords (y, z) low.
        assert!(r.y == 0 || r.y == last);
        assert!(r.z == 0 || r.z == last);
    }

    #[test]
    fn finest_common_ancestor_of_root_children_is_root() {
        let root = Octant::root();
        let kids = root.children();
        assert_eq!(finest_common_ancestor(&kids[0], &kids[7]), root);
        assert_eq!(finest_common_ancestor(&kids[2], &kids[2]), kids[2]);
    }

    #[test]
    fn is_ancestor_of_direct_child() {
        let root = Octant::root();
        for c in root.children() {
            assert!(root.is_ancestor_of(&c));
            assert!(!c.is_ancestor_of(&root));
        }
    }
}
