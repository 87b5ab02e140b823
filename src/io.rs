//! The persisted forest file (`SPEC_FULL.md` §6/§10.4): a header
//! identifying the format and build parameters, the connectivity block
//! ([`Connectivity::write_to`]/[`Connectivity::read_from`]), the global
//! partition table, and each tree's leaves in rank order with optional
//! user payloads. Little-endian fixed-width fields throughout, no
//! external serialization crate — this is the one boundary in the
//! crate that returns [`ForestIoError`] instead of asserting.

use std::io::{Read, Write};

use crate::connectivity::Connectivity;
use crate::error::ForestIoError;
use crate::forest::PartitionPosition;
use crate::morton::{Octant, TreeId, MAXLEVEL, QMAXLEVEL};
use crate::payload::Payload;
use crate::tree::Tree;

const MAGIC: u64 = 0x6f637466_6f726573; // "octfores" in ASCII, read as one u64
const VERSION: u32 = 1;

/// The owned bag a `load` returns: a forest's trees and partition
/// bookkeeping, detached from the borrowed [`Connectivity`] a
/// [`crate::forest::Forest`] normally holds a reference to. Avoids a
/// self-referential struct — the caller reads the connectivity back out
/// of the same file (or already has one matching it) and constructs the
/// actual `Forest` by borrowing it, via [`crate::forest::Forest::from_loaded`].
pub struct LoadedForest<U> {
    pub rank: i32,
    pub size: i32,
    pub trees: Vec<Tree<U>>,
    pub global_first_quadrant: Vec<i64>,
    pub global_first_position: Vec<PartitionPosition>,
}

fn write_octant<W: Write>(w: &mut W, q: &Octant) -> std::io::Result<()> {
    w.write_all(&q.x.to_le_bytes())?;
    w.write_all(&q.y.to_le_bytes())?;
    w.write_all(&q.z.to_le_bytes())?;
    w.write_all(&[q.level])?;
    Ok(())
}

fn read_octant<R: Read>(r: &mut R) -> std::io::Result<Octant> {
    let mut coord = [0u8; 4];
    r.read_exact(&mut coord)?;
    let x = i32::from_le_bytes(coord);
    r.read_exact(&mut coord)?;
    let y = i32::from_le_bytes(coord);
    r.read_exact(&mut coord)?;
    let z = i32::from_le_bytes(coord);
    let mut level = [0u8; 1];
    r.read_exact(&mut level)?;
    Ok(Octant::new(x, y, z, level[0]))
}

fn write_partition_position<W: Write>(w: &mut W, p: &PartitionPosition) -> std::io::Result<()> {
    w.write_all(&p.which_tree.to_le_bytes())?;
    write_octant(w, &p.quadrant)
}

fn read_partition_position<R: Read>(r: &mut R) -> std::io::Result<PartitionPosition> {
    let mut tid_buf = [0u8; 4];
    r.read_exact(&mut tid_buf)?;
    let which_tree = i32::from_le_bytes(tid_buf);
    let quadrant = read_octant(r)?;
    Ok(PartitionPosition { which_tree, quadrant })
}

/// Write every local leaf of `trees` (this rank's share), its connectivity
/// and the global partition table to `w`. `include_data` gates whether
/// `encode` (which turns a leaf's `Payload::User` data into bytes) is
/// actually consulted; with `include_data = false` every leaf is written
/// with an empty payload regardless of what `encode` would produce,
/// matching the reference `p4est_save(..., save_data=0)` contract and
/// letting [`load`] refuse a mismatched request outright rather than
/// silently handing back empty buffers.
pub fn save<W: Write, U>(
    w: &mut W,
    connectivity: &Connectivity,
    rank: i32,
    size: i32,
    trees: &[Tree<U>],
    global_first_quadrant: &[i64],
    global_first_position: &[PartitionPosition],
    include_data: bool,
    encode: impl Fn(&U) -> Vec<u8>,
) -> Result<(), ForestIoError> {
    w.write_all(&MAGIC.to_le_bytes())?;
    w.write_all(&VERSION.to_le_bytes())?;
    w.write_all(&[MAXLEVEL, QMAXLEVEL])?;
    w.write_all(&[include_data as u8])?;
    w.write_all(&size.to_le_bytes())?;
    w.write_all(&rank.to_le_bytes())?;

    connectivity.write_to(w)?;

    w.write_all(&(global_first_quadrant.len() as i32).to_le_bytes())?;
    for &count in global_first_quadrant {
        w.write_all(&count.to_le_bytes())?;
    }

    w.write_all(&(global_first_position.len() as i32).to_le_bytes())?;
    for p in global_first_position {
        write_partition_position(w, p)?;
    }

    w.write_all(&(connectivity.num_trees()).to_le_bytes())?;
    if connectivity.num_trees() as usize != trees.len() {
        return Err(ForestIoError::TreeCountMismatch {
            header: connectivity.num_trees(),
            body: trees.len() as i32,
        });
    }
    for t in trees {
        w.write_all(&t.tree_id.to_le_bytes())?;
        w.write_all(&(t.len() as i64).to_le_bytes())?;
        for (q, payload) in t.leaves() {
            write_octant(w, q)?;
            match payload {
                Payload::User(u) if include_data => {
                    let bytes = encode(u);
                    w.write_all(&[1])?;
                    w.write_all(&(bytes.len() as u32).to_le_bytes())?;
                    w.write_all(&bytes)?;
                }
                _ => {
                    w.write_all(&[0])?;
                    w.write_all(&0u32.to_le_bytes())?;
                }
            }
        }
    }
    Ok(())
}

/// Read back what [`save`] wrote. `load_data` is the caller's request
/// for a nonzero payload size (`SPEC_FULL.md` §6's `load(..., payload_size,
/// load_data, ...)`); when it is `true` but the file was written with
/// `include_data = false`, this refuses up front with
/// [`ForestIoError::NoPayloadInFile`] instead of silently handing back
/// empty user data. `decode` turns a leaf's encoded bytes into `U`;
/// leaves written with an empty payload are handed
/// `Payload::WhichTree(tree_id)` instead, matching
/// [`crate::forest::Forest::copy`]'s treatment of data-less leaves.
pub fn load<R: Read, U>(
    r: &mut R,
    load_data: bool,
    decode: impl Fn(TreeId, &[u8]) -> U,
) -> Result<(Connectivity, LoadedForest<U>), ForestIoError> {
    let mut magic_buf = [0u8; 8];
    r.read_exact(&mut magic_buf)?;
    let magic = u64::from_le_bytes(magic_buf);
    if magic != MAGIC {
        tracing::warn!(expected = MAGIC, found = magic, "rejecting file with bad magic");
        return Err(ForestIoError::BadMagic { expected: MAGIC, found: magic });
    }
    let mut version_buf = [0u8; 4];
    r.read_exact(&mut version_buf)?;
    let version = u32::from_le_bytes(version_buf);
    if version != VERSION {
        return Err(ForestIoError::UnsupportedVersion { found: version, supported: VERSION });
    }
    let mut levels = [0u8; 2];
    r.read_exact(&mut levels)?;
    if levels[0] != MAXLEVEL {
        tracing::warn!(file_maxlevel = levels[0], build_maxlevel = MAXLEVEL, "rejecting file built for a different MAXLEVEL");
        return Err(ForestIoError::MaxlevelMismatch { file_maxlevel: levels[0], build_maxlevel: MAXLEVEL });
    }
    let mut has_data_buf = [0u8; 1];
    r.read_exact(&mut has_data_buf)?;
    let file_has_data = has_data_buf[0] != 0;
    if load_data && !file_has_data {
        tracing::warn!("caller requested payload data but file was saved without it");
        return Err(ForestIoError::NoPayloadInFile);
    }

    let mut i32_buf = [0u8; 4];
    r.read_exact(&mut i32_buf)?;
    let size = i32::from_le_bytes(i32_buf);
    r.read_exact(&mut i32_buf)?;
    let rank = i32::from_le_bytes(i32_buf);

    let connectivity = Connectivity::read_from(r)?;

    r.read_exact(&mut i32_buf)?;
    let n_offsets = i32::from_le_bytes(i32_buf) as usize;
    let mut global_first_quadrant = Vec::with_capacity(n_offsets);
    for _ in 0..n_offsets {
        let mut buf8 = [0u8; 8];
        r.read_exact(&mut buf8)?;
        global_first_quadrant.push(i64::from_le_bytes(buf8));
    }

    r.read_exact(&mut i32_buf)?;
    let n_positions = i32::from_le_bytes(i32_buf) as usize;
    let mut global_first_position = Vec::with_capacity(n_positions);
    for _ in 0..n_positions {
        global_first_position.push(read_partition_position(r)?);
    }

    r.read_exact(&mut i32_buf)?;
    let num_trees = i32::from_le_bytes(i32_buf);
    if num_trees != connectivity.num_trees() {
        return Err(ForestIoError::TreeCountMismatch { header: num_trees, body: connectivity.num_trees() });
    }

    let mut trees = Vec::with_capacity(num_trees as usize);
    for _ in 0..num_trees {
        r.read_exact(&mut i32_buf)?;
        let tree_id = i32::from_le_bytes(i32_buf);
        let mut len_buf = [0u8; 8];
        r.read_exact(&mut len_buf)?;
        let len = i64::from_le_bytes(len_buf) as usize;
        let mut leaves = Vec::with_capacity(len);
        for _ in 0..len {
            let q = read_octant(r)?;
            let mut tag = [0u8; 1];
            r.read_exact(&mut tag)?;
            let mut size_buf = [0u8; 4];
            r.read_exact(&mut size_buf)?;
            let payload_len = u32::from_le_bytes(size_buf) as usize;
            let mut bytes = vec![0u8; payload_len];
            r.read_exact(&mut bytes)?;
            let payload = if tag[0] == 1 { Payload::User(decode(tree_id, &bytes)) } else { Payload::WhichTree(tree_id) };
            leaves.push((q, payload));
        }
        trees.push(Tree::from_sorted_leaves(tree_id, leaves));
    }

    Ok((connectivity, LoadedForest { rank, size, trees, global_first_quadrant, global_first_position }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pl(_t: TreeId, _q: &Octant) -> Payload<u32> {
        Payload::User(7)
    }

    #[test]
    fn single_rank_forest_round_trips_with_payload() {
        let conn = Connectivity::periodic_unit_cube();
        let mut forest = crate::forest::Forest::new_single(&conn, pl);
        forest.refine_level(true, |_, _| true, pl, 2);

        let mut buf = Vec::new();
        save(
            &mut buf,
            &conn,
            forest.rank,
            forest.size,
            forest.trees(),
            &forest.global_first_quadrant,
            &forest.global_first_position,
            true,
            |u: &u32| u.to_le_bytes().to_vec(),
        )
        .unwrap();

        let (loaded_conn, loaded) = load(&mut &buf[..], true, |_tid, bytes| {
            u32::from_le_bytes(bytes.try_into().unwrap())
        })
        .unwrap();

        assert_eq!(loaded_conn.num_trees(), conn.num_trees());
        assert_eq!(loaded.trees.len(), forest.trees().len());
        assert_eq!(loaded.trees[0].len(), forest.trees()[0].len());
        for (q, p) in loaded.trees[0].leaves() {
            assert!(forest.trees()[0].leaves().iter().any(|(oq, _)| oq == q));
            assert!(matches!(p, Payload::User(7)));
        }
    }

    #[test]
    fn bad_magic_is_rejected() {
        let buf = vec![0u8; 64];
        let err = load::<_, ()>(&mut &buf[..], false, |_, _| ()).unwrap_err();
        assert!(matches!(err, ForestIoError::BadMagic { .. }));
    }

    #[test]
    fn truncated_file_surfaces_an_io_error() {
        let conn = Connectivity::periodic_unit_cube();
        let forest = crate::forest::Forest::new_single(&conn, pl);
        let mut buf = Vec::new();
        save(
            &mut buf,
            &conn,
            forest.rank,
            forest.size,
            forest.trees(),
            &forest.global_first_quadrant,
            &forest.global_first_position,
            true,
            |u: &u32| u.to_le_bytes().to_vec(),
        )
        .unwrap();
        buf.truncate(buf.len() / 2);
        let err = load(&mut &buf[..], true, |_tid, bytes: &[u8]| u32::from_le_bytes(bytes.try_into().unwrap())).unwrap_err();
        assert!(matches!(err, ForestIoError::Io(_)));
    }

    #[test]
    fn requesting_payload_data_from_a_no_data_file_is_refused() {
        let conn = Connectivity::periodic_unit_cube();
        let forest = crate::forest::Forest::new_single(&conn, pl);
        let mut buf = Vec::new();
        save(
            &mut buf,
            &conn,
            forest.rank,
            forest.size,
            forest.trees(),
            &forest.global_first_quadrant,
            &forest.global_first_position,
            false,
            |u: &u32| u.to_le_bytes().to_vec(),
        )
        .unwrap();
        let err = load(&mut &buf[..], true, |_tid, bytes: &[u8]| {
            u32::from_le_bytes(bytes.try_into().unwrap())
        })
        .unwrap_err();
        assert!(matches!(err, ForestIoError::NoPayloadInFile));

        // Requesting without data still works against the same file.
        let (_, loaded) = load(&mut &buf[..], false, |_tid, bytes: &[u8]| {
            u32::from_le_bytes(bytes.try_into().unwrap())
        })
        .unwrap();
        assert!(matches!(loaded.trees[0].leaves()[0].1, Payload::WhichTree(_)));
    }
}
