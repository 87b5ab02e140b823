//! Parallel sample sort over Morton-ordered octants: the oversample,
//! splitter-selection and bucket-exchange pipeline used before seed
//! extraction and blocktree completion.

use mpi::topology::{Rank, SystemCommunicator};
use mpi::traits::*;
use rand::{thread_rng, Rng};

use crate::morton::Octant;

/// Number of samples each rank contributes to splitter selection.
/// `nprocs - 1` splitters are drawn from `K * nprocs` oversampled points,
/// the standard choice that keeps the chance of an empty bucket low
/// without requiring a second sampling round.
const K: usize = 10;

/// Globally sort `local_octants` in Morton order across `world`,
/// returning this rank's sorted share.
pub fn sample_sort(
    local_octants: &[Octant],
    nprocs: u16,
    rank: Rank,
    world: SystemCommunicator,
) -> Vec<Octant> {
    let nleaves = local_octants.len();
    let k = K.min(nleaves.max(1));

    let mut rng = thread_rng();
    let sample_idxs: Vec<usize> = (0..k).map(|_| rng.gen_range(0..nleaves.max(1))).collect();
    let mut local_samples: Vec<Octant> = vec![Octant::default(); k];
    for (i, &idx) in sample_idxs.iter().enumerate() {
        if nleaves > 0 {
            local_samples[i] = local_octants[idx];
        }
    }

    let mut received_samples = vec![Octant::default(); k * (nprocs as usize)];
    world.all_gather_into(&local_samples[..], &mut received_samples[..]);

    received_samples.sort();
    // Drop the first k samples: keeps exactly nprocs-1 splitters once we
    // take every k'th one below.
    let received_samples = &received_samples[k.min(received_samples.len())..];
    let splitters: Vec<Octant> = received_samples.iter().step_by(k.max(1)).cloned().collect();
    let nsplitters = splitters.len();

    let mut buckets: Vec<Vec<Octant>> = vec![Vec::new(); nprocs as usize];
    for leaf in local_octants {
        let mut placed = false;
        for i in 0..nsplitters.min(nprocs as usize) {
            if *leaf < splitters[i] {
                buckets[i].push(*leaf);
                placed = true;
                break;
            }
        }
        if !placed {
            buckets[nprocs as usize - 1].push(*leaf);
        }
    }

    let mut received_leaves: Vec<Octant> = Vec::new();
    for i in 0..(nprocs as i32) {
        if rank != i {
            let msg = &buckets[i as usize];
            world.process_at_rank(i).send(&msg[..]);
        } else {
            for _ in 1..world.size() {
                let (mut msg, _) = world.any_process().receive_vec::<Octant>();
                received_leaves.append(&mut msg);
            }
        }
        world.barrier();
    }

    received_leaves.append(&mut buckets[rank as usize]);
    received_leaves.sort();
    received_leaves
}
