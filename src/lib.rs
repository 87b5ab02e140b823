//! Distributed Octrees in Rust
//!
//! A forest of octrees, parallelized using Rust and MPI, for adaptive
//! mesh refinement in scientific computing: octant algebra and Morton
//! ordering, coarse-topology connectivity between trees, per-tree
//! sorted leaf storage, 2:1 balance enforcement, an ordered
//! volume/face/edge/corner iterator engine, and the distributed
//! sample-sort/blocktree pipeline that keeps a forest load-balanced
//! across ranks.

/// Functionality to perform operations on Morton keys.
pub mod morton;

/// Coarse topology between trees: face/edge/corner neighbors and the
/// coordinate transforms needed to cross between them.
pub mod connectivity;

/// A single tree's sorted leaf octants and the refine/coarsen primitives
/// that operate on them.
pub mod tree;

/// The forest: the driver surface aggregating trees over a connectivity.
pub mod forest;

/// 2:1 balance enforcement across face, edge and corner neighbors.
pub mod balance;

/// The non-local ghost layer the iterator engine consults at tree
/// boundaries.
pub mod ghost;

/// The ordered volume/face/edge/corner iterator engine.
pub mod iterator;

/// Tagged per-leaf payload values (`SPEC_FULL.md` §9's `Payload` note).
pub mod payload;

/// Parallel sample sort used to globally order leaves before
/// partitioning.
pub mod sort;

/// Distributed blocktree construction and weighted repartitioning.
pub mod partition;

/// The binary save/load codec, the one boundary that returns `Result`.
pub mod io;

/// The error type `io::save`/`io::load` return.
pub mod error;

/// A millisecond-resolution timer for benchmarking driver phases.
pub mod time;
