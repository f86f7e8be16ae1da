//! # neighbors-rs
//!
//! Approximate nearest and radius neighbors in high-dimensional spaces,
//! with sub-linear expected query time traded against recall.
//!
//! Two index families share one randomized-projection substrate and one
//! bucket-walking retrieval discipline:
//!
//! * [Lsh](struct.Lsh.html) - `L` independent hash tables under amplified
//!   locality-sensitive hashes, with a per-entry fingerprint that gates
//!   the exact distance computation.
//! * [Hypercube](struct.Hypercube.html) - a single `2^k` table whose
//!   vertices are probed in nondecreasing Hamming distance from the
//!   query's vertex.
//!
//! Both support the Euclidean and the cosine metric; the hash family
//! follows the metric. Candidates are always ranked by exact distance.
extern crate ndarray;

mod constants;
pub mod cube;
pub mod dist;
mod error;
mod hash;
mod point;
pub mod lsh;
pub mod prelude;
pub mod stats;
mod table;
pub mod utils;

pub use crate::cube::cube::Hypercube;
pub use crate::dist::Distance;
pub use crate::error::{Error, Result};
pub use crate::lsh::lsh::Lsh;
pub use crate::point::Point;
pub use hash::{
    CosineHasher, CubeHasher, Hasher, L2CubeHasher, L2Hasher, L2Projection, SignProjection,
    VecHash,
};
