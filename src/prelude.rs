//! Re-export of the public api of neighbors-rs.
pub use crate::{
    cube::cube::Hypercube,
    dist::{cosine_dist, inner_prod, l2_dist, l2_norm, Distance},
    error::{Error, Result},
    hash::{
        CosineHasher, CubeHasher, Hasher, L2CubeHasher, L2Hasher, L2Projection, SignProjection,
        VecHash,
    },
    lsh::lsh::Lsh,
    point::Point,
    stats::{estimate_tables, l2_collision_prob},
};
