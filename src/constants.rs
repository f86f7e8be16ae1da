//! Build-time bounds of the hash families and indexes.

/// Upper bound on point dimensionality.
pub const MAX_DIM: usize = 1_000;

/// Window range of the L2 hash family.
pub const MIN_W: f64 = 1e-4;
pub const MAX_W: f64 = 10_000.0;

/// Amplification range. Also bounds the hypercube to 2^20 vertices.
pub const MIN_K: usize = 1;
pub const MAX_K: usize = 20;

/// Range of the number of LSH hash tables.
pub const MIN_L: usize = 1;
pub const MAX_L: usize = 20;

/// Bucket-density coefficient: table size is `max(1, c * n)`.
/// The lower bound is exclusive.
pub const MIN_C: f64 = 0.0;
pub const MAX_C: f64 = 1.0;

/// Range of the hypercube inspection cap `m`.
pub const MIN_M: usize = 1;
pub const MAX_M: usize = 10_000_000;

/// Lower bound on the hypercube probing sequence. The upper bound is 2^k.
pub const MIN_PROBES: usize = 1;

/// Dataset size limits for `fit`.
pub const MIN_POINTS: usize = 1;
pub const MAX_POINTS: usize = 10_000_000;

/// Radius range for radius queries.
pub const MIN_RADIUS: f64 = 0.0;
pub const MAX_RADIUS: f64 = 1e9;

/// Large prime for the level-2 fingerprint: 2^32 - 5.
pub const FINGERPRINT_PRIME: i64 = 4_294_967_291;

/// Exclusive upper bound of the amplification coefficients: 2^29.
pub const COEFF_BOUND: i64 = 1 << 29;

/// Rejection sampling gives up after this many draws per requested hash.
pub const MAX_SAMPLE_FACTOR: usize = 10;

/// Full distance computations allowed per LSH query, per hash table.
pub const LSH_INSPECTIONS_PER_TABLE: usize = 4;
