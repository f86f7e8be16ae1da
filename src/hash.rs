//! Randomized hash families: atomic projections and their amplified
//! composites. All random state is fixed at construction.
use crate::constants::{
    COEFF_BOUND, FINGERPRINT_PRIME, MAX_DIM, MAX_K, MAX_SAMPLE_FACTOR, MAX_W, MIN_K, MIN_W,
};
use crate::error::{Error, Result};
use crate::point::Point;
use crate::utils::{checked_add, checked_add_f64, checked_mul, floor_div, positive_mod};
use fnv::FnvHashMap;
use ndarray::prelude::*;
use ndarray_rand::rand_distr::{StandardNormal, Uniform};
use ndarray_rand::RandomExt;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

/// An amplified hash: routes a point to a bucket and produces the
/// fingerprint stored next to it. For families without a second hash
/// level the fingerprint falls back to the bucket key.
pub trait VecHash {
    fn bucket(&self, p: &Point) -> Result<usize>;

    fn fingerprint(&self, p: &Point) -> Result<i64> {
        Ok(self.bucket(p)? as i64)
    }

    /// Bucket and fingerprint in one go. Overridden where the two share
    /// the expensive part of the computation.
    fn locate(&self, p: &Point) -> Result<(usize, i64)> {
        Ok((self.bucket(p)?, self.fingerprint(p)?))
    }
}

/// One hash of the L2 family: `h(p) = floor((p . v + t) / w)` with `v`
/// standard normal and `t` uniform on `[0, w)`.
///
/// See paragraph 3.2 of
/// <https://www.cs.princeton.edu/courses/archive/spring05/cos598E/bib/p253-datar.pdf>
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct L2Projection {
    v: Array1<f64>,
    t: f64,
    w: f64,
}

impl L2Projection {
    pub fn new(dim: usize, w: f64, rng: &mut SmallRng) -> Result<Self> {
        if dim < 1 || dim > MAX_DIM {
            return Err(Error::InvalidParameters(format!(
                "projection dimension {} out of range",
                dim
            )));
        }
        if !w.is_finite() || w < MIN_W || w > MAX_W {
            return Err(Error::InvalidParameters(format!(
                "window {} out of range",
                w
            )));
        }
        let v: Array1<f64> = Array::random_using(dim, StandardNormal, rng);
        let t = rng.sample(Uniform::new(0., w));
        Ok(L2Projection { v, t, w })
    }

    pub fn dim(&self) -> usize {
        self.v.len()
    }

    /// Quantized projection of `p`, a possibly negative integer.
    pub fn hash(&self, p: &Point) -> Result<i64> {
        if p.dim() != self.v.len() {
            return Err(Error::InvalidDim);
        }
        let projected = self.v.dot(&aview1(p.components()));
        let shifted = checked_add_f64(projected, self.t)?;
        floor_div(shifted, self.w)
    }
}

/// Random state only; labels of the owning index are ignored.
impl PartialEq for L2Projection {
    fn eq(&self, other: &Self) -> bool {
        self.v == other.v && self.t == other.t && self.w == other.w
    }
}

/// One hash of the cosine family: the side of a random hyperplane,
/// `h(p) = 1` iff `p . r >= 0`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignProjection {
    r: Array1<f64>,
}

impl SignProjection {
    pub fn new(dim: usize, rng: &mut SmallRng) -> Result<Self> {
        if dim < 1 || dim > MAX_DIM {
            return Err(Error::InvalidParameters(format!(
                "projection dimension {} out of range",
                dim
            )));
        }
        let r: Array1<f64> = Array::random_using(dim, StandardNormal, rng);
        Ok(SignProjection { r })
    }

    pub fn dim(&self) -> usize {
        self.r.len()
    }

    pub fn hash(&self, p: &Point) -> Result<i64> {
        if p.dim() != self.r.len() {
            return Err(Error::InvalidDim);
        }
        let projected = self.r.dot(&aview1(p.components()));
        Ok(if projected >= 0. { 1 } else { 0 })
    }
}

impl PartialEq for SignProjection {
    fn eq(&self, other: &Self) -> bool {
        self.r == other.r
    }
}

/// Rejection-sample `k` pairwise distinct draws. Bails out after
/// `MAX_SAMPLE_FACTOR * k` attempts so a broken source cannot loop.
fn sample_distinct<T, F>(k: usize, mut draw: F) -> Result<Vec<T>>
where
    T: PartialEq,
    F: FnMut() -> Result<T>,
{
    let mut picked: Vec<T> = Vec::with_capacity(k);
    let mut attempts = 0;
    while picked.len() < k {
        if attempts >= MAX_SAMPLE_FACTOR * k {
            return Err(Error::ConstructionFailed);
        }
        attempts += 1;
        let candidate = draw()?;
        if picked.iter().any(|p| *p == candidate) {
            continue;
        }
        picked.push(candidate);
    }
    Ok(picked)
}

fn validate_amplification(k: usize) -> Result<()> {
    if k < MIN_K || k > MAX_K {
        return Err(Error::InvalidParameters(format!(
            "amplification {} out of range",
            k
        )));
    }
    Ok(())
}

/// Amplified L2 hash: `k` distinct projections combined with random
/// coefficients. The fingerprint is `(sum r_i * h_i(p)) mod P` for a
/// large prime `P`; the bucket key is the fingerprint modulo the table
/// size.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct L2Hasher {
    projections: Vec<L2Projection>,
    coefficients: Vec<i64>,
    table_size: usize,
}

impl L2Hasher {
    pub fn sample(
        dim: usize,
        k: usize,
        w: f64,
        table_size: usize,
        rng: &mut SmallRng,
    ) -> Result<Self> {
        validate_amplification(k)?;
        if table_size == 0 {
            return Err(Error::InvalidParameters("empty hash table".to_string()));
        }
        let projections = sample_distinct(k, || L2Projection::new(dim, w, rng))?;
        let coefficients = (0..k).map(|_| rng.gen_range(1, COEFF_BOUND)).collect();
        Ok(L2Hasher {
            projections,
            coefficients,
            table_size,
        })
    }

    pub fn k(&self) -> usize {
        self.projections.len()
    }

    pub fn table_size(&self) -> usize {
        self.table_size
    }

    /// Value of the `index`-th sub hash for `p`.
    pub fn sub_hash(&self, p: &Point, index: usize) -> Result<i64> {
        let projection = self.projections.get(index).ok_or(Error::InvalidIndex)?;
        projection.hash(p)
    }
}

impl VecHash for L2Hasher {
    fn bucket(&self, p: &Point) -> Result<usize> {
        Ok(self.fingerprint(p)? as usize % self.table_size)
    }

    fn fingerprint(&self, p: &Point) -> Result<i64> {
        let mut acc = 0i64;
        for (projection, &coefficient) in self.projections.iter().zip(&self.coefficients) {
            let term = checked_mul(projection.hash(p)?, coefficient)?;
            acc = checked_add(acc, term)?;
        }
        Ok(positive_mod(acc, FINGERPRINT_PRIME))
    }

    fn locate(&self, p: &Point) -> Result<(usize, i64)> {
        let fingerprint = self.fingerprint(p)?;
        Ok((fingerprint as usize % self.table_size, fingerprint))
    }
}

/// Amplified cosine hash: the concatenated sign bits,
/// `g(p) = sum h_i(p) * 2^i`, a key in `[0, 2^k)` used directly as the
/// bucket. No second hash level.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct CosineHasher {
    projections: Vec<SignProjection>,
}

impl CosineHasher {
    pub fn sample(dim: usize, k: usize, rng: &mut SmallRng) -> Result<Self> {
        validate_amplification(k)?;
        let projections = sample_distinct(k, || SignProjection::new(dim, rng))?;
        Ok(CosineHasher { projections })
    }

    pub fn k(&self) -> usize {
        self.projections.len()
    }
}

impl VecHash for CosineHasher {
    fn bucket(&self, p: &Point) -> Result<usize> {
        let mut key = 0usize;
        for (i, projection) in self.projections.iter().enumerate() {
            if projection.hash(p)? == 1 {
                key |= 1 << i;
            }
        }
        Ok(key)
    }
}

fn cube_rng() -> RefCell<SmallRng> {
    RefCell::new(SmallRng::from_entropy())
}

/// Amplified hypercube hash for the L2 family. Every sub hash output is
/// folded to a single bit by `f_i`, a random mapping memoized per key:
/// the bit is drawn the first time a quantized projection value is seen
/// and frozen for the lifetime of the index, across fit and queries.
///
/// The memo is filled during queries as well, hence the interior
/// mutability; index instances are single threaded.
#[derive(Serialize, Deserialize)]
pub struct L2CubeHasher {
    projections: Vec<L2Projection>,
    bit_memo: Vec<RefCell<FnvHashMap<i64, u8>>>,
    #[serde(skip, default = "cube_rng")]
    rng: RefCell<SmallRng>,
}

impl L2CubeHasher {
    pub fn sample(dim: usize, k: usize, w: f64, rng: &mut SmallRng) -> Result<Self> {
        validate_amplification(k)?;
        let projections = sample_distinct(k, || L2Projection::new(dim, w, rng))?;
        let bit_memo = (0..k).map(|_| RefCell::new(FnvHashMap::default())).collect();
        let rng = RefCell::new(SmallRng::seed_from_u64(rng.gen()));
        Ok(L2CubeHasher {
            projections,
            bit_memo,
            rng,
        })
    }

    pub fn k(&self) -> usize {
        self.projections.len()
    }

    fn bit(&self, index: usize, raw: i64) -> u8 {
        let mut memo = self.bit_memo[index].borrow_mut();
        *memo
            .entry(raw)
            .or_insert_with(|| self.rng.borrow_mut().gen_range(0, 2u8))
    }
}

impl VecHash for L2CubeHasher {
    fn bucket(&self, p: &Point) -> Result<usize> {
        let mut key = 0usize;
        for (i, projection) in self.projections.iter().enumerate() {
            if self.bit(i, projection.hash(p)?) == 1 {
                key |= 1 << i;
            }
        }
        Ok(key)
    }
}

/// The bit memo is runtime cache, not identity.
impl PartialEq for L2CubeHasher {
    fn eq(&self, other: &Self) -> bool {
        self.projections == other.projections
    }
}

/// Amplified hash of an LSH index. Equality is defined per family;
/// hashers of different families are simply unequal.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub enum Hasher {
    L2(L2Hasher),
    Cosine(CosineHasher),
}

impl Hasher {
    /// Value of the `index`-th sub hash for `p`. Only the L2 family
    /// exposes its sub hashes.
    pub fn sub_hash(&self, p: &Point, index: usize) -> Result<i64> {
        match self {
            Hasher::L2(hasher) => hasher.sub_hash(p, index),
            Hasher::Cosine(_) => Err(Error::NotImplemented),
        }
    }
}

impl VecHash for Hasher {
    fn bucket(&self, p: &Point) -> Result<usize> {
        match self {
            Hasher::L2(hasher) => hasher.bucket(p),
            Hasher::Cosine(hasher) => hasher.bucket(p),
        }
    }

    fn fingerprint(&self, p: &Point) -> Result<i64> {
        match self {
            Hasher::L2(hasher) => hasher.fingerprint(p),
            Hasher::Cosine(hasher) => hasher.fingerprint(p),
        }
    }

    fn locate(&self, p: &Point) -> Result<(usize, i64)> {
        match self {
            Hasher::L2(hasher) => hasher.locate(p),
            Hasher::Cosine(hasher) => hasher.locate(p),
        }
    }
}

/// Amplified hash of a hypercube index. The cosine family needs no bit
/// memo: sign hashes already are bits.
#[derive(Serialize, Deserialize, PartialEq)]
pub enum CubeHasher {
    L2(L2CubeHasher),
    Cosine(CosineHasher),
}

impl VecHash for CubeHasher {
    fn bucket(&self, p: &Point) -> Result<usize> {
        match self {
            CubeHasher::L2(hasher) => hasher.bucket(p),
            CubeHasher::Cosine(hasher) => hasher.bucket(p),
        }
    }
}
