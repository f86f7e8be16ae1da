use crate::constants::{
    MAX_DIM, MAX_K, MAX_M, MAX_POINTS, MAX_RADIUS, MAX_W, MIN_K, MIN_M, MIN_POINTS, MIN_PROBES,
    MIN_RADIUS, MIN_W,
};
use crate::dist::Distance;
use crate::error::{Error, Result};
use crate::hash::{CosineHasher, CubeHasher, L2CubeHasher, VecHash};
use crate::point::Point;
use crate::table::{nearest_k, occupancy_stats, BucketTable, BucketWalk, Candidate, Entry, VecStore};
use crate::utils::{create_rng, hamming};
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Hypercube index: one table of `2^k` buckets, one vertex per amplified
/// key. A query starts at its own vertex and probes further vertices in
/// nondecreasing Hamming distance, pricing at most `m` candidates.
///
/// The metric is fixed per instance and the hash family follows it: a
/// Euclidean cube folds quantized projections to bits through a memoized
/// random mapping, a cosine cube concatenates hyperplane signs directly.
///
/// # Example
///
/// ```
/// use neighbors_rs::prelude::*;
/// let points = vec![
///     Point::new("a", vec![1., 0.]).unwrap(),
///     Point::new("b", vec![0., 1.]).unwrap(),
/// ];
/// let mut cube = Hypercube::cosine(2, 10, 4).unwrap().seed(1);
/// cube.fit(&points).unwrap();
/// let best = cube.nearest(&points[0]).unwrap().unwrap();
/// assert_eq!(best.0.id(), "a");
/// ```
#[derive(Serialize, Deserialize)]
pub struct Hypercube {
    /// Amplification of the hash; the cube has `2^k` vertices.
    n_projections: usize,
    /// Window of the L2 hash family. Unused by the cosine family.
    window: f64,
    /// Inspection cap per query. `m` in literature.
    inspect_cap: usize,
    /// Length of the probing sequence, the query vertex included.
    probes: usize,
    distance: Distance,
    /// Seed for the hash function. If 0, randomness is seeded from the os.
    seed: u64,
    pub(crate) state: Option<CubeState>,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct CubeState {
    pub(crate) dim: usize,
    pub(crate) hasher: CubeHasher,
    pub(crate) table: BucketTable,
    pub(crate) store: VecStore,
}

fn validate_shape(n_projections: usize, inspect_cap: usize, probes: usize) -> Result<()> {
    if n_projections < MIN_K || n_projections > MAX_K {
        return Err(Error::InvalidParameters(format!(
            "amplification {} out of range",
            n_projections
        )));
    }
    if inspect_cap < MIN_M || inspect_cap > MAX_M {
        return Err(Error::InvalidParameters(format!(
            "inspection cap {} out of range",
            inspect_cap
        )));
    }
    if probes < MIN_PROBES || probes > 1 << n_projections {
        return Err(Error::InvalidParameters(format!(
            "probing sequence {} out of range",
            probes
        )));
    }
    Ok(())
}

impl Hypercube {
    /// A Euclidean hypercube index.
    ///
    /// # Arguments
    ///
    /// * `n_projections` - Sub hashes; the cube has `2^n_projections` vertices.
    /// * `inspect_cap` - Candidates priced per query at most.
    /// * `probes` - Vertices visited per query at most.
    /// * `window` - Quantization window of the L2 hash family.
    pub fn l2(
        n_projections: usize,
        inspect_cap: usize,
        probes: usize,
        window: f64,
    ) -> Result<Hypercube> {
        validate_shape(n_projections, inspect_cap, probes)?;
        if !window.is_finite() || window < MIN_W || window > MAX_W {
            return Err(Error::InvalidParameters(format!(
                "window {} out of range",
                window
            )));
        }
        Ok(Hypercube {
            n_projections,
            window,
            inspect_cap,
            probes,
            distance: Distance::L2,
            seed: 0,
            state: None,
        })
    }

    /// A cosine hypercube index.
    pub fn cosine(n_projections: usize, inspect_cap: usize, probes: usize) -> Result<Hypercube> {
        validate_shape(n_projections, inspect_cap, probes)?;
        Ok(Hypercube {
            n_projections,
            window: 0.,
            inspect_cap,
            probes,
            distance: Distance::Cosine,
            seed: 0,
            state: None,
        })
    }

    /// Set the seed of the hash function. Seed 0 (the default) seeds
    /// from the os.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn distance(&self) -> Distance {
        self.distance
    }

    /// Index the given points. The points are copied into the index;
    /// the input collection can be dropped afterwards.
    pub fn fit(&mut self, points: &[Point]) -> Result<()> {
        if self.state.is_some() {
            return Err(Error::AlreadyFitted);
        }
        let n = points.len();
        if n < MIN_POINTS || n > MAX_POINTS {
            return Err(Error::InvalidPoints);
        }
        let dim = points[0].dim();
        if dim < 1 || dim > MAX_DIM || points.iter().any(|p| p.dim() != dim) {
            return Err(Error::InvalidDim);
        }

        let mut rng = create_rng(self.seed);
        let hasher = match self.distance {
            Distance::L2 => CubeHasher::L2(L2CubeHasher::sample(
                dim,
                self.n_projections,
                self.window,
                &mut rng,
            )?),
            Distance::Cosine => {
                CubeHasher::Cosine(CosineHasher::sample(dim, self.n_projections, &mut rng)?)
            }
        };

        let mut table = BucketTable::new(1 << self.n_projections)?;
        let mut store = VecStore::with_capacity(n)?;
        for p in points {
            store.push(p.clone());
        }
        for (idx, p) in store.map.iter().enumerate() {
            let vertex = hasher.bucket(p)?;
            table.push(
                vertex,
                Entry {
                    idx: idx as u32,
                    fingerprint: vertex as i64,
                },
            )?;
        }

        debug!(
            "hypercube fit: {} vertices, {} points of dim {}",
            1 << self.n_projections,
            n,
            dim
        );
        self.state = Some(CubeState {
            dim,
            hasher,
            table,
            store,
        });
        Ok(())
    }

    /// All inspected points strictly within `radius` of `q`, with their
    /// distances. The probe and inspection caps bound the walk, so the
    /// result can be partial.
    pub fn radius_neighbors(&self, q: &Point, radius: f64) -> Result<Vec<(&Point, f64)>> {
        let state = self.state.as_ref().ok_or(Error::Unfitted)?;
        if !radius.is_finite() || radius < MIN_RADIUS || radius > MAX_RADIUS {
            return Err(Error::InvalidRadius);
        }
        if q.dim() != state.dim {
            return Err(Error::InvalidDim);
        }

        let inspected = state.walk(q, self.distance, self.n_projections, self.probes, self.inspect_cap)?;
        Ok(inspected
            .into_iter()
            .filter(|&(_, d)| d < radius)
            .map(|(idx, d)| (state.store.get(idx), d))
            .collect())
    }

    /// The `k` nearest inspected points, ascending by distance, ties
    /// broken by point id.
    pub fn k_nearest(&self, q: &Point, k: usize) -> Result<Vec<(&Point, f64)>> {
        let state = self.state.as_ref().ok_or(Error::Unfitted)?;
        if k == 0 {
            return Err(Error::InvalidParameters(
                "k_nearest needs k >= 1".to_string(),
            ));
        }
        if q.dim() != state.dim {
            return Err(Error::InvalidDim);
        }

        let inspected = state.walk(q, self.distance, self.n_projections, self.probes, self.inspect_cap)?;
        let candidates = inspected
            .into_iter()
            .map(|(idx, dist)| Candidate {
                dist,
                id: state.store.get(idx).id().to_string(),
                idx,
            })
            .collect();
        Ok(nearest_k(candidates, k)
            .into_iter()
            .map(|c| (state.store.get(c.idx), c.dist))
            .collect())
    }

    /// The single nearest inspected point, or `None` when the probed
    /// vertices hold no points at all.
    pub fn nearest(&self, q: &Point) -> Result<Option<(&Point, f64)>> {
        Ok(self.k_nearest(q, 1)?.into_iter().next())
    }

    pub fn num_points(&self) -> Result<usize> {
        let state = self.state.as_ref().ok_or(Error::Unfitted)?;
        Ok(state.store.len())
    }

    pub fn dim(&self) -> Result<usize> {
        let state = self.state.as_ref().ok_or(Error::Unfitted)?;
        Ok(state.dim)
    }

    /// Configuration and vertex-occupancy statistics.
    pub fn describe(&self) -> Result<String> {
        let state = self.state.as_ref().ok_or(Error::Unfitted)?;
        let mut out = format!("No. of projections: {}\n", self.n_projections);
        out.push_str(&format!("No. of vertices: {}\n", state.table.table_size()));
        out.push_str(&format!("Inspection cap: {}\n", self.inspect_cap));
        out.push_str(&format!("Probes: {}\n", self.probes));
        out.push_str(&format!("No. of points: {}\n", state.store.len()));
        out.push_str(&occupancy_stats(state.table.bucket_lengths()));
        Ok(out)
    }

    /// Serialize the whole index. Every projection value seen before the
    /// dump keeps its memoized bit after a reload.
    pub fn dump<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let blob = bincode::serialize(self)?;
        let mut f = File::create(path)?;
        f.write_all(&blob)?;
        debug!("hypercube dump: {} bytes", blob.len());
        Ok(())
    }

    /// Deserialize an index written by [dump](struct.Hypercube.html#method.dump).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Hypercube> {
        let mut buf: Vec<u8> = vec![];
        let mut f = File::open(path)?;
        f.read_to_end(&mut buf)?;
        let cube: Hypercube = bincode::deserialize(&buf)?;
        debug!("hypercube load: {} bytes", buf.len());
        Ok(cube)
    }
}

impl CubeState {
    /// Visit the probing sequence and price its entries. At most
    /// `inspect_cap` distances are computed across the whole walk.
    fn walk(
        &self,
        q: &Point,
        distance: Distance,
        n_projections: usize,
        probes: usize,
        inspect_cap: usize,
    ) -> Result<Vec<(u32, f64)>> {
        let origin = self.hasher.bucket(q)?;
        let mut walk = BucketWalk::new(&self.store, distance, inspect_cap);
        for &vertex in probe_order(origin, n_projections).iter().take(probes) {
            if walk.scan(self.table.bucket(vertex)?, vertex as i64, q)? {
                break;
            }
        }
        Ok(walk.finish())
    }
}

/// The probing sequence of a query hashed to `origin`: every vertex of
/// the cube in nondecreasing Hamming distance from `origin`, ties broken
/// by vertex value so the walk is deterministic. `origin` itself comes
/// first.
pub(crate) fn probe_order(origin: usize, n_projections: usize) -> Vec<usize> {
    let n_vertices = 1usize << n_projections;
    let mut order = Vec::with_capacity(n_vertices);
    order.push(origin);
    order.extend(
        (0..n_vertices)
            .filter(|&vertex| vertex != origin)
            .sorted_by_key(|&vertex| (hamming(origin, vertex), vertex)),
    );
    order
}
