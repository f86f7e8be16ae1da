use crate::constants::{
    LSH_INSPECTIONS_PER_TABLE, MAX_C, MAX_DIM, MAX_K, MAX_L, MAX_POINTS, MAX_RADIUS,
    MAX_SAMPLE_FACTOR, MAX_W, MIN_C, MIN_K, MIN_L, MIN_POINTS, MIN_RADIUS, MIN_W,
};
use crate::dist::Distance;
use crate::error::{Error, Result};
use crate::hash::{CosineHasher, Hasher, L2Hasher, VecHash};
use crate::point::Point;
use crate::table::{nearest_k, occupancy_stats, BucketTable, BucketWalk, Candidate, Entry, VecStore};
use crate::utils::create_rng;
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// LSH index: `L` independent hash tables, each holding the full point
/// set under one amplified hash. Queries walk the query's bucket in
/// every table, gate candidates on the stored fingerprint, and rank the
/// survivors by exact distance.
///
/// The metric is fixed per instance and the hash family follows it.
/// Queries answer identically under either metric; only the hashes and
/// the distance function differ.
///
/// # Example
///
/// ```
/// use neighbors_rs::prelude::*;
/// let points = vec![
///     Point::new("a", vec![1., 0., 0.]).unwrap(),
///     Point::new("b", vec![0., 1., 0.]).unwrap(),
/// ];
/// let mut lsh = Lsh::l2(5, 3, 4.0, 1.0).unwrap().seed(1);
/// lsh.fit(&points).unwrap();
/// let hits = lsh.radius_neighbors(&points[0], 0.5).unwrap();
/// assert!(hits.iter().any(|(p, _)| p.id() == "a"));
/// ```
#[derive(Serialize, Deserialize)]
pub struct Lsh {
    /// Number of hash tables. `L` in literature.
    n_tables: usize,
    /// Amplification of each hash. `k` in literature.
    n_projections: usize,
    /// Window of the L2 hash family. Unused by the cosine family.
    window: f64,
    /// Bucket-density coefficient: table size is `max(1, c * n)`.
    coefficient: f64,
    distance: Distance,
    /// Seed for the hash functions. If 0, randomness is seeded from the os.
    seed: u64,
    pub(crate) state: Option<LshState>,
}

/// Everything `fit` builds. Committed atomically: a mid-fit error drops
/// the partial state and leaves the index unfitted.
#[derive(Serialize, Deserialize)]
pub(crate) struct LshState {
    pub(crate) dim: usize,
    pub(crate) table_size: usize,
    pub(crate) hashers: Vec<Hasher>,
    pub(crate) tables: Vec<BucketTable>,
    pub(crate) store: VecStore,
}

fn validate_shape(n_tables: usize, n_projections: usize, coefficient: f64) -> Result<()> {
    if n_tables < MIN_L || n_tables > MAX_L {
        return Err(Error::InvalidParameters(format!(
            "number of tables {} out of range",
            n_tables
        )));
    }
    if n_projections < MIN_K || n_projections > MAX_K {
        return Err(Error::InvalidParameters(format!(
            "amplification {} out of range",
            n_projections
        )));
    }
    if !coefficient.is_finite() || coefficient <= MIN_C || coefficient > MAX_C {
        return Err(Error::InvalidParameters(format!(
            "coefficient {} out of range",
            coefficient
        )));
    }
    Ok(())
}

impl Lsh {
    /// A Euclidean LSH index.
    ///
    /// # Arguments
    ///
    /// * `n_tables` - Independent hash tables. More tables raise recall at
    /// a performance and space cost.
    /// * `n_projections` - Sub hashes per amplified hash.
    /// * `window` - Quantization window of the L2 hash family.
    /// * `coefficient` - Buckets per table as a fraction of the point count.
    pub fn l2(n_tables: usize, n_projections: usize, window: f64, coefficient: f64) -> Result<Lsh> {
        validate_shape(n_tables, n_projections, coefficient)?;
        if !window.is_finite() || window < MIN_W || window > MAX_W {
            return Err(Error::InvalidParameters(format!(
                "window {} out of range",
                window
            )));
        }
        Ok(Lsh {
            n_tables,
            n_projections,
            window,
            coefficient,
            distance: Distance::L2,
            seed: 0,
            state: None,
        })
    }

    /// A cosine LSH index. The amplified hash concatenates sign bits, so
    /// every table has `2^n_projections` buckets and the coefficient only
    /// bounds configuration, not the table size.
    pub fn cosine(n_tables: usize, n_projections: usize, coefficient: f64) -> Result<Lsh> {
        validate_shape(n_tables, n_projections, coefficient)?;
        Ok(Lsh {
            n_tables,
            n_projections,
            window: 0.,
            coefficient,
            distance: Distance::Cosine,
            seed: 0,
            state: None,
        })
    }

    /// Set the seed of the hash functions. Seed 0 (the default) seeds
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

        let table_size = match self.distance {
            Distance::L2 => cmp::max(1, (self.coefficient * n as f64) as usize),
            Distance::Cosine => 1 << self.n_projections,
        };

        let mut rng = create_rng(self.seed);
        let mut hashers: Vec<Hasher> = Vec::with_capacity(self.n_tables);
        let mut attempts = 0;
        while hashers.len() < self.n_tables {
            if attempts >= MAX_SAMPLE_FACTOR * self.n_tables {
                return Err(Error::ConstructionFailed);
            }
            attempts += 1;
            let candidate = match self.distance {
                Distance::L2 => Hasher::L2(L2Hasher::sample(
                    dim,
                    self.n_projections,
                    self.window,
                    table_size,
                    &mut rng,
                )?),
                Distance::Cosine => {
                    Hasher::Cosine(CosineHasher::sample(dim, self.n_projections, &mut rng)?)
                }
            };
            if hashers.iter().any(|h| *h == candidate) {
                continue;
            }
            hashers.push(candidate);
        }

        let mut tables = Vec::with_capacity(self.n_tables);
        for _ in 0..self.n_tables {
            tables.push(BucketTable::new(table_size)?);
        }
        let mut store = VecStore::with_capacity(n)?;
        for p in points {
            store.push(p.clone());
        }

        for (idx, p) in store.map.iter().enumerate() {
            for (table, hasher) in tables.iter_mut().zip(&hashers) {
                let (bucket, fingerprint) = hasher.locate(p)?;
                table.push(
                    bucket,
                    Entry {
                        idx: idx as u32,
                        fingerprint,
                    },
                )?;
            }
        }

        debug!(
            "lsh fit: {} tables of {} buckets, {} points of dim {}",
            self.n_tables, table_size, n, dim
        );
        self.state = Some(LshState {
            dim,
            table_size,
            hashers,
            tables,
            store,
        });
        Ok(())
    }

    /// All indexed points strictly within `radius` of `q`, with their
    /// distances, deduplicated across tables. The inspection cap bounds
    /// the walk, so a crowded index may return a partial result.
    pub fn radius_neighbors(&self, q: &Point, radius: f64) -> Result<Vec<(&Point, f64)>> {
        let state = self.state.as_ref().ok_or(Error::Unfitted)?;
        if !radius.is_finite() || radius < MIN_RADIUS || radius > MAX_RADIUS {
            return Err(Error::InvalidRadius);
        }
        if q.dim() != state.dim {
            return Err(Error::InvalidDim);
        }

        let inspected = state.walk(q, self.distance, self.inspection_budget())?;
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

        let inspected = state.walk(q, self.distance, self.inspection_budget())?;
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

    /// Radius query for a batch of points in parallel.
    pub fn radius_neighbors_batch_par(
        &self,
        queries: &[Point],
        radius: f64,
    ) -> Result<Vec<Vec<(&Point, f64)>>> {
        queries
            .par_iter()
            .map(|q| self.radius_neighbors(q, radius))
            .collect()
    }

    /// k-NN query for a batch of points in parallel.
    pub fn k_nearest_batch_par(
        &self,
        queries: &[Point],
        k: usize,
    ) -> Result<Vec<Vec<(&Point, f64)>>> {
        queries.par_iter().map(|q| self.k_nearest(q, k)).collect()
    }

    pub fn num_points(&self) -> Result<usize> {
        let state = self.state.as_ref().ok_or(Error::Unfitted)?;
        Ok(state.store.len())
    }

    pub fn dim(&self) -> Result<usize> {
        let state = self.state.as_ref().ok_or(Error::Unfitted)?;
        Ok(state.dim)
    }

    /// Configuration and bucket-occupancy statistics.
    pub fn describe(&self) -> Result<String> {
        let state = self.state.as_ref().ok_or(Error::Unfitted)?;
        let mut out = format!("No. of tables: {}\n", self.n_tables);
        out.push_str(&format!("No. of projections: {}\n", self.n_projections));
        out.push_str(&format!("Table size: {}\n", state.table_size));
        out.push_str(&format!("No. of points: {}\n", state.store.len()));
        out.push_str(&occupancy_stats(
            state.tables.iter().flat_map(|t| t.bucket_lengths()),
        ));
        Ok(out)
    }

    /// Serialize the whole index. A reloaded index reproduces identical
    /// bucket assignments and query answers.
    pub fn dump<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let blob = bincode::serialize(self)?;
        let mut f = File::create(path)?;
        f.write_all(&blob)?;
        debug!("lsh dump: {} bytes", blob.len());
        Ok(())
    }

    /// Deserialize an index written by [dump](struct.Lsh.html#method.dump).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Lsh> {
        let mut buf: Vec<u8> = vec![];
        let mut f = File::open(path)?;
        f.read_to_end(&mut buf)?;
        let lsh: Lsh = bincode::deserialize(&buf)?;
        debug!("lsh load: {} bytes", buf.len());
        Ok(lsh)
    }

    fn inspection_budget(&self) -> usize {
        LSH_INSPECTIONS_PER_TABLE * self.n_tables
    }
}

impl LshState {
    /// Walk the query's bucket in every table in order. Returns the
    /// inspected `(index, distance)` pairs; at most `budget` distances
    /// are computed, then the walk stops with whatever it has.
    fn walk(&self, q: &Point, distance: Distance, budget: usize) -> Result<Vec<(u32, f64)>> {
        let mut walk = BucketWalk::new(&self.store, distance, budget);
        for (table, hasher) in self.tables.iter().zip(&self.hashers) {
            let (bucket, f_q) = hasher.locate(q)?;
            if walk.scan(table.bucket(bucket)?, f_q, q)? {
                break;
            }
        }
        Ok(walk.finish())
    }
}
