//! Bucket storage and the bucket-walking retrieval discipline shared by
//! the LSH and hypercube indexes.
use crate::dist::Distance;
use crate::error::{Error, Result};
use crate::point::Point;
use fnv::FnvHashSet;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Indexible point storage. Buckets hold indexes into this arena, so a
/// point lands in memory once however many tables reference it.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct VecStore {
    pub(crate) map: Vec<Point>,
}

impl VecStore {
    pub fn with_capacity(n: usize) -> Result<VecStore> {
        let mut map = Vec::new();
        map.try_reserve(n).map_err(|_| Error::AllocationFailed)?;
        Ok(VecStore { map })
    }

    pub fn push(&mut self, p: Point) -> u32 {
        self.map.push(p);
        (self.map.len() - 1) as u32
    }

    pub fn get(&self, idx: u32) -> &Point {
        &self.map[idx as usize]
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}

/// A bucket entry: arena index plus the fingerprint that gates the
/// distance computation at query time.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub(crate) struct Entry {
    pub idx: u32,
    pub fingerprint: i64,
}

/// A fixed array of append-only buckets.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct BucketTable {
    buckets: Vec<Vec<Entry>>,
}

impl BucketTable {
    pub fn new(table_size: usize) -> Result<BucketTable> {
        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(table_size)
            .map_err(|_| Error::AllocationFailed)?;
        buckets.resize_with(table_size, Vec::new);
        Ok(BucketTable { buckets })
    }

    pub fn table_size(&self) -> usize {
        self.buckets.len()
    }

    /// A bucket outside the table means the hasher broke its contract.
    pub fn push(&mut self, bucket: usize, entry: Entry) -> Result<()> {
        self.buckets
            .get_mut(bucket)
            .ok_or(Error::InvalidHashFunction)?
            .push(entry);
        Ok(())
    }

    pub fn bucket(&self, bucket: usize) -> Result<&[Entry]> {
        self.buckets
            .get(bucket)
            .map(|b| b.as_slice())
            .ok_or(Error::InvalidHashFunction)
    }

    pub fn bucket_lengths(&self) -> impl Iterator<Item = usize> + '_ {
        self.buckets.iter().map(|b| b.len())
    }
}

/// Bucket occupancy statistics over one or more tables.
pub(crate) fn occupancy_stats(lengths: impl Iterator<Item = usize>) -> String {
    let lengths: Vec<usize> = lengths.collect();
    let n_buckets = lengths.len();
    let occupied: Vec<usize> = lengths.into_iter().filter(|&len| len > 0).collect();
    if occupied.is_empty() {
        return format!("No. of buckets: {}\nall buckets empty\n", n_buckets);
    }

    let max_len = *occupied.iter().max().unwrap();
    let min_len = *occupied.iter().min().unwrap();
    let avg = occupied.iter().sum::<usize>() as f64 / occupied.len() as f64;
    let var = occupied
        .iter()
        .map(|&len| (avg - len as f64).powf(2.))
        .sum::<f64>()
        / occupied.len() as f64;
    let std_dev = var.powf(0.5);

    let mut out = format!("No. of buckets: {}\n", n_buckets);
    out.push_str(&format!("occupied:\t{}\n", occupied.len()));
    out.push_str("\nBucket occupancy:\n");
    out.push_str(&format!("avg:\t{:?}\n", avg));
    out.push_str(&format!("std-dev:\t{:?}\n", std_dev));
    out.push_str(&format!("min:\t{:?}\n", min_len));
    out.push_str(&format!("max:\t{:?}\n", max_len));
    out
}

/// One query's walk over buckets: exact distance computations against a
/// budget, dedup across tables by arena index, and the fingerprint
/// short-circuit. Entries whose fingerprint differs from the query's are
/// presumed non-collisions and skipped without a distance computation.
pub(crate) struct BucketWalk<'a> {
    store: &'a VecStore,
    distance: Distance,
    seen: FnvHashSet<u32>,
    remaining: usize,
    inspected: Vec<(u32, f64)>,
}

impl<'a> BucketWalk<'a> {
    pub fn new(store: &'a VecStore, distance: Distance, budget: usize) -> BucketWalk<'a> {
        BucketWalk {
            store,
            distance,
            seen: FnvHashSet::default(),
            remaining: budget,
            inspected: Vec::new(),
        }
    }

    /// Scan one bucket. Returns true when the inspection budget ran out;
    /// the caller must stop walking.
    pub fn scan(&mut self, entries: &[Entry], f_q: i64, q: &Point) -> Result<bool> {
        for entry in entries {
            if entry.fingerprint != f_q {
                continue;
            }
            if self.seen.contains(&entry.idx) {
                continue;
            }
            if self.remaining == 0 {
                return Ok(true);
            }
            let d = self.distance.eval(self.store.get(entry.idx), q)?;
            self.remaining -= 1;
            self.seen.insert(entry.idx);
            self.inspected.push((entry.idx, d));
        }
        Ok(false)
    }

    /// The inspected `(index, distance)` pairs, in inspection order.
    pub fn finish(self) -> Vec<(u32, f64)> {
        self.inspected
    }
}

/// An inspected candidate ranked by distance, ties broken by point id
/// so query results are deterministic.
#[derive(Debug, PartialEq)]
pub(crate) struct Candidate {
    pub dist: f64,
    pub id: String,
    pub idx: u32,
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Candidate) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Candidate) -> Ordering {
        // distances of inspected candidates are finite
        self.dist
            .partial_cmp(&other.dist)
            .unwrap()
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// The `k` nearest candidates, ascending by distance, via a bounded
/// max-heap: the worst candidate is evicted whenever the heap spills.
pub(crate) fn nearest_k(candidates: Vec<Candidate>, k: usize) -> Vec<Candidate> {
    let mut heap = BinaryHeap::with_capacity(k + 1);
    for candidate in candidates {
        heap.push(candidate);
        if heap.len() > k {
            heap.pop();
        }
    }
    heap.into_sorted_vec()
}

#[cfg(test)]
mod test {
    use super::*;

    fn entry(idx: u32, fingerprint: i64) -> Entry {
        Entry { idx, fingerprint }
    }

    #[test]
    fn test_bucket_table() {
        let mut table = BucketTable::new(4).unwrap();
        table.push(0, entry(0, 7)).unwrap();
        table.push(0, entry(1, 9)).unwrap();
        table.push(3, entry(2, 1)).unwrap();

        assert_eq!(table.bucket(0).unwrap().len(), 2);
        assert_eq!(table.bucket(1).unwrap().len(), 0);
        // insertion order is preserved
        assert_eq!(table.bucket(0).unwrap()[0].idx, 0);
        assert!(matches!(
            table.push(4, entry(3, 0)),
            Err(Error::InvalidHashFunction)
        ));
        assert!(matches!(table.bucket(4), Err(Error::InvalidHashFunction)));
    }

    #[test]
    fn test_occupancy_stats() {
        let out = occupancy_stats(vec![0, 2, 4, 0].into_iter());
        assert!(out.contains("No. of buckets: 4"));
        assert!(out.contains("avg:\t3.0"));
        assert!(out.contains("min:\t2"));
        assert!(out.contains("max:\t4"));
    }

    fn store_of(points: Vec<Point>) -> VecStore {
        VecStore { map: points }
    }

    #[test]
    fn test_walk_fingerprint_short_circuit() {
        // a and b share a bucket but disagree on the fingerprint: the walk
        // must never price b, so the budget only pays for a.
        let store = store_of(vec![
            Point::new("a", vec![0., 0.]).unwrap(),
            Point::new("b", vec![100., 100.]).unwrap(),
        ]);
        let q = Point::new("q", vec![0., 0.]).unwrap();
        let bucket = [entry(0, 7), entry(1, 9)];

        // budget 1: pricing b as well would exhaust the walk
        let mut walk = BucketWalk::new(&store, Distance::L2, 1);
        let exhausted = walk.scan(&bucket, 7, &q).unwrap();
        assert!(!exhausted);
        assert_eq!(walk.finish(), vec![(0, 0.)]);
    }

    #[test]
    fn test_walk_budget_cap() {
        let points = (0..10)
            .map(|i| Point::new(format!("p{}", i), vec![i as f64, 0.]).unwrap())
            .collect();
        let store = store_of(points);
        let bucket: Vec<Entry> = (0..10).map(|i| entry(i, 1)).collect();
        let q = Point::new("q", vec![0., 0.]).unwrap();

        let mut walk = BucketWalk::new(&store, Distance::L2, 4);
        let exhausted = walk.scan(&bucket, 1, &q).unwrap();
        assert!(exhausted);
        // the cap bounds exact distance computations, partial result kept
        assert_eq!(walk.finish().len(), 4);
    }

    #[test]
    fn test_walk_dedup_across_buckets() {
        let store = store_of(vec![Point::new("a", vec![1., 1.]).unwrap()]);
        let q = Point::new("q", vec![0., 0.]).unwrap();
        let bucket = [entry(0, 3)];

        let mut walk = BucketWalk::new(&store, Distance::L2, 8);
        walk.scan(&bucket, 3, &q).unwrap();
        // the same arena index in a second table is not inspected twice
        walk.scan(&bucket, 3, &q).unwrap();
        assert_eq!(walk.finish().len(), 1);
    }

    #[test]
    fn test_nearest_k_ranking() {
        let candidates = vec![
            Candidate {
                dist: 2.0,
                id: "c".to_string(),
                idx: 2,
            },
            Candidate {
                dist: 1.0,
                id: "b".to_string(),
                idx: 1,
            },
            Candidate {
                dist: 1.0,
                id: "a".to_string(),
                idx: 0,
            },
        ];
        let top = nearest_k(candidates, 2);
        assert_eq!(top.len(), 2);
        // ties broken by id
        assert_eq!(top[0].id, "a");
        assert_eq!(top[1].id, "b");
    }
}
