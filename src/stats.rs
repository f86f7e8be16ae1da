//! Parameter estimation for the L2 hash family.
use statrs::{
    consts::SQRT_2PI,
    distribution::{Normal, Univariate},
};

/// Collision probability of one L2 hash for points at distance `c`,
/// assuming R-normalized data (R = 1).
///
/// # Arguments
/// * `w` - Window of the L2 hash function.
/// * `c` - Approximation factor. cR.
pub fn l2_collision_prob(w: f64, c: f64) -> f64 {
    let norm = Normal::new(0., 1.).unwrap();
    1. - 2. * norm.cdf(-w / c)
        - 2. / (SQRT_2PI * w / c) * (1. - (-(w.powf(2.) / (2. * c.powf(2.)))).exp())
}

/// Number of hash tables needed to return the nearest neighbor with
/// probability `1 - delta`.
///
/// # Arguments
/// * `delta` - Acceptable probability of missing the neighbor.
/// * `p1` - Collision probability of a single hash, see
/// [l2_collision_prob](fn.l2_collision_prob.html).
/// * `k` - Number of hash projections.
pub fn estimate_tables(delta: f64, p1: f64, k: usize) -> usize {
    (delta.ln() / (1. - p1.powf(k as f64)).ln()).round() as usize
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_l2_collision_prob() {
        // tested w/ numpy
        let w = 2.0;
        let c = 1.0;
        assert_eq!(0.609548422215397, l2_collision_prob(w, c) as f32);
    }

    #[test]
    fn test_estimate_tables() {
        let delta = 0.2;
        let p1 = 0.6;
        let k = 5;
        assert_eq!(20, estimate_tables(delta, p1, k));
    }
}
