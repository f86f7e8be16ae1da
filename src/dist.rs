//! Distance/ similarity functions.
use crate::error::{Error, Result};
use crate::point::Point;
use crate::utils::checked_div_f64;
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

/// L2 norm of a single vector.
pub fn l2_norm(x: &[f64]) -> f64 {
    let x = aview1(x);
    x.dot(&x).sqrt()
}

/// Dot product between two vectors.
///
/// # Panics
///
/// Panics if `a.len() != b.len()`.
pub fn inner_prod(a: &[f64], b: &[f64]) -> f64 {
    aview1(a).dot(&aview1(b))
}

/// Euclidean distance between two vectors.
///
/// # Panics
///
/// Panics if `a.len() != b.len()`.
pub fn l2_dist(a: &[f64], b: &[f64]) -> f64 {
    let diff: Vec<f64> = a.iter().zip(b).map(|(ai, bi)| ai - bi).collect();
    l2_norm(&diff)
}

/// Cosine distance between two vectors: `1 - cos(a, b)`, in `[0, 2]`.
/// A zero vector has no direction and fails the checked division.
pub fn cosine_dist(a: &[f64], b: &[f64]) -> Result<f64> {
    let sim = checked_div_f64(inner_prod(a, b), l2_norm(a) * l2_norm(b))?;
    Ok(1. - sim)
}

/// Metric selector of an index. The hash family follows the metric:
/// L2 uses projection-with-quantization hashes, cosine uses hyperplane
/// sign hashes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Distance {
    L2,
    Cosine,
}

impl Distance {
    /// Exact distance between two points under this metric.
    pub fn eval(&self, a: &Point, b: &Point) -> Result<f64> {
        let d = match self {
            Distance::L2 => a.l2_dist(b)?,
            Distance::Cosine => a.cosine_dist(b)?,
        };
        if !d.is_finite() {
            return Err(Error::ArithOverflow);
        }
        Ok(d)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_l2_norm() {
        assert_eq!(l2_norm(&[3., 4.]), 5.);
        assert_eq!(l2_norm(&[0., 0.]), 0.);
    }

    #[test]
    fn test_inner_prod() {
        assert_eq!(inner_prod(&[1., -1.], &[0.2, 1.2]), -1.0);
    }

    #[test]
    fn test_l2_dist() {
        assert_eq!(l2_dist(&[0., 0.], &[3., 4.]), 5.);
        assert_eq!(l2_dist(&[1., 2.], &[1., 2.]), 0.);
    }

    #[test]
    fn test_cosine_dist() {
        // orthogonal vectors
        assert_eq!(cosine_dist(&[1., 0.], &[0., 1.]).unwrap(), 1.);
        // same direction, different scale
        let d = cosine_dist(&[1., 2.], &[2., 4.]).unwrap();
        assert!(d.abs() < 1e-12);
        // opposite direction
        let d = cosine_dist(&[1., 0.], &[-1., 0.]).unwrap();
        assert!((d - 2.).abs() < 1e-12);
        // zero vector has no direction
        assert!(cosine_dist(&[0., 0.], &[1., 0.]).is_err());
    }

    #[test]
    fn test_eval_dispatch() {
        let a = Point::new("a", vec![0., 0.]).unwrap();
        let b = Point::new("b", vec![3., 4.]).unwrap();
        assert_eq!(Distance::L2.eval(&a, &b).unwrap(), 5.);
        assert!(Distance::Cosine.eval(&a, &b).is_err());
    }
}
