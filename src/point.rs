//! Owned point type indexed by the LSH and hypercube models.
use crate::constants::MAX_DIM;
use crate::dist;
use crate::error::{Error, Result};
use crate::utils::all_eq;
use serde::{Deserialize, Serialize};

/// An immutable vector of `f64` components with a string label.
///
/// The label names the point in query results; it takes no part in
/// equality, which is componentwise.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Point {
    id: String,
    components: Vec<f64>,
}

impl Point {
    pub fn new<S: Into<String>>(id: S, components: Vec<f64>) -> Result<Point> {
        if components.is_empty() || components.len() > MAX_DIM {
            return Err(Error::InvalidDim);
        }
        Ok(Point {
            id: id.into(),
            components,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dim(&self) -> usize {
        self.components.len()
    }

    pub fn components(&self) -> &[f64] {
        &self.components
    }

    pub fn inner_product(&self, other: &Point) -> Result<f64> {
        if self.dim() != other.dim() {
            return Err(Error::InvalidDim);
        }
        Ok(dist::inner_prod(&self.components, &other.components))
    }

    pub fn l2_dist(&self, other: &Point) -> Result<f64> {
        if self.dim() != other.dim() {
            return Err(Error::InvalidDim);
        }
        Ok(dist::l2_dist(&self.components, &other.components))
    }

    pub fn cosine_dist(&self, other: &Point) -> Result<f64> {
        if self.dim() != other.dim() {
            return Err(Error::InvalidDim);
        }
        dist::cosine_dist(&self.components, &other.components)
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Point) -> bool {
        all_eq(&self.components, &other.components)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_dim_bounds() {
        assert!(Point::new("empty", vec![]).is_err());
        assert!(Point::new("big", vec![0.; MAX_DIM + 1]).is_err());
        assert!(Point::new("ok", vec![0.; MAX_DIM]).is_ok());
    }

    #[test]
    fn test_equality_ignores_id() {
        let a = Point::new("a", vec![1., 2.]).unwrap();
        let b = Point::new("b", vec![1., 2.]).unwrap();
        let c = Point::new("a", vec![1., 3.]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_distances() {
        let a = Point::new("a", vec![0., 0.]).unwrap();
        let b = Point::new("b", vec![3., 4.]).unwrap();
        assert_eq!(a.l2_dist(&b).unwrap(), 5.);

        let e0 = Point::new("e0", vec![1., 0.]).unwrap();
        let e1 = Point::new("e1", vec![0., 1.]).unwrap();
        assert_eq!(e0.cosine_dist(&e1).unwrap(), 1.);
        assert_eq!(e0.inner_product(&e1).unwrap(), 0.);
    }

    #[test]
    fn test_dim_mismatch() {
        let a = Point::new("a", vec![1., 2.]).unwrap();
        let b = Point::new("b", vec![1., 2., 3.]).unwrap();
        assert!(matches!(a.inner_product(&b), Err(Error::InvalidDim)));
        assert!(matches!(a.l2_dist(&b), Err(Error::InvalidDim)));
        assert!(matches!(a.cosine_dist(&b), Err(Error::InvalidDim)));
    }
}
