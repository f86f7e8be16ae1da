use crate::error::{Error, Result};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

pub fn create_rng(seed: u64) -> SmallRng {
    if seed == 0 {
        SmallRng::from_entropy()
    } else {
        SmallRng::seed_from_u64(seed)
    }
}

pub fn rand_unit_vec<RNG: Rng>(size: usize, rng: RNG) -> Vec<f64> {
    rng.sample_iter(StandardNormal).take(size).collect()
}

pub fn all_eq<T>(u: &[T], v: &[T]) -> bool
where
    T: PartialEq,
{
    if u.len() != v.len() {
        return false;
    }
    for (u_, v_) in u.iter().zip(v) {
        if u_ != v_ {
            return false;
        }
    }
    true
}

/// Checked sum on the signed 64-bit hash accumulator.
pub fn checked_add(a: i64, b: i64) -> Result<i64> {
    a.checked_add(b).ok_or(Error::ArithOverflow)
}

/// Checked product on the signed 64-bit hash accumulator.
pub fn checked_mul(a: i64, b: i64) -> Result<i64> {
    a.checked_mul(b).ok_or(Error::ArithOverflow)
}

/// Float sum that rejects saturation to infinity.
pub fn checked_add_f64(a: f64, b: f64) -> Result<f64> {
    let sum = a + b;
    if sum.is_finite() {
        Ok(sum)
    } else {
        Err(Error::ArithOverflow)
    }
}

/// Float quotient that rejects saturation and division by zero.
pub fn checked_div_f64(num: f64, denom: f64) -> Result<f64> {
    let quot = num / denom;
    if quot.is_finite() {
        Ok(quot)
    } else {
        Err(Error::ArithOverflow)
    }
}

/// Mathematical floor division: negative quotients round toward -inf.
/// Fails when the floored quotient does not fit the hash integer type.
pub fn floor_div(num: f64, denom: f64) -> Result<i64> {
    let quot = num / denom;
    if !quot.is_finite() {
        return Err(Error::ArithOverflow);
    }
    let floored = quot.floor();
    if floored >= i64::MAX as f64 || floored < i64::MIN as f64 {
        return Err(Error::ArithOverflow);
    }
    Ok(floored as i64)
}

/// Modulo that lands in `[0, m)` for positive `m`, whatever the sign of `a`.
pub fn positive_mod(a: i64, m: i64) -> i64 {
    a.rem_euclid(m)
}

/// Number of differing bits between two cube vertices.
pub fn hamming(a: usize, b: usize) -> u32 {
    (a ^ b).count_ones()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_all_eq() {
        assert!(all_eq(&[1, 2], &[1, 2]));
        assert!(all_eq(&[1., 2.], &[1., 2.]));
        assert!(!all_eq(&[1.1, -1.], &[1., 2.]));
        assert!(!all_eq(&[1.], &[1., 2.]));
    }

    #[test]
    fn test_floor_div_rounds_down() {
        assert_eq!(floor_div(3.0, 2.0).unwrap(), 1);
        assert_eq!(floor_div(-3.0, 2.0).unwrap(), -2);
        assert_eq!(floor_div(7.5, 2.5).unwrap(), 3);
        assert_eq!(floor_div(-0.1, 4.0).unwrap(), -1);
    }

    #[test]
    fn test_floor_div_overflow() {
        assert!(floor_div(1e300, 1e-4).is_err());
        assert!(floor_div(1.0, 0.0).is_err());
        assert!(floor_div(f64::NAN, 2.0).is_err());
    }

    #[test]
    fn test_checked_accumulator() {
        assert_eq!(checked_add(1, 2).unwrap(), 3);
        assert!(checked_add(i64::MAX, 1).is_err());
        assert_eq!(checked_mul(-4, 5).unwrap(), -20);
        assert!(checked_mul(i64::MAX, 2).is_err());
    }

    #[test]
    fn test_checked_floats() {
        assert_eq!(checked_add_f64(1.5, 2.5).unwrap(), 4.0);
        assert!(checked_add_f64(f64::MAX, f64::MAX).is_err());
        assert!(checked_div_f64(1.0, 0.0).is_err());
    }

    #[test]
    fn test_positive_mod() {
        assert_eq!(positive_mod(7, 3), 1);
        assert_eq!(positive_mod(-7, 3), 2);
        assert_eq!(positive_mod(0, 3), 0);
    }

    #[test]
    fn test_hamming() {
        assert_eq!(hamming(5, 5), 0);
        assert_eq!(hamming(5, 1), 1);
        assert_eq!(hamming(5, 2), 3);
    }
}
