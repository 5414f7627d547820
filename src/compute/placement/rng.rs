//! Random source threaded through every placement operation.

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand_distr::Uniform;

use crate::compute::field::Point;

/// Seedable random number generator for placement operations.
pub struct PlacementRng {
    rng: StdRng,
}

impl PlacementRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Uniform cell in a `size × size` grid.
    pub fn grid_point(&mut self, size: usize) -> Point {
        Point::new(self.rng.gen_range(0..size), self.rng.gen_range(0..size))
    }

    /// Uniform offset in `[-amount, amount]`, zero when `amount <= 0`.
    pub fn jitter(&mut self, amount: f64) -> f64 {
        if amount > 0.0 {
            Uniform::new_inclusive(-amount, amount).sample(&mut self.rng)
        } else {
            0.0
        }
    }

    /// Index drawn proportionally to `weights`.
    ///
    /// Returns `None` when no weight is positive, or any weight is negative
    /// or not finite.
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        if weights.iter().any(|w| !w.is_finite()) {
            return None;
        }
        let dist = WeightedIndex::new(weights).ok()?;
        Some(dist.sample(&mut self.rng))
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let mut a = PlacementRng::new(7);
        let mut b = PlacementRng::new(7);
        for _ in 0..16 {
            assert_eq!(a.grid_point(50), b.grid_point(50));
            assert_eq!(a.jitter(1.5), b.jitter(1.5));
        }
    }

    #[test]
    fn test_jitter_bounds() {
        let mut rng = PlacementRng::new(1);
        for _ in 0..1000 {
            let j = rng.jitter(2.0);
            assert!((-2.0..=2.0).contains(&j));
        }
        assert_eq!(rng.jitter(0.0), 0.0);
    }

    #[test]
    fn test_weighted_index_skips_zero_weights() {
        let mut rng = PlacementRng::new(3);
        for _ in 0..200 {
            assert_eq!(rng.weighted_index(&[0.0, 2.0, 0.0]), Some(1));
        }
        assert_eq!(rng.weighted_index(&[0.0, 0.0]), None);
        assert_eq!(rng.weighted_index(&[]), None);
        assert_eq!(rng.weighted_index(&[1.0, f64::INFINITY]), None);
    }
}
