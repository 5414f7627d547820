//! Penalized fitness: field reward minus proximity penalty.

use crate::compute::field::{Field, Point};
use crate::schema::PenaltyConfig;

use super::Individual;

/// Linearly decaying proximity penalty.
///
/// A neighbor at distance `d < dist_min` contributes
/// `penal_max * (1 - d / dist_min)`; neighbors at or beyond `dist_min`
/// contribute nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penalty {
    pub dist_min: f64,
    pub penal_max: f64,
}

impl Penalty {
    pub fn new(dist_min: f64, penal_max: f64) -> Self {
        Self {
            dist_min,
            penal_max,
        }
    }

    /// Penalty contributed by one neighbor at distance `distance`.
    #[inline]
    pub fn contribution(&self, distance: f64) -> f64 {
        if self.dist_min <= 0.0 || distance >= self.dist_min {
            0.0
        } else {
            self.penal_max * (1.0 - distance / self.dist_min)
        }
    }

    /// Total penalty of `point` against every point in `neighbors`.
    pub fn total<'a, I>(&self, point: Point, neighbors: I) -> f64
    where
        I: IntoIterator<Item = &'a Point>,
    {
        neighbors
            .into_iter()
            .map(|q| self.contribution(point.distance(q)))
            .sum()
    }
}

impl From<PenaltyConfig> for Penalty {
    fn from(config: PenaltyConfig) -> Self {
        Self::new(config.dist_min, config.penal_max)
    }
}

/// Score of `point`: field value minus its penalty against `reference`.
///
/// If `reference` contains `point` itself, the self term contributes
/// `penal_max`.
pub fn evaluate(
    point: Point,
    field: &Field,
    reference: &[Individual],
    dist_min: f64,
    penal_max: f64,
) -> f64 {
    FitnessEvaluator::new(field, Penalty::new(dist_min, penal_max)).evaluate(point, reference)
}

/// Fitness function bound to a field and penalty.
#[derive(Debug, Clone, Copy)]
pub struct FitnessEvaluator<'a> {
    field: &'a Field,
    penalty: Penalty,
}

impl<'a> FitnessEvaluator<'a> {
    pub fn new(field: &'a Field, penalty: Penalty) -> Self {
        Self { field, penalty }
    }

    pub fn field(&self) -> &'a Field {
        self.field
    }

    pub fn penalty(&self) -> Penalty {
        self.penalty
    }

    /// Score `point` against every individual in `reference`.
    pub fn evaluate(&self, point: Point, reference: &[Individual]) -> f64 {
        self.field.value(point) - self.penalty.total(point, reference.iter().map(|q| &q.point))
    }

    /// Re-score each individual against all the others.
    ///
    /// An individual's own slot is skipped; other individuals sharing its
    /// cell still penalize it.
    pub fn rescore(&self, population: &[Individual]) -> Vec<Individual> {
        population
            .iter()
            .enumerate()
            .map(|(i, ind)| {
                let others = population
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(_, q)| &q.point);
                let fitness = self.field.value(ind.point) - self.penalty.total(ind.point, others);
                Individual::new(ind.point, fitness)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ones(size: usize) -> Field {
        Field::filled(size, 1.0)
    }

    #[test]
    fn test_no_penalty_beyond_dist_min() {
        let field = ones(10);
        let reference = vec![
            Individual::new(Point::new(0, 3), 0.0),
            Individual::new(Point::new(4, 0), 0.0),
        ];
        let score = evaluate(Point::new(0, 0), &field, &reference, 3.0, 0.5);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_penalty_shape() {
        let penalty = Penalty::new(4.0, 0.8);
        assert!((penalty.contribution(0.0) - 0.8).abs() < 1e-12);
        assert!((penalty.contribution(1.0) - 0.6).abs() < 1e-12);
        assert!((penalty.contribution(2.0) - 0.4).abs() < 1e-12);
        assert_eq!(penalty.contribution(4.0), 0.0);
        assert_eq!(penalty.contribution(9.0), 0.0);
    }

    #[test]
    fn test_zero_dist_min_disables_penalty() {
        let penalty = Penalty::new(0.0, 1.0);
        assert_eq!(penalty.contribution(0.0), 0.0);
    }

    #[test]
    fn test_penalties_accumulate() {
        let field = Field::from_fn(5, |r, c| (r + c) as f64 * 0.1);
        let reference = vec![
            Individual::new(Point::new(2, 2), 0.0),
            Individual::new(Point::new(2, 3), 0.0),
        ];
        // Base 0.4, self-cell neighbor 0.5, adjacent neighbor 0.5 * (1 - 1/2).
        let score = evaluate(Point::new(2, 2), &field, &reference, 2.0, 0.5);
        assert!((score - (0.4 - 0.5 - 0.25)).abs() < 1e-12);
    }

    #[test]
    fn test_evaluate_is_pure() {
        let field = Field::from_fn(6, |r, c| (r * 6 + c) as f64 / 36.0);
        let reference = vec![
            Individual::new(Point::new(1, 1), 0.3),
            Individual::new(Point::new(2, 1), 0.7),
        ];
        let snapshot = reference.clone();
        let evaluator = FitnessEvaluator::new(&field, Penalty::new(2.5, 0.4));

        let first = evaluator.evaluate(Point::new(1, 2), &reference);
        let second = evaluator.evaluate(Point::new(1, 2), &reference);
        assert_eq!(first.to_bits(), second.to_bits());
        assert_eq!(
            first.to_bits(),
            evaluate(Point::new(1, 2), &field, &reference, 2.5, 0.4).to_bits()
        );
        // Stored fitness of the reference set plays no part and is left alone.
        assert_eq!(reference, snapshot);
    }

    #[test]
    fn test_rescore_skips_own_slot() {
        let field = ones(10);
        let evaluator = FitnessEvaluator::new(&field, Penalty::new(2.0, 0.5));
        let population = vec![
            Individual::new(Point::new(0, 0), 0.0),
            Individual::new(Point::new(0, 1), 0.0),
            Individual::new(Point::new(9, 9), 0.0),
        ];
        let scored = evaluator.rescore(&population);
        assert!((scored[0].fitness - 0.75).abs() < 1e-12);
        assert!((scored[1].fitness - 0.75).abs() < 1e-12);
        assert_eq!(scored[2].fitness, 1.0);
    }

    #[test]
    fn test_rescore_penalizes_shared_cells() {
        let field = ones(4);
        let evaluator = FitnessEvaluator::new(&field, Penalty::new(1.0, 0.3));
        let population = vec![
            Individual::new(Point::new(1, 1), 0.0),
            Individual::new(Point::new(1, 1), 0.0),
        ];
        let scored = evaluator.rescore(&population);
        assert!((scored[0].fitness - 0.7).abs() < 1e-12);
        assert!((scored[1].fitness - 0.7).abs() < 1e-12);
    }
}
