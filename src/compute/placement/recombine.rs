//! Midpoint recombination and the post-crossover merge pass.
//!
//! Every individual breeds exactly once: it picks a mate according to a
//! [`MatePolicy`], the offspring lands on the geometric or fitness-weighted
//! midpoint of the two parents ([`CentroidPolicy`]), gets a bounded random
//! nudge, and is snapped back onto the grid and re-scored. An optional merge
//! pass then collapses offspring pairs that ended up on top of each other.

use crate::compute::field::Point;
use crate::schema::{CentroidPolicy, MatePolicy, MergeConfig, Scenario};

use super::{Individual, PlacementRng, WEIGHT_EPSILON};

/// Combined fitness below which the mass centroid degenerates.
const MASS_EPSILON: f64 = 1e-8;

/// Absolute slack when comparing a pair penalty to its merge threshold.
const MERGE_TOLERANCE: f64 = 1e-12;

/// Merge pass settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeParams {
    pub dist_min: f64,
    pub penal_max: f64,
    /// Fraction of `penal_max` the pair penalty must reach.
    pub threshold: f64,
}

impl MergeParams {
    /// Merge only offspring whose pair penalty hits `penal_max`.
    pub fn new(dist_min: f64, penal_max: f64) -> Self {
        Self {
            dist_min,
            penal_max,
            threshold: 1.0,
        }
    }

    /// `penal_max * max(0, 1 - d / dist_min)`.
    pub fn pair_penalty(&self, a: Point, b: Point) -> f64 {
        self.penal_max * (1.0 - a.distance(&b) / self.dist_min).max(0.0)
    }

    /// Whether offspring at `a` and `b` collapse into one.
    ///
    /// Never true unless both `dist_min` and `penal_max` are positive.
    pub fn should_merge(&self, a: Point, b: Point) -> bool {
        if !(self.dist_min > 0.0 && self.penal_max > 0.0) {
            return false;
        }
        self.pair_penalty(a, b) >= self.threshold * self.penal_max - MERGE_TOLERANCE
    }
}

impl From<MergeConfig> for MergeParams {
    fn from(config: MergeConfig) -> Self {
        Self {
            dist_min: config.dist_min,
            penal_max: config.penal_max,
            threshold: config.threshold,
        }
    }
}

/// Recombination settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecombineParams {
    pub mate: MatePolicy,
    pub centroid: CentroidPolicy,
    /// Maximum uniform offset added to each coordinate before snapping.
    pub jitter: f64,
    /// Fitness exponent for roulette mate draws.
    pub weight_fitness: f64,
    /// Proximity exponent for roulette-by-distance mate draws.
    pub weight_distance: f64,
    pub merge: Option<MergeParams>,
}

impl Default for RecombineParams {
    fn default() -> Self {
        Self {
            mate: MatePolicy::default(),
            centroid: CentroidPolicy::default(),
            jitter: 0.0,
            weight_fitness: 1.0,
            weight_distance: 1.0,
            merge: None,
        }
    }
}

impl From<&Scenario> for RecombineParams {
    fn from(scenario: &Scenario) -> Self {
        Self {
            mate: scenario.mate,
            centroid: scenario.centroid,
            jitter: scenario.jitter,
            weight_fitness: scenario.weight_fitness,
            weight_distance: scenario.weight_distance,
            merge: scenario.merge.map(MergeParams::from),
        }
    }
}

/// Produce one offspring per individual, then apply the merge pass if set.
///
/// `fitness` scores each new grid position. All positions are clamped into
/// `[0, size - 1]`.
pub fn recombine<F>(
    population: &[Individual],
    size: usize,
    params: &RecombineParams,
    fitness: F,
    rng: &mut PlacementRng,
) -> Vec<Individual>
where
    F: Fn(Point) -> f64,
{
    let mut offspring = Vec::with_capacity(population.len());

    for (i, parent) in population.iter().enumerate() {
        let mate = &population[choose_mate(i, population, params, rng)];
        let (mut row, mut col) = centroid(parent, mate, params.centroid);

        if params.jitter > 0.0 {
            row += rng.jitter(params.jitter);
            col += rng.jitter(params.jitter);
        }

        let point = Point::snap(row, col, size);
        offspring.push(Individual::new(point, fitness(point)));
    }

    match &params.merge {
        Some(merge) => merge_close(&offspring, size, merge, &fitness),
        None => offspring,
    }
}

/// Index of the mate chosen for `population[i]`.
///
/// A lone individual mates with itself.
pub fn choose_mate(
    i: usize,
    population: &[Individual],
    params: &RecombineParams,
    rng: &mut PlacementRng,
) -> usize {
    let n = population.len();
    if n < 2 {
        return i;
    }
    let me = population[i].point;

    match params.mate {
        MatePolicy::Nearest => (0..n)
            .filter(|&j| j != i)
            .min_by(|&a, &b| {
                me.distance(&population[a].point)
                    .total_cmp(&me.distance(&population[b].point))
            })
            .unwrap_or(i),
        MatePolicy::Sequential => (i + 1) % n,
        MatePolicy::Roulette | MatePolicy::RouletteDistance => {
            let others: Vec<usize> = (0..n).filter(|&j| j != i).collect();
            let weights: Vec<f64> = others
                .iter()
                .map(|&j| {
                    let other = &population[j];
                    let mut w = fitness_weight(other.fitness).powf(params.weight_fitness);
                    if params.mate == MatePolicy::RouletteDistance {
                        let closeness = 1.0 / (1.0 + me.distance(&other.point));
                        w *= closeness.powf(params.weight_distance);
                    }
                    w
                })
                .collect();

            match rng.weighted_index(&weights) {
                Some(k) => others[k],
                None => {
                    log::trace!("Degenerate roulette weights for individual {i}, drawing uniformly");
                    others[rng.index(others.len())]
                }
            }
        }
    }
}

fn fitness_weight(fitness: f64) -> f64 {
    if fitness.is_nan() {
        WEIGHT_EPSILON
    } else {
        fitness.max(WEIGHT_EPSILON)
    }
}

/// Continuous offspring position for two parents.
///
/// The mass centroid falls back to the geometric midpoint when the parents'
/// combined fitness is within `1e-8` of zero.
pub fn centroid(a: &Individual, b: &Individual, policy: CentroidPolicy) -> (f64, f64) {
    let (r1, c1) = (a.point.row as f64, a.point.col as f64);
    let (r2, c2) = (b.point.row as f64, b.point.col as f64);

    let total = a.fitness + b.fitness;
    match policy {
        CentroidPolicy::Mass if total.abs() >= MASS_EPSILON => (
            (r1 * a.fitness + r2 * b.fitness) / total,
            (c1 * a.fitness + c2 * b.fitness) / total,
        ),
        _ => ((r1 + r2) / 2.0, (c1 + c2) / 2.0),
    }
}

/// Collapse over-close offspring pairs.
///
/// Scanning in order, each unmerged individual is paired with the first later
/// unmerged individual that triggers `merge`; the pair is replaced by one
/// individual at their mass centroid, re-scored with `fitness`. The output is
/// never longer than the input.
pub fn merge_close<F>(
    offspring: &[Individual],
    size: usize,
    merge: &MergeParams,
    fitness: F,
) -> Vec<Individual>
where
    F: Fn(Point) -> f64,
{
    let n = offspring.len();
    let mut consumed = vec![false; n];
    let mut merged = Vec::with_capacity(n);

    for i in 0..n {
        if consumed[i] {
            continue;
        }
        consumed[i] = true;

        let a = &offspring[i];
        let partner =
            (i + 1..n).find(|&j| !consumed[j] && merge.should_merge(a.point, offspring[j].point));

        match partner {
            Some(j) => {
                consumed[j] = true;
                let (row, col) = centroid(a, &offspring[j], CentroidPolicy::Mass);
                let point = Point::snap(row, col, size);
                merged.push(Individual::new(point, fitness(point)));
            }
            None => merged.push(*a),
        }
    }

    if merged.len() < n {
        log::trace!("Merged {} offspring pairs", n - merged.len());
    }
    merged
}
