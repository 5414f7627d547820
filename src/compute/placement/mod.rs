//! Evolutionary well placement.
//!
//! Wells compete on a scalar [`Field`](crate::compute::Field): each well's
//! fitness is the field value under it minus a linear penalty for every other
//! well closer than `dist_min`. Each generation the best wells breed by
//! midpoint recombination and the survivors are drawn from parents and
//! offspring together.
//!
//! # Overview
//!
//! - **Fitness** (`fitness`): penalized field evaluation
//! - **Generators** (`generator`): random-unique and lattice initial layouts
//! - **Selection** (`selection`): rank and roulette survivor selection with elitism
//! - **Recombination** (`recombine`): mate policies, centroids, jitter and merge pass
//! - **Engine** (`search`): the generation loop
//!
//! # Example
//!
//! ```rust,no_run
//! use wellfield::compute::Field;
//! use wellfield::compute::placement::PlacementEngine;
//! use wellfield::schema::{HeatmapConfig, Scenario};
//!
//! let scenario = Scenario {
//!     field: HeatmapConfig { size: 10, ..Default::default() },
//!     wells: 4,
//!     generations: 3,
//!     random_seed: Some(7),
//!     ..Default::default()
//! };
//! let field = Field::filled(10, 1.0);
//!
//! let mut engine = PlacementEngine::new(scenario, field)?;
//! let result = engine.run_with_callback(|record, _field| {
//!     println!("Generation {}: best = {:.3}", record.generation, record.stats.best_fitness);
//! })?;
//! println!("Best well: {:?}", result.best);
//! # Ok::<(), wellfield::compute::placement::PlacementError>(())
//! ```

mod fitness;
mod generator;
mod recombine;
mod rng;
mod search;
mod selection;

use serde::{Deserialize, Serialize};

use crate::compute::field::Point;
use crate::schema::ConfigError;

pub use fitness::{FitnessEvaluator, Penalty, evaluate};
pub use generator::{lattice, random_unique};
pub use recombine::{
    MergeParams, RecombineParams, centroid, choose_mate, merge_close, recombine,
};
pub use rng::PlacementRng;
pub use search::{
    GenerationRecord, GenerationStats, PlacementEngine, PlacementHistory, PlacementResult,
    PlacementStats,
};
pub use selection::{select, sort_by_fitness};

/// Floor applied to fitness before using it as a sampling weight.
pub const WEIGHT_EPSILON: f64 = 1e-4;

/// A well position and its fitness in the current penalty context.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub point: Point,
    pub fitness: f64,
}

impl Individual {
    #[inline]
    pub fn new(point: Point, fitness: f64) -> Self {
        Self { point, fitness }
    }
}

/// Errors raised by placement operations. All abort the run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlacementError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    #[error("Cannot select {target} individuals from an empty candidate set")]
    EmptyCandidates { target: usize },
}
