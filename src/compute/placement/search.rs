//! Generation loop for evolutionary well placement.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::compute::Field;
use crate::schema::{ConfigError, InitialPlacement, Scenario};

use super::fitness::{FitnessEvaluator, Penalty};
use super::generator::{lattice, random_unique};
use super::recombine::{RecombineParams, recombine};
use super::selection::{select, sort_by_fitness};
use super::{Individual, PlacementError, PlacementRng};

/// Everything the engine hands to observers after one generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Zero-based generation index.
    pub generation: usize,
    /// Individuals chosen to breed, best first.
    pub breeding: Vec<Individual>,
    /// Offspring after the merge pass.
    pub offspring: Vec<Individual>,
    /// Fitness summary of the population at the start of the generation.
    pub stats: GenerationStats,
}

/// Fitness summary of one evaluated population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub best_fitness: f64,
    pub worst_fitness: f64,
    pub mean_fitness: f64,
    pub population: usize,
}

impl GenerationStats {
    pub fn from_population(population: &[Individual]) -> Self {
        if population.is_empty() {
            return Self {
                best_fitness: 0.0,
                worst_fitness: 0.0,
                mean_fitness: 0.0,
                population: 0,
            };
        }
        let (best, worst, sum) = population.iter().fold(
            (f64::NEG_INFINITY, f64::INFINITY, 0.0),
            |(best, worst, sum), ind| {
                (
                    best.max(ind.fitness),
                    worst.min(ind.fitness),
                    sum + ind.fitness,
                )
            },
        );
        Self {
            best_fitness: best,
            worst_fitness: worst,
            mean_fitness: sum / population.len() as f64,
            population: population.len(),
        }
    }
}

/// Per-generation fitness history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlacementHistory {
    pub best_fitness: Vec<f64>,
    pub mean_fitness: Vec<f64>,
    pub worst_fitness: Vec<f64>,
    pub breeding_size: Vec<usize>,
    pub offspring_size: Vec<usize>,
}

impl PlacementHistory {
    fn push(&mut self, record: &GenerationRecord) {
        self.best_fitness.push(record.stats.best_fitness);
        self.mean_fitness.push(record.stats.mean_fitness);
        self.worst_fitness.push(record.stats.worst_fitness);
        self.breeding_size.push(record.breeding.len());
        self.offspring_size.push(record.offspring.len());
    }
}

/// Statistics from a placement run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementStats {
    /// Generations run.
    pub generations: usize,
    /// Fitness of the best final well.
    pub best_fitness: f64,
    /// Mean fitness of the final population.
    pub final_mean_fitness: f64,
    /// Wall-clock time in seconds.
    pub elapsed_seconds: f64,
}

/// Final result of a placement run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementResult {
    /// Final population, re-scored against itself, best first.
    pub population: Vec<Individual>,
    /// Best final well.
    pub best: Individual,
    pub history: PlacementHistory,
    pub stats: PlacementStats,
}

/// Evolution engine that places wells on a field.
pub struct PlacementEngine {
    scenario: Scenario,
    field: Field,
    rng: PlacementRng,
    penalty: Penalty,
    params: RecombineParams,
    population: Vec<Individual>,
    history: PlacementHistory,
    generation: usize,
}

impl PlacementEngine {
    /// Create an engine for `scenario` over `field`.
    ///
    /// The scenario is validated and the field must match its grid size.
    pub fn new(scenario: Scenario, field: Field) -> Result<Self, PlacementError> {
        scenario.validate()?;
        if field.size() != scenario.field.size {
            return Err(ConfigError::FieldSizeMismatch {
                expected: scenario.field.size,
                actual: field.size(),
            }
            .into());
        }

        let rng = match scenario.random_seed {
            Some(seed) => PlacementRng::new(seed),
            None => PlacementRng::random(),
        };
        let penalty = Penalty::from(scenario.penalty);
        let params = RecombineParams::from(&scenario);

        Ok(Self {
            scenario,
            field,
            rng,
            penalty,
            params,
            population: Vec::new(),
            history: PlacementHistory::default(),
            generation: 0,
        })
    }

    /// Replace the random source.
    pub fn with_rng(mut self, rng: PlacementRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    /// Current population.
    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    /// Generations completed since initialization.
    pub fn generation(&self) -> usize {
        self.generation
    }

    fn evaluator(&self) -> FitnessEvaluator<'_> {
        FitnessEvaluator::new(&self.field, self.penalty)
    }

    /// Lay out the first generation, scored against an empty reference set.
    pub fn initialize(&mut self) -> Result<(), PlacementError> {
        let evaluator = FitnessEvaluator::new(&self.field, self.penalty);
        let score = |p| evaluator.evaluate(p, &[]);
        let size = self.field.size();
        let wells = self.scenario.wells;

        self.population = match self.scenario.initial {
            InitialPlacement::Random => random_unique(wells, size, &mut self.rng, score)?,
            InitialPlacement::Lattice { spacing } => lattice(wells, size, spacing, score),
        };
        self.generation = 0;
        self.history = PlacementHistory::default();
        Ok(())
    }

    /// Run a single generation step.
    pub fn step(&mut self) -> Result<GenerationRecord, PlacementError> {
        let evaluator = FitnessEvaluator::new(&self.field, self.penalty);

        // Each well competes with every other well of the current population.
        let mut evaluated = evaluator.rescore(&self.population);
        sort_by_fitness(&mut evaluated);
        let stats = GenerationStats::from_population(&evaluated);

        let breeding_count = self.scenario.selection.resolve(evaluated.len());
        let breeding = select(
            &evaluated,
            breeding_count,
            self.scenario.elite_count.min(breeding_count),
            self.scenario.weighted_selection,
            &mut self.rng,
        )?;

        let offspring = recombine(
            &breeding,
            self.field.size(),
            &self.params,
            |p| evaluator.evaluate(p, &breeding),
            &mut self.rng,
        );

        let mut candidates = Vec::with_capacity(breeding.len() + offspring.len());
        candidates.extend_from_slice(&breeding);
        candidates.extend_from_slice(&offspring);

        let target = self.scenario.wells;
        let next = select(
            &candidates,
            target,
            self.scenario.elite_count.min(target),
            self.scenario.weighted_selection,
            &mut self.rng,
        )?;

        log::debug!(
            "Generation {}: best={:.4} mean={:.4} breeding={} offspring={} next={}",
            self.generation,
            stats.best_fitness,
            stats.mean_fitness,
            breeding.len(),
            offspring.len(),
            next.len()
        );
        if next.len() < target {
            log::warn!(
                "Generation {} kept only {} of {} wells",
                self.generation,
                next.len(),
                target
            );
        }

        let record = GenerationRecord {
            generation: self.generation,
            breeding,
            offspring,
            stats,
        };
        self.history.push(&record);
        self.population = next;
        self.generation += 1;

        Ok(record)
    }

    /// Run every generation, handing each record and the field to `callback`.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> Result<PlacementResult, PlacementError>
    where
        F: FnMut(&GenerationRecord, &Field),
    {
        let start_time = Instant::now();

        log::info!(
            "Placing {} wells on {}x{} field over {} generations ({})",
            self.scenario.wells,
            self.field.size(),
            self.field.size(),
            self.scenario.generations,
            self.scenario.name
        );

        self.initialize()?;

        for _ in 0..self.scenario.generations {
            let record = self.step()?;
            callback(&record, &self.field);
        }

        let mut population = self.evaluator().rescore(&self.population);
        sort_by_fitness(&mut population);
        let best = population
            .first()
            .copied()
            .ok_or(PlacementError::EmptyCandidates { target: 1 })?;

        let final_stats = GenerationStats::from_population(&population);
        let elapsed = start_time.elapsed().as_secs_f64();

        log::info!(
            "Finished after {} generations: best well ({}, {}) fitness {:.4}",
            self.generation,
            best.point.row,
            best.point.col,
            best.fitness
        );

        Ok(PlacementResult {
            population,
            best,
            history: self.history.clone(),
            stats: PlacementStats {
                generations: self.generation,
                best_fitness: best.fitness,
                final_mean_fitness: final_stats.mean_fitness,
                elapsed_seconds: elapsed,
            },
        })
    }

    /// Run placement (blocking).
    pub fn run(&mut self) -> Result<PlacementResult, PlacementError> {
        self.run_with_callback(|_, _| {})
    }
}
