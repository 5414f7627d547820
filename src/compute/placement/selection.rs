//! Rank-based survivor selection with elitism.

use crate::schema::ConfigError;

use super::{Individual, PlacementError, PlacementRng, WEIGHT_EPSILON};

/// Sort individuals by descending fitness. NaN fitness sorts last.
pub fn sort_by_fitness(population: &mut [Individual]) {
    population.sort_by(|a, b| match (a.fitness.is_nan(), b.fitness.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => b.fitness.total_cmp(&a.fitness),
    });
}

/// Select `target_count` individuals from `candidates`.
///
/// Candidates are ranked by descending fitness and the first `elite_count`
/// are kept unconditionally. Remaining slots are filled either in rank order
/// or, when `weighted` is set, by sampling the non-elite remainder with
/// replacement proportionally to `max(fitness, 1e-4)`.
///
/// In rank order the result is capped at the number of candidates; weighted
/// sampling always returns exactly `target_count` individuals, drawing from
/// the whole ranking when the elites have used up every candidate.
pub fn select(
    candidates: &[Individual],
    target_count: usize,
    elite_count: usize,
    weighted: bool,
    rng: &mut PlacementRng,
) -> Result<Vec<Individual>, PlacementError> {
    if elite_count > target_count {
        return Err(ConfigError::EliteExceedsTarget {
            elite: elite_count,
            target: target_count,
        }
        .into());
    }
    if target_count == 0 {
        return Ok(Vec::new());
    }
    if candidates.is_empty() {
        return Err(PlacementError::EmptyCandidates {
            target: target_count,
        });
    }

    let mut ranked = candidates.to_vec();
    sort_by_fitness(&mut ranked);

    let elites = elite_count.min(ranked.len());
    let mut selected: Vec<Individual> = ranked[..elites].to_vec();
    let needed = target_count - elites;

    if !weighted {
        selected.extend(ranked[elites..].iter().take(needed).copied());
        if selected.len() < target_count {
            log::trace!(
                "Rank selection short by {} ({} candidates for {} slots)",
                target_count - selected.len(),
                candidates.len(),
                target_count
            );
        }
        return Ok(selected);
    }

    let pool = if elites < ranked.len() {
        &ranked[elites..]
    } else {
        &ranked[..]
    };
    let weights: Vec<f64> = pool
        .iter()
        .map(|c| {
            if c.fitness.is_nan() {
                WEIGHT_EPSILON
            } else {
                c.fitness.max(WEIGHT_EPSILON)
            }
        })
        .collect();

    for _ in 0..needed {
        let idx = rng
            .weighted_index(&weights)
            .unwrap_or_else(|| rng.index(pool.len()));
        selected.push(pool[idx]);
    }

    Ok(selected)
}
