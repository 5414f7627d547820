//! Initial well layouts.

use std::collections::HashSet;

use crate::compute::field::Point;
use crate::schema::ConfigError;

use super::{Individual, PlacementError, PlacementRng};

/// Draw `n` distinct uniformly random cells, each scored by `fitness`.
///
/// Points are returned in the order they were first drawn.
pub fn random_unique<F>(
    n: usize,
    size: usize,
    rng: &mut PlacementRng,
    fitness: F,
) -> Result<Vec<Individual>, PlacementError>
where
    F: Fn(Point) -> f64,
{
    let cells = size * size;
    if n > cells {
        return Err(ConfigError::TooManyWells { requested: n, cells }.into());
    }

    let mut seen = HashSet::with_capacity(n);
    let mut points = Vec::with_capacity(n);
    while points.len() < n {
        let p = rng.grid_point(size);
        if seen.insert(p) {
            points.push(p);
        }
    }

    Ok(points
        .into_iter()
        .map(|p| Individual::new(p, fitness(p)))
        .collect())
}

/// Lay `n` points on a near-equidistant lattice, each scored by `fitness`.
///
/// The lattice has `ceil(sqrt(n))` columns and `ceil(n / cols)` rows and is
/// truncated to `n` points in row-major order. Without `spacing`, positions
/// are spread evenly over the grid; with it, a block of that pitch is centered.
/// Rounding may map two lattice positions onto one cell.
pub fn lattice<F>(n: usize, size: usize, spacing: Option<f64>, fitness: F) -> Vec<Individual>
where
    F: Fn(Point) -> f64,
{
    if n == 0 || size == 0 {
        return Vec::new();
    }

    let cols = (n as f64).sqrt().ceil() as usize;
    let rows = n.div_ceil(cols);

    let row_positions = axis_positions(rows, size, spacing);
    let col_positions = axis_positions(cols, size, spacing);

    row_positions
        .iter()
        .flat_map(|&r| col_positions.iter().map(move |&c| Point::snap(r, c, size)))
        .take(n)
        .map(|p| Individual::new(p, fitness(p)))
        .collect()
}

fn axis_positions(count: usize, size: usize, spacing: Option<f64>) -> Vec<f64> {
    match spacing {
        Some(step) => {
            let span = (count - 1) as f64 * step;
            let start = ((size - 1) as f64 - span) / 2.0;
            (0..count).map(|i| start + i as f64 * step).collect()
        }
        None => {
            let cell = size as f64 / count as f64;
            (0..count).map(|i| (i as f64 + 0.5) * cell - 0.5).collect()
        }
    }
}
