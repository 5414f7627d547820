//! Procedural heatmaps used as placement fields.
//!
//! Every generator is deterministic for a given seed. Random parameters are
//! drawn up-front so row filling can run in parallel.

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use rand::prelude::*;
use rand_distr::Uniform;
use rayon::prelude::*;

use super::field::{Field, Point};
use crate::schema::{HeatmapConfig, HeatmapKind};

/// Synthesize the field described by `config`.
pub fn generate(config: &HeatmapConfig, seed: u64) -> Field {
    let size = config.size;
    let mut rng = StdRng::seed_from_u64(seed);

    let mut field = match &config.kind {
        HeatmapKind::Distance { center } => {
            let (cr, cc) = center.unwrap_or((size / 2, size / 2));
            fill_rows(size, |r, c| {
                let d = (r as f64 - cr as f64).hypot(c as f64 - cc as f64);
                1.0 / (1.0 + d)
            })
        }
        HeatmapKind::Random => {
            let values: Vec<f64> = (0..size * size).map(|_| rng.r#gen::<f64>()).collect();
            Field::from_values(size, values).unwrap_or_else(|| Field::filled(size, 0.0))
        }
        HeatmapKind::Perlin { scale, octaves } => perlin(size, *scale, *octaves, rng.next_u32()),
        HeatmapKind::Gradient => {
            let denom = size.saturating_sub(1).max(1) as f64;
            fill_rows(size, |_, c| c as f64 / denom)
        }
        HeatmapKind::Blobs { count } => blobs(size, *count, &mut rng),
        HeatmapKind::Fractal { initial_scale } => diamond_square(size, *initial_scale, &mut rng),
    };

    if config.geological_mask {
        field = apply_geological_mask(&field);
    }

    log::debug!(
        "Generated {} heatmap {}x{} (seed {})",
        config.kind.name(),
        size,
        size,
        seed
    );
    field
}

fn fill_rows<F>(size: usize, f: F) -> Field
where
    F: Fn(usize, usize) -> f64 + Sync,
{
    let mut values = vec![0.0; size * size];
    if size > 0 {
        values
            .par_chunks_mut(size)
            .enumerate()
            .for_each(|(r, row)| {
                for (c, cell) in row.iter_mut().enumerate() {
                    *cell = f(r, c);
                }
            });
    }
    Field::from_values(size, values).unwrap_or_else(|| Field::filled(size, 0.0))
}

/// Rescale to `[0, 1]`. A constant field becomes all zeros.
fn normalize(field: Field) -> Field {
    let (lo, hi) = field.range();
    let span = hi - lo;
    let size = field.size();
    let values = field
        .into_values()
        .into_iter()
        .map(|v| if span > 0.0 { (v - lo) / span } else { 0.0 })
        .collect();
    Field::from_values(size, values).unwrap_or_else(|| Field::filled(size, 0.0))
}

fn perlin(size: usize, scale: f64, octaves: usize, seed: u32) -> Field {
    let fbm = Fbm::<Perlin>::new(seed)
        .set_octaves(octaves)
        .set_frequency(1.0)
        .set_lacunarity(2.0)
        .set_persistence(0.5);
    normalize(fill_rows(size, |r, c| {
        fbm.get([r as f64 / scale, c as f64 / scale])
    }))
}

struct Blob {
    row: f64,
    col: f64,
    intensity: f64,
    radius: f64,
}

fn blobs(size: usize, count: usize, rng: &mut StdRng) -> Field {
    let intensity = Uniform::new(0.5, 1.0);
    let blobs: Vec<Blob> = (0..count)
        .map(|_| Blob {
            row: rng.gen_range(0..size.max(1)) as f64,
            col: rng.gen_range(0..size.max(1)) as f64,
            intensity: intensity.sample(rng),
            radius: rng.gen_range(10..40) as f64,
        })
        .collect();

    normalize(fill_rows(size, |r, c| {
        blobs
            .iter()
            .map(|b| {
                let d2 = (r as f64 - b.row).powi(2) + (c as f64 - b.col).powi(2);
                b.intensity * (-d2 / (2.0 * b.radius * b.radius)).exp()
            })
            .sum()
    }))
}

fn displacement(rng: &mut StdRng, scale: f64) -> f64 {
    if scale > 0.0 {
        rng.gen_range(-scale..=scale)
    } else {
        0.0
    }
}

/// Diamond-square terrain clipped to `[0, 1]`.
///
/// The recursion needs a `2^k + 1` grid, so other sizes are synthesized on
/// the next such grid and cropped from the top-left corner.
fn diamond_square(size: usize, initial_scale: f64, rng: &mut StdRng) -> Field {
    let mut step = 1;
    while step + 1 < size {
        step *= 2;
    }
    let side = step + 1;
    let mut map = vec![0.0f64; side * side];
    let at = |r: usize, c: usize| r * side + c;

    let corner = rng.gen_range(0.4..0.6);
    for &(r, c) in &[(0, 0), (0, side - 1), (side - 1, 0), (side - 1, side - 1)] {
        map[at(r, c)] = corner;
    }

    let mut scale = initial_scale;
    while step > 1 {
        let half = step / 2;

        // Diamond: square centers from their four corners.
        for r in (0..side - 1).step_by(step) {
            for c in (0..side - 1).step_by(step) {
                let avg = (map[at(r, c)]
                    + map[at(r + step, c)]
                    + map[at(r, c + step)]
                    + map[at(r + step, c + step)])
                    / 4.0;
                map[at(r + half, c + half)] = avg + displacement(rng, scale);
            }
        }

        // Square: edge midpoints from their in-bounds neighbors.
        for r in (0..side).step_by(half) {
            for c in ((r + half) % step..side).step_by(step) {
                let mut total = 0.0;
                let mut count = 0;
                let neighbors = [
                    (r.checked_sub(half), Some(c)),
                    (Some(r + half), Some(c)),
                    (Some(r), c.checked_sub(half)),
                    (Some(r), Some(c + half)),
                ];
                for (nr, nc) in neighbors {
                    if let (Some(nr), Some(nc)) = (nr, nc)
                        && nr < side
                        && nc < side
                    {
                        total += map[at(nr, nc)];
                        count += 1;
                    }
                }
                let avg = if count > 0 { total / count as f64 } else { 0.0 };
                map[at(r, c)] = avg + displacement(rng, scale);
            }
        }

        step = half;
        scale /= 2.0;
    }

    Field::from_fn(size, |r, c| map[at(r, c)].clamp(0.0, 1.0))
}

/// Evenly spaced samples over `[start, end]`.
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + i as f64 * step).collect()
        }
    }
}

/// Weight a field toward its center and the anti-diagonal fracture line.
///
/// Mask is `0.7 exp(-(x² + y²) / 0.5) + 0.3 exp(-(x + y)² / 0.2)` over
/// `[-1, 1]²`; the product is clipped to `[0, 1]`.
pub fn apply_geological_mask(field: &Field) -> Field {
    let size = field.size();
    let axis = linspace(-1.0, 1.0, size);
    Field::from_fn(size, |r, c| {
        let (x, y) = (axis[c], axis[r]);
        let center = (-(x * x + y * y) / 0.5).exp();
        let fracture = (-((x + y).powi(2)) / 0.2).exp();
        let mask = 0.7 * center + 0.3 * fracture;
        (field.value(Point::new(r, c)) * mask).clamp(0.0, 1.0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(size: usize, kind: HeatmapKind) -> HeatmapConfig {
        HeatmapConfig {
            size,
            kind,
            ..Default::default()
        }
    }

    fn in_unit_range(field: &Field) -> bool {
        field.values().iter().all(|v| (0.0..=1.0).contains(v))
    }

    #[test]
    fn test_distance_peaks_at_center() {
        let field = generate(&config(9, HeatmapKind::Distance { center: None }), 0);
        assert_eq!(field.value(Point::new(4, 4)), 1.0);
        assert!((field.value(Point::new(4, 7)) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_gradient_ramps_over_columns() {
        let field = generate(&config(5, HeatmapKind::Gradient), 0);
        assert_eq!(field.value(Point::new(3, 0)), 0.0);
        assert_eq!(field.value(Point::new(0, 2)), 0.5);
        assert_eq!(field.value(Point::new(1, 4)), 1.0);
    }

    #[test]
    fn test_generators_stay_in_unit_range() {
        let kinds = [
            HeatmapKind::Random,
            HeatmapKind::default(),
            HeatmapKind::Blobs { count: 3 },
            HeatmapKind::Fractal { initial_scale: 0.5 },
        ];
        for kind in kinds {
            let field = generate(&config(33, kind.clone()), 7);
            assert_eq!(field.size(), 33);
            assert!(in_unit_range(&field), "{} out of range", kind.name());
        }
    }

    #[test]
    fn test_normalized_generators_span_unit_range() {
        for kind in [HeatmapKind::default(), HeatmapKind::Blobs { count: 4 }] {
            let (lo, hi) = generate(&config(40, kind), 3).range();
            assert!(lo.abs() < 1e-12);
            assert!((hi - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_same_seed_same_field() {
        for kind in [
            HeatmapKind::Random,
            HeatmapKind::Fractal { initial_scale: 0.5 },
            HeatmapKind::Blobs { count: 5 },
        ] {
            let a = generate(&config(20, kind.clone()), 11);
            let b = generate(&config(20, kind), 11);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_fractal_crops_odd_sizes() {
        for size in [1, 2, 3, 10, 17, 20] {
            let field = generate(&config(size, HeatmapKind::Fractal { initial_scale: 0.5 }), 2);
            assert_eq!(field.len(), size * size);
            assert!(in_unit_range(&field));
        }
    }

    #[test]
    fn test_fractal_without_displacement_is_flat() {
        let field = generate(&config(17, HeatmapKind::Fractal { initial_scale: 0.0 }), 4);
        let (lo, hi) = field.range();
        assert!((hi - lo).abs() < 1e-12);
        assert!((0.4..0.6).contains(&lo));
    }

    #[test]
    fn test_geological_mask_favors_center() {
        let masked = apply_geological_mask(&Field::filled(21, 1.0));
        let center = masked.value(Point::new(10, 10));
        assert!((center - 1.0).abs() < 1e-12);
        assert!(masked.value(Point::new(0, 0)) < 0.1);
        // The fracture runs along x + y = 0.
        assert!(masked.value(Point::new(0, 20)) > masked.value(Point::new(0, 0)));
    }

    #[test]
    fn test_mask_applied_from_config() {
        let cfg = HeatmapConfig {
            geological_mask: true,
            ..config(11, HeatmapKind::Gradient)
        };
        let field = generate(&cfg, 0);
        assert!(field.value(Point::new(0, 10)) < 1.0);
        assert!(in_unit_range(&field));
    }
}
