//! Extractable-resource estimate for a finished well layout.

use serde::{Deserialize, Serialize};

use super::field::{Field, Point};
use super::placement::Individual;

/// Physical constants turning a field value into extracted tonnes.
///
/// A well draws from one cell of `cell_volume_m3` of brine-bearing rock. The
/// field value scales the ore `grade` (a mass fraction), and `recovery` is the
/// fraction that actually comes out of the ground.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtractionModel {
    #[serde(default = "default_cell_volume")]
    pub cell_volume_m3: f64,
    #[serde(default = "default_density")]
    pub density_kg_m3: f64,
    #[serde(default = "default_grade")]
    pub grade: f64,
    #[serde(default = "default_recovery")]
    pub recovery: f64,
}

fn default_cell_volume() -> f64 {
    500_000.0
}

fn default_density() -> f64 {
    1200.0
}

fn default_grade() -> f64 {
    300.0 / 1_000_000.0
}

fn default_recovery() -> f64 {
    0.5
}

impl Default for ExtractionModel {
    fn default() -> Self {
        Self {
            cell_volume_m3: default_cell_volume(),
            density_kg_m3: default_density(),
            grade: default_grade(),
            recovery: default_recovery(),
        }
    }
}

impl ExtractionModel {
    /// Tonnes extracted by a single well over a cell of relative concentration `value`.
    #[inline]
    pub fn tonnes(&self, value: f64) -> f64 {
        self.cell_volume_m3 * self.density_kg_m3 * (value * self.grade) * self.recovery
            / 1_000_000.0
    }

    /// Estimate extraction for every well. Wells outside the field yield nothing.
    pub fn estimate(&self, field: &Field, wells: &[Individual]) -> ExtractionEstimate {
        let per_well: Vec<WellYield> = wells
            .iter()
            .map(|w| WellYield {
                point: w.point,
                tonnes: field.get(w.point).map_or(0.0, |v| self.tonnes(v)),
            })
            .collect();
        let total_tonnes = per_well.iter().map(|w| w.tonnes).sum();
        ExtractionEstimate {
            per_well,
            total_tonnes,
        }
    }
}

/// Yield of a single well.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WellYield {
    pub point: Point,
    pub tonnes: f64,
}

/// Result of [`ExtractionModel::estimate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionEstimate {
    pub per_well: Vec<WellYield>,
    pub total_tonnes: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_concentration_cell() {
        // 500_000 * 1200 * 3e-4 * 0.5 / 1e6 = 0.09 t
        let model = ExtractionModel::default();
        assert!((model.tonnes(1.0) - 0.09).abs() < 1e-12);
        assert_eq!(model.tonnes(0.0), 0.0);
    }

    #[test]
    fn test_estimate_sums_wells() {
        let field = Field::from_fn(4, |r, _| r as f64 / 3.0);
        let wells = vec![
            Individual::new(Point::new(0, 0), 0.0),
            Individual::new(Point::new(3, 1), 1.0),
            Individual::new(Point::new(3, 2), 1.0),
        ];
        let est = ExtractionModel::default().estimate(&field, &wells);
        assert_eq!(est.per_well.len(), 3);
        assert_eq!(est.per_well[0].tonnes, 0.0);
        assert!((est.total_tonnes - 0.18).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_bounds_well_yields_nothing() {
        let field = Field::filled(3, 1.0);
        let wells = vec![Individual::new(Point::new(5, 5), 1.0)];
        let est = ExtractionModel::default().estimate(&field, &wells);
        assert_eq!(est.total_tonnes, 0.0);
    }

    #[test]
    fn test_model_deserializes_partial() {
        let model: ExtractionModel = serde_json::from_str(r#"{"recovery": 1.0}"#).unwrap();
        assert_eq!(model.recovery, 1.0);
        assert_eq!(model.density_kg_m3, 1200.0);
    }
}
