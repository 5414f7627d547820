//! Read-only scalar field the placement engine optimizes over.

use serde::{Deserialize, Serialize};

/// A grid cell, `row` and `col` both within `[0, size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

impl Point {
    #[inline]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Euclidean distance to another cell.
    #[inline]
    pub fn distance(&self, other: &Point) -> f64 {
        let dr = self.row as f64 - other.row as f64;
        let dc = self.col as f64 - other.col as f64;
        dr.hypot(dc)
    }

    /// Round a continuous position to the nearest cell, clamped into the grid.
    ///
    /// Exact halves round to the even neighbor. Positions outside the grid
    /// land on the nearest edge; they never wrap.
    pub fn snap(row: f64, col: f64, size: usize) -> Self {
        let max = size.saturating_sub(1) as f64;
        let clamp = |v: f64| {
            if v.is_nan() {
                0
            } else {
                v.round_ties_even().clamp(0.0, max) as usize
            }
        };
        Self {
            row: clamp(row),
            col: clamp(col),
        }
    }
}

impl From<(usize, usize)> for Point {
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}

/// Square `size × size` scalar field stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    size: usize,
    values: Vec<f64>,
}

impl Field {
    /// Field of `size × size` cells all set to `value`.
    pub fn filled(size: usize, value: f64) -> Self {
        Self {
            size,
            values: vec![value; size * size],
        }
    }

    /// Wrap row-major values. Returns `None` unless `values.len() == size * size`.
    pub fn from_values(size: usize, values: Vec<f64>) -> Option<Self> {
        (values.len() == size * size).then_some(Self { size, values })
    }

    /// Build a field by evaluating `f(row, col)` for every cell.
    pub fn from_fn<F>(size: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> f64,
    {
        let mut values = Vec::with_capacity(size * size);
        for row in 0..size {
            for col in 0..size {
                values.push(f(row, col));
            }
        }
        Self { size, values }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn contains(&self, point: Point) -> bool {
        point.row < self.size && point.col < self.size
    }

    /// Value at `point`, or `None` when the point lies outside the grid.
    #[inline]
    pub fn get(&self, point: Point) -> Option<f64> {
        self.contains(point)
            .then(|| self.values[point.row * self.size + point.col])
    }

    /// Value at `point`.
    ///
    /// # Panics
    ///
    /// Panics if `point` lies outside the grid.
    #[inline]
    pub fn value(&self, point: Point) -> f64 {
        assert!(
            self.contains(point),
            "point ({}, {}) outside {}x{} field",
            point.row,
            point.col,
            self.size,
            self.size
        );
        self.values[point.row * self.size + point.col]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Minimum and maximum value, `(0, 0)` for an empty field.
    pub fn range(&self) -> (f64, f64) {
        if self.values.is_empty() {
            return (0.0, 0.0);
        }
        self.values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }
}
