//! Compute module - Fields, heatmap synthesis and well placement.

mod estimate;
mod field;

pub mod heatmap;
pub mod placement;

pub use estimate::*;
pub use field::*;
