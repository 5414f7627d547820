//! Schema module - Scenario and heatmap configuration for placement runs.

mod heatmap;
mod scenario;

pub use heatmap::*;
pub use scenario::*;
