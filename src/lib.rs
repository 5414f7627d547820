//! Wellfield - Evolutionary well placement on synthetic heatmaps.
//!
//! This crate places a fixed number of wells on a 2D scalar field so that
//! each sits on high values without crowding its neighbours. Fields come from
//! procedural generators (diamond-square, Perlin fBm, gaussian blobs and
//! simpler ramps) and the placement is evolved generation by generation.
//!
//! # Architecture
//!
//! - `schema`: Scenario and heatmap configuration
//! - `compute`: Fields, heatmap synthesis, the placement engine and the
//!   extraction estimate
//! - `record`: Field cache and per-generation record files
//!
//! # Example
//!
//! ```rust,no_run
//! use wellfield::{
//!     compute::{ExtractionModel, heatmap, placement::PlacementEngine},
//!     schema::{HeatmapConfig, HeatmapKind, Scenario},
//! };
//!
//! let scenario = Scenario {
//!     field: HeatmapConfig {
//!         size: 128,
//!         kind: HeatmapKind::Fractal { initial_scale: 0.5 },
//!         geological_mask: true,
//!         ..Default::default()
//!     },
//!     wells: 40,
//!     generations: 20,
//!     random_seed: Some(42),
//!     ..Default::default()
//! };
//!
//! let field = heatmap::generate(&scenario.field, 42);
//! let mut engine = PlacementEngine::new(scenario, field)?;
//! let result = engine.run()?;
//!
//! let estimate = ExtractionModel::default().estimate(engine.field(), &result.population);
//! println!("Best well: {:?}", result.best.point);
//! println!("Estimated extraction: {:.3} t", estimate.total_tonnes);
//! # Ok::<(), wellfield::compute::placement::PlacementError>(())
//! ```

pub mod compute;
pub mod record;
pub mod schema;

// Re-export commonly used types
pub use compute::placement::{PlacementEngine, PlacementError, PlacementResult};
pub use compute::{ExtractionModel, Field, Point};
pub use schema::{HeatmapConfig, HeatmapKind, Scenario};
