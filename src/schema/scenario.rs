//! Scenario configuration for well placement runs.
//!
//! A scenario bundles the heatmap to optimize over with every knob of the
//! evolutionary placement engine. Scenarios are plain JSON files:
//!
//! ```json
//! {
//!   "name": "perlin-90",
//!   "field": { "size": 200, "kind": { "type": "perlin", "scale": 80.0, "octaves": 3 } },
//!   "wells": 90,
//!   "generations": 15,
//!   "selection": { "mode": "fixed", "count": 30 },
//!   "mate": "nearest",
//!   "centroid": "mass"
//! }
//! ```

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::HeatmapConfig;

/// Top-level configuration for one placement run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Human-readable scenario name.
    #[serde(default = "default_name")]
    pub name: String,
    /// Field the wells are placed on.
    #[serde(default)]
    pub field: HeatmapConfig,
    /// Number of wells (population size).
    #[serde(default = "default_wells")]
    pub wells: usize,
    /// Fixed number of generations.
    #[serde(default = "default_generations")]
    pub generations: usize,
    /// Maximum random offset, in cells, added to each offspring coordinate.
    #[serde(default = "default_jitter")]
    pub jitter: f64,
    /// How many individuals breed each generation.
    #[serde(default)]
    pub selection: SelectionSize,
    /// Top-ranked individuals kept unconditionally.
    #[serde(default)]
    pub elite_count: usize,
    /// Fill non-elite slots by fitness-proportional sampling instead of rank.
    #[serde(default)]
    pub weighted_selection: bool,
    /// Mate selection rule.
    #[serde(default)]
    pub mate: MatePolicy,
    /// Offspring position rule.
    #[serde(default)]
    pub centroid: CentroidPolicy,
    /// Fitness exponent for roulette mate selection.
    #[serde(default = "default_exponent")]
    pub weight_fitness: f64,
    /// Proximity exponent for roulette-by-distance mate selection.
    #[serde(default = "default_exponent")]
    pub weight_distance: f64,
    /// Proximity penalty applied during fitness evaluation.
    #[serde(default)]
    pub penalty: PenaltyConfig,
    /// Post-recombination merge of over-close offspring. Disabled when absent.
    #[serde(default)]
    pub merge: Option<MergeConfig>,
    /// Initial placement strategy.
    #[serde(default)]
    pub initial: InitialPlacement,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: default_name(),
            field: HeatmapConfig::default(),
            wells: default_wells(),
            generations: default_generations(),
            jitter: default_jitter(),
            selection: SelectionSize::default(),
            elite_count: 0,
            weighted_selection: false,
            mate: MatePolicy::default(),
            centroid: CentroidPolicy::default(),
            weight_fitness: default_exponent(),
            weight_distance: default_exponent(),
            penalty: PenaltyConfig::default(),
            merge: None,
            initial: InitialPlacement::default(),
            random_seed: None,
        }
    }
}

fn default_name() -> String {
    "default".to_string()
}
fn default_wells() -> usize {
    90
}
fn default_generations() -> usize {
    15
}
fn default_jitter() -> f64 {
    1.5
}
fn default_exponent() -> f64 {
    1.0
}

/// Breeding subset size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SelectionSize {
    /// Percentage of the current population, never fewer than two.
    Percentage { percent: u8 },
    /// Fixed count, capped at the population size.
    Fixed { count: usize },
}

impl Default for SelectionSize {
    fn default() -> Self {
        Self::Fixed { count: 30 }
    }
}

impl SelectionSize {
    /// Breeding subset size for a population of `len`.
    pub fn resolve(&self, len: usize) -> usize {
        match *self {
            Self::Percentage { percent } if percent < 100 => {
                (len * percent as usize / 100).max(2).min(len)
            }
            Self::Percentage { .. } => len,
            Self::Fixed { count } => count.min(len),
        }
    }
}

/// Rule for choosing a recombination partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatePolicy {
    /// Closest other individual.
    #[default]
    Nearest,
    /// Next individual in order, wrapping around.
    Sequential,
    /// Fitness-proportional draw among the others.
    Roulette,
    /// Fitness-proportional draw biased toward nearby individuals.
    RouletteDistance,
}

impl MatePolicy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Sequential => "sequential",
            Self::Roulette => "roulette",
            Self::RouletteDistance => "roulette_distance",
        }
    }
}

impl fmt::Display for MatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MatePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nearest" => Ok(Self::Nearest),
            "sequential" => Ok(Self::Sequential),
            "roulette" => Ok(Self::Roulette),
            "roulette_distance" => Ok(Self::RouletteDistance),
            _ => Err(ConfigError::UnknownMatePolicy(s.to_string())),
        }
    }
}

/// Rule for placing an offspring between two parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentroidPolicy {
    /// Arithmetic midpoint.
    Geometric,
    /// Fitness-weighted midpoint.
    #[default]
    Mass,
}

impl CentroidPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Geometric => "geometric",
            Self::Mass => "mass",
        }
    }
}

impl fmt::Display for CentroidPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CentroidPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "geometric" => Ok(Self::Geometric),
            "mass" => Ok(Self::Mass),
            _ => Err(ConfigError::UnknownCentroidPolicy(s.to_string())),
        }
    }
}

/// Linear proximity penalty parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenaltyConfig {
    /// Distance below which neighbors are penalized.
    pub dist_min: f64,
    /// Penalty contributed by a neighbor at distance zero.
    pub penal_max: f64,
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            dist_min: 1.0,
            penal_max: 0.2,
        }
    }
}

/// Merge pass parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    pub dist_min: f64,
    pub penal_max: f64,
    /// Fraction of `penal_max` the pair penalty must reach to merge.
    /// `1.0` only merges coincident offspring.
    #[serde(default = "default_merge_threshold")]
    pub threshold: f64,
}

fn default_merge_threshold() -> f64 {
    1.0
}

/// How the first generation is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum InitialPlacement {
    /// Distinct uniformly random cells.
    #[default]
    Random,
    /// Near-equidistant lattice, optionally with an explicit spacing.
    Lattice {
        #[serde(default)]
        spacing: Option<f64>,
    },
}

// ============================================================================
// Validation
// ============================================================================

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Grid size must be non-zero")]
    InvalidSize,
    #[error("Well count must be non-zero")]
    NoWells,
    #[error("Requested {requested} distinct wells but the grid has only {cells} cells")]
    TooManyWells { requested: usize, cells: usize },
    #[error("Elite count {elite} exceeds target count {target}")]
    EliteExceedsTarget { elite: usize, target: usize },
    #[error("Selection percentage {0} must be between 1 and 100")]
    InvalidPercentage(u8),
    #[error("Fixed selection count must be non-zero")]
    InvalidSelectionCount,
    #[error("Jitter {0} must be non-negative and finite")]
    InvalidJitter(f64),
    #[error("Invalid penalty: {0}")]
    InvalidPenalty(String),
    #[error("Invalid merge settings: {0}")]
    InvalidMerge(String),
    #[error("Invalid mate weight: {0}")]
    InvalidWeight(String),
    #[error("Invalid lattice spacing {0}")]
    InvalidSpacing(f64),
    #[error("Field is {actual}x{actual} but the scenario expects {expected}x{expected}")]
    FieldSizeMismatch { expected: usize, actual: usize },
    #[error("Invalid heatmap: {0}")]
    InvalidHeatmap(String),
    #[error("Unknown mate policy '{0}'")]
    UnknownMatePolicy(String),
    #[error("Unknown centroid policy '{0}'")]
    UnknownCentroidPolicy(String),
    #[error("Unknown heatmap type '{0}'")]
    UnknownHeatmap(String),
}

/// Errors loading a scenario file.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("Failed to read scenario: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse scenario: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Scenario validation failed: {0}")]
    Invalid(#[from] ConfigError),
}

impl PenaltyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.dist_min >= 0.0 && self.dist_min.is_finite()) {
            return Err(ConfigError::InvalidPenalty(format!(
                "dist_min {} must be non-negative",
                self.dist_min
            )));
        }
        if !(self.penal_max >= 0.0 && self.penal_max.is_finite()) {
            return Err(ConfigError::InvalidPenalty(format!(
                "penal_max {} must be non-negative",
                self.penal_max
            )));
        }
        Ok(())
    }
}

impl MergeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.dist_min > 0.0 && self.dist_min.is_finite()) {
            return Err(ConfigError::InvalidMerge(format!(
                "dist_min {} must be positive",
                self.dist_min
            )));
        }
        if !(self.penal_max > 0.0 && self.penal_max.is_finite()) {
            return Err(ConfigError::InvalidMerge(format!(
                "penal_max {} must be positive",
                self.penal_max
            )));
        }
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(ConfigError::InvalidMerge(format!(
                "threshold {} must be in (0, 1]",
                self.threshold
            )));
        }
        Ok(())
    }
}

impl Scenario {
    /// Load and validate a scenario from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let text = fs::read_to_string(path)?;
        let scenario: Scenario = serde_json::from_str(&text)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Validate scenario configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.field.validate()?;

        if self.wells == 0 {
            return Err(ConfigError::NoWells);
        }

        let cells = self.field.size * self.field.size;
        if self.initial == InitialPlacement::Random && self.wells > cells {
            return Err(ConfigError::TooManyWells {
                requested: self.wells,
                cells,
            });
        }

        if self.elite_count > self.wells {
            return Err(ConfigError::EliteExceedsTarget {
                elite: self.elite_count,
                target: self.wells,
            });
        }

        match self.selection {
            SelectionSize::Percentage { percent } if percent == 0 || percent > 100 => {
                return Err(ConfigError::InvalidPercentage(percent));
            }
            SelectionSize::Fixed { count: 0 } => return Err(ConfigError::InvalidSelectionCount),
            _ => {}
        }

        if !(self.jitter >= 0.0 && self.jitter.is_finite()) {
            return Err(ConfigError::InvalidJitter(self.jitter));
        }

        for (name, value) in [
            ("weight_fitness", self.weight_fitness),
            ("weight_distance", self.weight_distance),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidWeight(format!(
                    "{name} {value} must be finite"
                )));
            }
        }

        self.penalty.validate()?;
        if let Some(merge) = &self.merge {
            merge.validate()?;
        }

        if let InitialPlacement::Lattice {
            spacing: Some(spacing),
        } = self.initial
            && !(spacing > 0.0 && spacing.is_finite())
        {
            return Err(ConfigError::InvalidSpacing(spacing));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scenario_valid() {
        assert!(Scenario::default().validate().is_ok());
    }

    #[test]
    fn test_serialization() {
        let scenario = Scenario {
            merge: Some(MergeConfig {
                dist_min: 5.0,
                penal_max: 1.0,
                threshold: 1.0,
            }),
            initial: InitialPlacement::Lattice { spacing: Some(4.0) },
            ..Default::default()
        };
        let json = serde_json::to_string(&scenario).unwrap();
        let parsed: Scenario = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.wells, scenario.wells);
        assert_eq!(parsed.merge, scenario.merge);
        assert_eq!(parsed.initial, scenario.initial);
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let json = r#"{"wells": 4, "generations": 3, "mate": "roulette_distance", "centroid": "geometric"}"#;
        let scenario: Scenario = serde_json::from_str(json).unwrap();
        assert_eq!(scenario.mate, MatePolicy::RouletteDistance);
        assert_eq!(scenario.centroid, CentroidPolicy::Geometric);
        assert_eq!(scenario.jitter, 1.5);
        assert_eq!(scenario.penalty, PenaltyConfig::default());
        assert!(scenario.merge.is_none());
    }

    #[test]
    fn test_unknown_policy_in_json_is_rejected() {
        let json = r#"{"mate": "telepathic"}"#;
        let err = serde_json::from_str::<Scenario>(json).unwrap_err();
        assert!(err.to_string().contains("telepathic"));
    }

    #[test]
    fn test_policy_names_parse() {
        assert_eq!("nearest".parse::<MatePolicy>().unwrap(), MatePolicy::Nearest);
        assert_eq!(
            "ROULETTE_DISTANCE".parse::<MatePolicy>().unwrap(),
            MatePolicy::RouletteDistance
        );
        assert_eq!(
            "mass".parse::<CentroidPolicy>().unwrap(),
            CentroidPolicy::Mass
        );
        assert_eq!(
            "closest".parse::<MatePolicy>(),
            Err(ConfigError::UnknownMatePolicy("closest".into()))
        );
        let err = "barycentric".parse::<CentroidPolicy>().unwrap_err();
        assert!(err.to_string().contains("barycentric"));
    }

    #[test]
    fn test_selection_size_resolve() {
        assert_eq!(SelectionSize::Percentage { percent: 10 }.resolve(90), 9);
        assert_eq!(SelectionSize::Percentage { percent: 1 }.resolve(50), 2);
        assert_eq!(SelectionSize::Percentage { percent: 100 }.resolve(7), 7);
        assert_eq!(SelectionSize::Fixed { count: 30 }.resolve(12), 12);
        assert_eq!(SelectionSize::Fixed { count: 30 }.resolve(90), 30);
    }

    #[test]
    fn test_validation_errors() {
        let too_many = Scenario {
            wells: 101,
            field: HeatmapConfig {
                size: 10,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            too_many.validate(),
            Err(ConfigError::TooManyWells {
                requested: 101,
                cells: 100
            })
        );

        let elite = Scenario {
            wells: 4,
            elite_count: 5,
            ..Default::default()
        };
        assert!(matches!(
            elite.validate(),
            Err(ConfigError::EliteExceedsTarget { elite: 5, target: 4 })
        ));

        let merge = Scenario {
            merge: Some(MergeConfig {
                dist_min: 0.0,
                penal_max: 1.0,
                threshold: 1.0,
            }),
            ..Default::default()
        };
        assert!(matches!(merge.validate(), Err(ConfigError::InvalidMerge(_))));

        let pct = Scenario {
            selection: SelectionSize::Percentage { percent: 0 },
            ..Default::default()
        };
        assert_eq!(pct.validate(), Err(ConfigError::InvalidPercentage(0)));
    }

    #[test]
    fn test_load_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"wells": 0}"#).unwrap();
        assert!(matches!(
            Scenario::load(&path),
            Err(ScenarioError::Invalid(ConfigError::NoWells))
        ));

        let missing = dir.path().join("missing.json");
        assert!(matches!(Scenario::load(missing), Err(ScenarioError::Io(_))));
    }
}
