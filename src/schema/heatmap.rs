//! Heatmap configuration types.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Field synthesis settings for a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatmapConfig {
    /// Grid edge length in cells.
    pub size: usize,
    /// Generator to use.
    #[serde(default)]
    pub kind: HeatmapKind,
    /// Multiply the field by the central/fracture geological mask.
    #[serde(default)]
    pub geological_mask: bool,
    /// Seed for the generator. Falls back to the scenario seed.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Cache file. Loaded when present, written after synthesis otherwise.
    #[serde(default)]
    pub cache: Option<std::path::PathBuf>,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            size: 200,
            kind: HeatmapKind::default(),
            geological_mask: false,
            seed: None,
            cache: None,
        }
    }
}

/// Heatmap generators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HeatmapKind {
    /// `1 / (1 + d)` falloff from a center cell (grid center when unset).
    Distance {
        #[serde(default)]
        center: Option<(usize, usize)>,
    },
    /// Uniform noise in `[0, 1)`.
    Random,
    /// Multi-octave Perlin noise normalized to `[0, 1]`.
    Perlin {
        #[serde(default = "default_perlin_scale")]
        scale: f64,
        #[serde(default = "default_perlin_octaves")]
        octaves: usize,
    },
    /// Horizontal ramp from 0 at the left edge to 1 at the right.
    Gradient,
    /// Sum of random gaussian blobs normalized to `[0, 1]`.
    Blobs {
        #[serde(default = "default_blob_count")]
        count: usize,
    },
    /// Diamond-square fractal terrain clipped to `[0, 1]`.
    Fractal {
        #[serde(default = "default_fractal_scale")]
        initial_scale: f64,
    },
}

impl Default for HeatmapKind {
    fn default() -> Self {
        Self::Perlin {
            scale: default_perlin_scale(),
            octaves: default_perlin_octaves(),
        }
    }
}

fn default_perlin_scale() -> f64 {
    80.0
}
fn default_perlin_octaves() -> usize {
    3
}
fn default_blob_count() -> usize {
    5
}
fn default_fractal_scale() -> f64 {
    0.5
}

impl HeatmapKind {
    /// Short name used on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Distance { .. } => "distance",
            Self::Random => "random",
            Self::Perlin { .. } => "perlin",
            Self::Gradient => "gradient",
            Self::Blobs { .. } => "blobs",
            Self::Fractal { .. } => "fractal",
        }
    }
}

impl FromStr for HeatmapKind {
    type Err = ConfigError;

    /// Parse a generator name, using default parameters for it.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "distance" => Ok(Self::Distance { center: None }),
            "random" => Ok(Self::Random),
            "perlin" => Ok(Self::default()),
            "gradient" => Ok(Self::Gradient),
            "blobs" => Ok(Self::Blobs {
                count: default_blob_count(),
            }),
            "fractal" | "diamond_square" => Ok(Self::Fractal {
                initial_scale: default_fractal_scale(),
            }),
            _ => Err(ConfigError::UnknownHeatmap(s.to_string())),
        }
    }
}

impl HeatmapConfig {
    /// Validate heatmap parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 {
            return Err(ConfigError::InvalidSize);
        }
        match &self.kind {
            HeatmapKind::Distance {
                center: Some((row, col)),
            } if *row >= self.size || *col >= self.size => Err(ConfigError::InvalidHeatmap(
                format!("center ({row}, {col}) outside {0}x{0} grid", self.size),
            )),
            HeatmapKind::Perlin { scale, octaves } => {
                if *scale <= 0.0 {
                    Err(ConfigError::InvalidHeatmap(format!(
                        "perlin scale {scale} must be positive"
                    )))
                } else if *octaves == 0 {
                    Err(ConfigError::InvalidHeatmap(
                        "perlin octaves must be at least 1".into(),
                    ))
                } else {
                    Ok(())
                }
            }
            HeatmapKind::Blobs { count: 0 } => Err(ConfigError::InvalidHeatmap(
                "blob count must be at least 1".into(),
            )),
            HeatmapKind::Fractal { initial_scale } if *initial_scale < 0.0 => {
                Err(ConfigError::InvalidHeatmap(format!(
                    "fractal scale {initial_scale} must be non-negative"
                )))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("random".parse::<HeatmapKind>().unwrap(), HeatmapKind::Random);
        assert_eq!(
            "Perlin".parse::<HeatmapKind>().unwrap(),
            HeatmapKind::default()
        );
        assert!(matches!(
            "voronoi".parse::<HeatmapKind>(),
            Err(ConfigError::UnknownHeatmap(name)) if name == "voronoi"
        ));
    }

    #[test]
    fn test_tagged_serialization() {
        let json = r#"{"size": 33, "kind": {"type": "fractal"}, "geological_mask": true}"#;
        let config: HeatmapConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.size, 33);
        assert_eq!(config.kind, HeatmapKind::Fractal { initial_scale: 0.5 });
        assert!(config.geological_mask);
    }

    #[test]
    fn test_validate_rejects_bad_params() {
        let mut config = HeatmapConfig {
            size: 10,
            kind: HeatmapKind::Distance {
                center: Some((3, 10)),
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.kind = HeatmapKind::Perlin {
            scale: 0.0,
            octaves: 3,
        };
        assert!(config.validate().is_err());

        config.size = 0;
        config.kind = HeatmapKind::Random;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidSize)));
    }
}
