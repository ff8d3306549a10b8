use std::{fs::File, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Every tunable the encounter and generation code reads. Missing keys in a
/// YAML file fall back to the built-in defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub controller: ControllerConfig,
    pub generation: GenerationConfig,
}

impl Tuning {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let tuning = serde_yaml::from_reader(file)?;
        Ok(tuning)
    }

    pub fn from_yaml(source: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub min_weight: f32,
    pub max_weight: f32,
    /// Blend factor for an adaptation's running effectiveness.
    pub effectiveness_smoothing: f32,
    /// Health ratios that trigger phase 2, 3, ... in descending order.
    pub phase_thresholds: Vec<f32>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            min_weight: 0.1,
            max_weight: 3.0,
            effectiveness_smoothing: 0.3,
            phase_thresholds: vec![0.66, 0.33],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub preferred_enemy_chance: f64,
    pub safe_room_chance: f64,
    /// Deaths above this make a forced safe room possible.
    pub safe_room_death_threshold: u32,
    pub smoothing_passes: u32,
    pub min_room_side: i32,
    /// Most recent room ids remembered for feedback; older ones are forgotten.
    pub feedback_memory: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            preferred_enemy_chance: 0.6,
            safe_room_chance: 0.3,
            safe_room_death_threshold: 5,
            smoothing_passes: 3,
            min_room_side: 5,
            feedback_memory: 256,
        }
    }
}
