//! Simulation configuration.

use engine_math::WORLD_WIDTH;
use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Fixed time advanced by one step, in milliseconds.
pub const FIXED_STEP_MS: u32 = 16;

/// Per-instance simulation settings.
///
/// Every peer of a session must use identical values; nothing here is read
/// from the environment or the clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed string for the instance RNG.
    pub seed: String,
    /// Time advanced per step, in milliseconds.
    pub fixed_step_ms: u32,
    /// Width of one world-slot window.
    pub world_width: f32,
    /// Spatial hash cell size.
    pub cell_size: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: "default".to_string(),
            fixed_step_ms: FIXED_STEP_MS,
            world_width: WORLD_WIDTH,
            cell_size: 64.0,
        }
    }
}

impl SimulationConfig {
    #[must_use]
    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = seed.into();
        self
    }

    /// Reject sizes the world-slot and spatial code cannot work with.
    pub fn validate(&self) -> Result<(), SimError> {
        for (name, value) in [("world_width", self.world_width), ("cell_size", self.cell_size)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SimError::InvalidConfig(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.fixed_step_ms, 16);
        assert_eq!(config.world_width, WORLD_WIDTH);
    }

    #[test]
    fn test_partial_deserialisation_uses_defaults() {
        let config: SimulationConfig = serde_json::from_str(r#"{"seed": "abc"}"#).unwrap();
        assert_eq!(config.seed, "abc");
        assert_eq!(config.cell_size, 64.0);
        assert_eq!(SimulationConfig::default().with_seed("abc"), config);
    }

    #[test]
    fn test_validate_rejects_degenerate_sizes() {
        assert!(SimulationConfig::default().validate().is_ok());

        let zero_cells: SimulationConfig = serde_json::from_str(r#"{"cell_size": 0.0}"#).unwrap();
        assert!(matches!(zero_cells.validate(), Err(SimError::InvalidConfig(_))));

        let config = SimulationConfig {
            world_width: f32::NAN,
            ..SimulationConfig::default()
        };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));

        let config = SimulationConfig {
            world_width: -10.0,
            ..SimulationConfig::default()
        };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }
}
