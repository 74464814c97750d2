//! Input recording and deterministic replay.
//!
//! A session is fully determined by its seed, its setup and the per-frame
//! player inputs. [`InputLog`] captures the last two; [`replay`] feeds them
//! back through a fresh instance.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::components::PlayerInput;
use crate::config::SimulationConfig;
use crate::error::{ReplayError, SimError};
use crate::registry::Registry;
use crate::simulation::Simulation;

/// Inputs applied before one step, by player slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputFrame {
    pub inputs: Vec<(u8, PlayerInput)>,
}

/// A recorded session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputLog {
    pub seed: String,
    pub frames: Vec<InputFrame>,
    /// State hash at the end of recording, if known.
    pub final_hash: Option<u64>,
}

impl InputLog {
    #[must_use]
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            frames: Vec::new(),
            final_hash: None,
        }
    }

    pub fn push(&mut self, inputs: &[(u8, PlayerInput)]) {
        self.frames.push(InputFrame {
            inputs: inputs.to_vec(),
        });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ReplayError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ReplayError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// Rebuild a session from `log`.
///
/// `config` is used with its seed replaced by the log's. `setup` must
/// recreate the session's initial entities exactly as the recording run did.
/// If the log carries a final hash, the replayed state is checked against it.
pub fn replay(
    registry: Rc<Registry>,
    config: SimulationConfig,
    log: &InputLog,
    setup: impl FnOnce(&mut Simulation) -> Result<(), SimError>,
) -> Result<Simulation, ReplayError> {
    let mut sim = Simulation::new(registry, config.with_seed(log.seed.clone()))?;
    setup(&mut sim)?;
    for frame in &log.frames {
        sim.step_with_inputs(&frame.inputs)?;
    }

    if let Some(expected) = log.final_hash {
        let actual = sim.state_hash()?;
        if actual != expected {
            return Err(ReplayError::Diverged { expected, actual });
        }
    }
    info!(frames = log.len(), frame = sim.frame(), "replay complete");
    Ok(sim)
}
