//! Runner configuration, read from TOML.

use std::path::Path;

use anyhow::{Context, Result};
use engine_sim::SimulationConfig;
use serde::{Deserialize, Serialize};

/// How long to run and what to report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Frames to step (0 = until interrupted).
    pub frames: u64,
    /// Player slots spawned at start.
    pub players: u8,
    /// Log the state hash every this many frames (0 = only at the end).
    pub hash_interval: u64,
    /// Sleep between frames to hold the fixed step rate.
    pub realtime: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frames: 600,
            players: 2,
            hash_interval: 60,
            realtime: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub simulation: SimulationConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}
