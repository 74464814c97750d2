//! Fixed-step session loop.
//!
//! Drives one [`Simulation`] with scripted player input drawn from a
//! generator seeded next to the simulation's own, so a session is fully
//! determined by its config.

use std::rc::Rc;
use std::time::{Duration, Instant};

use engine_sim::components::PlayerInput;
use engine_sim::{InputLog, Random, Registry, SimError, Simulation, generate};
use tracing::{debug, info, warn};

use crate::config::AppConfig;

/// Spawn players into slots `0..players`.
pub fn spawn_players(sim: &mut Simulation, players: u8) -> Result<(), SimError> {
    for slot in 0..players {
        sim.add_player(slot)?;
    }
    Ok(())
}

#[derive(Debug)]
pub struct Session {
    sim: Simulation,
    input: Random,
    players: u8,
    frames: u64,
    hash_interval: u64,
    realtime: bool,
}

impl Session {
    pub fn new(registry: Rc<Registry>, config: &AppConfig) -> Result<Self, SimError> {
        let mut sim = Simulation::new(registry, config.simulation.clone())?;
        spawn_players(&mut sim, config.session.players)?;
        Ok(Self {
            sim,
            input: generate(&format!("{}:input", config.simulation.seed)),
            players: config.session.players,
            frames: config.session.frames,
            hash_interval: config.session.hash_interval,
            realtime: config.session.realtime,
        })
    }

    #[must_use]
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    pub fn start_recording(&mut self) {
        self.sim.start_recording();
    }

    pub fn take_recording(&mut self) -> Result<Option<InputLog>, SimError> {
        self.sim.take_recording()
    }

    fn next_inputs(&mut self) -> Vec<(u8, PlayerInput)> {
        let input = &mut self.input;
        (0..self.players)
            .map(|slot| {
                let value = PlayerInput {
                    move_x: input.float_between(-1.0, 1.0),
                    move_y: input.float_between(-1.0, 1.0),
                    buttons: u32::from(input.chance(0.1)),
                };
                (slot, value)
            })
            .collect()
    }

    /// Step one frame with fresh input.
    pub fn tick(&mut self) -> Result<(), SimError> {
        let inputs = self.next_inputs();
        self.sim.step_with_inputs(&inputs)?;

        let frame = self.sim.frame();
        if self.hash_interval > 0 && frame % self.hash_interval == 0 {
            let hash = self.sim.state_hash()?;
            info!(frame, hash = %format!("{hash:016x}"), "state hash");
        } else {
            debug!(frame, entities = self.sim.entity_count(), "tick");
        }
        Ok(())
    }

    /// Run the configured number of frames and return the final state hash.
    pub fn run(&mut self) -> Result<u64, SimError> {
        let step = Duration::from_millis(u64::from(self.sim.config().fixed_step_ms));
        info!(
            frames = self.frames,
            players = self.players,
            realtime = self.realtime,
            "starting session"
        );

        let mut count = 0u64;
        loop {
            let start = Instant::now();
            self.tick()?;

            count += 1;
            if self.frames > 0 && count >= self.frames {
                break;
            }
            if !self.realtime {
                continue;
            }
            let elapsed = start.elapsed();
            if elapsed < step {
                std::thread::sleep(step - elapsed);
            } else {
                warn!(
                    frame = self.sim.frame(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = step.as_millis() as u64,
                    "frame exceeded time budget"
                );
            }
        }

        let hash = self.sim.state_hash()?;
        info!(frames = count, hash = %format!("{hash:016x}"), "session complete");
        Ok(hash)
    }
}
