//! # engine_sim
//!
//! Deterministic, frame-stepped simulation built on `engine_component`.
//!
//! - [`Registry`] collects component kinds and [`System`]s and sorts them into
//!   a fixed pipeline, rejecting unsatisfiable dependencies up front.
//! - [`Simulation`] owns one instance: entity lifecycle, the frame step,
//!   checkpoints and eject/inject.
//! - [`Ctx`] is what systems see. Structural changes made through it during a
//!   step are deferred until every system has run.
//! - Built-in [`systems`] maintain ownership and attachment links, rebase
//!   world slots, move players and index colliders in a [`SpatialMap`].
//! - [`Random`] is a seedable ARC4 generator; with [`InputLog`] and
//!   [`replay`] a session can be reproduced exactly.

mod commands;
pub mod components;
pub mod config;
pub mod context;
pub mod error;
pub mod random;
pub mod registry;
pub mod relations;
pub mod replay;
pub mod scheduler;
pub mod simulation;
pub mod spatial;
pub mod system;
pub mod systems;
pub mod world;

pub use config::{FIXED_STEP_MS, SimulationConfig};
pub use context::Ctx;
pub use error::{ReplayError, SchedulerError, SimError};
pub use random::{Random, generate};
pub use registry::{Registry, RegistryBuilder};
pub use relations::{eject_bundle, propagate_death, propagate_kill};
pub use replay::{InputFrame, InputLog, replay};
pub use scheduler::{Pipeline, PipelineEntry};
pub use simulation::{EjectedEntity, EjectedRecord, Simulation};
pub use spatial::{CellRect, SpatialEntry, SpatialMap};
pub use system::{ModContext, System, SystemDescriptor};
pub use world::World;
