//! # engine_math
//!
//! Math types for the simulation core. Re-exports [`glam`] for linear algebra
//! and defines the spatial types that implement
//! [`Component`](engine_component::Component).

pub mod transform;
pub mod world_space;

// Re-export glam types for convenience.
pub use glam::Vec2;

pub use transform::{Transform, TransformColumn, TransformMut};
pub use world_space::{WORLD_WIDTH, to_world_space, world_of};
