//! Built-in systems.
//!
//! | system          | trigger       | depth  |
//! |-----------------|---------------|--------|
//! | `world_slot`    | `WorldSlot`   | -1     |
//! | `attach`        | `Attach`      | 10     |
//! | `player_input`  | `PlayerInput` | 50     |
//! | `movement`      | `Velocity`    | 100    |
//! | `spatial_index` | `Collider`    | 150    |
//! | `health`        | `Health`      | 300    |
//! | `attach_post`   | `Attach`      | 500    |
//! | `owner`         | `Owner`       | 1000   |

mod attach;
mod health;
mod movement;
mod owner;
mod spatial_index;
mod world_slot;

pub use attach::{AttachPostSystem, AttachSystem};
pub use health::{HealthSystem, damage};
pub use movement::{MovementSystem, PlayerInputSystem};
pub use owner::OwnerSystem;
pub use spatial_index::SpatialIndexSystem;
pub use world_slot::WorldSlotSystem;
