//! Player input to velocity, and velocity to position.

use engine_component::Entity;
use engine_math::Vec2;

use crate::components::{PlayerInput, Velocity};
use crate::context::Ctx;
use crate::error::SimError;
use crate::system::{System, SystemDescriptor};

/// Turns a player's movement input into velocity.
#[derive(Debug, Clone, Copy)]
pub struct PlayerInputSystem {
    /// Units per frame at full stick deflection.
    pub speed: f32,
}

impl Default for PlayerInputSystem {
    fn default() -> Self {
        Self { speed: 4.0 }
    }
}

impl System for PlayerInputSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::of::<PlayerInput>("player_input", 50.0)
    }

    fn run(&self, ctx: &mut Ctx<'_>, entity: Entity) -> Result<(), SimError> {
        if !ctx.has_component::<Velocity>(entity) {
            return Ok(());
        }
        let input = *ctx.get_component::<PlayerInput>(entity)?;
        let speed = self.speed;
        ctx.update_component::<Velocity, _>(entity, |velocity| {
            velocity.x = input.move_x.clamp(-1.0, 1.0) * speed;
            velocity.y = input.move_y.clamp(-1.0, 1.0) * speed;
        })?;
        Ok(())
    }
}

/// Applies velocity to the transform once per frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct MovementSystem;

impl System for MovementSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::of::<Velocity>("movement", 100.0).with_dependencies(&["PlayerInput"])
    }

    fn run(&self, ctx: &mut Ctx<'_>, entity: Entity) -> Result<(), SimError> {
        let velocity = *ctx.get_component::<Velocity>(entity)?;
        if velocity.x == 0.0 && velocity.y == 0.0 {
            return Ok(());
        }
        ctx.transforms_mut()?
            .translate(entity, Vec2::new(velocity.x, velocity.y));
        Ok(())
    }
}
