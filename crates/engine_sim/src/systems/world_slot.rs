//! World-slot rebasing and tracking of the camera target's world.

use engine_component::Entity;
use engine_math::to_world_space;

use crate::components::{CameraTarget, WorldSlot};
use crate::context::Ctx;
use crate::error::SimError;
use crate::system::{System, SystemDescriptor};

/// Rebases a `WorldSlot` entity's x coordinate into its slot's window on the
/// first frame it has a transform, and tracks the camera target's slot as the
/// current world.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorldSlotSystem;

impl System for WorldSlotSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::of::<WorldSlot>("world_slot", -1.0)
    }

    fn run(&self, ctx: &mut Ctx<'_>, entity: Entity) -> Result<(), SimError> {
        let slot = *ctx.get_component::<WorldSlot>(entity)?;

        let followed = ctx
            .store()
            .get::<CameraTarget>(ctx.core_entity())
            .and_then(|camera| camera.entity);
        if followed == Some(entity) {
            ctx.set_current_world(slot.world);
        }

        if slot.rebased {
            return Ok(());
        }
        let width = ctx.config().world_width;
        let Some(mut transform) = ctx.transforms_mut()?.entity_mut(entity) else {
            return Ok(());
        };
        let x = to_world_space(slot.world, transform.x(), width);
        transform.set_x(x);
        ctx.update_component::<WorldSlot, _>(entity, |s| s.rebased = true)?;
        Ok(())
    }
}
