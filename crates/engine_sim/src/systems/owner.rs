//! Ownership links between `Owner` and the owner's `Owned` list.
//!
//! A dead owner clears the link; the `Owner` component itself stays.

use engine_component::Entity;
use tracing::debug;

use crate::components::{Owned, Owner};
use crate::context::Ctx;
use crate::error::SimError;
use crate::system::{System, SystemDescriptor};

/// Add `entity` to `owner`'s `Owned` list, creating the component if needed.
fn link(ctx: &mut Ctx<'_>, owner: Entity, entity: Entity) -> Result<(), SimError> {
    if ctx.has_component::<Owned>(owner) {
        ctx.update_component::<Owned, _>(owner, |owned| {
            if !owned.owned.contains(&entity) {
                owned.owned.push(entity);
            }
        })?;
        return Ok(());
    }
    ctx.add_component(
        owner,
        Owned {
            owned: vec![entity],
        },
    )
}

/// Keeps `Owned` on the owner in step with `Owner` on the owned entity and
/// clears links to owners that no longer exist.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnerSystem;

impl System for OwnerSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::of::<Owner>("owner", 1000.0)
    }

    fn init(&self, ctx: &mut Ctx<'_>, entity: Entity) -> Result<(), SimError> {
        match ctx.get_component::<Owner>(entity)?.owner {
            Some(owner) if owner != entity && ctx.is_alive(owner) => link(ctx, owner, entity),
            _ => Ok(()),
        }
    }

    fn run(&self, ctx: &mut Ctx<'_>, entity: Entity) -> Result<(), SimError> {
        let Some(owner) = ctx.get_component::<Owner>(entity)?.owner else {
            return Ok(());
        };
        if !ctx.is_alive(owner) {
            debug!(%entity, %owner, "clearing stale owner");
            ctx.update_component::<Owner, _>(entity, |o| o.owner = None)?;
            return Ok(());
        }
        let linked = ctx
            .store()
            .get::<Owned>(owner)
            .is_some_and(|owned| owned.owned.contains(&entity));
        if !linked && owner != entity {
            link(ctx, owner, entity)?;
        }
        Ok(())
    }

    fn cleanup(&self, ctx: &mut Ctx<'_>, entity: Entity) -> Result<(), SimError> {
        let Some(owner) = ctx.get_component::<Owner>(entity)?.owner else {
            return Ok(());
        };
        if ctx.has_component::<Owned>(owner) {
            ctx.update_component::<Owned, _>(owner, |owned| owned.owned.retain(|&e| e != entity))?;
        }
        Ok(())
    }
}
