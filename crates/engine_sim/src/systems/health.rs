//! Damage, death and kill credit.

use engine_component::Entity;

use crate::components::Health;
use crate::context::Ctx;
use crate::error::SimError;
use crate::relations::{propagate_death, propagate_kill};
use crate::system::{System, SystemDescriptor};

/// Subtract `amount` from `target`'s health and remember who hit it.
///
/// Returns whether the target is now at or below zero. The death itself is
/// resolved by [`HealthSystem`] on its next run.
pub fn damage(
    ctx: &mut Ctx<'_>,
    target: Entity,
    amount: i32,
    source: Option<Entity>,
) -> Result<bool, SimError> {
    let dead = ctx.update_component::<Health, _>(target, |health| {
        health.current -= amount;
        if source.is_some() {
            health.last_hit_by = source;
        }
        health.current <= 0
    })?;
    Ok(dead)
}

/// Resolves deaths: fans out the death and kill reactions, then removes the
/// entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthSystem;

impl System for HealthSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::of::<Health>("health", 300.0)
    }

    fn run(&self, ctx: &mut Ctx<'_>, entity: Entity) -> Result<(), SimError> {
        let health = *ctx.get_component::<Health>(entity)?;
        if health.current > 0 {
            return Ok(());
        }
        let killer = health.last_hit_by.filter(|&source| ctx.is_alive(source));
        propagate_death(ctx, entity, killer)?;
        if let Some(killer) = killer {
            propagate_kill(ctx, killer, entity)?;
        }
        ctx.remove_entity(entity)
    }
}
