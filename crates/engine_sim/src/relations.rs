//! Share-list propagation.
//!
//! An entity can nominate others to react on its behalf: a projectile lists
//! its shooter in `ShareOnKill`, so the shooter's `OnKill` components react to
//! kills the projectile scores. Ejection follows `ShareOnEject` transitively.

use engine_component::{Category, Entity};
use tracing::debug;

use crate::components::{KillStats, ShareOnDeath, ShareOnEject, ShareOnKill};
use crate::context::Ctx;
use crate::error::SimError;
use crate::system::ModContext;
use crate::world::World;

/// `source`'s kill reactions for `victim`, fanned out over `ShareOnKill`.
pub fn propagate_kill(ctx: &mut Ctx<'_>, source: Entity, victim: Entity) -> Result<(), SimError> {
    let mut entities = vec![source];
    if let Some(share) = ctx.store().get::<ShareOnKill>(source) {
        entities.extend_from_slice(&share.entities);
    }
    bump_stats(ctx, |stats| stats.kills += 1)?;
    debug!(%source, %victim, sharers = entities.len() - 1, "propagating kill");
    ctx.run_mods(
        &entities,
        Category::OnKill,
        ModContext {
            killed_entity: Some(victim),
            kill_source: Some(source),
            ..ModContext::default()
        },
    )
}

/// `victim`'s death reactions, fanned out over `ShareOnDeath`.
pub fn propagate_death(
    ctx: &mut Ctx<'_>,
    victim: Entity,
    source: Option<Entity>,
) -> Result<(), SimError> {
    let mut entities = vec![victim];
    if let Some(share) = ctx.store().get::<ShareOnDeath>(victim) {
        entities.extend_from_slice(&share.entities);
    }
    bump_stats(ctx, |stats| stats.deaths += 1)?;
    debug!(%victim, sharers = entities.len() - 1, "propagating death");
    ctx.run_mods(
        &entities,
        Category::OnDeath,
        ModContext {
            killed_entity: Some(victim),
            kill_source: source,
            ..ModContext::default()
        },
    )
}

fn bump_stats(ctx: &mut Ctx<'_>, f: impl FnOnce(&mut KillStats)) -> Result<(), SimError> {
    let core = ctx.core_entity();
    if ctx.has_component::<KillStats>(core) {
        ctx.update_component::<KillStats, _>(core, f)?;
    }
    Ok(())
}

/// `root` followed by every live entity reachable through `ShareOnEject`,
/// breadth first, each listed once.
#[must_use]
pub fn eject_bundle(world: &World, root: Entity) -> Vec<Entity> {
    let mut bundle = vec![root];
    let mut next = 0;
    while next < bundle.len() {
        let entity = bundle[next];
        next += 1;
        let Some(share) = world.store().get::<ShareOnEject>(entity) else {
            continue;
        };
        for &shared in &share.entities {
            if world.is_alive(shared) && !bundle.contains(&shared) {
                bundle.push(shared);
            }
        }
    }
    bundle
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::config::SimulationConfig;
    use crate::registry::Registry;
    use crate::simulation::Simulation;

    #[test]
    fn test_eject_bundle_follows_shares_once() {
        let registry = Rc::new(Registry::with_builtins().unwrap());
        let mut sim = Simulation::new(registry, SimulationConfig::default()).unwrap();
        let root = sim.add_entity();
        let a = sim.add_entity();
        let b = sim.add_entity();
        let gone = sim.add_entity();
        sim.remove_entity(gone).unwrap();

        sim.add_component(root, ShareOnEject { entities: vec![a, gone] })
            .unwrap();
        sim.add_component(a, ShareOnEject { entities: vec![b, root] })
            .unwrap();
        sim.add_component(b, ShareOnEject { entities: vec![a] })
            .unwrap();

        assert_eq!(eject_bundle(&sim, root), vec![root, a, b]);
        assert_eq!(eject_bundle(&sim, b), vec![b, a, root]);
    }

    #[test]
    fn test_death_without_sharers_still_counted() {
        let registry = Rc::new(Registry::with_builtins().unwrap());
        let mut sim = Simulation::new(registry, SimulationConfig::default()).unwrap();
        let victim = sim.add_entity();
        propagate_death(&mut sim.ctx(), victim, None).unwrap();
        let stats = sim.get_component::<KillStats>(sim.core_entity()).unwrap();
        assert_eq!(stats.deaths, 1);
        assert_eq!(stats.kills, 0);
    }
}
