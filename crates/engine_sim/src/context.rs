//! The context handed to systems: world state plus the registry.
//!
//! [`Ctx`] is where structural changes happen. Adding or removing entities
//! and components fires the `init` / `cleanup` callbacks of every system
//! triggered by the affected kind. While a step is running those changes are
//! queued and applied after the last system, see [`crate::commands`].

use std::ops::{Deref, DerefMut};

use engine_component::{Category, Component, ComponentTypeId, Entity};
use serde_json::Value;
use tracing::debug;

use crate::commands::{Command, InsertFn};
use crate::error::SimError;
use crate::registry::Registry;
use crate::system::{ModContext, System};
use crate::world::World;

/// Mutable access to one simulation instance during a callback.
pub struct Ctx<'a> {
    world: &'a mut World,
    registry: &'a Registry,
}

impl Deref for Ctx<'_> {
    type Target = World;

    fn deref(&self) -> &World {
        &*self.world
    }
}

impl DerefMut for Ctx<'_> {
    fn deref_mut(&mut self) -> &mut World {
        &mut *self.world
    }
}

impl<'a> Ctx<'a> {
    pub fn new(world: &'a mut World, registry: &'a Registry) -> Self {
        Self { world, registry }
    }

    #[must_use]
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// The first-registered system triggered by `kind`.
    #[must_use]
    pub fn get_system(&self, kind: ComponentTypeId) -> Option<&'a dyn System> {
        self.registry.get_system(kind)
    }

    /// Allocate a new, empty entity. Ids are handed out immediately, even
    /// mid-step.
    pub fn add_entity(&mut self) -> Entity {
        self.world.allocator.allocate()
    }

    /// Remove an entity and every component it holds. Removing an entity
    /// that is not alive is a no-op.
    pub fn remove_entity(&mut self, entity: Entity) -> Result<(), SimError> {
        if self.world.in_step {
            if self.world.is_alive(entity) {
                self.world.commands.push(Command::RemoveEntity(entity));
            }
            return Ok(());
        }
        self.destroy(entity)
    }

    /// Attach `value` to `entity`, replacing any existing record of the kind.
    pub fn add_component<T: Component>(
        &mut self,
        entity: Entity,
        value: T,
    ) -> Result<(), SimError> {
        if !self.world.is_alive(entity) {
            return Err(SimError::InactiveEntity(entity));
        }
        let kind = T::component_type_id();
        let insert: InsertFn = Box::new(move |store| store.insert(entity, value));
        if self.world.in_step {
            self.world.commands.push(Command::Insert {
                entity,
                kind,
                insert,
            });
            return Ok(());
        }
        self.attach(entity, kind, insert)
    }

    /// Attach a component of a kind named at runtime, from partial JSON
    /// merged over the kind's defaults.
    pub fn add_component_json(
        &mut self,
        kind: &str,
        entity: Entity,
        data: Option<Value>,
    ) -> Result<(), SimError> {
        if !self.world.is_alive(entity) {
            return Err(SimError::InactiveEntity(entity));
        }
        if self.world.in_step {
            self.world.commands.push(Command::InsertJson {
                entity,
                kind: kind.to_string(),
                data,
            });
            return Ok(());
        }
        self.attach_json(kind, entity, data)
    }

    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<(), SimError> {
        self.remove_component_kind(T::component_type_id(), entity)
    }

    /// Detach a kind from an entity. Absent components are a no-op.
    pub fn remove_component_kind(
        &mut self,
        kind: ComponentTypeId,
        entity: Entity,
    ) -> Result<(), SimError> {
        if self.world.in_step {
            if self.world.store.has_kind(kind, entity) {
                self.world.commands.push(Command::Remove { entity, kind });
            }
            return Ok(());
        }
        self.detach(kind, entity)
    }

    /// Invoke the reactive systems of `category` on `entities`.
    ///
    /// Every system whose descriptor is of the category reacts once for each
    /// listed entity holding its trigger kind, ordered by the system's depth,
    /// with `context` visible through [`World::mod_context`] and `owner` set
    /// to the reacting entity.
    pub fn run_mods(
        &mut self,
        entities: &[Entity],
        category: Category,
        context: ModContext,
    ) -> Result<(), SimError> {
        let registry = self.registry;
        let mut seen: Vec<Entity> = Vec::new();
        let mut reactions: Vec<(f32, usize, ComponentTypeId, Entity)> = Vec::new();
        for &entity in entities {
            if seen.contains(&entity) || !self.world.is_alive(entity) {
                continue;
            }
            seen.push(entity);
            for kind in self.world.store.kinds_of(entity) {
                for entry in registry.pipeline().for_kind(kind) {
                    if registry.descriptor(entry.system).category == category {
                        reactions.push((entry.depth, entry.system, kind, entity));
                    }
                }
            }
        }
        reactions.sort_by(|a, b| a.0.total_cmp(&b.0));

        let previous = self.world.mod_context.take();
        let mut result = Ok(());
        for (_, system, kind, entity) in reactions {
            if !self.world.store.has_kind(kind, entity) {
                continue;
            }
            self.world.mod_context = Some(ModContext {
                owner: Some(entity),
                ..context
            });
            result = registry.system(system).run(self, entity);
            if result.is_err() {
                break;
            }
        }
        self.world.mod_context = previous;
        result
    }

    /// Fire `creator`'s entity-creation reactions for a newly spawned entity.
    pub fn notify_created(&mut self, creator: Entity, spawned: Entity) -> Result<(), SimError> {
        self.run_mods(
            &[creator],
            Category::OnEntityCreation,
            ModContext {
                spawned: Some(spawned),
                ..ModContext::default()
            },
        )
    }

    /// Run every non-reactive system once, in pipeline order.
    pub(crate) fn run_pipeline(&mut self) -> Result<(), SimError> {
        let registry = self.registry;
        for entry in registry.pipeline().entries() {
            if registry.descriptor(entry.system).is_reactive() {
                continue;
            }
            let actives = self.world.store.entities_of(entry.kind).to_vec();
            registry.system(entry.system).run_all(self, &actives)?;
        }
        Ok(())
    }

    /// Apply queued structural changes until none remain.
    pub(crate) fn apply_commands(&mut self) -> Result<(), SimError> {
        loop {
            let batch = self.world.commands.drain();
            if batch.is_empty() {
                return Ok(());
            }
            debug!(count = batch.len(), "applying deferred commands");
            for command in batch {
                self.apply(command)?;
            }
        }
    }

    fn apply(&mut self, command: Command) -> Result<(), SimError> {
        match command {
            Command::RemoveEntity(entity) => self.destroy(entity),
            Command::Insert {
                entity,
                kind,
                insert,
            } => {
                if !self.world.is_alive(entity) {
                    debug!(%entity, "dropping insert for removed entity");
                    return Ok(());
                }
                self.attach(entity, kind, insert)
            }
            Command::InsertJson { entity, kind, data } => {
                if !self.world.is_alive(entity) {
                    debug!(%entity, kind = %kind, "dropping insert for removed entity");
                    return Ok(());
                }
                self.attach_json(&kind, entity, data)
            }
            Command::Remove { entity, kind } => self.detach(kind, entity),
        }
    }

    fn attach(
        &mut self,
        entity: Entity,
        kind: ComponentTypeId,
        insert: InsertFn,
    ) -> Result<(), SimError> {
        if self.world.store.has_kind(kind, entity) {
            self.cleanup_kind(kind, entity)?;
        }
        insert(&mut self.world.store)?;
        self.init_kind(kind, entity)
    }

    /// Validates `data` before the held record, if any, is cleaned up, so a
    /// rejected record leaves the old one and its links intact.
    fn attach_json(
        &mut self,
        kind: &str,
        entity: Entity,
        data: Option<Value>,
    ) -> Result<(), SimError> {
        let type_id = self.world.store.validate_json(kind, data.as_ref())?;
        if self.world.store.has_kind(type_id, entity) {
            self.cleanup_kind(type_id, entity)?;
        }
        self.world.store.insert_json(kind, entity, data)?;
        self.init_kind(type_id, entity)
    }

    fn detach(&mut self, kind: ComponentTypeId, entity: Entity) -> Result<(), SimError> {
        if !self.world.store.has_kind(kind, entity) {
            return Ok(());
        }
        self.cleanup_kind(kind, entity)?;
        self.world.store.remove_kind(kind, entity);
        Ok(())
    }

    /// Detach every kind in pipeline order, then free the id.
    fn destroy(&mut self, entity: Entity) -> Result<(), SimError> {
        if !self.world.is_alive(entity) {
            return Ok(());
        }
        let registry = self.registry;
        let mut kinds: Vec<ComponentTypeId> = Vec::new();
        for entry in registry.pipeline().entries() {
            if !kinds.contains(&entry.kind) {
                kinds.push(entry.kind);
            }
        }
        for kind in kinds {
            self.detach(kind, entity)?;
        }
        self.world.store.remove_all(entity);
        self.world.allocator.release(entity);
        Ok(())
    }

    fn init_kind(&mut self, kind: ComponentTypeId, entity: Entity) -> Result<(), SimError> {
        let registry = self.registry;
        for (_, system) in registry.systems_for(kind) {
            system.init(self, entity)?;
        }
        Ok(())
    }

    fn cleanup_kind(&mut self, kind: ComponentTypeId, entity: Entity) -> Result<(), SimError> {
        let registry = self.registry;
        for (_, system) in registry.systems_for(kind) {
            system.cleanup(self, entity)?;
        }
        Ok(())
    }
}
