//! One simulation instance: the frame step, the entity API, checkpoints and
//! eject/inject.

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use engine_component::{
    Category, ColumnSnapshot, Component, ComponentRecord, ComponentStore, ComponentTypeId,
    Entity, EntityAllocator, fnv1a,
};
use engine_math::Transform;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::components::{CameraTarget, Collider, Health, KillStats, Player, PlayerInput, Velocity};
use crate::context::Ctx;
use crate::error::SimError;
use crate::random::Random;
use crate::registry::Registry;
use crate::relations::eject_bundle;
use crate::replay::InputLog;
use crate::config::SimulationConfig;
use crate::system::{ModContext, System};
use crate::world::World;

/// Encoded instance state.
#[derive(Serialize)]
struct CheckpointRef<'a> {
    frame: u64,
    time_elapsed: u64,
    current_world: i32,
    core_entity: Entity,
    paused: bool,
    allocator: &'a EntityAllocator,
    rng: &'a Random,
    columns: Vec<ColumnSnapshot>,
}

#[derive(Deserialize)]
struct Checkpoint {
    frame: u64,
    time_elapsed: u64,
    current_world: i32,
    core_entity: Entity,
    paused: bool,
    allocator: EntityAllocator,
    rng: Random,
    columns: Vec<ColumnSnapshot>,
}

/// One entity's components, keyed by kind name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EjectedRecord {
    /// The id the entity had in the instance it left.
    pub id: Entity,
    pub components: Vec<ComponentRecord>,
}

/// An entity and its `ShareOnEject` bundle, detached from a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EjectedEntity {
    pub root: Entity,
    /// The root first, then shared entities in discovery order.
    pub entities: Vec<EjectedRecord>,
}

impl EjectedEntity {
    pub fn to_bytes(&self) -> Result<Vec<u8>, SimError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SimError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// A simulation instance.
///
/// Dereferences to [`World`] for reads and data access. Structural changes go
/// through the methods here, which fire system lifecycle callbacks.
pub struct Simulation {
    registry: Rc<Registry>,
    world: World,
    checkpoints: BTreeMap<String, Vec<u8>>,
    recording: Option<InputLog>,
}

impl Deref for Simulation {
    type Target = World;

    fn deref(&self) -> &World {
        &self.world
    }
}

impl DerefMut for Simulation {
    fn deref_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("frame", &self.world.frame)
            .field("entities", &self.world.entity_count())
            .field("checkpoints", &self.checkpoints.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Simulation {
    /// A fresh instance with every registered kind and a core entity holding
    /// `KillStats` and `CameraTarget`.
    pub fn new(registry: Rc<Registry>, config: SimulationConfig) -> Result<Self, SimError> {
        config.validate()?;
        let mut store = ComponentStore::new();
        for meta in registry.components() {
            store.register_meta(meta.clone());
        }
        let mut world = World::new(config, store);
        let core = world.allocator.allocate();
        world.core_entity = core;
        world.store.insert(core, KillStats::default())?;
        world.store.insert(core, CameraTarget::default())?;

        info!(
            seed = %world.config.seed,
            components = registry.components().len(),
            systems = registry.pipeline().len(),
            "simulation created"
        );

        Ok(Self {
            registry,
            world,
            checkpoints: BTreeMap::new(),
            recording: None,
        })
    }

    /// A context for calling systems or structural APIs directly.
    pub fn ctx(&mut self) -> Ctx<'_> {
        Ctx::new(&mut self.world, &self.registry)
    }

    #[must_use]
    pub fn registry(&self) -> &Rc<Registry> {
        &self.registry
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    #[must_use]
    pub fn get_system(&self, kind: ComponentTypeId) -> Option<&dyn System> {
        self.registry.get_system(kind)
    }

    pub fn add_entity(&mut self) -> Entity {
        self.ctx().add_entity()
    }

    pub fn remove_entity(&mut self, entity: Entity) -> Result<(), SimError> {
        self.ctx().remove_entity(entity)
    }

    pub fn add_component<T: Component>(
        &mut self,
        entity: Entity,
        value: T,
    ) -> Result<(), SimError> {
        self.ctx().add_component(entity, value)
    }

    pub fn add_component_json(
        &mut self,
        kind: &str,
        entity: Entity,
        data: Option<Value>,
    ) -> Result<(), SimError> {
        self.ctx().add_component_json(kind, entity, data)
    }

    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<(), SimError> {
        self.ctx().remove_component::<T>(entity)
    }

    pub fn remove_component_kind(
        &mut self,
        kind: ComponentTypeId,
        entity: Entity,
    ) -> Result<(), SimError> {
        self.ctx().remove_component_kind(kind, entity)
    }

    pub fn run_mods(
        &mut self,
        entities: &[Entity],
        category: Category,
        context: ModContext,
    ) -> Result<(), SimError> {
        self.ctx().run_mods(entities, category, context)
    }

    /// Spawn a player entity bound to an input slot. The first player becomes
    /// the camera target.
    pub fn add_player(&mut self, slot: u8) -> Result<Entity, SimError> {
        let entity = self.add_entity();
        self.add_component(entity, Player { slot })?;
        self.add_component(entity, PlayerInput::default())?;
        self.add_component(entity, Transform::default())?;
        self.add_component(entity, Velocity::default())?;
        self.add_component(
            entity,
            Collider {
                radius: 8.0,
                category: Category::Target,
            },
        )?;
        self.add_component(entity, Health::default())?;

        let core = self.world.core_entity;
        if self.world.has_component::<CameraTarget>(core) {
            self.world.update_component::<CameraTarget, _>(core, |camera| {
                if camera.entity.is_none() {
                    camera.entity = Some(entity);
                }
            })?;
        }
        info!(%entity, slot, "player joined");
        Ok(entity)
    }

    /// Advance one frame: run the pipeline, then apply the structural changes
    /// it requested and age released ids.
    pub fn step(&mut self) -> Result<(), SimError> {
        if self.world.paused {
            debug!(frame = self.world.frame, "paused, step skipped");
            return Ok(());
        }
        self.world.store.clear_dirty();
        self.world.frame += 1;
        self.world.time_elapsed += u64::from(self.world.config.fixed_step_ms);

        self.world.in_step = true;
        let mut ctx = Ctx::new(&mut self.world, &self.registry);
        let result = ctx.run_pipeline();
        ctx.in_step = false;
        if let Err(err) = result {
            let dropped = ctx.commands.len();
            ctx.commands.clear();
            warn!(
                frame = ctx.frame,
                dropped,
                error = %err,
                "step failed, deferred commands discarded"
            );
            return Err(err);
        }
        ctx.apply_commands()?;
        self.world.allocator.flush_released();

        debug!(
            frame = self.world.frame,
            entities = self.world.entity_count(),
            "step complete"
        );
        Ok(())
    }

    /// Write each slot's input to its player, record it if recording, then
    /// step.
    pub fn step_with_inputs(&mut self, inputs: &[(u8, PlayerInput)]) -> Result<(), SimError> {
        if self.world.paused {
            return Ok(());
        }
        for &(slot, input) in inputs {
            match self.world.player_in_slot(slot) {
                Some(player) => self.add_component(player, input)?,
                None => warn!(slot, "input for empty player slot ignored"),
            }
        }
        if let Some(log) = &mut self.recording {
            log.push(inputs);
        }
        self.step()
    }

    /// Start recording inputs passed to [`Simulation::step_with_inputs`].
    pub fn start_recording(&mut self) {
        self.recording = Some(InputLog::new(self.world.config.seed.clone()));
    }

    /// Stop recording and return the log, stamped with the current state
    /// hash.
    pub fn take_recording(&mut self) -> Result<Option<InputLog>, SimError> {
        let Some(mut log) = self.recording.take() else {
            return Ok(None);
        };
        log.final_hash = Some(self.state_hash()?);
        Ok(Some(log))
    }

    /// Encode the full instance state.
    pub fn checkpoint(&self) -> Result<Vec<u8>, SimError> {
        let world = &self.world;
        let checkpoint = CheckpointRef {
            frame: world.frame,
            time_elapsed: world.time_elapsed,
            current_world: world.current_world,
            core_entity: world.core_entity,
            paused: world.paused,
            allocator: &world.allocator,
            rng: &world.rng,
            columns: world.store.snapshot()?,
        };
        Ok(rmp_serde::to_vec_named(&checkpoint)?)
    }

    /// Replace the instance state with an encoded checkpoint. Nothing changes
    /// if the blob does not decode or names an unknown kind.
    pub fn restore(&mut self, bytes: &[u8]) -> Result<(), SimError> {
        let checkpoint: Checkpoint = rmp_serde::from_slice(bytes)?;
        self.world.store.restore(&checkpoint.columns)?;

        let world = &mut self.world;
        world.frame = checkpoint.frame;
        world.time_elapsed = checkpoint.time_elapsed;
        world.current_world = checkpoint.current_world;
        world.core_entity = checkpoint.core_entity;
        world.paused = checkpoint.paused;
        world.allocator = checkpoint.allocator;
        world.rng = checkpoint.rng;
        world.commands.clear();
        world.mod_context = None;
        world.spatial.clear();
        Ok(())
    }

    /// Save the current state under `name`, replacing any earlier save.
    pub fn save_state(&mut self, name: &str) -> Result<(), SimError> {
        let bytes = self.checkpoint()?;
        debug!(name, bytes = bytes.len(), "checkpoint saved");
        self.checkpoints.insert(name.to_string(), bytes);
        Ok(())
    }

    /// Restore a state saved with [`Simulation::save_state`].
    pub fn load_state(&mut self, name: &str) -> Result<(), SimError> {
        let bytes = self
            .checkpoints
            .get(name)
            .cloned()
            .ok_or_else(|| SimError::UnknownCheckpoint(name.to_string()))?;
        self.restore(&bytes)?;
        info!(name, frame = self.world.frame, "checkpoint loaded");
        Ok(())
    }

    #[must_use]
    pub fn has_checkpoint(&self, name: &str) -> bool {
        self.checkpoints.contains_key(name)
    }

    /// FNV-1a over the encoded checkpoint.
    pub fn state_hash(&self) -> Result<u64, SimError> {
        Ok(fnv1a(&self.checkpoint()?))
    }

    /// Remove `entity` and its `ShareOnEject` bundle, returning their
    /// components.
    pub fn eject_entity(&mut self, entity: Entity) -> Result<EjectedEntity, SimError> {
        if !self.world.is_alive(entity) {
            return Err(SimError::InactiveEntity(entity));
        }
        let bundle = eject_bundle(&self.world, entity);

        let mut entities = Vec::with_capacity(bundle.len());
        for &member in &bundle {
            let mut components = Vec::new();
            for kind in self.world.store.kinds_of(member) {
                let (Some(meta), Some(column)) =
                    (self.world.store.meta(kind), self.world.store.column_dyn(kind))
                else {
                    continue;
                };
                components.push(ComponentRecord {
                    kind: meta.name.to_string(),
                    data: column.to_json(member)?,
                });
            }
            entities.push(EjectedRecord {
                id: member,
                components,
            });
        }

        for &member in &bundle {
            self.remove_entity(member)?;
        }
        info!(%entity, bundle = bundle.len(), "entity ejected");
        Ok(EjectedEntity {
            root: entity,
            entities,
        })
    }

    /// Rehydrate an encoded [`EjectedEntity`]; returns the new root id.
    pub fn inject_entity(&mut self, bytes: &[u8]) -> Result<Entity, SimError> {
        let ejected = EjectedEntity::from_bytes(bytes)?;
        self.inject(&ejected)
    }

    /// Rehydrate an ejected bundle under fresh ids.
    ///
    /// Entity references between bundle members are rewritten to the new
    /// ids. References to anything outside the bundle are cleared, since ids
    /// from another instance name unrelated entities here. Every record is
    /// validated before any id is allocated. Components are attached in their
    /// recorded order so lifecycle callbacks fire as they would for a freshly
    /// built entity.
    pub fn inject(&mut self, ejected: &EjectedEntity) -> Result<Entity, SimError> {
        for record in &ejected.entities {
            for component in &record.components {
                self.world
                    .store
                    .validate_json(&component.kind, Some(&component.data))?;
            }
        }

        let mapping: Vec<(Entity, Entity)> = ejected
            .entities
            .iter()
            .map(|record| (record.id, self.world.allocator.allocate()))
            .collect();
        let remap = |entity: Entity| {
            mapping
                .iter()
                .find(|(old, _)| *old == entity)
                .map(|&(_, new)| new)
        };

        if let Err(err) = self.attach_bundle(ejected, &mapping, &remap) {
            warn!(error = %err, "inject failed, removing partial bundle");
            for &(_, entity) in &mapping {
                self.remove_entity(entity)?;
            }
            return Err(err);
        }

        let root = remap(ejected.root).unwrap_or(Entity::INVALID);
        info!(%root, bundle = mapping.len(), "entity injected");
        Ok(root)
    }

    fn attach_bundle(
        &mut self,
        ejected: &EjectedEntity,
        mapping: &[(Entity, Entity)],
        remap: &impl Fn(Entity) -> Option<Entity>,
    ) -> Result<(), SimError> {
        for (record, &(_, entity)) in ejected.entities.iter().zip(mapping) {
            for component in &record.components {
                let mut data = component.data.clone();
                if let Some(meta) = self.world.store.meta_by_name(&component.kind) {
                    meta.schema.remap_entities(&mut data, remap);
                }
                self.add_component_json(&component.kind, entity, Some(data))?;
            }
        }
        Ok(())
    }

    /// Remove every entity, the core entity included.
    pub fn teardown(&mut self) -> Result<(), SimError> {
        let entities: Vec<Entity> = self.world.entities().collect();
        for &entity in &entities {
            self.remove_entity(entity)?;
        }
        self.world.commands.clear();
        self.world.spatial.clear();
        info!(removed = entities.len(), "simulation torn down");
        Ok(())
    }
}
