//! Per-instance simulation state.
//!
//! The [`World`] holds everything one simulation instance owns: entity
//! allocation, component storage, the RNG and frame counters. It exposes the
//! read surfaces and component-data accessors; structural changes that must
//! fire lifecycle callbacks go through [`Ctx`](crate::context::Ctx).

use std::collections::BTreeMap;

use engine_component::{
    Category, Component, ComponentStore, ComponentTypeId, DenseColumn, Entity,
    EntityAllocator, StoreError,
};
use engine_math::{Transform, TransformColumn};

use crate::commands::CommandQueue;
use crate::components::{Player, RandomSeed};
use crate::config::SimulationConfig;
use crate::random::{Random, generate};
use crate::spatial::SpatialMap;
use crate::system::ModContext;

/// The state of one simulation instance.
#[derive(Debug)]
pub struct World {
    pub(crate) config: SimulationConfig,
    pub(crate) allocator: EntityAllocator,
    pub(crate) store: ComponentStore,
    pub(crate) rng: Random,
    pub(crate) frame: u64,
    pub(crate) time_elapsed: u64,
    pub(crate) current_world: i32,
    pub(crate) core_entity: Entity,
    pub(crate) paused: bool,
    pub(crate) in_step: bool,
    pub(crate) commands: CommandQueue,
    pub(crate) mod_context: Option<ModContext>,
    pub(crate) spatial: BTreeMap<Category, SpatialMap>,
}

impl World {
    /// An empty world with every kind in `store` registered.
    pub(crate) fn new(config: SimulationConfig, store: ComponentStore) -> Self {
        let rng = generate(&config.seed);
        Self {
            config,
            allocator: EntityAllocator::new(),
            store,
            rng,
            frame: 0,
            time_elapsed: 0,
            current_world: 0,
            core_entity: Entity::INVALID,
            paused: false,
            in_step: false,
            commands: CommandQueue::default(),
            mod_context: None,
            spatial: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Completed steps since creation.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Simulated milliseconds since creation.
    #[must_use]
    pub fn time_elapsed(&self) -> u64 {
        self.time_elapsed
    }

    #[must_use]
    pub fn current_world(&self) -> i32 {
        self.current_world
    }

    pub fn set_current_world(&mut self, world: i32) {
        self.current_world = world;
    }

    /// The singleton-holding entity created with the instance.
    #[must_use]
    pub fn core_entity(&self) -> Entity {
        self.core_entity
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Whether the system pipeline is currently running.
    #[must_use]
    pub fn in_step(&self) -> bool {
        self.in_step
    }

    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.allocator.count()
    }

    /// Live entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.allocator.alive_entities()
    }

    /// Player entities in the order they joined.
    #[must_use]
    pub fn players(&self) -> Vec<Entity> {
        self.actives::<Player>().to_vec()
    }

    /// The player entity occupying an input slot.
    #[must_use]
    pub fn player_in_slot(&self, slot: u8) -> Option<Entity> {
        self.column::<Player>()
            .ok()?
            .iter()
            .find(|(_, player)| player.slot == slot)
            .map(|(entity, _)| entity)
    }

    #[must_use]
    pub fn store(&self) -> &ComponentStore {
        &self.store
    }

    /// Entities holding `T`, in insertion order.
    #[must_use]
    pub fn actives<T: Component>(&self) -> &[Entity] {
        self.store.entities::<T>()
    }

    #[must_use]
    pub fn actives_of(&self, kind: ComponentTypeId) -> &[Entity] {
        self.store.entities_of(kind)
    }

    #[must_use]
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.store.has::<T>(entity)
    }

    #[must_use]
    pub fn has_kind(&self, kind: ComponentTypeId, entity: Entity) -> bool {
        self.store.has_kind(kind, entity)
    }

    pub fn column<T: Component>(&self) -> Result<&T::Storage, StoreError> {
        self.store.column::<T>()
    }

    pub fn column_mut<T: Component>(&mut self) -> Result<&mut T::Storage, StoreError> {
        self.store.column_mut::<T>()
    }

    /// Borrow a record; fails with [`StoreError::NotFound`] if absent.
    pub fn get_component<T>(&self, entity: Entity) -> Result<&T, StoreError>
    where
        T: Component<Storage = DenseColumn<T>>,
    {
        self.store.column::<T>()?.get(entity).ok_or(StoreError::NotFound {
            kind: T::type_name(),
            entity,
        })
    }

    /// Mutable access; marks every field of the record dirty.
    pub fn get_component_mut<T>(&mut self, entity: Entity) -> Result<&mut T, StoreError>
    where
        T: Component<Storage = DenseColumn<T>>,
    {
        self.store
            .column_mut::<T>()?
            .get_mut(entity)
            .ok_or(StoreError::NotFound {
                kind: T::type_name(),
                entity,
            })
    }

    /// Borrow a record without reporting absence.
    ///
    /// # Panics
    ///
    /// Panics if `T` is unregistered or `entity` does not hold it. Reserved
    /// for loops over `T`'s own active set.
    #[must_use]
    pub fn get_unchecked<T>(&self, entity: Entity) -> &T
    where
        T: Component<Storage = DenseColumn<T>>,
    {
        match self.store.column::<T>() {
            Ok(column) => column.get_unchecked(entity),
            Err(err) => panic!("get_unchecked: {err}"),
        }
    }

    /// An owned copy of a record in any storage.
    pub fn read_component<T: Component>(&self, entity: Entity) -> Result<T, StoreError> {
        self.store.read::<T>(entity).ok_or(StoreError::NotFound {
            kind: T::type_name(),
            entity,
        })
    }

    /// Apply `f` to a record and mark the fields it changed.
    pub fn update_component<T, R>(
        &mut self,
        entity: Entity,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, StoreError>
    where
        T: Component<Storage = DenseColumn<T>>,
    {
        self.store
            .column_mut::<T>()?
            .update(entity, f)
            .ok_or(StoreError::NotFound {
                kind: T::type_name(),
                entity,
            })
    }

    /// A record as JSON, by kind name.
    pub fn get_component_json(
        &self,
        kind: &str,
        entity: Entity,
    ) -> Result<serde_json::Value, StoreError> {
        let meta = self
            .store
            .meta_by_name(kind)
            .ok_or_else(|| StoreError::UnknownKind(kind.to_string()))?;
        match self.store.column_dyn(meta.type_id) {
            Some(column) => column.to_json(entity),
            None => Err(StoreError::UnknownKind(kind.to_string())),
        }
    }

    #[must_use]
    pub fn dirty_mask<T: Component>(&self, entity: Entity) -> u64 {
        self.store
            .column_dyn(T::component_type_id())
            .map_or(0, |column| column.dirty_mask(entity))
    }

    pub fn transforms(&self) -> Result<&TransformColumn, StoreError> {
        self.store.column::<Transform>()
    }

    pub fn transforms_mut(&mut self) -> Result<&mut TransformColumn, StoreError> {
        self.store.column_mut::<Transform>()
    }

    /// The instance RNG.
    pub fn rand(&mut self) -> &mut Random {
        &mut self.rng
    }

    /// A generator derived from an entity's [`RandomSeed`], the entity id and
    /// the current frame.
    #[must_use]
    pub fn entity_rng(&self, entity: Entity) -> Option<Random> {
        let seed = self.store.get::<RandomSeed>(entity)?;
        Some(generate(&format!(
            "{}:{}:{}",
            seed.seed,
            entity.id(),
            self.frame
        )))
    }

    /// This frame's spatial map for a collider category.
    #[must_use]
    pub fn spatial_map(&self, category: Category) -> Option<&SpatialMap> {
        self.spatial.get(&category)
    }

    /// Event fields while a reactive system is being invoked.
    #[must_use]
    pub fn mod_context(&self) -> Option<&ModContext> {
        self.mod_context.as_ref()
    }

    /// Reset per-field change bits.
    pub fn clear_dirty(&mut self) {
        self.store.clear_dirty();
    }
}
