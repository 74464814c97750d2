//! Registration table: component kinds, systems and the sorted pipeline.
//!
//! A [`Registry`] is built once and then shared, read-only, by every
//! simulation instance created from it.

use std::collections::HashSet;

use engine_component::{Component, ComponentMeta, ComponentTypeId};
use engine_math::Transform;
use serde_json::Value;
use tracing::info;

use crate::components::{
    Attach, Attached, CameraTarget, Collider, Health, KillStats, Owned, Owner, Player,
    PlayerInput, RandomSeed, ShareOnDeath, ShareOnEject, ShareOnKill, Velocity, WorldSlot,
};
use crate::error::SchedulerError;
use crate::scheduler::Pipeline;
use crate::system::{System, SystemDescriptor};
use crate::systems::{
    AttachPostSystem, AttachSystem, HealthSystem, MovementSystem, OwnerSystem,
    PlayerInputSystem, SpatialIndexSystem, WorldSlotSystem,
};

/// Collects component kinds and systems before the pipeline is sorted.
pub struct RegistryBuilder {
    components: Vec<ComponentMeta>,
    systems: Vec<Box<dyn System>>,
}

impl RegistryBuilder {
    /// A builder holding the engine's built-in component kinds, without
    /// systems.
    #[must_use]
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
            systems: Vec::new(),
        }
        .component::<Transform>()
        .component::<Velocity>()
        .component::<WorldSlot>()
        .component::<Owner>()
        .component::<Owned>()
        .component::<Attach>()
        .component::<Attached>()
        .component::<ShareOnKill>()
        .component::<ShareOnDeath>()
        .component::<ShareOnEject>()
        .component::<Collider>()
        .component::<Player>()
        .component::<PlayerInput>()
        .component::<Health>()
        .component::<RandomSeed>()
        .component::<KillStats>()
        .component::<CameraTarget>()
    }

    /// Register a component kind.
    #[must_use]
    pub fn component<T: Component>(mut self) -> Self {
        self.components.push(T::meta());
        self
    }

    /// Register a system. Registration order breaks depth ties.
    #[must_use]
    pub fn system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    /// Add the engine's relationship, movement and indexing systems.
    #[must_use]
    pub fn with_builtin_systems(self) -> Self {
        self.system(WorldSlotSystem)
            .system(AttachSystem)
            .system(PlayerInputSystem::default())
            .system(MovementSystem)
            .system(SpatialIndexSystem)
            .system(HealthSystem)
            .system(AttachPostSystem)
            .system(OwnerSystem)
    }

    /// Validate registrations and sort the pipeline.
    pub fn build(self) -> Result<Registry, SchedulerError> {
        let mut seen = HashSet::new();
        for meta in &self.components {
            if !seen.insert(meta.type_id) {
                return Err(SchedulerError::DuplicateComponent(meta.name.to_string()));
            }
        }

        let descriptors: Vec<SystemDescriptor> =
            self.systems.iter().map(|s| s.descriptor()).collect();
        let known: HashSet<&str> = self.components.iter().map(|m| m.name).collect();
        let pipeline = Pipeline::build(&descriptors, &known)?;

        info!(
            components = self.components.len(),
            systems = descriptors.len(),
            "built system pipeline"
        );

        Ok(Registry {
            components: self.components,
            systems: self.systems,
            descriptors,
            pipeline,
        })
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable registration table.
pub struct Registry {
    components: Vec<ComponentMeta>,
    systems: Vec<Box<dyn System>>,
    descriptors: Vec<SystemDescriptor>,
    pipeline: Pipeline,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("components", &self.components.len())
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl Registry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Built-in kinds and systems only.
    pub fn with_builtins() -> Result<Self, SchedulerError> {
        RegistryBuilder::new().with_builtin_systems().build()
    }

    /// Component kinds, in registration order.
    #[must_use]
    pub fn components(&self) -> &[ComponentMeta] {
        &self.components
    }

    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    #[must_use]
    pub fn system(&self, index: usize) -> &dyn System {
        self.systems[index].as_ref()
    }

    #[must_use]
    pub fn descriptor(&self, index: usize) -> &SystemDescriptor {
        &self.descriptors[index]
    }

    /// The first-registered system triggered by `kind`.
    #[must_use]
    pub fn get_system(&self, kind: ComponentTypeId) -> Option<&dyn System> {
        self.primary(kind).map(|index| self.system(index))
    }

    /// Depth of the first-registered system triggered by `kind`.
    #[must_use]
    pub fn depth_of(&self, kind: ComponentTypeId) -> Option<f32> {
        self.primary(kind).map(|index| self.descriptors[index].depth)
    }

    fn primary(&self, kind: ComponentTypeId) -> Option<usize> {
        self.descriptors.iter().position(|d| d.kind == kind)
    }

    /// Systems triggered by `kind`, in pipeline order, with their index.
    pub fn systems_for(&self, kind: ComponentTypeId) -> impl Iterator<Item = (usize, &dyn System)> {
        self.pipeline
            .for_kind(kind)
            .map(move |entry| (entry.system, self.system(entry.system)))
    }

    /// Describe every kind and the pipeline for inspector tooling.
    #[must_use]
    pub fn schema_json(&self) -> Value {
        serde_json::json!({
            "components": self.components.iter().map(|m| m.schema.to_json()).collect::<Vec<_>>(),
            "pipeline": self.pipeline.entries().iter().map(|entry| {
                let d = &self.descriptors[entry.system];
                serde_json::json!({
                    "name": d.name,
                    "kind": d.kind_name,
                    "category": d.category.to_string(),
                    "depth": d.depth,
                    "dependencies": d.dependencies,
                })
            }).collect::<Vec<_>>(),
        })
    }
}
