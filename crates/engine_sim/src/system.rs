//! The [`System`] trait and its static descriptor.

use engine_component::{Category, Component, ComponentTypeId, Entity};
use serde::{Deserialize, Serialize};

use crate::context::Ctx;
use crate::error::SimError;

/// Static scheduling facts about a system.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemDescriptor {
    pub name: &'static str,
    /// The component kind whose active set drives this system.
    pub kind: ComponentTypeId,
    pub kind_name: &'static str,
    pub category: Category,
    /// Lower runs earlier.
    pub depth: f32,
    /// Component kinds that must be resolved before this system runs.
    pub dependencies: &'static [&'static str],
}

impl SystemDescriptor {
    /// A descriptor triggered by `T`, inheriting `T`'s category.
    #[must_use]
    pub fn of<T: Component>(name: &'static str, depth: f32) -> Self {
        Self {
            name,
            kind: T::component_type_id(),
            kind_name: T::type_name(),
            category: T::category(),
            depth,
            dependencies: &[],
        }
    }

    #[must_use]
    pub fn with_dependencies(mut self, dependencies: &'static [&'static str]) -> Self {
        self.dependencies = dependencies;
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Reactive systems are invoked through [`Ctx::run_mods`] instead of
    /// every frame.
    #[must_use]
    pub fn is_reactive(&self) -> bool {
        matches!(
            self.category,
            Category::OnKill | Category::OnDeath | Category::OnEntityCreation
        )
    }
}

/// Event fields visible to a reactive system while [`Ctx::run_mods`] calls
/// it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModContext {
    /// The entity whose component is reacting.
    pub owner: Option<Entity>,
    pub killed_entity: Option<Entity>,
    pub kill_source: Option<Entity>,
    /// The entity just created, for creation reactions.
    pub spawned: Option<Entity>,
}

/// Behaviour attached to one component kind.
///
/// All callbacks receive the simulation context; structural changes they
/// request while a step is running are applied after the pipeline finishes.
pub trait System {
    fn descriptor(&self) -> SystemDescriptor;

    /// Called once when the trigger kind is attached to `entity`.
    fn init(&self, _ctx: &mut Ctx<'_>, _entity: Entity) -> Result<(), SimError> {
        Ok(())
    }

    /// Called once per frame for each active entity.
    fn run(&self, _ctx: &mut Ctx<'_>, _entity: Entity) -> Result<(), SimError> {
        Ok(())
    }

    /// Called once per frame with the whole active set. Defaults to calling
    /// [`System::run`] per entity in order.
    fn run_all(&self, ctx: &mut Ctx<'_>, entities: &[Entity]) -> Result<(), SimError> {
        for &entity in entities {
            self.run(ctx, entity)?;
        }
        Ok(())
    }

    /// Called once when the trigger kind is detached from `entity`.
    fn cleanup(&self, _ctx: &mut Ctx<'_>, _entity: Entity) -> Result<(), SimError> {
        Ok(())
    }
}
