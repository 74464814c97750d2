//! Built-in component kinds.
//!
//! These are the kinds the engine's own systems read and write. Game code
//! registers its own kinds next to them.

use engine_component::{
    Category, Component, ComponentSchema, DenseColumn, Entity, FieldDescriptor, FieldType,
};
use serde::{Deserialize, Serialize};

const CATEGORIES: &[&str] = &[
    "Core",
    "Target",
    "Trigger",
    "OnKill",
    "OnDeath",
    "OnEntityCreation",
    "Rendering",
    "Map",
];

/// Per-frame displacement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

impl Component for Velocity {
    type Storage = DenseColumn<Self>;

    fn type_name() -> &'static str {
        "Velocity"
    }

    fn schema() -> ComponentSchema {
        ComponentSchema::new(Self::type_name(), Self::category())
            .field(FieldDescriptor::new("x", FieldType::Float))
            .field(FieldDescriptor::new("y", FieldType::Float))
    }
}

impl Velocity {
    #[must_use]
    pub fn speed(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

/// The world slot an entity lives in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSlot {
    pub world: i32,
    /// Set once the transform has been rebased into the slot's window.
    pub rebased: bool,
}

impl Component for WorldSlot {
    type Storage = DenseColumn<Self>;

    fn type_name() -> &'static str {
        "WorldSlot"
    }

    fn schema() -> ComponentSchema {
        ComponentSchema::new(Self::type_name(), Self::category())
            .field(FieldDescriptor::new("world", FieldType::Int))
            .field(FieldDescriptor::new("rebased", FieldType::Bool))
    }
}

/// Link from an owned entity to its owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    pub owner: Option<Entity>,
}

impl Component for Owner {
    type Storage = DenseColumn<Self>;

    fn type_name() -> &'static str {
        "Owner"
    }

    fn schema() -> ComponentSchema {
        ComponentSchema::new(Self::type_name(), Self::category())
            .field(FieldDescriptor::new("owner", FieldType::Entity).nullable())
    }
}

/// Entities owned by this entity. Maintained by the ownership system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Owned {
    pub owned: Vec<Entity>,
}

impl Component for Owned {
    type Storage = DenseColumn<Self>;

    fn type_name() -> &'static str {
        "Owned"
    }

    fn schema() -> ComponentSchema {
        ComponentSchema::new(Self::type_name(), Self::category())
            .field(FieldDescriptor::new("owned", FieldType::EntityList))
    }
}

/// Makes an entity follow its parent's transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Attach {
    pub parent: Option<Entity>,
    pub offset_x: f32,
    pub offset_y: f32,
    pub copy_direction: bool,
    /// Re-apply after movement so the child trails the parent.
    pub post: bool,
}

impl Component for Attach {
    type Storage = DenseColumn<Self>;

    fn type_name() -> &'static str {
        "Attach"
    }

    fn schema() -> ComponentSchema {
        ComponentSchema::new(Self::type_name(), Self::category())
            .field(FieldDescriptor::new("parent", FieldType::Entity).nullable())
            .field(FieldDescriptor::new("offset_x", FieldType::Float))
            .field(FieldDescriptor::new("offset_y", FieldType::Float))
            .field(FieldDescriptor::new("copy_direction", FieldType::Bool))
            .field(FieldDescriptor::new("post", FieldType::Bool))
    }
}

/// Children attached to this entity. Maintained by the attachment system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attached {
    pub children: Vec<Entity>,
}

impl Component for Attached {
    type Storage = DenseColumn<Self>;

    fn type_name() -> &'static str {
        "Attached"
    }

    fn schema() -> ComponentSchema {
        ComponentSchema::new(Self::type_name(), Self::category())
            .field(FieldDescriptor::new("children", FieldType::EntityList))
    }
}

/// Entities whose on-kill reactions fire when this entity kills.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShareOnKill {
    pub entities: Vec<Entity>,
}

impl Component for ShareOnKill {
    type Storage = DenseColumn<Self>;

    fn type_name() -> &'static str {
        "ShareOnKill"
    }

    fn schema() -> ComponentSchema {
        ComponentSchema::new(Self::type_name(), Self::category())
            .field(FieldDescriptor::new("entities", FieldType::EntityList))
    }
}

/// Entities whose on-death reactions fire when this entity dies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShareOnDeath {
    pub entities: Vec<Entity>,
}

impl Component for ShareOnDeath {
    type Storage = DenseColumn<Self>;

    fn type_name() -> &'static str {
        "ShareOnDeath"
    }

    fn schema() -> ComponentSchema {
        ComponentSchema::new(Self::type_name(), Self::category())
            .field(FieldDescriptor::new("entities", FieldType::EntityList))
    }
}

/// Entities carried along when this entity is ejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShareOnEject {
    pub entities: Vec<Entity>,
}

impl Component for ShareOnEject {
    type Storage = DenseColumn<Self>;

    fn type_name() -> &'static str {
        "ShareOnEject"
    }

    fn schema() -> ComponentSchema {
        ComponentSchema::new(Self::type_name(), Self::category())
            .field(FieldDescriptor::new("entities", FieldType::EntityList))
    }
}

/// Circular collision bounds, indexed per category by the spatial system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub radius: f32,
    pub category: Category,
}

impl Component for Collider {
    type Storage = DenseColumn<Self>;

    fn type_name() -> &'static str {
        "Collider"
    }

    fn category() -> Category {
        Category::Target
    }

    fn schema() -> ComponentSchema {
        ComponentSchema::new(Self::type_name(), Self::category())
            .field(FieldDescriptor::new("radius", FieldType::Float))
            .field(FieldDescriptor::new("category", FieldType::Enum(CATEGORIES)))
    }
}

/// Marks a player-controlled entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub slot: u8,
}

impl Component for Player {
    type Storage = DenseColumn<Self>;

    fn type_name() -> &'static str {
        "Player"
    }

    fn schema() -> ComponentSchema {
        ComponentSchema::new(Self::type_name(), Self::category())
            .field(FieldDescriptor::new("slot", FieldType::Int).required())
    }
}

/// One frame of player input, written before each step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInput {
    pub move_x: f32,
    pub move_y: f32,
    pub buttons: u32,
}

impl Component for PlayerInput {
    type Storage = DenseColumn<Self>;

    fn type_name() -> &'static str {
        "PlayerInput"
    }

    fn schema() -> ComponentSchema {
        ComponentSchema::new(Self::type_name(), Self::category())
            .field(FieldDescriptor::new("move_x", FieldType::Float))
            .field(FieldDescriptor::new("move_y", FieldType::Float))
            .field(FieldDescriptor::new("buttons", FieldType::Int))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub current: i32,
    pub max: i32,
    /// Credited with the kill if this entity dies.
    pub last_hit_by: Option<Entity>,
}

impl Default for Health {
    fn default() -> Self {
        Self {
            current: 100,
            max: 100,
            last_hit_by: None,
        }
    }
}

impl Component for Health {
    type Storage = DenseColumn<Self>;

    fn type_name() -> &'static str {
        "Health"
    }

    fn category() -> Category {
        Category::Target
    }

    fn schema() -> ComponentSchema {
        ComponentSchema::new(Self::type_name(), Self::category())
            .field(FieldDescriptor::new("current", FieldType::Int))
            .field(FieldDescriptor::new("max", FieldType::Int))
            .field(FieldDescriptor::new("last_hit_by", FieldType::Entity).nullable())
    }
}

/// Per-entity seed; combined with the entity id and frame to derive a
/// reproducible generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RandomSeed {
    pub seed: String,
}

impl Component for RandomSeed {
    type Storage = DenseColumn<Self>;

    fn type_name() -> &'static str {
        "RandomSeed"
    }

    fn schema() -> ComponentSchema {
        ComponentSchema::new(Self::type_name(), Self::category())
            .field(FieldDescriptor::new("seed", FieldType::String).required())
    }
}

/// Kill and death totals, held by the core entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillStats {
    pub kills: u32,
    pub deaths: u32,
}

impl Component for KillStats {
    type Storage = DenseColumn<Self>;

    fn type_name() -> &'static str {
        "KillStats"
    }

    fn schema() -> ComponentSchema {
        ComponentSchema::new(Self::type_name(), Self::category())
            .field(FieldDescriptor::new("kills", FieldType::Int))
            .field(FieldDescriptor::new("deaths", FieldType::Int))
    }
}

/// The entity the local view follows, held by the core entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraTarget {
    pub entity: Option<Entity>,
}

impl Component for CameraTarget {
    type Storage = DenseColumn<Self>;

    fn type_name() -> &'static str {
        "CameraTarget"
    }

    fn category() -> Category {
        Category::Rendering
    }

    fn schema() -> ComponentSchema {
        ComponentSchema::new(Self::type_name(), Self::category())
            .field(FieldDescriptor::new("entity", FieldType::Entity).nullable())
    }
}
