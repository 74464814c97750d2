//! Core [`Component`] trait and associated metadata.
//!
//! Every piece of data stored in the ECS must implement [`Component`]. A kind
//! is identified by its string name, declares its field schema, and picks the
//! column type that stores it.
//!
//! ## Type Identity
//!
//! [`ComponentTypeId`] is derived from the component's **string name** using
//! the FNV-1a 64-bit hash algorithm. This is deterministic across builds and
//! platforms, so ids embedded in checkpoints and ejected entities stay valid
//! on every peer.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::column::{AnyColumn, ComponentStorage};
use crate::schema::ComponentSchema;

/// A unique identifier for a component type, derived from its string name
/// using the FNV-1a 64-bit hash algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ComponentTypeId(pub u64);

impl ComponentTypeId {
    /// FNV-1a 64-bit offset basis.
    const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

    /// FNV-1a 64-bit prime.
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    /// Compute the [`ComponentTypeId`] from a component's string name using
    /// the FNV-1a 64-bit hash algorithm.
    ///
    /// # Algorithm (FNV-1a 64-bit)
    ///
    /// ```text
    /// hash = 0xcbf29ce484222325          (offset basis)
    /// for each byte in name.as_bytes():
    ///     hash = hash XOR byte
    ///     hash = hash * 0x00000100000001b3  (prime)
    /// return hash
    /// ```
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        Self(fnv1a(name.as_bytes()))
    }

    /// Compute the [`ComponentTypeId`] for a Rust component type `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self::from_name(T::type_name())
    }
}

/// FNV-1a 64-bit hash of a byte slice.
#[must_use]
pub const fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = ComponentTypeId::FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(ComponentTypeId::FNV_PRIME);
        i += 1;
    }
    hash
}

/// Tag grouping component kinds for cross-cutting event propagation.
///
/// Categories are independent of kind: a kill event collects every
/// [`Category::OnKill`] component on the participating entities, whatever
/// their concrete types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Category {
    /// Engine plumbing: transforms, relationships, bookkeeping.
    #[default]
    Core,
    /// Things that can be aimed at or tracked.
    Target,
    /// Volumes and effects fired by proximity.
    Trigger,
    /// Reactions to this entity (or a sharer) killing something.
    OnKill,
    /// Reactions to this entity (or a sharer) dying.
    OnDeath,
    /// Reactions fired when an entity is created.
    OnEntityCreation,
    /// Data consumed by the rendering collaborator.
    Rendering,
    /// Map and level structure.
    Map,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Metadata about a component type, used to build type-erased storage.
#[derive(Debug, Clone)]
pub struct ComponentMeta {
    /// The unique type identifier.
    pub type_id: ComponentTypeId,
    /// The human-readable name of the component (e.g. `"Transform"`).
    pub name: &'static str,
    /// The declared field schema.
    pub schema: ComponentSchema,
    /// Constructs an empty column for this kind.
    pub new_column: fn() -> Box<dyn AnyColumn>,
}

/// The core component trait.
///
/// All data stored in the ECS must implement this trait. The `Default` value
/// supplies the per-field defaults applied when a component is attached from
/// partial data.
///
/// # Examples
///
/// ```rust
/// use serde::{Serialize, Deserialize};
/// use engine_component::{Component, ComponentSchema, DenseColumn, FieldDescriptor, FieldType};
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// struct Armor {
///     value: i32,
/// }
///
/// impl Component for Armor {
///     type Storage = DenseColumn<Self>;
///
///     fn type_name() -> &'static str { "Armor" }
///
///     fn schema() -> ComponentSchema {
///         ComponentSchema::new(Self::type_name(), Self::category())
///             .field(FieldDescriptor::new("value", FieldType::Int))
///     }
/// }
/// ```
pub trait Component: Clone + Default + Serialize + DeserializeOwned + 'static {
    /// The column type that stores this kind.
    type Storage: ComponentStorage<Self>;

    /// A human-readable name for this component type.
    fn type_name() -> &'static str;

    /// The propagation category of this kind.
    fn category() -> Category {
        Category::Core
    }

    /// The field schema of this kind.
    fn schema() -> ComponentSchema;

    /// Returns the [`ComponentTypeId`] for this component.
    fn component_type_id() -> ComponentTypeId {
        ComponentTypeId::from_name(Self::type_name())
    }

    /// Returns the [`ComponentMeta`] descriptor for this component type.
    fn meta() -> ComponentMeta {
        ComponentMeta {
            type_id: Self::component_type_id(),
            name: Self::type_name(),
            schema: Self::schema(),
            new_column: || Box::new(Self::Storage::default()),
        }
    }
}

/// A record pairing a component kind name with its field values.
///
/// Used when moving an entity between simulation instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    /// The component kind name.
    pub kind: String,
    /// Field values keyed by field name.
    pub data: serde_json::Value,
}
