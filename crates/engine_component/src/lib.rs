//! # engine_component
//!
//! The "C" in ECS. Defines what a component is, how it is stored, and how it
//! is serialised for checkpoints and entity transfer.
//!
//! This crate provides:
//!
//! - [`Component`] trait, the contract all ECS data must satisfy.
//! - [`Entity`], lightweight `u32` entity identifiers.
//! - [`EntityAllocator`], an id allocator with deferred recycling.
//! - [`ComponentSchema`], declared fields driving defaults, dirty bits and
//!   entity remapping.
//! - [`DenseColumn`] and [`ComponentStore`], insertion-ordered column storage.

pub mod column;
pub mod component;
pub mod entity;
pub mod error;
pub mod schema;
pub mod store;

pub use column::{
    AnyColumn, ComponentStorage, DenseColumn, decode_record, encode_record, resolve_record,
};
pub use component::{Category, Component, ComponentMeta, ComponentRecord, ComponentTypeId, fnv1a};
pub use entity::{Entity, EntityAllocator};
pub use error::StoreError;
pub use schema::{ComponentSchema, FieldDescriptor, FieldModifier, FieldType};
pub use store::{ColumnSnapshot, ComponentStore};
