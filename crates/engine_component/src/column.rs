//! Column storage for a single component kind.
//!
//! A column maps entities to records through a sparse index and keeps its
//! entities in insertion order. That order is the iteration order systems see,
//! so it must never depend on anything but the sequence of attach/detach
//! calls: removal shifts later rows down instead of swap-removing.
//!
//! Each row carries a dirty mask with one bit per schema field. Network sync
//! reads these masks after a step to build deltas.

use std::any::Any;

use serde_json::Value;

use crate::component::{Component, ComponentTypeId};
use crate::entity::Entity;
use crate::error::StoreError;

const EMPTY: u32 = u32::MAX;

/// Type-erased view of a column, used by the store for structural operations
/// and (de)serialisation.
pub trait AnyColumn: Any {
    /// The component kind stored in this column.
    fn kind(&self) -> ComponentTypeId;

    /// The component kind name.
    fn name(&self) -> &'static str;

    fn contains(&self, entity: Entity) -> bool;

    /// Entities holding this component, in insertion order.
    fn entities(&self) -> &[Entity];

    /// Detach the component. Returns `false` if the entity did not have it.
    fn remove_entity(&mut self, entity: Entity) -> bool;

    fn clear(&mut self);

    /// Encode one record as MessagePack.
    fn encode(&self, entity: Entity) -> Result<Vec<u8>, StoreError>;

    /// Decode a MessagePack record and attach it.
    fn insert_encoded(&mut self, entity: Entity, bytes: &[u8]) -> Result<(), StoreError>;

    /// One record as a JSON object keyed by field name.
    fn to_json(&self, entity: Entity) -> Result<Value, StoreError>;

    /// Attach a record built from partial JSON data over the schema defaults.
    fn insert_json(&mut self, entity: Entity, data: Option<Value>) -> Result<(), StoreError>;

    /// Check partial JSON against the schema without touching the column.
    fn validate_json(&self, data: Option<&Value>) -> Result<(), StoreError>;

    /// Per-field change bits for one entity, `0` if absent.
    fn dirty_mask(&self, entity: Entity) -> u64;

    fn clear_dirty(&mut self);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Typed access shared by every column implementation.
pub trait ComponentStorage<T: Component>: AnyColumn + Default {
    /// Attach or replace a record. Every field is marked dirty.
    fn insert(&mut self, entity: Entity, value: T);

    /// Detach and return a record.
    fn take(&mut self, entity: Entity) -> Option<T>;

    /// An owned copy of a record.
    fn read(&self, entity: Entity) -> Option<T>;
}

/// Encode a record as named MessagePack.
pub fn encode_record<T: Component>(value: &T) -> Result<Vec<u8>, StoreError> {
    Ok(rmp_serde::to_vec_named(value)?)
}

/// Decode a named MessagePack record.
pub fn decode_record<T: Component>(bytes: &[u8]) -> Result<T, StoreError> {
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Build a record from partial JSON, filling defaults and validating against
/// the kind's schema.
pub fn resolve_record<T: Component>(data: Option<Value>) -> Result<T, StoreError> {
    let schema = T::schema();
    let defaults = serde_json::to_value(T::default())?;
    let merged = schema.resolve(defaults, data)?;
    serde_json::from_value(merged).map_err(|e| StoreError::Validation {
        component: schema.name.to_string(),
        message: e.to_string(),
    })
}

/// Dense, insertion-ordered storage of records.
#[derive(Debug, Clone)]
pub struct DenseColumn<T> {
    sparse: Vec<u32>,
    entities: Vec<Entity>,
    values: Vec<T>,
    dirty: Vec<u64>,
}

impl<T> Default for DenseColumn<T> {
    fn default() -> Self {
        Self {
            sparse: Vec::new(),
            entities: Vec::new(),
            values: Vec::new(),
            dirty: Vec::new(),
        }
    }
}

impl<T: Component> DenseColumn<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, entity: Entity) -> Option<usize> {
        match self.sparse.get(entity.index()) {
            Some(&row) if row != EMPTY => Some(row as usize),
            _ => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.slot(entity).map(|row| &self.values[row])
    }

    /// Mutable access. Every field of the row is marked dirty; use
    /// [`DenseColumn::update`] for precise change bits.
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let row = self.slot(entity)?;
        self.dirty[row] |= T::schema().full_mask();
        Some(&mut self.values[row])
    }

    /// Read without a presence check.
    ///
    /// # Panics
    ///
    /// Panics if the entity does not hold this component. Only call this
    /// where a prior query already proved presence.
    #[must_use]
    pub fn get_unchecked(&self, entity: Entity) -> &T {
        &self.values[self.sparse[entity.index()] as usize]
    }

    /// Apply `f` to a record and mark exactly the fields it changed.
    pub fn update<R>(&mut self, entity: Entity, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let row = self.slot(entity)?;
        let before = serde_json::to_value(&self.values[row]).ok();
        let result = f(&mut self.values[row]);
        let after = serde_json::to_value(&self.values[row]).ok();
        let schema = T::schema();
        self.dirty[row] |= match (before, after) {
            (Some(before), Some(after)) => schema.diff_mask(&before, &after),
            _ => schema.full_mask(),
        };
        Some(result)
    }

    /// Iterate `(entity, record)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.entities.iter().copied().zip(self.values.iter())
    }
}

impl<T: Component> AnyColumn for DenseColumn<T> {
    fn kind(&self) -> ComponentTypeId {
        T::component_type_id()
    }

    fn name(&self) -> &'static str {
        T::type_name()
    }

    fn contains(&self, entity: Entity) -> bool {
        self.slot(entity).is_some()
    }

    fn entities(&self) -> &[Entity] {
        &self.entities
    }

    fn remove_entity(&mut self, entity: Entity) -> bool {
        self.take(entity).is_some()
    }

    fn clear(&mut self) {
        self.sparse.clear();
        self.entities.clear();
        self.values.clear();
        self.dirty.clear();
    }

    fn encode(&self, entity: Entity) -> Result<Vec<u8>, StoreError> {
        let value = self.get(entity).ok_or(StoreError::NotFound {
            kind: T::type_name(),
            entity,
        })?;
        encode_record(value)
    }

    fn insert_encoded(&mut self, entity: Entity, bytes: &[u8]) -> Result<(), StoreError> {
        let value = decode_record::<T>(bytes)?;
        self.insert(entity, value);
        Ok(())
    }

    fn to_json(&self, entity: Entity) -> Result<Value, StoreError> {
        let value = self.get(entity).ok_or(StoreError::NotFound {
            kind: T::type_name(),
            entity,
        })?;
        Ok(serde_json::to_value(value)?)
    }

    fn insert_json(&mut self, entity: Entity, data: Option<Value>) -> Result<(), StoreError> {
        let value = resolve_record::<T>(data)?;
        self.insert(entity, value);
        Ok(())
    }

    fn validate_json(&self, data: Option<&Value>) -> Result<(), StoreError> {
        resolve_record::<T>(data.cloned()).map(drop)
    }

    fn dirty_mask(&self, entity: Entity) -> u64 {
        self.slot(entity).map_or(0, |row| self.dirty[row])
    }

    fn clear_dirty(&mut self) {
        self.dirty.iter_mut().for_each(|mask| *mask = 0);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<T: Component> ComponentStorage<T> for DenseColumn<T> {
    fn insert(&mut self, entity: Entity, value: T) {
        let full = T::schema().full_mask();
        if let Some(row) = self.slot(entity) {
            self.values[row] = value;
            self.dirty[row] = full;
            return;
        }
        if self.sparse.len() <= entity.index() {
            self.sparse.resize(entity.index() + 1, EMPTY);
        }
        self.sparse[entity.index()] = self.entities.len() as u32;
        self.entities.push(entity);
        self.values.push(value);
        self.dirty.push(full);
    }

    fn take(&mut self, entity: Entity) -> Option<T> {
        let row = self.slot(entity)?;
        self.sparse[entity.index()] = EMPTY;
        self.entities.remove(row);
        self.dirty.remove(row);
        let value = self.values.remove(row);
        for (i, moved) in self.entities.iter().enumerate().skip(row) {
            self.sparse[moved.index()] = i as u32;
        }
        Some(value)
    }

    fn read(&self, entity: Entity) -> Option<T> {
        self.get(entity).cloned()
    }
}
