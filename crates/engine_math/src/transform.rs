//! 2D transform component with struct-of-arrays storage.
//!
//! [`Transform`] is the most widely read component in the simulation, so its
//! fields live in parallel arrays inside a [`TransformColumn`] instead of one
//! boxed record per entity. Each row carries a change mask with one bit per
//! field ([`X`], [`Y`], [`DIRECTION`]) for delta sync.
//!
//! Access goes through an explicit `(column, entity)` pair, either by passing
//! the entity to the column methods or by borrowing a [`TransformMut`].

use std::any::Any;

use engine_component::{
    AnyColumn, Component, ComponentSchema, ComponentStorage, ComponentTypeId, Entity,
    FieldDescriptor, FieldType, StoreError, decode_record, encode_record, resolve_record,
};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Change bit for [`Transform::x`].
pub const X: u64 = 1 << 0;
/// Change bit for [`Transform::y`].
pub const Y: u64 = 1 << 1;
/// Change bit for [`Transform::direction`].
pub const DIRECTION: u64 = 1 << 2;

const ALL: u64 = X | Y | DIRECTION;
const EMPTY: u32 = u32::MAX;

/// Position and facing of an entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f32,
    pub y: f32,
    /// Facing, in radians.
    pub direction: f32,
}

impl Transform {
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            direction: 0.0,
        }
    }

    #[must_use]
    pub fn with_direction(mut self, direction: f32) -> Self {
        self.direction = direction;
        self
    }

    #[must_use]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl Component for Transform {
    type Storage = TransformColumn;

    fn type_name() -> &'static str {
        "Transform"
    }

    fn schema() -> ComponentSchema {
        ComponentSchema::new(Self::type_name(), Self::category())
            .field(FieldDescriptor::new("x", FieldType::Float))
            .field(FieldDescriptor::new("y", FieldType::Float))
            .field(FieldDescriptor::new("direction", FieldType::Float))
    }
}

/// Struct-of-arrays storage for [`Transform`].
#[derive(Debug, Clone, Default)]
pub struct TransformColumn {
    sparse: Vec<u32>,
    entities: Vec<Entity>,
    xs: Vec<f32>,
    ys: Vec<f32>,
    directions: Vec<f32>,
    dirty: Vec<u64>,
}

impl TransformColumn {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn row(&self, entity: Entity) -> Option<usize> {
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
    pub fn get(&self, entity: Entity) -> Option<Transform> {
        self.row(entity).map(|row| Transform {
            x: self.xs[row],
            y: self.ys[row],
            direction: self.directions[row],
        })
    }

    #[must_use]
    pub fn position(&self, entity: Entity) -> Option<Vec2> {
        self.row(entity)
            .map(|row| Vec2::new(self.xs[row], self.ys[row]))
    }

    #[must_use]
    pub fn direction(&self, entity: Entity) -> Option<f32> {
        self.row(entity).map(|row| self.directions[row])
    }

    /// Borrow one entity's transform for writing.
    pub fn entity_mut(&mut self, entity: Entity) -> Option<TransformMut<'_>> {
        let row = self.row(entity)?;
        Some(TransformMut { column: self, row })
    }

    /// Overwrite all fields, marking only those that changed. Returns `false`
    /// if the entity has no transform.
    pub fn set(&mut self, entity: Entity, value: Transform) -> bool {
        match self.entity_mut(entity) {
            Some(mut t) => {
                t.set_x(value.x);
                t.set_y(value.y);
                t.set_direction(value.direction);
                true
            }
            None => false,
        }
    }

    pub fn set_position(&mut self, entity: Entity, position: Vec2) -> bool {
        match self.entity_mut(entity) {
            Some(mut t) => {
                t.set_x(position.x);
                t.set_y(position.y);
                true
            }
            None => false,
        }
    }

    pub fn set_direction(&mut self, entity: Entity, direction: f32) -> bool {
        self.entity_mut(entity)
            .map(|mut t| t.set_direction(direction))
            .is_some()
    }

    pub fn translate(&mut self, entity: Entity, delta: Vec2) -> bool {
        match self.entity_mut(entity) {
            Some(mut t) => {
                let x = t.x() + delta.x;
                let y = t.y() + delta.y;
                t.set_x(x);
                t.set_y(y);
                true
            }
            None => false,
        }
    }

    /// Iterate `(entity, transform)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, Transform)> + '_ {
        self.entities.iter().enumerate().map(|(row, &e)| {
            (
                e,
                Transform {
                    x: self.xs[row],
                    y: self.ys[row],
                    direction: self.directions[row],
                },
            )
        })
    }
}

/// Write access to one row of a [`TransformColumn`].
pub struct TransformMut<'a> {
    column: &'a mut TransformColumn,
    row: usize,
}

impl TransformMut<'_> {
    #[must_use]
    pub fn x(&self) -> f32 {
        self.column.xs[self.row]
    }

    #[must_use]
    pub fn y(&self) -> f32 {
        self.column.ys[self.row]
    }

    #[must_use]
    pub fn direction(&self) -> f32 {
        self.column.directions[self.row]
    }

    pub fn set_x(&mut self, x: f32) {
        if self.column.xs[self.row] != x {
            self.column.xs[self.row] = x;
            self.column.dirty[self.row] |= X;
        }
    }

    pub fn set_y(&mut self, y: f32) {
        if self.column.ys[self.row] != y {
            self.column.ys[self.row] = y;
            self.column.dirty[self.row] |= Y;
        }
    }

    pub fn set_direction(&mut self, direction: f32) {
        if self.column.directions[self.row] != direction {
            self.column.directions[self.row] = direction;
            self.column.dirty[self.row] |= DIRECTION;
        }
    }
}

impl AnyColumn for TransformColumn {
    fn kind(&self) -> ComponentTypeId {
        Transform::component_type_id()
    }

    fn name(&self) -> &'static str {
        Transform::type_name()
    }

    fn contains(&self, entity: Entity) -> bool {
        self.row(entity).is_some()
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
        self.xs.clear();
        self.ys.clear();
        self.directions.clear();
        self.dirty.clear();
    }

    fn encode(&self, entity: Entity) -> Result<Vec<u8>, StoreError> {
        let value = self.get(entity).ok_or(StoreError::NotFound {
            kind: Transform::type_name(),
            entity,
        })?;
        encode_record(&value)
    }

    fn insert_encoded(&mut self, entity: Entity, bytes: &[u8]) -> Result<(), StoreError> {
        let value = decode_record::<Transform>(bytes)?;
        self.insert(entity, value);
        Ok(())
    }

    fn to_json(&self, entity: Entity) -> Result<serde_json::Value, StoreError> {
        let value = self.get(entity).ok_or(StoreError::NotFound {
            kind: Transform::type_name(),
            entity,
        })?;
        Ok(serde_json::to_value(value)?)
    }

    fn insert_json(
        &mut self,
        entity: Entity,
        data: Option<serde_json::Value>,
    ) -> Result<(), StoreError> {
        let value = resolve_record::<Transform>(data)?;
        self.insert(entity, value);
        Ok(())
    }

    fn validate_json(&self, data: Option<&serde_json::Value>) -> Result<(), StoreError> {
        resolve_record::<Transform>(data.cloned()).map(drop)
    }

    fn dirty_mask(&self, entity: Entity) -> u64 {
        self.row(entity).map_or(0, |row| self.dirty[row])
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

impl ComponentStorage<Transform> for TransformColumn {
    fn insert(&mut self, entity: Entity, value: Transform) {
        if let Some(row) = self.row(entity) {
            self.xs[row] = value.x;
            self.ys[row] = value.y;
            self.directions[row] = value.direction;
            self.dirty[row] = ALL;
            return;
        }
        if self.sparse.len() <= entity.index() {
            self.sparse.resize(entity.index() + 1, EMPTY);
        }
        self.sparse[entity.index()] = self.entities.len() as u32;
        self.entities.push(entity);
        self.xs.push(value.x);
        self.ys.push(value.y);
        self.directions.push(value.direction);
        self.dirty.push(ALL);
    }

    fn take(&mut self, entity: Entity) -> Option<Transform> {
        let row = self.row(entity)?;
        self.sparse[entity.index()] = EMPTY;
        self.entities.remove(row);
        self.dirty.remove(row);
        let value = Transform {
            x: self.xs.remove(row),
            y: self.ys.remove(row),
            direction: self.directions.remove(row),
        };
        for (i, moved) in self.entities.iter().enumerate().skip(row) {
            self.sparse[moved.index()] = i as u32;
        }
        Some(value)
    }

    fn read(&self, entity: Entity) -> Option<Transform> {
        self.get(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column() -> TransformColumn {
        let mut col = TransformColumn::new();
        col.insert(Entity(1), Transform::new(1.0, 2.0));
        col.insert(Entity(4), Transform::new(4.0, 5.0).with_direction(1.5));
        col.clear_dirty();
        col
    }

    #[test]
    fn test_soa_get() {
        let col = column();
        assert_eq!(col.get(Entity(4)), Some(Transform::new(4.0, 5.0).with_direction(1.5)));
        assert_eq!(col.position(Entity(1)), Some(Vec2::new(1.0, 2.0)));
        assert_eq!(col.get(Entity(2)), None);
    }

    #[test]
    fn test_per_field_change_bits() {
        let mut col = column();
        col.set_direction(Entity(1), 0.25);
        assert_eq!(col.dirty_mask(Entity(1)), DIRECTION);
        assert_eq!(col.dirty_mask(Entity(4)), 0);

        col.translate(Entity(4), Vec2::new(0.0, 1.0));
        assert_eq!(col.dirty_mask(Entity(4)), Y);
        assert_eq!(col.position(Entity(4)), Some(Vec2::new(4.0, 6.0)));

        col.set_position(Entity(4), Vec2::new(4.0, 6.0));
        assert_eq!(col.dirty_mask(Entity(4)), Y);
    }

    #[test]
    fn test_two_entities_mutated_independently() {
        let mut col = column();
        {
            let mut a = col.entity_mut(Entity(1)).unwrap();
            a.set_x(10.0);
        }
        {
            let mut b = col.entity_mut(Entity(4)).unwrap();
            b.set_x(-10.0);
        }
        assert_eq!(col.get(Entity(1)).unwrap().x, 10.0);
        assert_eq!(col.get(Entity(4)).unwrap().x, -10.0);
        assert_eq!(col.dirty_mask(Entity(1)), X);
    }

    #[test]
    fn test_take_preserves_order() {
        let mut col = column();
        col.insert(Entity(2), Transform::new(2.0, 2.0));
        assert_eq!(col.take(Entity(1)), Some(Transform::new(1.0, 2.0)));
        assert_eq!(col.entities(), &[Entity(4), Entity(2)]);
        assert_eq!(col.position(Entity(2)), Some(Vec2::new(2.0, 2.0)));
        assert!(!col.set(Entity(1), Transform::default()));
    }

    #[test]
    fn test_json_and_encoding() {
        let mut col = TransformColumn::new();
        col.insert_json(Entity(3), Some(serde_json::json!({"x": 7.0})))
            .unwrap();
        assert_eq!(col.get(Entity(3)), Some(Transform::new(7.0, 0.0)));

        let bytes = col.encode(Entity(3)).unwrap();
        let mut other = TransformColumn::new();
        other.insert_encoded(Entity(9), &bytes).unwrap();
        assert_eq!(other.get(Entity(9)), col.get(Entity(3)));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let t = Transform::new(1.0, 2.0).with_direction(3.0);
        let bytes = rmp_serde::to_vec(&t).unwrap();
        let restored: Transform = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(t, restored);
    }
}
