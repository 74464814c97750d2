//! The component store: one column per registered kind.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::column::{AnyColumn, ComponentStorage, DenseColumn};
use crate::component::{Component, ComponentMeta, ComponentTypeId};
use crate::entity::Entity;
use crate::error::StoreError;

/// Serialised contents of one column, rows in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSnapshot {
    pub kind: String,
    pub rows: Vec<(Entity, Vec<u8>)>,
}

/// Holds every component column of one simulation instance.
///
/// Columns are kept in registration order. Anything that walks "all kinds of
/// an entity" (removal, ejection, snapshots) follows that order, so it is
/// stable across peers that register the same kinds in the same sequence.
#[derive(Default)]
pub struct ComponentStore {
    columns: Vec<Box<dyn AnyColumn>>,
    metas: Vec<ComponentMeta>,
    index: HashMap<ComponentTypeId, usize>,
    by_name: HashMap<&'static str, usize>,
}

impl std::fmt::Debug for ComponentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentStore")
            .field("kinds", &self.metas.iter().map(|m| m.name).collect::<Vec<_>>())
            .finish()
    }
}

impl ComponentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind from its metadata. Returns `false` if a kind with the
    /// same id was already registered.
    pub fn register_meta(&mut self, meta: ComponentMeta) -> bool {
        if self.index.contains_key(&meta.type_id) {
            return false;
        }
        let slot = self.columns.len();
        self.columns.push((meta.new_column)());
        self.index.insert(meta.type_id, slot);
        self.by_name.insert(meta.name, slot);
        self.metas.push(meta);
        true
    }

    pub fn register<T: Component>(&mut self) -> bool {
        self.register_meta(T::meta())
    }

    #[must_use]
    pub fn is_registered(&self, kind: ComponentTypeId) -> bool {
        self.index.contains_key(&kind)
    }

    /// Registered kinds, in registration order.
    #[must_use]
    pub fn metas(&self) -> &[ComponentMeta] {
        &self.metas
    }

    #[must_use]
    pub fn meta(&self, kind: ComponentTypeId) -> Option<&ComponentMeta> {
        self.index.get(&kind).map(|&slot| &self.metas[slot])
    }

    #[must_use]
    pub fn meta_by_name(&self, name: &str) -> Option<&ComponentMeta> {
        self.by_name.get(name).map(|&slot| &self.metas[slot])
    }

    fn slot_of<T: Component>(&self) -> Result<usize, StoreError> {
        self.index
            .get(&T::component_type_id())
            .copied()
            .ok_or_else(|| StoreError::UnknownKind(T::type_name().to_string()))
    }

    /// Typed access to a kind's column.
    pub fn column<T: Component>(&self) -> Result<&T::Storage, StoreError> {
        let slot = self.slot_of::<T>()?;
        self.columns[slot]
            .as_any()
            .downcast_ref::<T::Storage>()
            .ok_or_else(|| StoreError::UnknownKind(T::type_name().to_string()))
    }

    pub fn column_mut<T: Component>(&mut self) -> Result<&mut T::Storage, StoreError> {
        let slot = self.slot_of::<T>()?;
        self.columns[slot]
            .as_any_mut()
            .downcast_mut::<T::Storage>()
            .ok_or_else(|| StoreError::UnknownKind(T::type_name().to_string()))
    }

    #[must_use]
    pub fn column_dyn(&self, kind: ComponentTypeId) -> Option<&dyn AnyColumn> {
        self.index.get(&kind).map(|&slot| self.columns[slot].as_ref())
    }

    pub fn column_dyn_mut(&mut self, kind: ComponentTypeId) -> Option<&mut dyn AnyColumn> {
        match self.index.get(&kind) {
            Some(&slot) => Some(self.columns[slot].as_mut()),
            None => None,
        }
    }

    /// Attach or replace a record.
    pub fn insert<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), StoreError> {
        self.column_mut::<T>()?.insert(entity, value);
        Ok(())
    }

    /// Attach a record of a kind named at runtime, from partial JSON.
    pub fn insert_json(
        &mut self,
        kind: &str,
        entity: Entity,
        data: Option<Value>,
    ) -> Result<ComponentTypeId, StoreError> {
        let slot = *self
            .by_name
            .get(kind)
            .ok_or_else(|| StoreError::UnknownKind(kind.to_string()))?;
        self.columns[slot].insert_json(entity, data)?;
        Ok(self.metas[slot].type_id)
    }

    /// Check partial JSON for a kind named at runtime without inserting it.
    pub fn validate_json(
        &self,
        kind: &str,
        data: Option<&Value>,
    ) -> Result<ComponentTypeId, StoreError> {
        let slot = *self
            .by_name
            .get(kind)
            .ok_or_else(|| StoreError::UnknownKind(kind.to_string()))?;
        self.columns[slot].validate_json(data)?;
        Ok(self.metas[slot].type_id)
    }

    /// Detach and return a record.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> Result<Option<T>, StoreError> {
        Ok(self.column_mut::<T>()?.take(entity))
    }

    pub fn remove_kind(&mut self, kind: ComponentTypeId, entity: Entity) -> bool {
        self.column_dyn_mut(kind)
            .is_some_and(|column| column.remove_entity(entity))
    }

    /// Detach every component of an entity.
    pub fn remove_all(&mut self, entity: Entity) {
        for column in &mut self.columns {
            column.remove_entity(entity);
        }
    }

    #[must_use]
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.has_kind(T::component_type_id(), entity)
    }

    #[must_use]
    pub fn has_kind(&self, kind: ComponentTypeId, entity: Entity) -> bool {
        self.column_dyn(kind).is_some_and(|column| column.contains(entity))
    }

    /// Borrow a record stored in a dense column.
    pub fn get<T>(&self, entity: Entity) -> Option<&T>
    where
        T: Component<Storage = DenseColumn<T>>,
    {
        self.column::<T>().ok()?.get(entity)
    }

    /// Update a record stored in a dense column, tracking changed fields.
    pub fn update<T, R>(&mut self, entity: Entity, f: impl FnOnce(&mut T) -> R) -> Option<R>
    where
        T: Component<Storage = DenseColumn<T>>,
    {
        self.column_mut::<T>().ok()?.update(entity, f)
    }

    /// An owned copy of a record, whatever its storage.
    #[must_use]
    pub fn read<T: Component>(&self, entity: Entity) -> Option<T> {
        self.column::<T>().ok()?.read(entity)
    }

    /// Entities holding a kind, in insertion order. Empty if unregistered.
    #[must_use]
    pub fn entities<T: Component>(&self) -> &[Entity] {
        self.entities_of(T::component_type_id())
    }

    #[must_use]
    pub fn entities_of(&self, kind: ComponentTypeId) -> &[Entity] {
        self.column_dyn(kind)
            .map(|column| column.entities())
            .unwrap_or(&[])
    }

    /// Kinds attached to an entity, in registration order.
    #[must_use]
    pub fn kinds_of(&self, entity: Entity) -> Vec<ComponentTypeId> {
        self.columns
            .iter()
            .filter(|column| column.contains(entity))
            .map(|column| column.kind())
            .collect()
    }

    /// Non-zero dirty masks as `(entity, kind, mask)`, column by column.
    #[must_use]
    pub fn dirty_entries(&self) -> Vec<(Entity, ComponentTypeId, u64)> {
        let mut out = Vec::new();
        for column in &self.columns {
            for &entity in column.entities() {
                let mask = column.dirty_mask(entity);
                if mask != 0 {
                    out.push((entity, column.kind(), mask));
                }
            }
        }
        out
    }

    pub fn clear_dirty(&mut self) {
        for column in &mut self.columns {
            column.clear_dirty();
        }
    }

    /// Drop every record, keeping registrations.
    pub fn clear(&mut self) {
        for column in &mut self.columns {
            column.clear();
        }
    }

    /// Serialise every column.
    pub fn snapshot(&self) -> Result<Vec<ColumnSnapshot>, StoreError> {
        self.columns
            .iter()
            .map(|column| {
                let rows = column
                    .entities()
                    .iter()
                    .map(|&e| Ok((e, column.encode(e)?)))
                    .collect::<Result<Vec<_>, StoreError>>()?;
                Ok(ColumnSnapshot {
                    kind: column.name().to_string(),
                    rows,
                })
            })
            .collect()
    }

    /// Replace all records with the contents of a snapshot.
    ///
    /// Every kind named in the snapshot must be registered.
    pub fn restore(&mut self, snapshot: &[ColumnSnapshot]) -> Result<(), StoreError> {
        for column in snapshot {
            if !self.by_name.contains_key(column.kind.as_str()) {
                return Err(StoreError::UnknownKind(column.kind.clone()));
            }
        }
        self.clear();
        for column in snapshot {
            let slot = self.by_name[column.kind.as_str()];
            for (entity, bytes) in &column.rows {
                self.columns[slot].insert_encoded(*entity, bytes)?;
            }
        }
        self.clear_dirty();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ComponentSchema, FieldDescriptor, FieldType};
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Speed {
        value: f32,
    }

    impl Component for Speed {
        type Storage = DenseColumn<Self>;

        fn type_name() -> &'static str {
            "Speed"
        }

        fn schema() -> ComponentSchema {
            ComponentSchema::new(Self::type_name(), Self::category())
                .field(FieldDescriptor::new("value", FieldType::Float))
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Frozen {}

    impl Component for Frozen {
        type Storage = DenseColumn<Self>;

        fn type_name() -> &'static str {
            "Frozen"
        }

        fn schema() -> ComponentSchema {
            ComponentSchema::new(Self::type_name(), Self::category())
        }
    }

    fn store() -> ComponentStore {
        let mut store = ComponentStore::new();
        assert!(store.register::<Speed>());
        assert!(store.register::<Frozen>());
        store
    }

    #[test]
    fn test_register_is_unique() {
        let mut store = store();
        assert!(!store.register::<Speed>());
        assert_eq!(store.metas().len(), 2);
        assert!(store.meta_by_name("Frozen").is_some());
    }

    #[test]
    fn test_unregistered_kind_errors() {
        let mut store = ComponentStore::new();
        let err = store.insert(Entity(1), Speed::default());
        assert!(matches!(err, Err(StoreError::UnknownKind(_))));
        assert!(store.entities::<Speed>().is_empty());
        assert!(!store.has::<Speed>(Entity(1)));
    }

    #[test]
    fn test_insert_get_remove() {
        let mut store = store();
        store.insert(Entity(1), Speed { value: 2.0 }).unwrap();
        store.insert(Entity(1), Frozen {}).unwrap();
        assert_eq!(store.get::<Speed>(Entity(1)), Some(&Speed { value: 2.0 }));
        assert_eq!(
            store.kinds_of(Entity(1)),
            vec![Speed::component_type_id(), Frozen::component_type_id()]
        );

        assert_eq!(store.remove::<Speed>(Entity(1)).unwrap(), Some(Speed { value: 2.0 }));
        assert!(!store.has::<Speed>(Entity(1)));
        store.remove_all(Entity(1));
        assert!(store.kinds_of(Entity(1)).is_empty());
    }

    #[test]
    fn test_insert_json_by_name() {
        let mut store = store();
        let kind = store
            .insert_json("Speed", Entity(2), Some(json!({"value": 1.5})))
            .unwrap();
        assert_eq!(kind, Speed::component_type_id());
        assert_eq!(store.read::<Speed>(Entity(2)), Some(Speed { value: 1.5 }));

        store.insert_json("Frozen", Entity(2), None).unwrap();
        assert!(store.has::<Frozen>(Entity(2)));

        assert!(matches!(
            store.insert_json("Nope", Entity(2), None),
            Err(StoreError::UnknownKind(_))
        ));
    }

    #[test]
    fn test_validate_json_leaves_store_untouched() {
        let mut store = store();
        store.insert(Entity(1), Speed { value: 2.0 }).unwrap();

        let kind = store.validate_json("Speed", Some(&json!({"value": 4.0}))).unwrap();
        assert_eq!(kind, Speed::component_type_id());
        assert!(matches!(
            store.validate_json("Speed", Some(&json!({"value": "fast"}))),
            Err(StoreError::Validation { .. })
        ));
        assert!(matches!(
            store.validate_json("Nope", None),
            Err(StoreError::UnknownKind(_))
        ));
        assert_eq!(store.get::<Speed>(Entity(1)), Some(&Speed { value: 2.0 }));
        assert_eq!(store.entities::<Speed>(), &[Entity(1)]);
    }

    #[test]
    fn test_dirty_entries() {
        let mut store = store();
        store.insert(Entity(1), Speed { value: 1.0 }).unwrap();
        store.insert(Entity(2), Speed { value: 1.0 }).unwrap();
        store.clear_dirty();
        assert!(store.dirty_entries().is_empty());

        store.update::<Speed, _>(Entity(2), |s| s.value = 3.0);
        assert_eq!(
            store.dirty_entries(),
            vec![(Entity(2), Speed::component_type_id(), 1)]
        );
    }

    #[test]
    fn test_snapshot_restore() {
        let mut store = store();
        store.insert(Entity(3), Speed { value: 3.0 }).unwrap();
        store.insert(Entity(1), Speed { value: 1.0 }).unwrap();
        store.insert(Entity(1), Frozen {}).unwrap();
        let snapshot = store.snapshot().unwrap();

        store.remove_all(Entity(3));
        store.insert(Entity(9), Frozen {}).unwrap();
        store.restore(&snapshot).unwrap();

        assert_eq!(store.entities::<Speed>(), &[Entity(3), Entity(1)]);
        assert_eq!(store.entities::<Frozen>(), &[Entity(1)]);
        assert!(store.dirty_entries().is_empty());
    }

    #[test]
    fn test_restore_rejects_unknown_kind() {
        let mut store = store();
        store.insert(Entity(1), Speed { value: 1.0 }).unwrap();
        let bad = vec![ColumnSnapshot {
            kind: "Ghost".into(),
            rows: Vec::new(),
        }];
        assert!(store.restore(&bad).is_err());
        assert!(store.has::<Speed>(Entity(1)));
    }
}
