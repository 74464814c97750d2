//! Deferred structural changes.
//!
//! Entity and component add/remove requested while the pipeline is running
//! are queued here and applied in request order once every system has run, so
//! the set of entities each system sees is fixed for the whole frame.

use engine_component::{ComponentStore, ComponentTypeId, Entity, StoreError};
use serde_json::Value;

/// Writes one typed record into the store.
pub(crate) type InsertFn = Box<dyn FnOnce(&mut ComponentStore) -> Result<(), StoreError>>;

pub(crate) enum Command {
    RemoveEntity(Entity),
    Insert {
        entity: Entity,
        kind: ComponentTypeId,
        insert: InsertFn,
    },
    InsertJson {
        entity: Entity,
        kind: String,
        data: Option<Value>,
    },
    Remove {
        entity: Entity,
        kind: ComponentTypeId,
    },
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RemoveEntity(entity) => f.debug_tuple("RemoveEntity").field(entity).finish(),
            Self::Insert { entity, kind, .. } => f
                .debug_struct("Insert")
                .field("entity", entity)
                .field("kind", kind)
                .finish_non_exhaustive(),
            Self::InsertJson { entity, kind, data } => f
                .debug_struct("InsertJson")
                .field("entity", entity)
                .field("kind", kind)
                .field("data", data)
                .finish(),
            Self::Remove { entity, kind } => f
                .debug_struct("Remove")
                .field("entity", entity)
                .field("kind", kind)
                .finish(),
        }
    }
}

/// FIFO of pending structural changes.
#[derive(Debug, Default)]
pub(crate) struct CommandQueue {
    pending: Vec<Command>,
}

impl CommandQueue {
    pub(crate) fn push(&mut self, command: Command) {
        self.pending.push(command);
    }

    /// Take every pending command, leaving the queue empty.
    pub(crate) fn drain(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}
