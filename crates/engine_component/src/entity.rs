//! Entity type and allocation utilities.
//!
//! An [`Entity`] is a lightweight `u32` identifier with no inherent data.
//! Each simulation instance owns one [`EntityAllocator`]; ids are never shared
//! between instances.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// A unique entity identifier.
///
/// Entities are pure identifiers and carry no data of their own. Components
/// are attached to entities to give them meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(pub u32);

impl Entity {
    /// The null / invalid entity sentinel.
    pub const INVALID: Entity = Entity(0);

    /// Create an entity from a raw `u32` identifier.
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw `u32` identifier.
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }

    /// Returns the identifier as a slot index for sparse lookups.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns `true` if this is a valid (non-zero) entity.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Allocates and recycles entity ids.
///
/// Released ids are parked for two calls of
/// [`EntityAllocator::flush_released`] (made once per completed frame), then
/// handed out again oldest-first. A removed id therefore survives at least one
/// full frame after its removal, so relationship passes see the stale link
/// before the id can alias a new entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityAllocator {
    next_id: u32,
    alive: Vec<bool>,
    live_count: usize,
    free: VecDeque<u32>,
    cooling: Vec<u32>,
    released: Vec<u32>,
}

impl EntityAllocator {
    /// Creates a new allocator. IDs start at 1 (0 is reserved for [`Entity::INVALID`]).
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            alive: vec![false],
            live_count: 0,
            free: VecDeque::new(),
            cooling: Vec::new(),
            released: Vec::new(),
        }
    }

    /// Allocates an entity id, reusing the oldest recycled id if one is free.
    pub fn allocate(&mut self) -> Entity {
        let id = match self.free.pop_front() {
            Some(id) => id,
            None => {
                let id = self.next_id;
                self.next_id += 1;
                self.alive.push(false);
                id
            }
        };
        self.alive[id as usize] = true;
        self.live_count += 1;
        Entity(id)
    }

    /// Marks an entity as dead. Returns `false` if it was not alive.
    pub fn release(&mut self, entity: Entity) -> bool {
        match self.alive.get_mut(entity.index()) {
            Some(slot) if *slot => {
                *slot = false;
                self.live_count -= 1;
                self.released.push(entity.0);
                true
            }
            _ => false,
        }
    }

    /// Ages released ids by one frame. Ids released before the previous
    /// flush become available for reuse.
    pub fn flush_released(&mut self) {
        self.free.extend(self.cooling.drain(..));
        std::mem::swap(&mut self.cooling, &mut self.released);
    }

    /// Returns `true` if the entity is currently allocated.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.alive.get(entity.index()).copied().unwrap_or(false)
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn count(&self) -> usize {
        self.live_count
    }

    /// Iterates live entities in ascending id order.
    pub fn alive_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(id, _)| Entity(id as u32))
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}
