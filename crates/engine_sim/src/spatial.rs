//! Broad-phase spatial hash.
//!
//! A [`SpatialMap`] buckets entities into square grid cells. Each entity
//! covers every cell touched by its position padded by `radius + speed`, so a
//! fast mover is still found by queries made against this frame's map. The
//! map is a candidate filter only: callers run their own overlap test.

use std::collections::HashMap;

use engine_component::Entity;
use engine_math::Vec2;

/// Widest footprint, in cells per axis side, an entity is indexed over.
pub const MAX_PAD_CELLS: f32 = 256.0;

/// Inclusive range of cells covered by a footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    pub min: (i32, i32),
    pub max: (i32, i32),
}

impl CellRect {
    fn cells(self) -> impl Iterator<Item = (i32, i32)> {
        (self.min.0..=self.max.0)
            .flat_map(move |cx| (self.min.1..=self.max.1).map(move |cy| (cx, cy)))
    }
}

/// One entity to index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialEntry {
    pub entity: Entity,
    pub position: Vec2,
    pub radius: f32,
    pub speed: f32,
}

/// Grid-cell buckets of entity ids.
#[derive(Debug, Clone)]
pub struct SpatialMap {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<Entity>>,
    footprints: HashMap<Entity, CellRect>,
}

impl SpatialMap {
    #[must_use]
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
            footprints: HashMap::new(),
        }
    }

    /// Build a map from scratch.
    #[must_use]
    pub fn build(entries: &[SpatialEntry], cell_size: f32) -> Self {
        let mut map = Self::new(cell_size);
        map.rebuild(entries);
        map
    }

    /// Re-index `entries`, reusing bucket allocations from the last build.
    pub fn rebuild(&mut self, entries: &[SpatialEntry]) {
        self.cells.retain(|_, bucket| !bucket.is_empty());
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
        self.footprints.clear();

        for entry in entries {
            let rect = self.rect(entry.position, entry.radius.max(0.0) + entry.speed.max(0.0));
            for cell in rect.cells() {
                self.cells.entry(cell).or_default().push(entry.entity);
            }
            self.footprints.insert(entry.entity, rect);
        }
    }

    #[must_use]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of indexed entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.footprints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.footprints.is_empty()
    }

    /// The cells an entity was inserted into by the last build.
    #[must_use]
    pub fn footprint(&self, entity: Entity) -> Option<CellRect> {
        self.footprints.get(&entity).copied()
    }

    fn cell(&self, v: f32) -> i32 {
        (v / self.cell_size).floor() as i32
    }

    fn rect(&self, position: Vec2, pad: f32) -> CellRect {
        let pad = if pad.is_finite() {
            pad.min(self.cell_size * MAX_PAD_CELLS)
        } else {
            0.0
        };
        CellRect {
            min: (self.cell(position.x - pad), self.cell(position.y - pad)),
            max: (self.cell(position.x + pad), self.cell(position.y + pad)),
        }
    }

    /// Candidates whose footprint shares a cell with the query circle's
    /// bounding box, sorted and de-duplicated.
    #[must_use]
    pub fn query(&self, position: Vec2, radius: f32, exclude: Option<Entity>) -> Vec<Entity> {
        let mut out = Vec::new();
        for cell in self.rect(position, radius.max(0.0)).cells() {
            if let Some(bucket) = self.cells.get(&cell) {
                out.extend(bucket.iter().copied());
            }
        }
        out.sort_unstable();
        out.dedup();
        if let Some(excluded) = exclude {
            out.retain(|&e| e != excluded);
        }
        out
    }
}
