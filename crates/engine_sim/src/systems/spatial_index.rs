//! Per-frame rebuild of the collider spatial maps.

use std::collections::BTreeMap;

use engine_component::{Category, Entity};

use crate::components::{Collider, Velocity};
use crate::context::Ctx;
use crate::error::SimError;
use crate::spatial::{SpatialEntry, SpatialMap};
use crate::system::{System, SystemDescriptor};

/// Rebuilds one spatial map per collider category every frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialIndexSystem;

impl System for SpatialIndexSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::of::<Collider>("spatial_index", 150.0).with_dependencies(&["Velocity"])
    }

    fn run_all(&self, ctx: &mut Ctx<'_>, entities: &[Entity]) -> Result<(), SimError> {
        let mut groups: BTreeMap<Category, Vec<SpatialEntry>> = BTreeMap::new();
        {
            let colliders = ctx.column::<Collider>()?;
            let velocities = ctx.column::<Velocity>()?;
            let transforms = ctx.transforms()?;
            for &entity in entities {
                let Some(collider) = colliders.get(entity) else {
                    continue;
                };
                let Some(position) = transforms.position(entity) else {
                    continue;
                };
                groups.entry(collider.category).or_default().push(SpatialEntry {
                    entity,
                    position,
                    radius: collider.radius,
                    speed: velocities.get(entity).map_or(0.0, Velocity::speed),
                });
            }
        }

        let cell_size = ctx.config().cell_size;
        for (category, map) in &mut ctx.spatial {
            if !groups.contains_key(category) {
                map.rebuild(&[]);
            }
        }
        for (category, entries) in groups {
            ctx.spatial
                .entry(category)
                .or_insert_with(|| SpatialMap::new(cell_size))
                .rebuild(&entries);
        }
        Ok(())
    }
}
