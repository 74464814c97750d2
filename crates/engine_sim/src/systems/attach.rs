//! Attachment: children follow a parent's transform.
//!
//! The pre pass runs before movement; children flagged `post` are placed
//! again after movement so they do not lag their parent by a frame. The
//! parent's `Attached` list mirrors its live children.

use engine_component::Entity;
use tracing::debug;

use crate::components::{Attach, Attached};
use crate::context::Ctx;
use crate::error::SimError;
use crate::system::{System, SystemDescriptor};

/// Copies the parent's transform plus offset onto the child. A parent that
/// is no longer alive clears the link instead.
fn follow_parent(ctx: &mut Ctx<'_>, entity: Entity) -> Result<(), SimError> {
    let attach = *ctx.get_component::<Attach>(entity)?;
    let Some(parent) = attach.parent else {
        return Ok(());
    };
    if !ctx.is_alive(parent) {
        debug!(%entity, %parent, "clearing stale attach parent");
        ctx.update_component::<Attach, _>(entity, |a| a.parent = None)?;
        return Ok(());
    }

    let transforms = ctx.transforms_mut()?;
    let Some(target) = transforms.get(parent) else {
        return Ok(());
    };
    if let Some(mut child) = transforms.entity_mut(entity) {
        child.set_x(target.x + attach.offset_x);
        child.set_y(target.y + attach.offset_y);
        if attach.copy_direction {
            child.set_direction(target.direction);
        }
    }
    Ok(())
}

/// Keeps attached children on their parents and maintains the parent's
/// `Attached` list.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttachSystem;

impl System for AttachSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::of::<Attach>("attach", 10.0)
    }

    fn init(&self, ctx: &mut Ctx<'_>, entity: Entity) -> Result<(), SimError> {
        let Some(parent) = ctx.get_component::<Attach>(entity)?.parent else {
            return Ok(());
        };
        if !ctx.is_alive(parent) {
            return Ok(());
        }
        if ctx.has_component::<Attached>(parent) {
            ctx.update_component::<Attached, _>(parent, |a| {
                if !a.children.contains(&entity) {
                    a.children.push(entity);
                }
            })?;
            Ok(())
        } else {
            ctx.add_component(
                parent,
                Attached {
                    children: vec![entity],
                },
            )
        }
    }

    fn run(&self, ctx: &mut Ctx<'_>, entity: Entity) -> Result<(), SimError> {
        follow_parent(ctx, entity)
    }

    fn cleanup(&self, ctx: &mut Ctx<'_>, entity: Entity) -> Result<(), SimError> {
        let Some(parent) = ctx.get_component::<Attach>(entity)?.parent else {
            return Ok(());
        };
        if ctx.has_component::<Attached>(parent) {
            ctx.update_component::<Attached, _>(parent, |a| a.children.retain(|&c| c != entity))?;
        }
        Ok(())
    }
}

/// Second pass for `post` children, after movement has run.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttachPostSystem;

impl System for AttachPostSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::of::<Attach>("attach_post", 500.0)
            .with_dependencies(&["Velocity"])
    }

    fn run(&self, ctx: &mut Ctx<'_>, entity: Entity) -> Result<(), SimError> {
        if ctx.get_component::<Attach>(entity)?.post {
            follow_parent(ctx, entity)?;
        }
        Ok(())
    }
}
