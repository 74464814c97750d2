//! World-slot coordinate rebasing.
//!
//! An unbounded scrolling level is cut into fixed-width windows. Each window
//! is a "world" slot centred on `world * width`, and coordinates are rebased
//! into the window of the slot an entity lives in. Distances between two
//! entities are only meaningful when both were rebased into the same slot.

/// Default width of one world window, in simulation units.
pub const WORLD_WIDTH: f32 = 16384.0;

/// The slot whose window contains `raw`.
#[must_use]
pub fn world_of(raw: f32, width: f32) -> i32 {
    ((raw + width / 2.0) / width).floor() as i32
}

/// Rebase `raw` into the window of `world`.
///
/// Values already inside `[world*W - W/2, world*W + W/2]` are returned as-is,
/// so applying this twice yields the same value as applying it once.
#[must_use]
pub fn to_world_space(world: i32, raw: f32, width: f32) -> f32 {
    let centre = world as f32 * width;
    let half = width / 2.0;
    if raw >= centre - half && raw <= centre + half {
        return raw;
    }
    let offset = world_of(raw, width) as f32;
    centre + (raw - offset * width)
}
