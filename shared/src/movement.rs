//! Displacement and wall-slide resolution.
//!
//! The server runs this to produce authoritative positions and the client runs
//! the exact same code to predict them, so a well-behaved client only ever sees
//! corrections caused by timing, never by differing rules.

use crate::math::Vector2;

/// Inclusive square envelope check, `[-half, +half]` on both axes.
pub fn within_bounds(position: &Vector2, half_extent: f32) -> bool {
    position.x >= -half_extent
        && position.x <= half_extent
        && position.y >= -half_extent
        && position.y <= half_extent
}

/// Moves `position` by `direction` (normalized here) over `distance` units.
///
/// When the full move leaves the envelope the X-only move is tried first, then
/// the Y-only move. If neither fits the position is returned unchanged.
pub fn slide_step(position: Vector2, direction: Vector2, distance: f32, half_extent: f32) -> Vector2 {
    let dir = direction.normalize();
    let candidate = position.add(&dir.scale(distance));
    if within_bounds(&candidate, half_extent) {
        return candidate;
    }

    let x_only = Vector2::new(candidate.x, position.y);
    if within_bounds(&x_only, half_extent) {
        return x_only;
    }

    let y_only = Vector2::new(position.x, candidate.y);
    if within_bounds(&y_only, half_extent) {
        return y_only;
    }

    position
}
