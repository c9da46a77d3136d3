//! Client-side prediction and smoothing toward the authoritative position.
//!
//! The local player moves as soon as input is sampled, using the same
//! normalize-and-slide step as the server. Authoritative positions only update
//! the reconciliation target; the rendered position then drifts toward it a
//! little every frame. Corrections older than `max_staleness` are ignored.

use log::debug;
use shared::movement::slide_step;
use shared::Vector2;
use std::time::{Duration, Instant};

/// Frame length the lerp factor is tuned for (60 Hz).
const REFERENCE_FRAME_MS: f32 = 16.67;

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Fraction of the error corrected per reference frame.
    pub lerp_factor: f32,
    pub max_staleness: Duration,
    /// Squared distance under which prediction and server agree.
    pub snap_threshold_sq: f32,
    pub scene_change_cooldown: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            lerp_factor: 0.1,
            max_staleness: Duration::from_millis(300),
            snap_threshold_sq: 0.01,
            scene_change_cooldown: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientReconciler {
    config: ReconcilerConfig,
    rendered: Vector2,
    server_position: Vector2,
    server_updated_at: Option<Instant>,
    prediction_pending: bool,
    speed: f32,
    half_extent: f32,
    scene_change_ready_at: Option<Instant>,
}

impl ClientReconciler {
    pub fn new(config: ReconcilerConfig) -> Self {
        Self {
            config,
            rendered: Vector2::ZERO,
            server_position: Vector2::ZERO,
            server_updated_at: None,
            prediction_pending: false,
            speed: 0.0,
            half_extent: 0.0,
            scene_change_ready_at: None,
        }
    }

    /// Movement parameters for prediction. Updated on every full snapshot.
    pub fn set_movement(&mut self, speed: f32, half_extent: f32) {
        self.speed = speed;
        self.half_extent = half_extent;
    }

    /// Moves the rendered position immediately.
    pub fn apply_prediction(&mut self, direction: Vector2, dt_secs: f32) {
        if !direction.is_finite() || direction.magnitude_squared() == 0.0 {
            return;
        }
        self.rendered = slide_step(
            self.rendered,
            direction,
            self.speed * dt_secs,
            self.half_extent,
        );
        self.prediction_pending = true;
    }

    /// Records an authoritative position. Never moves the rendered position.
    pub fn apply_server_update(&mut self, position: Vector2, at: Instant) {
        self.server_position = position;
        self.server_updated_at = Some(at);
    }

    /// Advances smoothing by one frame of `dt_ms` milliseconds.
    pub fn tick(&mut self, dt_ms: f32, now: Instant) {
        if !self.prediction_pending {
            return;
        }
        let Some(updated_at) = self.server_updated_at else {
            return;
        };
        if now.duration_since(updated_at) > self.config.max_staleness {
            return;
        }

        let error = self.server_position.sub(&self.rendered);
        if error.magnitude_squared() < self.config.snap_threshold_sq {
            self.prediction_pending = false;
            return;
        }

        let t = (self.config.lerp_factor * dt_ms / REFERENCE_FRAME_MS).clamp(0.0, 1.0);
        self.rendered = self.rendered.add(&error.scale(t));

        if self.server_position.sub(&self.rendered).magnitude_squared()
            < self.config.snap_threshold_sq
        {
            debug!("Prediction reconciled at ({:.2}, {:.2})", self.rendered.x, self.rendered.y);
            self.prediction_pending = false;
        }
    }

    /// Hard snap used when a full snapshot arrives.
    pub fn reset(&mut self, position: Vector2, at: Instant) {
        self.rendered = position;
        self.server_position = position;
        self.server_updated_at = Some(at);
        self.prediction_pending = false;
    }

    /// Returns false while the scene-change cooldown is running. A successful
    /// call starts a new cooldown.
    pub fn try_request_scene_change(&mut self, now: Instant) -> bool {
        if let Some(ready_at) = self.scene_change_ready_at {
            if now < ready_at {
                return false;
            }
        }
        self.scene_change_ready_at = Some(now + self.config.scene_change_cooldown);
        true
    }

    pub fn rendered_position(&self) -> Vector2 {
        self.rendered
    }

    pub fn server_position(&self) -> Vector2 {
        self.server_position
    }

    pub fn has_pending_prediction(&self) -> bool {
        self.prediction_pending
    }
}

impl Default for ClientReconciler {
    fn default() -> Self {
        Self::new(ReconcilerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn reconciler_at(position: Vector2, now: Instant) -> ClientReconciler {
        let mut reconciler = ClientReconciler::default();
        reconciler.set_movement(3.0, 50.0);
        reconciler.reset(position, now);
        reconciler
    }

    #[test]
    fn test_prediction_moves_immediately() {
        let now = Instant::now();
        let mut reconciler = reconciler_at(Vector2::ZERO, now);

        reconciler.apply_prediction(Vector2::new(1.0, 0.0), 0.1);

        assert_approx_eq!(reconciler.rendered_position().x, 0.3, 1e-5);
        assert!(reconciler.has_pending_prediction());
        assert_eq!(reconciler.server_position(), Vector2::ZERO);
    }

    #[test]
    fn test_prediction_uses_wall_slide() {
        let now = Instant::now();
        let mut reconciler = reconciler_at(Vector2::new(49.9, 0.0), now);

        reconciler.apply_prediction(Vector2::new(1.0, 1.0), 1.0);

        assert_eq!(reconciler.rendered_position().x, 49.9);
        assert_approx_eq!(reconciler.rendered_position().y, 3.0 / 2f32.sqrt(), 1e-4);
    }

    #[test]
    fn test_zero_direction_is_not_a_prediction() {
        let now = Instant::now();
        let mut reconciler = reconciler_at(Vector2::ZERO, now);

        reconciler.apply_prediction(Vector2::ZERO, 0.1);
        assert!(!reconciler.has_pending_prediction());
    }

    #[test]
    fn test_server_update_does_not_move_rendered() {
        let now = Instant::now();
        let mut reconciler = reconciler_at(Vector2::ZERO, now);

        reconciler.apply_server_update(Vector2::new(5.0, 5.0), now);

        assert_eq!(reconciler.rendered_position(), Vector2::ZERO);
        assert_eq!(reconciler.server_position(), Vector2::new(5.0, 5.0));
    }

    #[test]
    fn test_tick_lerps_toward_server() {
        let now = Instant::now();
        let mut reconciler = reconciler_at(Vector2::ZERO, now);
        reconciler.apply_prediction(Vector2::new(-1.0, 0.0), 0.0001);
        let start = reconciler.rendered_position().x;

        reconciler.apply_server_update(Vector2::new(1.0, 0.0), now);
        reconciler.tick(16.67, now);

        assert_approx_eq!(reconciler.rendered_position().x, start + (1.0 - start) * 0.1, 1e-4);
        assert!(reconciler.has_pending_prediction());
    }

    #[test]
    fn test_tick_scales_with_frame_time() {
        let now = Instant::now();
        let mut reconciler = reconciler_at(Vector2::ZERO, now);
        reconciler.apply_prediction(Vector2::new(-1.0, 0.0), 0.0001);
        let start = reconciler.rendered_position().x;

        reconciler.apply_server_update(Vector2::new(1.0, 0.0), now);
        reconciler.tick(33.34, now);

        assert_approx_eq!(reconciler.rendered_position().x, start + (1.0 - start) * 0.2, 1e-4);
    }

    #[test]
    fn test_huge_frame_clamps_to_target() {
        let now = Instant::now();
        let mut reconciler = reconciler_at(Vector2::ZERO, now);
        reconciler.apply_prediction(Vector2::new(1.0, 0.0), 0.1);

        reconciler.apply_server_update(Vector2::new(2.0, 2.0), now);
        reconciler.tick(10_000.0, now);

        assert_approx_eq!(reconciler.rendered_position().x, 2.0, 1e-5);
        assert_approx_eq!(reconciler.rendered_position().y, 2.0, 1e-5);
        assert!(!reconciler.has_pending_prediction());
    }

    #[test]
    fn test_stale_correction_ignored() {
        let start = Instant::now();
        let mut reconciler = reconciler_at(Vector2::ZERO, start);
        reconciler.apply_prediction(Vector2::new(1.0, 0.0), 0.1);
        let predicted = reconciler.rendered_position();

        reconciler.apply_server_update(Vector2::new(5.0, 0.0), start);
        reconciler.tick(16.67, start + Duration::from_millis(301));

        assert_eq!(reconciler.rendered_position(), predicted);
        assert!(reconciler.has_pending_prediction());
    }

    #[test]
    fn test_no_correction_without_prediction() {
        let now = Instant::now();
        let mut reconciler = reconciler_at(Vector2::ZERO, now);

        reconciler.apply_server_update(Vector2::new(1.0, 0.0), now);
        reconciler.tick(16.67, now);

        assert_eq!(reconciler.rendered_position(), Vector2::ZERO);
    }

    #[test]
    fn test_converged_prediction_is_cleared() {
        let now = Instant::now();
        let mut reconciler = reconciler_at(Vector2::ZERO, now);
        reconciler.apply_prediction(Vector2::new(1.0, 0.0), 0.1);

        reconciler.apply_server_update(Vector2::new(0.32, 0.0), now);
        reconciler.tick(16.67, now);

        assert!(!reconciler.has_pending_prediction());
        assert_approx_eq!(reconciler.rendered_position().x, 0.3, 1e-5);
    }

    #[test]
    fn test_reset_snaps() {
        let now = Instant::now();
        let mut reconciler = reconciler_at(Vector2::ZERO, now);
        reconciler.apply_prediction(Vector2::new(1.0, 0.0), 0.1);

        reconciler.reset(Vector2::new(0.0, 30.0), now);

        assert_eq!(reconciler.rendered_position(), Vector2::new(0.0, 30.0));
        assert_eq!(reconciler.server_position(), Vector2::new(0.0, 30.0));
        assert!(!reconciler.has_pending_prediction());
    }

    #[test]
    fn test_scene_change_cooldown() {
        let start = Instant::now();
        let mut reconciler = ClientReconciler::default();

        assert!(reconciler.try_request_scene_change(start));
        assert!(!reconciler.try_request_scene_change(start + Duration::from_millis(500)));
        assert!(!reconciler.try_request_scene_change(start + Duration::from_millis(1999)));
        assert!(reconciler.try_request_scene_change(start + Duration::from_secs(2)));
        assert!(!reconciler.try_request_scene_change(start + Duration::from_millis(2100)));
    }
}
