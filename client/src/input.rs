//! Scripted input for the headless client

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{MoveDirection, SceneId};
use std::time::{Duration, Instant};

/// Wanders in a random direction, picking a new one every few seconds and
/// standing still now and then.
pub struct InputManager {
    rng: StdRng,
    direction: MoveDirection,
    next_change: Option<Instant>,
}

impl InputManager {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic input for tests and reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            direction: MoveDirection::new(0.0, 0.0),
            next_change: None,
        }
    }

    /// Returns the direction to move in at `now`.
    pub fn update(&mut self, now: Instant) -> MoveDirection {
        let due = self.next_change.map_or(true, |at| now >= at);
        if due {
            self.direction = if self.rng.gen_bool(0.2) {
                MoveDirection::new(0.0, 0.0)
            } else {
                let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
                MoveDirection::new(angle.cos(), angle.sin())
            };
            let hold = Duration::from_millis(self.rng.gen_range(1_000..3_000));
            self.next_change = Some(now + hold);
        }
        self.direction
    }

    /// Picks a scene other than `current` to travel to.
    pub fn pick_scene(&mut self, current: SceneId) -> SceneId {
        let others: Vec<SceneId> = SceneId::ALL
            .into_iter()
            .filter(|scene| *scene != current)
            .collect();
        others[self.rng.gen_range(0..others.len())]
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}
