//! Authoritative entity storage.
//!
//! This module owns the canonical copy of every connected player:
//! - Entity creation with randomized spawn position and color
//! - Lookup, iteration and removal by connection id
//! - Server-side attribute updates with clamping
//! - Idle detection for the periodic sweep
//!
//! Only server code mutates these values. Clients receive [`PlayerSnapshot`]s.

use crate::config::{GameConfig, SpawnArea};
use log::{debug, info};
use rand::Rng;
use shared::{EntityId, PlayerSnapshot, PlayerStats, SceneId, Vector2};
use std::collections::HashMap;
use std::time::Duration;

/// Colors handed out to new players.
pub const PLAYER_COLORS: [&str; 10] = [
    "#FF5733", "#33FF57", "#3357FF", "#FF33A8", "#33FFF5", "#FFBD33", "#BD33FF", "#FF3333",
    "#33FFBD", "#A833FF",
];

/// Server-side state of one connected player
#[derive(Debug, Clone)]
pub struct Player {
    pub id: EntityId,
    pub name: String,
    pub color: String,
    pub position: Vector2,
    pub scene: SceneId,
    pub speed: f32,
    pub health: u32,
    pub max_health: u32,
    pub level: u32,
    pub experience: u64,
    pub stats: PlayerStats,
    /// Server time (ms) of the last accepted movement. Never decreases.
    pub last_move_accepted_at: u64,
    /// Server time (ms) of the last accepted mutation of any kind.
    pub last_activity_at: u64,
    pub created_at: u64,
}

impl Player {
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            name: self.name.clone(),
            color: self.color.clone(),
            position: self.position,
            scene: self.scene,
            speed: self.speed,
            health: self.health,
            max_health: self.max_health,
            level: self.level,
            experience: self.experience,
            stats: self.stats,
        }
    }

    /// Commits an accepted movement.
    pub fn record_move(&mut self, position: Vector2, now: u64) {
        self.position = position;
        self.last_move_accepted_at = self.last_move_accepted_at.max(now);
        self.touch(now);
    }

    /// Marks the player as active without moving it.
    pub fn touch(&mut self, now: u64) {
        self.last_activity_at = self.last_activity_at.max(now);
    }

    pub fn is_idle(&self, now: u64, timeout: Duration) -> bool {
        now.saturating_sub(self.last_activity_at) > timeout.as_millis() as u64
    }
}

/// Partial attribute change requested by server-side game logic.
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AttributeUpdate {
    pub speed: Option<f32>,
    pub health: Option<u32>,
    pub level: Option<u32>,
    pub experience: Option<u64>,
    pub strength: Option<u32>,
    pub agility: Option<u32>,
    pub intelligence: Option<u32>,
}

/// Owns every connected player, keyed by connection id
///
/// The store itself is not synchronized. It lives inside the coordinator,
/// which is only ever driven from a single task.
pub struct EntityStore {
    players: HashMap<EntityId, Player>,
    config: GameConfig,
}

impl EntityStore {
    pub fn new(config: GameConfig) -> Self {
        Self {
            players: HashMap::new(),
            config,
        }
    }

    /// Creates a player in the default scene at a random spawn position.
    ///
    /// A blank or missing name hint falls back to a generated display name.
    pub fn create(&mut self, id: EntityId, name_hint: Option<&str>, now: u64) -> &Player {
        let mut rng = rand::thread_rng();

        let name = match name_hint.map(str::trim) {
            Some(hint) if !hint.is_empty() => hint.to_string(),
            _ => format!("Player {}", rng.gen_range(0..1000)),
        };
        let color = PLAYER_COLORS[rng.gen_range(0..PLAYER_COLORS.len())].to_string();
        let position = random_spawn(&mut rng, &self.config.spawn_area);

        let player = Player {
            id,
            name,
            color,
            position,
            scene: SceneId::default(),
            speed: self
                .config
                .default_speed
                .clamp(1.0, self.config.max_speed.max(1.0)),
            health: 100,
            max_health: 100,
            level: 1,
            experience: 0,
            stats: PlayerStats::default(),
            last_move_accepted_at: now,
            last_activity_at: now,
            created_at: now,
        };

        info!(
            "Created player {} ({}) at ({:.2}, {:.2})",
            player.name, id, position.x, position.y
        );
        self.players.insert(id, player);
        &self.players[&id]
    }

    pub fn get(&self, id: EntityId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Removes a player. Returns false if the id was unknown.
    pub fn remove(&mut self, id: EntityId) -> bool {
        if let Some(player) = self.players.remove(&id) {
            info!("Removed player {} ({})", player.name, id);
            true
        } else {
            false
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Snapshots of every player in `scene`, ordered by id.
    pub fn in_scene(&self, scene: SceneId) -> Vec<PlayerSnapshot> {
        let mut players: Vec<PlayerSnapshot> = self
            .players
            .values()
            .filter(|p| p.scene == scene)
            .map(Player::snapshot)
            .collect();
        players.sort_by_key(|p| p.id);
        players
    }

    /// Applies server-driven attribute changes with clamping.
    ///
    /// Speed is held in `[1, max_speed]`, health in `[0, max_health]`, stats in
    /// `[1, max_stat_value]`. Level and experience only ever grow.
    pub fn update_attributes(&mut self, id: EntityId, update: AttributeUpdate, now: u64) -> bool {
        let max_speed = self.config.max_speed.max(1.0);
        let max_stat = self.config.max_stat_value.max(1);

        let Some(player) = self.players.get_mut(&id) else {
            return false;
        };

        if let Some(speed) = update.speed.filter(|s| s.is_finite()) {
            player.speed = speed.clamp(1.0, max_speed);
        }
        if let Some(health) = update.health {
            player.health = health.min(player.max_health);
        }
        if let Some(level) = update.level {
            player.level = player.level.max(level);
        }
        if let Some(experience) = update.experience {
            player.experience = player.experience.max(experience);
        }
        if let Some(strength) = update.strength {
            player.stats.strength = strength.clamp(1, max_stat);
        }
        if let Some(agility) = update.agility {
            player.stats.agility = agility.clamp(1, max_stat);
        }
        if let Some(intelligence) = update.intelligence {
            player.stats.intelligence = intelligence.clamp(1, max_stat);
        }

        player.touch(now);
        debug!("Updated attributes of {}: {:?}", id, update);
        true
    }

    /// Ids of players idle for longer than `timeout`, ordered by id.
    pub fn inactive(&self, now: u64, timeout: Duration) -> Vec<EntityId> {
        let mut idle: Vec<EntityId> = self
            .players
            .values()
            .filter(|p| p.is_idle(now, timeout))
            .map(|p| p.id)
            .collect();
        idle.sort();
        idle
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

fn random_spawn<R: Rng>(rng: &mut R, area: &SpawnArea) -> Vector2 {
    Vector2::new(
        sample_axis(rng, area.min_x, area.max_x),
        sample_axis(rng, area.min_y, area.max_y),
    )
}

fn sample_axis<R: Rng>(rng: &mut R, min: f32, max: f32) -> f32 {
    if min < max {
        rng.gen_range(min..max)
    } else {
        min
    }
}
