//! The fixed set of scenes (rooms) and their geometry.

use crate::math::Vector2;
use crate::protocol::RejectReason;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the enumerated scenes. Every entity is in exactly one of these.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum SceneId {
    #[default]
    Main,
    DungeonFire,
    DungeonIce,
    Arena,
}

impl SceneId {
    pub const ALL: [SceneId; 4] = [
        SceneId::Main,
        SceneId::DungeonFire,
        SceneId::DungeonIce,
        SceneId::Arena,
    ];

    /// Name used on the wire and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SceneId::Main => "main",
            SceneId::DungeonFire => "dungeon-fire",
            SceneId::DungeonIce => "dungeon-ice",
            SceneId::Arena => "arena",
        }
    }

    /// Human-readable name shown in the `SceneLoaded` greeting.
    pub fn display_name(&self) -> &'static str {
        match self {
            SceneId::Main => "Central Hub",
            SceneId::DungeonFire => "Fire Dungeon",
            SceneId::DungeonIce => "Ice Dungeon",
            SceneId::Arena => "Arena",
        }
    }

    /// Edge length of the square world.
    pub fn world_size(&self) -> f32 {
        match self {
            SceneId::Main => 100.0,
            SceneId::DungeonFire | SceneId::DungeonIce => 80.0,
            SceneId::Arena => 60.0,
        }
    }

    pub fn half_extent(&self) -> f32 {
        self.world_size() / 2.0
    }

    /// Deterministic entry point used when an entity transitions in.
    pub fn spawn_point(&self) -> Vector2 {
        match self {
            SceneId::Main => Vector2::new(0.0, 0.0),
            SceneId::DungeonFire | SceneId::DungeonIce => Vector2::new(0.0, 30.0),
            SceneId::Arena => Vector2::new(0.0, 25.0),
        }
    }

    /// Inclusive `[-half, +half]²` envelope check.
    pub fn contains(&self, position: &Vector2) -> bool {
        crate::movement::within_bounds(position, self.half_extent())
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SceneId {
    type Err = RejectReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SceneId::ALL
            .into_iter()
            .find(|scene| scene.as_str() == s)
            .ok_or(RejectReason::UnknownScene)
    }
}
