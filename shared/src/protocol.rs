//! Messages exchanged between clients and the server.
//!
//! Every frame on the wire carries exactly one [`ClientMessage`] or
//! [`ServerMessage`], bincode-encoded. Handlers match these enums exhaustively,
//! so adding a message is a compile error until every side handles it.

use crate::math::Vector2;
use crate::scene::SceneId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable per-connection identifier. Allocated by the server, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a single command was dropped. Sent back to the origin only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum RejectReason {
    #[error("malformed command")]
    InvalidInput,
    #[error("command expired")]
    Expired,
    #[error("moving too fast")]
    TooFrequent,
    #[error("position out of bounds")]
    OutOfBounds,
    #[error("teleport suspected")]
    TeleportSuspected,
    #[error("already in scene")]
    AlreadyInScene,
    #[error("unknown scene")]
    UnknownScene,
}

/// Intention direction as sent by clients: `x` and `z` of the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct MoveDirection {
    pub x: f32,
    pub z: f32,
}

impl MoveDirection {
    pub fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    /// Maps the ground-plane direction into scene-local `(x, y)`.
    pub fn to_vector(self) -> Vector2 {
        Vector2::new(self.x, self.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub strength: u32,
    pub agility: u32,
    pub intelligence: u32,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            strength: 10,
            agility: 10,
            intelligence: 10,
        }
    }
}

/// Serialized view of an entity, the only form peers ever see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
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
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: u64,
    pub player_id: EntityId,
    pub player_name: String,
    pub message: String,
    pub timestamp: u64,
}

/// Client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Handshake, must be the first frame of a connection.
    Connect {
        client_version: u32,
        name: Option<String>,
    },
    MoveCommand {
        direction: MoveDirection,
        timestamp: u64,
    },
    /// Legacy absolute positioning.
    UpdatePosition {
        x: f32,
        y: f32,
    },
    ChangeScene {
        scene_name: String,
    },
    ChatMessage(String),
    RequestSceneState {
        scene_name: Option<String>,
    },
    Disconnect,
}

/// Server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    GameState {
        players: Vec<PlayerSnapshot>,
        current_player: PlayerSnapshot,
        world_size: f32,
    },
    SceneState {
        scene: SceneId,
        players: Vec<PlayerSnapshot>,
    },
    PlayerJoined(PlayerSnapshot),
    PlayerLeft(EntityId),
    PlayerMoved {
        id: EntityId,
        position: Vector2,
        timestamp: u64,
    },
    PositionUpdated {
        position: Vector2,
        timestamp: u64,
    },
    MovementError {
        reason: RejectReason,
        timestamp: u64,
    },
    CommandError {
        reason: RejectReason,
        timestamp: u64,
    },
    ChatMessage(ChatRecord),
    PlayerChangedScene {
        player_id: EntityId,
        player_name: String,
        scene: SceneId,
    },
    SceneLoaded {
        scene: SceneId,
        message: String,
    },
    Disconnected {
        reason: String,
    },
}
