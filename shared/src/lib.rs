//! Types and rules shared by the server and its clients.
//!
//! The wire protocol, the scene table and the movement step all live here so
//! that client prediction and server validation can never drift apart.

pub mod framing;
pub mod math;
pub mod movement;
pub mod protocol;
pub mod scene;

pub use math::Vector2;
pub use protocol::{
    ChatRecord, ClientMessage, EntityId, MoveDirection, PlayerSnapshot, PlayerStats, RejectReason,
    ServerMessage,
};
pub use scene::SceneId;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Handshake version. Clients speaking another version are turned away.
pub const PROTOCOL_VERSION: u32 = 1;

/// Wall-clock milliseconds since the Unix epoch.
///
/// Move command timestamps are compared against this on the server, so both
/// sides must use the same clock.
pub fn timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}
