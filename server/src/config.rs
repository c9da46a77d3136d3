//! Server and gameplay tuning.
//!
//! Defaults match the values the game was balanced with; the binary overrides
//! a subset of them from the command line.

use std::time::Duration;

/// Rectangle new players are spawned into, uniformly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnArea {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl Default for SpawnArea {
    fn default() -> Self {
        Self {
            min_x: -10.0,
            max_x: 10.0,
            min_y: -10.0,
            max_y: 10.0,
        }
    }
}

/// Rules applied to entities and their commands.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Minimum gap between two accepted move commands.
    pub move_interval_ms: u64,
    /// Move commands older than this are replays.
    pub command_expiry_ms: u64,
    /// Legacy absolute updates may not jump further than this.
    pub max_teleport_distance: f32,
    pub default_speed: f32,
    pub max_speed: f32,
    pub max_stat_value: u32,
    pub spawn_area: SpawnArea,
    /// Chat messages are cut to this many characters.
    pub chat_max_length: usize,
    /// Entities without accepted activity for this long are disconnected.
    pub idle_timeout: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            move_interval_ms: 50,
            command_expiry_ms: 5000,
            max_teleport_distance: 5.0,
            default_speed: 3.0,
            max_speed: 6.0,
            max_stat_value: 100,
            spawn_area: SpawnArea::default(),
            chat_max_length: 100,
            idle_timeout: Duration::from_secs(300),
        }
    }
}

/// Network-facing settings plus the gameplay rules.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_clients: usize,
    /// How often idle entities are swept.
    pub sweep_interval: Duration,
    /// How often the status summary is logged.
    pub status_interval: Duration,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            max_clients: 64,
            sweep_interval: Duration::from_secs(1),
            status_interval: Duration::from_secs(30),
            game: GameConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.max_clients, 64);
        assert_eq!(config.game.move_interval_ms, 50);
        assert_eq!(config.game.command_expiry_ms, 5000);
        assert_eq!(config.game.chat_max_length, 100);
        assert!(config.game.default_speed >= 1.0);
        assert!(config.game.default_speed <= config.game.max_speed);
    }

    #[test]
    fn test_bind_addr_parses() {
        let config = ServerConfig::default();
        assert!(config.bind_addr.parse::<std::net::SocketAddr>().is_ok());
    }
}
