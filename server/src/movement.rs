//! Movement validation.
//!
//! Intention commands (`MoveCommand`), checked in this order:
//! - non-finite direction: `InvalidInput`
//! - older than the replay window: `Expired`
//! - closer than `move_interval_ms` to the last accepted move: `TooFrequent`
//! - otherwise accepted; out-of-bounds moves slide X first, then Y, then stay
//!
//! Legacy absolute updates (`UpdatePosition`):
//! - non-finite target: `InvalidInput`
//! - further than `max_teleport_distance`: `TeleportSuspected`
//! - outside the scene envelope: `OutOfBounds`
//!
//! Nothing here mutates state. Callers commit an accepted [`MoveOutcome`] with
//! [`commit`].

use crate::config::GameConfig;
use crate::entity_store::Player;
use shared::movement::slide_step;
use shared::{MoveDirection, RejectReason, Vector2};

/// Position and server timestamp of an accepted move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveOutcome {
    pub position: Vector2,
    pub timestamp: u64,
}

/// Validates an intention-based move and computes the authoritative position.
pub fn validate_move_command(
    player: &Player,
    direction: MoveDirection,
    client_timestamp: u64,
    now: u64,
    config: &GameConfig,
) -> Result<MoveOutcome, RejectReason> {
    if now.saturating_sub(client_timestamp) > config.command_expiry_ms {
        return Err(RejectReason::Expired);
    }

    let direction = direction.to_vector();
    if !direction.is_finite() {
        return Err(RejectReason::InvalidInput);
    }

    let elapsed_ms = now.saturating_sub(player.last_move_accepted_at);
    if elapsed_ms < config.move_interval_ms {
        return Err(RejectReason::TooFrequent);
    }

    let distance = player.speed * elapsed_ms as f32 / 1000.0;
    let position = slide_step(
        player.position,
        direction,
        distance,
        player.scene.half_extent(),
    );

    Ok(MoveOutcome {
        position,
        timestamp: now,
    })
}

/// Validates a legacy absolute position update.
///
/// On `TeleportSuspected` the caller is expected to send the player's current
/// position back so the client can snap to it.
pub fn validate_position_update(
    player: &Player,
    target: Vector2,
    now: u64,
    config: &GameConfig,
) -> Result<MoveOutcome, RejectReason> {
    if !target.is_finite() {
        return Err(RejectReason::InvalidInput);
    }

    if player.position.distance(&target) > config.max_teleport_distance {
        return Err(RejectReason::TeleportSuspected);
    }

    if !player.scene.contains(&target) {
        return Err(RejectReason::OutOfBounds);
    }

    Ok(MoveOutcome {
        position: target,
        timestamp: now,
    })
}

pub fn commit(player: &mut Player, outcome: &MoveOutcome) {
    player.record_move(outcome.position, outcome.timestamp);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_store::EntityStore;
    use assert_approx_eq::assert_approx_eq;
    use shared::{EntityId, SceneId};

    const T0: u64 = 1_000_000;

    fn player_at(x: f32, y: f32) -> Player {
        let mut store = EntityStore::new(GameConfig::default());
        let mut player = store.create(EntityId(1), Some("tester"), T0).clone();
        player.position = Vector2::new(x, y);
        player
    }

    fn east() -> MoveDirection {
        MoveDirection::new(1.0, 0.0)
    }

    #[test]
    fn test_accepts_move_after_gap() {
        let config = GameConfig::default();
        let player = player_at(0.0, 0.0);
        let now = T0 + 100;

        let outcome = validate_move_command(&player, east(), now, now, &config).unwrap();
        assert_approx_eq!(outcome.position.x, 0.3, 1e-5);
        assert_approx_eq!(outcome.position.y, 0.0, 1e-5);
        assert_eq!(outcome.timestamp, now);
    }

    #[test]
    fn test_rejects_non_finite_direction() {
        let config = GameConfig::default();
        let player = player_at(0.0, 0.0);
        let now = T0 + 100;

        for direction in [
            MoveDirection::new(f32::NAN, 0.0),
            MoveDirection::new(0.0, f32::INFINITY),
            MoveDirection::new(f32::NEG_INFINITY, 1.0),
        ] {
            assert_eq!(
                validate_move_command(&player, direction, now, now, &config),
                Err(RejectReason::InvalidInput)
            );
        }
    }

    #[test]
    fn test_rejects_expired_timestamp() {
        let config = GameConfig::default();
        let player = player_at(0.0, 0.0);
        let now = T0 + 10_000;

        assert_eq!(
            validate_move_command(&player, east(), now - 5_001, now, &config),
            Err(RejectReason::Expired)
        );
        assert!(validate_move_command(&player, east(), now - 5_000, now, &config).is_ok());
    }

    #[test]
    fn test_expiry_checked_before_rate_limit() {
        let config = GameConfig::default();
        let player = player_at(0.0, 0.0);
        let now = T0 + 10;

        assert_eq!(
            validate_move_command(&player, east(), 0, now, &config),
            Err(RejectReason::Expired)
        );
    }

    #[test]
    fn test_stale_command_expires_regardless_of_direction() {
        let config = GameConfig::default();
        let player = player_at(0.0, 0.0);
        let now = T0 + 10_000;

        for direction in [
            MoveDirection::new(f32::NAN, 0.0),
            MoveDirection::new(0.0, f32::INFINITY),
        ] {
            assert_eq!(
                validate_move_command(&player, direction, now - 6_000, now, &config),
                Err(RejectReason::Expired)
            );
        }
        assert_eq!(
            validate_move_command(&player, MoveDirection::new(f32::NAN, 0.0), now, now, &config),
            Err(RejectReason::InvalidInput)
        );
    }

    #[test]
    fn test_future_timestamp_is_not_expired() {
        let config = GameConfig::default();
        let player = player_at(0.0, 0.0);
        let now = T0 + 100;

        assert!(validate_move_command(&player, east(), now + 60_000, now, &config).is_ok());
    }

    #[test]
    fn test_rate_limit() {
        let config = GameConfig::default();
        let mut player = player_at(0.0, 0.0);

        let first = validate_move_command(&player, east(), T0 + 100, T0 + 100, &config).unwrap();
        commit(&mut player, &first);

        assert_eq!(
            validate_move_command(&player, east(), T0 + 149, T0 + 149, &config),
            Err(RejectReason::TooFrequent)
        );
        assert!(validate_move_command(&player, east(), T0 + 150, T0 + 150, &config).is_ok());
    }

    #[test]
    fn test_zero_direction_is_accepted_without_displacement() {
        let config = GameConfig::default();
        let player = player_at(4.0, -2.0);
        let now = T0 + 200;

        let outcome =
            validate_move_command(&player, MoveDirection::new(0.0, 0.0), now, now, &config).unwrap();
        assert_eq!(outcome.position, Vector2::new(4.0, -2.0));
    }

    #[test]
    fn test_blocked_at_east_wall_is_accepted_in_place() {
        let config = GameConfig::default();
        let player = player_at(49.9, 0.0);
        let now = T0 + 100;

        let outcome = validate_move_command(&player, east(), now, now, &config).unwrap();
        assert_eq!(outcome.position, Vector2::new(49.9, 0.0));
    }

    #[test]
    fn test_diagonal_at_wall_slides() {
        let config = GameConfig::default();
        let player = player_at(49.9, 0.0);
        let now = T0 + 1_000;

        let outcome =
            validate_move_command(&player, MoveDirection::new(1.0, 1.0), now, now, &config).unwrap();
        assert_eq!(outcome.position.x, 49.9);
        assert_approx_eq!(outcome.position.y, 3.0 / 2f32.sqrt(), 1e-4);
    }

    #[test]
    fn test_accepted_positions_stay_in_bounds() {
        let config = GameConfig::default();
        let mut player = player_at(0.0, 0.0);
        player.scene = SceneId::Arena;
        let mut now = T0;

        let directions = [
            MoveDirection::new(1.0, 0.3),
            MoveDirection::new(-0.2, 1.0),
            MoveDirection::new(-1.0, -1.0),
            MoveDirection::new(0.7, -0.9),
        ];
        for (i, direction) in directions.iter().cycle().take(200).enumerate() {
            now += 400 + (i as u64 % 7) * 300;
            let outcome = validate_move_command(&player, *direction, now, now, &config).unwrap();
            assert!(SceneId::Arena.contains(&outcome.position));
            commit(&mut player, &outcome);
        }
    }

    #[test]
    fn test_rejection_does_not_mutate() {
        let config = GameConfig::default();
        let player = player_at(1.0, 1.0);
        let before = player.clone();

        let _ = validate_move_command(&player, east(), T0 + 10, T0 + 10, &config);
        assert_eq!(player.position, before.position);
        assert_eq!(player.last_move_accepted_at, before.last_move_accepted_at);
    }

    #[test]
    fn test_position_update_within_cap() {
        let config = GameConfig::default();
        let player = player_at(0.0, 0.0);

        let outcome =
            validate_position_update(&player, Vector2::new(3.0, 4.0), T0 + 1, &config).unwrap();
        assert_eq!(outcome.position, Vector2::new(3.0, 4.0));
    }

    #[test]
    fn test_position_update_teleport_rejected() {
        let config = GameConfig::default();
        let player = player_at(0.0, 0.0);

        assert_eq!(
            validate_position_update(&player, Vector2::new(3.0, 4.1), T0 + 1, &config),
            Err(RejectReason::TeleportSuspected)
        );
    }

    #[test]
    fn test_position_update_out_of_bounds() {
        let config = GameConfig::default();
        let player = player_at(48.0, 0.0);

        assert_eq!(
            validate_position_update(&player, Vector2::new(51.0, 0.0), T0 + 1, &config),
            Err(RejectReason::OutOfBounds)
        );
    }

    #[test]
    fn test_position_update_non_finite() {
        let config = GameConfig::default();
        let player = player_at(0.0, 0.0);

        assert_eq!(
            validate_position_update(&player, Vector2::new(f32::NAN, 0.0), T0 + 1, &config),
            Err(RejectReason::InvalidInput)
        );
    }
}
