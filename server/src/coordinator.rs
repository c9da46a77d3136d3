//! Per-command protocol handling.
//!
//! [`SyncCoordinator`] binds the entity store, the movement rules and the room
//! registry together. It is owned by a single task, so every command is fully
//! validated and committed before the next one is looked at, and no two
//! commands for the same entity can interleave.
//!
//! Rejections are only ever sent back to the connection that caused them.

use crate::config::GameConfig;
use crate::entity_store::{AttributeUpdate, EntityStore, Player};
use crate::movement::{self, MoveOutcome};
use crate::rooms::{Outbound, RoomRegistry};
use log::{debug, info, warn};
use serde::Serialize;
use shared::{
    ChatRecord, ClientMessage, EntityId, MoveDirection, PlayerSnapshot, RejectReason, SceneId,
    ServerMessage, Vector2,
};
use std::collections::BTreeMap;

/// Summary returned by the read-only status query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerStatus {
    pub status: String,
    pub entity_count: usize,
    pub uptime_secs: u64,
}

pub struct SyncCoordinator {
    entities: EntityStore,
    rooms: RoomRegistry,
    config: GameConfig,
    started_at: u64,
    next_chat_id: u64,
}

impl SyncCoordinator {
    pub fn new(config: GameConfig, now: u64) -> Self {
        Self {
            entities: EntityStore::new(config.clone()),
            rooms: RoomRegistry::new(),
            config,
            started_at: now,
            next_chat_id: 1,
        }
    }

    /// Creates the entity for a new connection and announces it.
    ///
    /// The newcomer gets a full snapshot of the default scene; existing members
    /// of that scene get `PlayerJoined`. Nobody else hears about it.
    pub fn connect(
        &mut self,
        id: EntityId,
        name_hint: Option<&str>,
        outbound: Outbound,
        now: u64,
    ) -> PlayerSnapshot {
        let snapshot = self.entities.create(id, name_hint, now).snapshot();

        self.rooms.register(id, outbound);
        self.rooms.join(id, snapshot.scene);

        self.send_game_state(id);
        self.rooms.broadcast(
            snapshot.scene,
            &ServerMessage::PlayerJoined(snapshot.clone()),
            Some(id),
        );

        info!(
            "Player {} ({}) joined {}",
            snapshot.name, id, snapshot.scene
        );
        snapshot
    }

    /// Dispatches one client message.
    pub fn handle(&mut self, id: EntityId, message: ClientMessage, now: u64) {
        if self.entities.get(id).is_none() {
            debug!("Ignoring message from unknown connection {}", id);
            return;
        }

        match message {
            ClientMessage::Connect { client_version, .. } => {
                warn!(
                    "{} sent a second handshake (version {}), ignoring",
                    id, client_version
                );
            }
            ClientMessage::MoveCommand {
                direction,
                timestamp,
            } => self.handle_move_command(id, direction, timestamp, now),
            ClientMessage::UpdatePosition { x, y } => {
                self.handle_update_position(id, Vector2::new(x, y), now)
            }
            ClientMessage::ChangeScene { scene_name } => {
                self.handle_change_scene(id, &scene_name, now)
            }
            ClientMessage::ChatMessage(text) => self.handle_chat(id, &text, now),
            ClientMessage::RequestSceneState { scene_name } => {
                self.handle_scene_request(id, scene_name.as_deref(), now)
            }
            ClientMessage::Disconnect => {
                self.disconnect(id);
            }
        }
    }

    fn handle_move_command(
        &mut self,
        id: EntityId,
        direction: MoveDirection,
        timestamp: u64,
        now: u64,
    ) {
        let Some(player) = self.entities.get_mut(id) else {
            return;
        };

        match movement::validate_move_command(player, direction, timestamp, now, &self.config) {
            Ok(outcome) => {
                movement::commit(player, &outcome);
                let scene = player.scene;
                self.announce_move(id, scene, outcome);
            }
            Err(reason) => self.reject_move(id, reason, now),
        }
    }

    fn handle_update_position(&mut self, id: EntityId, target: Vector2, now: u64) {
        let Some(player) = self.entities.get_mut(id) else {
            return;
        };

        match movement::validate_position_update(player, target, now, &self.config) {
            Ok(outcome) => {
                movement::commit(player, &outcome);
                let scene = player.scene;
                self.announce_move(id, scene, outcome);
            }
            Err(RejectReason::TeleportSuspected) => {
                let current = player.position;
                warn!(
                    "Suspicious movement from {}: ({:.2}, {:.2}) -> ({:.2}, {:.2})",
                    id, current.x, current.y, target.x, target.y
                );
                self.reject_move(id, RejectReason::TeleportSuspected, now);
                self.rooms.send_to(
                    id,
                    ServerMessage::PositionUpdated {
                        position: current,
                        timestamp: now,
                    },
                );
            }
            Err(reason) => self.reject_move(id, reason, now),
        }
    }

    fn announce_move(&self, id: EntityId, scene: SceneId, outcome: MoveOutcome) {
        self.rooms.broadcast(
            scene,
            &ServerMessage::PlayerMoved {
                id,
                position: outcome.position,
                timestamp: outcome.timestamp,
            },
            Some(id),
        );
        self.rooms.send_to(
            id,
            ServerMessage::PositionUpdated {
                position: outcome.position,
                timestamp: outcome.timestamp,
            },
        );
    }

    fn reject_move(&self, id: EntityId, reason: RejectReason, now: u64) {
        match reason {
            RejectReason::InvalidInput => warn!("Invalid movement data from {}", id),
            _ => debug!("Movement from {} rejected: {}", id, reason),
        }
        self.rooms.send_to(
            id,
            ServerMessage::MovementError {
                reason,
                timestamp: now,
            },
        );
    }

    fn reject_command(&self, id: EntityId, reason: RejectReason, now: u64) {
        debug!("Command from {} rejected: {}", id, reason);
        self.rooms.send_to(
            id,
            ServerMessage::CommandError {
                reason,
                timestamp: now,
            },
        );
    }

    fn handle_change_scene(&mut self, id: EntityId, scene_name: &str, now: u64) {
        let target = match scene_name.parse::<SceneId>() {
            Ok(scene) => scene,
            Err(reason) => {
                self.reject_command(id, reason, now);
                return;
            }
        };

        let from = match self.rooms.transition(id, target) {
            Ok(from) => from,
            Err(reason) => {
                self.reject_command(id, reason, now);
                return;
            }
        };

        let Some(player) = self.entities.get_mut(id) else {
            return;
        };
        player.scene = target;
        player.position = target.spawn_point();
        player.touch(now);
        let snapshot = player.snapshot();

        self.rooms
            .broadcast(from, &ServerMessage::PlayerLeft(id), Some(id));
        self.rooms.broadcast(
            target,
            &ServerMessage::PlayerJoined(snapshot.clone()),
            Some(id),
        );
        self.rooms
            .broadcast_global(&ServerMessage::PlayerChangedScene {
                player_id: id,
                player_name: snapshot.name.clone(),
                scene: target,
            });

        self.send_game_state(id);
        self.rooms.send_to(
            id,
            ServerMessage::SceneLoaded {
                scene: target,
                message: format!("Welcome to {}", target.display_name()),
            },
        );

        info!(
            "Player {} ({}) moved from {} to {}",
            snapshot.name, id, from, target
        );
    }

    fn handle_chat(&mut self, id: EntityId, text: &str, now: u64) {
        if text.trim().is_empty() {
            return;
        }
        let Some(player) = self.entities.get_mut(id) else {
            return;
        };
        player.touch(now);

        let record = ChatRecord {
            id: self.next_chat_id,
            player_id: id,
            player_name: player.name.clone(),
            message: text.chars().take(self.config.chat_max_length).collect(),
            timestamp: now,
        };
        self.next_chat_id += 1;

        debug!("Chat in {}: {}: {}", player.scene, record.player_name, record.message);
        let scene = player.scene;
        self.rooms
            .broadcast(scene, &ServerMessage::ChatMessage(record), None);
    }

    fn handle_scene_request(&mut self, id: EntityId, scene_name: Option<&str>, now: u64) {
        let scene = match scene_name {
            Some(name) => match name.parse::<SceneId>() {
                Ok(scene) => scene,
                Err(reason) => {
                    self.reject_command(id, reason, now);
                    return;
                }
            },
            None => match self.entities.get(id) {
                Some(player) => player.scene,
                None => return,
            },
        };

        self.rooms.send_to(
            id,
            ServerMessage::SceneState {
                scene,
                players: self.entities.in_scene(scene),
            },
        );
    }

    fn send_game_state(&self, id: EntityId) {
        let Some(player) = self.entities.get(id) else {
            return;
        };
        self.rooms.send_to(
            id,
            ServerMessage::GameState {
                players: self.entities.in_scene(player.scene),
                current_player: player.snapshot(),
                world_size: player.scene.world_size(),
            },
        );
    }

    /// Tears down an entity. Returns false if it was already gone.
    ///
    /// Room peers are told before the entity is destroyed.
    pub fn disconnect(&mut self, id: EntityId) -> bool {
        let Some(player) = self.entities.get(id) else {
            return false;
        };
        let (scene, position, name) = (player.scene, player.position, player.name.clone());

        self.rooms
            .broadcast(scene, &ServerMessage::PlayerLeft(id), Some(id));
        self.rooms.leave(id, scene);
        self.rooms.unregister(id);
        self.entities.remove(id);

        info!(
            "Player {} ({}) left {} at ({:.2}, {:.2})",
            name, id, scene, position.x, position.y
        );
        true
    }

    /// Disconnects every entity idle for longer than the configured timeout.
    pub fn sweep_idle(&mut self, now: u64) -> Vec<EntityId> {
        let idle = self.entities.inactive(now, self.config.idle_timeout);
        for id in &idle {
            info!("Disconnecting {} after inactivity", id);
            self.rooms.send_to(
                *id,
                ServerMessage::Disconnected {
                    reason: "Idle timeout".to_string(),
                },
            );
            self.disconnect(*id);
        }
        idle
    }

    /// Server-side attribute change. Never reachable from client messages.
    pub fn update_attributes(&mut self, id: EntityId, update: AttributeUpdate, now: u64) -> bool {
        self.entities.update_attributes(id, update, now)
    }

    pub fn status(&self, now: u64) -> ServerStatus {
        ServerStatus {
            status: "ok".to_string(),
            entity_count: self.entities.len(),
            uptime_secs: now.saturating_sub(self.started_at) / 1000,
        }
    }

    /// Every entity, ordered by id.
    pub fn players(&self) -> Vec<PlayerSnapshot> {
        let mut players: Vec<PlayerSnapshot> = self.entities.all().map(Player::snapshot).collect();
        players.sort_by_key(|p| p.id);
        players
    }

    pub fn player(&self, id: EntityId) -> Option<PlayerSnapshot> {
        self.entities.get(id).map(Player::snapshot)
    }

    pub fn room_stats(&self) -> BTreeMap<SceneId, usize> {
        self.rooms.room_stats()
    }

    pub fn members_of(&self, scene: SceneId) -> Vec<EntityId> {
        self.rooms.members_of(scene)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
