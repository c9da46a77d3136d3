use crate::reconciler::{ClientReconciler, ReconcilerConfig};
use log::{debug, info, warn};
use shared::{ChatRecord, EntityId, PlayerSnapshot, RejectReason, SceneId, ServerMessage, Vector2};
use std::collections::{HashMap, VecDeque};
use std::time::Instant;

/// Chat lines kept for display.
const CHAT_HISTORY: usize = 50;

/// Client view of the world: the local player's reconciled position plus the
/// last known state of everyone else in the same scene.
pub struct ClientGameState {
    pub own_id: Option<EntityId>,
    pub scene: SceneId,
    pub world_size: f32,
    pub players: HashMap<EntityId, PlayerSnapshot>,
    pub chat_log: VecDeque<ChatRecord>,
    pub last_rejection: Option<RejectReason>,
    pub connected: bool,
    pub reconciler: ClientReconciler,
}

impl ClientGameState {
    pub fn new(config: ReconcilerConfig) -> Self {
        Self {
            own_id: None,
            scene: SceneId::default(),
            world_size: SceneId::default().world_size(),
            players: HashMap::new(),
            chat_log: VecDeque::new(),
            last_rejection: None,
            connected: true,
            reconciler: ClientReconciler::new(config),
        }
    }

    pub fn apply_server_message(&mut self, message: ServerMessage, now: Instant) {
        match message {
            ServerMessage::GameState {
                players,
                current_player,
                world_size,
            } => {
                self.own_id = Some(current_player.id);
                self.scene = current_player.scene;
                self.world_size = world_size;
                self.reconciler
                    .set_movement(current_player.speed, world_size / 2.0);
                self.reconciler.reset(current_player.position, now);
                self.players = players.into_iter().map(|p| (p.id, p)).collect();
                self.players.insert(current_player.id, current_player);
            }

            ServerMessage::SceneState { scene, players } => {
                if scene != self.scene {
                    debug!("{} has {} players", scene, players.len());
                    return;
                }
                let own = self.own_id.and_then(|id| self.players.remove(&id));
                self.players = players.into_iter().map(|p| (p.id, p)).collect();
                if let Some(own) = own {
                    self.players.insert(own.id, own);
                }
            }

            ServerMessage::PlayerJoined(snapshot) => {
                if snapshot.scene == self.scene {
                    info!("{} joined {}", snapshot.name, self.scene);
                    self.players.insert(snapshot.id, snapshot);
                }
            }

            ServerMessage::PlayerLeft(id) => {
                if let Some(player) = self.players.remove(&id) {
                    info!("{} left {}", player.name, self.scene);
                }
            }

            ServerMessage::PlayerMoved { id, position, .. } => {
                if let Some(player) = self.players.get_mut(&id) {
                    player.position = position;
                }
            }

            ServerMessage::PositionUpdated { position, .. } => {
                self.reconciler.apply_server_update(position, now);
                if let Some(own) = self.own_id.and_then(|id| self.players.get_mut(&id)) {
                    own.position = position;
                }
            }

            ServerMessage::MovementError { reason, .. } => {
                debug!("Move rejected: {}", reason);
                self.last_rejection = Some(reason);
            }

            ServerMessage::CommandError { reason, .. } => {
                warn!("Command rejected: {}", reason);
                self.last_rejection = Some(reason);
            }

            ServerMessage::ChatMessage(record) => {
                info!("[{}] {}: {}", self.scene, record.player_name, record.message);
                self.chat_log.push_back(record);
                while self.chat_log.len() > CHAT_HISTORY {
                    self.chat_log.pop_front();
                }
            }

            ServerMessage::PlayerChangedScene {
                player_name, scene, ..
            } => {
                debug!("{} moved to {}", player_name, scene);
            }

            ServerMessage::SceneLoaded { message, .. } => {
                info!("{}", message);
            }

            ServerMessage::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.connected = false;
            }
        }
    }

    /// Predicts local movement for one input sample.
    pub fn predict(&mut self, direction: Vector2, dt_secs: f32) {
        self.reconciler.apply_prediction(direction, dt_secs);
    }

    pub fn tick(&mut self, dt_ms: f32, now: Instant) {
        self.reconciler.tick(dt_ms, now);
    }

    pub fn rendered_position(&self) -> Vector2 {
        self.reconciler.rendered_position()
    }

    /// Players other than the local one.
    pub fn remote_players(&self) -> impl Iterator<Item = &PlayerSnapshot> {
        let own_id = self.own_id;
        self.players.values().filter(move |p| Some(p.id) != own_id)
    }
}
