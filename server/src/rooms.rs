//! Scene membership and scoped fan-out.
//!
//! Each scene is a room. The registry keeps every room's member set, a reverse
//! index from entity to room, and the outbound channel of every connection.
//! Sends are fire-and-forget: a closed channel means the connection is already
//! going away, and its own disconnect will clean up.

use log::{debug, warn};
use shared::{EntityId, RejectReason, SceneId, ServerMessage};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::mpsc;

/// Outgoing half of a connection's message queue.
pub type Outbound = mpsc::UnboundedSender<ServerMessage>;

pub struct RoomRegistry {
    rooms: HashMap<SceneId, BTreeSet<EntityId>>,
    memberships: HashMap<EntityId, SceneId>,
    connections: HashMap<EntityId, Outbound>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: SceneId::ALL
                .into_iter()
                .map(|scene| (scene, BTreeSet::new()))
                .collect(),
            memberships: HashMap::new(),
            connections: HashMap::new(),
        }
    }

    /// Attaches a connection's outbound queue.
    pub fn register(&mut self, id: EntityId, outbound: Outbound) {
        if self.connections.insert(id, outbound).is_some() {
            warn!("Connection {} registered twice, replacing outbound queue", id);
        }
    }

    /// Drops the outbound queue, which lets the connection's writer finish.
    pub fn unregister(&mut self, id: EntityId) -> bool {
        self.connections.remove(&id).is_some()
    }

    /// Adds an entity to a room. Fails if it is already in any room.
    pub fn join(&mut self, id: EntityId, scene: SceneId) -> bool {
        if let Some(current) = self.memberships.get(&id) {
            warn!("{} tried to join {} while still in {}", id, scene, current);
            return false;
        }
        self.memberships.insert(id, scene);
        self.rooms.entry(scene).or_default().insert(id);
        true
    }

    /// Removes an entity from a room. Fails if it was not a member there.
    pub fn leave(&mut self, id: EntityId, scene: SceneId) -> bool {
        if self.memberships.get(&id) != Some(&scene) {
            return false;
        }
        self.memberships.remove(&id);
        self.rooms.entry(scene).or_default().remove(&id);
        true
    }

    /// Moves an entity to another room in one step and returns the old room.
    ///
    /// No message can be sent between the leave and the join, so observers see
    /// the entity in exactly one room before and after.
    pub fn transition(&mut self, id: EntityId, to: SceneId) -> Result<SceneId, RejectReason> {
        let from = self
            .memberships
            .get(&id)
            .copied()
            .ok_or(RejectReason::InvalidInput)?;
        if from == to {
            return Err(RejectReason::AlreadyInScene);
        }

        self.leave(id, from);
        self.join(id, to);
        Ok(from)
    }

    pub fn scene_of(&self, id: EntityId) -> Option<SceneId> {
        self.memberships.get(&id).copied()
    }

    /// Snapshot of a room's members, ordered by id.
    pub fn members_of(&self, scene: SceneId) -> Vec<EntityId> {
        self.rooms
            .get(&scene)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Sends to one connection. Returns false if it is gone.
    pub fn send_to(&self, id: EntityId, message: ServerMessage) -> bool {
        match self.connections.get(&id) {
            Some(outbound) => deliver(id, outbound, message),
            None => false,
        }
    }

    /// Sends to every member of `scene` except `excluding`. Returns the number
    /// of connections the message was queued for.
    pub fn broadcast(
        &self,
        scene: SceneId,
        message: &ServerMessage,
        excluding: Option<EntityId>,
    ) -> usize {
        let Some(members) = self.rooms.get(&scene) else {
            return 0;
        };

        let mut delivered = 0;
        for id in members.iter().copied() {
            if Some(id) == excluding {
                continue;
            }
            if let Some(outbound) = self.connections.get(&id) {
                if deliver(id, outbound, message.clone()) {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Sends to every registered connection regardless of room.
    pub fn broadcast_global(&self, message: &ServerMessage) -> usize {
        self.connections
            .iter()
            .filter(|&(id, outbound)| deliver(*id, outbound, message.clone()))
            .count()
    }

    /// Member count per room.
    pub fn room_stats(&self) -> BTreeMap<SceneId, usize> {
        SceneId::ALL
            .into_iter()
            .map(|scene| (scene, self.rooms.get(&scene).map_or(0, BTreeSet::len)))
            .collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn deliver(id: EntityId, outbound: &Outbound, message: ServerMessage) -> bool {
    if outbound.send(message).is_err() {
        debug!("Outbound queue of {} is closed, dropping message", id);
        false
    } else {
        true
    }
}
