//! # Scene Sync Server Library
//!
//! This library provides the authoritative server for a multiplayer world split
//! into scenes. Clients send movement intentions and requests; the server
//! validates them, owns every position, and tells exactly the right set of
//! clients about each change.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Movement
//! Clients never set their own position. A move command carries a direction and
//! a timestamp; the server derives the displacement from the player's speed and
//! the time since the last accepted move, then keeps the result inside the
//! scene's bounds by sliding along walls.
//!
//! ### Scene Scoping
//! Every player is in exactly one scene at a time. Movement, joins, leaves and
//! chat are only broadcast to the members of the scene they happened in. Scene
//! changes are the one event announced to everyone.
//!
//! ### Connection Lifecycle
//! - Handshake with protocol version check and capacity limit
//! - Entity creation with spawn position, color and default name
//! - Idle sweep after five minutes without accepted activity
//! - Idempotent teardown on disconnect
//!
//! ## Architecture Design
//!
//! ### Single-Writer Coordinator
//! All mutable state lives in one [`coordinator::SyncCoordinator`] owned by the
//! server loop. Connection tasks only decode frames and forward them over a
//! channel, so each command is validated and committed before the next one is
//! looked at. No locks are needed and two commands for the same player can
//! never interleave.
//!
//! ### TCP Framing
//! Messages are bincode-encoded and sent as length-prefixed frames (see
//! `shared::framing`). A malformed or oversized frame ends that connection only.
//!
//! ### Per-Connection Writers
//! Each connection has an unbounded outbound queue drained by its own writer
//! task. Broadcasting is just pushing onto queues; a slow client never blocks
//! the coordinator.
//!
//! ## Module Organization
//!
//! ### Config Module (`config`)
//! Gameplay rules and network settings with their default values.
//!
//! ### Entity Store Module (`entity_store`)
//! Player records keyed by id: creation, lookup, removal, clamped attribute
//! updates and idle detection.
//!
//! ### Movement Module (`movement`)
//! Pure validation of move commands and legacy position updates.
//!
//! ### Rooms Module (`rooms`)
//! Scene membership, atomic scene transitions and scoped fan-out.
//!
//! ### Coordinator Module (`coordinator`)
//! Per-message protocol handling tying the other modules together.
//!
//! ### Network Module (`network`)
//! TCP listener, handshake, reader and writer tasks and the server loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         bind_addr: "127.0.0.1:3000".to_string(),
//!         ..ServerConfig::default()
//!     };
//!
//!     let mut server = Server::bind(config).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod coordinator;
pub mod entity_store;
pub mod movement;
pub mod network;
pub mod rooms;
