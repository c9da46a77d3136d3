//! # Scene Sync Client Library
//!
//! This library provides a headless client for the scene sync server. It
//! connects over TCP, drives the local player with scripted input, predicts
//! movement locally and smooths toward the positions the server confirms.
//!
//! ## Architecture Overview
//!
//! The server owns every position. The client only sends movement
//! intentions, so its local view is always a guess until the server answers.
//! Two mechanisms keep that guess close and visually stable:
//!
//! ### Client-Side Prediction
//! Each input sample moves the local player immediately with the same
//! normalize-and-slide step the server uses, so walls behave identically on
//! both sides and the player never waits a round trip to see movement.
//!
//! ### Smoothed Reconciliation
//! Authoritative positions never move the player directly. They replace the
//! reconciliation target, and every frame the rendered position closes a
//! fraction of the gap, scaled by frame time. Corrections older than a few
//! hundred milliseconds are ignored rather than dragging the player backwards.
//! Full snapshots (connect, scene change) are the only hard snaps.
//!
//! ## Module Organization
//!
//! ### Reconciler Module (`reconciler`)
//! Prediction, smoothing and the scene-change cooldown.
//!
//! ### Game Module (`game`)
//! Applies every server message to the local view of the current scene:
//! players, chat history, last rejection and connection state.
//!
//! ### Input Module (`input`)
//! Wandering input: random directions held for a few seconds, occasional
//! pauses and random scene picks.
//!
//! ### Network Module (`network`)
//! TCP connection, handshake and the client loop tying input, prediction and
//! server messages together.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{Client, ClientConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig {
//!         server_addr: "127.0.0.1:3000".to_string(),
//!         name: Some("Wanderer".to_string()),
//!         scene_hop_interval: Some(Duration::from_secs(10)),
//!         ..ClientConfig::default()
//!     };
//!
//!     let mut client = Client::connect(config).await?;
//!     client.send_chat("hello").await?;
//!     client.run(Some(Duration::from_secs(60))).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
pub mod reconciler;
