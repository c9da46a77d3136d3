use crate::game::ClientGameState;
use crate::input::InputManager;
use crate::reconciler::ReconcilerConfig;
use log::{debug, info, warn};
use shared::framing::{read_message, write_message, FrameError};
use shared::{timestamp_ms, ClientMessage, ServerMessage, PROTOCOL_VERSION};
use std::time::{Duration, Instant};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{interval, interval_at, sleep};

/// Smoothing runs at roughly 60 Hz.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server refused connection: {0}")]
    Refused(String),
    #[error("unexpected handshake reply: {0}")]
    UnexpectedReply(String),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_addr: String,
    pub name: Option<String>,
    /// How often a move command is sent while walking.
    pub move_interval: Duration,
    /// How often to travel to another scene. `None` stays put.
    pub scene_hop_interval: Option<Duration>,
    /// Artificial round-trip latency, applied half on send.
    pub fake_ping_ms: u64,
    pub reconciler: ReconcilerConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:3000".to_string(),
            name: None,
            move_interval: Duration::from_millis(100),
            scene_hop_interval: None,
            fake_ping_ms: 0,
            reconciler: ReconcilerConfig::default(),
        }
    }
}

/// Headless client: connects, wanders with scripted input and reconciles
/// against the server's answers.
pub struct Client {
    config: ClientConfig,
    writer: OwnedWriteHalf,
    incoming: mpsc::UnboundedReceiver<ServerMessage>,

    game_state: ClientGameState,
    input_manager: InputManager,
}

impl Client {
    /// Connects and completes the handshake. The first snapshot is applied
    /// before this returns.
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        info!("Connecting to {}...", config.server_addr);
        let stream = TcpStream::connect(&config.server_addr)
            .await
            .map_err(|source| ClientError::Connect {
                addr: config.server_addr.clone(),
                source,
            })?;
        stream.set_nodelay(true).map_err(FrameError::from)?;
        let (mut reader, mut writer) = stream.into_split();

        write_message(
            &mut writer,
            &ClientMessage::Connect {
                client_version: PROTOCOL_VERSION,
                name: config.name.clone(),
            },
        )
        .await?;

        let mut game_state = ClientGameState::new(config.reconciler.clone());
        match read_message::<ServerMessage, _>(&mut reader).await? {
            snapshot @ ServerMessage::GameState { .. } => {
                game_state.apply_server_message(snapshot, Instant::now());
            }
            ServerMessage::Disconnected { reason } => return Err(ClientError::Refused(reason)),
            other => return Err(ClientError::UnexpectedReply(format!("{:?}", other))),
        }

        if let Some(id) = game_state.own_id {
            info!("Connected as {} in {}", id, game_state.scene);
        }

        let (incoming_tx, incoming) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            loop {
                match read_message::<ServerMessage, _>(&mut reader).await {
                    Ok(message) => {
                        if incoming_tx.send(message).is_err() {
                            break;
                        }
                    }
                    Err(FrameError::ConnectionClosed) => break,
                    Err(e) => {
                        warn!("Error receiving message: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Client {
            config,
            writer,
            incoming,
            game_state,
            input_manager: InputManager::new(),
        })
    }

    pub fn game_state(&self) -> &ClientGameState {
        &self.game_state
    }

    async fn send(&mut self, message: &ClientMessage) -> Result<(), ClientError> {
        if self.config.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.config.fake_ping_ms / 2)).await;
        }
        write_message(&mut self.writer, message).await?;
        Ok(())
    }

    pub async fn send_chat(&mut self, text: &str) -> Result<(), ClientError> {
        self.send(&ClientMessage::ChatMessage(text.to_string())).await
    }

    pub async fn request_scene_state(&mut self) -> Result<(), ClientError> {
        self.send(&ClientMessage::RequestSceneState { scene_name: None })
            .await
    }

    async fn send_movement(&mut self) -> Result<(), ClientError> {
        let direction = self.input_manager.update(Instant::now());
        if direction.to_vector().magnitude_squared() == 0.0 {
            return Ok(());
        }

        self.game_state
            .predict(direction.to_vector(), self.config.move_interval.as_secs_f32());
        self.send(&ClientMessage::MoveCommand {
            direction,
            timestamp: timestamp_ms(),
        })
        .await
    }

    async fn hop_scene(&mut self) -> Result<(), ClientError> {
        if !self
            .game_state
            .reconciler
            .try_request_scene_change(Instant::now())
        {
            debug!("Scene change still cooling down");
            return Ok(());
        }
        let target = self.input_manager.pick_scene(self.game_state.scene);
        info!("Travelling to {}", target.display_name());
        self.send(&ClientMessage::ChangeScene {
            scene_name: target.as_str().to_string(),
        })
        .await
    }

    /// Runs until the server goes away, refuses us, or `duration` elapses.
    pub async fn run(&mut self, duration: Option<Duration>) -> Result<(), ClientError> {
        let mut move_interval = interval(self.config.move_interval);
        let mut frame_interval = interval(FRAME_INTERVAL);
        let hop_period = self
            .config
            .scene_hop_interval
            .unwrap_or(Duration::from_secs(3600));
        let mut hop_interval = interval_at(tokio::time::Instant::now() + hop_period, hop_period);
        let deadline = sleep(duration.unwrap_or(Duration::from_secs(86_400)));
        tokio::pin!(deadline);

        let mut last_frame = Instant::now();

        loop {
            tokio::select! {
                message = self.incoming.recv() => {
                    match message {
                        Some(message) => {
                            self.game_state.apply_server_message(message, Instant::now());
                            if !self.game_state.connected {
                                return Ok(());
                            }
                        }
                        None => {
                            warn!("Server closed the connection");
                            return Ok(());
                        }
                    }
                },

                _ = move_interval.tick() => {
                    self.send_movement().await?;
                },

                _ = frame_interval.tick() => {
                    let now = Instant::now();
                    let dt_ms = now.duration_since(last_frame).as_secs_f32() * 1000.0;
                    last_frame = now;
                    self.game_state.tick(dt_ms, now);
                },

                _ = hop_interval.tick(), if self.config.scene_hop_interval.is_some() => {
                    self.hop_scene().await?;
                },

                _ = &mut deadline, if duration.is_some() => {
                    break;
                },
            }
        }

        let position = self.game_state.rendered_position();
        info!(
            "Leaving {} at ({:.2}, {:.2})",
            self.game_state.scene, position.x, position.y
        );
        self.send(&ClientMessage::Disconnect).await
    }
}
