//! Server network layer handling TCP connections and the coordinator loop

use crate::config::ServerConfig;
use crate::coordinator::SyncCoordinator;
use crate::rooms::Outbound;
use log::{debug, error, info, warn};
use shared::framing::{read_message, write_message, FrameError};
use shared::{timestamp_ms, ClientMessage, EntityId, ServerMessage, PROTOCOL_VERSION};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, sleep, timeout};

/// Connections that do not send `Connect` within this window are dropped.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Events sent from connection tasks to the coordinator loop
#[derive(Debug)]
pub enum ServerEvent {
    Joined {
        id: EntityId,
        name: Option<String>,
        outbound: Outbound,
    },
    Received {
        id: EntityId,
        message: ClientMessage,
    },
    Closed {
        id: EntityId,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("network error: {0}")]
    Io(#[from] std::io::Error),
}

/// TCP server owning the coordinator.
///
/// Connection tasks never touch game state; they decode frames and forward
/// them as [`ServerEvent`]s to [`Server::run`], which applies them one by one.
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    coordinator: SyncCoordinator,
    next_id: u64,

    events_tx: mpsc::UnboundedSender<ServerEvent>,
    events_rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener =
            TcpListener::bind(&config.bind_addr)
                .await
                .map_err(|source| ServerError::Bind {
                    addr: config.bind_addr.clone(),
                    source,
                })?;
        info!("Server listening on {}", listener.local_addr()?);

        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            coordinator: SyncCoordinator::new(config.game.clone(), timestamp_ms()),
            config,
            next_id: 1,
            events_tx,
            events_rx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Main server loop: accepts connections, applies events, sweeps idle
    /// players and logs status.
    pub async fn run(&mut self) -> Result<(), ServerError> {
        let mut sweep_interval = interval(self.config.sweep_interval);
        let mut status_interval = interval(self.config.status_interval);

        info!("Server started successfully");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, addr) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                            let backoff = accept_backoff(&e);
                            if !backoff.is_zero() {
                                sleep(backoff).await;
                            }
                            continue;
                        }
                    };
                    self.spawn_connection(stream, addr);
                },

                Some(event) = self.events_rx.recv() => {
                    self.handle_event(event);
                },

                _ = sweep_interval.tick() => {
                    let swept = self.coordinator.sweep_idle(timestamp_ms());
                    if !swept.is_empty() {
                        debug!("Swept {} idle players", swept.len());
                    }
                },

                _ = status_interval.tick() => {
                    self.log_status();
                },
            }
        }
    }

    fn spawn_connection(&mut self, stream: TcpStream, addr: SocketAddr) {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        info!("Accepted connection {} from {}", id, addr);

        let events = self.events_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(id, stream, events).await {
                warn!("Connection {} ended with error: {}", id, e);
            }
        });
    }

    fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Joined { id, name, outbound } => {
                if self.coordinator.len() >= self.config.max_clients {
                    warn!("Server full, refusing {}", id);
                    let _ = outbound.send(ServerMessage::Disconnected {
                        reason: "Server full".to_string(),
                    });
                    return;
                }
                self.coordinator
                    .connect(id, name.as_deref(), outbound, timestamp_ms());
            }
            ServerEvent::Received { id, message } => {
                self.coordinator.handle(id, message, timestamp_ms());
            }
            ServerEvent::Closed { id } => {
                if self.coordinator.disconnect(id) {
                    debug!("Connection {} closed by peer", id);
                }
            }
        }
    }

    fn log_status(&self) {
        let status = self.coordinator.status(timestamp_ms());
        debug!(
            "Status {}: {} players, up {}s",
            status.status, status.entity_count, status.uptime_secs
        );
        for (scene, count) in self.coordinator.room_stats() {
            debug!("  {}: {} players", scene, count);
        }
    }
}

/// Runs one connection: handshake, writer task, then the read loop.
///
/// Returns when the peer goes away or when the coordinator drops the outbound
/// queue, which ends the writer.
async fn handle_connection(
    id: EntityId,
    stream: TcpStream,
    events: mpsc::UnboundedSender<ServerEvent>,
) -> Result<(), FrameError> {
    stream.set_nodelay(true)?;
    let (mut reader, mut writer) = stream.into_split();

    let name = match timeout(
        HANDSHAKE_TIMEOUT,
        read_message::<ClientMessage, _>(&mut reader),
    )
    .await
    {
        Ok(Ok(ClientMessage::Connect {
            client_version,
            name,
        })) => {
            if client_version != PROTOCOL_VERSION {
                info!(
                    "Refusing {}: client version {}, server version {}",
                    id, client_version, PROTOCOL_VERSION
                );
                let reason = format!(
                    "Unsupported client version {} (server speaks {})",
                    client_version, PROTOCOL_VERSION
                );
                return refuse(&mut writer, reason).await;
            }
            name
        }
        Ok(Ok(other)) => {
            warn!("{} sent {:?} before connecting", id, other);
            return refuse(&mut writer, "Expected Connect".to_string()).await;
        }
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            warn!("{} did not complete the handshake in time", id);
            return Ok(());
        }
    };

    let (outbound, mut queue) = mpsc::unbounded_channel::<ServerMessage>();
    let (closed_tx, mut closed_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        while let Some(message) = queue.recv().await {
            if let Err(e) = write_message(&mut writer, &message).await {
                debug!("Failed to write to {}: {}", id, e);
                break;
            }
        }
        let _ = writer.shutdown().await;
        drop(closed_tx);
    });

    if events
        .send(ServerEvent::Joined { id, name, outbound })
        .is_err()
    {
        return Ok(());
    }

    let result = loop {
        tokio::select! {
            read = read_message::<ClientMessage, _>(&mut reader) => match read {
                Ok(message) => {
                    if events.send(ServerEvent::Received { id, message }).is_err() {
                        break Ok(());
                    }
                }
                Err(FrameError::ConnectionClosed) => break Ok(()),
                Err(e) => break Err(e),
            },
            _ = &mut closed_rx => break Ok(()),
        }
    };

    let _ = events.send(ServerEvent::Closed { id });
    result
}

async fn refuse(writer: &mut OwnedWriteHalf, reason: String) -> Result<(), FrameError> {
    write_message(writer, &ServerMessage::Disconnected { reason }).await?;
    writer.shutdown().await?;
    Ok(())
}

/// Pause before the next `accept` after a failure. Errors tied to a single
/// pending connection retry immediately; anything else (fd exhaustion) waits.
fn accept_backoff(error: &io::Error) -> Duration {
    match error.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted => Duration::ZERO,
        _ => ACCEPT_BACKOFF,
    }
}
