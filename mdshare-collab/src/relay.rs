//! Reference relay: one shared room, WebSocket fan-out.
//!
//! ```text
//! Client A ──┐                        ┌──► Client B
//!            ├── Room ── broadcast ───┤
//! Client C ──┘   (content, members)   └──► Client C
//! ```
//!
//! The relay keeps the latest document content so late joiners start from it,
//! forwards every `markdownChange` to all members, the sender included, as
//! `updateMarkdown`, and pushes `onlineUsers` to everyone whenever membership
//! changes. Storing the content and queueing its frame happen under one lock,
//! so the stored document is always the last update every member receives.
//! Connections that have not sent `joinRoom` receive nothing and may not edit.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, RwLock};
use tokio_tungstenite::tungstenite::{self, Message};
use uuid::Uuid;

use crate::config::RelayConfig;
use crate::protocol::{ProtocolError, RelayMessage};

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

#[derive(Debug, Clone, Default)]
pub struct RelayStats {
    pub total_connections: u64,
    pub active_connections: u64,
    pub messages_relayed: u64,
}

struct Room {
    /// Encoded frames fanned out to every member
    sender: broadcast::Sender<Arc<str>>,
    members: RwLock<HashMap<Uuid, String>>,
    content: RwLock<String>,
}

impl Room {
    fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            members: RwLock::new(HashMap::new()),
            content: RwLock::new(String::new()),
        }
    }

    fn broadcast(&self, message: &RelayMessage) -> Result<usize, ProtocolError> {
        let text = message.encode()?;
        Ok(self.sender.send(Arc::from(text)).unwrap_or(0))
    }

    async fn broadcast_count(&self) -> Result<(), ProtocolError> {
        let count = self.members.read().await.len() as u64;
        self.broadcast(&RelayMessage::online_users(count))?;
        Ok(())
    }

    /// Store `content` and queue it for every member.
    async fn publish(&self, content: String) -> Result<(), ProtocolError> {
        let mut current = self.content.write().await;
        self.broadcast(&RelayMessage::update_markdown(content.as_str()))?;
        *current = content;
        Ok(())
    }

    /// Subscribe and read the current content without an edit in between.
    async fn subscribe_with_snapshot(&self) -> (broadcast::Receiver<Arc<str>>, String) {
        let current = self.content.read().await;
        (self.sender.subscribe(), current.clone())
    }
}

pub struct RelayServer {
    config: RelayConfig,
    room: Arc<Room>,
    stats: Arc<RwLock<RelayStats>>,
}

impl RelayServer {
    pub fn new(config: RelayConfig) -> Self {
        let room = Arc::new(Room::new(config.broadcast_capacity));
        Self {
            config,
            room,
            stats: Arc::new(RwLock::new(RelayStats::default())),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(RelayConfig::default())
    }

    /// Bind the configured address and serve until an accept fails.
    pub async fn run(&self) -> Result<(), RelayError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), RelayError> {
        log::info!("Relay listening on {}", listener.local_addr()?);
        loop {
            let (stream, addr) = listener.accept().await?;
            log::debug!("New TCP connection from {addr}");

            let room = self.room.clone();
            let stats = self.stats.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, room, stats).await {
                    log::warn!("Connection error from {addr}: {e}");
                }
            });
        }
    }

    pub fn bind_addr(&self) -> &str {
        &self.config.bind_addr
    }

    /// Members currently joined.
    pub async fn online_users(&self) -> usize {
        self.room.members.read().await.len()
    }

    /// Latest document content.
    pub async fn content(&self) -> String {
        self.room.content.read().await.clone()
    }

    pub async fn stats(&self) -> RelayStats {
        self.stats.read().await.clone()
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    room: Arc<Room>,
    stats: Arc<RwLock<RelayStats>>,
) -> Result<(), RelayError> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let conn_id = Uuid::new_v4();
    let mut room_rx = room.sender.subscribe();
    let mut joined_as: Option<String> = None;

    {
        let mut s = stats.write().await;
        s.total_connections += 1;
        s.active_connections += 1;
    }
    log::info!("WebSocket connection {conn_id} established from {addr}");

    let result: Result<(), RelayError> = async {
        loop {
            tokio::select! {
                incoming = ws_receiver.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            let message = match RelayMessage::decode(text.as_str()) {
                                Ok(message) => message,
                                Err(e) => {
                                    log::warn!("Failed to decode frame from {addr}: {e}");
                                    continue;
                                }
                            };
                            match message {
                                RelayMessage::JoinRoom(name) => {
                                    room.members.write().await.insert(conn_id, name.clone());
                                    log::info!("{name} joined the room");
                                    joined_as = Some(name);

                                    // Frames queued before this point are older than the snapshot
                                    let (rx, snapshot) = room.subscribe_with_snapshot().await;
                                    room_rx = rx;
                                    let frame = RelayMessage::update_markdown(snapshot).encode()?;
                                    ws_sender.send(Message::Text(frame.into())).await?;
                                    room.broadcast_count().await?;
                                }
                                RelayMessage::MarkdownChange(content) => {
                                    if joined_as.is_none() {
                                        log::debug!("Ignoring edit from {addr} before join");
                                        continue;
                                    }
                                    room.publish(content).await?;
                                    stats.write().await.messages_relayed += 1;
                                }
                                other => {
                                    log::warn!("Ignoring relay-bound {} from {addr}", other.event_name());
                                }
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            ws_sender.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            log::info!("Connection closed from {addr}");
                            return Ok(());
                        }
                        Some(Err(e)) => return Err(e.into()),
                        Some(Ok(_)) => {}
                    }
                }

                frame = room_rx.recv() => {
                    match frame {
                        Ok(frame) => {
                            if joined_as.is_none() {
                                continue;
                            }
                            ws_sender.send(Message::text(frame.to_string())).await?;
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            log::warn!("Connection {conn_id} lagged by {n} frames");
                        }
                        Err(broadcast::error::RecvError::Closed) => return Ok(()),
                    }
                }
            }
        }
    }
    .await;

    if let Some(name) = joined_as {
        room.members.write().await.remove(&conn_id);
        log::info!("{name} left the room");
        if let Err(e) = room.broadcast_count().await {
            log::warn!("Failed to announce member count: {e}");
        }
    }
    stats.write().await.active_connections -= 1;

    result
}
