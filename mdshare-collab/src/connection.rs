//! Transport session to the relay.
//!
//! [`ConnectionManager::connect`] spawns a driver task that owns the
//! WebSocket. The driver connects, forwards outgoing frames, decodes incoming
//! frames and, when the socket drops, retries forever with bounded backoff.
//! Lifecycle changes and relay messages reach the owner as
//! [`ConnectionEvent`]s, in the order they happened.
//!
//! ```text
//!  SyncClient ──send()──► mpsc ──► driver ──► WebSocket ──► relay
//!  SyncClient ◄─next_event()── mpsc ◄── driver ◄── WebSocket
//! ```
//!
//! Outgoing messages wait in the channel while the socket is down and are
//! flushed once the driver is connected again.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::config::ReconnectPolicy;
use crate::protocol::RelayMessage;

/// Connection state, owned by the [`ConnectionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// First connection attempt(s) in progress
    Connecting,
    /// Connected for the first time
    Connected,
    /// Socket lost, retrying
    Disconnected,
    /// Connected again after at least one disconnect
    Reconnected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected | Self::Reconnected)
    }
}

/// Events surfaced by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// First successful connection
    Connected,
    /// Socket lost; the driver keeps retrying
    Disconnected,
    /// Connection restored after a disconnect
    Reconnected,
    /// Frame received from the relay
    Message(RelayMessage),
}

/// Bounded growing delay between reconnection attempts.
///
/// `initial`, `initial * factor`, `initial * factor²`, ... capped at `max`,
/// then held at `max` for as long as the outage lasts.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    attempts: u32,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { policy, attempts: 0 }
    }

    /// Delay to wait before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        let multiplier = self.policy.factor.max(1).saturating_pow(self.attempts);
        let delay = self
            .policy
            .initial_delay
            .saturating_mul(multiplier)
            .min(self.policy.max_delay);
        self.attempts = self.attempts.saturating_add(1);
        delay
    }

    /// Failed attempts since the last successful connection.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

/// Owns the transport session and its state.
pub struct ConnectionManager {
    state: ConnectionState,
    events: mpsc::Receiver<ConnectionEvent>,
    outgoing: mpsc::Sender<RelayMessage>,
    driver: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    /// Start connecting to `url`.
    ///
    /// Must be called from within a tokio runtime. No manual reconnect is
    /// ever needed: the driver retries until [`shutdown`](Self::shutdown).
    pub fn connect(url: impl Into<String>, policy: ReconnectPolicy, capacity: usize) -> Self {
        let (event_tx, event_rx) = mpsc::channel(capacity);
        let (out_tx, out_rx) = mpsc::channel(capacity);
        let driver = tokio::spawn(drive(url.into(), policy, out_rx, event_tx));
        Self {
            state: ConnectionState::Connecting,
            events: event_rx,
            outgoing: out_tx,
            driver: Some(driver),
        }
    }

    /// A manager with no driver: events are injected and outgoing messages
    /// observed through the returned channel ends.
    #[cfg(test)]
    pub(crate) fn detached(
        capacity: usize,
    ) -> (Self, mpsc::Sender<ConnectionEvent>, mpsc::Receiver<RelayMessage>) {
        let (event_tx, event_rx) = mpsc::channel(capacity);
        let (out_tx, out_rx) = mpsc::channel(capacity);
        let manager = Self {
            state: ConnectionState::Connecting,
            events: event_rx,
            outgoing: out_tx,
            driver: None,
        };
        (manager, event_tx, out_rx)
    }

    /// Wait for the next transport event, updating the connection state.
    ///
    /// Returns `None` once the driver has stopped.
    pub async fn next_event(&mut self) -> Option<ConnectionEvent> {
        let event = self.events.recv().await?;
        match event {
            ConnectionEvent::Connected => self.state = ConnectionState::Connected,
            ConnectionEvent::Reconnected => self.state = ConnectionState::Reconnected,
            ConnectionEvent::Disconnected => self.state = ConnectionState::Disconnected,
            ConnectionEvent::Message(_) => {}
        }
        Some(event)
    }

    /// Hand a message to the driver. Fire-and-forget: returns `false` when
    /// the message was dropped because the buffer is full or the driver is gone.
    pub fn send(&self, message: RelayMessage) -> bool {
        match self.outgoing.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(message)) => {
                log::debug!("Outgoing buffer full, dropping {}", message.event_name());
                false
            }
            Err(mpsc::error::TrySendError::Closed(message)) => {
                log::debug!("Transport stopped, dropping {}", message.event_name());
                false
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Stop the driver and release the socket. Events not yet taken are
    /// discarded.
    pub fn shutdown(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
        self.events.close();
        while self.events.try_recv().is_ok() {}
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

/// Driver loop: connect, pump frames, back off, repeat.
async fn drive(
    url: String,
    policy: ReconnectPolicy,
    mut outgoing: mpsc::Receiver<RelayMessage>,
    events: mpsc::Sender<ConnectionEvent>,
) {
    let mut backoff = Backoff::new(policy);
    let mut ever_connected = false;

    loop {
        match tokio_tungstenite::connect_async(&url).await {
            Ok((ws_stream, _)) => {
                backoff.reset();
                let event = if ever_connected {
                    log::info!("Reconnected to relay at {url}");
                    ConnectionEvent::Reconnected
                } else {
                    log::info!("Connected to relay at {url}");
                    ConnectionEvent::Connected
                };
                ever_connected = true;
                if events.send(event).await.is_err() {
                    return;
                }

                let (mut writer, mut reader) = ws_stream.split();
                loop {
                    tokio::select! {
                        next = outgoing.recv() => {
                            let Some(message) = next else {
                                // Owner went away
                                let _ = writer.close().await;
                                return;
                            };
                            let frame = match message.encode() {
                                Ok(frame) => frame,
                                Err(e) => {
                                    log::warn!("Failed to encode {}: {e}", message.event_name());
                                    continue;
                                }
                            };
                            if writer.send(Message::Text(frame.into())).await.is_err() {
                                break;
                            }
                        }
                        incoming = reader.next() => {
                            match incoming {
                                Some(Ok(Message::Text(text))) => {
                                    match RelayMessage::decode(text.as_str()) {
                                        Ok(message) => {
                                            if events.send(ConnectionEvent::Message(message)).await.is_err() {
                                                return;
                                            }
                                        }
                                        Err(e) => log::warn!("Ignoring malformed frame: {e}"),
                                    }
                                }
                                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                                Some(Ok(_)) => {}
                            }
                        }
                    }
                }

                log::info!("Connection to relay lost");
                if events.send(ConnectionEvent::Disconnected).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                log::debug!("Connection attempt {} to {url} failed: {e}", backoff.attempts() + 1);
            }
        }

        let delay = backoff.next_delay();
        log::debug!("Retrying in {delay:?}");
        tokio::time::sleep(delay).await;
    }
}
