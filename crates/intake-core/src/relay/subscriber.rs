//! Relay channel subscriber
//!
//! Keeps a WebSocket subscription to one relay channel open, reconnecting with
//! exponential backoff, and forwards every received event.

use std::time::Duration;

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::message::RelayEvent;

/// Commands sent to the subscriber task
#[derive(Debug, Clone)]
pub enum SubscriberCommand {
    /// Unsubscribe and stop
    Shutdown,
}

/// Connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Not connected, not trying
    Disconnected,
    /// Attempting to connect
    Connecting,
    /// Socket open, waiting for the subscription acknowledgement
    Connected,
    /// Subscription acknowledged by the relay
    Subscribed,
}

/// Events emitted by the subscriber task
#[derive(Debug, Clone)]
pub enum SubscriberEvent {
    /// Connection status changed
    StatusChanged(ConnectionStatus),
    /// An event arrived on the channel
    Received(RelayEvent),
    /// Error occurred (the task keeps retrying)
    Error(String),
}

/// Handle to control the subscriber task
pub struct SubscriberHandle {
    /// Send commands to the subscriber task
    pub command_tx: mpsc::Sender<SubscriberCommand>,
    /// Receive events from the subscriber task
    pub event_rx: mpsc::Receiver<SubscriberEvent>,
    /// Watch connection status
    pub status_rx: watch::Receiver<ConnectionStatus>,
}

/// Configuration for a subscription
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    /// WebSocket URL of the channel
    pub url: String,
    /// Initial reconnect delay
    pub initial_reconnect_delay: Duration,
    /// Maximum reconnect delay
    pub max_reconnect_delay: Duration,
}

impl SubscriberConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            initial_reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
        }
    }
}

/// Spawn a subscriber task
pub fn spawn_subscriber(config: SubscriberConfig) -> SubscriberHandle {
    let (command_tx, command_rx) = mpsc::channel(16);
    let (event_tx, event_rx) = mpsc::channel(64);
    let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);

    tokio::spawn(subscriber_loop(config, command_rx, event_tx, status_tx));

    SubscriberHandle {
        command_tx,
        event_rx,
        status_rx,
    }
}

/// Main loop with reconnection
async fn subscriber_loop(
    config: SubscriberConfig,
    mut command_rx: mpsc::Receiver<SubscriberCommand>,
    event_tx: mpsc::Sender<SubscriberEvent>,
    status_tx: watch::Sender<ConnectionStatus>,
) {
    let mut reconnect_delay = config.initial_reconnect_delay;

    loop {
        set_status(&status_tx, &event_tx, ConnectionStatus::Connecting).await;

        match connect_and_listen(&config, &mut command_rx, &event_tx, &status_tx).await {
            Ok(true) => break,
            Ok(false) => {
                // Closed by the server, reset backoff
                reconnect_delay = config.initial_reconnect_delay;
            }
            Err(e) => {
                warn!("Relay subscription error: {}", e);
                let _ = event_tx
                    .send(SubscriberEvent::Error(format!("Connection error: {}", e)))
                    .await;
            }
        }

        set_status(&status_tx, &event_tx, ConnectionStatus::Disconnected).await;

        // Wait before reconnecting, but honour shutdown
        tokio::select! {
            _ = tokio::time::sleep(reconnect_delay) => {
                reconnect_delay = (reconnect_delay * 2).min(config.max_reconnect_delay);
            }
            cmd = command_rx.recv() => {
                if matches!(cmd, Some(SubscriberCommand::Shutdown) | None) {
                    break;
                }
            }
        }
    }

    let _ = status_tx.send(ConnectionStatus::Disconnected);
    info!("Relay subscriber stopped");
}

/// Connect and forward events until the socket closes or shutdown
///
/// Returns `Ok(true)` on shutdown.
async fn connect_and_listen(
    config: &SubscriberConfig,
    command_rx: &mut mpsc::Receiver<SubscriberCommand>,
    event_tx: &mpsc::Sender<SubscriberEvent>,
    status_tx: &watch::Sender<ConnectionStatus>,
) -> Result<bool> {
    let (ws_stream, _) = connect_async(&config.url).await?;
    let (mut write, mut read) = ws_stream.split();
    info!("Connected to relay at {}", config.url);
    set_status(status_tx, event_tx, ConnectionStatus::Connected).await;

    loop {
        tokio::select! {
            cmd = command_rx.recv() => {
                if matches!(cmd, Some(SubscriberCommand::Shutdown) | None) {
                    write.send(Message::Close(None)).await.ok();
                    return Ok(true);
                }
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match RelayEvent::decode(&text) {
                        Ok(event) => {
                            if event.is_subscription_succeeded() {
                                set_status(status_tx, event_tx, ConnectionStatus::Subscribed).await;
                            }
                            let _ = event_tx.send(SubscriberEvent::Received(event)).await;
                        }
                        Err(e) => warn!("Failed to decode relay frame: {}", e),
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Relay closed the connection");
                        return Ok(false);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                }
            }
        }
    }
}

async fn set_status(
    status_tx: &watch::Sender<ConnectionStatus>,
    event_tx: &mpsc::Sender<SubscriberEvent>,
    status: ConnectionStatus,
) {
    let _ = status_tx.send(status);
    let _ = event_tx.send(SubscriberEvent::StatusChanged(status)).await;
}
