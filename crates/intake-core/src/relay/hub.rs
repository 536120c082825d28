//! In-process broadcast hub
//!
//! One `tokio::sync::broadcast` sender per channel name, created lazily on
//! first subscribe. Publishing to a channel nobody listens on is not an error.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use super::message::RelayEvent;
use super::RelayError;

/// Events buffered per subscriber before it starts lagging
pub const DEFAULT_CAPACITY: usize = 64;

/// Named-channel publish/subscribe hub
#[derive(Debug, Clone)]
pub struct Relay {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<RelayEvent>>>>,
    capacity: usize,
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}

impl Relay {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to a channel, creating it if needed
    pub fn subscribe(&self, channel: &str) -> Result<broadcast::Receiver<RelayEvent>, RelayError> {
        let mut channels = self.channels.write().map_err(|_| RelayError::Poisoned)?;
        let sender = channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        debug!(channel, subscribers = sender.receiver_count() + 1, "Subscribed");
        Ok(sender.subscribe())
    }

    /// Publish an event; returns how many subscribers received it
    pub fn publish(&self, channel: &str, event: &str, data: Value) -> Result<usize, RelayError> {
        let channels = self.channels.read().map_err(|_| RelayError::Poisoned)?;
        let Some(sender) = channels.get(channel) else {
            debug!(channel, event, "Published to channel with no subscribers");
            return Ok(0);
        };

        // Err only means every receiver is gone
        let delivered = sender
            .send(RelayEvent::new(channel, event, data))
            .unwrap_or(0);
        debug!(channel, event, delivered, "Published");
        Ok(delivered)
    }

    /// Current number of subscribers on a channel
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .read()
            .ok()
            .and_then(|channels| channels.get(channel).map(|s| s.receiver_count()))
            .unwrap_or(0)
    }
}
