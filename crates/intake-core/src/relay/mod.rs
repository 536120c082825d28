//! Broadcast relay
//!
//! Named channels carrying named events to every current subscriber.
//!
//! - `hub`: in-process fan-out used by the server
//! - `message`: the JSON frame exchanged over channel sockets
//! - `subscriber`: reconnecting WebSocket client used by the monitor

mod hub;
mod message;
mod subscriber;

use thiserror::Error;

pub use hub::{Relay, DEFAULT_CAPACITY};
pub use message::{RelayEvent, PATIENT_CHANNEL, PATIENT_UPDATE_EVENT, SUBSCRIPTION_SUCCEEDED_EVENT};
pub use subscriber::{
    spawn_subscriber, ConnectionStatus, SubscriberCommand, SubscriberConfig, SubscriberEvent,
    SubscriberHandle,
};

/// Errors from the relay hub
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Relay channel table is poisoned")]
    Poisoned,

    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}
