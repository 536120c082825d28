//! Relay wire messages
//!
//! Every frame on a channel socket is one JSON-encoded `RelayEvent`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Channel carrying patient snapshots
pub const PATIENT_CHANNEL: &str = "hospital-queue";

/// Event name for a patient snapshot
pub const PATIENT_UPDATE_EVENT: &str = "patient-update";

/// First event on every subscription
pub const SUBSCRIPTION_SUCCEEDED_EVENT: &str = "intake:subscription_succeeded";

/// A named event on a named channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayEvent {
    pub channel: String,
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl RelayEvent {
    pub fn new(channel: impl Into<String>, event: impl Into<String>, data: Value) -> Self {
        Self {
            channel: channel.into(),
            event: event.into(),
            data,
        }
    }

    /// Acknowledgement sent to a new subscriber
    pub fn subscription_succeeded(channel: &str) -> Self {
        Self::new(channel, SUBSCRIPTION_SUCCEEDED_EVENT, Value::Null)
    }

    pub fn is_subscription_succeeded(&self) -> bool {
        self.event == SUBSCRIPTION_SUCCEEDED_EVENT
    }

    /// Encode as a JSON text frame
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a JSON text frame
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_succeeded_frame() {
        let frame = RelayEvent::subscription_succeeded(PATIENT_CHANNEL)
            .encode()
            .unwrap();
        assert_eq!(
            frame,
            r#"{"channel":"hospital-queue","event":"intake:subscription_succeeded","data":null}"#
        );
        assert!(RelayEvent::decode(&frame).unwrap().is_subscription_succeeded());
    }

    #[test]
    fn test_decode_without_data() {
        let event = RelayEvent::decode(r#"{"channel":"c","event":"e"}"#).unwrap();
        assert_eq!(event.data, Value::Null);
        assert!(!event.is_subscription_succeeded());
    }
}
