//! Sync client
//!
//! Posts snapshots to the intake server's sync endpoint. Used as the
//! `Publish` implementation behind a form session.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::autosync::Publish;
use crate::config::Config;
use crate::models::PartialPatientRecord;

/// Errors from a single sync attempt
#[derive(Error, Debug)]
pub enum SyncError {
    /// Request never completed (connection refused, timeout, ...)
    #[error("Sync request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Sync rejected by server ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Error body returned by the sync endpoint
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for `POST /api/patient/sync`
///
/// Clones share one count of pushes still running in the background.
#[derive(Debug, Clone)]
pub struct SyncClient {
    http: reqwest::Client,
    url: String,
    in_flight: Arc<watch::Sender<usize>>,
}

/// Holds one slot in the in-flight count until dropped
struct InFlight(Arc<watch::Sender<usize>>);

impl InFlight {
    fn start(counter: &Arc<watch::Sender<usize>>) -> Self {
        counter.send_modify(|n| *n += 1);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl SyncClient {
    /// Create a client posting to `url`
    pub fn new(url: impl Into<String>) -> Self {
        let (in_flight, _) = watch::channel(0);
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            in_flight: Arc::new(in_flight),
        }
    }

    /// Create a client for the configured server
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.sync_url())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Pushes spawned by `publish` that have not finished
    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    /// Wait until every spawned push has finished, successfully or not
    pub async fn wait_idle(&self) {
        let mut rx = self.in_flight.subscribe();
        // The sender lives as long as self, so this cannot fail
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// `wait_idle` bounded by `limit`; false if pushes were still running
    pub async fn drain(&self, limit: Duration) -> bool {
        tokio::time::timeout(limit, self.wait_idle()).await.is_ok()
    }

    /// Post one snapshot and wait for the server's answer
    ///
    /// Single attempt, no retry.
    pub async fn push(&self, snapshot: &PartialPatientRecord) -> Result<(), SyncError> {
        let response = self.http.post(&self.url).json(snapshot).send().await?;

        let status = response.status();
        if status.is_success() {
            debug!(%status, "Snapshot accepted");
            return Ok(());
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.canonical_reason().unwrap_or("unknown").to_string(),
        };
        Err(SyncError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

impl Publish for SyncClient {
    /// Spawn the push and return immediately; failures are only logged
    fn publish(&self, snapshot: PartialPatientRecord) {
        let client = self.clone();
        let slot = InFlight::start(&self.in_flight);
        tokio::spawn(async move {
            let _slot = slot;
            if let Err(e) = client.push(&snapshot).await {
                warn!("Sync error: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_from_config() {
        let config = Config {
            server_url: "http://intake.local:8080/".to_string(),
            ..Config::default()
        };
        let client = SyncClient::from_config(&config);
        assert_eq!(client.url(), "http://intake.local:8080/api/patient/sync");
    }

    #[test]
    fn test_rejected_display() {
        let err = SyncError::Rejected {
            status: 400,
            message: "Invalid data format".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Sync rejected by server (400): Invalid data format"
        );
    }

    #[tokio::test]
    async fn test_push_to_unreachable_server_fails() {
        // Port 9 (discard) on localhost is almost never listening
        let client = SyncClient::new("http://127.0.0.1:9/api/patient/sync");
        let err = client.push(&PartialPatientRecord::new()).await.unwrap_err();
        assert!(matches!(err, SyncError::Request(_)));
    }

    #[tokio::test]
    async fn test_publish_swallows_failures() {
        let client = SyncClient::new("http://127.0.0.1:9/api/patient/sync");
        // Must not panic or block
        client.publish(PartialPatientRecord::new());
    }

    #[tokio::test]
    async fn test_drain_waits_for_spawned_pushes() {
        let client = SyncClient::new("http://127.0.0.1:9/api/patient/sync");
        assert!(client.drain(Duration::from_millis(10)).await);

        client.clone().publish(PartialPatientRecord::new());
        assert_eq!(client.in_flight(), 1);

        assert!(client.drain(Duration::from_secs(5)).await);
        assert_eq!(client.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_drain_gives_up_on_stalled_server() {
        // Accepts connections (via the backlog) but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api/patient/sync", listener.local_addr().unwrap());
        let client = SyncClient::new(url);

        client.publish(PartialPatientRecord::new());
        assert!(!client.drain(Duration::from_millis(100)).await);
        assert_eq!(client.in_flight(), 1);
    }
}
