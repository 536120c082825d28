//! # Intake Server
//!
//! HTTP side of the intake system.
//!
//! Handles:
//! - `POST /api/patient/sync`: validate a partial patient record and
//!   republish it on the `hospital-queue` channel
//! - `GET /api/channels/:channel`: WebSocket subscription to a relay channel
//! - `GET /health`: liveness check

#![warn(rust_2018_idioms)]

mod error;

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::{Json, Response};
use axum::routing::{get, post};
use axum::Router;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use intake_core::relay::{PATIENT_CHANNEL, PATIENT_UPDATE_EVENT};
use intake_core::schema::parse_partial;
use intake_core::{Relay, RelayError, RelayEvent};

pub use error::ApiError;

/// Shared state for request handlers
#[derive(Clone, Default)]
pub struct AppState {
    pub relay: Relay,
}

impl AppState {
    pub fn new(relay: Relay) -> Self {
        Self { relay }
    }
}

#[derive(Debug, Serialize)]
struct HealthRes {
    ok: bool,
    message: String,
    /// Open monitor sockets on the patient channel
    monitors: usize,
}

#[derive(Debug, Serialize)]
struct SyncRes {
    success: bool,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/patient/sync", post(sync_patient))
        .route("/api/channels/:channel", get(channel_socket))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped
pub async fn serve(addr: &str, relay: Relay) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local: SocketAddr = listener.local_addr()?;
    info!("-- Intake server listening on {}", local);

    axum::serve(listener, router(AppState::new(relay))).await?;
    Ok(())
}

async fn health(State(state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Intake server is alive".into(),
        monitors: state.relay.subscriber_count(PATIENT_CHANNEL),
    })
}

/// Validate a partial record and broadcast it
///
/// The raw body is taken so a syntax error can be told apart from a schema
/// failure.
async fn sync_patient(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SyncRes>, ApiError> {
    let record = parse_partial(&body)?;
    let data = serde_json::to_value(&record).map_err(RelayError::from)?;

    let delivered = state
        .relay
        .publish(PATIENT_CHANNEL, PATIENT_UPDATE_EVENT, data)?;
    info!(
        delivered,
        status = ?record.status,
        fields = record.filled_count(),
        "Patient update published"
    );

    Ok(Json(SyncRes { success: true }))
}

/// Upgrade to a WebSocket subscribed to `channel`
///
/// The relay subscription is taken before the upgrade completes, so nothing
/// published after the handshake is missed.
async fn channel_socket(
    ws: WebSocketUpgrade,
    Path(channel): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let rx = state.relay.subscribe(&channel)?;
    Ok(ws.on_upgrade(move |socket| forward_channel(socket, channel, rx)))
}

async fn forward_channel(
    socket: WebSocket,
    channel: String,
    mut rx: broadcast::Receiver<RelayEvent>,
) {
    let (mut sink, mut stream) = socket.split();

    if send_event(&mut sink, &RelayEvent::subscription_succeeded(&channel))
        .await
        .is_err()
    {
        return;
    }
    debug!(%channel, "Subscriber attached");

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    if send_event(&mut sink, &event).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%channel, skipped, "Subscriber lagging, events skipped");
                }
                Err(RecvError::Closed) => break,
            },

            msg = stream.next() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Subscribers have nothing to say
                Some(Ok(_)) => {}
            },
        }
    }

    debug!(%channel, "Subscriber detached");
}

async fn send_event(
    sink: &mut SplitSink<WebSocket, Message>,
    event: &RelayEvent,
) -> anyhow::Result<()> {
    let text = event.encode()?;
    sink.send(Message::Text(text)).await?;
    Ok(())
}
