//! Intake Core Library
//!
//! This crate provides the core functionality for the patient intake system:
//! a form that pushes partial patient records, as they are typed, to a staff
//! monitor through a broadcast relay.
//!
//! # Architecture
//!
//! - **Autosync**: a debounced, status-aware state machine decides when a
//!   snapshot of the form is sent and whether it is stamped `active`,
//!   `inactive` or `submitted`
//! - **Relay**: named channels that fan each event out to every subscriber
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let handle = spawn_session(AutosyncConfig::from(&config), SyncClient::from_config(&config));
//!
//! handle.command_tx.send(SessionCommand::change(Field::FirstName, "Ann")).await?;
//! handle.command_tx.send(SessionCommand::Submit).await?;
//! ```
//!
//! # Modules
//!
//! - `models`: patient records, fields, gender and status
//! - `schema`: strict and relaxed validation
//! - `autosync`: the state machine and the session task driving it
//! - `client`: HTTP client for the sync endpoint
//! - `relay`: broadcast hub, wire frames and the reconnecting subscriber
//! - `monitor`: view model for the staff monitor
//! - `countries`: nationality option list
//! - `config`: application configuration

pub mod autosync;
pub mod client;
pub mod config;
pub mod countries;
pub mod models;
pub mod monitor;
pub mod relay;
pub mod schema;

pub use autosync::{
    spawn_session, AutosyncConfig, AutosyncError, AutosyncHandle, AutosyncMachine, Publish,
    SessionCommand, SessionEvent,
};
pub use client::{SyncClient, SyncError};
pub use config::Config;
pub use models::{Field, Gender, PartialPatientRecord, PatientRecord, Status};
pub use monitor::MonitorState;
pub use relay::{Relay, RelayError, RelayEvent};
pub use schema::{FieldError, SchemaError};
