//! Autosync state machine
//!
//! Pure and clock-driven: callers pass `now` in, and get back the snapshots
//! that must be published. No I/O happens here.

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

use super::timer::Timer;
use crate::config::Config;
use crate::models::{Field, PartialPatientRecord, Status};
use crate::schema::{self, FieldError, SchemaError};

/// Default quiescence before a routine `active` sync
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Default quiescence before the record is marked `inactive`
pub const DEFAULT_INACTIVITY: Duration = Duration::from_millis(5000);

/// Timer settings for a form session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosyncConfig {
    pub debounce: Duration,
    pub inactivity: Duration,
}

impl Default for AutosyncConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            inactivity: DEFAULT_INACTIVITY,
        }
    }
}

impl From<&Config> for AutosyncConfig {
    fn from(config: &Config) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            inactivity: Duration::from_millis(config.inactivity_ms),
        }
    }
}

/// What caused a snapshot to be sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Debounce,
    Inactivity,
    Submission,
}

/// A snapshot that must be handed to the publisher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub trigger: Trigger,
    /// Snapshot already stamped with its status
    pub snapshot: PartialPatientRecord,
}

impl Outbound {
    pub fn status(&self) -> Status {
        self.snapshot.status.unwrap_or_default()
    }
}

/// Errors from driving the machine
#[derive(Error, Debug)]
pub enum AutosyncError {
    /// The record was submitted; no further transitions are accepted
    #[error("Record has already been submitted")]
    AlreadySubmitted,

    /// Field value could not be applied
    #[error(transparent)]
    Field(#[from] FieldError),

    /// Snapshot is not a complete record
    #[error(transparent)]
    Incomplete(#[from] SchemaError),
}

/// Owns the in-progress snapshot, its derived status, and both timers
#[derive(Debug, Clone)]
pub struct AutosyncMachine {
    status: Status,
    snapshot: PartialPatientRecord,
    debounce: Timer,
    inactivity: Timer,
}

impl AutosyncMachine {
    /// Start a session with the form's default values
    pub fn new(config: AutosyncConfig) -> Self {
        Self::with_snapshot(config, PartialPatientRecord::form_defaults())
    }

    /// Start a session from an existing snapshot
    pub fn with_snapshot(config: AutosyncConfig, snapshot: PartialPatientRecord) -> Self {
        Self {
            status: Status::Active,
            snapshot: snapshot.with_status(Status::Active),
            debounce: Timer::new(config.debounce),
            inactivity: Timer::new(config.inactivity),
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Latest local values, stamped with the current status
    pub fn snapshot(&self) -> &PartialPatientRecord {
        &self.snapshot
    }

    /// Earliest pending timer deadline, if any timer is armed
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.debounce.deadline(), self.inactivity.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Apply a field edit
    ///
    /// Resets status to `active` and re-arms both timers. Returns whether the
    /// status changed.
    pub fn change(
        &mut self,
        field: Field,
        value: &str,
        now: Instant,
    ) -> Result<bool, AutosyncError> {
        if self.status.is_terminal() {
            debug!(field = field.key(), "Ignoring edit after submission");
            return Err(AutosyncError::AlreadySubmitted);
        }

        self.snapshot.set(field, value)?;

        let changed = self.status != Status::Active;
        self.set_status(Status::Active);
        self.debounce.arm(now);
        self.inactivity.arm(now);
        Ok(changed)
    }

    /// Fire whichever timers are due at `now`
    ///
    /// Debounce is handled before inactivity, so a late poll still emits
    /// `active` ahead of `inactive`.
    pub fn poll(&mut self, now: Instant) -> Vec<Outbound> {
        let mut out = Vec::new();
        if self.status.is_terminal() {
            return out;
        }

        if self.debounce.fire(now) {
            out.push(Outbound {
                trigger: Trigger::Debounce,
                snapshot: self.snapshot.with_status(Status::Active),
            });
        }

        if self.inactivity.fire(now) {
            self.set_status(Status::Inactive);
            out.push(Outbound {
                trigger: Trigger::Inactivity,
                snapshot: self.snapshot.clone(),
            });
        }

        out
    }

    /// Final submission
    ///
    /// On success both timers are cancelled and the machine is terminal.
    /// On validation failure nothing changes.
    pub fn submit(&mut self) -> Result<Outbound, AutosyncError> {
        if self.status.is_terminal() {
            return Err(AutosyncError::AlreadySubmitted);
        }

        let mut record = schema::validate_complete(&self.snapshot)?;
        record.status = Status::Submitted;

        self.debounce.cancel();
        self.inactivity.cancel();
        self.status = Status::Submitted;
        self.snapshot = record.into();

        Ok(Outbound {
            trigger: Trigger::Submission,
            snapshot: self.snapshot.clone(),
        })
    }

    /// Cancel both timers without sending anything
    pub fn teardown(&mut self) {
        self.debounce.cancel();
        self.inactivity.cancel();
    }

    fn set_status(&mut self, status: Status) {
        self.status = status;
        self.snapshot.status = Some(status);
    }
}
