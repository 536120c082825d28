//! Autosync session task
//!
//! Runs one `AutosyncMachine` inside a tokio task that owns it exclusively.
//! Edits, timer fires and shutdown are handled one at a time; sends are handed
//! to the publisher and never awaited.

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::machine::{AutosyncConfig, AutosyncError, AutosyncMachine, Outbound};
use super::publish::Publish;
use crate::models::{Field, Status};
use crate::schema::FieldError;

/// Commands sent to the session task
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// A form field was edited
    Change { field: Field, value: String },
    /// Final form submission
    Submit,
    /// Cancel timers and stop the task
    Shutdown,
}

impl SessionCommand {
    pub fn change(field: Field, value: impl Into<String>) -> Self {
        SessionCommand::Change {
            field,
            value: value.into(),
        }
    }
}

/// Events emitted by the session task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Derived status changed
    StatusChanged(Status),
    /// A snapshot with this status was handed to the publisher
    Sent(Status),
    /// An edit could not be applied
    ChangeRejected(FieldError),
    /// Submission failed validation
    SubmitRejected(Vec<FieldError>),
}

/// Handle to control a running session
pub struct AutosyncHandle {
    /// Send commands to the session
    pub command_tx: mpsc::Sender<SessionCommand>,
    /// Receive events from the session
    pub event_rx: mpsc::Receiver<SessionEvent>,
    /// Watch the derived status
    pub status_rx: watch::Receiver<Status>,
    /// Identifies this session in logs
    pub session_id: String,
}

impl AutosyncHandle {
    /// Current derived status
    pub fn status(&self) -> Status {
        *self.status_rx.borrow()
    }
}

/// Spawn a session task
///
/// The task ends on `SessionCommand::Shutdown` or when every command sender
/// is dropped; either way both timers are cancelled first.
pub fn spawn_session<P>(config: AutosyncConfig, publisher: P) -> AutosyncHandle
where
    P: Publish + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(64);
    let (event_tx, event_rx) = mpsc::channel(64);
    let (status_tx, status_rx) = watch::channel(Status::Active);
    let session_id = format!("intake-{}", &uuid::Uuid::new_v4().to_string()[..8]);

    tokio::spawn(session_loop(
        session_id.clone(),
        AutosyncMachine::new(config),
        publisher,
        command_rx,
        event_tx,
        status_tx,
    ));

    AutosyncHandle {
        command_tx,
        event_rx,
        status_rx,
        session_id,
    }
}

async fn session_loop<P: Publish>(
    session_id: String,
    mut machine: AutosyncMachine,
    publisher: P,
    mut command_rx: mpsc::Receiver<SessionCommand>,
    event_tx: mpsc::Sender<SessionEvent>,
    status_tx: watch::Sender<Status>,
) {
    info!(session = %session_id, "Autosync session started");

    loop {
        let deadline = machine.next_deadline();

        tokio::select! {
            cmd = command_rx.recv() => {
                match cmd {
                    Some(SessionCommand::Change { field, value }) => {
                        match machine.change(field, &value, Instant::now()) {
                            Ok(true) => report_status(&machine, &event_tx, &status_tx),
                            Ok(false) => {}
                            Err(AutosyncError::Field(e)) => {
                                emit(&event_tx, SessionEvent::ChangeRejected(e));
                            }
                            Err(e) => debug!(session = %session_id, "Edit ignored: {}", e),
                        }
                    }
                    Some(SessionCommand::Submit) => match machine.submit() {
                        Ok(outbound) => {
                            report_status(&machine, &event_tx, &status_tx);
                            send(&session_id, &publisher, outbound, &event_tx);
                            info!(session = %session_id, "Record submitted");
                        }
                        Err(AutosyncError::Incomplete(e)) => {
                            emit(&event_tx, SessionEvent::SubmitRejected(e.field_errors().to_vec()));
                        }
                        Err(e) => debug!(session = %session_id, "Submit ignored: {}", e),
                    },
                    Some(SessionCommand::Shutdown) | None => {
                        machine.teardown();
                        break;
                    }
                }
            }

            _ = async {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    // Nothing armed: only commands can wake us
                    None => std::future::pending::<()>().await,
                }
            } => {
                let before = machine.status();
                for outbound in machine.poll(Instant::now()) {
                    send(&session_id, &publisher, outbound, &event_tx);
                }
                if machine.status() != before {
                    report_status(&machine, &event_tx, &status_tx);
                }
            }
        }
    }

    info!(session = %session_id, "Autosync session stopped");
}

fn send<P: Publish>(
    session_id: &str,
    publisher: &P,
    outbound: Outbound,
    event_tx: &mpsc::Sender<SessionEvent>,
) {
    let status = outbound.status();
    debug!(session = %session_id, trigger = ?outbound.trigger, %status, "Publishing snapshot");
    publisher.publish(outbound.snapshot);
    emit(event_tx, SessionEvent::Sent(status));
}

fn report_status(
    machine: &AutosyncMachine,
    event_tx: &mpsc::Sender<SessionEvent>,
    status_tx: &watch::Sender<Status>,
) {
    let status = machine.status();
    status_tx.send_replace(status);
    emit(event_tx, SessionEvent::StatusChanged(status));
}

/// Never block the session on a slow listener
fn emit(event_tx: &mpsc::Sender<SessionEvent>, event: SessionEvent) {
    if let Err(e) = event_tx.try_send(event) {
        warn!("Dropped session event: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PartialPatientRecord;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<PartialPatientRecord>>,
    }

    impl Recorder {
        fn statuses(&self) -> Vec<Status> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|s| s.status.unwrap())
                .collect()
        }
    }

    impl Publish for Recorder {
        fn publish(&self, snapshot: PartialPatientRecord) {
            self.sent.lock().unwrap().push(snapshot);
        }
    }

    async fn sleep_ms(n: u64) {
        tokio::time::sleep(Duration::from_millis(n)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_debounce_then_inactivity() {
        let recorder = Arc::new(Recorder::default());
        let mut handle = spawn_session(AutosyncConfig::default(), recorder.clone());
        assert!(handle.session_id.starts_with("intake-"));

        for value in ["A", "An", "Ann"] {
            handle
                .command_tx
                .send(SessionCommand::change(Field::FirstName, value))
                .await
                .unwrap();
            sleep_ms(100).await;
        }
        assert!(recorder.statuses().is_empty());

        sleep_ms(500).await;
        assert_eq!(recorder.statuses(), vec![Status::Active]);
        assert_eq!(
            recorder.sent.lock().unwrap()[0].first_name.as_deref(),
            Some("Ann")
        );

        sleep_ms(5_000).await;
        assert_eq!(recorder.statuses(), vec![Status::Active, Status::Inactive]);
        assert_eq!(handle.status(), Status::Inactive);

        assert_eq!(handle.event_rx.recv().await, Some(SessionEvent::Sent(Status::Active)));
        assert_eq!(
            handle.event_rx.recv().await,
            Some(SessionEvent::Sent(Status::Inactive))
        );
        assert_eq!(
            handle.event_rx.recv().await,
            Some(SessionEvent::StatusChanged(Status::Inactive))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_submit_stops_pending_sends() {
        let recorder = Arc::new(Recorder::default());
        let handle = spawn_session(AutosyncConfig::default(), recorder.clone());

        for (field, value) in [
            (Field::FirstName, "Ann"),
            (Field::LastName, "Lee"),
            (Field::DateOfBirth, "1990-04-12"),
            (Field::PhoneNumber, "0812345678"),
            (Field::Email, "ann@example.com"),
            (Field::Address, "12 Sukhumvit Rd"),
            (Field::PreferredLanguage, "Thai"),
            (Field::Nationality, "Thailand"),
        ] {
            handle
                .command_tx
                .send(SessionCommand::change(field, value))
                .await
                .unwrap();
        }
        handle.command_tx.send(SessionCommand::Submit).await.unwrap();

        sleep_ms(10_000).await;
        assert_eq!(recorder.statuses(), vec![Status::Submitted]);
        assert_eq!(handle.status(), Status::Submitted);

        // Edits after submission are dropped
        handle
            .command_tx
            .send(SessionCommand::change(Field::FirstName, "Bob"))
            .await
            .unwrap();
        sleep_ms(10_000).await;
        assert_eq!(recorder.statuses(), vec![Status::Submitted]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_rejects_incomplete_submit() {
        let recorder = Arc::new(Recorder::default());
        let mut handle = spawn_session(AutosyncConfig::default(), recorder.clone());

        handle.command_tx.send(SessionCommand::Submit).await.unwrap();
        match handle.event_rx.recv().await {
            Some(SessionEvent::SubmitRejected(errors)) => {
                assert!(errors.iter().any(|e| e.field == Field::FirstName));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(recorder.statuses().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_shutdown_cancels_timers() {
        let recorder = Arc::new(Recorder::default());
        let handle = spawn_session(AutosyncConfig::default(), recorder.clone());

        handle
            .command_tx
            .send(SessionCommand::change(Field::FirstName, "Ann"))
            .await
            .unwrap();
        handle.command_tx.send(SessionCommand::Shutdown).await.unwrap();

        sleep_ms(10_000).await;
        assert!(recorder.statuses().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_tears_down() {
        let recorder = Arc::new(Recorder::default());
        let handle = spawn_session(AutosyncConfig::default(), recorder.clone());

        handle
            .command_tx
            .send(SessionCommand::change(Field::FirstName, "Ann"))
            .await
            .unwrap();
        drop(handle);

        sleep_ms(10_000).await;
        assert!(recorder.statuses().is_empty());
    }
}
