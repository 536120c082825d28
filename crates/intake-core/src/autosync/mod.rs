//! Debounced, status-aware autosync
//!
//! Turns field edits into a throttled stream of status-stamped snapshots.
//!
//! ## Timers
//!
//! Two independent timers, both re-armed by every edit:
//! 1. Debounce (default 500ms): sends the current snapshot tagged `active`
//! 2. Inactivity (default 5s): moves to `inactive` and sends the snapshot tagged `inactive`
//!
//! Submission cancels both and sends the full record tagged `submitted`.
//! Nothing is sent after that.
//!
//! ## Usage
//!
//! ```ignore
//! let handle = spawn_session(AutosyncConfig::default(), SyncClient::new(url));
//! handle.command_tx.send(SessionCommand::change(Field::FirstName, "Ann")).await?;
//! ```

mod machine;
mod publish;
mod session;
mod timer;

pub use machine::{AutosyncConfig, AutosyncError, AutosyncMachine, Outbound, Trigger};
pub use publish::Publish;
pub use session::{spawn_session, AutosyncHandle, SessionCommand, SessionEvent};
pub use timer::Timer;
