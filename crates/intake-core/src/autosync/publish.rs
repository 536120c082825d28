//! Publish capability
//!
//! The only thing the autosync machine needs from the transport. Implementors
//! must return immediately; delivery happens (or fails) in the background.

use std::sync::Arc;

use crate::models::PartialPatientRecord;

/// Hand a status-stamped snapshot to the relay, fire-and-forget
pub trait Publish: Send + Sync {
    fn publish(&self, snapshot: PartialPatientRecord);
}

impl<P: Publish + ?Sized> Publish for Arc<P> {
    fn publish(&self, snapshot: PartialPatientRecord) {
        (**self).publish(snapshot)
    }
}
