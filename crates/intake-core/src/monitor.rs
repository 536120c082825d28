//! Monitor view model
//!
//! Holds the latest patient snapshot received from the relay and turns it into
//! the badge and labelled sections the staff monitor renders. There is no
//! history: every `patient-update` replaces the previous snapshot wholesale.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{PartialPatientRecord, Status};
use crate::relay::{RelayEvent, PATIENT_UPDATE_EVENT};

/// Shown for fields the patient has not filled in
pub const NOT_PROVIDED: &str = "Not provided";

/// Badge colour, mapped onto the terminal palette by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeColor {
    Green,
    Yellow,
    Blue,
    Gray,
}

/// Status badge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub label: String,
    pub color: BadgeColor,
}

pub fn badge_for(status: Option<Status>) -> Badge {
    match status {
        Some(Status::Active) => Badge {
            label: "Active".into(),
            color: BadgeColor::Green,
        },
        Some(Status::Inactive) => Badge {
            label: "Inactive".into(),
            color: BadgeColor::Yellow,
        },
        Some(Status::Submitted) => Badge {
            label: "Submitted".into(),
            color: BadgeColor::Blue,
        },
        None => Badge {
            label: "Unknown".into(),
            color: BadgeColor::Gray,
        },
    }
}

/// One `label: value` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoRow {
    pub label: &'static str,
    pub value: Option<String>,
}

impl InfoRow {
    fn new(label: &'static str, value: Option<&str>) -> Self {
        Self {
            label,
            value: value.filter(|v| !v.is_empty()).map(str::to_string),
        }
    }

    pub fn display_value(&self) -> &str {
        self.value.as_deref().unwrap_or(NOT_PROVIDED)
    }

    pub fn is_provided(&self) -> bool {
        self.value.is_some()
    }
}

/// A titled group of rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoSection {
    pub title: &'static str,
    pub rows: Vec<InfoRow>,
}

/// Format a date of birth as `dd MMMM yyyy`
///
/// Accepts ISO dates and RFC 3339 timestamps. Anything else is shown as-is.
pub fn format_date_of_birth(value: Option<&str>) -> String {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return "-".to_string();
    };

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()));

    match date {
        Some(date) => date.format("%d %B %Y").to_string(),
        None => raw.to_string(),
    }
}

/// State behind the monitor view
#[derive(Debug, Clone, Default)]
pub struct MonitorState {
    connected: bool,
    snapshot: Option<PartialPatientRecord>,
    /// Status text of the last snapshot when it is not a known status
    raw_status: Option<String>,
    received: usize,
    last_received_at: Option<DateTime<Utc>>,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one relay event; returns true if the view changed
    pub fn apply(&mut self, event: &RelayEvent) -> bool {
        if event.is_subscription_succeeded() {
            let changed = !self.connected;
            self.connected = true;
            return changed;
        }
        if event.event != PATIENT_UPDATE_EVENT {
            debug!(event = %event.event, "Ignoring relay event");
            return false;
        }

        match snapshot_from_value(&event.data) {
            Some((snapshot, raw_status)) => {
                self.snapshot = Some(snapshot);
                self.raw_status = raw_status;
                self.received += 1;
                self.last_received_at = Some(Utc::now());
                true
            }
            None => {
                warn!("Ignoring malformed patient update");
                false
            }
        }
    }

    /// Track the subscription's connection state
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn snapshot(&self) -> Option<&PartialPatientRecord> {
        self.snapshot.as_ref()
    }

    /// Number of snapshots received so far
    pub fn received(&self) -> usize {
        self.received
    }

    pub fn last_received_at(&self) -> Option<DateTime<Utc>> {
        self.last_received_at
    }

    /// Badge for the last snapshot; an unrecognised status keeps its own text
    pub fn badge(&self) -> Badge {
        let status = self.snapshot.as_ref().and_then(|s| s.status);
        match (status, &self.raw_status) {
            (None, Some(raw)) => Badge {
                label: raw.clone(),
                color: BadgeColor::Gray,
            },
            _ => badge_for(status),
        }
    }

    /// Shown until the first snapshot arrives
    pub fn waiting_message(&self) -> String {
        let state = if self.connected {
            "(Connected)"
        } else {
            "(Connecting...)"
        };
        format!("Waiting for patient input... {}", state)
    }

    /// Sections for the current snapshot, empty before the first one
    pub fn sections(&self) -> Vec<InfoSection> {
        let Some(s) = &self.snapshot else {
            return Vec::new();
        };
        let dob = format_date_of_birth(s.date_of_birth.as_deref());

        vec![
            InfoSection {
                title: "Personal Information",
                rows: vec![
                    InfoRow::new("First Name", s.first_name.as_deref()),
                    InfoRow::new("Middle Name", s.middle_name.as_deref()),
                    InfoRow::new("Last Name", s.last_name.as_deref()),
                    InfoRow::new("Gender", s.gender.map(|g| g.as_str())),
                    InfoRow::new("Date of Birth", Some(dob.as_str())),
                ],
            },
            InfoSection {
                title: "Contact Details",
                rows: vec![
                    InfoRow::new("Phone", s.phone_number.as_deref()),
                    InfoRow::new("Email", s.email.as_deref()),
                    InfoRow::new("Address", s.address.as_deref()),
                ],
            },
            InfoSection {
                title: "Additional Info",
                rows: vec![
                    InfoRow::new("Nationality", s.nationality.as_deref()),
                    InfoRow::new("Language", s.preferred_language.as_deref()),
                    InfoRow::new("Religion", s.religion.as_deref()),
                ],
            },
            InfoSection {
                title: "Emergency Contact",
                rows: vec![
                    InfoRow::new("Name", s.emergency_contact_name.as_deref()),
                    InfoRow::new("Relationship", s.emergency_contact_relationship.as_deref()),
                ],
            },
        ]
    }
}

/// Decode a broadcast payload
///
/// An unrecognised status is dropped (rendered as "Unknown") rather than
/// rejecting the whole snapshot.
/// Decode a snapshot, setting aside a status the model does not know
fn snapshot_from_value(data: &Value) -> Option<(PartialPatientRecord, Option<String>)> {
    let mut object = data.as_object()?.clone();
    let raw = object.remove("status");
    let status = raw
        .clone()
        .and_then(|v| serde_json::from_value::<Status>(v).ok());
    let raw_status = match (status, raw) {
        (None, Some(Value::String(text))) if !text.is_empty() => Some(text),
        _ => None,
    };

    let mut snapshot: PartialPatientRecord =
        serde_json::from_value(Value::Object(object)).ok()?;
    snapshot.status = status;
    Some((snapshot, raw_status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::PATIENT_CHANNEL;
    use serde_json::json;

    fn update(data: Value) -> RelayEvent {
        RelayEvent::new(PATIENT_CHANNEL, PATIENT_UPDATE_EVENT, data)
    }

    #[test]
    fn test_badge_colors() {
        assert_eq!(badge_for(Some(Status::Active)).color, BadgeColor::Green);
        assert_eq!(badge_for(Some(Status::Inactive)).color, BadgeColor::Yellow);
        assert_eq!(badge_for(Some(Status::Submitted)).color, BadgeColor::Blue);
        assert_eq!(
            badge_for(None),
            Badge {
                label: "Unknown".into(),
                color: BadgeColor::Gray
            }
        );
    }

    #[test]
    fn test_waiting_until_first_snapshot() {
        let mut state = MonitorState::new();
        assert!(state.sections().is_empty());
        assert_eq!(
            state.waiting_message(),
            "Waiting for patient input... (Connecting...)"
        );

        assert!(state.apply(&RelayEvent::subscription_succeeded(PATIENT_CHANNEL)));
        assert!(state.is_connected());
        assert_eq!(
            state.waiting_message(),
            "Waiting for patient input... (Connected)"
        );
        assert!(state.snapshot().is_none());
    }

    #[test]
    fn test_each_snapshot_replaces_the_last() {
        let mut state = MonitorState::new();

        assert!(state.apply(&update(json!({
            "firstName": "Ann",
            "email": "ann@example.com",
            "status": "active"
        }))));
        assert_eq!(state.badge().color, BadgeColor::Green);

        assert!(state.apply(&update(json!({
            "firstName": "Ann",
            "status": "inactive"
        }))));
        assert_eq!(state.badge().color, BadgeColor::Yellow);
        assert_eq!(state.received(), 2);
        assert!(state.last_received_at().is_some());

        // Email is gone: no merging with the previous snapshot
        let contact = &state.sections()[1];
        assert_eq!(contact.rows[1].label, "Email");
        assert_eq!(contact.rows[1].display_value(), NOT_PROVIDED);
        assert!(!contact.rows[1].is_provided());
    }

    #[test]
    fn test_sections_layout() {
        let mut state = MonitorState::new();
        state.apply(&update(json!({
            "firstName": "Ann",
            "lastName": "Lee",
            "gender": "female",
            "dateOfBirth": "1990-04-02",
            "nationality": "Thailand",
            "preferredLanguage": "Thai",
            "emergencyContactName": "Bo"
        })));

        let sections = state.sections();
        let titles: Vec<_> = sections.iter().map(|s| s.title).collect();
        assert_eq!(
            titles,
            vec![
                "Personal Information",
                "Contact Details",
                "Additional Info",
                "Emergency Contact"
            ]
        );

        let personal = &sections[0];
        assert_eq!(personal.rows[1].display_value(), NOT_PROVIDED);
        assert_eq!(personal.rows[3].display_value(), "female");
        assert_eq!(personal.rows[4].display_value(), "02 April 1990");

        assert_eq!(sections[2].rows[1].display_value(), "Thai");
        assert_eq!(sections[3].rows[0].display_value(), "Bo");
        assert_eq!(sections[3].rows[1].display_value(), NOT_PROVIDED);
        assert_eq!(state.badge().label, "Unknown");
    }

    #[test]
    fn test_unknown_status_is_gray() {
        let mut state = MonitorState::new();
        assert!(state.apply(&update(json!({"firstName": "Ann", "status": "archived"}))));
        assert_eq!(state.badge().color, BadgeColor::Gray);
        assert_eq!(state.badge().label, "archived");
        assert_eq!(state.snapshot().unwrap().first_name.as_deref(), Some("Ann"));

        // the next known status replaces the raw label
        assert!(state.apply(&update(json!({"firstName": "Ann", "status": "active"}))));
        assert_eq!(state.badge().label, "Active");

        assert!(state.apply(&update(json!({"firstName": "Ann", "status": ""}))));
        assert_eq!(state.badge().label, "Unknown");
    }

    #[test]
    fn test_ignores_other_events_and_bad_payloads() {
        let mut state = MonitorState::new();
        assert!(!state.apply(&RelayEvent::new(PATIENT_CHANNEL, "other", json!({}))));
        assert!(!state.apply(&update(json!("not an object"))));
        assert!(state.snapshot().is_none());
    }

    #[test]
    fn test_format_date_of_birth() {
        assert_eq!(format_date_of_birth(None), "-");
        assert_eq!(format_date_of_birth(Some("")), "-");
        assert_eq!(format_date_of_birth(Some("2001-12-25")), "25 December 2001");
        assert_eq!(
            format_date_of_birth(Some("2001-12-25T08:00:00Z")),
            "25 December 2001"
        );
        assert_eq!(format_date_of_birth(Some("someday")), "someday");
    }
}
