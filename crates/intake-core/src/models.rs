//! Data models for intake
//!
//! Defines the patient record in the two shapes it travels in:
//! - `PatientRecord`: the complete record required at final submission
//! - `PartialPatientRecord`: a snapshot of an in-progress form, any field may be absent
//!
//! Both serialize as camelCase JSON objects, which is the wire format shared by
//! the form, the sync endpoint and the monitor.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::schema::FieldError;

/// Religion options offered by the intake form
pub const RELIGIONS: [&str; 7] = [
    "Buddhism",
    "Christianity",
    "Islam",
    "Hinduism",
    "Sikhism",
    "Other",
    "No Religion",
];

/// Preferred language options offered by the intake form
pub const LANGUAGES: [&str; 4] = ["Thai", "English", "Chinese", "Japanese"];

/// Patient gender as offered by the intake form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// All options, in form display order
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gender::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or(FieldError::new(Field::Gender, "Please select a gender"))
    }
}

/// Liveness of an in-progress record
///
/// Derived from interaction timing, never entered by the patient.
/// Moves only along `Active -> Inactive -> Submitted`; an edit while
/// inactive returns to `Active`, and `Submitted` is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Active,
    Inactive,
    Submitted,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Inactive => "inactive",
            Status::Submitted => "submitted",
        }
    }

    /// Whether no further transitions are accepted
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Submitted)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An editable form field
///
/// `status` is deliberately absent: it is stamped by the autosync machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    FirstName,
    MiddleName,
    LastName,
    DateOfBirth,
    Gender,
    PhoneNumber,
    Email,
    Address,
    PreferredLanguage,
    Nationality,
    Religion,
    EmergencyContactName,
    EmergencyContactRelationship,
}

impl Field {
    /// All fields, in form order
    pub const ALL: [Field; 13] = [
        Field::FirstName,
        Field::MiddleName,
        Field::LastName,
        Field::DateOfBirth,
        Field::Gender,
        Field::PhoneNumber,
        Field::Email,
        Field::Address,
        Field::PreferredLanguage,
        Field::Nationality,
        Field::Religion,
        Field::EmergencyContactName,
        Field::EmergencyContactRelationship,
    ];

    /// JSON key on the wire
    pub fn key(&self) -> &'static str {
        match self {
            Field::FirstName => "firstName",
            Field::MiddleName => "middleName",
            Field::LastName => "lastName",
            Field::DateOfBirth => "dateOfBirth",
            Field::Gender => "gender",
            Field::PhoneNumber => "phoneNumber",
            Field::Email => "email",
            Field::Address => "address",
            Field::PreferredLanguage => "preferredLanguage",
            Field::Nationality => "nationality",
            Field::Religion => "religion",
            Field::EmergencyContactName => "emergencyContactName",
            Field::EmergencyContactRelationship => "emergencyContactRelationship",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Field::FirstName => "First Name",
            Field::MiddleName => "Middle Name",
            Field::LastName => "Last Name",
            Field::DateOfBirth => "Date of Birth",
            Field::Gender => "Gender",
            Field::PhoneNumber => "Phone Number",
            Field::Email => "Email",
            Field::Address => "Address",
            Field::PreferredLanguage => "Preferred Language",
            Field::Nationality => "Nationality",
            Field::Religion => "Religion",
            Field::EmergencyContactName => "Emergency Contact Name",
            Field::EmergencyContactRelationship => "Emergency Contact Relationship",
        }
    }

    /// Whether the field must be present at final submission
    pub fn is_required(&self) -> bool {
        !matches!(
            self,
            Field::MiddleName
                | Field::Religion
                | Field::EmergencyContactName
                | Field::EmergencyContactRelationship
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A possibly incomplete patient record
///
/// This is what the form broadcasts while it is being filled in, and what the
/// sync endpoint accepts. Absent fields are omitted from the JSON output and
/// unknown keys are dropped on input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialPatientRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub religion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact_relationship: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl PartialPatientRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// The form's starting state: gender preselected as `other`
    pub fn form_defaults() -> Self {
        Self {
            gender: Some(Gender::Other),
            status: Some(Status::Active),
            ..Self::default()
        }
    }

    /// Read a field as text
    pub fn get(&self, field: Field) -> Option<String> {
        match field {
            Field::Gender => self.gender.map(|g| g.as_str().to_string()),
            _ => self.text_slot(field).and_then(Clone::clone),
        }
    }

    /// Set a field from form input
    ///
    /// An empty value clears the field. Gender must be one of the enum values.
    pub fn set(&mut self, field: Field, value: &str) -> Result<(), FieldError> {
        let value = value.trim();
        if field == Field::Gender {
            self.gender = if value.is_empty() {
                None
            } else {
                Some(value.parse()?)
            };
            return Ok(());
        }

        if let Some(slot) = self.text_slot_mut(field) {
            *slot = if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            };
        }
        Ok(())
    }

    /// Copy of this snapshot stamped with `status`
    pub fn with_status(&self, status: Status) -> Self {
        Self {
            status: Some(status),
            ..self.clone()
        }
    }

    /// Whether no field (including status) is present
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Number of form fields that have a value
    pub fn filled_count(&self) -> usize {
        Field::ALL.iter().filter(|f| self.get(**f).is_some()).count()
    }

    fn text_slot(&self, field: Field) -> Option<&Option<String>> {
        let slot = match field {
            Field::FirstName => &self.first_name,
            Field::MiddleName => &self.middle_name,
            Field::LastName => &self.last_name,
            Field::DateOfBirth => &self.date_of_birth,
            Field::PhoneNumber => &self.phone_number,
            Field::Email => &self.email,
            Field::Address => &self.address,
            Field::PreferredLanguage => &self.preferred_language,
            Field::Nationality => &self.nationality,
            Field::Religion => &self.religion,
            Field::EmergencyContactName => &self.emergency_contact_name,
            Field::EmergencyContactRelationship => &self.emergency_contact_relationship,
            Field::Gender => return None,
        };
        Some(slot)
    }

    fn text_slot_mut(&mut self, field: Field) -> Option<&mut Option<String>> {
        let slot = match field {
            Field::FirstName => &mut self.first_name,
            Field::MiddleName => &mut self.middle_name,
            Field::LastName => &mut self.last_name,
            Field::DateOfBirth => &mut self.date_of_birth,
            Field::PhoneNumber => &mut self.phone_number,
            Field::Email => &mut self.email,
            Field::Address => &mut self.address,
            Field::PreferredLanguage => &mut self.preferred_language,
            Field::Nationality => &mut self.nationality,
            Field::Religion => &mut self.religion,
            Field::EmergencyContactName => &mut self.emergency_contact_name,
            Field::EmergencyContactRelationship => &mut self.emergency_contact_relationship,
            Field::Gender => return None,
        };
        Some(slot)
    }
}

/// A complete patient record, as required at final submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: String,
    pub gender: Gender,
    pub phone_number: String,
    pub email: String,
    pub address: String,
    pub preferred_language: String,
    pub nationality: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub religion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact_relationship: Option<String>,
    #[serde(default)]
    pub status: Status,
}

impl From<PatientRecord> for PartialPatientRecord {
    fn from(record: PatientRecord) -> Self {
        Self {
            first_name: Some(record.first_name),
            middle_name: record.middle_name,
            last_name: Some(record.last_name),
            date_of_birth: Some(record.date_of_birth),
            gender: Some(record.gender),
            phone_number: Some(record.phone_number),
            email: Some(record.email),
            address: Some(record.address),
            preferred_language: Some(record.preferred_language),
            nationality: Some(record.nationality),
            religion: record.religion,
            emergency_contact_name: record.emergency_contact_name,
            emergency_contact_relationship: record.emergency_contact_relationship,
            status: Some(record.status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_serializes_only_present_fields() {
        let mut record = PartialPatientRecord::new();
        record.set(Field::FirstName, "Ann").unwrap();

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({"firstName": "Ann"}));
    }

    #[test]
    fn test_partial_drops_unknown_keys() {
        let record: PartialPatientRecord =
            serde_json::from_str(r#"{"firstName":"Ann","favouriteColour":"red"}"#).unwrap();
        assert_eq!(record.first_name.as_deref(), Some("Ann"));
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"firstName":"Ann"}"#
        );
    }

    #[test]
    fn test_set_empty_clears_field() {
        let mut record = PartialPatientRecord::new();
        record.set(Field::Email, "ann@example.com").unwrap();
        record.set(Field::Email, "   ").unwrap();
        assert!(record.email.is_none());
    }

    #[test]
    fn test_set_gender_rejects_unknown_value() {
        let mut record = PartialPatientRecord::form_defaults();
        let err = record.set(Field::Gender, "robot").unwrap_err();
        assert_eq!(err.field, Field::Gender);
        // Untouched on failure
        assert_eq!(record.gender, Some(Gender::Other));
    }

    #[test]
    fn test_get_round_trips_every_field() {
        let mut record = PartialPatientRecord::new();
        for field in Field::ALL {
            let value = if field == Field::Gender { "female" } else { "value" };
            record.set(field, value).unwrap();
            assert_eq!(record.get(field).as_deref(), Some(value));
        }
        assert_eq!(record.filled_count(), Field::ALL.len());
    }

    #[test]
    fn test_with_status_keeps_fields() {
        let mut record = PartialPatientRecord::new();
        record.set(Field::LastName, "Smith").unwrap();

        let stamped = record.with_status(Status::Inactive);
        assert_eq!(stamped.status, Some(Status::Inactive));
        assert_eq!(stamped.last_name.as_deref(), Some("Smith"));
        assert!(record.status.is_none());
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&Status::Submitted).unwrap(),
            "\"submitted\""
        );
        let status: Status = serde_json::from_str("\"inactive\"").unwrap();
        assert_eq!(status, Status::Inactive);
        assert!(Status::Submitted.is_terminal());
        assert!(!Status::Inactive.is_terminal());
    }

    #[test]
    fn test_required_fields() {
        let optional: Vec<_> = Field::ALL.iter().filter(|f| !f.is_required()).collect();
        assert_eq!(
            optional,
            vec![
                &Field::MiddleName,
                &Field::Religion,
                &Field::EmergencyContactName,
                &Field::EmergencyContactRelationship
            ]
        );
    }
}
