//! Validation schema for patient records
//!
//! One set of field constraints, applied in two modes:
//! - relaxed: every field is optional, but a field that is present must satisfy
//!   its constraint (used for in-flight snapshots and by the sync endpoint)
//! - strict: required fields must be present as well (used at final submission)

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{Field, Gender, PartialPatientRecord, PatientRecord};

/// Minimum digits in a phone number
pub const MIN_PHONE_LEN: usize = 10;

/// Minimum characters in an address
pub const MIN_ADDRESS_LEN: usize = 5;

/// JSON key of the status stamp
const STATUS_KEY: &str = "status";

/// `local@label.label.tld`, case-insensitive; leading dots and `..` are
/// rejected separately since the regex crate has no lookahead
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z0-9_'+\-.]*[a-z0-9_+\-]@([a-z0-9][a-z0-9\-]*\.)+[a-z]{2,}$")
        .expect("email pattern compiles")
});

/// A single field that failed validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: Field,
    pub message: &'static str,
}

impl FieldError {
    pub fn new(field: Field, message: &'static str) -> Self {
        Self { field, message }
    }
}

/// Errors produced while parsing or validating a record
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Input was not syntactically valid JSON
    #[error("Malformed JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    /// JSON was valid but not an object
    #[error("Expected a JSON object")]
    NotAnObject,

    /// A known key was sent as `null` (omit the key to leave a field unset)
    #[error("{0} must not be null")]
    NullField(String),

    /// A field had the wrong type or an unknown enum value
    #[error("Invalid field data: {0}")]
    Decode(#[source] serde_json::Error),

    /// One or more fields broke a constraint
    #[error("{} field(s) failed validation", .0.len())]
    Invalid(Vec<FieldError>),
}

impl SchemaError {
    /// Whether the input could not be read as JSON at all
    ///
    /// Everything else is a data-format problem with a well-formed body.
    pub fn is_malformed(&self) -> bool {
        matches!(self, SchemaError::Malformed(_))
    }

    /// Per-field errors, empty unless this is a constraint failure
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            SchemaError::Invalid(errors) => errors,
            _ => &[],
        }
    }
}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Check one present value against its field constraint
pub fn check_field(field: Field, value: &str) -> Result<(), FieldError> {
    let ok = match field {
        Field::FirstName
        | Field::LastName
        | Field::DateOfBirth
        | Field::PreferredLanguage
        | Field::Nationality => !value.is_empty(),
        Field::Gender => value.parse::<Gender>().is_ok(),
        Field::PhoneNumber => value.chars().count() >= MIN_PHONE_LEN,
        Field::Email => is_valid_email(value),
        Field::Address => value.chars().count() >= MIN_ADDRESS_LEN,
        Field::MiddleName
        | Field::Religion
        | Field::EmergencyContactName
        | Field::EmergencyContactRelationship => true,
    };

    if ok {
        Ok(())
    } else {
        Err(FieldError::new(field, constraint_message(field)))
    }
}

/// Message shown when `field` fails its constraint or is missing
pub fn constraint_message(field: Field) -> &'static str {
    match field {
        Field::FirstName => "First name is required",
        Field::LastName => "Last name is required",
        Field::DateOfBirth => "Date of birth is required",
        Field::Gender => "Please select a gender",
        Field::PhoneNumber => "Invalid phone number",
        Field::Email => "Invalid email address",
        Field::Address => "Address is too short",
        Field::PreferredLanguage => "Language is required",
        Field::Nationality => "Nationality is required",
        Field::MiddleName
        | Field::Religion
        | Field::EmergencyContactName
        | Field::EmergencyContactRelationship => "Invalid value",
    }
}

/// Validate a snapshot in relaxed mode
pub fn validate_partial(record: &PartialPatientRecord) -> SchemaResult<()> {
    let errors: Vec<FieldError> = Field::ALL
        .into_iter()
        .filter_map(|field| {
            record
                .get(field)
                .and_then(|value| check_field(field, &value).err())
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::Invalid(errors))
    }
}

/// Validate a snapshot in strict mode and build the complete record
///
/// Status carries over from the snapshot, defaulting to active.
pub fn validate_complete(record: &PartialPatientRecord) -> SchemaResult<PatientRecord> {
    let mut errors = Vec::new();
    for field in Field::ALL {
        match record.get(field) {
            Some(value) => {
                if let Err(e) = check_field(field, &value) {
                    errors.push(e);
                }
            }
            None if field.is_required() => {
                errors.push(FieldError::new(field, constraint_message(field)));
            }
            None => {}
        }
    }

    if !errors.is_empty() {
        return Err(SchemaError::Invalid(errors));
    }

    let required = |value: &Option<String>| value.clone().unwrap_or_default();
    Ok(PatientRecord {
        first_name: required(&record.first_name),
        middle_name: record.middle_name.clone(),
        last_name: required(&record.last_name),
        date_of_birth: required(&record.date_of_birth),
        gender: record.gender.unwrap_or(Gender::Other),
        phone_number: required(&record.phone_number),
        email: required(&record.email),
        address: required(&record.address),
        preferred_language: required(&record.preferred_language),
        nationality: required(&record.nationality),
        religion: record.religion.clone(),
        emergency_contact_name: record.emergency_contact_name.clone(),
        emergency_contact_relationship: record.emergency_contact_relationship.clone(),
        status: record.status.unwrap_or_default(),
    })
}

/// Parse and validate a JSON body in relaxed mode
///
/// The returned record is the validated form of the input: unknown keys
/// are gone, everything else is preserved as sent.
pub fn parse_partial(bytes: &[u8]) -> SchemaResult<PartialPatientRecord> {
    let value: Value = serde_json::from_slice(bytes).map_err(SchemaError::Malformed)?;
    partial_from_value(value)
}

/// Validate an already-parsed JSON value in relaxed mode
pub fn partial_from_value(value: Value) -> SchemaResult<PartialPatientRecord> {
    let Value::Object(object) = &value else {
        return Err(SchemaError::NotAnObject);
    };
    if let Some(key) = null_key(object) {
        return Err(SchemaError::NullField(key.to_string()));
    }

    let record: PartialPatientRecord =
        serde_json::from_value(value).map_err(SchemaError::Decode)?;
    validate_partial(&record)?;
    Ok(record)
}

/// First record key whose value is `null`; unknown keys are ignored
fn null_key(object: &Map<String, Value>) -> Option<&str> {
    object
        .iter()
        .filter(|(_, value)| value.is_null())
        .map(|(key, _)| key.as_str())
        .find(|key| *key == STATUS_KEY || Field::ALL.iter().any(|f| f.key() == *key))
}

fn is_valid_email(value: &str) -> bool {
    !value.starts_with('.') && !value.contains("..") && EMAIL_PATTERN.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;

    fn complete_snapshot() -> PartialPatientRecord {
        let mut record = PartialPatientRecord::form_defaults();
        record.set(Field::FirstName, "Ann").unwrap();
        record.set(Field::LastName, "Lee").unwrap();
        record.set(Field::DateOfBirth, "1990-04-12").unwrap();
        record.set(Field::Gender, "female").unwrap();
        record.set(Field::PhoneNumber, "0812345678").unwrap();
        record.set(Field::Email, "ann@example.com").unwrap();
        record.set(Field::Address, "12 Sukhumvit Rd").unwrap();
        record.set(Field::PreferredLanguage, "Thai").unwrap();
        record.set(Field::Nationality, "Thailand").unwrap();
        record
    }

    #[test]
    fn test_email_check() {
        assert!(is_valid_email("john@example.com"));
        assert!(is_valid_email("a.b+c@mail.example.co.th"));
        assert!(!is_valid_email("john"));
        assert!(!is_valid_email("john@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("john@example"));
        assert!(!is_valid_email("john@example."));
        assert!(!is_valid_email("jo hn@example.com"));
        assert!(!is_valid_email("a@b@example.com"));
    }

    #[test]
    fn test_email_check_rejects_loose_shapes() {
        assert!(is_valid_email("o'brien@example.com"));
        assert!(is_valid_email("ANN@Example.COM"));
        // single-letter tld
        assert!(!is_valid_email("a@b.c"));
        assert!(!is_valid_email("a..b@example.com"));
        assert!(!is_valid_email(".ann@example.com"));
        assert!(!is_valid_email("ann.@example.com"));
        assert!(!is_valid_email("ann@-x.com"));
        assert!(!is_valid_email("ann@example..com"));
        assert!(!is_valid_email("ann@example.c0m"));
    }

    #[test]
    fn test_parse_partial_rejects_null_fields() {
        for body in [
            br#"{"firstName":null}"#.as_slice(),
            br#"{"gender":null}"#.as_slice(),
            br#"{"status":null}"#.as_slice(),
        ] {
            let err = parse_partial(body).unwrap_err();
            assert!(matches!(err, SchemaError::NullField(_)));
            assert!(!err.is_malformed());
        }
    }

    #[test]
    fn test_parse_partial_ignores_unknown_null_key() {
        let record = parse_partial(br#"{"firstName":"Ann","nickname":null}"#).unwrap();
        assert_eq!(record.first_name.as_deref(), Some("Ann"));
    }

    #[test]
    fn test_partial_accepts_sparse_record() {
        let mut record = PartialPatientRecord::new();
        record.set(Field::FirstName, "Ann").unwrap();
        assert!(validate_partial(&record).is_ok());
        assert!(validate_partial(&PartialPatientRecord::new()).is_ok());
    }

    #[test]
    fn test_partial_checks_present_fields() {
        let mut record = PartialPatientRecord::new();
        record.set(Field::PhoneNumber, "08123").unwrap();
        record.set(Field::Email, "ann@").unwrap();

        let err = validate_partial(&record).unwrap_err();
        let fields: Vec<Field> = err.field_errors().iter().map(|e| e.field).collect();
        assert_eq!(fields, vec![Field::PhoneNumber, Field::Email]);
        assert_eq!(err.field_errors()[0].message, "Invalid phone number");
    }

    #[test]
    fn test_complete_reports_missing_required_fields() {
        let mut record = PartialPatientRecord::form_defaults();
        record.set(Field::FirstName, "Ann").unwrap();

        let err = validate_complete(&record).unwrap_err();
        let fields: Vec<Field> = err.field_errors().iter().map(|e| e.field).collect();
        assert!(fields.contains(&Field::LastName));
        assert!(fields.contains(&Field::Nationality));
        assert!(!fields.contains(&Field::FirstName));
        assert!(!fields.contains(&Field::Religion));
    }

    #[test]
    fn test_complete_builds_record() {
        let record = validate_complete(&complete_snapshot()).unwrap();
        assert_eq!(record.first_name, "Ann");
        assert_eq!(record.gender, Gender::Female);
        assert_eq!(record.status, Status::Active);
        assert!(record.religion.is_none());
    }

    #[test]
    fn test_complete_status_defaults_to_active() {
        let mut snapshot = complete_snapshot();
        snapshot.status = None;
        assert_eq!(validate_complete(&snapshot).unwrap().status, Status::Active);
    }

    #[test]
    fn test_parse_partial_rejects_bad_gender() {
        let err = parse_partial(br#"{"firstName":"Ann","gender":"robot"}"#).unwrap_err();
        assert!(matches!(err, SchemaError::Decode(_)));
        assert!(!err.is_malformed());
    }

    #[test]
    fn test_parse_partial_rejects_wrong_type() {
        let err = parse_partial(br#"{"firstName":42}"#).unwrap_err();
        assert!(matches!(err, SchemaError::Decode(_)));
    }

    #[test]
    fn test_parse_partial_rejects_non_object() {
        assert!(matches!(
            parse_partial(b"[\"Ann\"]").unwrap_err(),
            SchemaError::NotAnObject
        ));
        assert!(matches!(
            parse_partial(b"\"Ann\"").unwrap_err(),
            SchemaError::NotAnObject
        ));
    }

    #[test]
    fn test_parse_partial_flags_malformed_json() {
        let err = parse_partial(b"{firstName:").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_parse_partial_rejects_empty_required_string() {
        let err = parse_partial(br#"{"firstName":""}"#).unwrap_err();
        assert_eq!(err.field_errors()[0].field, Field::FirstName);
    }

    #[test]
    fn test_parse_partial_keeps_status() {
        let record = parse_partial(br#"{"lastName":"Lee","status":"inactive"}"#).unwrap();
        assert_eq!(record.status, Some(Status::Inactive));
    }
}
