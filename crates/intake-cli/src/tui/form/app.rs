//! Form state and logic
//!
//! `FormApp` mirrors what the patient has typed and turns key input into
//! `SessionCommand`s. The autosync session owns the authoritative snapshot;
//! every edit here is forwarded to it as it happens.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use intake_core::models::{LANGUAGES, RELIGIONS};
use intake_core::schema::{check_field, constraint_message};
use intake_core::{Field, FieldError, Gender, PartialPatientRecord, SessionCommand, SessionEvent, Status};

/// Maximum digits kept in the phone field
pub const PHONE_DIGITS: usize = 10;

/// Length of an ISO `YYYY-MM-DD` date
const DATE_LEN: usize = 10;

/// Shown once the submitted record has reached the server
pub const SUBMITTED_MESSAGE: &str =
    "Registration successful! Your information has been sent to the staff.";

/// Shown while the submitted record is on its way
pub const SENDING_MESSAGE: &str = "Sending your registration...";

/// How a field is edited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text
    Text,
    /// Digits only, at most `PHONE_DIGITS`
    Phone,
    /// `YYYY-MM-DD`
    Date,
    /// One of a fixed list of options
    Choice,
}

impl FieldKind {
    pub fn of(field: Field) -> Self {
        match field {
            Field::Gender | Field::PreferredLanguage | Field::Nationality | Field::Religion => {
                FieldKind::Choice
            }
            Field::PhoneNumber => FieldKind::Phone,
            Field::DateOfBirth => FieldKind::Date,
            _ => FieldKind::Text,
        }
    }

    /// Whether `c` may be typed into a field of this kind
    fn accepts(&self, c: char, current_len: usize) -> bool {
        match self {
            FieldKind::Text | FieldKind::Choice => !c.is_control(),
            FieldKind::Phone => c.is_ascii_digit() && current_len < PHONE_DIGITS,
            FieldKind::Date => (c.is_ascii_digit() || c == '-') && current_len < DATE_LEN,
        }
    }
}

/// Hint shown in an empty field
pub fn placeholder(field: Field) -> &'static str {
    match field {
        Field::DateOfBirth => "YYYY-MM-DD",
        Field::PhoneNumber => "0800000000",
        Field::Email => "john@example.com",
        Field::Address => "123 Street...",
        Field::PreferredLanguage => "Select preferred language",
        Field::Nationality => "Select nationality",
        Field::Religion => "Select religion",
        Field::Gender => "Select gender",
        Field::EmergencyContactName => "Full Name",
        _ => "",
    }
}

/// Input mode for the form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Moving between fields
    Normal,
    /// Typing into the selected field
    Editing,
    /// Choosing from the selected field's options
    Picking,
}

/// Form application state
pub struct FormApp {
    /// Whether the app should exit
    pub should_quit: bool,
    /// Current input mode
    pub input_mode: InputMode,
    /// Index into `Field::ALL`
    pub field_index: usize,
    /// Local mirror of the session snapshot
    pub values: PartialPatientRecord,
    /// Edit buffer for the selected field
    pub input: String,
    /// Cursor position in `input`, in characters
    pub cursor: usize,
    /// Type-to-search text in the option picker
    pub picker_filter: String,
    /// Selected row in the filtered option list
    pub picker_index: usize,
    /// Current validation message per field
    pub errors: HashMap<Field, &'static str>,
    /// Whether a submission has been attempted (enables live re-validation)
    pub submit_attempted: bool,
    /// Status reported by the session
    pub status: Status,
    /// Number of snapshots handed to the sync client
    pub sent_count: usize,
    /// Status stamped on the most recent snapshot
    pub last_sent: Option<Status>,
    /// Whether the submitted record has finished sending
    pub delivered: bool,
    /// Nationality options, `None` while loading
    pub countries: Option<Vec<String>>,
    /// Status message to display temporarily
    pub status_message: Option<String>,
    /// When the status message was set (for auto-dismiss)
    pub status_message_time: Option<Instant>,
    /// Whether help overlay is visible
    pub show_help: bool,
}

impl Default for FormApp {
    fn default() -> Self {
        Self::new()
    }
}

impl FormApp {
    pub fn new() -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            field_index: 0,
            values: PartialPatientRecord::form_defaults(),
            input: String::new(),
            cursor: 0,
            picker_filter: String::new(),
            picker_index: 0,
            errors: HashMap::new(),
            submit_attempted: false,
            status: Status::Active,
            sent_count: 0,
            last_sent: None,
            delivered: false,
            countries: None,
            status_message: None,
            status_message_time: None,
            show_help: false,
        }
    }

    /// The selected field
    pub fn current_field(&self) -> Field {
        Field::ALL[self.field_index]
    }

    pub fn is_submitted(&self) -> bool {
        self.status.is_terminal()
    }

    /// Submitted, but the final send has not completed yet
    pub fn awaiting_delivery(&self) -> bool {
        self.is_submitted() && !self.delivered
    }

    /// The final send completed
    pub fn confirm_delivered(&mut self) {
        if self.awaiting_delivery() {
            self.delivered = true;
            self.set_status(SUBMITTED_MESSAGE);
        }
    }

    /// Set a status message that auto-dismisses
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_message_time = Some(Instant::now());
    }

    /// Check and clear expired status message
    pub fn check_status_timeout(&mut self) {
        if let Some(time) = self.status_message_time {
            if time.elapsed() > Duration::from_secs(3) {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn move_up(&mut self) {
        self.field_index = self.field_index.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.field_index + 1 < Field::ALL.len() {
            self.field_index += 1;
        }
    }

    /// Nationality list arrived
    pub fn set_countries(&mut self, countries: Vec<String>) {
        self.countries = Some(countries);
    }

    /// Options for a choice field
    pub fn options(&self, field: Field) -> Vec<String> {
        match field {
            Field::Gender => Gender::ALL.iter().map(|g| g.as_str().to_string()).collect(),
            Field::PreferredLanguage => LANGUAGES.iter().map(|s| s.to_string()).collect(),
            Field::Religion => RELIGIONS.iter().map(|s| s.to_string()).collect(),
            Field::Nationality => self.countries.clone().unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Options for the selected field matching the picker filter
    pub fn filtered_options(&self) -> Vec<String> {
        let needle = self.picker_filter.to_lowercase();
        self.options(self.current_field())
            .into_iter()
            .filter(|option| option.to_lowercase().contains(&needle))
            .collect()
    }

    /// Start editing the selected field
    pub fn begin_edit(&mut self) {
        if self.is_submitted() {
            self.set_status("Registration already submitted");
            return;
        }

        let field = self.current_field();
        let current = self.values.get(field).unwrap_or_default();

        if FieldKind::of(field) == FieldKind::Choice {
            if field == Field::Nationality && self.countries.is_none() {
                self.set_status("Loading countries...");
                return;
            }
            self.picker_filter.clear();
            self.picker_index = self
                .options(field)
                .iter()
                .position(|option| *option == current)
                .unwrap_or(0);
            self.input_mode = InputMode::Picking;
        } else {
            self.cursor = current.chars().count();
            self.input = current;
            self.input_mode = InputMode::Editing;
        }
    }

    /// Leave editing or picking
    pub fn finish_edit(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input.clear();
        self.cursor = 0;
        self.picker_filter.clear();
    }

    /// Type a character into the edit buffer
    ///
    /// Returns the change to forward, or `None` if the key was refused.
    pub fn insert_char(&mut self, c: char) -> Option<SessionCommand> {
        let kind = FieldKind::of(self.current_field());
        if !kind.accepts(c, self.input.chars().count()) {
            return None;
        }
        let at = self.byte_index();
        self.input.insert(at, c);
        self.cursor += 1;
        Some(self.commit_input())
    }

    /// Delete the character before the cursor
    pub fn delete_char(&mut self) -> Option<SessionCommand> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        let at = self.byte_index();
        self.input.remove(at);
        Some(self.commit_input())
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        if self.cursor < self.input.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn picker_up(&mut self) {
        self.picker_index = self.picker_index.saturating_sub(1);
    }

    pub fn picker_down(&mut self) {
        if self.picker_index + 1 < self.filtered_options().len() {
            self.picker_index += 1;
        }
    }

    pub fn picker_insert(&mut self, c: char) {
        if !c.is_control() {
            self.picker_filter.push(c);
            self.picker_index = 0;
        }
    }

    pub fn picker_backspace(&mut self) {
        self.picker_filter.pop();
        self.picker_index = 0;
    }

    /// Choose the highlighted option
    pub fn pick(&mut self) -> Option<SessionCommand> {
        let choice = self.filtered_options().into_iter().nth(self.picker_index)?;
        let field = self.current_field();
        self.finish_edit();
        Some(self.apply(field, choice))
    }

    /// Clear the selected field
    pub fn clear_field(&mut self) -> Option<SessionCommand> {
        if self.is_submitted() {
            return None;
        }
        let field = self.current_field();
        self.values.get(field)?;
        Some(self.apply(field, String::new()))
    }

    /// Request final submission
    pub fn submit(&mut self) -> Option<SessionCommand> {
        if self.is_submitted() {
            self.set_status("Registration already submitted");
            return None;
        }
        Some(SessionCommand::Submit)
    }

    /// React to an event from the autosync session
    pub fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::StatusChanged(status) => {
                self.status = status;
            }
            SessionEvent::Sent(status) => {
                self.sent_count += 1;
                self.last_sent = Some(status);
                if status == Status::Submitted {
                    self.status = Status::Submitted;
                    self.errors.clear();
                    self.set_status(SENDING_MESSAGE);
                }
            }
            SessionEvent::ChangeRejected(error) => {
                self.errors.insert(error.field, error.message);
            }
            SessionEvent::SubmitRejected(errors) => self.show_submit_errors(&errors),
        }
    }

    fn show_submit_errors(&mut self, errors: &[FieldError]) {
        self.submit_attempted = true;
        self.errors = errors.iter().map(|e| (e.field, e.message)).collect();

        if let Some(first) = Field::ALL.iter().position(|f| self.errors.contains_key(f)) {
            self.field_index = first;
        }
        self.set_status(format!("{} field(s) need attention", errors.len()));
    }

    fn commit_input(&mut self) -> SessionCommand {
        let field = self.current_field();
        let value = self.input.clone();
        self.apply(field, value)
    }

    /// Update the local mirror and build the change for the session
    fn apply(&mut self, field: Field, value: String) -> SessionCommand {
        if let Err(e) = self.values.set(field, &value) {
            self.errors.insert(field, e.message);
        }
        if self.submit_attempted || self.errors.contains_key(&field) {
            self.revalidate(field);
        }
        SessionCommand::change(field, value)
    }

    fn revalidate(&mut self, field: Field) {
        let result = match self.values.get(field) {
            Some(value) => check_field(field, &value).map_err(|e| e.message),
            None if field.is_required() => Err(constraint_message(field)),
            None => Ok(()),
        };
        match result {
            Ok(()) => {
                self.errors.remove(&field);
            }
            Err(message) => {
                self.errors.insert(field, message);
            }
        }
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }
}
