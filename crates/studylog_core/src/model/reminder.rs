//! Reminder domain model and recurrence rules.
//!
//! # Invariants
//! - `text` is non-blank and at most 500 chars.
//! - Completing a recurring reminder yields a fresh, uncompleted successor;
//!   the original stays completed.

use crate::model::date::{optional_date, DATE_FORMAT};
use crate::model::derived_id;
use crate::model::validation::{
    validate_subject_name, validate_text, ValidationError, MAX_REMINDER_CHARS,
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ReminderId = Uuid;

/// Fixed recurrence interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    /// Approximated as 30 days, not calendar months.
    Monthly,
}

impl Recurrence {
    /// Day offset to the next occurrence; `None` for one-shot reminders.
    pub fn interval_days(self) -> Option<i64> {
        match self {
            Self::None => None,
            Self::Daily => Some(1),
            Self::Weekly => Some(7),
            Self::Monthly => Some(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ReminderWire")]
pub struct Reminder {
    pub id: ReminderId,
    pub subject: String,
    /// Free-form category such as `exam` or `homework`.
    #[serde(rename = "type")]
    pub kind: String,
    pub date: NaiveDate,
    pub text: String,
    pub completed: bool,
    pub recurrence: Recurrence,
    #[serde(with = "optional_date")]
    pub snoozed_until: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct ReminderWire {
    #[serde(default)]
    id: Option<ReminderId>,
    subject: String,
    #[serde(rename = "type", default)]
    kind: String,
    date: NaiveDate,
    text: String,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    recurrence: Recurrence,
    #[serde(default, with = "optional_date")]
    snoozed_until: Option<NaiveDate>,
}

impl TryFrom<ReminderWire> for Reminder {
    type Error = ValidationError;

    fn try_from(wire: ReminderWire) -> Result<Self, Self::Error> {
        let id = wire.id.unwrap_or_else(|| {
            let date = wire.date.format(DATE_FORMAT).to_string();
            derived_id("reminder", &[&wire.subject, &wire.kind, &date, &wire.text])
        });
        let reminder = Reminder {
            id,
            subject: wire.subject,
            kind: wire.kind,
            date: wire.date,
            text: wire.text,
            completed: wire.completed,
            recurrence: wire.recurrence,
            snoozed_until: wire.snoozed_until,
        };
        reminder.validate()?;
        Ok(reminder)
    }
}

impl Reminder {
    pub fn new(
        subject: &str,
        kind: impl Into<String>,
        date: NaiveDate,
        text: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let reminder = Self {
            id: Uuid::new_v4(),
            subject: validate_subject_name(subject)?,
            kind: kind.into(),
            date,
            text: text.into(),
            completed: false,
            recurrence: Recurrence::None,
            snoozed_until: None,
        };
        reminder.validate()?;
        Ok(reminder)
    }

    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = recurrence;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilId);
        }
        validate_subject_name(&self.subject)?;
        validate_text("reminder text", &self.text, Some(MAX_REMINDER_CHARS))?;
        Ok(())
    }

    /// Date the reminder is effectively due, honoring snooze.
    pub fn effective_date(&self) -> NaiveDate {
        match self.snoozed_until {
            Some(until) if until > self.date => until,
            _ => self.date,
        }
    }

    /// Builds the next occurrence for a recurring reminder.
    pub fn next_occurrence(&self) -> Option<Reminder> {
        let days = self.recurrence.interval_days()?;
        Some(Reminder {
            id: Uuid::new_v4(),
            subject: self.subject.clone(),
            kind: self.kind.clone(),
            date: self.date + Duration::days(days),
            text: self.text.clone(),
            completed: false,
            recurrence: self.recurrence,
            snoozed_until: None,
        })
    }
}
