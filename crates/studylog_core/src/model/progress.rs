//! Study-time progress record.
//!
//! # Invariants
//! - `hours` is within `0..=24` (one sitting never exceeds a day).
//! - `motivation` is within `1..=5`.

use crate::model::date::RecordDate;
use crate::model::validation::{validate_hours, validate_motivation, ValidationError};
use serde::{Deserialize, Serialize};

fn default_motivation() -> u8 {
    3
}

/// One study session logged against a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProgressRecordWire")]
pub struct ProgressRecord {
    pub date: RecordDate,
    pub hours: f64,
    pub task: String,
    pub motivation: u8,
}

#[derive(Deserialize)]
struct ProgressRecordWire {
    date: RecordDate,
    hours: f64,
    #[serde(default)]
    task: String,
    #[serde(default = "default_motivation")]
    motivation: u8,
}

impl TryFrom<ProgressRecordWire> for ProgressRecord {
    type Error = ValidationError;

    fn try_from(wire: ProgressRecordWire) -> Result<Self, Self::Error> {
        let record = ProgressRecord {
            date: wire.date,
            hours: wire.hours,
            task: wire.task,
            motivation: wire.motivation,
        };
        record.validate()?;
        Ok(record)
    }
}

impl ProgressRecord {
    pub fn new(
        date: RecordDate,
        hours: f64,
        task: impl Into<String>,
        motivation: u8,
    ) -> Result<Self, ValidationError> {
        let record = Self {
            date,
            hours,
            task: task.into(),
            motivation,
        };
        record.validate()?;
        Ok(record)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_hours(self.hours)?;
        validate_motivation(self.motivation)?;
        Ok(())
    }
}
