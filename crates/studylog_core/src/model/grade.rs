//! Grade record domain model.
//!
//! # Responsibility
//! - Define one assessed result for a subject (test, assignment, ...).
//! - Enforce score/weight bounds on construction and deserialization.
//!
//! # Invariants
//! - `score` is finite and within `0..=100`.
//! - `weight` is finite, `> 0` and `<= 100`.
//! - Records are keyed by subject outside this type (see `GradeBook`).

use crate::model::date::RecordDate;
use crate::model::validation::{validate_score, validate_weight, ValidationError};
use serde::{Deserialize, Serialize};

/// Assessment category of a grade record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeKind {
    Test,
    Assignment,
    Quiz,
    Other,
}

impl GradeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Assignment => "assignment",
            Self::Quiz => "quiz",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "test" => Some(Self::Test),
            "assignment" => Some(Self::Assignment),
            "quiz" => Some(Self::Quiz),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

fn default_weight() -> f64 {
    1.0
}

/// One recorded grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GradeRecordWire")]
pub struct GradeRecord {
    pub date: RecordDate,
    /// Serialized as `type` to match the stored document shape.
    #[serde(rename = "type")]
    pub kind: GradeKind,
    pub score: f64,
    pub weight: f64,
    pub comment: String,
}

#[derive(Deserialize)]
struct GradeRecordWire {
    date: RecordDate,
    #[serde(rename = "type")]
    kind: GradeKind,
    score: f64,
    #[serde(default = "default_weight")]
    weight: f64,
    #[serde(default)]
    comment: String,
}

impl TryFrom<GradeRecordWire> for GradeRecord {
    type Error = ValidationError;

    fn try_from(wire: GradeRecordWire) -> Result<Self, Self::Error> {
        let record = GradeRecord {
            date: wire.date,
            kind: wire.kind,
            score: wire.score,
            weight: wire.weight,
            comment: wire.comment,
        };
        record.validate()?;
        Ok(record)
    }
}

impl GradeRecord {
    /// Creates a validated grade record with an empty comment.
    pub fn new(
        date: RecordDate,
        kind: GradeKind,
        score: f64,
        weight: f64,
    ) -> Result<Self, ValidationError> {
        let record = Self {
            date,
            kind,
            score,
            weight,
            comment: String::new(),
        };
        record.validate()?;
        Ok(record)
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_score(self.score)?;
        validate_weight(self.weight)?;
        Ok(())
    }

    /// `(score, weight)` view used by aggregation helpers.
    pub fn scored_weight(&self) -> (f64, f64) {
        (self.score, self.weight)
    }
}

/// Sorts records chronologically; ties keep insertion order.
pub fn sort_chronologically(records: &mut [GradeRecord]) {
    records.sort_by(|left, right| left.date.cmp(&right.date));
}
