//! Study goal domain model.
//!
//! # Responsibility
//! - Define the flat goal record persisted in `goals.json`.
//! - Carry an optional measurable target used for progress evaluation.
//!
//! # Invariants
//! - `id` is stable and never nil.
//! - `text` is non-blank; `subject` passes subject-name validation.
//! - A target value, when present, is strictly positive.

use crate::model::date::optional_date;
use crate::model::derived_id;
use crate::model::validation::{validate_subject_name, validate_text, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type GoalId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalHorizon {
    #[default]
    ShortTerm,
    LongTerm,
}

impl GoalHorizon {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ShortTerm => "short_term",
            Self::LongTerm => "long_term",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    InProgress,
    Achieved,
    Abandoned,
}

/// Measurable part of a goal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GoalTarget {
    /// Reach this score on the latest grade record.
    Grade { points: f64 },
    /// Accumulate this many study hours.
    StudyTime { hours: f64 },
}

impl GoalTarget {
    pub fn value(&self) -> f64 {
        match self {
            Self::Grade { points } => *points,
            Self::StudyTime { hours } => *hours,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GoalWire")]
pub struct Goal {
    pub id: GoalId,
    pub subject: String,
    pub horizon: GoalHorizon,
    pub text: String,
    #[serde(with = "optional_date")]
    pub deadline: Option<NaiveDate>,
    pub status: GoalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<GoalTarget>,
}

#[derive(Deserialize)]
struct GoalWire {
    #[serde(default)]
    id: Option<GoalId>,
    subject: String,
    horizon: GoalHorizon,
    text: String,
    #[serde(default, with = "optional_date")]
    deadline: Option<NaiveDate>,
    #[serde(default)]
    status: GoalStatus,
    #[serde(default)]
    target: Option<GoalTarget>,
}

impl TryFrom<GoalWire> for Goal {
    type Error = ValidationError;

    fn try_from(wire: GoalWire) -> Result<Self, Self::Error> {
        let id = wire
            .id
            .unwrap_or_else(|| Goal::content_id(&wire.subject, wire.horizon, &wire.text));
        let goal = Goal {
            id,
            subject: wire.subject,
            horizon: wire.horizon,
            text: wire.text,
            deadline: wire.deadline,
            status: wire.status,
            target: wire.target,
        };
        goal.validate()?;
        Ok(goal)
    }
}

impl Goal {
    /// Creates an in-progress goal with a generated id.
    pub fn new(
        subject: &str,
        horizon: GoalHorizon,
        text: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let goal = Self {
            id: Uuid::new_v4(),
            subject: validate_subject_name(subject)?,
            horizon,
            text: text.into(),
            deadline: None,
            status: GoalStatus::InProgress,
            target: None,
        };
        goal.validate()?;
        Ok(goal)
    }

    /// Id for a goal persisted without one.
    pub fn content_id(subject: &str, horizon: GoalHorizon, text: &str) -> GoalId {
        derived_id("goal", &[subject.trim(), horizon.as_str(), text.trim()])
    }

    pub fn with_deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_target(mut self, target: GoalTarget) -> Result<Self, ValidationError> {
        self.target = Some(target);
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilId);
        }
        validate_subject_name(&self.subject)?;
        validate_text("goal text", &self.text, None)?;
        if let Some(target) = self.target {
            let value = target.value();
            if !value.is_finite() {
                return Err(ValidationError::NonFinite("goal target"));
            }
            if value <= 0.0 {
                return Err(ValidationError::NonPositiveTarget(value));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Goal, GoalHorizon, GoalTarget};
    use crate::model::validation::ValidationError;
    use chrono::NaiveDate;

    #[test]
    fn serialization_writes_empty_deadline_as_blank_string() {
        let goal = Goal::new("Math", GoalHorizon::ShortTerm, "finish chapter 3").expect("valid goal");
        let json = serde_json::to_value(&goal).expect("serializable");
        assert_eq!(json["deadline"], "");
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["horizon"], "short_term");

        let decoded: Goal = serde_json::from_value(json).expect("valid json");
        assert_eq!(decoded, goal);
    }

    #[test]
    fn target_must_be_positive() {
        let goal = Goal::new("Math", GoalHorizon::LongTerm, "reach 85")
            .expect("valid goal")
            .with_deadline(NaiveDate::from_ymd_opt(2025, 9, 1).expect("valid date"));
        let err = goal
            .with_target(GoalTarget::Grade { points: 0.0 })
            .expect_err("with target must fail");
        assert_eq!(err, ValidationError::NonPositiveTarget(0.0));
    }
}
