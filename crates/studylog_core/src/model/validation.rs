//! Boundary validation shared by all study records.
//!
//! # Responsibility
//! - Define the single error type for record-level invariant violations.
//! - Provide field checks reused by constructors, deserialization and the
//!   integrity checker.
//!
//! # Invariants
//! - Checks reject; they never coerce. Clamping lives in `integrity` and is
//!   opt-in.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const MAX_SCORE: f64 = 100.0;
pub const MAX_WEIGHT: f64 = 100.0;
pub const MAX_DAILY_HOURS: f64 = 24.0;
pub const MAX_SUBJECT_CHARS: usize = 50;
pub const MAX_REMINDER_CHARS: usize = 500;
pub const MIN_MOTIVATION: u8 = 1;
pub const MAX_MOTIVATION: u8 = 5;
pub const MIN_AGE: u8 = 5;
pub const MAX_AGE: u8 = 120;

static FORBIDDEN_SUBJECT_CHAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[/\\:*?"<>|\p{Cc}]"#).expect("valid forbidden subject char regex")
});

/// Record-level validation failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptySubject,
    SubjectTooLong { chars: usize, max: usize },
    InvalidSubjectChar(char),
    NonFinite(&'static str),
    ScoreOutOfRange(f64),
    WeightOutOfRange(f64),
    HoursOutOfRange(f64),
    MotivationOutOfRange(u8),
    EmptyText(&'static str),
    TextTooLong {
        field: &'static str,
        chars: usize,
        max: usize,
    },
    InvalidDate(String),
    NonPositiveTarget(f64),
    AgeOutOfRange(u8),
    NilId,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySubject => write!(f, "subject name must not be empty"),
            Self::SubjectTooLong { chars, max } => {
                write!(f, "subject name has {chars} chars; max is {max}")
            }
            Self::InvalidSubjectChar(ch) => {
                write!(f, "subject name contains forbidden character {ch:?}")
            }
            Self::NonFinite(field) => write!(f, "{field} must be a finite number"),
            Self::ScoreOutOfRange(value) => {
                write!(f, "score {value} must be within 0..={MAX_SCORE}")
            }
            Self::WeightOutOfRange(value) => {
                write!(f, "weight {value} must be > 0 and <= {MAX_WEIGHT}")
            }
            Self::HoursOutOfRange(value) => {
                write!(f, "study hours {value} must be within 0..={MAX_DAILY_HOURS}")
            }
            Self::MotivationOutOfRange(value) => write!(
                f,
                "motivation {value} must be within {MIN_MOTIVATION}..={MAX_MOTIVATION}"
            ),
            Self::EmptyText(field) => write!(f, "{field} must not be empty"),
            Self::TextTooLong { field, chars, max } => {
                write!(f, "{field} has {chars} chars; max is {max}")
            }
            Self::InvalidDate(value) => write!(f, "invalid date `{value}`"),
            Self::NonPositiveTarget(value) => write!(f, "goal target {value} must be positive"),
            Self::AgeOutOfRange(value) => {
                write!(f, "age {value} must be within {MIN_AGE}..={MAX_AGE}")
            }
            Self::NilId => write!(f, "record id must not be nil"),
        }
    }
}

impl Error for ValidationError {}

/// Trims and checks one subject name.
pub fn validate_subject_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptySubject);
    }
    let chars = trimmed.chars().count();
    if chars > MAX_SUBJECT_CHARS {
        return Err(ValidationError::SubjectTooLong {
            chars,
            max: MAX_SUBJECT_CHARS,
        });
    }
    if let Some(found) = FORBIDDEN_SUBJECT_CHAR_RE.find(trimmed) {
        let ch = found.as_str().chars().next().unwrap_or('?');
        return Err(ValidationError::InvalidSubjectChar(ch));
    }
    Ok(trimmed.to_string())
}

pub fn validate_score(score: f64) -> Result<f64, ValidationError> {
    if !score.is_finite() {
        return Err(ValidationError::NonFinite("score"));
    }
    if !(0.0..=MAX_SCORE).contains(&score) {
        return Err(ValidationError::ScoreOutOfRange(score));
    }
    Ok(score)
}

pub fn validate_weight(weight: f64) -> Result<f64, ValidationError> {
    if !weight.is_finite() {
        return Err(ValidationError::NonFinite("weight"));
    }
    if weight <= 0.0 || weight > MAX_WEIGHT {
        return Err(ValidationError::WeightOutOfRange(weight));
    }
    Ok(weight)
}

pub fn validate_hours(hours: f64) -> Result<f64, ValidationError> {
    if !hours.is_finite() {
        return Err(ValidationError::NonFinite("hours"));
    }
    if !(0.0..=MAX_DAILY_HOURS).contains(&hours) {
        return Err(ValidationError::HoursOutOfRange(hours));
    }
    Ok(hours)
}

pub fn validate_motivation(motivation: u8) -> Result<u8, ValidationError> {
    if !(MIN_MOTIVATION..=MAX_MOTIVATION).contains(&motivation) {
        return Err(ValidationError::MotivationOutOfRange(motivation));
    }
    Ok(motivation)
}

/// Requires non-blank text of at most `max` chars (when given).
pub fn validate_text(
    field: &'static str,
    value: &str,
    max: Option<usize>,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyText(field));
    }
    if let Some(max) = max {
        let chars = value.chars().count();
        if chars > max {
            return Err(ValidationError::TextTooLong { field, chars, max });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_score, validate_subject_name, validate_weight, ValidationError};

    #[test]
    fn subject_name_is_trimmed_and_checked() {
        assert_eq!(validate_subject_name("  Math ").expect("validate subject name succeeds"), "Math");
        assert_eq!(
            validate_subject_name("   ").expect_err("validate subject name must fail"),
            ValidationError::EmptySubject
        );
        assert_eq!(
            validate_subject_name("a/b").expect_err("validate subject name must fail"),
            ValidationError::InvalidSubjectChar('/')
        );
        let long = "x".repeat(51);
        assert!(matches!(
            validate_subject_name(&long).expect_err("validate subject name must fail"),
            ValidationError::SubjectTooLong { chars: 51, .. }
        ));
    }

    #[test]
    fn score_bounds_are_inclusive() {
        assert!(validate_score(0.0).is_ok());
        assert!(validate_score(100.0).is_ok());
        assert_eq!(
            validate_score(-1.0).expect_err("validate score must fail"),
            ValidationError::ScoreOutOfRange(-1.0)
        );
        assert_eq!(
            validate_score(f64::NAN).expect_err("validate score must fail"),
            ValidationError::NonFinite("score")
        );
    }

    #[test]
    fn weight_must_be_positive() {
        assert!(validate_weight(0.5).is_ok());
        assert!(validate_weight(0.0).is_err());
        assert!(validate_weight(101.0).is_err());
    }
}
