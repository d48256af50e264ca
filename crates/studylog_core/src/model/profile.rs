//! User profile record.

use crate::model::validation::{ValidationError, MAX_AGE, MIN_AGE};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    Elementary,
    JuniorHigh,
    HighSchool,
    University,
    Graduate,
}

impl EducationLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Elementary => "elementary school",
            Self::JuniorHigh => "junior high school",
            Self::HighSchool => "high school",
            Self::University => "university",
            Self::Graduate => "graduate school",
        }
    }

    pub fn all() -> &'static [EducationLevel] {
        &[
            Self::Elementary,
            Self::JuniorHigh,
            Self::HighSchool,
            Self::University,
            Self::Graduate,
        ]
    }
}

/// Single-user profile used to tailor generated study advice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub age: Option<u8>,
    pub education_level: Option<EducationLevel>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

impl UserProfile {
    pub fn new(created_at: NaiveDateTime) -> Self {
        Self {
            age: None,
            education_level: None,
            created_at,
            updated_at: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.age {
            Some(age) if !(MIN_AGE..=MAX_AGE).contains(&age) => {
                Err(ValidationError::AgeOutOfRange(age))
            }
            _ => Ok(()),
        }
    }

    /// Whether enough is known to personalize prompts.
    pub fn is_complete(&self) -> bool {
        self.age.is_some() && self.education_level.is_some()
    }
}
