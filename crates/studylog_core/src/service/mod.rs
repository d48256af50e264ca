//! Use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep callers decoupled from storage details.
//!
//! # Invariants
//! - Services never bypass repository validation.
//! - Records are only attached to subjects present in the subject list.

use crate::ml::pipeline::PredictionError;
use crate::model::validation::ValidationError;
use crate::repo::model_repo::ModelStoreError;
use crate::repo::json_store::StoreError;
use crate::stats::required::RequiredScoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod app;
pub mod export_service;
pub mod goal_service;
pub mod grade_service;
pub mod prediction_service;
pub mod progress_service;
pub mod reminder_service;
pub mod report_service;
pub mod subject_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    Store(StoreError),
    Validation(ValidationError),
    UnknownSubject(String),
    NotFound(String),
    RequiredScore(RequiredScoreError),
    Prediction(PredictionError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::UnknownSubject(subject) => write!(f, "unknown subject `{subject}`"),
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::RequiredScore(err) => write!(f, "{err}"),
            Self::Prediction(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::RequiredScore(err) => Some(err),
            Self::Prediction(err) => Some(err),
            Self::UnknownSubject(_) | Self::NotFound(_) => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RequiredScoreError> for ServiceError {
    fn from(value: RequiredScoreError) -> Self {
        Self::RequiredScore(value)
    }
}

impl From<PredictionError> for ServiceError {
    fn from(value: PredictionError) -> Self {
        Self::Prediction(value)
    }
}

impl From<ModelStoreError> for ServiceError {
    fn from(value: ModelStoreError) -> Self {
        Self::Prediction(PredictionError::Store(value))
    }
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Store(err) => err.code(),
            Self::Validation(_) => "validation",
            Self::UnknownSubject(_) => "unknown_subject",
            Self::NotFound(_) => "not_found",
            Self::RequiredScore(_) => "invalid_required_score_input",
            Self::Prediction(err) => err.code(),
        }
    }
}
