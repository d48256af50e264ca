//! Training and forecasting against persisted grades and models.
//!
//! # Responsibility
//! - Train per-subject models from stored grades and persist the winner.
//! - Forecast with the stored model for a subject.
//!
//! # See also
//! - `crate::ml::pipeline` for the training and inference algorithms.

use crate::ml::pipeline::{GradeForecast, GradePredictor, PredictionError, TrainingReport};
use crate::model::grade::{sort_chronologically, GradeRecord};
use crate::repo::model_repo::{ModelId, ModelRepository, ModelSummary, TrainingRun};
use crate::repo::study_repo::{GradeRepository, SubjectRepository};
use crate::service::subject_service::ensure_subject;
use crate::service::ServiceResult;
use chrono::NaiveDateTime;
use log::info;

/// Result of a successful training call.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    pub model_id: ModelId,
    pub run_id: uuid::Uuid,
    pub report: TrainingReport,
}

pub struct PredictionService<'p, R, M> {
    repo: R,
    models: M,
    predictor: &'p GradePredictor,
}

impl<'p, R, M> PredictionService<'p, R, M>
where
    R: SubjectRepository + GradeRepository,
    M: ModelRepository,
{
    pub fn new(repo: R, models: M, predictor: &'p GradePredictor) -> Self {
        Self {
            repo,
            models,
            predictor,
        }
    }

    /// Trains on the subject's grades and stores the best model.
    ///
    /// # Contract
    /// - Nothing is persisted when training fails.
    /// - A successful run replaces the subject's previous model and appends
    ///   one training-run row in the same transaction.
    pub fn train(&self, subject: &str, trained_at: NaiveDateTime) -> ServiceResult<TrainingSummary> {
        let subject = ensure_subject(&self.repo, subject)?;
        let records = self.records(&subject)?;
        let outcome = self.predictor.train(&subject, &records, trained_at)?;
        let (model_id, run_id) =
            self.models
                .save_training(&outcome.model, &outcome.report, trained_at)?;
        info!(
            "event=prediction_train module=service status=ok subject={} model_id={}",
            subject, model_id
        );
        Ok(TrainingSummary {
            model_id,
            run_id,
            report: outcome.report,
        })
    }

    /// Forecasts `horizon` steps (config default when `None`).
    pub fn forecast(&self, subject: &str, horizon: Option<usize>) -> ServiceResult<GradeForecast> {
        let subject = subject.trim();
        let stored = self
            .models
            .load_model(subject)?
            .ok_or_else(|| PredictionError::ModelNotFound(subject.to_string()))?;
        let records = self.records(subject)?;
        let horizon = horizon.unwrap_or(self.predictor.settings().horizon);
        Ok(self.predictor.forecast(&stored.model, &records, horizon)?)
    }

    pub fn models(&self) -> ServiceResult<Vec<ModelSummary>> {
        Ok(self.models.list_models()?)
    }

    pub fn history(&self, subject: &str) -> ServiceResult<Vec<TrainingRun>> {
        Ok(self.models.list_training_runs(subject.trim())?)
    }

    pub fn forget(&self, subject: &str) -> ServiceResult<bool> {
        Ok(self.models.delete_model(subject.trim())?)
    }

    fn records(&self, subject: &str) -> ServiceResult<Vec<GradeRecord>> {
        let mut records = self
            .repo
            .load_grades()?
            .remove(subject)
            .unwrap_or_default();
        sort_chronologically(&mut records);
        Ok(records)
    }
}
