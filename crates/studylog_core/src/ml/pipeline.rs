//! Grade-prediction training and inference.
//!
//! # Responsibility
//! - Train every candidate regressor on one subject's history, score them
//!   on a seeded hold-out split plus k-fold CV, and keep the best.
//! - Forecast the next assessments by feeding predictions back in as
//!   synthetic records.
//!
//! # Invariants
//! - Failures are `PredictionError` values; nothing here panics.
//! - Predicted scores are clamped into `0..=100`; reported points are
//!   rounded to 0.1, the synthetic history keeps the unrounded value.
//! - The horizon is bounded by `max_horizon`.
//! - Confidence bounds are `score ± 1.96·std_error`, clamped into `0..=100`.
//! - Identical input and seed produce identical models and forecasts.
//!
//! # See also
//! - `crate::repo::model_repo` for persistence of `TrainedModel`.

use crate::config::PredictionConfig;
use crate::ml::features::{
    average_interval_days, feature_names, history_features, training_set, FEATURE_NAMES,
    MIN_HISTORY,
};
use crate::ml::metrics::{mae, r2_score, rmse, FitQuality};
use crate::ml::regressor::{Regressor, RegressorKind};
use crate::ml::scaler::StandardScaler;
use crate::ml::split::{k_fold, test_fraction, train_test_split};
use crate::model::date::RecordDate;
use crate::model::grade::{sort_chronologically, GradeKind, GradeRecord};
use crate::model::validation::MAX_SCORE;
use crate::repo::model_repo::ModelStoreError;
use crate::stats::aggregate::{max, mean, min, std_dev};
use chrono::NaiveDateTime;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// z-value of a two-sided 95% interval.
pub const CONFIDENCE_Z: f64 = 1.96;
/// Upper bound on CV folds.
pub const MAX_CV_FOLDS: usize = 5;

#[derive(Debug)]
pub enum PredictionError {
    InsufficientData { required: usize, available: usize },
    ModelNotFound(String),
    FeatureMismatch { expected: usize, found: usize },
    NonFinitePrediction(RegressorKind),
    InvalidHorizon { requested: usize, max: usize },
    Store(ModelStoreError),
}

impl Display for PredictionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientData {
                required,
                available,
            } => write!(
                f,
                "insufficient data: {available} usable samples, need at least {required}"
            ),
            Self::ModelNotFound(subject) => write!(f, "no trained model for subject `{subject}`"),
            Self::FeatureMismatch { expected, found } => write!(
                f,
                "stored model expects {found} features; pipeline produces {expected}"
            ),
            Self::NonFinitePrediction(kind) => {
                write!(f, "{} produced a non-finite prediction", kind.as_str())
            }
            Self::InvalidHorizon { requested, max } => {
                write!(f, "forecast horizon {requested} must be within 1..={max}")
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PredictionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelStoreError> for PredictionError {
    fn from(value: ModelStoreError) -> Self {
        Self::Store(value)
    }
}

impl PredictionError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InsufficientData { .. } => "insufficient_data",
            Self::ModelNotFound(_) => "model_not_found",
            Self::FeatureMismatch { .. } => "feature_mismatch",
            Self::NonFinitePrediction(_) => "non_finite_prediction",
            Self::InvalidHorizon { .. } => "invalid_horizon",
            Self::Store(_) => "store",
        }
    }
}

/// Hold-out and CV scores of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluation {
    pub kind: RegressorKind,
    pub train_r2: f64,
    pub test_r2: f64,
    pub rmse: f64,
    pub mae: f64,
    pub cv_r2_mean: Option<f64>,
    pub cv_r2_std: Option<f64>,
    pub quality: FitQuality,
}

/// Shape of the training data, reported alongside scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataDiagnosis {
    pub total_samples: usize,
    pub train_samples: usize,
    pub test_samples: usize,
    pub feature_count: usize,
    pub target_mean: f64,
    pub target_std: f64,
    pub target_min: f64,
    pub target_max: f64,
}

/// Persistable fitted model for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub subject: String,
    pub regressor: Regressor,
    pub scaler: StandardScaler,
    pub feature_names: Vec<String>,
    pub sample_count: usize,
    pub test_r2: f64,
    pub trained_at: NaiveDateTime,
}

impl TrainedModel {
    pub fn kind(&self) -> RegressorKind {
        self.regressor.kind()
    }

    /// `(feature, importance)` sorted descending; `None` for linear models.
    pub fn ranked_importances(&self) -> Option<Vec<(String, f64)>> {
        let importances = self.regressor.feature_importances()?;
        let mut ranked: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(importances)
            .collect();
        ranked.sort_by(|left, right| right.1.total_cmp(&left.1));
        Some(ranked)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub subject: String,
    pub best: RegressorKind,
    pub evaluations: Vec<ModelEvaluation>,
    pub diagnosis: DataDiagnosis,
    pub feature_importances: Option<Vec<(String, f64)>>,
}

impl TrainingReport {
    pub fn best_evaluation(&self) -> Option<&ModelEvaluation> {
        self.evaluations
            .iter()
            .find(|evaluation| evaluation.kind == self.best)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    pub model: TrainedModel,
    pub report: TrainingReport,
}

/// One predicted future assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub step: usize,
    pub date: RecordDate,
    pub score: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeForecast {
    pub subject: String,
    pub model_kind: RegressorKind,
    pub test_r2: f64,
    pub points: Vec<ForecastPoint>,
}

impl GradeForecast {
    pub fn next(&self) -> Option<&ForecastPoint> {
        self.points.first()
    }
}

/// Stateless trainer/forecaster parameterized by `[prediction]` config.
#[derive(Debug, Clone, Default)]
pub struct GradePredictor {
    settings: PredictionConfig,
}

impl GradePredictor {
    pub fn new(settings: PredictionConfig) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PredictionConfig {
        &self.settings
    }

    /// Trains all candidates on `records` and returns the best one.
    ///
    /// # Errors
    /// - `InsufficientData` when fewer than `min_records` feature rows exist.
    pub fn train(
        &self,
        subject: &str,
        records: &[GradeRecord],
        trained_at: NaiveDateTime,
    ) -> Result<TrainingOutcome, PredictionError> {
        let mut history = records.to_vec();
        sort_chronologically(&mut history);
        let data = training_set(&history);
        if data.len() < self.settings.min_records {
            warn!(
                "event=model_train module=ml status=error code=insufficient_data subject={} rows={}",
                subject,
                data.len()
            );
            return Err(PredictionError::InsufficientData {
                required: self.settings.min_records,
                available: data.len(),
            });
        }

        let seed = self.settings.seed;
        let (train_idx, test_idx) = train_test_split(data.len(), test_fraction(data.len()), seed);
        let select = |indices: &[usize]| -> (Vec<Vec<f64>>, Vec<f64>) {
            indices
                .iter()
                .map(|index| (data.rows[*index].clone(), data.targets[*index]))
                .unzip()
        };
        let (train_raw, train_y) = select(&train_idx);
        let (test_raw, test_y) = select(&test_idx);

        let scaler = StandardScaler::fit(&train_raw);
        let train_x = scaler.transform(&train_raw);
        let test_x = scaler.transform(&test_raw);

        let mut evaluations = Vec::with_capacity(RegressorKind::all().len());
        let mut best: Option<(Regressor, f64)> = None;
        for kind in RegressorKind::all() {
            let regressor = Regressor::fit(kind, &train_x, &train_y, seed);
            let train_pred = regressor.predict(&train_x);
            let test_pred = regressor.predict(&test_x);
            let test_r2 = r2_score(&test_y, &test_pred);
            let (cv_r2_mean, cv_r2_std) = cross_validate(kind, &train_x, &train_y, seed);
            evaluations.push(ModelEvaluation {
                kind,
                train_r2: r2_score(&train_y, &train_pred),
                test_r2,
                rmse: rmse(&test_y, &test_pred),
                mae: mae(&test_y, &test_pred),
                cv_r2_mean,
                cv_r2_std,
                quality: FitQuality::from_r2(test_r2),
            });
            let better = best
                .as_ref()
                .map_or(true, |(_, best_r2)| test_r2 > *best_r2);
            if better {
                best = Some((regressor, test_r2));
            }
        }
        let Some((regressor, test_r2)) = best else {
            return Err(PredictionError::InsufficientData {
                required: self.settings.min_records,
                available: data.len(),
            });
        };

        let model = TrainedModel {
            subject: subject.to_string(),
            regressor,
            scaler,
            feature_names: feature_names(),
            sample_count: data.len(),
            test_r2,
            trained_at,
        };
        let report = TrainingReport {
            subject: subject.to_string(),
            best: model.kind(),
            evaluations,
            diagnosis: DataDiagnosis {
                total_samples: data.len(),
                train_samples: train_idx.len(),
                test_samples: test_idx.len(),
                feature_count: FEATURE_NAMES.len(),
                target_mean: mean(&data.targets).unwrap_or(0.0),
                target_std: std_dev(&data.targets).unwrap_or(0.0),
                target_min: min(&data.targets).unwrap_or(0.0),
                target_max: max(&data.targets).unwrap_or(0.0),
            },
            feature_importances: model.ranked_importances(),
        };
        info!(
            "event=model_train module=ml status=ok subject={} rows={} best={} test_r2={:.3}",
            subject,
            data.len(),
            model.kind().as_str(),
            test_r2
        );
        Ok(TrainingOutcome { model, report })
    }

    /// Forecasts `horizon` future assessments from `records`.
    ///
    /// Each step predicts the next score, then appends it as a synthetic
    /// test record dated one average interval after the last record and
    /// weighted with the mean historical weight.
    pub fn forecast(
        &self,
        model: &TrainedModel,
        records: &[GradeRecord],
        horizon: usize,
    ) -> Result<GradeForecast, PredictionError> {
        let max = self.settings.max_horizon;
        if horizon == 0 || horizon > max {
            warn!(
                "event=grade_forecast module=ml status=error code=invalid_horizon subject={} requested={}",
                model.subject, horizon
            );
            return Err(PredictionError::InvalidHorizon {
                requested: horizon,
                max,
            });
        }
        if model.feature_names.len() != FEATURE_NAMES.len()
            || model.scaler.width() != FEATURE_NAMES.len()
        {
            return Err(PredictionError::FeatureMismatch {
                expected: FEATURE_NAMES.len(),
                found: model.feature_names.len(),
            });
        }
        let mut history = records.to_vec();
        sort_chronologically(&mut history);
        if history.len() < MIN_HISTORY {
            return Err(PredictionError::InsufficientData {
                required: MIN_HISTORY,
                available: history.len(),
            });
        }

        let weights: Vec<f64> = history.iter().map(|record| record.weight).collect();
        let synthetic_weight = mean(&weights).unwrap_or(1.0);
        let margin = CONFIDENCE_Z * self.settings.std_error;
        let mut points = Vec::new();

        for step in 1..=horizon {
            let interval = average_interval_days(&history).round().max(1.0) as i64;
            let Some(last) = history.last() else {
                break;
            };
            let next_date = last.date.plus_days(interval);
            let Some(features) = history_features(&history, &next_date) else {
                break;
            };
            let raw = model
                .regressor
                .predict_row(&model.scaler.transform_row(&features));
            if !raw.is_finite() {
                return Err(PredictionError::NonFinitePrediction(model.kind()));
            }
            let score = raw.clamp(0.0, MAX_SCORE);
            points.push(ForecastPoint {
                step,
                date: next_date,
                score: round_tenth(score),
                lower: round_tenth((score - margin).max(0.0)),
                upper: round_tenth((score + margin).min(MAX_SCORE)),
            });
            history.push(GradeRecord {
                date: next_date,
                kind: GradeKind::Test,
                score,
                weight: synthetic_weight,
                comment: String::new(),
            });
        }

        info!(
            "event=grade_forecast module=ml status=ok subject={} model={} steps={}",
            model.subject,
            model.kind().as_str(),
            points.len()
        );
        Ok(GradeForecast {
            subject: model.subject.clone(),
            model_kind: model.kind(),
            test_r2: model.test_r2,
            points,
        })
    }
}

/// Mean and population std of per-fold R² with `k = min(5, rows)`.
fn cross_validate(
    kind: RegressorKind,
    rows: &[Vec<f64>],
    targets: &[f64],
    seed: u64,
) -> (Option<f64>, Option<f64>) {
    let folds = k_fold(rows.len(), MAX_CV_FOLDS.min(rows.len()));
    if folds.is_empty() {
        return (None, None);
    }
    let scores: Vec<f64> = folds
        .iter()
        .map(|(train, validation)| {
            let fold_x: Vec<Vec<f64>> = train.iter().map(|index| rows[*index].clone()).collect();
            let fold_y: Vec<f64> = train.iter().map(|index| targets[*index]).collect();
            let model = Regressor::fit(kind, &fold_x, &fold_y, seed);
            let actual: Vec<f64> = validation.iter().map(|index| targets[*index]).collect();
            let predicted: Vec<f64> = validation
                .iter()
                .map(|index| model.predict_row(&rows[*index]))
                .collect();
            r2_score(&actual, &predicted)
        })
        .collect();
    let fold_mean = scores.iter().sum::<f64>() / scores.len() as f64;
    let variance = scores
        .iter()
        .map(|score| (score - fold_mean).powi(2))
        .sum::<f64>()
        / scores.len() as f64;
    (Some(fold_mean), Some(variance.sqrt()))
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::{round_tenth, GradePredictor, PredictionError};
    use crate::model::date::RecordDate;
    use crate::model::grade::{GradeKind, GradeRecord};
    use chrono::{Duration, NaiveDate};

    fn weekly(scores: &[f64]) -> Vec<GradeRecord> {
        let start = NaiveDate::from_ymd_opt(2024, 4, 1).expect("valid date");
        scores
            .iter()
            .enumerate()
            .map(|(index, score)| {
                let date = start + Duration::days(7 * index as i64);
                GradeRecord::new(RecordDate::from_date(date), GradeKind::Test, *score, 1.0)
                    .expect("valid grade")
            })
            .collect()
    }

    #[test]
    fn rounding_keeps_one_decimal() {
        assert_eq!(round_tenth(81.26), 81.3);
        assert_eq!(round_tenth(100.0), 100.0);
    }

    #[test]
    fn too_few_rows_is_a_failure_value() {
        let predictor = GradePredictor::default();
        let at = NaiveDate::from_ymd_opt(2024, 6, 1)
            .expect("valid date")
            .and_hms_opt(0, 0, 0)
            .expect("valid time");
        let err = predictor
            .train("Math", &weekly(&[70.0, 72.0, 74.0, 76.0]), at)
            .expect_err("train must fail");
        assert!(matches!(
            err,
            PredictionError::InsufficientData {
                required: 5,
                available: 2
            }
        ));
    }
}
