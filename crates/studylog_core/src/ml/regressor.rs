//! Closed set of candidate regressors behind one serializable enum.

use crate::ml::ensemble::{
    GradientBoosting, RandomForest, BOOSTING_LEARNING_RATE, BOOSTING_MAX_DEPTH, BOOSTING_STAGES,
    FOREST_TREES,
};
use crate::ml::linear::LinearModel;
use serde::{Deserialize, Serialize};

pub const RIDGE_ALPHA: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressorKind {
    RandomForest,
    GradientBoosting,
    LinearRegression,
    Ridge,
}

impl RegressorKind {
    /// Candidates in evaluation order; ties on test R² keep the earlier one.
    pub fn all() -> [RegressorKind; 4] {
        [
            Self::RandomForest,
            Self::GradientBoosting,
            Self::LinearRegression,
            Self::Ridge,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RandomForest => "random_forest",
            Self::GradientBoosting => "gradient_boosting",
            Self::LinearRegression => "linear_regression",
            Self::Ridge => "ridge",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::all().into_iter().find(|kind| kind.as_str() == value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params", rename_all = "snake_case")]
pub enum Regressor {
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
    LinearRegression(LinearModel),
    Ridge(LinearModel),
}

impl Regressor {
    pub fn fit(kind: RegressorKind, rows: &[Vec<f64>], targets: &[f64], seed: u64) -> Self {
        match kind {
            RegressorKind::RandomForest => {
                Self::RandomForest(RandomForest::fit(rows, targets, FOREST_TREES, seed))
            }
            RegressorKind::GradientBoosting => Self::GradientBoosting(GradientBoosting::fit(
                rows,
                targets,
                BOOSTING_STAGES,
                BOOSTING_LEARNING_RATE,
                BOOSTING_MAX_DEPTH,
            )),
            RegressorKind::LinearRegression => {
                Self::LinearRegression(LinearModel::fit(rows, targets, 0.0))
            }
            RegressorKind::Ridge => Self::Ridge(LinearModel::fit(rows, targets, RIDGE_ALPHA)),
        }
    }

    pub fn kind(&self) -> RegressorKind {
        match self {
            Self::RandomForest(_) => RegressorKind::RandomForest,
            Self::GradientBoosting(_) => RegressorKind::GradientBoosting,
            Self::LinearRegression(_) => RegressorKind::LinearRegression,
            Self::Ridge(_) => RegressorKind::Ridge,
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        match self {
            Self::RandomForest(model) => model.predict_row(row),
            Self::GradientBoosting(model) => model.predict_row(row),
            Self::LinearRegression(model) | Self::Ridge(model) => model.predict_row(row),
        }
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|row| self.predict_row(row)).collect()
    }

    /// Normalized importances; only tree ensembles report them.
    pub fn feature_importances(&self) -> Option<Vec<f64>> {
        match self {
            Self::RandomForest(model) => Some(model.feature_importances()),
            Self::GradientBoosting(model) => Some(model.feature_importances()),
            Self::LinearRegression(_) | Self::Ridge(_) => None,
        }
    }
}
