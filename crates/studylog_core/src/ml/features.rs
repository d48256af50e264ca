//! Feature extraction from a subject's grade history.
//!
//! # Responsibility
//! - Turn a chronologically ordered history into a fixed-width feature row.
//! - Build the supervised training set: features of `records[..i]` predict
//!   `records[i].score` for every `i >= 2`.
//!
//! # Invariants
//! - Row width always equals `FEATURE_NAMES.len()`.
//! - Histories shorter than two records produce no row.

use crate::model::date::RecordDate;
use crate::model::grade::{GradeKind, GradeRecord};
use crate::stats::aggregate::{
    coefficient_of_variation, max, mean, median, min, std_dev, weighted_mean,
};
use crate::stats::trend::index_slope;

/// Minimum history length that yields a feature row.
pub const MIN_HISTORY: usize = 2;

pub const FEATURE_NAMES: [&str; 14] = [
    "mean",
    "std",
    "min",
    "max",
    "median",
    "recent3_mean",
    "recent5_mean",
    "slope",
    "coefficient_of_variation",
    "num_tests",
    "num_assignments",
    "weighted_mean",
    "days_since_first",
    "avg_days_between",
];

pub fn feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|name| name.to_string()).collect()
}

/// Supervised rows with aligned targets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSet {
    pub rows: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

impl FeatureSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Feature row describing `history` as seen at `as_of`.
pub fn history_features(history: &[GradeRecord], as_of: &RecordDate) -> Option<Vec<f64>> {
    if history.len() < MIN_HISTORY {
        return None;
    }
    let scores: Vec<f64> = history.iter().map(|record| record.score).collect();
    let pairs: Vec<(f64, f64)> = history.iter().map(GradeRecord::scored_weight).collect();
    let overall = mean(&scores)?;
    let first = history.first()?.date;

    let recent = |window: usize| {
        if scores.len() >= window {
            mean(&scores[scores.len() - window..]).unwrap_or(overall)
        } else {
            overall
        }
    };
    let count_kind = |kind: GradeKind| {
        history.iter().filter(|record| record.kind == kind).count() as f64
    };

    Some(vec![
        overall,
        std_dev(&scores)?,
        min(&scores)?,
        max(&scores)?,
        median(&scores)?,
        recent(3),
        recent(5),
        index_slope(&scores),
        coefficient_of_variation(&scores)?,
        count_kind(GradeKind::Test),
        count_kind(GradeKind::Assignment),
        weighted_mean(&pairs).unwrap_or(overall),
        as_of.days_since(&first),
        average_interval_days(history),
    ])
}

/// Mean gap in days between consecutive records; `0.0` for one record.
pub fn average_interval_days(history: &[GradeRecord]) -> f64 {
    if history.len() < 2 {
        return 0.0;
    }
    let gaps: f64 = history
        .windows(2)
        .map(|pair| pair[1].date.days_since(&pair[0].date))
        .sum();
    gaps / (history.len() - 1) as f64
}

/// Training rows for every record with at least `MIN_HISTORY` predecessors.
pub fn training_set(records: &[GradeRecord]) -> FeatureSet {
    let mut set = FeatureSet::default();
    for index in MIN_HISTORY..records.len() {
        if let Some(row) = history_features(&records[..index], &records[index].date) {
            set.rows.push(row);
            set.targets.push(records[index].score);
        }
    }
    set
}
