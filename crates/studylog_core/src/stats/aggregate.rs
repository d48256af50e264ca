//! Grade aggregation helpers.
//!
//! # Responsibility
//! - Compute weighted/simple means and dispersion over grade scores.
//! - Provide per-kind breakdowns and letter-grade bands.
//!
//! # Invariants
//! - Empty input yields `None`, never NaN.
//! - Weighted mean is `None` when the weight sum is not positive.
//! - `std_dev` is the sample deviation (n - 1); one value yields `0.0`.

use crate::model::grade::{GradeKind, GradeRecord};
use serde::Serialize;
use std::collections::BTreeMap;

/// Descriptive statistics over one set of grade records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeSummary {
    pub count: usize,
    pub mean: f64,
    pub weighted_mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// Σ(score·weight) / Σ(weight).
pub fn weighted_mean(pairs: &[(f64, f64)]) -> Option<f64> {
    let (weighted_sum, weight_sum) = weighted_totals(pairs);
    if weight_sum > 0.0 {
        Some(weighted_sum / weight_sum)
    } else {
        None
    }
}

/// Returns `(Σ score·weight, Σ weight)`.
pub fn weighted_totals(pairs: &[(f64, f64)]) -> (f64, f64) {
    pairs
        .iter()
        .fold((0.0, 0.0), |(sum, weights), (score, weight)| {
            (sum + score * weight, weights + weight)
        })
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Sample standard deviation.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let avg = mean(values)?;
    if values.len() < 2 {
        return Some(0.0);
    }
    let squared: f64 = values.iter().map(|value| (value - avg).powi(2)).sum();
    Some((squared / (values.len() - 1) as f64).sqrt())
}

pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// `std / mean`, or `0.0` when the mean is not positive.
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let avg = mean(values)?;
    let sd = std_dev(values)?;
    if avg > 0.0 {
        Some(sd / avg)
    } else {
        Some(0.0)
    }
}

pub fn summarize(records: &[GradeRecord]) -> Option<GradeSummary> {
    let scores: Vec<f64> = records.iter().map(|record| record.score).collect();
    let pairs: Vec<(f64, f64)> = records.iter().map(GradeRecord::scored_weight).collect();
    let simple_mean = mean(&scores)?;
    Some(GradeSummary {
        count: scores.len(),
        mean: simple_mean,
        weighted_mean: weighted_mean(&pairs).unwrap_or(simple_mean),
        median: median(&scores)?,
        std_dev: std_dev(&scores)?,
        min: min(&scores)?,
        max: max(&scores)?,
    })
}

/// Summary per grade kind, omitting kinds without records.
pub fn summarize_by_kind(records: &[GradeRecord]) -> BTreeMap<GradeKind, GradeSummary> {
    let mut grouped: BTreeMap<GradeKind, Vec<GradeRecord>> = BTreeMap::new();
    for record in records {
        grouped.entry(record.kind).or_default().push(record.clone());
    }
    grouped
        .into_iter()
        .filter_map(|(kind, group)| summarize(&group).map(|summary| (kind, summary)))
        .collect()
}

/// Letter band for an average score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LetterGrade {
    S,
    A,
    B,
    C,
    D,
}

impl LetterGrade {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::S
        } else if score >= 80.0 {
            Self::A
        } else if score >= 70.0 {
            Self::B
        } else if score >= 60.0 {
            Self::C
        } else {
            Self::D
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::S => "outstanding",
            Self::A => "excellent",
            Self::B => "good",
            Self::C => "pass",
            Self::D => "fail",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{median, std_dev, weighted_mean, LetterGrade};

    #[test]
    fn weighted_mean_guards_zero_weight() {
        assert_eq!(weighted_mean(&[(80.0, 0.0)]), None);
        assert_eq!(weighted_mean(&[]), None);
    }

    #[test]
    fn median_handles_even_and_odd_lengths() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
    }

    #[test]
    fn std_dev_of_single_value_is_zero() {
        assert_eq!(std_dev(&[70.0]), Some(0.0));
    }

    #[test]
    fn letter_grade_bands() {
        assert_eq!(LetterGrade::from_score(90.0), LetterGrade::S);
        assert_eq!(LetterGrade::from_score(89.9), LetterGrade::A);
        assert_eq!(LetterGrade::from_score(59.0), LetterGrade::D);
    }
}
