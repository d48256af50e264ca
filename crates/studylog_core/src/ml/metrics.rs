//! Regression scores.

use serde::{Deserialize, Serialize};

/// Coefficient of determination.
///
/// A constant target scores `1.0` when predicted exactly and `0.0`
/// otherwise, so single-row folds never produce NaN.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() || actual.len() != predicted.len() {
        return 0.0;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|value| (value - mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(value, guess)| (value - guess).powi(2))
        .sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let squared: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(value, guess)| (value - guess).powi(2))
        .sum();
    (squared / actual.len() as f64).sqrt()
}

pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let absolute: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(value, guess)| (value - guess).abs())
        .sum();
    absolute / actual.len() as f64
}

/// Human-facing band for a held-out R².
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitQuality {
    Excellent,
    Good,
    Fair,
    NeedsWork,
    Poor,
}

impl FitQuality {
    pub fn from_r2(r2: f64) -> Self {
        if r2 >= 0.8 {
            Self::Excellent
        } else if r2 >= 0.6 {
            Self::Good
        } else if r2 >= 0.4 {
            Self::Fair
        } else if r2 >= 0.0 {
            Self::NeedsWork
        } else {
            Self::Poor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{mae, r2_score, rmse, FitQuality};

    #[test]
    fn perfect_prediction_scores_one() {
        let actual = [60.0, 70.0, 80.0];
        assert_eq!(r2_score(&actual, &actual), 1.0);
        assert_eq!(rmse(&actual, &actual), 0.0);
    }

    #[test]
    fn mean_prediction_scores_zero() {
        let actual = [60.0, 70.0, 80.0];
        let predicted = [70.0, 70.0, 70.0];
        assert!(r2_score(&actual, &predicted).abs() < 1e-12);
        assert!((mae(&actual, &predicted) - 20.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn constant_target_does_not_divide_by_zero() {
        assert_eq!(r2_score(&[75.0], &[75.0]), 1.0);
        assert_eq!(r2_score(&[75.0], &[70.0]), 0.0);
    }

    #[test]
    fn quality_bands() {
        assert_eq!(FitQuality::from_r2(0.85), FitQuality::Excellent);
        assert_eq!(FitQuality::from_r2(0.0), FitQuality::NeedsWork);
        assert_eq!(FitQuality::from_r2(-0.1), FitQuality::Poor);
    }
}
