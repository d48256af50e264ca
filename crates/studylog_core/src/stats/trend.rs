//! Trend detection over score sequences.
//!
//! # Responsibility
//! - Ordinary-least-squares line fits over record index or elapsed days.
//! - Window comparison of the most recent records against the ones before.
//!
//! # Invariants
//! - Fewer than two points yields no fit; `index_slope` reports `0.0`.
//! - A constant x axis (all points on one day) yields no fit.

use crate::model::grade::GradeRecord;
use serde::Serialize;

/// Slope magnitude (points per record) separating stable from moving.
pub const TREND_SLOPE_THRESHOLD: f64 = 1.0;
/// Default window for the recent-vs-previous comparison.
pub const RECENT_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
}

impl TrendDirection {
    pub fn from_slope(slope: f64) -> Self {
        if slope > TREND_SLOPE_THRESHOLD {
            Self::Improving
        } else if slope < -TREND_SLOPE_THRESHOLD {
            Self::Declining
        } else {
            Self::Stable
        }
    }
}

/// Recent window mean compared with the window right before it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowComparison {
    pub recent_mean: f64,
    pub previous_mean: f64,
    pub delta: f64,
}

/// Least-squares line through `(xs[i], ys[i])`.
pub fn ols_fit(xs: &[f64], ys: &[f64]) -> Option<LinearFit> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let r_squared = if syy == 0.0 {
        1.0
    } else {
        (sxy * sxy) / (sxx * syy)
    };
    Some(LinearFit {
        slope,
        intercept,
        r_squared,
    })
}

/// Fit over record index `0..n`.
pub fn index_fit(scores: &[f64]) -> Option<LinearFit> {
    let xs: Vec<f64> = (0..scores.len()).map(|index| index as f64).collect();
    ols_fit(&xs, scores)
}

/// OLS slope over record index; `0.0` when undefined.
pub fn index_slope(scores: &[f64]) -> f64 {
    index_fit(scores).map_or(0.0, |fit| fit.slope)
}

/// Fit over elapsed days since the earliest record (points per day).
pub fn days_fit(records: &[GradeRecord]) -> Option<LinearFit> {
    let first = records.iter().map(|record| record.date).min()?;
    let xs: Vec<f64> = records
        .iter()
        .map(|record| record.date.days_since(&first))
        .collect();
    let ys: Vec<f64> = records.iter().map(|record| record.score).collect();
    ols_fit(&xs, &ys)
}

/// Compares the last `window` scores with the `window` before them.
///
/// Needs at least `window + 1` scores; the previous window may be shorter
/// than `window` when history is short.
pub fn recent_vs_previous(scores: &[f64], window: usize) -> Option<WindowComparison> {
    if window == 0 || scores.len() <= window {
        return None;
    }
    let split = scores.len() - window;
    let previous_start = split.saturating_sub(window);
    let recent = &scores[split..];
    let previous = &scores[previous_start..split];
    let recent_mean = recent.iter().sum::<f64>() / recent.len() as f64;
    let previous_mean = previous.iter().sum::<f64>() / previous.len() as f64;
    Some(WindowComparison {
        recent_mean,
        previous_mean,
        delta: recent_mean - previous_mean,
    })
}

#[cfg(test)]
mod tests {
    use super::{index_fit, recent_vs_previous, TrendDirection};

    #[test]
    fn perfect_line_has_unit_r_squared() {
        let fit = index_fit(&[10.0, 20.0, 30.0]).expect("index fit succeeds");
        assert!((fit.slope - 10.0).abs() < 1e-12);
        assert!((fit.intercept - 10.0).abs() < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
        assert!((fit.predict(3.0) - 40.0).abs() < 1e-12);
    }

    #[test]
    fn window_comparison_uses_trailing_windows() {
        let scores = [50.0, 50.0, 50.0, 50.0, 50.0, 70.0, 70.0, 70.0, 70.0, 70.0];
        let cmp = recent_vs_previous(&scores, 5).expect("recent vs previous succeeds");
        assert_eq!(cmp.recent_mean, 70.0);
        assert_eq!(cmp.previous_mean, 50.0);
        assert_eq!(cmp.delta, 20.0);
        assert!(recent_vs_previous(&scores[..5], 5).is_none());
    }

    #[test]
    fn direction_threshold_is_exclusive() {
        assert_eq!(TrendDirection::from_slope(1.0), TrendDirection::Stable);
        assert_eq!(TrendDirection::from_slope(1.5), TrendDirection::Improving);
        assert_eq!(TrendDirection::from_slope(-2.0), TrendDirection::Declining);
    }
}
