//! Required-score solver and final-average projections.
//!
//! # Responsibility
//! - Solve for the uniform score the remaining assessments need so the
//!   final weighted average reaches a target.
//! - Project final averages from estimated or resampled future scores.
//!
//! # Invariants
//! - `x = (T·(W + n·w) − S) / (n·w)` for current weighted sum `S`, total
//!   weight `W`, target `T`, `n` remaining assessments of weight `w`.
//! - `x` above 100 is impossible; the target is already achieved when the
//!   current average alone meets it.
//! - Bootstrap projections are deterministic for a given seed.

use crate::model::grade::GradeRecord;
use crate::model::validation::MAX_SCORE;
use crate::stats::aggregate::{mean, weighted_mean, weighted_totals};
use crate::stats::trend::index_fit;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Inputs of the required-score equation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequiredScoreInput {
    pub current_weighted_sum: f64,
    pub current_total_weight: f64,
    pub target: f64,
    pub remaining: u32,
    pub weight_each: f64,
}

impl RequiredScoreInput {
    /// Builds inputs from recorded grades.
    pub fn from_records(
        records: &[GradeRecord],
        target: f64,
        remaining: u32,
        weight_each: f64,
    ) -> Self {
        let pairs: Vec<(f64, f64)> = records.iter().map(GradeRecord::scored_weight).collect();
        let (current_weighted_sum, current_total_weight) = weighted_totals(&pairs);
        Self {
            current_weighted_sum,
            current_total_weight,
            target,
            remaining,
            weight_each,
        }
    }

    pub fn current_average(&self) -> Option<f64> {
        if self.current_total_weight > 0.0 {
            Some(self.current_weighted_sum / self.current_total_weight)
        } else {
            None
        }
    }
}

/// How hard an achievable required score is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    VeryHard,
    Hard,
    Moderate,
    FairlyEasy,
    Easy,
}

impl Difficulty {
    pub fn from_required(required: f64) -> Self {
        if required >= 95.0 {
            Self::VeryHard
        } else if required >= 85.0 {
            Self::Hard
        } else if required >= 75.0 {
            Self::Moderate
        } else if required >= 60.0 {
            Self::FairlyEasy
        } else {
            Self::Easy
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RequiredScoreOutcome {
    AlreadyAchieved { required: f64, current_average: f64 },
    Achievable { required: f64, difficulty: Difficulty },
    Impossible { required: f64 },
}

impl RequiredScoreOutcome {
    pub fn required(&self) -> f64 {
        match self {
            Self::AlreadyAchieved { required, .. }
            | Self::Achievable { required, .. }
            | Self::Impossible { required } => *required,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequiredScoreError {
    NoRemainingAssessments,
    NonPositiveWeight(f64),
    TargetOutOfRange(f64),
    NegativeCurrentWeight(f64),
}

impl Display for RequiredScoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoRemainingAssessments => {
                write!(f, "at least one remaining assessment is required")
            }
            Self::NonPositiveWeight(value) => {
                write!(f, "remaining assessment weight {value} must be positive")
            }
            Self::TargetOutOfRange(value) => {
                write!(f, "target {value} must be within 0..={MAX_SCORE}")
            }
            Self::NegativeCurrentWeight(value) => {
                write!(f, "current total weight {value} must not be negative")
            }
        }
    }
}

impl Error for RequiredScoreError {}

/// Solves the required-score equation.
pub fn solve_required_score(
    input: &RequiredScoreInput,
) -> Result<RequiredScoreOutcome, RequiredScoreError> {
    if input.remaining == 0 {
        return Err(RequiredScoreError::NoRemainingAssessments);
    }
    if !(input.weight_each.is_finite() && input.weight_each > 0.0) {
        return Err(RequiredScoreError::NonPositiveWeight(input.weight_each));
    }
    if !(0.0..=MAX_SCORE).contains(&input.target) {
        return Err(RequiredScoreError::TargetOutOfRange(input.target));
    }
    if input.current_total_weight < 0.0 {
        return Err(RequiredScoreError::NegativeCurrentWeight(
            input.current_total_weight,
        ));
    }

    let future_weight = f64::from(input.remaining) * input.weight_each;
    let total_weight = input.current_total_weight + future_weight;
    let required = (input.target * total_weight - input.current_weighted_sum) / future_weight;

    if let Some(current_average) = input.current_average() {
        if required <= current_average {
            return Ok(RequiredScoreOutcome::AlreadyAchieved {
                required,
                current_average,
            });
        }
    } else if required <= 0.0 {
        return Ok(RequiredScoreOutcome::AlreadyAchieved {
            required,
            current_average: 0.0,
        });
    }

    if required > MAX_SCORE {
        return Ok(RequiredScoreOutcome::Impossible { required });
    }
    Ok(RequiredScoreOutcome::Achievable {
        required,
        difficulty: Difficulty::from_required(required),
    })
}

/// Final weighted average if every remaining assessment scores `future_score`.
pub fn project_final_average(
    current_weighted_sum: f64,
    current_total_weight: f64,
    remaining: u32,
    weight_each: f64,
    future_score: f64,
) -> Option<f64> {
    let future_weight = f64::from(remaining) * weight_each;
    let total_weight = current_total_weight + future_weight;
    if total_weight <= 0.0 {
        return None;
    }
    Some((current_weighted_sum + future_weight * future_score) / total_weight)
}

/// How to estimate the score of upcoming assessments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FutureScoreMethod {
    /// Keep the current weighted average.
    KeepAverage,
    /// Extend the OLS line over record index by one step.
    LinearTrend,
    /// Mean of the last three records.
    RecentAverage,
}

/// Estimates the next score from chronologically ordered records.
pub fn estimate_future_score(records: &[GradeRecord], method: FutureScoreMethod) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = records.iter().map(GradeRecord::scored_weight).collect();
    let scores: Vec<f64> = records.iter().map(|record| record.score).collect();
    let average = weighted_mean(&pairs).or_else(|| mean(&scores))?;

    let estimate = match method {
        FutureScoreMethod::KeepAverage => average,
        FutureScoreMethod::LinearTrend => match index_fit(&scores) {
            Some(fit) => fit.predict(scores.len() as f64).clamp(0.0, MAX_SCORE),
            None => average,
        },
        FutureScoreMethod::RecentAverage => {
            let start = scores.len().saturating_sub(3);
            mean(&scores[start..])?
        }
    };
    Some(estimate)
}

/// One row of the what-if table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scenario {
    pub label: &'static str,
    pub future_score: f64,
    pub final_average: f64,
    pub delta_from_current: f64,
}

/// Final averages for fixed optimistic/pessimistic scores plus the estimate.
pub fn scenario_table(
    records: &[GradeRecord],
    remaining: u32,
    weight_each: f64,
    predicted: f64,
) -> Vec<Scenario> {
    let pairs: Vec<(f64, f64)> = records.iter().map(GradeRecord::scored_weight).collect();
    let (weighted_sum, total_weight) = weighted_totals(&pairs);
    let current = weighted_mean(&pairs).unwrap_or(0.0);
    let candidates = [
        ("optimistic", 95.0),
        ("good", 85.0),
        ("predicted", predicted),
        ("weak", 70.0),
        ("pessimistic", 60.0),
    ];

    candidates
        .iter()
        .filter_map(|(label, score)| {
            project_final_average(weighted_sum, total_weight, remaining, weight_each, *score).map(
                |final_average| Scenario {
                    label: *label,
                    future_score: *score,
                    final_average,
                    delta_from_current: final_average - current,
                },
            )
        })
        .collect()
}

/// Resampled distribution of final averages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BootstrapProjection {
    pub iterations: usize,
    /// Share of resamples whose final average reaches the target.
    pub probability_of_target: f64,
    pub p05: f64,
    pub p50: f64,
    pub p95: f64,
}

/// Resamples historical scores (with replacement) for each remaining
/// assessment and reports the spread of resulting final averages.
pub fn bootstrap_final_average(
    records: &[GradeRecord],
    target: f64,
    remaining: u32,
    weight_each: f64,
    iterations: usize,
    seed: u64,
) -> Option<BootstrapProjection> {
    if records.is_empty() || iterations == 0 || remaining == 0 || weight_each <= 0.0 {
        return None;
    }
    let pairs: Vec<(f64, f64)> = records.iter().map(GradeRecord::scored_weight).collect();
    let scores: Vec<f64> = records.iter().map(|record| record.score).collect();
    let (weighted_sum, total_weight) = weighted_totals(&pairs);
    let future_weight = f64::from(remaining) * weight_each;
    let denominator = total_weight + future_weight;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut finals = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let mut future_sum = 0.0;
        for _ in 0..remaining {
            future_sum += scores.choose(&mut rng).copied().unwrap_or(0.0) * weight_each;
        }
        finals.push((weighted_sum + future_sum) / denominator);
    }

    let hits = finals.iter().filter(|value| **value >= target).count();
    finals.sort_by(f64::total_cmp);
    Some(BootstrapProjection {
        iterations,
        probability_of_target: hits as f64 / iterations as f64,
        p05: percentile(&finals, 0.05),
        p50: percentile(&finals, 0.50),
        p95: percentile(&finals, 0.95),
    })
}

/// Nearest-rank percentile over an ascending slice.
fn percentile(sorted: &[f64], fraction: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (fraction * (sorted.len() - 1) as f64).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::{
        solve_required_score, Difficulty, RequiredScoreError, RequiredScoreInput,
        RequiredScoreOutcome,
    };

    fn input(sum: f64, weight: f64, target: f64, remaining: u32, each: f64) -> RequiredScoreInput {
        RequiredScoreInput {
            current_weighted_sum: sum,
            current_total_weight: weight,
            target,
            remaining,
            weight_each: each,
        }
    }

    #[test]
    fn achieved_when_current_average_meets_target() {
        let outcome = solve_required_score(&input(260.0, 3.0, 80.0, 1, 1.0)).expect("solve required score succeeds");
        assert!(matches!(outcome, RequiredScoreOutcome::AlreadyAchieved { .. }));
    }

    #[test]
    fn moderate_requirement_is_achievable() {
        // (80·4 − 230) / 1 = 90
        let outcome = solve_required_score(&input(230.0, 3.0, 80.0, 1, 1.0)).expect("solve required score succeeds");
        assert_eq!(
            outcome,
            RequiredScoreOutcome::Achievable {
                required: 90.0,
                difficulty: Difficulty::Hard,
            }
        );
    }

    #[test]
    fn rejects_zero_remaining() {
        let err = solve_required_score(&input(0.0, 0.0, 80.0, 0, 1.0)).expect_err("solve required score must fail");
        assert_eq!(err, RequiredScoreError::NoRemainingAssessments);
    }

    #[test]
    fn empty_history_needs_target_itself() {
        let outcome = solve_required_score(&input(0.0, 0.0, 75.0, 2, 1.0)).expect("solve required score succeeds");
        assert_eq!(
            outcome,
            RequiredScoreOutcome::Achievable {
                required: 75.0,
                difficulty: Difficulty::Moderate,
            }
        );
    }
}
