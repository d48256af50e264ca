use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use studylog_core::config::PredictionConfig;
use studylog_core::ml::features::{feature_names, FEATURE_NAMES};
use studylog_core::ml::linear::LinearModel;
use studylog_core::ml::pipeline::{GradePredictor, PredictionError, TrainedModel};
use studylog_core::ml::regressor::Regressor;
use studylog_core::ml::scaler::StandardScaler;
use studylog_core::model::date::RecordDate;
use studylog_core::model::grade::{GradeKind, GradeRecord};
use studylog_core::repo::study_repo::{GradeRepository, JsonStudyRepository, GRADES_FILE};
use studylog_core::stats::aggregate::weighted_mean;
use studylog_core::stats::required::{
    solve_required_score, RequiredScoreInput, RequiredScoreOutcome,
};
use studylog_core::stats::trend::index_slope;

fn weekly(scores: &[f64]) -> Vec<GradeRecord> {
    let start = NaiveDate::from_ymd_opt(2025, 1, 6).expect("valid start date");
    scores
        .iter()
        .enumerate()
        .map(|(index, score)| {
            let date = start + Duration::days(7 * index as i64);
            GradeRecord::new(RecordDate::from_date(date), GradeKind::Test, *score, 1.0)
                .expect("valid grade record")
        })
        .collect()
}

/// Linear model over unscaled features: `intercept + Σ weight·feature`.
fn linear_model(intercept: f64, weights: &[(usize, f64)]) -> TrainedModel {
    let mut coefficients = vec![0.0; FEATURE_NAMES.len()];
    for (index, weight) in weights {
        coefficients[*index] = *weight;
    }
    TrainedModel {
        subject: "Math".to_string(),
        regressor: Regressor::LinearRegression(LinearModel {
            coefficients,
            intercept,
            alpha: 0.0,
        }),
        scaler: StandardScaler {
            means: vec![0.0; FEATURE_NAMES.len()],
            scales: vec![1.0; FEATURE_NAMES.len()],
        },
        feature_names: feature_names(),
        sample_count: 6,
        test_r2: 0.0,
        trained_at: trained_at(),
    }
}

fn trained_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 1)
        .and_then(|date| date.and_hms_opt(12, 0, 0))
        .expect("valid training timestamp")
}

#[test]
fn weighted_mean_weights_each_score() {
    let mean = weighted_mean(&[(80.0, 1.0), (90.0, 2.0)]).expect("positive weight sum");
    assert_relative_eq!(mean, 86.666_666, epsilon = 1e-4);
    assert_eq!((mean * 100.0).round() / 100.0, 86.67);
}

#[test]
fn required_score_boundary_is_achievable_and_above_is_impossible() {
    let boundary = RequiredScoreInput {
        current_weighted_sum: 260.0,
        current_total_weight: 3.0,
        target: 90.0,
        remaining: 1,
        weight_each: 1.0,
    };
    let outcome = solve_required_score(&boundary).expect("boundary input is valid");
    assert!(matches!(outcome, RequiredScoreOutcome::Achievable { .. }));
    assert_relative_eq!(outcome.required(), 100.0);

    let out_of_reach = RequiredScoreInput {
        target: 95.0,
        ..boundary
    };
    let outcome = solve_required_score(&out_of_reach).expect("input is valid");
    assert!(matches!(outcome, RequiredScoreOutcome::Impossible { .. }));
    assert_relative_eq!(outcome.required(), 120.0);
}

#[test]
fn ols_slope_tracks_direction() {
    assert!(index_slope(&[60.0, 65.0, 70.0, 75.0, 80.0]) > 0.0);
    assert_relative_eq!(index_slope(&[70.0; 5]), 0.0, epsilon = 1e-9);
}

#[test]
fn forecasts_stay_within_score_range() {
    let scores = [78.0, 82.0, 85.0, 88.0, 91.0, 93.0, 95.0, 97.0, 98.0, 99.0, 100.0, 100.0];
    let records = weekly(&scores);
    let predictor = GradePredictor::default();
    let outcome = predictor
        .train("Math", &records, trained_at())
        .expect("twelve records train");

    let forecast = predictor
        .forecast(&outcome.model, &records, 5)
        .expect("forecast five steps");
    assert_eq!(forecast.points.len(), 5);
    for point in &forecast.points {
        assert!((0.0..=100.0).contains(&point.score), "score {}", point.score);
        assert!(point.lower >= 0.0 && point.upper <= 100.0);
        assert!(point.lower <= point.score && point.score <= point.upper);
    }
    assert!(forecast.points.windows(2).all(|pair| pair[0].date < pair[1].date));
}

#[test]
fn out_of_range_regressor_output_is_clamped() {
    let records = weekly(&[70.0, 72.0, 75.0, 78.0, 80.0]);
    let predictor = GradePredictor::default();

    let high = predictor
        .forecast(&linear_model(500.0, &[]), &records, 3)
        .expect("forecast with high intercept");
    for point in &high.points {
        assert_eq!(point.score, 100.0);
        assert_eq!(point.upper, 100.0);
        assert_relative_eq!(point.lower, 90.2, epsilon = 1e-9);
    }

    let low = predictor
        .forecast(&linear_model(-500.0, &[]), &records, 3)
        .expect("forecast with low intercept");
    for point in &low.points {
        assert_eq!(point.score, 0.0);
        assert_eq!(point.lower, 0.0);
        assert_relative_eq!(point.upper, 9.8, epsilon = 1e-9);
    }
}

#[test]
fn synthetic_history_keeps_unrounded_predictions() {
    let records = weekly(&[70.0, 74.0, 80.0]);
    let max_index = FEATURE_NAMES
        .iter()
        .position(|name| *name == "max")
        .expect("max feature present");
    let model = linear_model(0.26, &[(max_index, 1.0)]);

    let forecast = GradePredictor::default()
        .forecast(&model, &records, 3)
        .expect("forecast from max feature");
    let scores: Vec<f64> = forecast.points.iter().map(|point| point.score).collect();
    assert_eq!(scores, vec![80.3, 80.5, 80.8]);
}

#[test]
fn horizon_outside_configured_bound_is_rejected() {
    let records = weekly(&[70.0, 72.0, 75.0, 78.0, 80.0]);
    let predictor = GradePredictor::new(PredictionConfig {
        max_horizon: 10,
        ..PredictionConfig::default()
    });
    let model = linear_model(75.0, &[]);

    for horizon in [0, 11, usize::MAX] {
        let err = predictor
            .forecast(&model, &records, horizon)
            .expect_err("horizon out of bounds");
        assert!(matches!(
            err,
            PredictionError::InvalidHorizon { requested, max: 10 } if requested == horizon
        ));
        assert_eq!(err.code(), "invalid_horizon");
    }
    let forecast = predictor
        .forecast(&model, &records, 10)
        .expect("horizon at the bound");
    assert_eq!(forecast.points.len(), 10);
}

#[test]
fn training_with_too_few_records_fails() {
    let records = weekly(&[70.0, 72.0, 75.0, 78.0]);
    let err = GradePredictor::default()
        .train("Math", &records, trained_at())
        .expect_err("four records are too few");
    assert!(matches!(err, PredictionError::InsufficientData { .. }));
    assert_eq!(err.code(), "insufficient_data");
}

#[test]
fn load_then_save_preserves_content() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let raw = serde_json::json!({
        "Math": [
            {"date": "2025-04-01", "type": "test", "score": 82.5, "weight": 2.0, "comment": "unit 1"},
            {"date": "2025-04-08 09:15:00", "type": "assignment", "score": 91.0, "weight": 1.0, "comment": ""}
        ],
        "English": [
            {"date": "2025-04-02", "type": "quiz", "score": 64.0, "weight": 0.5, "comment": ""},
            {"date": "2025-04-03T10:00:00", "type": "test", "score": 71.5, "weight": 1.0, "comment": ""}
        ]
    });
    std::fs::write(
        dir.path().join(GRADES_FILE),
        serde_json::to_string_pretty(&raw).expect("serialize fixture"),
    )
    .expect("write grades fixture");

    let repo = JsonStudyRepository::new(dir.path());
    let first = repo.load_grades().expect("load grades");
    repo.save_grades(&first).expect("save grades");
    let second = repo.load_grades().expect("reload grades");
    assert_eq!(first, second);

    let text = std::fs::read_to_string(dir.path().join(GRADES_FILE)).expect("read grades file");
    let rewritten: serde_json::Value = serde_json::from_str(&text).expect("parse grades file");
    assert_eq!(rewritten, raw);
}
