use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use studylog_core::db::open_db;
use studylog_core::db::open_db_in_memory;
use studylog_core::ml::pipeline::GradePredictor;
use studylog_core::model::date::RecordDate;
use studylog_core::model::grade::{GradeKind, GradeRecord};
use studylog_core::repo::model_repo::{ModelRepository, ModelStoreError, SqliteModelRepository};

fn records() -> Vec<GradeRecord> {
    let start = NaiveDate::from_ymd_opt(2025, 1, 6).expect("valid start date");
    [62.0, 66.0, 65.0, 70.0, 73.0, 72.0, 77.0, 80.0, 79.0, 84.0]
        .iter()
        .enumerate()
        .map(|(index, score)| {
            let kind = if index % 3 == 0 {
                GradeKind::Assignment
            } else {
                GradeKind::Test
            };
            let date = start + Duration::days(10 * index as i64);
            GradeRecord::new(RecordDate::from_date(date), kind, *score, 1.0)
                .expect("valid grade record")
        })
        .collect()
}

fn at(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, day)
        .and_then(|date| date.and_hms_opt(8, 0, 0))
        .expect("valid timestamp")
}

#[test]
fn saved_model_reloads_and_predicts_identically() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("models.sqlite3");
    let predictor = GradePredictor::default();
    let history = records();
    let outcome = predictor
        .train("Math", &history, at(1))
        .expect("train on ten records");

    let model_id = {
        let conn = open_db(&path).expect("open model db");
        let repo = SqliteModelRepository::new(&conn);
        repo.save_model(&outcome.model).expect("save model")
    };

    let conn = open_db(&path).expect("reopen model db");
    let repo = SqliteModelRepository::new(&conn);
    let stored = repo
        .load_model("Math")
        .expect("load model")
        .expect("model stored");
    assert_eq!(stored.model_id, model_id);
    assert_eq!(stored.model.kind(), outcome.model.kind());
    assert_eq!(stored.model.feature_names, outcome.model.feature_names);

    let before = predictor
        .forecast(&outcome.model, &history, 3)
        .expect("forecast with trained model");
    let after = predictor
        .forecast(&stored.model, &history, 3)
        .expect("forecast with reloaded model");
    for (left, right) in before.points.iter().zip(&after.points) {
        assert_relative_eq!(left.score, right.score, epsilon = 1e-9);
    }
}

#[test]
fn saving_again_replaces_model_and_logs_runs() {
    let conn = open_db_in_memory().expect("open in-memory db");
    let repo = SqliteModelRepository::new(&conn);
    let predictor = GradePredictor::default();
    let history = records();

    let first = predictor.train("Math", &history, at(1)).expect("first training");
    let first_id = repo.save_model(&first.model).expect("save first model");
    repo.record_training_run(&first.report, at(1))
        .expect("record first run");

    let second = predictor.train("Math", &history, at(2)).expect("second training");
    let second_id = repo.save_model(&second.model).expect("save second model");
    repo.record_training_run(&second.report, at(2))
        .expect("record second run");

    assert_ne!(first_id, second_id);
    let models = repo.list_models().expect("list models");
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].model_id, second_id);
    assert_eq!(models[0].trained_at, at(2));

    let runs = repo.list_training_runs("Math").expect("list runs");
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].trained_at, at(2));
    assert_eq!(runs[0].sample_count, 8);
    assert!(runs[0].report.get("evaluations").is_some());

    assert!(repo.delete_model("Math").expect("delete model"));
    assert!(!repo.delete_model("Math").expect("delete missing model"));
    assert!(repo.load_model("Math").expect("load after delete").is_none());
}

#[test]
fn failed_run_insert_keeps_previous_model() {
    let conn = open_db_in_memory().expect("open in-memory db");
    let repo = SqliteModelRepository::new(&conn);
    let predictor = GradePredictor::default();
    let history = records();

    let first = predictor
        .train("Math", &history, at(1))
        .expect("first training");
    let (first_id, _) = repo
        .save_training(&first.model, &first.report, at(1))
        .expect("save first training");

    let second = predictor
        .train("Math", &history, at(2))
        .expect("second training");
    let mut broken = second.report.clone();
    broken.evaluations.clear();
    let err = repo
        .save_training(&second.model, &broken, at(2))
        .expect_err("report without best evaluation");
    assert!(matches!(err, ModelStoreError::InvalidData(_)));

    let stored = repo
        .load_model("Math")
        .expect("load model")
        .expect("previous model kept");
    assert_eq!(stored.model_id, first_id);
    assert_eq!(stored.model.trained_at, at(1));
    assert_eq!(repo.list_training_runs("Math").expect("list runs").len(), 1);
}
