use chrono::{Duration, NaiveDate};
use studylog_core::config::StudyConfig;
use studylog_core::model::date::RecordDate;
use studylog_core::model::goal::{Goal, GoalHorizon, GoalStatus, GoalTarget};
use studylog_core::model::grade::{GradeKind, GradeRecord};
use studylog_core::model::progress::ProgressRecord;
use studylog_core::model::reminder::{Recurrence, Reminder};
use studylog_core::repo::study_repo::{GoalRepository, ReminderRepository, GOALS_FILE, REMINDERS_FILE};
use studylog_core::service::goal_service::{DeadlineStatus, ProgressBand, Recommendation};
use studylog_core::service::report_service::ReportPeriod;
use studylog_core::service::ServiceError;
use studylog_core::ml::pipeline::PredictionError;
use studylog_core::StudyApp;

fn day(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, m, d).expect("valid date")
}

fn app(dir: &tempfile::TempDir) -> StudyApp {
    let mut config = StudyConfig::default();
    config.storage.data_dir = dir.path().join("data");
    StudyApp::open_with_memory_models(config).expect("open with memory models succeeds")
}

fn grade(date: NaiveDate, score: f64) -> GradeRecord {
    GradeRecord::new(RecordDate::from_date(date), GradeKind::Test, score, 1.0).expect("valid grade")
}

#[test]
fn grade_goal_progress_uses_latest_score() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = app(&dir);
    app.subjects().add("Math").expect("add succeeds");
    app.grades().record_grade("Math", grade(day(5, 1), 60.0)).expect("record grade succeeds");
    app.grades().record_grade("Math", grade(day(5, 8), 72.0)).expect("record grade succeeds");

    let goal = Goal::new("Math", GoalHorizon::ShortTerm, "Reach 90 on the final")
        .expect("valid goal")
        .with_deadline(day(5, 14))
        .with_target(GoalTarget::Grade { points: 90.0 })
        .expect("valid target");
    let id = app.goals().add(goal).expect("add succeeds");

    let evaluations = app.goals().evaluate_active(day(5, 10)).expect("evaluate active succeeds");
    assert_eq!(evaluations.len(), 1);
    let evaluation = &evaluations[0];
    let progress = evaluation.progress.expect("grade target yields progress");
    assert_eq!(progress.current, 72.0);
    assert_eq!(progress.percentage, 80.0);
    assert_eq!(progress.band, ProgressBand::Almost);
    assert_eq!(
        evaluation.deadline,
        DeadlineStatus::Approaching { days_remaining: 4 }
    );
    assert_eq!(
        evaluation.recommendations,
        vec![
            Recommendation::AlmostThere,
            Recommendation::DailyPoints { per_day: 4.5 },
            Recommendation::ReviewWeakAreas,
        ]
    );

    app.goals().set_status(id, GoalStatus::Achieved).expect("set status succeeds");
    assert!(app.goals().evaluate_active(day(5, 10)).expect("evaluate active succeeds").is_empty());
}

#[test]
fn study_time_goal_sums_logged_hours() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = app(&dir);
    app.subjects().add("English").expect("add succeeds");
    for (offset, hours) in [(0, 2.0), (1, 1.5), (2, 3.0)] {
        let record = ProgressRecord::new(
            RecordDate::from_date(day(6, 1) + Duration::days(offset)),
            hours,
            "reading",
            4,
        )
        .expect("valid session");
        app.progress().log_session("English", record).expect("log session succeeds");
    }
    let goal = Goal::new("English", GoalHorizon::LongTerm, "Study 10 hours")
        .expect("valid goal")
        .with_target(GoalTarget::StudyTime { hours: 10.0 })
        .expect("valid target");
    let progress = app.goals().progress(&goal).expect("progress succeeds").expect("study-time target yields progress");
    assert!((progress.current - 6.5).abs() < 1e-9);
    assert_eq!(progress.band, ProgressBand::OnTrack);
}

#[test]
fn recurring_reminder_completion_schedules_next() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = app(&dir);
    app.subjects().add("Science").expect("add succeeds");
    let reminder = Reminder::new("Science", "homework", day(6, 2), "Lab worksheet")
        .expect("valid reminder")
        .with_recurrence(Recurrence::Weekly);
    let id = app.reminders().add(reminder).expect("add succeeds");

    let digest = app.reminders().digest(day(6, 1)).expect("digest succeeds");
    assert_eq!(digest.urgent.len(), 1);

    let next = app.reminders().complete(id).expect("complete succeeds").expect("weekly recurs");
    let all = app.reminders().list().expect("list succeeds");
    assert_eq!(all.len(), 2);
    let successor = all.iter().find(|reminder| reminder.id == next).expect("successor persisted");
    assert_eq!(successor.date, day(6, 9));
    assert!(!successor.completed);

    let digest = app.reminders().digest(day(6, 3)).expect("digest succeeds");
    assert!(digest.overdue.is_empty());
    assert!(digest.urgent.is_empty());
    assert_eq!(digest.upcoming.len(), 1);

    app.reminders().snooze(next, day(6, 20)).expect("snooze succeeds");
    assert!(app.reminders().digest(day(6, 3)).expect("digest succeeds").is_empty());
}

#[test]
fn reminders_without_ids_stay_addressable_across_loads() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = app(&dir);
    app.subjects().add("Science").expect("add subject");
    let stored = serde_json::json!([
        {"subject": "Science", "type": "homework", "date": "2025-06-02", "text": "Lab worksheet"},
        {"subject": "Science", "type": "homework", "date": "2025-06-02", "text": "Lab worksheet"},
        {"subject": "Science", "type": "exam", "date": "2025-06-20", "text": "Unit test"}
    ]);
    std::fs::write(
        app.config().storage.data_dir.join(REMINDERS_FILE),
        serde_json::to_string(&stored).expect("serialize reminders"),
    )
    .expect("write reminders file");

    let first = app.repository().load_reminders().expect("first load");
    let second = app.repository().load_reminders().expect("second load");
    assert_eq!(first, second);
    assert_ne!(first[0].id, first[1].id);

    let listed = app.reminders().list().expect("list reminders");
    let target = listed[2].id;
    assert_eq!(app.reminders().complete(target).expect("complete listed id"), None);

    let after = app.reminders().list().expect("list after completion");
    let completed = after
        .iter()
        .find(|reminder| reminder.id == target)
        .expect("completed reminder keeps its id");
    assert!(completed.completed);
    assert_eq!(after.iter().filter(|reminder| reminder.completed).count(), 1);
}

#[test]
fn goals_without_ids_stay_addressable_across_loads() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = app(&dir);
    app.subjects().add("Math").expect("add subject");
    let stored = serde_json::json!([
        {"subject": "Math", "horizon": "short_term", "text": "Finish workbook", "status": "in_progress"},
        {"subject": "Math", "horizon": "long_term", "text": "Pass the exam", "status": "in_progress"}
    ]);
    std::fs::write(
        app.config().storage.data_dir.join(GOALS_FILE),
        serde_json::to_string(&stored).expect("serialize goals"),
    )
    .expect("write goals file");

    let listed = app.goals().list(None).expect("list goals");
    assert_eq!(listed, app.goals().list(None).expect("list goals again"));
    let target = listed
        .iter()
        .find(|goal| goal.text == "Pass the exam")
        .expect("long-term goal")
        .id;
    app.goals()
        .set_status(target, GoalStatus::Achieved)
        .expect("update listed id");

    let reloaded = app.repository().load_goals().expect("reload goals");
    let updated = reloaded
        .iter()
        .find(|goal| goal.id == target)
        .expect("goal keeps its id");
    assert_eq!(updated.status, GoalStatus::Achieved);
}

#[test]
fn deadline_reminders_skip_past_dates() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = app(&dir);
    app.subjects().add("History").expect("add succeeds");
    let created = app
        .reminders()
        .schedule_before_deadline("History", "exam", day(6, 10), "Final exam", &[7, 3, 1], day(6, 5))
        .expect("schedule before deadline succeeds");
    assert_eq!(created.len(), 2);
}

#[test]
fn removing_a_subject_cascades() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = app(&dir);
    app.subjects().add("Math").expect("add succeeds");
    app.subjects().add("Art").expect("add succeeds");
    app.grades().record_grade("Math", grade(day(5, 1), 70.0)).expect("record grade succeeds");
    app.goals()
        .add(Goal::new("Math", GoalHorizon::ShortTerm, "Finish unit 2").expect("valid goal"))
        .expect("add succeeds");

    app.subjects().rename("Math", "Mathematics").expect("rename succeeds");
    assert_eq!(app.grades().grades_for("Mathematics").expect("grades for succeeds").len(), 1);
    assert_eq!(app.goals().list(Some("Mathematics")).expect("list succeeds").len(), 1);

    app.subjects().remove("Mathematics").expect("remove succeeds");
    assert_eq!(app.subjects().list().expect("list succeeds"), vec!["Art".to_string()]);
    assert!(app.grades().grades_for("Mathematics").expect("grades for succeeds").is_empty());
    assert!(app.goals().list(None).expect("list succeeds").is_empty());

    let err = app.subjects().remove("Mathematics").expect_err("remove must fail");
    assert!(matches!(err, ServiceError::UnknownSubject(_)));
}

#[test]
fn legacy_goal_file_is_migrated_on_read() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = app(&dir);
    let legacy = serde_json::json!({
        "Math": {"short_term": ["Finish workbook", {"goal": "Score 80", "status": "achieved"}]}
    });
    std::fs::write(
        app.config().storage.data_dir.join(GOALS_FILE),
        serde_json::to_string(&legacy).expect("serializable"),
    )
    .expect("writable file");

    let goals = app.repository().load_goals().expect("load goals succeeds");
    assert_eq!(goals.len(), 2);
    assert!(goals.iter().any(|goal| goal.status == GoalStatus::Achieved));
}

#[test]
fn training_and_forecasting_round_trip_through_the_app() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = app(&dir);
    app.subjects().add("Math").expect("add succeeds");

    let err = app.predictions().forecast("Math", None).expect_err("forecast must fail");
    assert!(matches!(
        err,
        ServiceError::Prediction(PredictionError::ModelNotFound(_))
    ));

    let scores = [61.0, 64.0, 63.0, 68.0, 70.0, 69.0, 74.0, 76.0];
    for (index, score) in scores.iter().enumerate() {
        let date = day(4, 1) + Duration::days(7 * index as i64);
        app.grades().record_grade("Math", grade(date, *score)).expect("record grade succeeds");
    }
    let trained_at = day(6, 1).and_hms_opt(9, 0, 0).expect("valid time");
    let summary = app.predictions().train("Math", trained_at).expect("train succeeds");
    assert_eq!(summary.report.diagnosis.total_samples, 6);
    assert_eq!(summary.report.evaluations.len(), 4);

    let forecast = app.predictions().forecast("Math", None).expect("forecast succeeds");
    assert_eq!(forecast.points.len(), 3);
    assert_eq!(app.predictions().models().expect("models succeeds").len(), 1);
    assert_eq!(app.predictions().history("Math").expect("history succeeds").len(), 1);
}

#[test]
fn weekly_report_covers_the_calendar_week() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = app(&dir);
    app.subjects().add("Math").expect("add math");
    app.subjects().add("Biology").expect("add biology");
    // 2025-06-12 is a Thursday; the week is 06-09 through 06-15.
    app.grades().record_grade("Math", grade(day(6, 9), 70.0)).expect("grade recorded");
    app.grades().record_grade("Math", grade(day(6, 11), 90.0)).expect("grade recorded");
    app.grades().record_grade("Biology", grade(day(6, 15), 60.0)).expect("grade recorded");
    app.grades().record_grade("Biology", grade(day(6, 8), 10.0)).expect("grade recorded");
    for (subject, date, hours) in [("Math", day(6, 10), 3.0), ("Biology", day(6, 12), 1.0), ("Math", day(6, 1), 5.0)] {
        let session = ProgressRecord::new(RecordDate::from_date(date), hours, "review", 3)
            .expect("valid session");
        app.progress().log_session(subject, session).expect("session logged");
    }
    app.goals()
        .add(Goal::new("Math", GoalHorizon::ShortTerm, "Finish unit 4").expect("valid goal"))
        .expect("goal added");
    app.reminders()
        .add(Reminder::new("Biology", "homework", day(6, 10), "Lab sheet").expect("valid reminder"))
        .expect("reminder added");

    let report = app
        .reports()
        .build(ReportPeriod::Weekly, day(6, 12))
        .expect("report built");
    assert_eq!((report.start, report.end), (day(6, 9), day(6, 15)));

    let overview = report.grades.as_ref().expect("grades in week");
    assert_eq!(overview.count, 3);
    assert_eq!(overview.mean, 220.0 / 3.0);
    assert_eq!((overview.min, overview.max), (60.0, 90.0));
    let subjects: Vec<(&str, usize)> = report
        .subject_grades
        .iter()
        .map(|entry| (entry.subject.as_str(), entry.count))
        .collect();
    assert_eq!(subjects, [("Biology", 1), ("Math", 2)]);

    assert_eq!(report.total_hours, 4.0);
    assert_eq!(report.subject_time[0].subject, "Math");
    assert_eq!(report.subject_time[0].percentage, 75.0);
    assert_eq!(report.subject_time[1].percentage, 25.0);
    assert_eq!(report.active_goals.len(), 1);
    assert_eq!(report.overdue_reminders.len(), 1);

    let text = report.render_text();
    assert!(text.contains("Weekly study report"));
    assert!(text.contains("Period: 2025-06-09 to 2025-06-15"));
    assert!(text.contains("  - Math: 3.0 h (75.0%)"));
    assert!(text.contains("  - Lab sheet (due 2025-06-10)"));
}
