use chrono::NaiveDate;
use studylog_core::integrity::{write_repaired, Entity, IntegrityChecker, IssueKind, RepairPolicy};
use studylog_core::model::goal::GoalHorizon;
use studylog_core::model::reminder::Recurrence;
use studylog_core::repo::study_repo::{
    GoalRepository, GradeRepository, JsonStudyRepository, ProfileRepository, ProgressRepository,
    ReminderRepository, SubjectRepository, GOALS_FILE, GRADES_FILE, PROFILE_FILE, PROGRESS_FILE,
    REMINDERS_FILE, SUBJECTS_FILE,
};

fn write(dir: &std::path::Path, name: &str, value: serde_json::Value) {
    let text = serde_json::to_string_pretty(&value).expect("serialize fixture");
    std::fs::write(dir.join(name), text).expect("write fixture");
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 1).expect("valid date")
}

#[test]
fn damaged_files_are_reported_then_repaired_on_request() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(dir.path(), SUBJECTS_FILE, serde_json::json!(["Math", " Math ", "Bio/Chem"]));
    write(
        dir.path(),
        GRADES_FILE,
        serde_json::json!({
            "Math": [
                {"date": "2025-06-01", "type": "test", "score": 105},
                {"date": "06/02/2025", "type": "test", "score": 80, "weight": -1}
            ]
        }),
    );
    write(
        dir.path(),
        PROGRESS_FILE,
        serde_json::json!({"Math": [{"date": "2025-06-01", "hours": -2, "task": "drill"}]}),
    );
    write(
        dir.path(),
        GOALS_FILE,
        serde_json::json!([
            {"subject": "Math", "horizon": "next_year", "text": "Pass the final", "deadline": "07/30"},
            {"subject": "Math", "horizon": "short_term", "text": ""}
        ]),
    );
    write(
        dir.path(),
        REMINDERS_FILE,
        serde_json::json!([
            {"subject": "Math", "type": "exam", "date": "2025-13-40", "text": "Final", "recurrence": "hourly"},
            {"subject": "Math", "type": "homework", "date": "2025-07-03", "text": "y".repeat(600)}
        ]),
    );
    write(
        dir.path(),
        PROFILE_FILE,
        serde_json::json!({"age": 3, "education_level": "high_school", "created_at": "2025-01-01T09:00:00", "updated_at": null}),
    );

    let repo = JsonStudyRepository::new(dir.path());
    assert!(repo.load_grades().is_err());
    assert!(repo
        .load_goals()
        .expect("migration skips unusable goals")
        .is_empty());
    assert!(repo.load_reminders().is_err());
    assert!(repo.load_profile().is_err());

    let report = IntegrityChecker::new(RepairPolicy::ReportOnly, today())
        .check_repository(&repo)
        .expect("report-only scan");
    assert!(!report.is_clean());
    assert!(report.repaired.is_none());
    assert!(!write_repaired(&repo, &report).expect("report-only write"));
    assert_eq!(report.issues_for(Entity::Subjects).count(), 2);
    assert!(report
        .issues
        .iter()
        .any(|issue| matches!(issue.kind, IssueKind::InvalidDate { .. })));
    assert!(report
        .issues_for(Entity::Reminders)
        .any(|issue| issue.kind == IssueKind::UnknownRecurrence { value: "hourly".into() }));
    assert!(report
        .issues_for(Entity::Goals)
        .any(|issue| issue.kind == IssueKind::BlankText));
    assert!(report
        .issues_for(Entity::Profile)
        .any(|issue| issue.kind == IssueKind::AgeOutOfRange { value: 3 }));

    let report = IntegrityChecker::new(RepairPolicy::Clamp, today())
        .check_repository(&repo)
        .expect("clamp scan");
    assert!(write_repaired(&repo, &report).expect("write repairs"));

    assert_eq!(repo.load_subjects().expect("subjects"), vec!["Math".to_string()]);
    let grades = repo.load_grades().expect("grades");
    let math = &grades["Math"];
    assert_eq!(math[0].score, 100.0);
    assert_eq!(math[1].weight, 1.0);
    assert_eq!(math[1].date.to_string(), "2025-07-01");
    let progress = repo.load_progress().expect("progress");
    assert_eq!(progress["Math"][0].hours, 0.0);

    let goals = repo.load_goals().expect("goals");
    assert_eq!(goals.len(), 1);
    assert_eq!(goals[0].horizon, GoalHorizon::ShortTerm);
    assert_eq!(goals[0].deadline, None);

    let reminders = repo.load_reminders().expect("reminders");
    assert_eq!(reminders.len(), 2);
    assert_eq!(reminders[0].date, today());
    assert_eq!(reminders[0].recurrence, Recurrence::None);
    assert_eq!(reminders[1].text.chars().count(), 500);

    let profile = repo.load_profile().expect("profile").expect("profile exists");
    assert_eq!(profile.age, Some(5));

    let recheck = IntegrityChecker::new(RepairPolicy::ReportOnly, today())
        .check_repository(&repo)
        .expect("recheck");
    assert!(recheck.is_clean(), "issues left: {:?}", recheck.issues);
}
