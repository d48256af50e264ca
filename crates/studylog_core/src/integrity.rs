//! Integrity scan over raw data-directory documents.
//!
//! # Responsibility
//! - Inspect every data file (subjects, grades, progress, goals, reminders
//!   and the profile) as raw JSON so that records the typed repositories
//!   would reject are still reported.
//! - Optionally produce repaired documents under an explicit policy.
//!
//! # Invariants
//! - `RepairPolicy::ReportOnly` never produces repaired documents.
//! - Orphan records are reported, never dropped or reassigned.
//! - Repaired documents deserialize with the typed repositories, except
//!   for orphan keys which the repositories accept.
//! - Nested legacy goal documents are left for the repository to migrate.

use crate::model::date::{RecordDate, DATE_FORMAT};
use crate::model::goal::{GoalHorizon, GoalStatus, GoalTarget};
use crate::model::grade::GradeKind;
use crate::model::profile::EducationLevel;
use crate::model::reminder::Recurrence;
use crate::model::validation::{
    validate_subject_name, MAX_AGE, MAX_DAILY_HOURS, MAX_MOTIVATION, MAX_REMINDER_CHARS,
    MAX_SCORE, MAX_WEIGHT, MIN_AGE, MIN_MOTIVATION,
};
use crate::repo::json_store::StoreResult;
use crate::repo::study_repo::{
    JsonStudyRepository, GOALS_FILE, GRADES_FILE, PROFILE_FILE, PROGRESS_FILE, REMINDERS_FILE,
    SUBJECTS_FILE,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairPolicy {
    #[default]
    ReportOnly,
    /// Clamp numbers into range, default missing or malformed fields, drop
    /// unusable entries.
    Clamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Subjects,
    Grades,
    Progress,
    Goals,
    Reminders,
    Profile,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum IssueKind {
    MalformedDocument,
    InvalidSubjectName { name: String },
    DuplicateSubject { name: String },
    MalformedRecord,
    ScoreOutOfRange { value: f64 },
    MissingScore,
    InvalidDate { value: String },
    UnknownKind { value: String },
    InvalidWeight { value: f64 },
    HoursOutOfRange { value: f64 },
    MissingHours,
    MotivationOutOfRange { value: i64 },
    OrphanRecords { count: usize },
    /// Goal or reminder naming a subject missing from `subjects.json`.
    OrphanSubject { name: String },
    BlankText,
    TextTooLong { chars: usize },
    UnknownRecurrence { value: String },
    UnknownHorizon { value: String },
    UnknownStatus { value: String },
    InvalidTarget,
    InvalidId { value: String },
    LegacyGoalDocument,
    AgeOutOfRange { value: i64 },
    InvalidAge,
    UnknownEducationLevel { value: String },
    InvalidTimestamp { field: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairAction {
    Clamped,
    Defaulted,
    Dropped,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegrityIssue {
    pub entity: Entity,
    pub subject: Option<String>,
    pub index: Option<usize>,
    pub kind: IssueKind,
    /// What the checker did about it; `None` under `ReportOnly`.
    pub action: Option<RepairAction>,
}

/// Raw documents of one data directory; `None` stands for a missing file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDocuments {
    pub subjects: Option<Value>,
    pub grades: Option<Value>,
    pub progress: Option<Value>,
    pub goals: Option<Value>,
    pub reminders: Option<Value>,
    pub profile: Option<Value>,
}

impl RawDocuments {
    pub fn load(repo: &JsonStudyRepository) -> StoreResult<Self> {
        Ok(Self {
            subjects: repo.file(SUBJECTS_FILE).load_value()?,
            grades: repo.file(GRADES_FILE).load_value()?,
            progress: repo.file(PROGRESS_FILE).load_value()?,
            goals: repo.file(GOALS_FILE).load_value()?,
            reminders: repo.file(REMINDERS_FILE).load_value()?,
            profile: repo.file(PROFILE_FILE).load_value()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairedData {
    pub subjects: Value,
    pub grades: Value,
    pub progress: Value,
    pub goals: Value,
    pub reminders: Value,
    /// `None` when no profile file exists.
    pub profile: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegrityReport {
    pub issues: Vec<IntegrityIssue>,
    pub repaired: Option<RepairedData>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues_for(&self, entity: Entity) -> impl Iterator<Item = &IntegrityIssue> {
        self.issues.iter().filter(move |issue| issue.entity == entity)
    }
}

pub struct IntegrityChecker {
    policy: RepairPolicy,
    today: NaiveDate,
}

impl IntegrityChecker {
    /// `today` replaces malformed dates under `RepairPolicy::Clamp`.
    pub fn new(policy: RepairPolicy, today: NaiveDate) -> Self {
        Self { policy, today }
    }

    pub fn policy(&self) -> RepairPolicy {
        self.policy
    }

    pub fn check(&self, documents: &RawDocuments) -> IntegrityReport {
        let mut scan = Scan {
            policy: self.policy,
            today: self.today,
            issues: Vec::new(),
        };
        let subjects = scan.subjects(documents.subjects.as_ref());
        let known: BTreeSet<String> = subjects
            .iter()
            .filter_map(|value| value.as_str().map(str::to_string))
            .collect();
        let grades = scan.book(Entity::Grades, documents.grades.as_ref(), &known, Scan::grade_record);
        let progress = scan.book(
            Entity::Progress,
            documents.progress.as_ref(),
            &known,
            Scan::progress_record,
        );
        let goals = scan.goals(documents.goals.as_ref(), &known);
        let reminders = scan.list(
            Entity::Reminders,
            documents.reminders.as_ref(),
            &known,
            Scan::reminder_record,
        );
        let profile = scan.profile(documents.profile.as_ref());

        let repaired = (self.policy == RepairPolicy::Clamp).then(|| RepairedData {
            subjects: Value::Array(subjects),
            grades,
            progress,
            goals,
            reminders,
            profile,
        });
        IntegrityReport {
            issues: scan.issues,
            repaired,
        }
    }

    /// Reads the documents of `repo` and checks them.
    pub fn check_repository(&self, repo: &JsonStudyRepository) -> StoreResult<IntegrityReport> {
        let documents = RawDocuments::load(repo)?;
        let report = self.check(&documents);
        if report.is_clean() {
            info!("event=integrity_check module=integrity status=ok issues=0");
        } else {
            warn!(
                "event=integrity_check module=integrity status=issues issues={} policy={:?}",
                report.issues.len(),
                self.policy
            );
        }
        Ok(report)
    }
}

/// Writes repaired documents back; a no-op for report-only results.
pub fn write_repaired(repo: &JsonStudyRepository, report: &IntegrityReport) -> StoreResult<bool> {
    let Some(repaired) = &report.repaired else {
        return Ok(false);
    };
    repo.file(SUBJECTS_FILE).save(&repaired.subjects)?;
    repo.file(GRADES_FILE).save(&repaired.grades)?;
    repo.file(PROGRESS_FILE).save(&repaired.progress)?;
    repo.file(GOALS_FILE).save(&repaired.goals)?;
    repo.file(REMINDERS_FILE).save(&repaired.reminders)?;
    if let Some(profile) = &repaired.profile {
        repo.file(PROFILE_FILE).save(profile)?;
    }
    info!(
        "event=integrity_repair module=integrity status=ok repairs={}",
        report.issues.iter().filter(|issue| issue.action.is_some()).count()
    );
    Ok(true)
}

type RecordRepair = fn(&mut Scan, &Location<'_>, &Map<String, Value>) -> Map<String, Value>;
type ItemRepair = fn(&mut Scan, &Location<'_>, &Map<String, Value>) -> Option<Map<String, Value>>;

struct Scan {
    policy: RepairPolicy,
    today: NaiveDate,
    issues: Vec<IntegrityIssue>,
}

struct Location<'a> {
    entity: Entity,
    subject: &'a str,
    index: usize,
}

impl Scan {
    fn action(&self, action: RepairAction) -> Option<RepairAction> {
        (self.policy == RepairPolicy::Clamp).then_some(action)
    }

    fn push(
        &mut self,
        entity: Entity,
        subject: Option<&str>,
        index: Option<usize>,
        kind: IssueKind,
        action: RepairAction,
    ) {
        let action = self.action(action);
        self.record(entity, subject, index, kind, action);
    }

    fn record(
        &mut self,
        entity: Entity,
        subject: Option<&str>,
        index: Option<usize>,
        kind: IssueKind,
        action: Option<RepairAction>,
    ) {
        self.issues.push(IntegrityIssue {
            entity,
            subject: subject.map(str::to_string),
            index,
            kind,
            action,
        });
    }

    fn at(&mut self, at: &Location<'_>, kind: IssueKind, action: RepairAction) {
        let subject = Some(at.subject).filter(|subject| !subject.is_empty());
        self.push(at.entity, subject, Some(at.index), kind, action);
    }

    fn today_text(&self) -> Value {
        Value::String(self.today.format(DATE_FORMAT).to_string())
    }

    fn subjects(&mut self, document: Option<&Value>) -> Vec<Value> {
        let items = match document {
            None => return Vec::new(),
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.push(
                    Entity::Subjects,
                    None,
                    None,
                    IssueKind::MalformedDocument,
                    RepairAction::Reset,
                );
                return Vec::new();
            }
        };

        let mut seen = BTreeSet::new();
        let mut kept = Vec::new();
        for (index, item) in items.iter().enumerate() {
            let raw = item.as_str().unwrap_or_default();
            let Ok(name) = validate_subject_name(raw) else {
                self.push(
                    Entity::Subjects,
                    None,
                    Some(index),
                    IssueKind::InvalidSubjectName {
                        name: raw.to_string(),
                    },
                    RepairAction::Dropped,
                );
                continue;
            };
            if !seen.insert(name.clone()) {
                self.push(
                    Entity::Subjects,
                    Some(&name),
                    Some(index),
                    IssueKind::DuplicateSubject { name: name.clone() },
                    RepairAction::Dropped,
                );
                continue;
            }
            kept.push(Value::String(name));
        }
        kept
    }

    fn book(
        &mut self,
        entity: Entity,
        document: Option<&Value>,
        known: &BTreeSet<String>,
        repair_record: RecordRepair,
    ) -> Value {
        let by_subject = match document {
            None => return Value::Object(Map::new()),
            Some(Value::Object(by_subject)) => by_subject,
            Some(_) => {
                self.push(entity, None, None, IssueKind::MalformedDocument, RepairAction::Reset);
                return Value::Object(Map::new());
            }
        };

        let mut repaired = Map::new();
        for (subject, records) in by_subject {
            let Value::Array(records) = records else {
                self.push(
                    entity,
                    Some(subject),
                    None,
                    IssueKind::MalformedDocument,
                    RepairAction::Reset,
                );
                repaired.insert(subject.clone(), Value::Array(Vec::new()));
                continue;
            };
            if !known.contains(subject) && !records.is_empty() {
                self.record(
                    entity,
                    Some(subject),
                    None,
                    IssueKind::OrphanRecords {
                        count: records.len(),
                    },
                    None,
                );
            }

            let mut kept = Vec::with_capacity(records.len());
            for (index, record) in records.iter().enumerate() {
                let at = Location {
                    entity,
                    subject,
                    index,
                };
                match record {
                    Value::Object(fields) => kept.push(Value::Object(repair_record(self, &at, fields))),
                    _ => self.at(&at, IssueKind::MalformedRecord, RepairAction::Dropped),
                }
            }
            repaired.insert(subject.clone(), Value::Array(kept));
        }
        Value::Object(repaired)
    }

    /// Scans a flat list whose items carry their own `subject`.
    fn list(
        &mut self,
        entity: Entity,
        document: Option<&Value>,
        known: &BTreeSet<String>,
        repair_item: ItemRepair,
    ) -> Value {
        let items = match document {
            None | Some(Value::Null) => return Value::Array(Vec::new()),
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.push(entity, None, None, IssueKind::MalformedDocument, RepairAction::Reset);
                return Value::Array(Vec::new());
            }
        };

        let mut kept = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let Value::Object(fields) = item else {
                self.push(entity, None, Some(index), IssueKind::MalformedRecord, RepairAction::Dropped);
                continue;
            };
            let raw = fields.get("subject").and_then(Value::as_str).unwrap_or_default();
            let at = Location {
                entity,
                subject: raw,
                index,
            };
            let Ok(subject) = validate_subject_name(raw) else {
                self.at(
                    &at,
                    IssueKind::InvalidSubjectName {
                        name: raw.to_string(),
                    },
                    RepairAction::Dropped,
                );
                continue;
            };
            if !known.contains(&subject) {
                self.record(
                    entity,
                    Some(&subject),
                    Some(index),
                    IssueKind::OrphanSubject {
                        name: subject.clone(),
                    },
                    None,
                );
            }
            if let Some(repaired) = repair_item(self, &at, fields) {
                kept.push(Value::Object(repaired));
            }
        }
        Value::Array(kept)
    }

    fn goals(&mut self, document: Option<&Value>, known: &BTreeSet<String>) -> Value {
        if let Some(legacy @ Value::Object(_)) = document {
            self.record(Entity::Goals, None, None, IssueKind::LegacyGoalDocument, None);
            return legacy.clone();
        }
        self.list(Entity::Goals, document, known, Scan::goal_record)
    }

    fn grade_record(&mut self, at: &Location<'_>, fields: &Map<String, Value>) -> Map<String, Value> {
        let mut out = fields.clone();
        self.date_field(at, fields, &mut out);

        match fields.get("score").and_then(Value::as_f64) {
            Some(score) if (0.0..=MAX_SCORE).contains(&score) => {}
            Some(score) => {
                self.at(at, IssueKind::ScoreOutOfRange { value: score }, RepairAction::Clamped);
                out.insert("score".into(), number(score.clamp(0.0, MAX_SCORE)));
            }
            None => {
                self.at(at, IssueKind::MissingScore, RepairAction::Defaulted);
                out.insert("score".into(), number(0.0));
            }
        }

        let kind = fields.get("type").and_then(Value::as_str).unwrap_or_default();
        if GradeKind::parse(kind).is_none() {
            self.at(
                at,
                IssueKind::UnknownKind {
                    value: kind.to_string(),
                },
                RepairAction::Defaulted,
            );
            out.insert("type".into(), Value::String(GradeKind::Test.as_str().to_string()));
        }

        match fields.get("weight") {
            None => {
                out.insert("weight".into(), number(1.0));
            }
            Some(raw) => match raw.as_f64() {
                Some(weight) if weight > 0.0 && weight <= MAX_WEIGHT => {}
                Some(weight) if weight > MAX_WEIGHT => {
                    self.at(at, IssueKind::InvalidWeight { value: weight }, RepairAction::Clamped);
                    out.insert("weight".into(), number(MAX_WEIGHT));
                }
                other => {
                    let value = other.unwrap_or(f64::NAN);
                    self.at(at, IssueKind::InvalidWeight { value }, RepairAction::Defaulted);
                    out.insert("weight".into(), number(1.0));
                }
            },
        }

        if !fields.get("comment").is_some_and(Value::is_string) {
            out.insert("comment".into(), Value::String(String::new()));
        }
        out
    }

    fn progress_record(
        &mut self,
        at: &Location<'_>,
        fields: &Map<String, Value>,
    ) -> Map<String, Value> {
        let mut out = fields.clone();
        self.date_field(at, fields, &mut out);

        match fields.get("hours").and_then(Value::as_f64) {
            Some(hours) if (0.0..=MAX_DAILY_HOURS).contains(&hours) => {}
            Some(hours) => {
                self.at(at, IssueKind::HoursOutOfRange { value: hours }, RepairAction::Clamped);
                out.insert("hours".into(), number(hours.clamp(0.0, MAX_DAILY_HOURS)));
            }
            None => {
                self.at(at, IssueKind::MissingHours, RepairAction::Defaulted);
                out.insert("hours".into(), number(0.0));
            }
        }

        if let Some(motivation) = fields.get("motivation").and_then(Value::as_i64) {
            let (low, high) = (i64::from(MIN_MOTIVATION), i64::from(MAX_MOTIVATION));
            if !(low..=high).contains(&motivation) {
                self.at(
                    at,
                    IssueKind::MotivationOutOfRange { value: motivation },
                    RepairAction::Clamped,
                );
                out.insert("motivation".into(), Value::from(motivation.clamp(low, high)));
            }
        }

        if !fields.get("task").is_some_and(Value::is_string) {
            out.insert("task".into(), Value::String(String::new()));
        }
        out
    }

    fn goal_record(
        &mut self,
        at: &Location<'_>,
        fields: &Map<String, Value>,
    ) -> Option<Map<String, Value>> {
        if !fields.contains_key("text")
            && ["goal", "title", "description"]
                .iter()
                .any(|key| fields.contains_key(*key))
        {
            // Legacy list item; the repository converts it on read.
            return Some(fields.clone());
        }
        let mut out = fields.clone();
        if !self.text_field(at, fields, &mut out, None) {
            return None;
        }
        self.id_field(at, fields, &mut out);
        self.enum_field::<GoalHorizon>(at, fields, &mut out, "horizon", true, |value| {
            IssueKind::UnknownHorizon { value }
        });
        self.enum_field::<GoalStatus>(at, fields, &mut out, "status", false, |value| {
            IssueKind::UnknownStatus { value }
        });
        self.optional_date_field(at, fields, &mut out, "deadline");

        if let Some(raw) = fields.get("target").filter(|raw| !raw.is_null()) {
            let usable = serde_json::from_value::<GoalTarget>(raw.clone())
                .is_ok_and(|target| target.value().is_finite() && target.value() > 0.0);
            if !usable {
                self.at(at, IssueKind::InvalidTarget, RepairAction::Dropped);
                out.remove("target");
            }
        }
        Some(out)
    }

    fn reminder_record(
        &mut self,
        at: &Location<'_>,
        fields: &Map<String, Value>,
    ) -> Option<Map<String, Value>> {
        let mut out = fields.clone();
        if !self.text_field(at, fields, &mut out, Some(MAX_REMINDER_CHARS)) {
            return None;
        }
        self.id_field(at, fields, &mut out);

        let date = fields.get("date").and_then(Value::as_str);
        if date.and_then(|raw| NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()).is_none() {
            self.at(
                at,
                IssueKind::InvalidDate {
                    value: date.unwrap_or_default().to_string(),
                },
                RepairAction::Defaulted,
            );
            out.insert("date".into(), self.today_text());
        }

        self.enum_field::<Recurrence>(at, fields, &mut out, "recurrence", false, |value| {
            IssueKind::UnknownRecurrence { value }
        });
        self.optional_date_field(at, fields, &mut out, "snoozed_until");
        if fields.get("completed").is_some_and(|raw| !raw.is_boolean()) {
            self.at(at, IssueKind::MalformedRecord, RepairAction::Defaulted);
            out.insert("completed".into(), Value::Bool(false));
        }
        Some(out)
    }

    fn profile(&mut self, document: Option<&Value>) -> Option<Value> {
        let fields = match document? {
            Value::Object(fields) => fields,
            _ => {
                self.push(Entity::Profile, None, None, IssueKind::MalformedDocument, RepairAction::Reset);
                let mut fresh = Map::new();
                fresh.insert("age".into(), Value::Null);
                fresh.insert("education_level".into(), Value::Null);
                fresh.insert("created_at".into(), self.midnight());
                fresh.insert("updated_at".into(), Value::Null);
                return Some(Value::Object(fresh));
            }
        };

        let mut out = fields.clone();
        match fields.get("age") {
            None | Some(Value::Null) => {}
            Some(raw) => match raw.as_i64() {
                Some(age) => {
                    let (low, high) = (i64::from(MIN_AGE), i64::from(MAX_AGE));
                    if !(low..=high).contains(&age) {
                        self.push(
                            Entity::Profile,
                            None,
                            None,
                            IssueKind::AgeOutOfRange { value: age },
                            RepairAction::Clamped,
                        );
                        out.insert("age".into(), Value::from(age.clamp(low, high)));
                    }
                }
                None => {
                    self.push(Entity::Profile, None, None, IssueKind::InvalidAge, RepairAction::Defaulted);
                    out.insert("age".into(), Value::Null);
                }
            },
        }

        if let Some(raw) = fields.get("education_level").filter(|raw| !raw.is_null()) {
            if !parses::<EducationLevel>(raw) {
                self.push(
                    Entity::Profile,
                    None,
                    None,
                    IssueKind::UnknownEducationLevel {
                        value: display(raw),
                    },
                    RepairAction::Defaulted,
                );
                out.insert("education_level".into(), Value::Null);
            }
        }

        let created = fields.get("created_at").unwrap_or(&Value::Null);
        if !parses::<NaiveDateTime>(created) {
            self.push(
                Entity::Profile,
                None,
                None,
                IssueKind::InvalidTimestamp {
                    field: "created_at".into(),
                    value: display(created),
                },
                RepairAction::Defaulted,
            );
            out.insert("created_at".into(), self.midnight());
        }
        if let Some(raw) = fields.get("updated_at").filter(|raw| !raw.is_null()) {
            if !parses::<NaiveDateTime>(raw) {
                self.push(
                    Entity::Profile,
                    None,
                    None,
                    IssueKind::InvalidTimestamp {
                        field: "updated_at".into(),
                        value: display(raw),
                    },
                    RepairAction::Defaulted,
                );
                out.insert("updated_at".into(), Value::Null);
            }
        }
        Some(Value::Object(out))
    }

    fn midnight(&self) -> Value {
        serde_json::to_value(self.today.and_time(NaiveTime::MIN)).unwrap_or(Value::Null)
    }

    /// Returns false when the record has no usable text and was dropped.
    fn text_field(
        &mut self,
        at: &Location<'_>,
        fields: &Map<String, Value>,
        out: &mut Map<String, Value>,
        max: Option<usize>,
    ) -> bool {
        let text = fields.get("text").and_then(Value::as_str).unwrap_or_default();
        if text.trim().is_empty() {
            self.at(at, IssueKind::BlankText, RepairAction::Dropped);
            return false;
        }
        if let Some(max) = max {
            let chars = text.chars().count();
            if chars > max {
                self.at(at, IssueKind::TextTooLong { chars }, RepairAction::Clamped);
                out.insert("text".into(), Value::String(text.chars().take(max).collect()));
            }
        }
        true
    }

    /// Unusable ids are removed so the next load derives one from content.
    fn id_field(&mut self, at: &Location<'_>, fields: &Map<String, Value>, out: &mut Map<String, Value>) {
        let Some(raw) = fields.get("id").filter(|raw| !raw.is_null()) else {
            return;
        };
        let valid = raw
            .as_str()
            .and_then(|text| Uuid::parse_str(text).ok())
            .is_some_and(|id| !id.is_nil());
        if !valid {
            self.at(at, IssueKind::InvalidId { value: display(raw) }, RepairAction::Reset);
            out.remove("id");
        }
    }

    fn enum_field<T: DeserializeOwned + Default + Serialize>(
        &mut self,
        at: &Location<'_>,
        fields: &Map<String, Value>,
        out: &mut Map<String, Value>,
        key: &str,
        required: bool,
        issue: fn(String) -> IssueKind,
    ) {
        let raw = match fields.get(key) {
            None if !required => return,
            None => Value::Null,
            Some(raw) if parses::<T>(raw) => return,
            Some(raw) => raw.clone(),
        };
        self.at(at, issue(display(&raw)), RepairAction::Defaulted);
        out.insert(key.into(), serde_json::to_value(T::default()).unwrap_or(Value::Null));
    }

    /// Optional `YYYY-MM-DD` field where blank or null means unset.
    fn optional_date_field(
        &mut self,
        at: &Location<'_>,
        fields: &Map<String, Value>,
        out: &mut Map<String, Value>,
        key: &str,
    ) {
        let raw = match fields.get(key) {
            None | Some(Value::Null) => return,
            Some(raw) => raw,
        };
        let valid = raw.as_str().is_some_and(|text| {
            let trimmed = text.trim();
            trimmed.is_empty() || NaiveDate::parse_from_str(trimmed, DATE_FORMAT).is_ok()
        });
        if !valid {
            self.at(at, IssueKind::InvalidDate { value: display(raw) }, RepairAction::Defaulted);
            out.insert(key.into(), Value::String(String::new()));
        }
    }

    fn date_field(
        &mut self,
        at: &Location<'_>,
        fields: &Map<String, Value>,
        out: &mut Map<String, Value>,
    ) {
        let raw = fields.get("date").and_then(Value::as_str);
        if raw.and_then(RecordDate::parse).is_some() {
            return;
        }
        self.at(
            at,
            IssueKind::InvalidDate {
                value: raw.unwrap_or_default().to_string(),
            },
            RepairAction::Defaulted,
        );
        out.insert("date".into(), self.today_text());
    }
}

fn parses<T: DeserializeOwned>(raw: &Value) -> bool {
    serde_json::from_value::<T>(raw.clone()).is_ok()
}

/// Raw value as shown in issues: strings without quotes, everything else as JSON.
fn display(raw: &Value) -> String {
    match raw {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
}
