//! Entity repositories over the JSON data directory.
//!
//! # Responsibility
//! - One contract per entity type; `JsonStudyRepository` implements all of
//!   them over `subjects.json`, `grades.json`, `progress.json`,
//!   `goals.json`, `reminders.json` and `user_profile.json`.
//!
//! # Invariants
//! - Write paths validate every record and reject the whole save on the
//!   first violation; nothing is partially written.
//! - Read paths reject invalid persisted records (deserialization validates).
//! - Legacy goal documents are migrated on read and reported in the log.
//! - Loaded goal and reminder ids are unique within their file; repeats are
//!   re-derived from the first id and the record index, deterministically.

use crate::model::goal::Goal;
use crate::model::profile::UserProfile;
use crate::model::reminder::Reminder;
use crate::model::validation::validate_subject_name;
use crate::model::{GradeBook, ProgressLog};
use crate::repo::json_store::{JsonFile, StoreError, StoreResult};
use crate::repo::legacy_goals::{migrate_goals, needs_migration};
use log::{info, warn};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const SUBJECTS_FILE: &str = "subjects.json";
pub const GRADES_FILE: &str = "grades.json";
pub const PROGRESS_FILE: &str = "progress.json";
pub const GOALS_FILE: &str = "goals.json";
pub const REMINDERS_FILE: &str = "reminders.json";
pub const PROFILE_FILE: &str = "user_profile.json";

pub trait SubjectRepository {
    fn load_subjects(&self) -> StoreResult<Vec<String>>;
    fn save_subjects(&self, subjects: &[String]) -> StoreResult<()>;
}

pub trait GradeRepository {
    fn load_grades(&self) -> StoreResult<GradeBook>;
    fn save_grades(&self, grades: &GradeBook) -> StoreResult<()>;
}

pub trait ProgressRepository {
    fn load_progress(&self) -> StoreResult<ProgressLog>;
    fn save_progress(&self, progress: &ProgressLog) -> StoreResult<()>;
}

pub trait GoalRepository {
    fn load_goals(&self) -> StoreResult<Vec<Goal>>;
    fn save_goals(&self, goals: &[Goal]) -> StoreResult<()>;
}

pub trait ReminderRepository {
    fn load_reminders(&self) -> StoreResult<Vec<Reminder>>;
    fn save_reminders(&self, reminders: &[Reminder]) -> StoreResult<()>;
}

pub trait ProfileRepository {
    fn load_profile(&self) -> StoreResult<Option<UserProfile>>;
    fn save_profile(&self, profile: &UserProfile) -> StoreResult<()>;
}

/// All entity repositories rooted at one data directory.
#[derive(Debug, Clone)]
pub struct JsonStudyRepository {
    root: PathBuf,
}

impl JsonStudyRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file(&self, name: &str) -> JsonFile {
        JsonFile::new(self.root.join(name))
    }
}

impl SubjectRepository for JsonStudyRepository {
    fn load_subjects(&self) -> StoreResult<Vec<String>> {
        let subjects: Vec<String> = self.file(SUBJECTS_FILE).load()?;
        for subject in &subjects {
            validate_subject_name(subject)?;
        }
        Ok(subjects)
    }

    fn save_subjects(&self, subjects: &[String]) -> StoreResult<()> {
        let mut seen = BTreeSet::new();
        for subject in subjects {
            let normalized = validate_subject_name(subject)?;
            if !seen.insert(normalized.clone()) {
                return Err(StoreError::Duplicate(format!("subject `{normalized}`")));
            }
        }
        self.file(SUBJECTS_FILE).save(subjects)
    }
}

impl GradeRepository for JsonStudyRepository {
    fn load_grades(&self) -> StoreResult<GradeBook> {
        self.file(GRADES_FILE).load()
    }

    fn save_grades(&self, grades: &GradeBook) -> StoreResult<()> {
        for (subject, records) in grades {
            validate_subject_name(subject)?;
            for record in records {
                record.validate()?;
            }
        }
        self.file(GRADES_FILE).save(grades)
    }
}

impl ProgressRepository for JsonStudyRepository {
    fn load_progress(&self) -> StoreResult<ProgressLog> {
        self.file(PROGRESS_FILE).load()
    }

    fn save_progress(&self, progress: &ProgressLog) -> StoreResult<()> {
        for (subject, records) in progress {
            validate_subject_name(subject)?;
            for record in records {
                record.validate()?;
            }
        }
        self.file(PROGRESS_FILE).save(progress)
    }
}

impl GoalRepository for JsonStudyRepository {
    fn load_goals(&self) -> StoreResult<Vec<Goal>> {
        let file = self.file(GOALS_FILE);
        let Some(value) = file.load_value()? else {
            return Ok(Vec::new());
        };
        if !needs_migration(&value) {
            let mut goals: Vec<Goal> =
                serde_json::from_value(value).map_err(|source| StoreError::Json {
                    path: file.path().to_path_buf(),
                    source,
                })?;
            let ids = unique_ids(goals.iter().map(|goal| goal.id));
            for (goal, id) in goals.iter_mut().zip(ids) {
                goal.id = id;
            }
            return Ok(goals);
        }

        let migration = migrate_goals(&value);
        info!(
            "event=goal_migrate module=repo status=ok converted={} skipped={}",
            migration.goals.len(),
            migration.skipped.len()
        );
        if !migration.skipped.is_empty() {
            warn!(
                "event=goal_migrate module=repo status=partial skipped={}",
                migration.skipped.len()
            );
        }
        let mut goals = migration.goals;
        let ids = unique_ids(goals.iter().map(|goal| goal.id));
        for (goal, id) in goals.iter_mut().zip(ids) {
            goal.id = id;
        }
        Ok(goals)
    }

    fn save_goals(&self, goals: &[Goal]) -> StoreResult<()> {
        let mut ids = BTreeSet::new();
        for goal in goals {
            goal.validate()?;
            if !ids.insert(goal.id) {
                return Err(StoreError::Duplicate(format!("goal id {}", goal.id)));
            }
        }
        self.file(GOALS_FILE).save(goals)
    }
}

impl ReminderRepository for JsonStudyRepository {
    fn load_reminders(&self) -> StoreResult<Vec<Reminder>> {
        let mut reminders: Vec<Reminder> = self.file(REMINDERS_FILE).load()?;
        let ids = unique_ids(reminders.iter().map(|reminder| reminder.id));
        for (reminder, id) in reminders.iter_mut().zip(ids) {
            reminder.id = id;
        }
        Ok(reminders)
    }

    fn save_reminders(&self, reminders: &[Reminder]) -> StoreResult<()> {
        let mut ids = BTreeSet::new();
        for reminder in reminders {
            reminder.validate()?;
            if !ids.insert(reminder.id) {
                return Err(StoreError::Duplicate(format!("reminder id {}", reminder.id)));
            }
        }
        self.file(REMINDERS_FILE).save(reminders)
    }
}

impl ProfileRepository for JsonStudyRepository {
    fn load_profile(&self) -> StoreResult<Option<UserProfile>> {
        let profile: Option<UserProfile> = self.file(PROFILE_FILE).load()?;
        if let Some(profile) = &profile {
            profile.validate()?;
        }
        Ok(profile)
    }

    fn save_profile(&self, profile: &UserProfile) -> StoreResult<()> {
        profile.validate()?;
        self.file(PROFILE_FILE).save(profile)
    }
}

/// Keeps first occurrences; a repeated id becomes a v5 id over the original
/// id and the record index, so identical documents always load identically.
fn unique_ids(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    let mut seen = BTreeSet::new();
    let mut result = Vec::new();
    for (index, id) in ids.enumerate() {
        let mut candidate = id;
        let mut salt = index;
        while !seen.insert(candidate) {
            candidate = Uuid::new_v5(&id, salt.to_string().as_bytes());
            salt += 1;
        }
        result.push(candidate);
    }
    result
}

impl<R: SubjectRepository + ?Sized> SubjectRepository for &R {
    fn load_subjects(&self) -> StoreResult<Vec<String>> {
        (**self).load_subjects()
    }

    fn save_subjects(&self, subjects: &[String]) -> StoreResult<()> {
        (**self).save_subjects(subjects)
    }
}

impl<R: GradeRepository + ?Sized> GradeRepository for &R {
    fn load_grades(&self) -> StoreResult<GradeBook> {
        (**self).load_grades()
    }

    fn save_grades(&self, grades: &GradeBook) -> StoreResult<()> {
        (**self).save_grades(grades)
    }
}

impl<R: ProgressRepository + ?Sized> ProgressRepository for &R {
    fn load_progress(&self) -> StoreResult<ProgressLog> {
        (**self).load_progress()
    }

    fn save_progress(&self, progress: &ProgressLog) -> StoreResult<()> {
        (**self).save_progress(progress)
    }
}

impl<R: GoalRepository + ?Sized> GoalRepository for &R {
    fn load_goals(&self) -> StoreResult<Vec<Goal>> {
        (**self).load_goals()
    }

    fn save_goals(&self, goals: &[Goal]) -> StoreResult<()> {
        (**self).save_goals(goals)
    }
}

impl<R: ReminderRepository + ?Sized> ReminderRepository for &R {
    fn load_reminders(&self) -> StoreResult<Vec<Reminder>> {
        (**self).load_reminders()
    }

    fn save_reminders(&self, reminders: &[Reminder]) -> StoreResult<()> {
        (**self).save_reminders(reminders)
    }
}

impl<R: ProfileRepository + ?Sized> ProfileRepository for &R {
    fn load_profile(&self) -> StoreResult<Option<UserProfile>> {
        (**self).load_profile()
    }

    fn save_profile(&self, profile: &UserProfile) -> StoreResult<()> {
        (**self).save_profile(profile)
    }
}
