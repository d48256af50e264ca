//! Subject list management with cascading rename/removal.
//!
//! # Invariants
//! - Names are trimmed, validated and unique.
//! - Renaming or removing a subject rewrites every entity file that keys
//!   records by that subject, so no orphan records are left behind.

use crate::model::validation::validate_subject_name;
use crate::repo::study_repo::{
    GoalRepository, GradeRepository, ProgressRepository, ReminderRepository, SubjectRepository,
};
use crate::service::{ServiceError, ServiceResult};
use log::info;

pub struct SubjectService<R> {
    repo: R,
}

impl<R> SubjectService<R>
where
    R: SubjectRepository + GradeRepository + ProgressRepository + GoalRepository + ReminderRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn list(&self) -> ServiceResult<Vec<String>> {
        Ok(self.repo.load_subjects()?)
    }

    pub fn exists(&self, name: &str) -> ServiceResult<bool> {
        let name = name.trim();
        Ok(self.repo.load_subjects()?.iter().any(|subject| subject == name))
    }

    /// Adds a subject; returns the normalized name.
    pub fn add(&self, name: &str) -> ServiceResult<String> {
        let normalized = validate_subject_name(name)?;
        let mut subjects = self.repo.load_subjects()?;
        if subjects.contains(&normalized) {
            return Err(crate::repo::json_store::StoreError::Duplicate(format!(
                "subject `{normalized}`"
            ))
            .into());
        }
        subjects.push(normalized.clone());
        self.repo.save_subjects(&subjects)?;
        info!(
            "event=subject_add module=service status=ok subject={} total={}",
            normalized,
            subjects.len()
        );
        Ok(normalized)
    }

    /// Removes a subject together with its grades, progress, goals and reminders.
    pub fn remove(&self, name: &str) -> ServiceResult<()> {
        let name = name.trim();
        let mut subjects = self.repo.load_subjects()?;
        let before = subjects.len();
        subjects.retain(|subject| subject != name);
        if subjects.len() == before {
            return Err(ServiceError::UnknownSubject(name.to_string()));
        }

        let mut grades = self.repo.load_grades()?;
        let removed_grades = grades.remove(name).map_or(0, |records| records.len());
        let mut progress = self.repo.load_progress()?;
        let removed_sessions = progress.remove(name).map_or(0, |records| records.len());
        let mut goals = self.repo.load_goals()?;
        goals.retain(|goal| goal.subject != name);
        let mut reminders = self.repo.load_reminders()?;
        reminders.retain(|reminder| reminder.subject != name);

        self.repo.save_grades(&grades)?;
        self.repo.save_progress(&progress)?;
        self.repo.save_goals(&goals)?;
        self.repo.save_reminders(&reminders)?;
        self.repo.save_subjects(&subjects)?;
        info!(
            "event=subject_remove module=service status=ok subject={} grades={} sessions={}",
            name, removed_grades, removed_sessions
        );
        Ok(())
    }

    /// Renames a subject everywhere it is referenced.
    pub fn rename(&self, from: &str, to: &str) -> ServiceResult<String> {
        let from = from.trim();
        let to = validate_subject_name(to)?;
        let mut subjects = self.repo.load_subjects()?;
        let Some(position) = subjects.iter().position(|subject| subject == from) else {
            return Err(ServiceError::UnknownSubject(from.to_string()));
        };
        if from == to {
            return Ok(to);
        }
        if subjects.contains(&to) {
            return Err(
                crate::repo::json_store::StoreError::Duplicate(format!("subject `{to}`")).into(),
            );
        }
        subjects[position] = to.clone();

        let mut grades = self.repo.load_grades()?;
        if let Some(records) = grades.remove(from) {
            grades.insert(to.clone(), records);
        }
        let mut progress = self.repo.load_progress()?;
        if let Some(records) = progress.remove(from) {
            progress.insert(to.clone(), records);
        }
        let mut goals = self.repo.load_goals()?;
        for goal in goals.iter_mut().filter(|goal| goal.subject == from) {
            goal.subject = to.clone();
        }
        let mut reminders = self.repo.load_reminders()?;
        for reminder in reminders.iter_mut().filter(|reminder| reminder.subject == from) {
            reminder.subject = to.clone();
        }

        self.repo.save_grades(&grades)?;
        self.repo.save_progress(&progress)?;
        self.repo.save_goals(&goals)?;
        self.repo.save_reminders(&reminders)?;
        self.repo.save_subjects(&subjects)?;
        info!(
            "event=subject_rename module=service status=ok from={} to={}",
            from, to
        );
        Ok(to)
    }
}

/// Fails with `UnknownSubject` unless `subject` is registered.
pub(crate) fn ensure_subject<R: SubjectRepository>(repo: &R, subject: &str) -> ServiceResult<String> {
    let normalized = validate_subject_name(subject)?;
    if repo.load_subjects()?.contains(&normalized) {
        Ok(normalized)
    } else {
        Err(ServiceError::UnknownSubject(normalized))
    }
}
