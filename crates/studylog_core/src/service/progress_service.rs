//! Study-session logging and totals.

use crate::model::progress::ProgressRecord;
use crate::repo::study_repo::{ProgressRepository, SubjectRepository};
use crate::service::subject_service::ensure_subject;
use crate::service::ServiceResult;
use chrono::{Duration, NaiveDate};
use log::info;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressTotals {
    pub subject: String,
    pub sessions: usize,
    pub total_hours: f64,
    pub latest_motivation: Option<u8>,
    pub average_motivation: Option<f64>,
}

pub struct ProgressService<R> {
    repo: R,
}

impl<R> ProgressService<R>
where
    R: SubjectRepository + ProgressRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Appends a study session to a registered subject.
    pub fn log_session(&self, subject: &str, record: ProgressRecord) -> ServiceResult<()> {
        let subject = ensure_subject(&self.repo, subject)?;
        record.validate()?;
        let mut progress = self.repo.load_progress()?;
        let sessions = progress.entry(subject.clone()).or_default();
        sessions.push(record);
        let count = sessions.len();
        self.repo.save_progress(&progress)?;
        info!(
            "event=progress_log module=service status=ok subject={} sessions={}",
            subject, count
        );
        Ok(())
    }

    /// Sessions for `subject` sorted by date.
    pub fn sessions_for(&self, subject: &str) -> ServiceResult<Vec<ProgressRecord>> {
        let mut sessions = self
            .repo
            .load_progress()?
            .remove(subject.trim())
            .unwrap_or_default();
        sessions.sort_by(|left, right| left.date.cmp(&right.date));
        Ok(sessions)
    }

    pub fn total_hours(&self, subject: &str) -> ServiceResult<f64> {
        Ok(self
            .sessions_for(subject)?
            .iter()
            .map(|record| record.hours)
            .sum())
    }

    /// Totals for every subject with at least one session.
    pub fn totals(&self) -> ServiceResult<Vec<ProgressTotals>> {
        let progress = self.repo.load_progress()?;
        Ok(progress
            .into_iter()
            .filter(|(_, sessions)| !sessions.is_empty())
            .map(|(subject, mut sessions)| {
                sessions.sort_by(|left, right| left.date.cmp(&right.date));
                totals_of(subject, &sessions)
            })
            .collect())
    }

    /// Hours logged in the `days` days ending on `today` (inclusive).
    pub fn hours_in_last_days(
        &self,
        subject: &str,
        today: NaiveDate,
        days: u32,
    ) -> ServiceResult<f64> {
        let since = today - Duration::days(i64::from(days.saturating_sub(1)));
        Ok(self
            .sessions_for(subject)?
            .iter()
            .filter(|record| (since..=today).contains(&record.date.date()))
            .map(|record| record.hours)
            .sum())
    }
}

fn totals_of(subject: String, sessions: &[ProgressRecord]) -> ProgressTotals {
    let average_motivation = if sessions.is_empty() {
        None
    } else {
        let sum: u32 = sessions.iter().map(|record| u32::from(record.motivation)).sum();
        Some(f64::from(sum) / sessions.len() as f64)
    };
    ProgressTotals {
        subject,
        sessions: sessions.len(),
        total_hours: sessions.iter().map(|record| record.hours).sum(),
        latest_motivation: sessions.last().map(|record| record.motivation),
        average_motivation,
    }
}
