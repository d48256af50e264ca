//! Grade use-cases.
//!
//! # Responsibility
//! - Record and delete grades for registered subjects.
//! - Expose statistics, trend and required-score reports per subject.
//!
//! # Invariants
//! - Records returned by this service are in chronological order.
//! - Report functions never mutate persisted data.

use crate::model::grade::{sort_chronologically, GradeKind, GradeRecord};
use crate::repo::study_repo::{GradeRepository, SubjectRepository};
use crate::service::subject_service::ensure_subject;
use crate::service::{ServiceError, ServiceResult};
use crate::stats::aggregate::{summarize, summarize_by_kind, GradeSummary, LetterGrade};
use crate::stats::required::{
    bootstrap_final_average, estimate_future_score, scenario_table, solve_required_score,
    BootstrapProjection, FutureScoreMethod, RequiredScoreInput, RequiredScoreOutcome, Scenario,
};
use crate::stats::trend::{
    index_fit, recent_vs_previous, LinearFit, TrendDirection, WindowComparison, RECENT_WINDOW,
};
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;

/// Resample count for final-average projections.
pub const BOOTSTRAP_ITERATIONS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
    pub direction: TrendDirection,
    pub fit: Option<LinearFit>,
    pub window: Option<WindowComparison>,
    pub letter: Option<LetterGrade>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectSummary {
    pub subject: String,
    pub summary: GradeSummary,
    pub letter: LetterGrade,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionReport {
    pub method: FutureScoreMethod,
    pub estimated_score: f64,
    pub scenarios: Vec<Scenario>,
    pub bootstrap: Option<BootstrapProjection>,
}

pub struct GradeService<R> {
    repo: R,
}

impl<R> GradeService<R>
where
    R: SubjectRepository + GradeRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Appends one record to a registered subject.
    ///
    /// # Contract
    /// - Fails with `UnknownSubject` when the subject is not registered.
    /// - The record is validated again on save.
    pub fn record_grade(&self, subject: &str, record: GradeRecord) -> ServiceResult<()> {
        let subject = ensure_subject(&self.repo, subject)?;
        record.validate()?;
        let mut grades = self.repo.load_grades()?;
        let records = grades.entry(subject.clone()).or_default();
        records.push(record);
        let count = records.len();
        self.repo.save_grades(&grades)?;
        info!(
            "event=grade_record module=service status=ok subject={} count={}",
            subject, count
        );
        Ok(())
    }

    /// Chronologically sorted records; empty for a subject without grades.
    pub fn grades_for(&self, subject: &str) -> ServiceResult<Vec<GradeRecord>> {
        let mut records = self
            .repo
            .load_grades()?
            .remove(subject.trim())
            .unwrap_or_default();
        sort_chronologically(&mut records);
        Ok(records)
    }

    /// Deletes the record at `index` in chronological order.
    pub fn delete_grade(&self, subject: &str, index: usize) -> ServiceResult<GradeRecord> {
        let subject = subject.trim();
        let mut grades = self.repo.load_grades()?;
        let Some(records) = grades.get_mut(subject) else {
            return Err(ServiceError::NotFound(format!("grades for `{subject}`")));
        };
        sort_chronologically(records);
        if index >= records.len() {
            return Err(ServiceError::NotFound(format!(
                "grade #{index} for `{subject}`"
            )));
        }
        let removed = records.remove(index);
        if records.is_empty() {
            grades.remove(subject);
        }
        self.repo.save_grades(&grades)?;
        info!(
            "event=grade_delete module=service status=ok subject={}",
            subject
        );
        Ok(removed)
    }

    pub fn summary(&self, subject: &str) -> ServiceResult<Option<GradeSummary>> {
        Ok(summarize(&self.grades_for(subject)?))
    }

    pub fn kind_breakdown(&self, subject: &str) -> ServiceResult<BTreeMap<GradeKind, GradeSummary>> {
        Ok(summarize_by_kind(&self.grades_for(subject)?))
    }

    pub fn trend(&self, subject: &str) -> ServiceResult<TrendReport> {
        let records = self.grades_for(subject)?;
        let scores: Vec<f64> = records.iter().map(|record| record.score).collect();
        let fit = index_fit(&scores);
        Ok(TrendReport {
            direction: TrendDirection::from_slope(fit.map_or(0.0, |fit| fit.slope)),
            fit,
            window: recent_vs_previous(&scores, RECENT_WINDOW),
            letter: summarize(&records).map(|summary| LetterGrade::from_score(summary.weighted_mean)),
        })
    }

    /// Summary of every subject that has at least one grade.
    pub fn overall(&self) -> ServiceResult<Vec<SubjectSummary>> {
        let grades = self.repo.load_grades()?;
        Ok(grades
            .iter()
            .filter_map(|(subject, records)| {
                summarize(records).map(|summary| SubjectSummary {
                    subject: subject.clone(),
                    letter: LetterGrade::from_score(summary.weighted_mean),
                    summary,
                })
            })
            .collect())
    }

    pub fn required_score(
        &self,
        subject: &str,
        target: f64,
        remaining: u32,
        weight_each: f64,
    ) -> ServiceResult<RequiredScoreOutcome> {
        let records = self.grades_for(subject)?;
        let input = RequiredScoreInput::from_records(&records, target, remaining, weight_each);
        Ok(solve_required_score(&input)?)
    }

    /// What-if projection for the remaining assessments.
    ///
    /// # Contract
    /// - Fails with `NotFound` when the subject has no grades.
    /// - The bootstrap is deterministic for `seed`.
    pub fn projection(
        &self,
        subject: &str,
        method: FutureScoreMethod,
        target: f64,
        remaining: u32,
        weight_each: f64,
        seed: u64,
    ) -> ServiceResult<ProjectionReport> {
        let records = self.grades_for(subject)?;
        let Some(estimated_score) = estimate_future_score(&records, method) else {
            return Err(ServiceError::NotFound(format!("grades for `{}`", subject.trim())));
        };
        Ok(ProjectionReport {
            method,
            estimated_score,
            scenarios: scenario_table(&records, remaining, weight_each, estimated_score),
            bootstrap: bootstrap_final_average(
                &records,
                target,
                remaining,
                weight_each,
                BOOTSTRAP_ITERATIONS,
                seed,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::GradeService;
    use crate::model::date::RecordDate;
    use crate::model::grade::{GradeKind, GradeRecord};
    use crate::repo::study_repo::{JsonStudyRepository, SubjectRepository};
    use crate::service::ServiceError;
    use crate::stats::required::RequiredScoreOutcome;
    use crate::stats::trend::TrendDirection;

    fn record(date: &str, score: f64) -> GradeRecord {
        GradeRecord::new(RecordDate::parse(date).expect("parsable input"), GradeKind::Test, score, 1.0).expect("valid grade")
    }

    #[test]
    fn record_grade_requires_registered_subject() {
        let dir = tempfile::tempdir().expect("temp dir");
        let repo = JsonStudyRepository::new(dir.path());
        let service = GradeService::new(&repo);
        let err = service
            .record_grade("Math", record("2025-04-01", 80.0))
            .expect_err("record grade must fail");
        assert!(matches!(err, ServiceError::UnknownSubject(_)));
    }

    #[test]
    fn grades_come_back_sorted_and_trend_is_detected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let repo = JsonStudyRepository::new(dir.path());
        repo.save_subjects(&["Math".to_string()]).expect("save subjects succeeds");
        let service = GradeService::new(&repo);
        for (date, score) in [
            ("2025-04-05", 70.0),
            ("2025-04-01", 60.0),
            ("2025-04-03", 65.0),
            ("2025-04-09", 80.0),
            ("2025-04-07", 75.0),
        ] {
            service.record_grade("Math", record(date, score)).expect("record grade succeeds");
        }

        let scores: Vec<f64> = service
            .grades_for("Math")
            .expect("grades for succeeds")
            .iter()
            .map(|record| record.score)
            .collect();
        assert_eq!(scores, vec![60.0, 65.0, 70.0, 75.0, 80.0]);
        assert_eq!(
            service.trend("Math").expect("trend succeeds").direction,
            TrendDirection::Improving
        );

        let removed = service.delete_grade("Math", 0).expect("delete grade succeeds");
        assert_eq!(removed.score, 60.0);
        assert_eq!(service.grades_for("Math").expect("grades for succeeds").len(), 4);
    }

    #[test]
    fn required_score_uses_recorded_history() {
        let dir = tempfile::tempdir().expect("temp dir");
        let repo = JsonStudyRepository::new(dir.path());
        repo.save_subjects(&["Math".to_string()]).expect("save subjects succeeds");
        let service = GradeService::new(&repo);
        for (date, score) in [("2025-04-01", 80.0), ("2025-04-02", 90.0), ("2025-04-03", 90.0)] {
            service.record_grade("Math", record(date, score)).expect("record grade succeeds");
        }
        let outcome = service.required_score("Math", 90.0, 1, 1.0).expect("required score succeeds");
        assert!(matches!(outcome, RequiredScoreOutcome::Achievable { .. }));
        assert!((outcome.required() - 100.0).abs() < 1e-9);
    }
}
