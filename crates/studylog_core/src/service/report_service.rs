//! Weekly and monthly study reports.
//!
//! # Responsibility
//! - Aggregate grades, study time, active goals and overdue reminders for
//!   one calendar week or month.
//! - Render the aggregate as plain text and hand it to the assistant.
//!
//! # Invariants
//! - Weeks run Monday through Sunday; months run from the 1st through the
//!   last day. Both bounds are inclusive.
//! - Subject time shares sum to 100 when any time was logged.

use crate::model::goal::{Goal, GoalStatus};
use crate::model::reminder::Reminder;
use crate::repo::study_repo::{GoalRepository, GradeRepository, ProgressRepository, ReminderRepository};
use crate::search::grade_filter::{GradeFilter, Period};
use crate::service::reminder_service::categorize;
use crate::service::ServiceResult;
use crate::stats::aggregate::mean;
use chrono::{Datelike, Duration, NaiveDate};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Goals and reminders listed in the text rendering.
pub const LISTED_ITEMS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    Weekly,
    Monthly,
}

impl ReportPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Calendar week or month containing `today`.
    pub fn range(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            Self::Weekly => {
                let start = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
                (start, start + Duration::days(6))
            }
            Self::Monthly => {
                let start = today.with_day(1).unwrap_or(today);
                let next = if start.month() == 12 {
                    NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
                };
                let end = next.map_or(today, |next| next - Duration::days(1));
                (start, end)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeOverview {
    pub count: usize,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectGrades {
    pub subject: String,
    pub count: usize,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectTime {
    pub subject: String,
    pub hours: f64,
    pub sessions: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodReport {
    pub period: ReportPeriod,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub generated_on: NaiveDate,
    pub grades: Option<GradeOverview>,
    /// Alphabetical by subject.
    pub subject_grades: Vec<SubjectGrades>,
    pub total_hours: f64,
    /// Most studied first.
    pub subject_time: Vec<SubjectTime>,
    pub active_goals: Vec<Goal>,
    pub overdue_reminders: Vec<Reminder>,
}

impl PeriodReport {
    pub fn has_activity(&self) -> bool {
        self.grades.is_some() || self.total_hours > 0.0
    }

    pub fn render_text(&self) -> String {
        let rule = "=".repeat(50);
        let mut out = String::new();
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "{} study report", capitalized(self.period.as_str()));
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Period: {} to {}", self.start, self.end);
        let _ = writeln!(out, "Generated: {}", self.generated_on);

        out.push_str("\n## Grades\n");
        match &self.grades {
            Some(overview) => {
                let _ = writeln!(out, "Records: {}", overview.count);
                let _ = writeln!(out, "Mean: {:.1}", overview.mean);
                let _ = writeln!(out, "Highest: {:.1}", overview.max);
                let _ = writeln!(out, "Lowest: {:.1}", overview.min);
                for subject in &self.subject_grades {
                    let _ = writeln!(
                        out,
                        "  - {}: mean {:.1} ({} records)",
                        subject.subject, subject.mean, subject.count
                    );
                }
            }
            None => out.push_str("No grades recorded in this period.\n"),
        }

        out.push_str("\n## Study time\n");
        if self.subject_time.is_empty() {
            out.push_str("No study time recorded in this period.\n");
        } else {
            let _ = writeln!(out, "Total: {:.1} h", self.total_hours);
            for subject in &self.subject_time {
                let _ = writeln!(
                    out,
                    "  - {}: {:.1} h ({:.1}%)",
                    subject.subject, subject.hours, subject.percentage
                );
            }
        }

        out.push_str("\n## Goals\n");
        if self.active_goals.is_empty() {
            out.push_str("No active goals.\n");
        } else {
            let _ = writeln!(out, "Active goals: {}", self.active_goals.len());
            for goal in self.active_goals.iter().take(LISTED_ITEMS) {
                let _ = writeln!(out, "  - {}: {}", goal.subject, goal.text);
            }
        }

        out.push_str("\n## Reminders\n");
        if self.overdue_reminders.is_empty() {
            out.push_str("No overdue reminders.\n");
        } else {
            let _ = writeln!(out, "Overdue reminders: {}", self.overdue_reminders.len());
            for reminder in self.overdue_reminders.iter().take(LISTED_ITEMS) {
                let _ = writeln!(out, "  - {} (due {})", reminder.text, reminder.effective_date());
            }
        }
        out
    }
}

fn capitalized(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub struct ReportService<R> {
    repo: R,
}

impl<R> ReportService<R>
where
    R: GradeRepository + ProgressRepository + GoalRepository + ReminderRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn build(&self, period: ReportPeriod, today: NaiveDate) -> ServiceResult<PeriodReport> {
        let (start, end) = period.range(today);

        let book = self.repo.load_grades()?;
        let hits = GradeFilter::default()
            .with_period(Period::Custom { start, end })
            .search(&book, today);
        let scores: Vec<f64> = hits.iter().map(|hit| hit.record.score).collect();
        let grades = mean(&scores).map(|mean| GradeOverview {
            count: scores.len(),
            mean,
            max: scores.iter().copied().fold(f64::MIN, f64::max),
            min: scores.iter().copied().fold(f64::MAX, f64::min),
        });
        let mut by_subject: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for hit in &hits {
            by_subject.entry(hit.subject.as_str()).or_default().push(hit.record.score);
        }
        let subject_grades = by_subject
            .into_iter()
            .filter_map(|(subject, scores)| {
                mean(&scores).map(|mean| SubjectGrades {
                    subject: subject.to_string(),
                    count: scores.len(),
                    mean,
                })
            })
            .collect();

        let log = self.repo.load_progress()?;
        let mut subject_time: Vec<SubjectTime> = log
            .iter()
            .filter_map(|(subject, records)| {
                let in_range: Vec<f64> = records
                    .iter()
                    .filter(|record| {
                        let day = record.date.date();
                        day >= start && day <= end
                    })
                    .map(|record| record.hours)
                    .collect();
                if in_range.is_empty() {
                    return None;
                }
                Some(SubjectTime {
                    subject: subject.clone(),
                    hours: in_range.iter().sum(),
                    sessions: in_range.len(),
                    percentage: 0.0,
                })
            })
            .collect();
        let total_hours: f64 = subject_time.iter().map(|entry| entry.hours).sum();
        if total_hours > 0.0 {
            for entry in &mut subject_time {
                entry.percentage = entry.hours / total_hours * 100.0;
            }
        }
        subject_time.sort_by(|a, b| b.hours.total_cmp(&a.hours));

        let active_goals: Vec<Goal> = self
            .repo
            .load_goals()?
            .into_iter()
            .filter(|goal| goal.status == GoalStatus::InProgress)
            .collect();
        let overdue_reminders = categorize(&self.repo.load_reminders()?, today).overdue;

        info!(
            "event=report_build module=service status=ok period={} start={} grades={} hours={:.1}",
            period.as_str(),
            start,
            hits.len(),
            total_hours
        );
        Ok(PeriodReport {
            period,
            start,
            end,
            generated_on: today,
            grades,
            subject_grades,
            total_hours,
            subject_time,
            active_goals,
            overdue_reminders,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ReportPeriod;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn week_runs_monday_to_sunday() {
        // 2025-06-12 is a Thursday.
        assert_eq!(
            ReportPeriod::Weekly.range(day(2025, 6, 12)),
            (day(2025, 6, 9), day(2025, 6, 15))
        );
    }

    #[test]
    fn month_covers_whole_calendar_month() {
        assert_eq!(
            ReportPeriod::Monthly.range(day(2024, 2, 10)),
            (day(2024, 2, 1), day(2024, 2, 29))
        );
        assert_eq!(
            ReportPeriod::Monthly.range(day(2024, 12, 31)),
            (day(2024, 12, 1), day(2024, 12, 31))
        );
    }
}
