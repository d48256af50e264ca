//! Goal management and progress evaluation.
//!
//! # Responsibility
//! - CRUD over the flat goal list.
//! - Measure targeted goals against grades and study time.
//! - Derive deadline status and typed recommendations.
//!
//! # Invariants
//! - Progress percentage is always within `0..=100`.
//! - Goals without a target have no measurable progress.

use crate::model::goal::{Goal, GoalId, GoalStatus, GoalTarget};
use crate::repo::study_repo::{GoalRepository, GradeRepository, ProgressRepository, SubjectRepository};
use crate::service::subject_service::ensure_subject;
use crate::service::{ServiceError, ServiceResult};
use chrono::NaiveDate;
use log::info;
use serde::Serialize;

/// Days before a deadline that count as approaching.
pub const APPROACHING_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressBand {
    Achieved,
    Almost,
    OnTrack,
    NeedsEffort,
}

impl ProgressBand {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 100.0 {
            Self::Achieved
        } else if percentage >= 75.0 {
            Self::Almost
        } else if percentage >= 50.0 {
            Self::OnTrack
        } else {
            Self::NeedsEffort
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GoalProgress {
    pub current: f64,
    pub target: f64,
    pub percentage: f64,
    pub remaining: f64,
    pub band: ProgressBand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "deadline", rename_all = "snake_case")]
pub enum DeadlineStatus {
    NoDeadline,
    Overdue { days_late: i64 },
    Approaching { days_remaining: i64 },
    Remaining { days_remaining: i64 },
}

impl DeadlineStatus {
    pub fn evaluate(deadline: Option<NaiveDate>, today: NaiveDate) -> Self {
        let Some(deadline) = deadline else {
            return Self::NoDeadline;
        };
        let days_remaining = (deadline - today).num_days();
        if days_remaining < 0 {
            Self::Overdue {
                days_late: -days_remaining,
            }
        } else if days_remaining <= APPROACHING_DAYS {
            Self::Approaching { days_remaining }
        } else {
            Self::Remaining { days_remaining }
        }
    }
}

/// Advice derived from progress, deadline and target kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "advice", rename_all = "snake_case")]
pub enum Recommendation {
    BehindSchedule,
    KeepPushing,
    OnTrack,
    AlmostThere,
    Achieved,
    Overdue,
    DailyPoints { per_day: f64 },
    DailyHours { per_day: f64 },
    ChipAway,
    ReviewWeakAreas,
    RebuildBasics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalEvaluation {
    pub goal: Goal,
    pub progress: Option<GoalProgress>,
    pub deadline: DeadlineStatus,
    pub recommendations: Vec<Recommendation>,
}

pub struct GoalService<R> {
    repo: R,
}

impl<R> GoalService<R>
where
    R: SubjectRepository + GoalRepository + GradeRepository + ProgressRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn add(&self, goal: Goal) -> ServiceResult<GoalId> {
        ensure_subject(&self.repo, &goal.subject)?;
        goal.validate()?;
        let id = goal.id;
        let mut goals = self.repo.load_goals()?;
        goals.push(goal);
        self.repo.save_goals(&goals)?;
        info!(
            "event=goal_add module=service status=ok total={}",
            goals.len()
        );
        Ok(id)
    }

    /// Goals, optionally restricted to one subject.
    pub fn list(&self, subject: Option<&str>) -> ServiceResult<Vec<Goal>> {
        let goals = self.repo.load_goals()?;
        Ok(match subject.map(str::trim) {
            Some(subject) => goals
                .into_iter()
                .filter(|goal| goal.subject == subject)
                .collect(),
            None => goals,
        })
    }

    pub fn set_status(&self, id: GoalId, status: GoalStatus) -> ServiceResult<()> {
        let mut goals = self.repo.load_goals()?;
        let goal = goals
            .iter_mut()
            .find(|goal| goal.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("goal {id}")))?;
        goal.status = status;
        self.repo.save_goals(&goals)?;
        info!("event=goal_status module=service status=ok goal_id={}", id);
        Ok(())
    }

    pub fn delete(&self, id: GoalId) -> ServiceResult<()> {
        let mut goals = self.repo.load_goals()?;
        let before = goals.len();
        goals.retain(|goal| goal.id != id);
        if goals.len() == before {
            return Err(ServiceError::NotFound(format!("goal {id}")));
        }
        self.repo.save_goals(&goals)?;
        info!("event=goal_delete module=service status=ok goal_id={}", id);
        Ok(())
    }

    /// Measures a goal against persisted grades and sessions.
    ///
    /// # Contract
    /// - Grade targets compare the most recent score with the target points.
    /// - Study-time targets compare total logged hours with the target.
    pub fn progress(&self, goal: &Goal) -> ServiceResult<Option<GoalProgress>> {
        let Some(target) = goal.target else {
            return Ok(None);
        };
        let current = match target {
            GoalTarget::Grade { .. } => self
                .repo
                .load_grades()?
                .get(&goal.subject)
                .and_then(|records| records.iter().max_by(|left, right| left.date.cmp(&right.date)))
                .map_or(0.0, |record| record.score),
            GoalTarget::StudyTime { .. } => self
                .repo
                .load_progress()?
                .get(&goal.subject)
                .map_or(0.0, |sessions| sessions.iter().map(|record| record.hours).sum()),
        };
        Ok(Some(measure(current, target.value())))
    }

    pub fn evaluate(&self, goal: &Goal, today: NaiveDate) -> ServiceResult<GoalEvaluation> {
        let progress = self.progress(goal)?;
        let deadline = DeadlineStatus::evaluate(goal.deadline, today);
        let recommendations = recommend(goal.target, progress.as_ref(), deadline);
        Ok(GoalEvaluation {
            goal: goal.clone(),
            progress,
            deadline,
            recommendations,
        })
    }

    /// Evaluations for all in-progress goals.
    pub fn evaluate_active(&self, today: NaiveDate) -> ServiceResult<Vec<GoalEvaluation>> {
        self.repo
            .load_goals()?
            .iter()
            .filter(|goal| goal.status == GoalStatus::InProgress)
            .map(|goal| self.evaluate(goal, today))
            .collect()
    }
}

fn measure(current: f64, target: f64) -> GoalProgress {
    let percentage = if target > 0.0 {
        (current / target * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };
    GoalProgress {
        current,
        target,
        percentage,
        remaining: (target - current).max(0.0),
        band: ProgressBand::from_percentage(percentage),
    }
}

fn recommend(
    target: Option<GoalTarget>,
    progress: Option<&GoalProgress>,
    deadline: DeadlineStatus,
) -> Vec<Recommendation> {
    let mut advice = Vec::new();
    let (Some(target), Some(progress)) = (target, progress) else {
        if matches!(deadline, DeadlineStatus::Overdue { .. }) {
            advice.push(Recommendation::Overdue);
        }
        return advice;
    };

    advice.push(match progress.percentage {
        p if p < 25.0 => Recommendation::BehindSchedule,
        p if p < 50.0 => Recommendation::KeepPushing,
        p if p < 75.0 => Recommendation::OnTrack,
        p if p < 100.0 => Recommendation::AlmostThere,
        _ => Recommendation::Achieved,
    });

    match deadline {
        DeadlineStatus::Overdue { .. } => advice.push(Recommendation::Overdue),
        DeadlineStatus::Approaching { days_remaining } if progress.percentage < 100.0 => {
            let per_day = progress.remaining / days_remaining.max(1) as f64;
            advice.push(match target {
                GoalTarget::Grade { .. } => Recommendation::DailyPoints { per_day },
                GoalTarget::StudyTime { .. } => Recommendation::DailyHours { per_day },
            });
        }
        _ => {}
    }

    if matches!(target, GoalTarget::Grade { .. }) && progress.remaining > 0.0 {
        advice.push(if progress.remaining <= 10.0 {
            Recommendation::ChipAway
        } else if progress.remaining <= 20.0 {
            Recommendation::ReviewWeakAreas
        } else {
            Recommendation::RebuildBasics
        });
    }
    advice
}

#[cfg(test)]
mod tests {
    use super::{measure, recommend, DeadlineStatus, ProgressBand, Recommendation};
    use crate::model::goal::GoalTarget;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).expect("valid date")
    }

    #[test]
    fn progress_is_capped_and_banded() {
        let over = measure(120.0, 100.0);
        assert_eq!(over.percentage, 100.0);
        assert_eq!(over.remaining, 0.0);
        assert_eq!(over.band, ProgressBand::Achieved);

        assert_eq!(measure(76.0, 100.0).band, ProgressBand::Almost);
        assert_eq!(measure(50.0, 100.0).band, ProgressBand::OnTrack);
        assert_eq!(measure(10.0, 100.0).band, ProgressBand::NeedsEffort);
    }

    #[test]
    fn deadline_windows() {
        assert_eq!(
            DeadlineStatus::evaluate(Some(day(1)), day(3)),
            DeadlineStatus::Overdue { days_late: 2 }
        );
        assert_eq!(
            DeadlineStatus::evaluate(Some(day(10)), day(3)),
            DeadlineStatus::Approaching { days_remaining: 7 }
        );
        assert_eq!(
            DeadlineStatus::evaluate(Some(day(11)), day(3)),
            DeadlineStatus::Remaining { days_remaining: 8 }
        );
        assert_eq!(DeadlineStatus::evaluate(None, day(3)), DeadlineStatus::NoDeadline);
    }

    #[test]
    fn approaching_grade_goal_gets_daily_pace() {
        let target = GoalTarget::Grade { points: 90.0 };
        let progress = measure(75.0, 90.0);
        let advice = recommend(
            Some(target),
            Some(&progress),
            DeadlineStatus::Approaching { days_remaining: 5 },
        );
        assert_eq!(advice[0], Recommendation::AlmostThere);
        assert_eq!(advice[1], Recommendation::DailyPoints { per_day: 3.0 });
        assert_eq!(advice[2], Recommendation::ReviewWeakAreas);
    }

    #[test]
    fn same_day_deadline_divides_by_one() {
        let target = GoalTarget::StudyTime { hours: 10.0 };
        let progress = measure(4.0, 10.0);
        let advice = recommend(
            Some(target),
            Some(&progress),
            DeadlineStatus::Approaching { days_remaining: 0 },
        );
        assert!(advice.contains(&Recommendation::DailyHours { per_day: 6.0 }));
    }
}
