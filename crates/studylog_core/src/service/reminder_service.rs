//! Reminder scheduling and categorization.
//!
//! # Invariants
//! - Completed reminders never appear in a [`ReminderDigest`].
//! - Completing a recurring reminder appends exactly one successor.
//! - A snooze only moves the effective date forward.

use crate::model::reminder::{Reminder, ReminderId};
use crate::repo::study_repo::{ReminderRepository, SubjectRepository};
use crate::service::subject_service::ensure_subject;
use crate::service::{ServiceError, ServiceResult};
use chrono::{Duration, NaiveDate};
use log::info;
use serde::Serialize;

/// Upcoming horizon in days.
pub const UPCOMING_DAYS: i64 = 7;

/// Open reminders grouped relative to one day.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReminderDigest {
    pub overdue: Vec<Reminder>,
    /// Due today or tomorrow.
    pub urgent: Vec<Reminder>,
    /// Due within [`UPCOMING_DAYS`] but after tomorrow.
    pub upcoming: Vec<Reminder>,
}

impl ReminderDigest {
    pub fn is_empty(&self) -> bool {
        self.overdue.is_empty() && self.urgent.is_empty() && self.upcoming.is_empty()
    }
}

/// Groups open reminders by effective date; later reminders are left out.
pub fn categorize(reminders: &[Reminder], today: NaiveDate) -> ReminderDigest {
    let mut digest = ReminderDigest::default();
    let mut open: Vec<&Reminder> = reminders.iter().filter(|reminder| !reminder.completed).collect();
    open.sort_by_key(|reminder| reminder.effective_date());
    for reminder in open {
        let days = (reminder.effective_date() - today).num_days();
        if days < 0 {
            digest.overdue.push(reminder.clone());
        } else if days <= 1 {
            digest.urgent.push(reminder.clone());
        } else if days <= UPCOMING_DAYS {
            digest.upcoming.push(reminder.clone());
        }
    }
    digest
}

pub struct ReminderService<R> {
    repo: R,
}

impl<R> ReminderService<R>
where
    R: SubjectRepository + ReminderRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn add(&self, reminder: Reminder) -> ServiceResult<ReminderId> {
        ensure_subject(&self.repo, &reminder.subject)?;
        reminder.validate()?;
        let id = reminder.id;
        let mut reminders = self.repo.load_reminders()?;
        reminders.push(reminder);
        self.repo.save_reminders(&reminders)?;
        info!(
            "event=reminder_add module=service status=ok total={}",
            reminders.len()
        );
        Ok(id)
    }

    /// Creates one reminder per offset before `deadline`, skipping dates
    /// already in the past relative to `today`.
    pub fn schedule_before_deadline(
        &self,
        subject: &str,
        kind: &str,
        deadline: NaiveDate,
        text: &str,
        offsets_days: &[i64],
        today: NaiveDate,
    ) -> ServiceResult<Vec<ReminderId>> {
        let subject = ensure_subject(&self.repo, subject)?;
        let mut reminders = self.repo.load_reminders()?;
        let mut created = Vec::new();
        for offset in offsets_days {
            let date = deadline - Duration::days(*offset);
            if date < today {
                continue;
            }
            let reminder = Reminder::new(&subject, kind, date, text)?;
            created.push(reminder.id);
            reminders.push(reminder);
        }
        if !created.is_empty() {
            self.repo.save_reminders(&reminders)?;
        }
        info!(
            "event=reminder_schedule module=service status=ok subject={} created={}",
            subject,
            created.len()
        );
        Ok(created)
    }

    pub fn list(&self) -> ServiceResult<Vec<Reminder>> {
        Ok(self.repo.load_reminders()?)
    }

    pub fn digest(&self, today: NaiveDate) -> ServiceResult<ReminderDigest> {
        Ok(categorize(&self.repo.load_reminders()?, today))
    }

    /// Marks a reminder done; returns the successor id for recurring ones.
    pub fn complete(&self, id: ReminderId) -> ServiceResult<Option<ReminderId>> {
        let mut reminders = self.repo.load_reminders()?;
        let reminder = find_mut(&mut reminders, id)?;
        if reminder.completed {
            return Ok(None);
        }
        reminder.completed = true;
        let successor = reminder.next_occurrence();
        let successor_id = successor.as_ref().map(|next| next.id);
        reminders.extend(successor);
        self.repo.save_reminders(&reminders)?;
        info!(
            "event=reminder_complete module=service status=ok reminder_id={} recurring={}",
            id,
            successor_id.is_some()
        );
        Ok(successor_id)
    }

    pub fn snooze(&self, id: ReminderId, until: NaiveDate) -> ServiceResult<()> {
        let mut reminders = self.repo.load_reminders()?;
        let reminder = find_mut(&mut reminders, id)?;
        if until > reminder.effective_date() {
            reminder.snoozed_until = Some(until);
        }
        self.repo.save_reminders(&reminders)?;
        info!("event=reminder_snooze module=service status=ok reminder_id={}", id);
        Ok(())
    }

    pub fn delete(&self, id: ReminderId) -> ServiceResult<()> {
        let mut reminders = self.repo.load_reminders()?;
        let before = reminders.len();
        reminders.retain(|reminder| reminder.id != id);
        if reminders.len() == before {
            return Err(ServiceError::NotFound(format!("reminder {id}")));
        }
        self.repo.save_reminders(&reminders)?;
        info!("event=reminder_delete module=service status=ok reminder_id={}", id);
        Ok(())
    }
}

fn find_mut(reminders: &mut [Reminder], id: ReminderId) -> ServiceResult<&mut Reminder> {
    reminders
        .iter_mut()
        .find(|reminder| reminder.id == id)
        .ok_or_else(|| ServiceError::NotFound(format!("reminder {id}")))
}

#[cfg(test)]
mod tests {
    use super::categorize;
    use crate::model::reminder::Reminder;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).expect("valid date")
    }

    #[test]
    fn categorize_uses_effective_date_and_skips_completed() {
        let today = day(10);
        let overdue = Reminder::new("Math", "exam", day(8), "late").expect("valid reminder");
        let tomorrow = Reminder::new("Math", "exam", day(11), "soon").expect("valid reminder");
        let next_week = Reminder::new("Math", "exam", day(17), "later").expect("valid reminder");
        let far = Reminder::new("Math", "exam", day(25), "far").expect("valid reminder");
        let mut done = Reminder::new("Math", "exam", day(9), "done").expect("valid reminder");
        done.completed = true;
        let mut snoozed = Reminder::new("Math", "exam", day(9), "snoozed").expect("valid reminder");
        snoozed.snoozed_until = Some(day(14));

        let digest = categorize(
            &[overdue, tomorrow, next_week, far, done, snoozed],
            today,
        );
        let texts = |items: &[Reminder]| items.iter().map(|r| r.text.clone()).collect::<Vec<_>>();
        assert_eq!(texts(&digest.overdue), vec!["late"]);
        assert_eq!(texts(&digest.urgent), vec!["soon"]);
        assert_eq!(texts(&digest.upcoming), vec!["snoozed", "later"]);
    }
}
