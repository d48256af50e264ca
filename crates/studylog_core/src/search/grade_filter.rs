//! Grade filtering and keyword search.
//!
//! # Invariants
//! - Filters never modify records; they select and reorder copies.
//! - Subjects left without matching records are omitted from the result.
//! - Period bounds are inclusive calendar days relative to a caller-given
//!   `today`.

use crate::model::grade::{GradeKind, GradeRecord};
use crate::model::validation::MAX_SCORE;
use crate::model::GradeBook;
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Time window a filter keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "period", rename_all = "snake_case")]
pub enum Period {
    #[default]
    All,
    /// Monday of the current week through `today`.
    ThisWeek,
    /// First of the current month through `today`.
    ThisMonth,
    /// The last `days` days through `today`.
    LastDays { days: u32 },
    Custom { start: NaiveDate, end: NaiveDate },
}

impl Period {
    /// Inclusive day range, or `None` for an unbounded period.
    pub fn range(self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            Self::All => None,
            Self::ThisWeek => {
                let offset = i64::from(today.weekday().num_days_from_monday());
                Some((today - Duration::days(offset), today))
            }
            Self::ThisMonth => Some((today.with_day(1).unwrap_or(today), today)),
            Self::LastDays { days } => Some((today - Duration::days(i64::from(days)), today)),
            Self::Custom { start, end } => Some((start, end)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Date,
    Score,
    Kind,
}

/// Combined filter; the default keeps everything, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeFilter {
    pub period: Period,
    /// Empty keeps every subject.
    pub subjects: Vec<String>,
    /// Empty keeps every kind.
    pub kinds: Vec<GradeKind>,
    pub min_score: f64,
    pub max_score: f64,
    /// Case-insensitive match on comment, kind or subject name.
    pub keyword: Option<String>,
    pub sort: SortKey,
    pub ascending: bool,
}

impl Default for GradeFilter {
    fn default() -> Self {
        Self {
            period: Period::All,
            subjects: Vec::new(),
            kinds: Vec::new(),
            min_score: 0.0,
            max_score: MAX_SCORE,
            keyword: None,
            sort: SortKey::Date,
            ascending: false,
        }
    }
}

/// One matching record with its subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeHit {
    pub subject: String,
    pub record: GradeRecord,
}

impl GradeFilter {
    pub fn with_period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn matches(&self, subject: &str, record: &GradeRecord, today: NaiveDate) -> bool {
        if let Some((start, end)) = self.period.range(today) {
            let day = record.date.date();
            if day < start || day > end {
                return false;
            }
        }
        if !self.subjects.is_empty() && !self.subjects.iter().any(|wanted| wanted == subject) {
            return false;
        }
        if !self.kinds.is_empty() && !self.kinds.contains(&record.kind) {
            return false;
        }
        if record.score < self.min_score || record.score > self.max_score {
            return false;
        }
        match self.keyword.as_deref().map(str::trim).filter(|keyword| !keyword.is_empty()) {
            None => true,
            Some(keyword) => {
                let needle = keyword.to_lowercase();
                record.comment.to_lowercase().contains(&needle)
                    || record.kind.as_str().contains(&needle)
                    || subject.to_lowercase().contains(&needle)
            }
        }
    }

    /// Filtered copy of `book`, each subject sorted by the filter's key.
    pub fn apply(&self, book: &GradeBook, today: NaiveDate) -> GradeBook {
        let mut filtered = GradeBook::new();
        for (subject, records) in book {
            let mut kept: Vec<GradeRecord> = records
                .iter()
                .filter(|record| self.matches(subject, record, today))
                .cloned()
                .collect();
            if kept.is_empty() {
                continue;
            }
            self.sort_records(&mut kept);
            filtered.insert(subject.clone(), kept);
        }
        filtered
    }

    /// Matching records across subjects as one sorted list.
    pub fn search(&self, book: &GradeBook, today: NaiveDate) -> Vec<GradeHit> {
        let mut hits: Vec<GradeHit> = book
            .iter()
            .flat_map(|(subject, records)| {
                records
                    .iter()
                    .filter(move |record| self.matches(subject, record, today))
                    .map(move |record| GradeHit {
                        subject: subject.clone(),
                        record: record.clone(),
                    })
            })
            .collect();
        hits.sort_by(|a, b| {
            let ordering = compare(self.sort, &a.record, &b.record);
            if self.ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });
        hits
    }

    fn sort_records(&self, records: &mut [GradeRecord]) {
        records.sort_by(|a, b| {
            let ordering = compare(self.sort, a, b);
            if self.ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });
    }
}

fn compare(key: SortKey, a: &GradeRecord, b: &GradeRecord) -> std::cmp::Ordering {
    match key {
        SortKey::Date => a.date.cmp(&b.date),
        SortKey::Score => a.score.total_cmp(&b.score),
        SortKey::Kind => a.kind.as_str().cmp(b.kind.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::{GradeFilter, Period, SortKey};
    use crate::model::date::RecordDate;
    use crate::model::grade::{GradeKind, GradeRecord};
    use crate::model::GradeBook;
    use chrono::NaiveDate;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).expect("valid date")
    }

    fn record(date: NaiveDate, kind: GradeKind, score: f64, comment: &str) -> GradeRecord {
        GradeRecord::new(RecordDate::from_date(date), kind, score, 1.0)
            .expect("valid grade")
            .with_comment(comment)
    }

    fn book() -> GradeBook {
        let mut book = GradeBook::new();
        book.insert(
            "Math".into(),
            vec![
                record(day(5, 2), GradeKind::Test, 72.0, "algebra unit"),
                record(day(6, 3), GradeKind::Quiz, 88.0, "fractions"),
                record(day(6, 5), GradeKind::Test, 64.0, "Geometry mock"),
            ],
        );
        book.insert(
            "English".into(),
            vec![record(day(6, 4), GradeKind::Assignment, 91.0, "essay")],
        );
        book
    }

    #[test]
    fn periods_resolve_against_today() {
        let today = day(6, 5);
        assert_eq!(Period::ThisWeek.range(today), Some((day(6, 2), today)));
        assert_eq!(Period::ThisMonth.range(today), Some((day(6, 1), today)));
        assert_eq!(Period::LastDays { days: 90 }.range(today), Some((day(3, 7), today)));
        assert_eq!(Period::All.range(today), None);
    }

    #[test]
    fn default_filter_keeps_everything_newest_first() {
        let filtered = GradeFilter::default().apply(&book(), day(6, 5));
        let scores: Vec<f64> = filtered["Math"].iter().map(|record| record.score).collect();
        assert_eq!(scores, vec![64.0, 88.0, 72.0]);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn criteria_combine_and_drop_empty_subjects() {
        let filter = GradeFilter {
            kinds: vec![GradeKind::Test, GradeKind::Quiz],
            min_score: 70.0,
            ..GradeFilter::default()
        }
        .with_period(Period::ThisMonth);
        let filtered = filter.apply(&book(), day(6, 5));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered["Math"].len(), 1);
        assert_eq!(filtered["Math"][0].score, 88.0);
    }

    #[test]
    fn keyword_search_is_case_insensitive_across_fields() {
        let hits = GradeFilter::default()
            .with_keyword("GEOMETRY")
            .search(&book(), day(6, 5));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].subject, "Math");

        let by_subject = GradeFilter::default().with_keyword("engl").search(&book(), day(6, 5));
        assert_eq!(by_subject.len(), 1);

        let sorted = GradeFilter {
            sort: SortKey::Score,
            ascending: true,
            ..GradeFilter::default()
        }
        .search(&book(), day(6, 5));
        let scores: Vec<f64> = sorted.iter().map(|hit| hit.record.score).collect();
        assert_eq!(scores, vec![64.0, 72.0, 88.0, 91.0]);
    }
}
