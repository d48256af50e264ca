//! Record timestamp with format-preserving serde.
//!
//! # Responsibility
//! - Accept `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` and ISO
//!   `YYYY-MM-DDTHH:MM:SS` on read.
//! - Write back the same shape that was read, so unchanged files re-save
//!   with identical content.
//!
//! # Invariants
//! - Ordering and equality use the instant only; the textual shape is a
//!   presentation detail.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const ISO_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Date,
    DateTime,
    IsoDateTime,
}

impl Shape {
    fn format(self) -> &'static str {
        match self {
            Self::Date => DATE_FORMAT,
            Self::DateTime => DATE_TIME_FORMAT,
            Self::IsoDateTime => ISO_DATE_TIME_FORMAT,
        }
    }
}

/// Point in time attached to grade/progress records.
#[derive(Debug, Clone, Copy)]
pub struct RecordDate {
    at: NaiveDateTime,
    shape: Shape,
}

impl RecordDate {
    /// Date-only value at midnight.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            at: date.and_time(NaiveTime::MIN),
            shape: Shape::Date,
        }
    }

    pub fn from_date_time(at: NaiveDateTime) -> Self {
        Self {
            at,
            shape: Shape::DateTime,
        }
    }

    /// Parses `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` or ISO `YYYY-MM-DDTHH:MM:SS`.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
            return Some(Self::from_date(date));
        }
        if let Ok(at) = NaiveDateTime::parse_from_str(trimmed, DATE_TIME_FORMAT) {
            return Some(Self::from_date_time(at));
        }
        NaiveDateTime::parse_from_str(trimmed, ISO_DATE_TIME_FORMAT)
            .ok()
            .map(|at| Self {
                at,
                shape: Shape::IsoDateTime,
            })
    }

    pub fn at(&self) -> NaiveDateTime {
        self.at
    }

    pub fn date(&self) -> NaiveDate {
        self.at.date()
    }

    pub fn is_date_only(&self) -> bool {
        self.shape == Shape::Date
    }

    /// Fractional days from `earlier` to `self`.
    pub fn days_since(&self, earlier: &RecordDate) -> f64 {
        let delta = self.at - earlier.at;
        delta.num_seconds() as f64 / 86_400.0
    }

    /// Returns a new date shifted forward by whole days, keeping the format.
    pub fn plus_days(&self, days: i64) -> Self {
        Self {
            at: self.at + Duration::days(days),
            shape: self.shape,
        }
    }
}

impl PartialEq for RecordDate {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at
    }
}

impl Eq for RecordDate {}

impl PartialOrd for RecordDate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RecordDate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at.cmp(&other.at)
    }
}

impl Display for RecordDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.at.format(self.shape.format()))
    }
}

impl Serialize for RecordDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RecordDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        RecordDate::parse(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid record date `{raw}`")))
    }
}

/// Serde helpers for optional `YYYY-MM-DD` fields where `""` means unset.
pub mod optional_date {
    use super::DATE_FORMAT;
    use chrono::NaiveDate;
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => s.collect_str(&date.format(DATE_FORMAT)),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(d)?.unwrap_or_default();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid date `{trimmed}`; expected YYYY-MM-DD")))
    }
}

#[cfg(test)]
mod tests {
    use super::RecordDate;

    #[test]
    fn parse_keeps_original_shape_on_display() {
        let date_only = RecordDate::parse("2025-04-01").expect("date-only should parse");
        assert!(date_only.is_date_only());
        assert_eq!(date_only.to_string(), "2025-04-01");

        let with_time = RecordDate::parse("2025-04-01 08:30:00").expect("date-time should parse");
        assert!(!with_time.is_date_only());
        assert_eq!(with_time.to_string(), "2025-04-01 08:30:00");

        let iso = RecordDate::parse("2025-04-01T08:30:00").expect("iso date-time should parse");
        assert_eq!(iso, with_time);
        assert_eq!(iso.to_string(), "2025-04-01T08:30:00");
        assert_eq!(iso.plus_days(1).to_string(), "2025-04-02T08:30:00");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(RecordDate::parse("yesterday").is_none());
        assert!(RecordDate::parse("2025-13-01").is_none());
    }

    #[test]
    fn days_since_counts_fractional_days() {
        let first = RecordDate::parse("2025-04-01").expect("date-only should parse");
        let second = RecordDate::parse("2025-04-02 12:00:00").expect("date-time should parse");
        assert!((second.days_since(&first) - 1.5).abs() < 1e-9);
    }
}
