//! CSV export of grades, study sessions and goals.
//!
//! # Responsibility
//! - Write one CSV per dataset with a fixed English header row.
//! - Reuse [`GradeFilter`] and [`Period`] so exports match filtered views.
//!
//! # Invariants
//! - Rows are newest first; goals keep their stored order.
//! - The header row is written even when no record matches.
//! - `export_all` skips datasets without rows instead of writing empty files.

use crate::model::goal::{Goal, GoalHorizon, GoalStatus};
use crate::model::{GradeBook, ProgressLog};
use crate::repo::json_store::StoreError;
use crate::repo::study_repo::{GoalRepository, GradeRepository, ProgressRepository};
use crate::search::grade_filter::{GradeFilter, GradeHit, Period};
use chrono::{NaiveDate, NaiveDateTime};
use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const GRADE_HEADER: [&str; 6] = ["subject", "date", "type", "score", "weight", "comment"];
pub const PROGRESS_HEADER: [&str; 5] = ["subject", "date", "hours", "task", "motivation"];
pub const GOAL_HEADER: [&str; 6] = ["id", "subject", "horizon", "text", "deadline", "status"];

const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug)]
pub enum ExportError {
    Io { path: PathBuf, source: std::io::Error },
    Csv(csv::Error),
    Store(StoreError),
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot write export {}: {source}", path.display()),
            Self::Csv(err) => write!(f, "csv encoding failed: {err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<csv::Error> for ExportError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<StoreError> for ExportError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

#[derive(Serialize)]
struct GradeRow<'a> {
    subject: &'a str,
    date: String,
    kind: &'static str,
    score: f64,
    weight: f64,
    comment: &'a str,
}

#[derive(Serialize)]
struct ProgressRow<'a> {
    subject: &'a str,
    date: String,
    hours: f64,
    task: &'a str,
    motivation: u8,
}

#[derive(Serialize)]
struct GoalRow<'a> {
    id: String,
    subject: &'a str,
    horizon: GoalHorizon,
    text: &'a str,
    deadline: Option<NaiveDate>,
    status: GoalStatus,
}

fn csv_writer<W: Write>(writer: W, header: &[&str]) -> csv::Result<csv::Writer<W>> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv.write_record(header)?;
    Ok(csv)
}

/// Writes grade hits in the given order; returns the row count.
pub fn write_grades<W: Write>(writer: W, hits: &[GradeHit]) -> csv::Result<usize> {
    let mut csv = csv_writer(writer, &GRADE_HEADER)?;
    for hit in hits {
        csv.serialize(GradeRow {
            subject: &hit.subject,
            date: hit.record.date.to_string(),
            kind: hit.record.kind.as_str(),
            score: hit.record.score,
            weight: hit.record.weight,
            comment: &hit.record.comment,
        })?;
    }
    csv.flush()?;
    Ok(hits.len())
}

/// Writes sessions inside `period`, newest first; returns the row count.
pub fn write_progress<W: Write>(
    writer: W,
    log: &ProgressLog,
    period: Period,
    today: NaiveDate,
) -> csv::Result<usize> {
    let range = period.range(today);
    let mut rows: Vec<(&str, &crate::model::progress::ProgressRecord)> = log
        .iter()
        .flat_map(|(subject, records)| records.iter().map(move |record| (subject.as_str(), record)))
        .filter(|(_, record)| {
            range.map_or(true, |(start, end)| {
                let day = record.date.date();
                day >= start && day <= end
            })
        })
        .collect();
    rows.sort_by(|a, b| b.1.date.cmp(&a.1.date));

    let mut csv = csv_writer(writer, &PROGRESS_HEADER)?;
    for (subject, record) in &rows {
        csv.serialize(ProgressRow {
            subject,
            date: record.date.to_string(),
            hours: record.hours,
            task: &record.task,
            motivation: record.motivation,
        })?;
    }
    csv.flush()?;
    Ok(rows.len())
}

pub fn write_goals<W: Write>(writer: W, goals: &[Goal]) -> csv::Result<usize> {
    let mut csv = csv_writer(writer, &GOAL_HEADER)?;
    for goal in goals {
        csv.serialize(GoalRow {
            id: goal.id.to_string(),
            subject: &goal.subject,
            horizon: goal.horizon,
            text: &goal.text,
            deadline: goal.deadline,
            status: goal.status,
        })?;
    }
    csv.flush()?;
    Ok(goals.len())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub rows: usize,
}

pub struct ExportService<R> {
    repo: R,
}

impl<R> ExportService<R>
where
    R: GradeRepository + ProgressRepository + GoalRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn grades_csv<W: Write>(
        &self,
        writer: W,
        filter: &GradeFilter,
        today: NaiveDate,
    ) -> ExportResult<usize> {
        let book: GradeBook = self.repo.load_grades()?;
        Ok(write_grades(writer, &filter.search(&book, today))?)
    }

    pub fn progress_csv<W: Write>(
        &self,
        writer: W,
        period: Period,
        today: NaiveDate,
    ) -> ExportResult<usize> {
        let log = self.repo.load_progress()?;
        Ok(write_progress(writer, &log, period, today)?)
    }

    pub fn goals_csv<W: Write>(&self, writer: W) -> ExportResult<usize> {
        let goals = self.repo.load_goals()?;
        Ok(write_goals(writer, &goals)?)
    }

    /// Writes every non-empty dataset to `dir` as `<name>_<stamp>.csv`.
    pub fn export_all(&self, dir: &Path, at: NaiveDateTime) -> ExportResult<Vec<ExportedFile>> {
        std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let stamp = at.format(FILE_STAMP_FORMAT).to_string();
        let today = at.date();

        let book = self.repo.load_grades()?;
        let hits = GradeFilter::default().search(&book, today);
        let log = self.repo.load_progress()?;
        let sessions: usize = log.values().map(Vec::len).sum();
        let goals = self.repo.load_goals()?;

        let mut written = Vec::new();
        if !hits.is_empty() {
            let path = dir.join(format!("grades_{stamp}.csv"));
            let rows = write_grades(create(&path)?, &hits)?;
            written.push(ExportedFile { path, rows });
        }
        if sessions > 0 {
            let path = dir.join(format!("progress_{stamp}.csv"));
            let rows = write_progress(create(&path)?, &log, Period::All, today)?;
            written.push(ExportedFile { path, rows });
        }
        if !goals.is_empty() {
            let path = dir.join(format!("goals_{stamp}.csv"));
            let rows = write_goals(create(&path)?, &goals)?;
            written.push(ExportedFile { path, rows });
        }
        info!(
            "event=export_all module=service status=ok files={} dir={}",
            written.len(),
            dir.display()
        );
        Ok(written)
    }
}

fn create(path: &Path) -> ExportResult<File> {
    File::create(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}
