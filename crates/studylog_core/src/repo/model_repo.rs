//! Trained-model persistence in SQLite.
//!
//! # Responsibility
//! - Store one current model per subject plus an append-only training log.
//! - Keep SQL and payload encoding inside this module.
//!
//! # Invariants
//! - Saving a model for a subject replaces the previous one and assigns a
//!   fresh `model_id`.
//! - `save_training` writes the model and its run in one transaction; a
//!   failed run insert leaves the previous model in place.
//! - Read paths reject undecodable payloads instead of skipping them.

use crate::db::DbError;
use crate::ml::pipeline::{TrainedModel, TrainingReport};
use crate::ml::regressor::RegressorKind;
use crate::model::date::DATE_TIME_FORMAT;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type ModelId = Uuid;
pub type ModelStoreResult<T> = Result<T, ModelStoreError>;

#[derive(Debug)]
pub enum ModelStoreError {
    Db(DbError),
    Payload(serde_json::Error),
    InvalidData(String),
}

impl Display for ModelStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Payload(err) => write!(f, "model payload encoding failed: {err}"),
            Self::InvalidData(message) => write!(f, "invalid stored model data: {message}"),
        }
    }
}

impl Error for ModelStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Payload(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for ModelStoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for ModelStoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for ModelStoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Payload(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredModel {
    pub model_id: ModelId,
    pub model: TrainedModel,
}

/// Metadata row without the decoded payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub subject: String,
    pub model_id: ModelId,
    pub kind: RegressorKind,
    pub sample_count: usize,
    pub test_r2: f64,
    pub trained_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingRun {
    pub run_id: Uuid,
    pub subject: String,
    pub best_kind: RegressorKind,
    pub test_r2: f64,
    pub sample_count: usize,
    pub trained_at: NaiveDateTime,
    pub report: serde_json::Value,
}

pub trait ModelRepository {
    fn save_model(&self, model: &TrainedModel) -> ModelStoreResult<ModelId>;
    fn load_model(&self, subject: &str) -> ModelStoreResult<Option<StoredModel>>;
    fn delete_model(&self, subject: &str) -> ModelStoreResult<bool>;
    fn list_models(&self) -> ModelStoreResult<Vec<ModelSummary>>;
    fn record_training_run(
        &self,
        report: &TrainingReport,
        trained_at: NaiveDateTime,
    ) -> ModelStoreResult<Uuid>;
    /// Replaces the subject's model and appends its run atomically.
    fn save_training(
        &self,
        model: &TrainedModel,
        report: &TrainingReport,
        trained_at: NaiveDateTime,
    ) -> ModelStoreResult<(ModelId, Uuid)>;
    /// Runs for `subject`, newest first.
    fn list_training_runs(&self, subject: &str) -> ModelStoreResult<Vec<TrainingRun>>;
}

pub struct SqliteModelRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteModelRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ModelRepository for SqliteModelRepository<'_> {
    fn save_model(&self, model: &TrainedModel) -> ModelStoreResult<ModelId> {
        insert_model(self.conn, model)
    }

    fn load_model(&self, subject: &str) -> ModelStoreResult<Option<StoredModel>> {
        let row = self
            .conn
            .query_row(
                "SELECT model_id, payload FROM prediction_models WHERE subject = ?1;",
                params![subject],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((model_id, payload)) = row else {
            return Ok(None);
        };
        let model: TrainedModel = serde_json::from_str(&payload)?;
        if model.subject != subject {
            return Err(ModelStoreError::InvalidData(format!(
                "payload subject `{}` does not match key `{subject}`",
                model.subject
            )));
        }
        Ok(Some(StoredModel {
            model_id: parse_uuid(&model_id)?,
            model,
        }))
    }

    fn delete_model(&self, subject: &str) -> ModelStoreResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM prediction_models WHERE subject = ?1;",
            params![subject],
        )?;
        Ok(changed > 0)
    }

    fn list_models(&self) -> ModelStoreResult<Vec<ModelSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT subject, model_id, model_kind, sample_count, test_r2, trained_at
             FROM prediction_models
             ORDER BY subject ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut summaries = Vec::new();
        while let Some(row) = rows.next()? {
            summaries.push(parse_summary_row(row)?);
        }
        Ok(summaries)
    }

    fn record_training_run(
        &self,
        report: &TrainingReport,
        trained_at: NaiveDateTime,
    ) -> ModelStoreResult<Uuid> {
        insert_training_run(self.conn, report, trained_at)
    }

    fn save_training(
        &self,
        model: &TrainedModel,
        report: &TrainingReport,
        trained_at: NaiveDateTime,
    ) -> ModelStoreResult<(ModelId, Uuid)> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let model_id = insert_model(&tx, model)?;
        let run_id = insert_training_run(&tx, report, trained_at)?;
        tx.commit()?;
        Ok((model_id, run_id))
    }

    fn list_training_runs(&self, subject: &str) -> ModelStoreResult<Vec<TrainingRun>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, subject, best_kind, test_r2, sample_count, report, trained_at
             FROM training_runs
             WHERE subject = ?1
             ORDER BY trained_at DESC, run_id ASC;",
        )?;
        let mut rows = stmt.query(params![subject])?;
        let mut runs = Vec::new();
        while let Some(row) = rows.next()? {
            let report: String = row.get(5)?;
            runs.push(TrainingRun {
                run_id: parse_uuid(&row.get::<_, String>(0)?)?,
                subject: row.get(1)?,
                best_kind: parse_kind(&row.get::<_, String>(2)?)?,
                test_r2: row.get(3)?,
                sample_count: from_db_count(row.get(4)?)?,
                report: serde_json::from_str(&report)?,
                trained_at: parse_timestamp(&row.get::<_, String>(6)?)?,
            });
        }
        Ok(runs)
    }
}

fn insert_model(conn: &Connection, model: &TrainedModel) -> ModelStoreResult<ModelId> {
    let model_id = Uuid::new_v4();
    let payload = serde_json::to_string(model)?;
    conn.execute(
        "INSERT INTO prediction_models (
            subject,
            model_id,
            model_kind,
            payload,
            sample_count,
            test_r2,
            trained_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(subject) DO UPDATE SET
            model_id = excluded.model_id,
            model_kind = excluded.model_kind,
            payload = excluded.payload,
            sample_count = excluded.sample_count,
            test_r2 = excluded.test_r2,
            trained_at = excluded.trained_at;",
        params![
            model.subject.as_str(),
            model_id.to_string(),
            model.kind().as_str(),
            payload,
            to_db_count(model.sample_count)?,
            model.test_r2,
            format_timestamp(model.trained_at),
        ],
    )?;
    Ok(model_id)
}

fn insert_training_run(
    conn: &Connection,
    report: &TrainingReport,
    trained_at: NaiveDateTime,
) -> ModelStoreResult<Uuid> {
    let run_id = Uuid::new_v4();
    let best = report.best_evaluation().ok_or_else(|| {
        ModelStoreError::InvalidData("training report lacks best evaluation".to_string())
    })?;
    conn.execute(
        "INSERT INTO training_runs (
            run_id,
            subject,
            best_kind,
            test_r2,
            sample_count,
            report,
            trained_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            run_id.to_string(),
            report.subject.as_str(),
            report.best.as_str(),
            best.test_r2,
            to_db_count(report.diagnosis.total_samples)?,
            serde_json::to_string(report)?,
            format_timestamp(trained_at),
        ],
    )?;
    Ok(run_id)
}

fn parse_summary_row(row: &Row<'_>) -> ModelStoreResult<ModelSummary> {
    Ok(ModelSummary {
        subject: row.get(0)?,
        model_id: parse_uuid(&row.get::<_, String>(1)?)?,
        kind: parse_kind(&row.get::<_, String>(2)?)?,
        sample_count: from_db_count(row.get(3)?)?,
        test_r2: row.get(4)?,
        trained_at: parse_timestamp(&row.get::<_, String>(5)?)?,
    })
}

fn parse_uuid(value: &str) -> ModelStoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| ModelStoreError::InvalidData(format!("invalid model id `{value}`")))
}

fn parse_kind(value: &str) -> ModelStoreResult<RegressorKind> {
    RegressorKind::parse(value)
        .ok_or_else(|| ModelStoreError::InvalidData(format!("unknown model kind `{value}`")))
}

fn format_timestamp(value: NaiveDateTime) -> String {
    value.format(DATE_TIME_FORMAT).to_string()
}

fn parse_timestamp(value: &str) -> ModelStoreResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT)
        .map_err(|_| ModelStoreError::InvalidData(format!("invalid timestamp `{value}`")))
}

fn to_db_count(value: usize) -> ModelStoreResult<i64> {
    i64::try_from(value)
        .map_err(|_| ModelStoreError::InvalidData(format!("count {value} out of range")))
}

fn from_db_count(value: i64) -> ModelStoreResult<usize> {
    usize::try_from(value)
        .map_err(|_| ModelStoreError::InvalidData(format!("negative count {value}")))
}
