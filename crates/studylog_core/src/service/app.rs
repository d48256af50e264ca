//! Explicit application state.
//!
//! # Responsibility
//! - Own the data-directory repository, the model-store connection, the
//!   loaded configuration and the predictor.
//! - Hand out services borrowing that state.
//!
//! # Invariants
//! - The data directory exists once `open` returns.
//! - The model store is migrated before any service can reach it.

use crate::backup::BackupManager;
use crate::config::StudyConfig;
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::ml::pipeline::GradePredictor;
use crate::repo::model_repo::SqliteModelRepository;
use crate::repo::study_repo::JsonStudyRepository;
use crate::service::export_service::ExportService;
use crate::service::goal_service::GoalService;
use crate::service::grade_service::GradeService;
use crate::service::prediction_service::PredictionService;
use crate::service::progress_service::ProgressService;
use crate::service::reminder_service::ReminderService;
use crate::service::report_service::ReportService;
use crate::service::subject_service::SubjectService;
use log::info;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

#[derive(Debug)]
pub enum AppError {
    DataDir {
        path: PathBuf,
        source: std::io::Error,
    },
    Db(DbError),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DataDir { path, source } => {
                write!(f, "cannot prepare data directory {}: {source}", path.display())
            }
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::DataDir { source, .. } => Some(source),
            Self::Db(err) => Some(err),
        }
    }
}

impl From<DbError> for AppError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

pub struct StudyApp {
    config: StudyConfig,
    repo: JsonStudyRepository,
    conn: Connection,
    predictor: GradePredictor,
}

impl StudyApp {
    /// Prepares the data directory and opens the model store inside it.
    pub fn open(config: StudyConfig) -> Result<Self, AppError> {
        let data_dir = config.storage.data_dir.clone();
        std::fs::create_dir_all(&data_dir).map_err(|source| AppError::DataDir {
            path: data_dir.clone(),
            source,
        })?;
        let conn = open_db(config.storage.model_db_path())?;
        info!("event=app_open module=service status=ok mode=file");
        Ok(Self::assemble(config, conn))
    }

    /// Like [`StudyApp::open`] but keeps trained models in memory.
    pub fn open_with_memory_models(config: StudyConfig) -> Result<Self, AppError> {
        let data_dir = config.storage.data_dir.clone();
        std::fs::create_dir_all(&data_dir).map_err(|source| AppError::DataDir {
            path: data_dir.clone(),
            source,
        })?;
        let conn = open_db_in_memory()?;
        info!("event=app_open module=service status=ok mode=memory");
        Ok(Self::assemble(config, conn))
    }

    fn assemble(config: StudyConfig, conn: Connection) -> Self {
        Self {
            repo: JsonStudyRepository::new(&config.storage.data_dir),
            predictor: GradePredictor::new(config.prediction.clone()),
            config,
            conn,
        }
    }

    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    pub fn repository(&self) -> &JsonStudyRepository {
        &self.repo
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn subjects(&self) -> SubjectService<&JsonStudyRepository> {
        SubjectService::new(&self.repo)
    }

    pub fn grades(&self) -> GradeService<&JsonStudyRepository> {
        GradeService::new(&self.repo)
    }

    pub fn progress(&self) -> ProgressService<&JsonStudyRepository> {
        ProgressService::new(&self.repo)
    }

    pub fn goals(&self) -> GoalService<&JsonStudyRepository> {
        GoalService::new(&self.repo)
    }

    pub fn reminders(&self) -> ReminderService<&JsonStudyRepository> {
        ReminderService::new(&self.repo)
    }

    pub fn exports(&self) -> ExportService<&JsonStudyRepository> {
        ExportService::new(&self.repo)
    }

    pub fn reports(&self) -> ReportService<&JsonStudyRepository> {
        ReportService::new(&self.repo)
    }

    pub fn backups(&self) -> BackupManager {
        BackupManager::from_config(&self.config.storage)
    }

    pub fn predictions(
        &self,
    ) -> PredictionService<'_, &JsonStudyRepository, SqliteModelRepository<'_>> {
        PredictionService::new(
            &self.repo,
            SqliteModelRepository::new(&self.conn),
            &self.predictor,
        )
    }
}
