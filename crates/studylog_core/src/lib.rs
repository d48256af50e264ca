//! Core domain logic for studylog.
//! This crate is the single source of truth for grade statistics, prediction,
//! validation, persistence and AI-helper contracts.

pub mod ai;
pub mod backup;
pub mod config;
pub mod db;
pub mod integrity;
pub mod logging;
pub mod ml;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod stats;

pub use ai::assistant::{Quiz, QuizDifficulty, QuizQuestion, StudyAssistant, StudyPlanRequest};
pub use ai::client::{AiError, GenerationRequest, GenerationResponse, TextGenerator};
pub use backup::{BackupError, BackupInfo, BackupManager};
pub use config::{ConfigError, StudyConfig};
pub use integrity::{IntegrityChecker, IntegrityReport, RepairPolicy};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use ml::pipeline::{GradeForecast, GradePredictor, PredictionError, TrainedModel};
pub use model::date::RecordDate;
pub use model::goal::{Goal, GoalHorizon, GoalStatus, GoalTarget};
pub use model::grade::{GradeKind, GradeRecord};
pub use model::progress::ProgressRecord;
pub use model::reminder::{Recurrence, Reminder};
pub use model::validation::ValidationError;
pub use repo::json_store::StoreError;
pub use repo::study_repo::JsonStudyRepository;
pub use search::grade_filter::{GradeFilter, Period, SortKey};
pub use service::app::{AppError, StudyApp};
pub use service::export_service::{ExportError, ExportService};
pub use service::report_service::{PeriodReport, ReportPeriod, ReportService};
pub use service::{ServiceError, ServiceResult};
pub use stats::required::{solve_required_score, RequiredScoreInput, RequiredScoreOutcome};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
