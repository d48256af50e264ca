//! Runtime configuration loaded from `studylog.toml`.
//!
//! # Responsibility
//! - Resolve the config path (explicit, `STUDYLOG_CONFIG`, working dir).
//! - Fill every omitted field with its default so partial files load.
//! - Apply environment overrides and reject unusable values.
//!
//! # Invariants
//! - A missing config file is not an error; defaults are returned.
//! - `validate()` runs after overrides, before the config is handed out.

use crate::ai::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "STUDYLOG_CONFIG";
pub const DATA_DIR_ENV: &str = "STUDYLOG_DATA_DIR";
pub const LOG_LEVEL_ENV: &str = "STUDYLOG_LOG_LEVEL";
pub const DEFAULT_CONFIG_FILE: &str = "studylog.toml";

/// Training rejects fewer feature rows than this.
pub const MIN_TRAINING_ROWS: usize = 5;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid config {}: {source}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid config value: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StudyConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub prediction: PredictionConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_model_db")]
    pub model_db: String,
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,
    /// Backups older than this many days are removed by cleanup.
    #[serde(default = "default_backup_keep_days")]
    pub backup_keep_days: u32,
}

fn default_data_dir() -> PathBuf { PathBuf::from("data") }
fn default_model_db() -> String { "models.sqlite3".to_string() }
fn default_backup_dir() -> PathBuf { PathBuf::from("backups") }
fn default_backup_keep_days() -> u32 { 30 }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            model_db: default_model_db(),
            backup_dir: default_backup_dir(),
            backup_keep_days: default_backup_keep_days(),
        }
    }
}

impl StorageConfig {
    pub fn model_db_path(&self) -> PathBuf {
        self.data_dir.join(&self.model_db)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
}

fn default_log_level() -> String { crate::logging::default_log_level().to_string() }
fn default_log_dir() -> PathBuf { PathBuf::from("logs") }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: default_log_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionConfig {
    /// Minimum feature rows required to train.
    #[serde(default = "default_min_records")]
    pub min_records: usize,
    /// Number of future assessments predicted per request.
    #[serde(default = "default_horizon")]
    pub horizon: usize,
    /// Upper bound on any requested horizon.
    #[serde(default = "default_max_horizon")]
    pub max_horizon: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Assumed standard error of one prediction, in points.
    #[serde(default = "default_std_error")]
    pub std_error: f64,
}

fn default_min_records() -> usize { MIN_TRAINING_ROWS }
fn default_horizon() -> usize { 3 }
fn default_max_horizon() -> usize { 52 }
fn default_seed() -> u64 { 42 }
fn default_std_error() -> f64 { 5.0 }

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            min_records: default_min_records(),
            horizon: default_horizon(),
            max_horizon: default_max_horizon(),
            seed: default_seed(),
            std_error: default_std_error(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_initial_wait_ms")]
    pub initial_wait_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: u32,
}

fn default_model() -> String { "default".to_string() }
fn default_max_tokens() -> u32 { 5000 }
fn default_retry_attempts() -> u32 { 3 }
fn default_initial_wait_ms() -> u64 { 1000 }
fn default_backoff_multiplier() -> u32 { 2 }

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            retry_attempts: default_retry_attempts(),
            initial_wait_ms: default_initial_wait_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl AiConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            initial_wait: Duration::from_millis(self.initial_wait_ms),
            multiplier: self.backoff_multiplier,
        }
    }
}

impl StudyConfig {
    /// Loads config from `explicit`, else `STUDYLOG_CONFIG`, else
    /// `studylog.toml`, then applies process environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => std::env::var(CONFIG_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE)),
        };
        let mut config = Self::load_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        log::info!(
            "event=config_load module=config status=ok found={}",
            path.exists()
        );
        Ok(config)
    }

    /// Reads one TOML file; a missing file yields defaults.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Applies `STUDYLOG_DATA_DIR` / `STUDYLOG_LOG_LEVEL` from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|value| !value.trim().is_empty()) {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup(LOG_LEVEL_ENV).filter(|value| !value.trim().is_empty()) {
            self.logging.level = level.trim().to_ascii_lowercase();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prediction.min_records < MIN_TRAINING_ROWS {
            return Err(ConfigError::Invalid(format!(
                "prediction.min_records must be at least {MIN_TRAINING_ROWS}"
            )));
        }
        if self.prediction.horizon == 0 || self.prediction.horizon > self.prediction.max_horizon {
            return Err(ConfigError::Invalid(format!(
                "prediction.horizon must be within 1..={}",
                self.prediction.max_horizon
            )));
        }
        if !(self.prediction.std_error.is_finite() && self.prediction.std_error >= 0.0) {
            return Err(ConfigError::Invalid(
                "prediction.std_error must be a non-negative number".to_string(),
            ));
        }
        if self.ai.retry_attempts == 0 {
            return Err(ConfigError::Invalid(
                "ai.retry_attempts must be positive".to_string(),
            ));
        }
        if self.ai.backoff_multiplier < 1 {
            return Err(ConfigError::Invalid(
                "ai.backoff_multiplier must be at least 1".to_string(),
            ));
        }
        if self.storage.model_db.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "storage.model_db must not be empty".to_string(),
            ));
        }
        if self.storage.backup_keep_days == 0 {
            return Err(ConfigError::Invalid(
                "storage.backup_keep_days must be positive".to_string(),
            ));
        }
        if crate::logging::parse_level(&self.logging.level).is_none() {
            return Err(ConfigError::Invalid(format!(
                "unsupported logging.level `{}`",
                self.logging.level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{StudyConfig, DATA_DIR_ENV, LOG_LEVEL_ENV};
    use std::path::PathBuf;

    #[test]
    fn empty_document_yields_defaults() {
        let config = StudyConfig::from_toml_str("").expect("empty document parses");
        assert_eq!(config, StudyConfig::default());
        assert_eq!(config.prediction.min_records, 5);
        assert_eq!(config.prediction.seed, 42);
        assert_eq!(config.ai.max_tokens, 5000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = StudyConfig::from_toml_str(
            "[prediction]\nhorizon = 5\n\n[storage]\ndata_dir = \"/tmp/study\"\n",
        )
        .expect("partial document parses");
        assert_eq!(config.prediction.horizon, 5);
        assert_eq!(config.prediction.std_error, 5.0);
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/study"));
        assert_eq!(config.storage.model_db, "models.sqlite3");
        assert_eq!(config.storage.backup_keep_days, 30);
    }

    #[test]
    fn overrides_replace_data_dir_and_level() {
        let mut config = StudyConfig::default();
        config.apply_overrides(|key| match key {
            DATA_DIR_ENV => Some("/var/study".to_string()),
            LOG_LEVEL_ENV => Some(" DEBUG ".to_string()),
            _ => None,
        });
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/study"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn validate_rejects_unusable_values() {
        let mut config = StudyConfig::default();
        config.prediction.min_records = 3;
        assert!(config.validate().is_err());

        let mut config = StudyConfig::default();
        config.ai.retry_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = StudyConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = StudyConfig::default();
        config.prediction.horizon = config.prediction.max_horizon + 1;
        assert!(config.validate().is_err());

        let mut config = StudyConfig::default();
        config.storage.backup_keep_days = 0;
        assert!(config.validate().is_err());
    }
}
