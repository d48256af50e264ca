//! Timestamped copies of the data directory with retention.
//!
//! # Responsibility
//! - Copy every data file into `<backup_dir>/<YYYYmmdd_HHMMSS>/` together
//!   with a `backup_info.json` manifest.
//! - List, restore and expire those snapshots.
//!
//! # Invariants
//! - A snapshot directory is never overwritten; a second backup in the same
//!   second fails with [`BackupError::Exists`].
//! - Restore keeps the replaced file as `<name>.restore_backup`.
//! - Only snapshots with a readable manifest are listed, restored or expired.

use crate::config::StorageConfig;
use crate::repo::json_store::{JsonFile, StoreError};
use crate::repo::study_repo::{
    GOALS_FILE, GRADES_FILE, PROFILE_FILE, PROGRESS_FILE, REMINDERS_FILE, SUBJECTS_FILE,
};
use chrono::{Duration, NaiveDateTime};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

pub const BACKUP_INFO_FILE: &str = "backup_info.json";
pub const RESTORE_SUFFIX: &str = "restore_backup";
pub const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Data files included in every snapshot.
pub const DATA_FILES: [&str; 6] = [
    SUBJECTS_FILE,
    GRADES_FILE,
    PROGRESS_FILE,
    GOALS_FILE,
    REMINDERS_FILE,
    PROFILE_FILE,
];

/// Minimum spacing between automatic backups.
pub const AUTO_BACKUP_INTERVAL_HOURS: i64 = 24;

pub type BackupResult<T> = Result<T, BackupError>;

#[derive(Debug)]
pub enum BackupError {
    Io { path: PathBuf, source: std::io::Error },
    Store(StoreError),
    Exists(String),
    NotFound(String),
}

impl Display for BackupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "backup io error on {}: {source}", path.display()),
            Self::Store(err) => write!(f, "{err}"),
            Self::Exists(stamp) => write!(f, "backup {stamp} already exists"),
            Self::NotFound(stamp) => write!(f, "backup {stamp} not found"),
        }
    }
}

impl Error for BackupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Store(err) => Some(err),
            Self::Exists(_) | Self::NotFound(_) => None,
        }
    }
}

impl From<StoreError> for BackupError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl BackupError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "backup_io",
            Self::Store(err) => err.code(),
            Self::Exists(_) => "backup_exists",
            Self::NotFound(_) => "backup_not_found",
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> BackupError + '_ {
    move |source| BackupError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Manifest stored next to the copied files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupInfo {
    pub created_at: NaiveDateTime,
    pub timestamp: String,
    pub files: Vec<String>,
    /// Size of the copied files; computed when listing.
    #[serde(default, skip_serializing)]
    pub total_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoBackup {
    pub info: BackupInfo,
    pub removed: usize,
}

pub struct BackupManager {
    data_dir: PathBuf,
    backup_dir: PathBuf,
    keep_days: u32,
}

impl BackupManager {
    pub fn new(data_dir: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>, keep_days: u32) -> Self {
        Self {
            data_dir: data_dir.into(),
            backup_dir: backup_dir.into(),
            keep_days,
        }
    }

    pub fn from_config(storage: &StorageConfig) -> Self {
        Self::new(&storage.data_dir, &storage.backup_dir, storage.backup_keep_days)
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Copies the existing data files into a new snapshot named after `now`.
    pub fn create(&self, now: NaiveDateTime) -> BackupResult<BackupInfo> {
        let timestamp = now.format(STAMP_FORMAT).to_string();
        fs::create_dir_all(&self.backup_dir).map_err(io_error(&self.backup_dir))?;
        let target = self.backup_dir.join(&timestamp);
        fs::create_dir(&target).map_err(|source| {
            if source.kind() == std::io::ErrorKind::AlreadyExists {
                BackupError::Exists(timestamp.clone())
            } else {
                io_error(&target)(source)
            }
        })?;

        let mut files = Vec::new();
        for name in DATA_FILES {
            let source = self.data_dir.join(name);
            if !source.is_file() {
                continue;
            }
            let copy = target.join(name);
            fs::copy(&source, &copy).map_err(io_error(&copy))?;
            files.push(name.to_string());
        }

        let info = BackupInfo {
            created_at: now,
            timestamp,
            files,
            total_bytes: 0,
        };
        JsonFile::new(target.join(BACKUP_INFO_FILE)).save(&info)?;
        info!(
            "event=backup_create module=backup status=ok timestamp={} files={}",
            info.timestamp,
            info.files.len()
        );
        Ok(info)
    }

    /// Snapshots with a readable manifest, newest first.
    pub fn list(&self) -> BackupResult<Vec<BackupInfo>> {
        if !self.backup_dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.backup_dir).map_err(io_error(&self.backup_dir))?;
        let mut backups = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io_error(&self.backup_dir))?;
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            let manifest = JsonFile::new(dir.join(BACKUP_INFO_FILE));
            let mut info = match manifest.load::<Option<BackupInfo>>() {
                Ok(Some(info)) => info,
                Ok(None) => continue,
                Err(err) => {
                    warn!(
                        "event=backup_list module=backup status=skipped dir={} error_code={}",
                        dir.display(),
                        err.code()
                    );
                    continue;
                }
            };
            info.total_bytes = info
                .files
                .iter()
                .filter_map(|name| fs::metadata(dir.join(name)).ok())
                .map(|meta| meta.len())
                .sum();
            backups.push(info);
        }
        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(backups)
    }

    pub fn latest(&self) -> BackupResult<Option<BackupInfo>> {
        Ok(self.list()?.into_iter().next())
    }

    /// True when no snapshot exists or the newest is at least a day old.
    pub fn should_backup(&self, now: NaiveDateTime) -> BackupResult<bool> {
        Ok(match self.latest()? {
            None => true,
            Some(info) => now - info.created_at >= Duration::hours(AUTO_BACKUP_INTERVAL_HOURS),
        })
    }

    /// Removes snapshots older than the retention window; returns how many.
    pub fn clean_old(&self, now: NaiveDateTime) -> BackupResult<usize> {
        let cutoff = now - Duration::days(i64::from(self.keep_days));
        let mut removed = 0;
        for info in self.list()? {
            if info.created_at >= cutoff {
                continue;
            }
            let dir = self.backup_dir.join(&info.timestamp);
            fs::remove_dir_all(&dir).map_err(io_error(&dir))?;
            removed += 1;
        }
        if removed > 0 {
            info!(
                "event=backup_clean module=backup status=ok removed={} keep_days={}",
                removed, self.keep_days
            );
        }
        Ok(removed)
    }

    /// Copies the files of snapshot `timestamp` back into the data directory.
    pub fn restore(&self, timestamp: &str) -> BackupResult<Vec<String>> {
        if timestamp.is_empty() || timestamp.contains(['/', '\\']) || timestamp.contains("..") {
            return Err(BackupError::NotFound(timestamp.to_string()));
        }
        let snapshot = self.backup_dir.join(timestamp);
        let info = JsonFile::new(snapshot.join(BACKUP_INFO_FILE))
            .load::<Option<BackupInfo>>()?
            .ok_or_else(|| BackupError::NotFound(timestamp.to_string()))?;

        fs::create_dir_all(&self.data_dir).map_err(io_error(&self.data_dir))?;
        let mut restored = Vec::new();
        for name in &info.files {
            let copy = snapshot.join(name);
            if !copy.is_file() {
                warn!(
                    "event=backup_restore module=backup status=partial missing={}",
                    name
                );
                continue;
            }
            let current = self.data_dir.join(name);
            if current.is_file() {
                let kept = self.data_dir.join(format!("{name}.{RESTORE_SUFFIX}"));
                fs::copy(&current, &kept).map_err(io_error(&kept))?;
            }
            fs::copy(&copy, &current).map_err(io_error(&current))?;
            restored.push(name.clone());
        }
        info!(
            "event=backup_restore module=backup status=ok timestamp={} files={}",
            timestamp,
            restored.len()
        );
        Ok(restored)
    }

    /// Creates a snapshot when one is due, then applies retention.
    pub fn auto_backup(&self, now: NaiveDateTime) -> BackupResult<Option<AutoBackup>> {
        if !self.should_backup(now)? {
            return Ok(None);
        }
        let info = self.create(now)?;
        let removed = self.clean_old(now)?;
        Ok(Some(AutoBackup { info, removed }))
    }
}
